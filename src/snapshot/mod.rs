// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod storage;

use thiserror::Error;
use tracing::warn;

pub use storage::FileSnapshotStorage;

use crate::errors::EngineError;
use crate::engine::state::WriterState;
use crate::journal::InboundJournal;
use crate::types::{EngineStateSnapshot, InboundJournalRecord};

#[derive(Debug, Error)]
pub enum SnapshotError {
	#[error("snapshot io error: {0}")]
	Io(String),
	#[error("snapshot corrupted: {0}")]
	Corrupted(String),
}

/// Run the five-step `write_state` protocol on the writer thread.
///
/// The marker is journaled *before* the snapshot is captured so replay can
/// pinpoint the earliest input not yet reflected in it. A snapshot write
/// failure is logged and swallowed — state has already advanced and the
/// next attempt will try again — but a journal append failure is fatal,
/// since without the marker recovery would be ambiguous.
pub fn write_state(
	writer: &mut WriterState,
	journal: &mut dyn InboundJournal,
	storage: &FileSnapshotStorage,
) -> Result<EngineStateSnapshot, EngineError> {
	let n = writer.state_num;

	journal
		.append(&InboundJournalRecord::State { state_num: n })
		.map_err(|e| EngineError::JournalAppendFailed(e.to_string()))?;

	let snapshot = writer.book.state(n + 1, writer.output_seq);

	if let Err(e) = storage.write(&snapshot) {
		warn!(target: "snapshot", state_num = n + 1, error = %e, "snapshot write failed, will retry on next trigger");
	}

	writer.state_num = n + 1;
	Ok(snapshot)
}
