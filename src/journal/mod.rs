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

mod file;

use std::sync::{Arc, Mutex};

use thiserror::Error;

pub use file::FileInboundJournal;

use crate::types::InboundJournalRecord;

/// Handle shared between the connection layer (which journals `order`/
/// `cancel` inputs before enqueueing them) and the writer thread (which
/// journals `state` markers before capturing a snapshot). Both write to
/// the same underlying file; the mutex only ever guards a synchronous,
/// already-fast append.
pub type SharedJournal = Arc<Mutex<Box<dyn InboundJournal>>>;

/// Errors raised appending to or reading the inbound journal.
#[derive(Debug, Error)]
pub enum JournalError {
	#[error("failed to append record: {0}")]
	AppendFailed(String),
	#[error("failed to read journal: {0}")]
	ReadFailed(String),
}

/// The durable, append-only log of every state-affecting input and every
/// snapshot marker. Single-writer, append-only for the process lifetime;
/// this trait is the idempotency/durability anchor the rest of the engine
/// builds on, and is implementation-agnostic so tests can swap it out.
pub trait InboundJournal: Send {
	/// Append `record` and block until the write is durable. The caller
	/// must not proceed (apply to the book, enqueue for the writer) until
	/// this returns `Ok`.
	fn append(&mut self, record: &InboundJournalRecord) -> Result<(), JournalError>;

	/// Read every record written so far, in file order.
	fn read_all(&self) -> Result<Vec<InboundJournalRecord>, JournalError>;
}
