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

use std::{
	fs::{self, OpenOptions},
	io::{BufRead, BufReader, Write},
	path::{Path, PathBuf},
};

use super::{InboundJournal, JournalError};
use crate::types::InboundJournalRecord;

/// Inbound journal backed by a plain JSONL file: one
/// `InboundJournalRecord` per line, opened in append mode and flushed
/// synchronously so `append` only returns once the record is durable.
pub struct FileInboundJournal {
	path: PathBuf,
}

impl FileInboundJournal {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl InboundJournal for FileInboundJournal {
	fn append(&mut self, record: &InboundJournalRecord) -> Result<(), JournalError> {
		if let Some(parent) = self.path.parent()
			&& !parent.as_os_str().is_empty()
		{
			fs::create_dir_all(parent)
				.map_err(|e| JournalError::AppendFailed(e.to_string()))?;
		}

		let line = serde_json::to_string(record)
			.map_err(|e| JournalError::AppendFailed(e.to_string()))?;

		let mut file = OpenOptions::new()
			.create(true)
			.append(true)
			.open(&self.path)
			.map_err(|e| JournalError::AppendFailed(e.to_string()))?;

		file.write_all(line.as_bytes())
			.and_then(|_| file.write_all(b"\n"))
			.and_then(|_| file.flush())
			.map_err(|e| JournalError::AppendFailed(e.to_string()))
	}

	fn read_all(&self) -> Result<Vec<InboundJournalRecord>, JournalError> {
		if !self.path.exists() {
			return Ok(Vec::new());
		}

		let file =
			OpenOptions::new().read(true).open(&self.path).map_err(|e| JournalError::ReadFailed(e.to_string()))?;
		let reader = BufReader::new(file);

		let mut records = Vec::new();
		for (idx, line) in reader.lines().enumerate() {
			let line = line.map_err(|e| JournalError::ReadFailed(e.to_string()))?;
			let line = line.trim();
			if line.is_empty() {
				continue;
			}
			let record: InboundJournalRecord = serde_json::from_str(line)
				.map_err(|e| JournalError::ReadFailed(format!("line {}: {}", idx + 1, e)))?;
			records.push(record);
		}
		Ok(records)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::{OrderPayload, Side};

	#[test]
	fn append_then_read_all_round_trips() {
		let dir = tempfile::tempdir().unwrap();
		let mut journal = FileInboundJournal::new(dir.path().join("matcher.BTC-USD.log"));

		journal.append(&InboundJournalRecord::State { state_num: 0 }).unwrap();
		journal
			.append(&InboundJournalRecord::Order {
				payload: OrderPayload {
					id: "A".to_string(),
					sender: "u1".to_string(),
					side: Side::Buy,
					price: 100,
					size: 10,
				},
				received_ts: 42,
			})
			.unwrap();

		let records = journal.read_all().unwrap();
		assert_eq!(records.len(), 2);
		assert!(matches!(records[0], InboundJournalRecord::State { state_num: 0 }));
		assert!(matches!(records[1], InboundJournalRecord::Order { .. }));
	}

	#[test]
	fn read_all_on_missing_file_is_empty() {
		let dir = tempfile::tempdir().unwrap();
		let journal = FileInboundJournal::new(dir.path().join("nope.log"));
		assert!(journal.read_all().unwrap().is_empty());
	}
}
