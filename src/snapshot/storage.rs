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
	io::Write,
	path::PathBuf,
};

use super::SnapshotError;
use crate::types::EngineStateSnapshot;

/// File-backed snapshot storage under a configured log directory.
///
/// Snapshots are named `matcher_state.<product>.<state_num>.json`; the
/// highest numeric suffix present is always the latest. Writes go to a
/// `.tmp` sibling and are renamed into place, so a reader never observes a
/// partially written file under the real name.
pub struct FileSnapshotStorage {
	dir: PathBuf,
	product: String,
}

impl FileSnapshotStorage {
	pub fn new(dir: impl Into<PathBuf>, product: impl Into<String>) -> Self {
		Self {
			dir: dir.into(),
			product: product.into(),
		}
	}

	fn path_for(&self, state_num: u64) -> PathBuf {
		self.dir
			.join(format!("matcher_state.{}.{}.json", self.product, state_num))
	}

	fn prefix(&self) -> String {
		format!("matcher_state.{}.", self.product)
	}

	/// The highest `state_num` with a snapshot file on disk, if any.
	pub fn latest_state_num(&self) -> Result<Option<u64>, SnapshotError> {
		if !self.dir.exists() {
			return Ok(None);
		}
		let prefix = self.prefix();
		let mut best = None;
		for entry in fs::read_dir(&self.dir).map_err(|e| SnapshotError::Io(e.to_string()))? {
			let entry = entry.map_err(|e| SnapshotError::Io(e.to_string()))?;
			let name = entry.file_name();
			let name = name.to_string_lossy();
			if let Some(rest) = name.strip_prefix(&prefix)
				&& let Some(num_str) = rest.strip_suffix(".json")
				&& let Ok(num) = num_str.parse::<u64>()
			{
				best = Some(best.map_or(num, |b: u64| b.max(num)));
			}
		}
		Ok(best)
	}

	pub fn load(&self, state_num: u64) -> Result<EngineStateSnapshot, SnapshotError> {
		let path = self.path_for(state_num);
		let bytes = fs::read(&path).map_err(|e| SnapshotError::Io(e.to_string()))?;
		serde_json::from_slice(&bytes).map_err(|e| SnapshotError::Corrupted(e.to_string()))
	}

	pub fn load_latest(&self) -> Result<Option<EngineStateSnapshot>, SnapshotError> {
		match self.latest_state_num()? {
			Some(n) => self.load(n).map(Some),
			None => Ok(None),
		}
	}

	/// Write `snapshot` under `matcher_state.<product>.<snapshot.state_num>.json`,
	/// via write-tmp-then-rename.
	pub fn write(&self, snapshot: &EngineStateSnapshot) -> Result<(), SnapshotError> {
		fs::create_dir_all(&self.dir).map_err(|e| SnapshotError::Io(e.to_string()))?;

		let final_path = self.path_for(snapshot.state_num);
		let tmp_path = final_path.with_extension("json.tmp");

		let bytes = serde_json::to_vec_pretty(snapshot)
			.map_err(|e| SnapshotError::Io(e.to_string()))?;

		{
			let mut file = OpenOptions::new()
				.create(true)
				.truncate(true)
				.write(true)
				.open(&tmp_path)
				.map_err(|e| SnapshotError::Io(e.to_string()))?;
			file.write_all(&bytes).map_err(|e| SnapshotError::Io(e.to_string()))?;
			file.flush().map_err(|e| SnapshotError::Io(e.to_string()))?;
		}

		fs::rename(&tmp_path, &final_path).map_err(|e| SnapshotError::Io(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn snapshot(state_num: u64) -> EngineStateSnapshot {
		EngineStateSnapshot {
			state_num,
			output_seq: 0,
			bids: Vec::new(),
			asks: Vec::new(),
		}
	}

	#[test]
	fn write_then_load_latest_round_trips() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileSnapshotStorage::new(dir.path(), "BTC-USD");

		storage.write(&snapshot(1)).unwrap();
		storage.write(&snapshot(2)).unwrap();

		assert_eq!(storage.latest_state_num().unwrap(), Some(2));
		assert_eq!(storage.load_latest().unwrap().unwrap().state_num, 2);
	}

	#[test]
	fn load_latest_on_empty_dir_is_none() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileSnapshotStorage::new(dir.path(), "BTC-USD");
		assert!(storage.load_latest().unwrap().is_none());
	}

	#[test]
	fn no_tmp_file_left_behind_after_write() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileSnapshotStorage::new(dir.path(), "BTC-USD");
		storage.write(&snapshot(5)).unwrap();

		let names: Vec<_> = fs::read_dir(dir.path())
			.unwrap()
			.map(|e| e.unwrap().file_name().to_string_lossy().to_string())
			.collect();
		assert!(names.iter().all(|n| !n.ends_with(".tmp")));
	}
}
