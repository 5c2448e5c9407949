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

use tracing::{error, info, warn};

use crate::engine::state::WriterState;
use crate::engine::{apply_cancel, apply_order};
use crate::errors::EngineError;
use crate::feed::FeedPublisher;
use crate::journal::InboundJournal;
use crate::snapshot::FileSnapshotStorage;
use crate::types::InboundJournalRecord;

/// Rebuild a `WriterState` from the most recent snapshot plus the inbound
/// journal tail that postdates it, replaying every input through the same
/// handlers used at steady state so the feed output of a recovered process
/// is indistinguishable from the pre-crash run.
///
/// `no_recover` is for a fresh cold boot of a new product: it skips both
/// snapshot load and replay entirely and returns an empty `WriterState`,
/// rather than attempting to reconcile with journal/snapshot files that may
/// belong to a prior, unrelated run.
pub fn recover(
	no_recover: bool,
	storage: &FileSnapshotStorage,
	journal: &dyn InboundJournal,
	feed: &FeedPublisher,
) -> Result<WriterState, EngineError> {
	if no_recover {
		info!(target: "recovery", "no_recover set, starting with a fresh engine state");
		return Ok(WriterState::fresh());
	}

	let latest = storage
		.latest_state_num()
		.map_err(|e| EngineError::StateDirRead(e.to_string()))?;

	let Some(_) = latest else {
		info!(target: "recovery", "no snapshot found, starting with a fresh engine state");
		return Ok(WriterState::fresh());
	};

	let snapshot = storage
		.load_latest()
		.map_err(|e| EngineError::StateFileRead(e.to_string()))?
		.expect("latest_state_num returned Some but load_latest returned None");

	let mut writer = WriterState::fresh();
	for order in snapshot.bids.into_iter().chain(snapshot.asks.into_iter()) {
		writer.book.insert_resting(order);
	}
	writer.state_num = snapshot.state_num;
	writer.output_seq = snapshot.output_seq;

	let journal_state_num = writer.state_num.saturating_sub(1);

	let records = journal
		.read_all()
		.map_err(|e| EngineError::JournalRead(e.to_string()))?;

	let marker_index = records.iter().position(
		|r| matches!(r, InboundJournalRecord::State { state_num } if *state_num == journal_state_num),
	);

	let Some(marker_index) = marker_index else {
		error!(
			target: "recovery",
			journal_state_num,
			"inbound journal marker not found, continuing from snapshot alone"
		);
		return Ok(writer);
	};

	let mut replayed = 0usize;
	for record in &records[marker_index + 1..] {
		match record {
			InboundJournalRecord::Order {
				payload,
				received_ts,
			} => {
				if let Err(e) = apply_order(&mut writer, feed, payload, *received_ts) {
					error!(target: "recovery", order_id = %payload.id, error = %e, "invariant violation replaying order");
				}
				replayed += 1;
			}
			InboundJournalRecord::Cancel { payload } => {
				if let Err(reject) = apply_cancel(&mut writer, feed, payload) {
					warn!(target: "recovery", order_id = %payload.order_id, reason = %reject.reject_reason(), "cancel rejected during replay");
				}
				replayed += 1;
			}
			InboundJournalRecord::State { .. } => {}
		}
	}

	info!(target: "recovery", replayed, state_num = writer.state_num, output_seq = writer.output_seq, "recovery complete");
	Ok(writer)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::feed::FeedPublisher;
	use crate::journal::FileInboundJournal;
	use crate::types::{CancelPayload, OrderPayload, Side};

	fn order(id: &str, sender: &str, side: Side, price: u64, size: u64) -> OrderPayload {
		OrderPayload {
			id: id.to_string(),
			sender: sender.to_string(),
			side,
			price,
			size,
		}
	}

	#[test]
	fn fresh_start_with_no_snapshot_and_no_journal() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileSnapshotStorage::new(dir.path(), "BTC-USD");
		let journal = FileInboundJournal::new(dir.path().join("matcher.BTC-USD.log"));
		let (feed, _rx) = FeedPublisher::new(16);

		let writer = recover(false, &storage, &journal, &feed).unwrap();
		assert_eq!(writer.state_num, 0);
		assert_eq!(writer.output_seq, 0);
	}

	#[test]
	fn no_recover_ignores_existing_journal_and_snapshot() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileSnapshotStorage::new(dir.path(), "BTC-USD");
		let mut journal = FileInboundJournal::new(dir.path().join("matcher.BTC-USD.log"));
		let (feed, _rx) = FeedPublisher::new(16);

		journal
			.append(&InboundJournalRecord::Order {
				payload: order("A", "u1", Side::Buy, 100, 10),
				received_ts: 1,
			})
			.unwrap();

		let writer = recover(true, &storage, &journal, &feed).unwrap();
		assert_eq!(writer.state_num, 0);
		assert!(writer.book.bids_in_priority_order().is_empty());
	}

	#[test]
	fn replays_journal_tail_after_marker() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileSnapshotStorage::new(dir.path(), "BTC-USD");
		let mut journal = FileInboundJournal::new(dir.path().join("matcher.BTC-USD.log"));
		let (feed, rx) = FeedPublisher::new(64);

		// Build up live state: order A rests, then snapshot at state_num 0,
		// then a cancel of A arrives after the snapshot marker.
		let mut writer = WriterState::fresh();
		journal
			.append(&InboundJournalRecord::Order {
				payload: order("A", "u1", Side::Buy, 100, 10),
				received_ts: 1,
			})
			.unwrap();
		apply_order(&mut writer, &feed, &order("A", "u1", Side::Buy, 100, 10), 1).unwrap();

		crate::snapshot::write_state(&mut writer, &mut journal, &storage).unwrap();

		journal
			.append(&InboundJournalRecord::Cancel {
				payload: CancelPayload {
					order_id: "A".to_string(),
					sender_id: "u1".to_string(),
				},
			})
			.unwrap();

		drop(rx);

		let recovered = recover(false, &storage, &journal, &feed).unwrap();
		assert!(recovered.book.bids_in_priority_order().is_empty());
	}
}
