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

pub mod state;

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	thread::{self, JoinHandle},
	time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde_json::json;
use tracing::{debug, error, info, warn};

pub use state::WriterState;

use crate::errors::{CancelError, EngineError};
use crate::feed::FeedPublisher;
use crate::journal::SharedJournal;
use crate::queue::{IngressJob, QueueError, QueueReceiver};
use crate::snapshot::{self, FileSnapshotStorage};
use crate::types::{BookEvent, CancelPayload, DoneReason, Order, OrderPayload, ReplyEnvelope};

/// Configuration the writer thread is started with.
#[derive(Debug, Clone)]
pub struct EngineConfig {
	pub product: String,
}

/// Runs the single-threaded matching loop on a dedicated OS thread. All
/// book mutation, feed-sequence assignment and snapshot capture happen
/// here and nowhere else — this is the one logical writer the rest of the
/// system defers to.
pub struct MatchingEngine {
	thread_handle: Option<JoinHandle<()>>,
	shutdown: Arc<AtomicBool>,
}

impl MatchingEngine {
	pub fn start(
		config: EngineConfig,
		mut writer: WriterState,
		queue_receiver: QueueReceiver,
		feed: FeedPublisher,
		journal: SharedJournal,
		snapshot_storage: FileSnapshotStorage,
	) -> Self {
		let shutdown = Arc::new(AtomicBool::new(false));
		let shutdown_clone = shutdown.clone();

		let thread_handle = thread::Builder::new()
			.name("matching-loop".to_string())
			.spawn(move || {
				info!(target: "engine", product = %config.product, "matching loop started");
				Self::run(
					&mut writer,
					&queue_receiver,
					&feed,
					&journal,
					&snapshot_storage,
					&shutdown_clone,
				);
				info!(target: "engine", product = %config.product, "matching loop stopped");
			})
			.expect("failed to spawn matching engine thread");

		Self {
			thread_handle: Some(thread_handle),
			shutdown,
		}
	}

	fn run(
		writer: &mut WriterState,
		queue_receiver: &QueueReceiver,
		feed: &FeedPublisher,
		journal: &SharedJournal,
		snapshot_storage: &FileSnapshotStorage,
		shutdown: &Arc<AtomicBool>,
	) {
		loop {
			if shutdown.load(Ordering::Relaxed) {
				break;
			}

			let job = match queue_receiver.try_recv() {
				Ok(job) => job,
				Err(QueueError::Empty) => {
					thread::sleep(Duration::from_millis(1));
					continue;
				}
				Err(QueueError::Disconnected) => {
					error!(target: "engine", "ingress queue disconnected");
					break;
				}
				Err(QueueError::Full) => unreachable!("try_recv never returns Full"),
			};

			match job {
				IngressJob::Order {
					payload,
					received_ts,
				} => {
					if let Err(e) = apply_order(writer, feed, &payload, received_ts) {
						error!(target: "engine", order_id = %payload.id, error = %e, "fatal error applying order, stopping writer");
						break;
					}
				}
				IngressJob::Cancel { payload, reply } => {
					if let Err(reject) = apply_cancel(writer, feed, &payload) {
						let envelope = ReplyEnvelope {
							kind: "cancel_reject".to_string(),
							timestamp: now_secs(),
							target_id: payload.sender_id.clone(),
							payload: json!({
								"order_id": payload.order_id,
								"reject_reason": reject.reject_reason(),
							}),
						};
						let _ = reply.send(envelope);
					}
				}
				IngressJob::State { reply } => {
					let mut journal = journal.lock().expect("journal mutex poisoned");
					match snapshot::write_state(writer, &mut **journal, snapshot_storage) {
						Ok(snap) => {
							let envelope = ReplyEnvelope {
								kind: "state".to_string(),
								timestamp: now_secs(),
								target_id: String::new(),
								payload: json!(snap),
							};
							let _ = reply.send(envelope);
						}
						Err(e) => {
							error!(target: "engine", error = %e, "fatal error taking snapshot, stopping writer");
							break;
						}
					}
				}
			}
		}
	}

	pub fn shutdown(mut self) {
		self.shutdown.store(true, Ordering::Relaxed);
		if let Some(handle) = self.thread_handle.take()
			&& let Err(e) = handle.join()
		{
			warn!(target: "engine", error = ?e, "matching engine thread panicked");
		}
	}
}

impl Drop for MatchingEngine {
	fn drop(&mut self) {
		self.shutdown.store(true, Ordering::Relaxed);
		if let Some(handle) = self.thread_handle.take() {
			let _ = handle.join();
		}
	}
}

/// Apply an accepted `order` input: the single handler used both by the
/// live writer loop and by journal replay during recovery, so replay
/// produces byte-identical feed traffic to the original run.
///
/// `order_status{received}` is emitted before `OrderBook::add` runs,
/// because `add` may fully fill the order without ever resting it, and
/// clients still need the acknowledgement to precede any fill or open
/// event for the same id.
pub fn apply_order(
	writer: &mut WriterState,
	feed: &FeedPublisher,
	payload: &OrderPayload,
	received_ts: u64,
) -> Result<(), EngineError> {
	debug!(target: "engine", order_id = %payload.id, side = ?payload.side, price = payload.price, size = payload.size, "order received");

	feed.publish(
		"order_status",
		json!({
			"status": "received",
			"side": payload.side,
			"order_id": payload.id,
			"sender": payload.sender,
			"price": payload.price,
			"size": payload.size,
			"exchange_time": received_ts,
		}),
		&mut writer.output_seq,
	);

	let order = Order {
		id: payload.id.clone(),
		sender: payload.sender.clone(),
		side: payload.side,
		price: payload.price,
		size: payload.size,
		done: false,
		received_ts,
	};

	let events = writer.book.add(order)?;

	for event in events {
		publish_book_event(feed, &mut writer.output_seq, event, received_ts);
	}

	Ok(())
}

/// Apply an accepted `cancel` input. Returns `Err` when the caller should
/// reply `cancel_reject`; no feed event is ever emitted in that case.
pub fn apply_cancel(
	writer: &mut WriterState,
	feed: &FeedPublisher,
	payload: &CancelPayload,
) -> Result<(), CancelError> {
	let event = writer.book.remove(&payload.order_id, &payload.sender_id)?;
	publish_book_event(feed, &mut writer.output_seq, event, now_secs());
	Ok(())
}

fn publish_book_event(
	feed: &FeedPublisher,
	output_seq: &mut u64,
	event: BookEvent,
	exchange_time: u64,
) {
	match event {
		BookEvent::AddOrder(order) => {
			feed.publish(
				"order_status",
				json!({
					"status": "open",
					"side": order.side,
					"order_id": order.id,
					"sender": order.sender,
					"price": order.price,
					"size": order.size,
					"exchange_time": exchange_time,
				}),
				output_seq,
			);
		}
		BookEvent::RemoveOrder { order, reason } => {
			feed.publish(
				"order_status",
				json!({
					"status": "done",
					"order_id": order.id,
					"size": order.size,
					"price": order.price,
					"side": order.side,
					"user_id": order.sender,
					"reason": reason_str(reason),
				}),
				output_seq,
			);
		}
		BookEvent::Match {
			match_id,
			taker_id,
			provider_id,
			taker_sender,
			provider_sender,
			size,
			price,
			taker_side,
			taker_original_limit,
			taker_done,
			provider_done,
		} => {
			feed.publish(
				"match",
				json!({
					"id": match_id,
					"taker_id": taker_id,
					"provider_id": provider_id,
					"taker_user_id": taker_sender,
					"provider_user_id": provider_sender,
					"size": size,
					"price": price,
					"taker_side": taker_side,
					"taker_original_limit": taker_original_limit,
					"taker_done": taker_done,
					"provider_done": provider_done,
				}),
				output_seq,
			);
		}
	}
}

fn reason_str(reason: DoneReason) -> &'static str {
	match reason {
		DoneReason::Filled => "filled",
		DoneReason::Cancelled => "cancelled",
	}
}

fn now_secs() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap()
		.as_secs()
}
