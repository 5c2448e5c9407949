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

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use tokio::{
	io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
	net::TcpStream,
	sync::mpsc::{self, UnboundedSender},
};
use tracing::{error, warn};

use crate::journal::SharedJournal;
use crate::queue::{IngressJob, QueueSender};
use crate::types::{CancelPayload, InboundEnvelope, InboundJournalRecord, OrderPayload, ReplyEnvelope};

/// Drive one client connection: decode newline-delimited `{type, payload}`
/// frames, journal state-affecting input durably, then enqueue it for the
/// writer. A per-connection reply sink carries back `cancel_reject` and
/// `state` bodies; it never carries feed traffic.
pub async fn handle(socket: TcpStream, queue_sender: QueueSender, journal: SharedJournal) -> Result<()> {
	let (read_half, mut write_half) = socket.into_split();
	let mut lines = BufReader::new(read_half).lines();

	let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<ReplyEnvelope>();

	let writer_task = tokio::spawn(async move {
		while let Some(envelope) = reply_rx.recv().await {
			match serde_json::to_vec(&envelope) {
				Ok(mut bytes) => {
					bytes.push(b'\n');
					if write_half.write_all(&bytes).await.is_err() {
						break;
					}
				}
				Err(e) => warn!(target: "pipeline", error = %e, "failed to serialize reply"),
			}
		}
	});

	while let Some(line) = lines.next_line().await? {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		let envelope: InboundEnvelope = match serde_json::from_str(line) {
			Ok(e) => e,
			Err(e) => {
				warn!(target: "pipeline", error = %e, "failed to decode inbound frame, dropping");
				continue;
			}
		};

		match envelope.kind.as_str() {
			"order" => {
				handle_order(envelope, &journal, &queue_sender).await;
			}
			"cancel" => {
				handle_cancel(envelope, &journal, &queue_sender, reply_tx.clone()).await;
			}
			"state" => {
				if enqueue_blocking(
					&queue_sender,
					IngressJob::State {
						reply: reply_tx.clone(),
					},
				)
				.await
				.is_err()
				{
					error!(target: "pipeline", "ingress queue disconnected, writer appears to have stopped");
				}
			}
			other => {
				warn!(target: "pipeline", kind = %other, "unknown message type, dropping");
			}
		}
	}

	drop(reply_tx);
	let _ = writer_task.await;
	Ok(())
}

async fn handle_order(envelope: InboundEnvelope, journal: &SharedJournal, queue_sender: &QueueSender) {
	let Some(raw) = envelope.payload else {
		warn!(target: "pipeline", "order message missing payload, dropping");
		return;
	};
	let payload: OrderPayload = match serde_json::from_value(raw) {
		Ok(p) => p,
		Err(e) => {
			warn!(target: "pipeline", error = %e, "order payload did not parse, dropping");
			return;
		}
	};

	// Zero- or negative-sized and zero-priced orders are rejected upstream
	// of the book: `OrderBook::add` treats either as a fatal invariant
	// violation and the writer loop stops on it, so this must never reach
	// the journal or the writer in the first place.
	if payload.price == 0 || payload.size == 0 {
		warn!(
			target: "pipeline",
			order_id = %payload.id,
			price = payload.price,
			size = payload.size,
			"order payload has zero price or size, dropping"
		);
		return;
	}

	let received_ts = now_millis();
	let record = InboundJournalRecord::Order {
		payload: payload.clone(),
		received_ts,
	};

	if let Err(e) = append_durably(journal, record).await {
		error!(target: "pipeline", order_id = %payload.id, error = %e, "journal append failed, dropping order");
		return;
	}

	let order_id = payload.id.clone();
	if enqueue_blocking(
		queue_sender,
		IngressJob::Order {
			payload,
			received_ts,
		},
	)
	.await
	.is_err()
	{
		error!(
			target: "pipeline",
			order_id = %order_id,
			"ingress queue disconnected after durable journal append; writer appears to have stopped"
		);
	}
}

async fn handle_cancel(
	envelope: InboundEnvelope,
	journal: &SharedJournal,
	queue_sender: &QueueSender,
	reply: UnboundedSender<ReplyEnvelope>,
) {
	let Some(raw) = envelope.payload else {
		warn!(target: "pipeline", "cancel message missing payload, dropping");
		return;
	};
	let payload: CancelPayload = match serde_json::from_value(raw) {
		Ok(p) => p,
		Err(e) => {
			warn!(target: "pipeline", error = %e, "cancel payload did not parse, dropping");
			return;
		}
	};

	let record = InboundJournalRecord::Cancel {
		payload: payload.clone(),
	};

	if let Err(e) = append_durably(journal, record).await {
		error!(target: "pipeline", order_id = %payload.order_id, error = %e, "journal append failed, dropping cancel");
		return;
	}

	let order_id = payload.order_id.clone();
	if enqueue_blocking(queue_sender, IngressJob::Cancel { payload, reply })
		.await
		.is_err()
	{
		error!(
			target: "pipeline",
			order_id = %order_id,
			"ingress queue disconnected after durable journal append; writer appears to have stopped"
		);
	}
}

/// Hand a job already made durable by a journal append to the writer,
/// blocking until there's room rather than dropping it. A full queue is
/// the writer's own apply loop running behind, which is the back-pressure
/// signal it's supposed to produce; only a disconnected writer is an
/// actual failure. The blocking send runs off the tokio runtime so it
/// never stalls other connections' tasks.
async fn enqueue_blocking(
	queue_sender: &QueueSender,
	job: IngressJob,
) -> Result<(), crate::queue::QueueError> {
	let queue_sender = queue_sender.clone();
	tokio::task::spawn_blocking(move || queue_sender.enqueue(job))
		.await
		.expect("ingress enqueue task panicked")
}

async fn append_durably(
	journal: &SharedJournal,
	record: InboundJournalRecord,
) -> Result<(), crate::journal::JournalError> {
	let journal = journal.clone();
	tokio::task::spawn_blocking(move || journal.lock().expect("journal mutex poisoned").append(&record))
		.await
		.expect("journal append task panicked")
}

fn now_millis() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap()
		.as_millis() as u64
}
