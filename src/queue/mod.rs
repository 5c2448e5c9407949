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

use crossbeam::channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use tokio::sync::mpsc::UnboundedSender;

use crate::types::{CancelPayload, OrderPayload, ReplyEnvelope};

/// One decoded inbound message, already durably journaled if it is
/// state-affecting, ready for the single writer to apply.
pub enum IngressJob {
	Order {
		payload: OrderPayload,
		received_ts: u64,
	},
	Cancel {
		payload: CancelPayload,
		reply: UnboundedSender<ReplyEnvelope>,
	},
	State {
		reply: UnboundedSender<ReplyEnvelope>,
	},
}

/// Boundary between the multi-threaded connection layer and the
/// single-threaded matching loop. Multiple producers (one per connection),
/// one consumer (the writer thread). Bounded for back-pressure.
pub struct IngressQueue {
	sender: Sender<IngressJob>,
	receiver: Receiver<IngressJob>,
}

impl IngressQueue {
	pub fn new(capacity: usize) -> Self {
		let (sender, receiver) = bounded(capacity);
		Self { sender, receiver }
	}

	pub fn split(self) -> (QueueSender, QueueReceiver) {
		(
			QueueSender {
				sender: self.sender,
			},
			QueueReceiver {
				receiver: self.receiver,
			},
		)
	}
}

#[derive(Clone)]
pub struct QueueSender {
	sender: Sender<IngressJob>,
}

impl QueueSender {
	pub fn try_enqueue(&self, job: IngressJob) -> Result<(), QueueError> {
		self.sender.try_send(job).map_err(|e| match e {
			TrySendError::Full(_) => QueueError::Full,
			TrySendError::Disconnected(_) => QueueError::Disconnected,
		})
	}

	/// Block until the writer has room, or it's gone.
	///
	/// Once an input's journal append has completed, it must reach the
	/// writer — a momentarily full queue is exactly the natural
	/// back-pressure the writer's apply loop slowing down is supposed to
	/// produce, not a reason to drop already-durable input. Only a
	/// disconnected writer is reported as an error.
	pub fn enqueue(&self, job: IngressJob) -> Result<(), QueueError> {
		self.sender.send(job).map_err(|_| QueueError::Disconnected)
	}
}

pub struct QueueReceiver {
	receiver: Receiver<IngressJob>,
}

impl QueueReceiver {
	pub fn try_recv(&self) -> Result<IngressJob, QueueError> {
		self.receiver.try_recv().map_err(|e| match e {
			TryRecvError::Empty => QueueError::Empty,
			TryRecvError::Disconnected => QueueError::Disconnected,
		})
	}
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
	#[error("queue is full")]
	Full,
	#[error("queue is empty")]
	Empty,
	#[error("queue disconnected")]
	Disconnected,
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::Side;

	fn order_job(id: &str) -> IngressJob {
		IngressJob::Order {
			payload: OrderPayload {
				id: id.to_string(),
				sender: "u1".to_string(),
				side: Side::Buy,
				price: 100,
				size: 1,
			},
			received_ts: 0,
		}
	}

	#[test]
	fn enqueue_and_recv() {
		let queue = IngressQueue::new(4);
		let (sender, receiver) = queue.split();
		sender.try_enqueue(order_job("A")).unwrap();
		assert!(matches!(receiver.try_recv(), Ok(IngressJob::Order { .. })));
	}

	#[test]
	fn full_queue_rejects() {
		let queue = IngressQueue::new(1);
		let (sender, _receiver) = queue.split();
		sender.try_enqueue(order_job("A")).unwrap();
		assert!(matches!(sender.try_enqueue(order_job("B")), Err(QueueError::Full)));
	}
}
