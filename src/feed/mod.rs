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

mod writer;

use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam::channel::{Sender, TrySendError, bounded};
use tracing::warn;

pub use writer::{FeedWriter, FeedWriterConfig};

use crate::types::OutboundEnvelope;

/// Owns the outbound sequence counter's *publication*, not its storage —
/// `output_seq` lives on `WriterState` because it is snapshotted. Publish
/// assigns the next value, hands the envelope to a dedicated feed thread,
/// and returns immediately: neither the outbound journal append nor the
/// multicast send is awaited by the matching loop.
#[derive(Clone)]
pub struct FeedPublisher {
	sender: Sender<OutboundEnvelope>,
}

impl FeedPublisher {
	pub fn new(capacity: usize) -> (Self, FeedReceiver) {
		let (sender, receiver) = bounded(capacity);
		(Self { sender }, FeedReceiver { receiver })
	}

	/// Construct the envelope, assign `*output_seq`, and hand it off.
	///
	/// If the feed thread can't keep up, the envelope is dropped and a
	/// warning logged — state has already advanced and recovery will
	/// republish it on replay, per the back-pressure rule for the feed.
	pub fn publish(&self, kind: &str, payload: serde_json::Value, output_seq: &mut u64) {
		let envelope = OutboundEnvelope {
			kind: kind.to_string(),
			timestamp: now_secs(),
			seq: *output_seq,
			payload,
		};
		*output_seq += 1;

		if let Err(TrySendError::Full(env) | TrySendError::Disconnected(env)) =
			self.sender.try_send(envelope)
		{
			warn!(target: "feed", seq = env.seq, kind = %env.kind, "dropped feed envelope, consumer unavailable");
		}
	}
}

pub struct FeedReceiver {
	receiver: crossbeam::channel::Receiver<OutboundEnvelope>,
}

impl FeedReceiver {
	pub fn recv(&self) -> Option<OutboundEnvelope> {
		self.receiver.recv().ok()
	}
}

fn now_secs() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap()
		.as_secs()
}
