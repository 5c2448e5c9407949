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

use serde::{Deserialize, Serialize};

/// Side of the book an order rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
	Buy,
	Sell,
}

impl Side {
	pub fn opposite(self) -> Side {
		match self {
			Side::Buy => Side::Sell,
			Side::Sell => Side::Buy,
		}
	}
}

/// An order resting in, or passing through, the book.
///
/// Immutable after acceptance except for `size` and `done`. `received_ts`
/// is reporting metadata only; priority within a level is strict arrival
/// order, never timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
	pub id: String,
	pub sender: String,
	pub side: Side,
	pub price: u64,
	pub size: u64,
	pub done: bool,
	pub received_ts: u64,
}

/// Why an order left the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoneReason {
	Filled,
	Cancelled,
}

/// A book-level event emitted by `OrderBook::add` / `OrderBook::remove`.
///
/// This is the `MatchReport` of the design notes: a structured record of
/// what happened, returned by value rather than pushed through a hidden
/// subscription graph.
#[derive(Debug, Clone)]
pub enum BookEvent {
	AddOrder(Order),
	Match {
		match_id: String,
		taker_id: String,
		provider_id: String,
		taker_sender: String,
		provider_sender: String,
		size: u64,
		price: u64,
		taker_side: Side,
		taker_original_limit: u64,
		taker_done: bool,
		provider_done: bool,
	},
	RemoveOrder {
		order: Order,
		reason: DoneReason,
	},
}

/// Payload carried by an inbound `order` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPayload {
	pub id: String,
	pub sender: String,
	pub side: Side,
	pub price: u64,
	pub size: u64,
}

/// Payload carried by an inbound `cancel` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelPayload {
	pub order_id: String,
	pub sender_id: String,
}

/// A raw inbound frame: `{type, payload}`. `payload` is absent for `state`
/// and for message types this engine does not recognize.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEnvelope {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub payload: Option<serde_json::Value>,
}

/// One line of the inbound journal.
///
/// `State` is a marker written immediately before a snapshot is captured;
/// `Order`/`Cancel` carry an accepted client input verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InboundJournalRecord {
	State {
		state_num: u64,
	},
	Order {
		payload: OrderPayload,
		received_ts: u64,
	},
	Cancel {
		payload: CancelPayload,
	},
}

/// The exact envelope published to the feed and mirrored to the outbound
/// journal: `{type, timestamp, seq, payload}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundEnvelope {
	#[serde(rename = "type")]
	pub kind: String,
	pub timestamp: u64,
	pub seq: u64,
	pub payload: serde_json::Value,
}

/// Per-connection reply, used exclusively for synchronous rejects and the
/// `state` request's snapshot body — never for feed traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyEnvelope {
	#[serde(rename = "type")]
	pub kind: String,
	pub timestamp: u64,
	pub target_id: String,
	pub payload: serde_json::Value,
}

/// Snapshot content: a serialized `EngineState` sufficient, with the
/// inbound journal tail, to reconstruct the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStateSnapshot {
	pub state_num: u64,
	pub output_seq: u64,
	pub bids: Vec<Order>,
	pub asks: Vec<Order>,
}
