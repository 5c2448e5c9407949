// Copyright 2025 chenjjiaa
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

use std::collections::{BTreeMap, HashMap, VecDeque};

use uuid::Uuid;

use crate::errors::{CancelError, EngineError};
use crate::types::{BookEvent, DoneReason, EngineStateSnapshot, Order, Side};

/// Price-time-priority limit order book for one product.
///
/// Each side is a `BTreeMap<price, VecDeque<Order>>`: the map keeps price
/// levels sorted, and the deque keeps arrival order within a level. The
/// best bid is the map's last key, the best ask its first — no separate
/// index or linear scan is needed to find either.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
	bids: BTreeMap<u64, VecDeque<Order>>,
	asks: BTreeMap<u64, VecDeque<Order>>,
	index: HashMap<String, (Side, u64)>,
}

impl OrderBook {
	pub fn new() -> Self {
		Self::default()
	}

	fn levels(&self, side: Side) -> &BTreeMap<u64, VecDeque<Order>> {
		match side {
			Side::Buy => &self.bids,
			Side::Sell => &self.asks,
		}
	}

	fn levels_mut(&mut self, side: Side) -> &mut BTreeMap<u64, VecDeque<Order>> {
		match side {
			Side::Buy => &mut self.bids,
			Side::Sell => &mut self.asks,
		}
	}

	pub fn best_bid(&self) -> Option<u64> {
		self.bids.keys().next_back().copied()
	}

	pub fn best_ask(&self) -> Option<u64> {
		self.asks.keys().next().copied()
	}

	/// Insert `order` and, if crossable, match it immediately.
	///
	/// Returns the sequence of book events produced: zero or more `Match`
	/// events (each possibly followed by a `RemoveOrder` for the filled
	/// provider), then exactly one of a terminal `RemoveOrder` for the
	/// taker or an `AddOrder` for the taker — never both.
	pub fn add(&mut self, mut taker: Order) -> Result<Vec<BookEvent>, EngineError> {
		if taker.size == 0 {
			return Err(EngineError::InvariantViolation(format!(
				"order {} submitted with zero size",
				taker.id
			)));
		}
		if taker.price == 0 {
			return Err(EngineError::InvariantViolation(format!(
				"order {} submitted with zero price",
				taker.id
			)));
		}
		if self.index.contains_key(&taker.id) {
			return Err(EngineError::InvariantViolation(format!(
				"order id {} already live",
				taker.id
			)));
		}

		let opposite = taker.side.opposite();
		let mut events = Vec::new();

		loop {
			let crossable = match taker.side {
				Side::Buy => self.best_ask().is_some_and(|ask| taker.price >= ask),
				Side::Sell => self.best_bid().is_some_and(|bid| taker.price <= bid),
			};
			if !crossable {
				break;
			}

			let best_price = match taker.side {
				Side::Buy => self.best_ask().expect("crossable implies a best ask"),
				Side::Sell => self.best_bid().expect("crossable implies a best bid"),
			};
			let level = self
				.levels_mut(opposite)
				.get_mut(&best_price)
				.expect("best price must index a live level");
			let mut provider = level.pop_front().expect("live level is never empty");

			let trade_size = taker.size.min(provider.size);
			let trade_price = provider.price;

			taker.size -= trade_size;
			provider.size -= trade_size;

			let taker_done_now = taker.size == 0;
			let provider_done_now = provider.size == 0;

			events.push(BookEvent::Match {
				match_id: Uuid::new_v4().simple().to_string(),
				taker_id: taker.id.clone(),
				provider_id: provider.id.clone(),
				taker_sender: taker.sender.clone(),
				provider_sender: provider.sender.clone(),
				size: trade_size,
				price: trade_price,
				taker_side: taker.side,
				taker_original_limit: taker.price,
				taker_done: taker_done_now,
				provider_done: provider_done_now,
			});

			if provider_done_now {
				provider.done = true;
				self.index.remove(&provider.id);
				events.push(BookEvent::RemoveOrder {
					order: provider,
					reason: DoneReason::Filled,
				});
			} else {
				level.push_front(provider);
			}

			let level_is_empty = self
				.levels_mut(opposite)
				.get(&best_price)
				.is_none_or(|level| level.is_empty());
			if level_is_empty {
				self.levels_mut(opposite).remove(&best_price);
			}

			if taker_done_now {
				taker.done = true;
				events.push(BookEvent::RemoveOrder {
					order: taker,
					reason: DoneReason::Filled,
				});
				return Ok(events);
			}
		}

		self.insert_resting(taker.clone());
		events.push(BookEvent::AddOrder(taker));
		Ok(events)
	}

	/// Cancel a resting order on behalf of `sender`.
	///
	/// Succeeds only if `order_id` is live and owned by `sender`; mutates
	/// nothing and emits nothing on failure.
	pub fn remove(&mut self, order_id: &str, sender: &str) -> Result<BookEvent, CancelError> {
		let (side, price) = *self.index.get(order_id).ok_or(CancelError::NotFound)?;
		let level = self
			.levels_mut(side)
			.get_mut(&price)
			.expect("index entry must reference a live level");
		let pos = level
			.iter()
			.position(|o| o.id == order_id)
			.expect("index entry must reference a live order");

		if level[pos].sender != sender {
			return Err(CancelError::NotOwner);
		}

		let mut order = level.remove(pos).expect("position just located");
		order.done = true;

		if level.is_empty() {
			self.levels_mut(side).remove(&price);
		}
		self.index.remove(order_id);

		Ok(BookEvent::RemoveOrder {
			order,
			reason: DoneReason::Cancelled,
		})
	}

	/// Insert an order that is already known to be uncrossed, bypassing
	/// matching. Used only when restoring a snapshot: by invariant the
	/// persisted book was at rest when captured.
	pub fn insert_resting(&mut self, order: Order) {
		let side = order.side;
		let price = order.price;
		self.levels_mut(side)
			.entry(price)
			.or_default()
			.push_back(order.clone());
		self.index.insert(order.id, (side, price));
	}

	/// Serializable view of both sides in priority order, for snapshotting.
	pub fn bids_in_priority_order(&self) -> Vec<Order> {
		self.bids
			.iter()
			.rev()
			.flat_map(|(_, level)| level.iter().cloned())
			.collect()
	}

	pub fn asks_in_priority_order(&self) -> Vec<Order> {
		self.asks
			.iter()
			.flat_map(|(_, level)| level.iter().cloned())
			.collect()
	}

	pub fn state(&self, state_num: u64, output_seq: u64) -> EngineStateSnapshot {
		EngineStateSnapshot {
			state_num,
			output_seq,
			bids: self.bids_in_priority_order(),
			asks: self.asks_in_priority_order(),
		}
	}

	#[cfg(test)]
	pub fn level_len(&self, side: Side, price: u64) -> usize {
		self.levels(side).get(&price).map_or(0, VecDeque::len)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn order(id: &str, sender: &str, side: Side, price: u64, size: u64) -> Order {
		Order {
			id: id.to_string(),
			sender: sender.to_string(),
			side,
			price,
			size,
			done: false,
			received_ts: 0,
		}
	}

	#[test]
	fn resting_order_has_no_crossed_book() {
		let mut book = OrderBook::new();
		let events = book.add(order("A", "u1", Side::Buy, 100, 10)).unwrap();
		assert_eq!(events.len(), 1);
		assert!(matches!(events[0], BookEvent::AddOrder(_)));
		assert_eq!(book.best_bid(), Some(100));
		assert_eq!(book.best_ask(), None);
	}

	#[test]
	fn partial_fill_leaves_provider_resting() {
		let mut book = OrderBook::new();
		book.add(order("A", "u1", Side::Buy, 100, 10)).unwrap();
		let events = book.add(order("B", "u2", Side::Sell, 100, 4)).unwrap();

		assert_eq!(events.len(), 2);
		assert!(matches!(events[0], BookEvent::Match { size: 4, .. }));
		assert!(matches!(
			events[1],
			BookEvent::RemoveOrder {
				reason: DoneReason::Filled,
				..
			}
		));
		assert_eq!(book.level_len(Side::Buy, 100), 1);
	}

	#[test]
	fn cancel_by_wrong_owner_is_rejected_without_mutation() {
		let mut book = OrderBook::new();
		book.add(order("A", "u1", Side::Buy, 100, 10)).unwrap();

		let err = book.remove("A", "u2").unwrap_err();
		assert_eq!(err, CancelError::NotOwner);
		assert_eq!(book.best_bid(), Some(100));
	}

	#[test]
	fn price_time_priority_matches_oldest_first() {
		let mut book = OrderBook::new();
		book.add(order("A", "u1", Side::Buy, 100, 5)).unwrap();
		book.add(order("B", "u1", Side::Buy, 100, 5)).unwrap();
		let events = book.add(order("C", "u2", Side::Sell, 100, 7)).unwrap();

		let matches: Vec<_> = events
			.iter()
			.filter_map(|e| match e {
				BookEvent::Match {
					provider_id, size, ..
				} => Some((provider_id.clone(), *size)),
				_ => None,
			})
			.collect();

		assert_eq!(
			matches,
			vec![("A".to_string(), 5), ("B".to_string(), 2)]
		);
		assert_eq!(book.level_len(Side::Buy, 100), 1);
	}

	#[test]
	fn duplicate_order_id_is_an_invariant_violation() {
		let mut book = OrderBook::new();
		book.add(order("A", "u1", Side::Buy, 100, 5)).unwrap();
		let err = book.add(order("A", "u2", Side::Sell, 100, 5));
		assert!(matches!(err, Err(EngineError::InvariantViolation(_))));
	}
}
