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

use lob_matcher::engine::state::WriterState;
use lob_matcher::engine::{apply_cancel, apply_order};
use lob_matcher::feed::FeedPublisher;
use lob_matcher::types::{CancelPayload, OrderPayload, Side};

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
fn s1_resting_order_emits_received_then_open() {
	let mut writer = WriterState::fresh();
	let (feed, rx) = FeedPublisher::new(16);

	apply_order(&mut writer, &feed, &order("A", "u1", Side::Buy, 100, 10), 1).unwrap();

	let received = rx.recv().unwrap();
	assert_eq!(received.kind, "order_status");
	assert_eq!(received.payload["status"], "received");

	let open = rx.recv().unwrap();
	assert_eq!(open.kind, "order_status");
	assert_eq!(open.payload["status"], "open");
	assert_eq!(open.payload["order_id"], "A");

	assert_eq!(writer.book.bids_in_priority_order().len(), 1);
}

#[test]
fn s2_partial_fill_emits_received_match_done() {
	let mut writer = WriterState::fresh();
	let (feed, rx) = FeedPublisher::new(16);

	apply_order(&mut writer, &feed, &order("A", "u1", Side::Buy, 100, 10), 1).unwrap();
	rx.recv().unwrap(); // received(A)
	rx.recv().unwrap(); // open(A)

	apply_order(&mut writer, &feed, &order("B", "u2", Side::Sell, 100, 4), 2).unwrap();

	let received_b = rx.recv().unwrap();
	assert_eq!(received_b.payload["status"], "received");
	assert_eq!(received_b.payload["order_id"], "B");

	let matched = rx.recv().unwrap();
	assert_eq!(matched.kind, "match");
	assert_eq!(matched.payload["provider_id"], "A");
	assert_eq!(matched.payload["taker_id"], "B");
	assert_eq!(matched.payload["size"], 4);
	assert_eq!(matched.payload["taker_done"], true);
	assert_eq!(matched.payload["provider_done"], false);

	let done_b = rx.recv().unwrap();
	assert_eq!(done_b.payload["status"], "done");
	assert_eq!(done_b.payload["order_id"], "B");
	assert_eq!(done_b.payload["reason"], "filled");

	let a_remaining = writer
		.book
		.bids_in_priority_order()
		.into_iter()
		.find(|o| o.id == "A")
		.unwrap();
	assert_eq!(a_remaining.size, 6);
}

#[test]
fn s3_cancel_emits_done_with_remaining_size() {
	let mut writer = WriterState::fresh();
	let (feed, rx) = FeedPublisher::new(16);

	apply_order(&mut writer, &feed, &order("A", "u1", Side::Buy, 100, 10), 1).unwrap();
	rx.recv().unwrap();
	rx.recv().unwrap();
	apply_order(&mut writer, &feed, &order("B", "u2", Side::Sell, 100, 4), 2).unwrap();
	rx.recv().unwrap();
	rx.recv().unwrap();
	rx.recv().unwrap();

	apply_cancel(
		&mut writer,
		&feed,
		&CancelPayload {
			order_id: "A".to_string(),
			sender_id: "u1".to_string(),
		},
	)
	.unwrap();

	let done = rx.recv().unwrap();
	assert_eq!(done.payload["status"], "done");
	assert_eq!(done.payload["order_id"], "A");
	assert_eq!(done.payload["size"], 6);
	assert_eq!(done.payload["price"], 100);
	assert_eq!(done.payload["reason"], "cancelled");

	assert!(writer.book.bids_in_priority_order().is_empty());
}

#[test]
fn s4_cancel_by_wrong_owner_is_rejected_without_feed_event() {
	let mut writer = WriterState::fresh();
	let (feed, rx) = FeedPublisher::new(16);

	apply_order(&mut writer, &feed, &order("A", "u1", Side::Buy, 100, 10), 1).unwrap();
	rx.recv().unwrap();
	rx.recv().unwrap();

	let err = apply_cancel(
		&mut writer,
		&feed,
		&CancelPayload {
			order_id: "A".to_string(),
			sender_id: "u2".to_string(),
		},
	)
	.unwrap_err();

	assert_eq!(err.reject_reason(), "not owner");
	assert_eq!(writer.book.bids_in_priority_order().len(), 1);
}

#[test]
fn s5_price_time_priority_matches_resting_orders_oldest_first() {
	let mut writer = WriterState::fresh();
	let (feed, rx) = FeedPublisher::new(64);

	apply_order(&mut writer, &feed, &order("A", "u1", Side::Buy, 100, 5), 1).unwrap();
	rx.recv().unwrap();
	rx.recv().unwrap();
	apply_order(&mut writer, &feed, &order("B", "u1", Side::Buy, 100, 5), 2).unwrap();
	rx.recv().unwrap();
	rx.recv().unwrap();

	apply_order(&mut writer, &feed, &order("C", "u2", Side::Sell, 100, 7), 3).unwrap();

	rx.recv().unwrap(); // received(C)
	let match_a = rx.recv().unwrap();
	assert_eq!(match_a.payload["provider_id"], "A");
	assert_eq!(match_a.payload["size"], 5);
	let done_a = rx.recv().unwrap();
	assert_eq!(done_a.payload["order_id"], "A");

	let match_b = rx.recv().unwrap();
	assert_eq!(match_b.payload["provider_id"], "B");
	assert_eq!(match_b.payload["size"], 2);

	let done_c = rx.recv().unwrap();
	assert_eq!(done_c.payload["status"], "done");
	assert_eq!(done_c.payload["order_id"], "C");

	let remaining_b = writer
		.book
		.bids_in_priority_order()
		.into_iter()
		.find(|o| o.id == "B")
		.unwrap();
	assert_eq!(remaining_b.size, 3);
}
