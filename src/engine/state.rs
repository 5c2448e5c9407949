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

use crate::orderbook::OrderBook;

/// The writer's complete state: the book plus the two counters that are
/// captured by snapshots and restored at recovery (`state_num`,
/// `output_seq`). Owned entirely by the matching loop thread.
pub struct WriterState {
	pub book: OrderBook,
	pub state_num: u64,
	pub output_seq: u64,
}

impl WriterState {
	pub fn fresh() -> Self {
		Self {
			book: OrderBook::new(),
			state_num: 0,
			output_seq: 0,
		}
	}
}
