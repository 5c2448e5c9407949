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

//! A single-product limit order book matching engine: price-time priority
//! matching, a durable inbound journal for crash recovery, and a
//! sequenced outbound feed of order status and match events.

pub mod config;
pub mod engine;
pub mod errors;
pub mod feed;
pub mod journal;
pub mod logging;
pub mod orderbook;
pub mod pipeline;
pub mod queue;
pub mod recovery;
pub mod snapshot;
pub mod types;

pub use config::MatchingConfig;
pub use engine::{EngineConfig, MatchingEngine};
pub use errors::{CancelError, EngineError};
pub use orderbook::OrderBook;
