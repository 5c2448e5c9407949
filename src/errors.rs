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

use thiserror::Error;

/// Fatal errors that can stop the single writer.
///
/// Anything surfaced here aborts the matching loop or refuses to start the
/// engine; non-fatal conditions (cancel reject, unknown message, feed send
/// failure) are handled locally where they occur and never reach this type.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("invariant violation in order book: {0}")]
	InvariantViolation(String),

	#[error("inbound journal append failed: {0}")]
	JournalAppendFailed(String),

	#[error("inbound journal read failed: {0}")]
	JournalRead(String),

	#[error("state directory read failed: {0}")]
	StateDirRead(String),

	#[error("state file read failed: {0}")]
	StateFileRead(String),
}

/// Failure modes for `OrderBook::remove`.
///
/// Both are reported to the caller, never published to the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CancelError {
	#[error("order not found")]
	NotFound,
	#[error("sender does not own this order")]
	NotOwner,
}

impl CancelError {
	pub fn reject_reason(self) -> &'static str {
		match self {
			CancelError::NotFound => "not found",
			CancelError::NotOwner => "not owner",
		}
	}
}
