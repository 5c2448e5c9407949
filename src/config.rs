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

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Matching engine configuration: one product, one writer, one set of
/// listen/publish addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
	/// Inbound client listen address (length-delimited JSON lines over TCP).
	pub client_addr: SocketAddr,
	/// Outbound multicast feed address.
	pub feed_addr: SocketAddr,
	/// Product identifier; also the suffix on every persisted file name.
	pub product: String,
	/// Directory holding snapshots and the inbound/outbound journals.
	pub log_dir: PathBuf,
	/// Skip snapshot load and journal replay entirely on startup; for a
	/// fresh cold boot of a new product only.
	#[serde(default)]
	pub no_recover: bool,
}

impl Default for MatchingConfig {
	fn default() -> Self {
		Self {
			client_addr: "0.0.0.0:7000".parse().unwrap(),
			feed_addr: "239.1.1.1:7001".parse().unwrap(),
			product: "BTC-USD".to_string(),
			log_dir: PathBuf::from("logs"),
			no_recover: false,
		}
	}
}

impl MatchingConfig {
	/// Load configuration from `MATCHING_*` environment variables.
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::Config::try_from(&Self::default())?)
			.add_source(config::Environment::with_prefix("MATCHING"))
			.build()?;

		cfg.try_deserialize()
	}

	/// Load configuration from a file, overridable by `MATCHING_*` environment
	/// variables.
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::Config::try_from(&Self::default())?)
			.add_source(config::File::with_name(path))
			.add_source(config::Environment::with_prefix("MATCHING"))
			.build()?;

		cfg.try_deserialize()
	}
}
