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

//! Matching engine process entry point: loads configuration, recovers
//! state from the last snapshot and journal tail, then starts the feed
//! writer, the writer thread, and the client listener.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::signal;
use tracing::info;

use lob_matcher::config::MatchingConfig;
use lob_matcher::engine::{EngineConfig, MatchingEngine};
use lob_matcher::feed::{FeedPublisher, FeedWriter, FeedWriterConfig};
use lob_matcher::journal::FileInboundJournal;
use lob_matcher::queue::IngressQueue;
use lob_matcher::snapshot::{self, FileSnapshotStorage};
use lob_matcher::{logging, pipeline, recovery};

const INGRESS_QUEUE_CAPACITY: usize = 4096;
const FEED_CHANNEL_CAPACITY: usize = 4096;

#[tokio::main]
async fn main() -> Result<()> {
	logging::init_logging()?;

	let config = MatchingConfig::from_env().unwrap_or_else(|e| {
		tracing::warn!(target: "main", error = %e, "failed to load configuration from environment, using defaults");
		MatchingConfig::default()
	});

	info!(target: "main", product = %config.product, client_addr = %config.client_addr, feed_addr = %config.feed_addr, "starting matching engine");

	let journal_path = config.log_dir.join(format!("matcher.{}.log", config.product));
	let outbound_journal_path = config.log_dir.join(format!("matcher_out.{}.log", config.product));
	let snapshot_storage = FileSnapshotStorage::new(&config.log_dir, &config.product);

	let (feed, feed_receiver) = FeedPublisher::new(FEED_CHANNEL_CAPACITY);

	let recovery_journal = FileInboundJournal::new(&journal_path);
	let writer_state = recovery::recover(config.no_recover, &snapshot_storage, &recovery_journal, &feed)?;

	// A fresh snapshot is always written before the engine begins accepting
	// clients, so the journal marker for the current state_num exists before
	// any new input can be journaled against it.
	let shared_journal: lob_matcher::journal::SharedJournal = Arc::new(Mutex::new(Box::new(recovery_journal)));
	let mut startup_writer = writer_state;
	{
		let mut journal = shared_journal.lock().expect("journal mutex poisoned");
		snapshot::write_state(&mut startup_writer, &mut **journal, &snapshot_storage)?;
	}

	let feed_writer = FeedWriter::start(
		feed_receiver,
		FeedWriterConfig {
			outbound_journal_path,
			multicast_addr: config.feed_addr,
		},
	);

	let ingress_queue = IngressQueue::new(INGRESS_QUEUE_CAPACITY);
	let (queue_sender, queue_receiver) = ingress_queue.split();

	let engine = MatchingEngine::start(
		EngineConfig {
			product: config.product.clone(),
		},
		startup_writer,
		queue_receiver,
		feed.clone(),
		shared_journal.clone(),
		snapshot_storage,
	);

	let client_listener = tokio::net::TcpListener::bind(config.client_addr).await?;
	let pipeline_journal = shared_journal.clone();
	let pipeline_handle = tokio::spawn(async move {
		if let Err(e) = pipeline::run(client_listener, queue_sender, pipeline_journal).await {
			tracing::error!(target: "main", error = %e, "client pipeline exited");
		}
	});

	signal::ctrl_c().await?;
	info!(target: "main", "shutdown signal received");

	pipeline_handle.abort();
	engine.shutdown();
	feed_writer.shutdown();

	Ok(())
}
