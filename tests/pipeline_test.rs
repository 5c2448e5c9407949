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

//! Exercises the real pipeline over a socket: a `TcpListener`, the accept
//! loop, newline-JSON frame decoding and the journal-before-enqueue
//! sequencing, end to end through a live `MatchingEngine`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use lob_matcher::engine::{EngineConfig, MatchingEngine};
use lob_matcher::feed::FeedPublisher;
use lob_matcher::journal::{FileInboundJournal, SharedJournal};
use lob_matcher::queue::IngressQueue;
use lob_matcher::snapshot::FileSnapshotStorage;
use lob_matcher::{engine::WriterState, pipeline};

async fn send_line(stream: &mut TcpStream, line: &str) {
	stream.write_all(line.as_bytes()).await.unwrap();
	stream.write_all(b"\n").await.unwrap();
}

#[tokio::test]
async fn s4_wrong_owner_cancel_over_the_wire_gets_cancel_reject_on_the_same_connection() {
	let dir = tempfile::tempdir().unwrap();
	let journal_path = dir.path().join("matcher.BTC-USD.log");
	let journal = FileInboundJournal::new(&journal_path);
	let shared_journal: SharedJournal = Arc::new(Mutex::new(Box::new(journal)));
	let storage = FileSnapshotStorage::new(dir.path(), "BTC-USD");

	let (feed, _feed_rx) = FeedPublisher::new(64);
	let ingress_queue = IngressQueue::new(64);
	let (queue_sender, queue_receiver) = ingress_queue.split();

	let engine = MatchingEngine::start(
		EngineConfig {
			product: "BTC-USD".to_string(),
		},
		WriterState::fresh(),
		queue_receiver,
		feed,
		shared_journal.clone(),
		storage,
	);

	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	let pipeline_handle = tokio::spawn(pipeline::run(listener, queue_sender, shared_journal));

	let mut stream = tokio::time::timeout(Duration::from_secs(5), TcpStream::connect(addr))
		.await
		.expect("connect timed out")
		.unwrap();

	send_line(
		&mut stream,
		r#"{"type":"order","payload":{"id":"A","sender":"u1","side":"buy","price":100,"size":10}}"#,
	)
	.await;
	send_line(
		&mut stream,
		r#"{"type":"cancel","payload":{"order_id":"A","sender_id":"u2"}}"#,
	)
	.await;

	let mut reader = BufReader::new(stream);
	let mut reply_line = String::new();
	tokio::time::timeout(Duration::from_secs(5), reader.read_line(&mut reply_line))
		.await
		.expect("timed out waiting for cancel_reject")
		.unwrap();

	let reply: Value = serde_json::from_str(reply_line.trim()).unwrap();
	assert_eq!(reply["type"], "cancel_reject");
	assert_eq!(reply["target_id"], "u2");
	assert_eq!(reply["payload"]["order_id"], "A");
	assert_eq!(reply["payload"]["reject_reason"], "not owner");

	pipeline_handle.abort();
	engine.shutdown();
}
