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

use std::{
	fs::OpenOptions,
	io::Write,
	net::{Ipv4Addr, SocketAddr, UdpSocket},
	path::PathBuf,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	thread::{self, JoinHandle},
};

use tracing::{error, warn};

use super::FeedReceiver;

/// Where the feed thread appends the outbound journal and where it sends
/// multicast datagrams.
#[derive(Debug, Clone)]
pub struct FeedWriterConfig {
	pub outbound_journal_path: PathBuf,
	pub multicast_addr: SocketAddr,
}

/// Consumes envelopes off the feed channel on a dedicated thread: appends
/// each to the outbound journal, then sends it as one multicast datagram.
/// Both steps are fire-and-forget per input — a failure here is logged
/// and the loop continues, it never blocks the writer thread upstream.
pub struct FeedWriter {
	thread_handle: Option<JoinHandle<()>>,
	shutdown: Arc<AtomicBool>,
}

impl FeedWriter {
	pub fn start(receiver: FeedReceiver, config: FeedWriterConfig) -> Self {
		let shutdown = Arc::new(AtomicBool::new(false));
		let shutdown_clone = shutdown.clone();

		let thread_handle = thread::Builder::new()
			.name("feed-writer".to_string())
			.spawn(move || Self::run(receiver, config, shutdown_clone))
			.expect("failed to spawn feed writer thread");

		Self {
			thread_handle: Some(thread_handle),
			shutdown,
		}
	}

	fn run(receiver: FeedReceiver, config: FeedWriterConfig, shutdown: Arc<AtomicBool>) {
		let socket = match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)) {
			Ok(socket) => Some(socket),
			Err(e) => {
				error!(target: "feed", error = %e, "failed to bind feed multicast socket");
				None
			}
		};

		while let Some(envelope) = receiver.recv() {
			if shutdown.load(Ordering::Relaxed) {
				break;
			}

			match serde_json::to_vec(&envelope) {
				Ok(bytes) => {
					if let Err(e) = append_line(&config.outbound_journal_path, &bytes) {
						warn!(target: "feed", seq = envelope.seq, error = %e, "outbound journal append failed");
					}
					if let Some(socket) = &socket
						&& let Err(e) = socket.send_to(&bytes, config.multicast_addr)
					{
						warn!(target: "feed", seq = envelope.seq, error = %e, "multicast send failed");
					}
				}
				Err(e) => {
					warn!(target: "feed", seq = envelope.seq, error = %e, "failed to serialize feed envelope");
				}
			}
		}
	}

	pub fn shutdown(mut self) {
		self.shutdown.store(true, Ordering::Relaxed);
		if let Some(handle) = self.thread_handle.take()
			&& let Err(e) = handle.join()
		{
			warn!(target: "feed", error = ?e, "feed writer thread panicked");
		}
	}
}

fn append_line(path: &std::path::Path, bytes: &[u8]) -> std::io::Result<()> {
	if let Some(parent) = path.parent()
		&& !parent.as_os_str().is_empty()
	{
		std::fs::create_dir_all(parent)?;
	}
	let mut file = OpenOptions::new().create(true).append(true).open(path)?;
	file.write_all(bytes)?;
	file.write_all(b"\n")?;
	file.flush()
}
