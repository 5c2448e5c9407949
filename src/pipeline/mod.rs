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

//! The single-writer message pipeline's client-facing half: accepts
//! connections, decodes inbound frames, journals state-affecting input,
//! and hands it to the matching loop. Everything downstream of the
//! journal append is the one logical writer; everything here runs
//! concurrently across however many connections are open.

mod connection;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::journal::SharedJournal;
use crate::queue::QueueSender;

/// Accept connections on an already-bound listener until the process is
/// asked to shut down. Each connection gets its own read/dispatch loop and
/// its own reply sink; nothing here is shared state except the queue
/// sender and the journal handle, both of which are cheap to clone.
///
/// The listener is bound by the caller rather than from an address here,
/// so a test can bind to an ephemeral port and read back the assigned
/// address before this starts accepting.
pub async fn run(listener: TcpListener, queue_sender: QueueSender, journal: SharedJournal) -> anyhow::Result<()> {
	let local_addr = listener.local_addr()?;
	info!(target: "pipeline", addr = %local_addr, "client listener started");

	loop {
		let (socket, peer) = listener.accept().await?;
		let queue_sender = queue_sender.clone();
		let journal = journal.clone();

		tokio::spawn(async move {
			info!(target: "pipeline", %peer, "connection accepted");
			if let Err(e) = connection::handle(socket, queue_sender, journal).await {
				error!(target: "pipeline", %peer, error = %e, "connection ended with error");
			}
			info!(target: "pipeline", %peer, "connection closed");
		});
	}
}
