//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Connection handle
//!
//! A [`Connection`] is the write side of one accepted transport together with
//! its registration state. Handles are cheap to clone: the registry keeps one,
//! the owning reader and its idle supervisor keep others, and all of them share
//! the same underlying writer.
//!
//! Closing fires a cancellation token that sits outside the writer lock, so a
//! write stalled on a peer that stopped reading is abandoned and releases the
//! lock before the transport is shut down.

use crate::{ChatError, ConnectionState, Result};
use chatline_backend::Participant;
use metrics::counter;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::select;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

/// Type-erased write half of a transport
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Handle to one live connection
#[derive(Clone)]
pub struct Connection {
    addr: String,
    writer: Arc<Mutex<BoxedWriter>>,
    state: ConnectionState,
    participant: Option<Arc<Participant>>,
    closed: Arc<AtomicBool>,
    cancel: CancellationToken,
    created_at: Instant,
    bytes_sent: Arc<AtomicU64>,
}

impl Connection {
    /// Wrap the write half of a transport accepted from `addr`
    pub fn new<W>(addr: impl Into<String>, writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            addr: addr.into(),
            writer: Arc::new(Mutex::new(Box::new(writer))),
            state: ConnectionState::Pending,
            participant: None,
            closed: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            created_at: Instant::now(),
            bytes_sent: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Remote address, also the registry key
    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_state(&self, state: ConnectionState) -> bool {
        self.state == state
    }

    /// Participant bound to this connection, if any
    pub fn participant(&self) -> Option<&Arc<Participant>> {
        self.participant.as_ref()
    }

    /// Get when the connection was created
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Total bytes written through any handle of this connection
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Bind a participant and promote the connection to `Connected`
    pub(crate) fn assign(&mut self, participant: Arc<Participant>) {
        self.participant = Some(participant);
        self.state = ConnectionState::Connected;
    }

    /// Write the whole payload, retrying partial writes
    ///
    /// Returns the number of bytes written, which equals `contents.len()` on
    /// success. A write that makes no progress is reported as
    /// [`io::ErrorKind::WriteZero`]. A write still pending when the
    /// connection is closed fails with [`io::ErrorKind::NotConnected`].
    pub async fn write_bytes(&self, contents: &[u8]) -> io::Result<usize> {
        if self.is_closed() {
            return Err(not_connected());
        }

        let written = select! {
            biased;

            () = self.cancel.cancelled() => return Err(not_connected()),
            result = self.write_locked(contents) => result?,
        };

        self.bytes_sent.fetch_add(written as u64, Ordering::Relaxed);
        trace!(peer_addr = %self.addr, bytes = written, "Bytes written");
        Ok(written)
    }

    async fn write_locked(&self, contents: &[u8]) -> io::Result<usize> {
        let mut writer = self.writer.lock().await;
        let mut written = 0;
        while written < contents.len() {
            let n = writer.write(&contents[written..]).await?;
            if n == 0 {
                return Err(io::Error::from(io::ErrorKind::WriteZero));
            }
            written += n;
        }
        writer.flush().await?;
        Ok(written)
    }

    /// Send a line of text, terminating it with CRLF if needed
    pub async fn send_line(&self, text: &str) -> Result<()> {
        let mut line = String::with_capacity(text.len() + 2);
        line.push_str(text);
        if !line.ends_with("\r\n") {
            line.push_str("\r\n");
        }
        self.send_text(&line).await
    }

    /// Send text verbatim
    pub async fn send_text(&self, text: &str) -> Result<()> {
        if self.is_closed() {
            return Err(ChatError::ConnectionClosed);
        }
        self.write_bytes(text.as_bytes()).await?;
        Ok(())
    }

    /// Shut the transport down
    ///
    /// Idempotent: only the first call touches the transport. Pending writes
    /// on other handles are cancelled before the writer lock is taken.
    #[instrument(skip(self), fields(peer_addr = %self.addr))]
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        debug!("Closing connection");
        counter!("chatline.connections.closed").increment(1);
        self.cancel.cancel();
        self.writer.lock().await.shutdown().await?;
        Ok(())
    }
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "connection closed")
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("addr", &self.addr)
            .field("state", &self.state)
            .field(
                "participant",
                &self.participant.as_ref().map(|p| p.name.as_str()),
            )
            .field("closed", &self.is_closed())
            .finish()
    }
}
