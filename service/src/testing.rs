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

//! Test transports

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};

const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared view of everything a [`TrickleWriter`] accepted
#[derive(Debug, Clone, Default)]
pub(crate) struct Sink(Arc<Mutex<Vec<u8>>>);

impl Sink {
    pub(crate) fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn text(&self) -> String {
        String::from_utf8(self.contents()).unwrap()
    }
}

/// Writer that accepts at most `chunk` bytes per call
pub(crate) struct TrickleWriter {
    chunk: usize,
    sink: Sink,
}

impl TrickleWriter {
    pub(crate) fn new(chunk: usize) -> (Self, Sink) {
        let sink = Sink::default();
        (
            Self {
                chunk,
                sink: sink.clone(),
            },
            sink,
        )
    }
}

impl AsyncWrite for TrickleWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let n = buf.len().min(self.chunk);
        self.sink.0.lock().unwrap().extend_from_slice(&buf[..n]);
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Writer whose every write fails
pub(crate) struct FailingWriter;

impl AsyncWrite for FailingWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::from(io::ErrorKind::BrokenPipe)))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Client end of an in-memory session
pub(crate) struct TestClient {
    stream: DuplexStream,
    buffer: String,
}

impl TestClient {
    pub(crate) fn new(stream: DuplexStream) -> Self {
        Self {
            stream,
            buffer: String::new(),
        }
    }

    /// Send one line, terminated with CRLF
    pub(crate) async fn send(&mut self, line: &str) {
        self.stream
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .unwrap();
    }

    /// Read until `needle` shows up and return everything up to and including it
    pub(crate) async fn expect(&mut self, needle: &str) -> String {
        loop {
            if let Some(pos) = self.buffer.find(needle) {
                let end = pos + needle.len();
                return self.buffer.drain(..end).collect();
            }
            let n = self.fill().await;
            assert!(n > 0, "stream closed waiting for {needle:?}, got {:?}", self.buffer);
        }
    }

    /// Read until the server closes its side, returning anything left over
    pub(crate) async fn expect_closed(&mut self) -> String {
        while self.fill().await > 0 {}
        std::mem::take(&mut self.buffer)
    }

    /// Drop the write side of the stream so the server sees EOF
    pub(crate) async fn hang_up(&mut self) {
        self.stream.shutdown().await.unwrap();
    }

    async fn fill(&mut self) -> usize {
        let mut chunk = [0u8; 1024];
        let n = tokio::time::timeout(READ_TIMEOUT, self.stream.read(&mut chunk))
            .await
            .expect("timed out waiting for server output")
            .unwrap_or(0);
        self.buffer.push_str(&String::from_utf8_lossy(&chunk[..n]));
        n
    }
}
