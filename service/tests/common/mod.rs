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

//! Shared helpers for the service integration tests

#![allow(dead_code)]

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const PASSWORD: &str = "Secret#2024x";
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Line-oriented client over any byte stream
pub struct LineClient<S> {
    stream: S,
    buffer: String,
}

impl<S> LineClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: String::new(),
        }
    }

    pub async fn send(&mut self, line: &str) {
        self.stream
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .unwrap();
    }

    /// Read until `needle` shows up and return everything up to and including it
    pub async fn expect(&mut self, needle: &str) -> String {
        loop {
            if let Some(pos) = self.buffer.find(needle) {
                let end = pos + needle.len();
                return self.buffer.drain(..end).collect();
            }
            let n = self.fill().await;
            assert!(n > 0, "stream closed waiting for {needle:?}, got {:?}", self.buffer);
        }
    }

    /// Read until the server closes its side
    pub async fn expect_closed(&mut self) -> String {
        while self.fill().await > 0 {}
        std::mem::take(&mut self.buffer)
    }

    /// Register a new participant starting from a freshly shown menu
    pub async fn register(&mut self, name: &str) {
        self.expect("[5] List channels\r\n").await;
        self.send("1").await;
        self.expect("name: ").await;
        self.send(name).await;
        self.expect("password: ").await;
        self.send(PASSWORD).await;
        self.expect("email: ").await;
        self.send(&format!("{name}@example.com")).await;
        self.expect(&format!("{name} joined the chat\r\n")).await;
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
