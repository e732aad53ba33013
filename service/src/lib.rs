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

//! Chatline Session Engine
//!
//! Everything between an accepted socket and the backend store: the
//! per-connection [`Reader`] state machine, the [`IdleSupervisor`] that runs
//! beside it, the shared [`ConnectionRegistry`] with its broadcast fan-out,
//! and the [`ChatServer`] accept loop tying them together.
//!
//! # Architecture
//!
//! ```text
//! ChatServer
//!     ↓ accept + split
//! Reader ──────→ ConnectionRegistry ──→ Connection (write half)
//!   ↑ idle / abort / quit
//! IdleSupervisor
//! ```
//!
//! # Example
//!
//! ```no_run
//! use chatline_backend::MemoryBackend;
//! use chatline_service::{ChatServer, ServerConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new("0.0.0.0:5000".parse()?)
//!         .with_idle_timeout(Duration::from_secs(120));
//!     let server = ChatServer::new(config, Arc::new(MemoryBackend::new())).await?;
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod error;
mod metrics;
mod reader;
mod registry;
mod server;
mod supervisor;
mod types;
pub mod validation;

#[cfg(test)]
mod testing;

pub use crate::metrics::{MetricsSnapshot, ServerMetrics};
pub use config::ServerConfig;
pub use connection::{BoxedWriter, Connection};
pub use error::{ChatError, Result};
pub use reader::{DisconnectReason, Reader, SessionContext};
pub use registry::{
    BroadcastResult, ConnectionRegistry, format_participant_message, format_system_message,
};
pub use server::ChatServer;
pub use supervisor::{IdleSupervisor, SupervisorExit, SupervisorHandle};
pub use types::{ConnectionState, MenuOption, ReaderState, ReaderSubstate, ServerSnapshot};
