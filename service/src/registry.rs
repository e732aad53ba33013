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

//! Connection registry
//!
//! The registry is the single shared table of live connections, keyed by
//! remote address. One lock guards it. Structural changes (add, remove,
//! assign) and whole broadcast traversals both hold that lock, so a broadcast
//! never observes a half-updated table and membership never changes mid
//! broadcast.

use crate::{Connection, ServerMetrics};
use chatline_backend::{Participant, ParticipantMessage, SystemMessage};
use metrics::{counter, gauge};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Result of a broadcast operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastResult {
    /// Deliveries that failed or were cut short
    pub dropped: usize,
    /// Deliveries that wrote the whole message
    pub sent: usize,
}

impl BroadcastResult {
    /// Total number of deliveries attempted
    pub fn total(&self) -> usize {
        self.dropped + self.sent
    }

    /// Check if every delivery succeeded
    pub fn all_succeeded(&self) -> bool {
        self.dropped == 0
    }

    /// Get the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total() == 0 {
            100.0
        } else {
            (self.sent as f64 / self.total() as f64) * 100.0
        }
    }
}

/// Wire format of a participant-authored message
pub fn format_participant_message(message: &ParticipantMessage) -> String {
    format!(
        "[{}:{}]  {}\r\n",
        message.sender, message.time, message.contents
    )
}

/// Wire format of a system message
pub fn format_system_message(message: &SystemMessage) -> String {
    format!("[{}]  {}\r\n", message.time, message.contents)
}

/// Shared table of live connections
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<String, Connection>>,
    metrics: Arc<ServerMetrics>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(Arc::new(ServerMetrics::new()))
    }
}

impl ConnectionRegistry {
    /// Create an empty registry reporting into `metrics`
    pub fn new(metrics: Arc<ServerMetrics>) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    /// Register a connection under its own remote address
    pub async fn add(&self, connection: Connection) {
        let addr = connection.addr().to_string();
        let mut connections = self.connections.lock().await;
        if connections.insert(addr.clone(), connection).is_some() {
            warn!(peer_addr = %addr, "Replaced existing registry entry");
        }
        gauge!("chatline.connections.registered").set(connections.len() as f64);
        debug!(peer_addr = %addr, "Connection registered");
    }

    /// Remove a connection, returning it if it was registered
    pub async fn remove(&self, addr: &str) -> Option<Connection> {
        let mut connections = self.connections.lock().await;
        let removed = connections.remove(addr);
        gauge!("chatline.connections.registered").set(connections.len() as f64);
        if removed.is_some() {
            debug!(peer_addr = %addr, "Connection unregistered");
        }
        removed
    }

    /// Bind a participant to a registered connection and mark it `Connected`
    ///
    /// # Panics
    ///
    /// Panics if no connection is registered under `addr`. Every reader
    /// registers its connection before it can authenticate, so a missing entry
    /// means the registry and the reader have fallen out of step.
    pub async fn assign_participant(&self, addr: &str, participant: Arc<Participant>) {
        let mut connections = self.connections.lock().await;
        let Some(connection) = connections.get_mut(addr) else {
            panic!("connection with address {addr} doesn't exist");
        };

        debug!(peer_addr = %addr, participant = %participant.name, "Participant assigned");
        connection.assign(participant);
    }

    /// Snapshot of a registered connection
    pub async fn get(&self, addr: &str) -> Option<Connection> {
        self.connections.lock().await.get(addr).cloned()
    }

    pub async fn contains(&self, addr: &str) -> bool {
        self.connections.lock().await.contains_key(addr)
    }

    /// Number of registered connections
    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.lock().await.is_empty()
    }

    /// Names of participants bound to `Connected` connections
    pub async fn online_participants(&self) -> Vec<String> {
        let connections = self.connections.lock().await;
        let mut names: Vec<String> = connections
            .values()
            .filter_map(|conn| conn.participant().map(|p| p.name.clone()))
            .collect();
        names.sort();
        names
    }

    /// Deliver an authored message to every other `Connected` connection
    ///
    /// At most one connection whose participant name matches the sender
    /// (ignoring case) is skipped, so the sender does not receive its own
    /// echo while a second session under the same name still does. `Pending`
    /// connections never receive broadcast traffic.
    #[instrument(skip(self, message), fields(sender = %message.sender))]
    pub async fn broadcast_participant_message(
        &self,
        message: &ParticipantMessage,
    ) -> BroadcastResult {
        let payload = format_participant_message(message);
        let mut result = BroadcastResult::default();
        let mut sender_skipped = false;

        let connections = self.connections.lock().await;
        for connection in connections.values() {
            if !connection.state().is_connected() {
                continue;
            }

            let is_sender = connection
                .participant()
                .is_some_and(|p| p.name.eq_ignore_ascii_case(&message.sender));
            if is_sender && !sender_skipped {
                sender_skipped = true;
                continue;
            }

            deliver(connection, payload.as_bytes(), &mut result).await;
        }
        drop(connections);

        self.record(&result);
        result
    }

    /// Deliver a system message
    ///
    /// With a non-empty receive list only the listed, currently registered
    /// addresses receive it; unknown addresses are skipped. Otherwise every
    /// registered connection receives it, whatever its state.
    #[instrument(skip(self, message), fields(receivers = message.receive_list.len()))]
    pub async fn broadcast_system_message(&self, message: &SystemMessage) -> BroadcastResult {
        let payload = format_system_message(message);
        let mut result = BroadcastResult::default();

        let connections = self.connections.lock().await;
        if message.receive_list.is_empty() {
            for connection in connections.values() {
                deliver(connection, payload.as_bytes(), &mut result).await;
            }
        } else {
            for receiver in &message.receive_list {
                if let Some(connection) = connections.get(receiver) {
                    deliver(connection, payload.as_bytes(), &mut result).await;
                }
            }
        }
        drop(connections);

        self.record(&result);
        result
    }

    /// Close every registered connection and clear the table
    pub async fn close_all(&self) {
        let mut connections = self.connections.lock().await;
        for (addr, connection) in connections.drain() {
            if let Err(e) = connection.close().await {
                debug!(peer_addr = %addr, error = %e, "Failed to close connection");
            }
        }
        gauge!("chatline.connections.registered").set(0.0);
    }

    fn record(&self, result: &BroadcastResult) {
        counter!("chatline.broadcast.sent").increment(result.sent as u64);
        counter!("chatline.broadcast.dropped").increment(result.dropped as u64);
        self.metrics.broadcast_completed(result.sent as u64, result.dropped as u64);
    }
}

async fn deliver(connection: &Connection, payload: &[u8], result: &mut BroadcastResult) {
    match connection.write_bytes(payload).await {
        Ok(written) if written == payload.len() => result.sent += 1,
        Ok(written) => {
            warn!(
                peer_addr = %connection.addr(),
                written,
                expected = payload.len(),
                "Short write during broadcast"
            );
            result.dropped += 1;
        }
        Err(e) => {
            debug!(peer_addr = %connection.addr(), error = %e, "Broadcast delivery failed");
            result.dropped += 1;
        }
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry").finish_non_exhaustive()
    }
}
