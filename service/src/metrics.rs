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

//! Lock-free counters for the chat server

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free server metrics
///
/// Every counter is an atomic that can be bumped from any session task. Use
/// [`ServerMetrics::snapshot`] for a point-in-time view.
#[derive(Debug)]
pub struct ServerMetrics {
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    rejected_connections: AtomicU64,

    registrations: AtomicU64,
    logins: AtomicU64,
    failed_logins: AtomicU64,

    lines_received: AtomicU64,
    messages_posted: AtomicU64,
    deliveries_sent: AtomicU64,
    deliveries_dropped: AtomicU64,

    command_errors: AtomicU64,
    idle_timeouts: AtomicU64,

    total_session_duration_ns: AtomicU64,
    started_at: Instant,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self {
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            rejected_connections: AtomicU64::new(0),
            registrations: AtomicU64::new(0),
            logins: AtomicU64::new(0),
            failed_logins: AtomicU64::new(0),
            lines_received: AtomicU64::new(0),
            messages_posted: AtomicU64::new(0),
            deliveries_sent: AtomicU64::new(0),
            deliveries_dropped: AtomicU64::new(0),
            command_errors: AtomicU64::new(0),
            idle_timeouts: AtomicU64::new(0),
            total_session_duration_ns: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    // Connection tracking

    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session ending after `duration`
    pub fn connection_closed(&self, duration: Duration) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
        self.total_session_duration_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Record a connection turned away at the limit
    pub fn connection_rejected(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    // Session tracking

    pub fn participant_registered(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn participant_logged_in(&self) {
        self.logins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn login_failed(&self) {
        self.failed_logins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn line_received(&self) {
        self.lines_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_posted(&self) {
        self.messages_posted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one broadcast
    pub fn broadcast_completed(&self, sent: u64, dropped: u64) {
        self.deliveries_sent.fetch_add(sent, Ordering::Relaxed);
        self.deliveries_dropped.fetch_add(dropped, Ordering::Relaxed);
    }

    pub fn command_error(&self) {
        self.command_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn idle_timeout(&self) {
        self.idle_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    // Snapshot

    /// Point-in-time view of all counters
    ///
    /// Counters are read one at a time, so a snapshot taken under load may
    /// straddle concurrent updates.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
            registrations: self.registrations.load(Ordering::Relaxed),
            logins: self.logins.load(Ordering::Relaxed),
            failed_logins: self.failed_logins.load(Ordering::Relaxed),
            lines_received: self.lines_received.load(Ordering::Relaxed),
            messages_posted: self.messages_posted.load(Ordering::Relaxed),
            deliveries_sent: self.deliveries_sent.load(Ordering::Relaxed),
            deliveries_dropped: self.deliveries_dropped.load(Ordering::Relaxed),
            command_errors: self.command_errors.load(Ordering::Relaxed),
            idle_timeouts: self.idle_timeouts.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
            avg_session_duration: self.average_session_duration(),
        }
    }

    fn average_session_duration(&self) -> Duration {
        let total = self.total_connections.load(Ordering::Relaxed);
        if total == 0 {
            return Duration::ZERO;
        }
        let total_ns = self.total_session_duration_ns.load(Ordering::Relaxed);
        Duration::from_nanos(total_ns / total)
    }
}

/// Server metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub total_connections: u64,
    pub active_connections: u64,
    pub rejected_connections: u64,
    pub registrations: u64,
    pub logins: u64,
    pub failed_logins: u64,
    pub lines_received: u64,
    pub messages_posted: u64,
    pub deliveries_sent: u64,
    pub deliveries_dropped: u64,
    pub command_errors: u64,
    pub idle_timeouts: u64,
    pub uptime: Duration,
    pub avg_session_duration: Duration,
}

impl MetricsSnapshot {
    /// Messages posted per second of uptime
    pub fn messages_per_sec(&self) -> f64 {
        if self.uptime.is_zero() {
            return 0.0;
        }
        self.messages_posted as f64 / self.uptime.as_secs_f64()
    }

    /// Fraction of broadcast deliveries that were dropped
    pub fn drop_ratio(&self) -> f64 {
        let total = self.deliveries_sent + self.deliveries_dropped;
        if total == 0 {
            return 0.0;
        }
        self.deliveries_dropped as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_connection_tracking() {
        let metrics = ServerMetrics::new();

        metrics.connection_opened();
        metrics.connection_opened();
        assert_eq!(metrics.active_connections(), 2);

        metrics.connection_closed(Duration::from_secs(10));
        metrics.connection_rejected();
        assert_eq!(metrics.active_connections(), 1);
        assert_eq!(metrics.total_connections(), 2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rejected_connections, 1);
        assert_eq!(snapshot.avg_session_duration, Duration::from_secs(5));
    }

    #[test]
    fn test_session_tracking() {
        let metrics = ServerMetrics::new();
        metrics.participant_registered();
        metrics.participant_logged_in();
        metrics.login_failed();
        metrics.line_received();
        metrics.message_posted();
        metrics.command_error();
        metrics.idle_timeout();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.registrations, 1);
        assert_eq!(snapshot.logins, 1);
        assert_eq!(snapshot.failed_logins, 1);
        assert_eq!(snapshot.lines_received, 1);
        assert_eq!(snapshot.messages_posted, 1);
        assert_eq!(snapshot.command_errors, 1);
        assert_eq!(snapshot.idle_timeouts, 1);
    }

    #[test]
    fn test_drop_ratio() {
        let metrics = ServerMetrics::new();
        assert_eq!(metrics.snapshot().drop_ratio(), 0.0);

        metrics.broadcast_completed(3, 1);
        assert_eq!(metrics.snapshot().drop_ratio(), 0.25);
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = std::sync::Arc::new(ServerMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        metrics.connection_opened();
                        metrics.broadcast_completed(2, 0);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.total_connections(), 800);
        assert_eq!(metrics.snapshot().deliveries_sent, 1600);
    }
}
