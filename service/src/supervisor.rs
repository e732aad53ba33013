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

//! Idle supervisor
//!
//! Every connection gets a watchdog task that closes the transport once no
//! input has arrived for the configured idle period. The reader talks to it
//! over three single-purpose channels:
//!
//! - **idle**: a oneshot the supervisor closes when the timer fires
//! - **abort**: the reader pushes a token after each successful read to
//!   re-arm the timer
//! - **quit**: the reader fires it once while disconnecting
//!
//! The supervisor exits on quit or as soon as the reader's end of either
//! channel disappears, so it never outlives its session.

use crate::Connection;
use metrics::counter;
use std::time::Duration;
use tokio::select;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument};

/// Why a supervisor stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorExit {
    /// The idle period elapsed and the transport was closed
    IdleTimeout,
    /// The reader asked it to stop, or went away
    Quit,
}

/// Watchdog task state for a single connection
pub struct IdleSupervisor {
    connection: Connection,
    duration: Duration,
    idle_tx: Option<oneshot::Sender<()>>,
    abort_rx: mpsc::UnboundedReceiver<()>,
    quit_rx: oneshot::Receiver<()>,
}

/// Reader-side ends of the supervisor channels
#[derive(Debug)]
pub struct SupervisorHandle {
    idle_rx: Option<oneshot::Receiver<()>>,
    abort_tx: mpsc::UnboundedSender<()>,
    quit_tx: Option<oneshot::Sender<()>>,
}

impl IdleSupervisor {
    /// Create a supervisor for `connection` with an idle period of `duration`
    pub fn new(connection: Connection, duration: Duration) -> (Self, SupervisorHandle) {
        let (idle_tx, idle_rx) = oneshot::channel();
        let (abort_tx, abort_rx) = mpsc::unbounded_channel();
        let (quit_tx, quit_rx) = oneshot::channel();

        let supervisor = Self {
            connection,
            duration,
            idle_tx: Some(idle_tx),
            abort_rx,
            quit_rx,
        };
        let handle = SupervisorHandle {
            idle_rx: Some(idle_rx),
            abort_tx,
            quit_tx: Some(quit_tx),
        };
        (supervisor, handle)
    }

    /// Run until the timer fires or the reader lets go
    #[instrument(skip(self), fields(peer_addr = %self.connection.addr()))]
    pub async fn run(mut self) -> SupervisorExit {
        let timer = sleep(self.duration);
        tokio::pin!(timer);

        loop {
            select! {
                biased;

                _ = &mut self.quit_rx => {
                    debug!("Supervisor released");
                    return SupervisorExit::Quit;
                }
                token = self.abort_rx.recv() => match token {
                    Some(()) => timer.as_mut().reset(Instant::now() + self.duration),
                    None => {
                        debug!("Reader gone, supervisor exiting");
                        return SupervisorExit::Quit;
                    }
                },
                () = &mut timer => {
                    info!(idle_secs = self.duration.as_secs(), "Idle timeout, closing connection");
                    counter!("chatline.idle.timeouts").increment(1);
                    self.idle_tx.take();
                    if let Err(e) = self.connection.close().await {
                        debug!(error = %e, "Failed to close idle connection");
                    }
                    return SupervisorExit::IdleTimeout;
                }
            }
        }
    }
}

impl SupervisorHandle {
    /// Re-arm the idle timer
    pub fn abort_idle(&self) {
        let _ = self.abort_tx.send(());
    }

    /// Ask the supervisor to stop; later calls do nothing
    pub fn quit(&mut self) {
        if let Some(quit_tx) = self.quit_tx.take() {
            let _ = quit_tx.send(());
        }
    }

    /// Resolves once the idle channel closes
    ///
    /// Cancel safe. After resolving once it stays pending.
    pub async fn idle_expired(&mut self) {
        match self.idle_rx.as_mut() {
            Some(idle_rx) => {
                let _ = idle_rx.await;
                self.idle_rx = None;
            }
            None => std::future::pending().await,
        }
    }
}
