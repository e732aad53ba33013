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

//! Chatline Backend Store
//!
//! The session engine only needs a handful of things from persistence: look up
//! and create participants, look up and create channels, and keep a message
//! history. This crate defines that boundary as the [`Backend`] trait along
//! with the message types exchanged across it, and ships [`MemoryBackend`],
//! a process-local implementation.

mod error;
mod memory;
mod types;

pub use error::{BackendError, BackendResult};
pub use memory::MemoryBackend;
pub use types::{Channel, Participant, ParticipantMessage, SystemMessage, time_of_day};

use async_trait::async_trait;
use std::sync::Arc;

/// Name of the shared, unchannelled broadcast space
pub const GENERAL_CHANNEL: &str = "general";

/// Storage boundary used by the session engine
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Whether a participant with this name exists (case-insensitive)
    async fn has_participant(&self, name: &str) -> bool;

    /// Create a participant from an already hashed password
    async fn register_participant(
        &self,
        name: &str,
        password_hash: &str,
        email: &str,
    ) -> BackendResult<Arc<Participant>>;

    /// Check a participant's password hash
    ///
    /// Returns the participant on success and `None` when the name is unknown
    /// or the hash does not match.
    async fn authenticate_participant(
        &self,
        name: &str,
        password_hash: &str,
    ) -> Option<Arc<Participant>>;

    /// Fetch a participant by name
    async fn get_participant(&self, name: &str) -> Option<Arc<Participant>>;

    /// All registered participants
    async fn list_participants(&self) -> Vec<Arc<Participant>>;

    /// Whether a channel exists (case-insensitive)
    async fn has_channel(&self, name: &str) -> bool;

    /// Create a channel; the creator becomes its first member
    async fn register_channel(
        &self,
        name: &str,
        description: &str,
        creator: &str,
    ) -> BackendResult<Channel>;

    /// All channels, in creation order
    async fn list_channels(&self) -> Vec<Channel>;

    /// Add a participant to a channel's member set
    async fn join_channel(&self, channel: &str, participant: &str) -> BackendResult<()>;

    /// Members of a channel
    async fn list_channel_members(&self, channel: &str) -> BackendResult<Vec<String>>;

    /// Append a message to the history
    async fn store_message(&self, message: ParticipantMessage);

    /// Messages for a channel (`None` for the general space)
    ///
    /// `period_minutes` of `0` returns the whole history, otherwise only
    /// messages sent within that many minutes.
    async fn get_history(&self, channel: Option<&str>, period_minutes: u64)
    -> Vec<ParticipantMessage>;
}
