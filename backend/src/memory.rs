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

//! In-memory backend store

use crate::{
    Backend, BackendError, BackendResult, Channel, GENERAL_CHANNEL, Participant,
    ParticipantMessage,
};
use async_trait::async_trait;
use chrono::{Local, TimeDelta};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

#[derive(Debug, Default)]
struct Store {
    /// Keyed by lowercase name
    participants: BTreeMap<String, Arc<Participant>>,
    channels: Vec<Channel>,
    /// Keyed by lowercase channel name
    members: HashMap<String, Vec<String>>,
    history: Vec<ParticipantMessage>,
}

impl Store {
    fn channel_index(&self, name: &str) -> Option<usize> {
        self.channels
            .iter()
            .position(|ch| ch.name.eq_ignore_ascii_case(name))
    }
}

fn is_general(channel: &str) -> bool {
    channel.eq_ignore_ascii_case(GENERAL_CHANNEL)
}

/// Process-local [`Backend`]
///
/// Everything is kept in memory behind a single `RwLock` and is lost when the
/// process exits.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    store: RwLock<Store>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn has_participant(&self, name: &str) -> bool {
        self.read().participants.contains_key(&name.to_lowercase())
    }

    async fn register_participant(
        &self,
        name: &str,
        password_hash: &str,
        email: &str,
    ) -> BackendResult<Arc<Participant>> {
        let mut store = self.write();
        let key = name.to_lowercase();
        if store.participants.contains_key(&key) {
            return Err(BackendError::ParticipantExists(name.to_string()));
        }

        let participant = Arc::new(Participant::new(name, password_hash, email));
        store.participants.insert(key, participant.clone());
        debug!(participant = %name, "Participant registered");
        Ok(participant)
    }

    async fn authenticate_participant(
        &self,
        name: &str,
        password_hash: &str,
    ) -> Option<Arc<Participant>> {
        self.read()
            .participants
            .get(&name.to_lowercase())
            .filter(|p| p.password_hash == password_hash)
            .cloned()
    }

    async fn get_participant(&self, name: &str) -> Option<Arc<Participant>> {
        self.read().participants.get(&name.to_lowercase()).cloned()
    }

    async fn list_participants(&self) -> Vec<Arc<Participant>> {
        self.read().participants.values().cloned().collect()
    }

    async fn has_channel(&self, name: &str) -> bool {
        is_general(name) || self.read().channel_index(name).is_some()
    }

    async fn register_channel(
        &self,
        name: &str,
        description: &str,
        creator: &str,
    ) -> BackendResult<Channel> {
        let mut store = self.write();
        if is_general(name) || store.channel_index(name).is_some() {
            return Err(BackendError::ChannelExists(name.to_string()));
        }

        let channel = Channel {
            name: name.to_string(),
            description: description.to_string(),
            creator: creator.to_string(),
            created_at: Local::now(),
        };
        store.channels.push(channel.clone());
        store
            .members
            .insert(name.to_lowercase(), vec![creator.to_string()]);
        debug!(channel = %name, creator = %creator, "Channel registered");
        Ok(channel)
    }

    async fn list_channels(&self) -> Vec<Channel> {
        self.read().channels.clone()
    }

    async fn join_channel(&self, channel: &str, participant: &str) -> BackendResult<()> {
        let mut store = self.write();
        if store.channel_index(channel).is_none() {
            return Err(BackendError::ChannelNotFound(channel.to_string()));
        }

        let members = store.members.entry(channel.to_lowercase()).or_default();
        if !members.iter().any(|m| m.eq_ignore_ascii_case(participant)) {
            members.push(participant.to_string());
        }
        Ok(())
    }

    async fn list_channel_members(&self, channel: &str) -> BackendResult<Vec<String>> {
        let store = self.read();
        if is_general(channel) {
            return Ok(store.participants.values().map(|p| p.name.clone()).collect());
        }

        if store.channel_index(channel).is_none() {
            return Err(BackendError::ChannelNotFound(channel.to_string()));
        }
        Ok(store
            .members
            .get(&channel.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn store_message(&self, message: ParticipantMessage) {
        self.write().history.push(message);
    }

    async fn get_history(
        &self,
        channel: Option<&str>,
        period_minutes: u64,
    ) -> Vec<ParticipantMessage> {
        let channel = channel.filter(|c| !is_general(c));
        let cutoff = match period_minutes {
            0 => None,
            minutes => i64::try_from(minutes)
                .ok()
                .and_then(TimeDelta::try_minutes)
                .and_then(|delta| Local::now().checked_sub_signed(delta)),
        };

        self.read()
            .history
            .iter()
            .filter(|msg| match (channel, msg.channel.as_deref()) {
                (None, None) => true,
                (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
                _ => false,
            })
            .filter(|msg| cutoff.is_none_or(|cutoff| msg.sent_at >= cutoff))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let backend = MemoryBackend::new();
        assert!(!backend.has_participant("Alice_01").await);

        backend
            .register_participant("Alice_01", "HASH", "alice@example.com")
            .await
            .unwrap();
        assert!(backend.has_participant("alice_01").await);

        let err = backend
            .register_participant("ALICE_01", "OTHER", "a@example.com")
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::ParticipantExists("ALICE_01".to_string()));

        assert!(backend.authenticate_participant("alice_01", "HASH").await.is_some());
        assert!(backend.authenticate_participant("alice_01", "WRONG").await.is_none());
        assert!(backend.authenticate_participant("nobody", "HASH").await.is_none());
    }

    #[tokio::test]
    async fn test_channels_and_members() {
        let backend = MemoryBackend::new();
        backend
            .register_channel("rust", "All things Rust", "alice_01")
            .await
            .unwrap();

        assert!(backend.has_channel("RUST").await);
        assert!(backend.has_channel("general").await);
        assert!(matches!(
            backend.register_channel("Rust", "dup", "bob_0001").await,
            Err(BackendError::ChannelExists(_))
        ));
        assert!(matches!(
            backend.register_channel("general", "reserved", "bob_0001").await,
            Err(BackendError::ChannelExists(_))
        ));

        backend.join_channel("rust", "bob_0001").await.unwrap();
        backend.join_channel("rust", "BOB_0001").await.unwrap();
        assert_eq!(
            backend.list_channel_members("rust").await.unwrap(),
            vec!["alice_01".to_string(), "bob_0001".to_string()]
        );
        assert!(backend.join_channel("go", "bob_0001").await.is_err());
        assert_eq!(backend.list_channels().await.len(), 1);
    }

    #[tokio::test]
    async fn test_general_members_are_all_participants() {
        let backend = MemoryBackend::new();
        backend.register_participant("alice_01", "H", "a@example.com").await.unwrap();
        backend.register_participant("bob_0001", "H", "b@example.com").await.unwrap();

        let members = backend.list_channel_members("general").await.unwrap();
        assert_eq!(members, vec!["alice_01".to_string(), "bob_0001".to_string()]);
    }

    #[tokio::test]
    async fn test_history_filters() {
        let backend = MemoryBackend::new();
        let old = Local::now() - Duration::minutes(90);

        backend
            .store_message(ParticipantMessage::new("alice_01", "ancient", None).sent_at(old))
            .await;
        backend
            .store_message(ParticipantMessage::new("alice_01", "fresh", None))
            .await;
        backend
            .store_message(ParticipantMessage::new("bob_0001", "in rust", Some("rust")))
            .await;

        let all = backend.get_history(None, 0).await;
        assert_eq!(all.len(), 2);

        let recent = backend.get_history(Some("general"), 30).await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].contents, "fresh");

        let rust = backend.get_history(Some("Rust"), 0).await;
        assert_eq!(rust.len(), 1);
        assert_eq!(rust[0].sender, "bob_0001");
    }
}
