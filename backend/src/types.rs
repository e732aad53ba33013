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

//! Participant, channel and message types

use chrono::{DateTime, Local};

/// Format the current local time-of-day as shown on the wire
pub fn time_of_day() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// A registered chat participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
    /// Uppercase hex SHA-256 of the password
    pub password_hash: String,
    pub email: String,
    pub joined_at: DateTime<Local>,
}

impl Participant {
    pub fn new(name: &str, password_hash: &str, email: &str) -> Self {
        Self {
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            email: email.to_string(),
            joined_at: Local::now(),
        }
    }
}

/// A named channel messages can be routed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    pub description: String,
    pub creator: String,
    pub created_at: DateTime<Local>,
}

/// A message authored by a participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantMessage {
    pub sender: String,
    /// Time-of-day string used on the wire
    pub time: String,
    pub contents: String,
    /// Channel the message was routed to, `None` for the general space
    pub channel: Option<String>,
    pub sent_at: DateTime<Local>,
}

impl ParticipantMessage {
    /// Build a message stamped with the current time
    pub fn new(sender: &str, contents: &str, channel: Option<&str>) -> Self {
        let sent_at = Local::now();
        Self {
            sender: sender.to_string(),
            time: sent_at.format("%H:%M:%S").to_string(),
            contents: contents.to_string(),
            channel: channel.map(str::to_string),
            sent_at,
        }
    }

    /// Override the send time (history imports and tests)
    pub fn sent_at(mut self, sent_at: DateTime<Local>) -> Self {
        self.time = sent_at.format("%H:%M:%S").to_string();
        self.sent_at = sent_at;
        self
    }
}

/// A message generated by the server itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemMessage {
    pub time: String,
    pub contents: String,
    /// Remote addresses to deliver to; empty means everyone
    pub receive_list: Vec<String>,
}

impl SystemMessage {
    /// A message for every registered connection
    pub fn new(contents: impl Into<String>) -> Self {
        Self {
            time: time_of_day(),
            contents: contents.into(),
            receive_list: Vec::new(),
        }
    }

    /// Restrict delivery to the given remote addresses
    pub fn to(mut self, receivers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.receive_list = receivers.into_iter().map(Into::into).collect();
        self
    }
}
