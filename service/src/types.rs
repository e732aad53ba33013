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

//! Core types for the chat session engine

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Registration state of a connection
///
/// A connection starts `Pending` and becomes `Connected` exactly once, when a
/// participant is assigned to it. It never goes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, no participant bound yet
    Pending,
    /// A participant is bound to the connection
    Connected,
}

impl ConnectionState {
    /// Whether broadcast traffic may be delivered to this connection
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "offline"),
            Self::Connected => write!(f, "online"),
        }
    }
}

/// Protocol state of a reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    ProcessingMenu,
    RegisteringNewParticipant,
    AuthenticatingParticipant,
    AcceptingMessages,
    CreatingNewChannel,
    SelectingChannel,
    Disconnecting,
}

/// Field a reader is currently accumulating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReaderSubstate {
    #[default]
    NotSet,
    ProcessingName,
    ProcessingPassword,
    ProcessingEmailAddress,
    ProcessingChannelDesc,
}

/// Entries of the main menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MenuOption {
    Register = 0x01,
    LogIn = 0x02,
    Exit = 0x03,
    CreateChannel = 0x04,
    ListChannels = 0x05,
}

impl MenuOption {
    /// Menu entries in display order
    pub const ALL: [MenuOption; 5] = [
        Self::Register,
        Self::LogIn,
        Self::Exit,
        Self::CreateChannel,
        Self::ListChannels,
    ];

    /// Selector byte a client sends to pick this entry
    pub fn selector(self) -> u8 {
        self as u8
    }

    /// Look up an entry by selector byte
    pub fn from_selector(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|opt| opt.selector() == value)
    }

    /// Parse a client line such as `"2"`
    pub fn parse(line: &str) -> Option<Self> {
        line.trim().parse::<u8>().ok().and_then(Self::from_selector)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Register => "Register",
            Self::LogIn => "Log in",
            Self::Exit => "Exit",
            Self::CreateChannel => "Create channel",
            Self::ListChannels => "List channels",
        }
    }

    /// Render the full menu as sent to a client
    pub fn render_menu() -> String {
        let mut menu = String::from("menu:\r\n");
        for opt in Self::ALL {
            menu.push_str(&format!("[{}] {}\r\n", opt.selector(), opt.label()));
        }
        menu
    }
}

/// Server snapshot for non-blocking debug information
#[derive(Debug, Clone)]
pub struct ServerSnapshot {
    /// Number of registered connections
    pub active_connections: usize,
    /// Total connections since server start
    pub total_connections: u64,
    /// Server bind address
    pub bind_address: SocketAddr,
    /// Server uptime
    pub uptime: Duration,
    /// Server start time
    pub started_at: Instant,
}

impl fmt::Display for ServerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ChatServer {{ active: {}, total: {}, addr: {}, uptime: {:?} }}",
            self.active_connections, self.total_connections, self.bind_address, self.uptime
        )
    }
}
