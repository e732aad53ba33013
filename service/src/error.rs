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

//! Error types for the chat session engine

use chatline_backend::BackendError;
use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Result type for operations
pub type Result<T> = std::result::Result<T, ChatError>;

/// Chat server error types
#[derive(Debug, Error)]
pub enum ChatError {
    /// I/O error from the underlying transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Line framing error (oversized line or I/O failure while framing)
    #[error("Line error: {0}")]
    Line(#[from] LinesCodecError),

    /// Error reported by the backend store
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Connection has been closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Server is not running
    #[error("Server not running")]
    ServerNotRunning,

    /// Maximum number of connections reached
    #[error("Maximum connections ({0}) reached")]
    MaxConnectionsReached(usize),

    /// Generic error with a message
    #[error("{0}")]
    Other(String),
}

impl ChatError {
    /// Check if the error came from the client's transport
    ///
    /// These end a session as a matter of course and are not worth a warning.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ChatError::ConnectionClosed | ChatError::Io(_) | ChatError::Line(_)
        )
    }
}
