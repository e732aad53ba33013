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

//! Backend error types

use thiserror::Error;

/// Result type for backend operations
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Backend store error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// A participant with this name is already registered
    #[error("Participant {0} already exists")]
    ParticipantExists(String),

    /// No participant with this name is registered
    #[error("Participant {0} not found")]
    ParticipantNotFound(String),

    /// A channel with this name already exists
    #[error("Channel {0} already exists")]
    ChannelExists(String),

    /// No channel with this name exists
    #[error("Channel {0} not found")]
    ChannelNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BackendError::ParticipantExists("alice_01".to_string());
        assert_eq!(err.to_string(), "Participant alice_01 already exists");

        let err = BackendError::ChannelNotFound("rust".to_string());
        assert_eq!(err.to_string(), "Channel rust not found");
    }
}
