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

//! Syntactic validation of participant and channel fields
//!
//! These checks only look at the shape of the input. Uniqueness and
//! credential checks belong to the backend.

use sha2::{Digest, Sha256};
use std::fmt::Write;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::ops::RangeInclusive;
use thiserror::Error;

/// Accepted participant name lengths
pub const NAME_LENGTH: RangeInclusive<usize> = 6..=32;
/// Accepted password lengths
pub const PASSWORD_LENGTH: RangeInclusive<usize> = 10..=32;
/// Accepted channel name lengths
pub const CHANNEL_NAME_LENGTH: RangeInclusive<usize> = 3..=32;
/// Special characters a password may contain
pub const PASSWORD_SPECIALS: &str = "@#$%^&*!?_";

const LOCAL_PART_SPECIALS: &str = "!#$%&'*+-/=?^_`{|}~";
const MAX_LOCAL_PART: usize = 64;
const MAX_DOMAIN: usize = 255;
const MAX_LABEL: usize = 63;
const SHA256_HEX_LEN: usize = 64;

/// Why a field was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name must be between 6 and 32 characters long")]
    NameLength,

    #[error("name must start with a letter")]
    NameStart,

    #[error("name may only contain letters, digits and underscores")]
    NameCharacters,

    #[error("password must be between 10 and 32 characters long")]
    PasswordLength,

    #[error("password may only contain letters, digits and @#$%^&*!?_")]
    PasswordCharacters,

    #[error("password needs an uppercase letter, a lowercase letter, a digit and a symbol")]
    PasswordStrength,

    #[error("malformed password hash")]
    PasswordHash,

    #[error("malformed email address")]
    EmailAddress,

    #[error("channel name must be 3 to 32 letters, digits, '_' or '-' starting with a letter")]
    ChannelName,

    #[error("channel description must not be empty")]
    ChannelDescription,
}

/// Hash a password as uppercase hex SHA-256
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    digest.iter().fold(String::with_capacity(SHA256_HEX_LEN), |mut out, byte| {
        let _ = write!(out, "{byte:02X}");
        out
    })
}

/// A letter followed by letters, digits or underscores, 6 to 32 characters
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if !NAME_LENGTH.contains(&name.len()) {
        return Err(ValidationError::NameLength);
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(ValidationError::NameStart);
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::NameCharacters);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if !PASSWORD_LENGTH.contains(&password.len()) {
        return Err(ValidationError::PasswordLength);
    }

    let (mut upper, mut lower, mut digit, mut special) = (false, false, false, false);
    for c in password.chars() {
        match c {
            'A'..='Z' => upper = true,
            'a'..='z' => lower = true,
            '0'..='9' => digit = true,
            c if PASSWORD_SPECIALS.contains(c) => special = true,
            _ => return Err(ValidationError::PasswordCharacters),
        }
    }

    if upper && lower && digit && special {
        Ok(())
    } else {
        Err(ValidationError::PasswordStrength)
    }
}

/// Exactly 64 uppercase hex digits
pub fn validate_password_hash(hash: &str) -> Result<(), ValidationError> {
    let well_formed = hash.len() == SHA256_HEX_LEN
        && hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'A'..=b'F'));
    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::PasswordHash)
    }
}

/// Unquoted `local@domain` addresses
///
/// The domain is either a dotted host name or a bracketed IPv4 or
/// `IPv6:` literal. Quoted local parts are not accepted.
pub fn validate_email(address: &str) -> Result<(), ValidationError> {
    let (local, domain) = address
        .split_once('@')
        .ok_or(ValidationError::EmailAddress)?;

    if valid_local_part(local) && valid_domain(domain) {
        Ok(())
    } else {
        Err(ValidationError::EmailAddress)
    }
}

pub fn validate_channel_name(name: &str) -> Result<(), ValidationError> {
    let well_formed = CHANNEL_NAME_LENGTH.contains(&name.len())
        && name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::ChannelName)
    }
}

pub fn validate_channel_description(desc: &str) -> Result<(), ValidationError> {
    if desc.trim().is_empty() {
        Err(ValidationError::ChannelDescription)
    } else {
        Ok(())
    }
}

fn valid_local_part(local: &str) -> bool {
    if local.is_empty() || local.len() > MAX_LOCAL_PART {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || LOCAL_PART_SPECIALS.contains(c))
}

fn valid_domain(domain: &str) -> bool {
    if let Some(literal) = domain.strip_prefix('[') {
        let Some(literal) = literal.strip_suffix(']') else {
            return false;
        };
        return match literal.strip_prefix("IPv6:") {
            Some(v6) => v6.parse::<Ipv6Addr>().is_ok(),
            None => literal.parse::<Ipv4Addr>().is_ok(),
        };
    }

    !domain.is_empty()
        && domain.len() <= MAX_DOMAIN
        && domain.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= MAX_LABEL
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}
