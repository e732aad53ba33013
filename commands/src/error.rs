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

//! Structured grammar errors

use std::fmt;
use thiserror::Error;

/// Kind of grammar error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// More option pairs than the command declares, or a repeated option
    UnexpectedArgument,
    /// An option name without a value, or a declared option left out
    ArgumentNotSpecified,
    /// A value that does not have the shape the option expects
    InvalidValue,
    /// A token that is not one of the command's options
    UnrecognizedArgument,
}

impl ParseErrorKind {
    /// Human readable description used when rendering the error
    pub fn description(self) -> &'static str {
        match self {
            Self::UnexpectedArgument => "Unexpected argument",
            Self::ArgumentNotSpecified => "Argument not specified",
            Self::InvalidValue => "Invalid value",
            Self::UnrecognizedArgument => "Unrecognized argument",
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A grammar error with optional free-text detail
///
/// Renders as `error: <kind> <detail>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("error: {kind}{}", detail_suffix(.detail))]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub detail: Option<String>,
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(detail) if !detail.is_empty() => format!(" {detail}"),
        _ => String::new(),
    }
}

impl ParseError {
    /// Create an error without detail
    pub fn new(kind: ParseErrorKind) -> Self {
        Self { kind, detail: None }
    }

    /// Create an error citing the offending input
    pub fn with_detail(kind: ParseErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: Some(detail.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ParseError::with_detail(ParseErrorKind::InvalidValue, "period -5");
        assert_eq!(err.to_string(), "error: Invalid value period -5");

        let err = ParseError::new(ParseErrorKind::ArgumentNotSpecified);
        assert_eq!(err.to_string(), "error: Argument not specified");
    }

    #[test]
    fn test_kind_descriptions() {
        assert_eq!(
            ParseErrorKind::UnexpectedArgument.to_string(),
            "Unexpected argument"
        );
        assert_eq!(
            ParseErrorKind::UnrecognizedArgument.to_string(),
            "Unrecognized argument"
        );
    }
}
