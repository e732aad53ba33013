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

//! Chatline Command Grammar
//!
//! Parses the in-band control directives a participant can type while chatting.
//! A directive is any line that starts with [`COMMAND_PREFIX`] followed by a
//! registered command name and zero or more `-option value` pairs:
//!
//! ```text
//! :history -channel general -period 10
//! :members -channel rust
//! :channels
//! ```
//!
//! Lines whose first token does not name a registered command are not an error;
//! they come back unmatched so the caller can treat them as ordinary chat text.
//!
//! # Example
//!
//! ```
//! use chatline_commands::{CommandKind, CommandTable};
//!
//! let table = CommandTable::new();
//! let result = table.parse(":history -channel general -period 10");
//!
//! assert!(result.matched);
//! assert_eq!(result.command, Some(CommandKind::DisplayHistory));
//! assert_eq!(result.channel.as_deref(), Some("general"));
//! assert_eq!(result.period, Some(10));
//! ```

mod command;
mod error;
mod parser;

pub use command::{CommandKind, CommandSpec, CommandTable, OptionSpec, OptionValue, ValueKind};
pub use error::{ParseError, ParseErrorKind};
pub use parser::ParseResult;

/// Character that marks a line as a control directive
pub const COMMAND_PREFIX: char = ':';
