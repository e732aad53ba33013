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

//! Command and option tables
//!
//! Every command declares its options as data: a name token, the shape of the
//! value it expects and a setter that stores the parsed value into a
//! [`ParseResult`]. Adding an option is a table entry, not a new parser branch.

use crate::ParseResult;
use std::fmt;
use std::fmt::Write;

/// Control directives understood by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// `:menu`
    DisplayMenu,
    /// `:history -channel <name> -period <n>`
    DisplayHistory,
    /// `:members -channel <name>`
    ListMembers,
    /// `:channels`
    ListChannels,
    /// `:commands`
    ListCommands,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DisplayMenu => write!(f, "menu"),
            Self::DisplayHistory => write!(f, "history"),
            Self::ListMembers => write!(f, "members"),
            Self::ListChannels => write!(f, "channels"),
            Self::ListCommands => write!(f, "commands"),
        }
    }
}

/// Shape of the value an option expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Any non-empty token, taken verbatim
    Text,
    /// A non-negative integer
    Count,
}

/// A successfully parsed option value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Text(String),
    Count(u64),
}

impl ValueKind {
    /// Parse a raw token into a value of this kind
    ///
    /// Returns `None` when the token does not have the expected shape.
    pub fn parse(self, raw: &str) -> Option<OptionValue> {
        match self {
            Self::Text if !raw.is_empty() => Some(OptionValue::Text(raw.to_string())),
            Self::Text => None,
            Self::Count => raw.parse::<u64>().ok().map(OptionValue::Count),
        }
    }
}

/// Declaration of a single command option
#[derive(Clone)]
pub struct OptionSpec {
    name: &'static str,
    arg: &'static str,
    hint: &'static str,
    kind: ValueKind,
    apply: fn(&mut ParseResult, OptionValue),
}

impl OptionSpec {
    /// Create an option declaration
    pub const fn new(
        name: &'static str,
        arg: &'static str,
        hint: &'static str,
        kind: ValueKind,
        apply: fn(&mut ParseResult, OptionValue),
    ) -> Self {
        Self {
            name,
            arg,
            hint,
            kind,
            apply,
        }
    }

    /// Option token, including its leading dash (e.g. `-channel`)
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Placeholder shown in the catalog (e.g. `<name>`)
    pub fn arg(&self) -> &'static str {
        self.arg
    }

    /// Human readable hint shown in the catalog
    pub fn hint(&self) -> &'static str {
        self.hint
    }

    /// Expected value shape
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Name without the leading dash, used in diagnostics
    pub fn label(&self) -> &'static str {
        self.name.trim_start_matches('-')
    }

    pub(crate) fn apply(&self, result: &mut ParseResult, value: OptionValue) {
        (self.apply)(result, value)
    }
}

impl fmt::Debug for OptionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionSpec")
            .field("name", &self.name)
            .field("arg", &self.arg)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Declaration of a command and its options
#[derive(Debug, Clone)]
pub struct CommandSpec {
    name: &'static str,
    description: &'static str,
    kind: CommandKind,
    options: Vec<OptionSpec>,
}

impl CommandSpec {
    /// Create a command with no options
    pub fn new(name: &'static str, description: &'static str, kind: CommandKind) -> Self {
        Self {
            name,
            description,
            kind,
            options: Vec::new(),
        }
    }

    /// Declare an additional option
    pub fn with_option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    /// Command token, including the prefix (e.g. `:history`)
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Short description shown in the catalog
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Command kind reported in a [`ParseResult`]
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Declared options, in declaration order
    pub fn options(&self) -> &[OptionSpec] {
        &self.options
    }

    /// Look up a declared option by its exact token
    pub fn option(&self, name: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|opt| opt.name == name)
    }
}

fn set_channel(result: &mut ParseResult, value: OptionValue) {
    if let OptionValue::Text(channel) = value {
        result.channel = Some(channel);
    }
}

fn set_period(result: &mut ParseResult, value: OptionValue) {
    if let OptionValue::Count(period) = value {
        result.period = Some(period);
    }
}

const CHANNEL_OPTION: OptionSpec = OptionSpec::new(
    "-channel",
    "<name>",
    "Channel's name",
    ValueKind::Text,
    set_channel,
);

const PERIOD_OPTION: OptionSpec = OptionSpec::new(
    "-period",
    "<n>",
    "Time period in minutes",
    ValueKind::Count,
    set_period,
);

/// Immutable registry of every command the server understands
///
/// Built once during process initialisation and shared (usually behind an
/// `Arc`) by every reader. The human readable catalog is rendered at
/// construction and never changes afterwards.
#[derive(Debug, Clone)]
pub struct CommandTable {
    commands: Vec<CommandSpec>,
    catalog: String,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTable {
    /// Build the table of built-in commands
    pub fn new() -> Self {
        Self::from_commands(vec![
            CommandSpec::new(":menu", "Display menu", CommandKind::DisplayMenu),
            CommandSpec::new(":history", "Display chat history", CommandKind::DisplayHistory)
                .with_option(CHANNEL_OPTION)
                .with_option(PERIOD_OPTION),
            CommandSpec::new(":members", "Display chat members", CommandKind::ListMembers)
                .with_option(CHANNEL_OPTION),
            CommandSpec::new(":channels", "Display all channels", CommandKind::ListChannels),
            CommandSpec::new(":commands", "Display commands", CommandKind::ListCommands),
        ])
    }

    /// Build a table from an explicit list of commands
    pub fn from_commands(commands: Vec<CommandSpec>) -> Self {
        let catalog = render_catalog(&commands);
        Self { commands, catalog }
    }

    /// Registered commands, in registration order
    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    /// Find a command by its token, ignoring ASCII case
    pub fn find(&self, name: &str) -> Option<&CommandSpec> {
        self.commands
            .iter()
            .find(|cmd| cmd.name.eq_ignore_ascii_case(name))
    }

    /// The rendered catalog sent in reply to `:commands`
    pub fn catalog(&self) -> &str {
        &self.catalog
    }
}

fn render_catalog(commands: &[CommandSpec]) -> String {
    let mut out = String::from("commands:\r\n");
    for cmd in commands {
        // Writing into a String cannot fail.
        let _ = write!(out, "{:<20}\t{}\r\n", cmd.name, cmd.description);
        for opt in &cmd.options {
            let _ = write!(out, "{:<20}\t{} {} {}\r\n", "", opt.name, opt.arg, opt.hint);
        }
        out.push_str("\r\n");
    }
    out
}
