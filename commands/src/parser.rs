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

//! Directive parser

use crate::{COMMAND_PREFIX, CommandKind, CommandTable, ParseError, ParseErrorKind};

/// Outcome of offering a line to the grammar
///
/// `command` is `None` when the line is not a directive. That is not an error:
/// the caller treats such lines as chat content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    /// Matched command, if the first token named one
    pub command: Option<CommandKind>,
    /// Value of `-channel`
    pub channel: Option<String>,
    /// Value of `-period`
    pub period: Option<u64>,
    /// Set once the command and all of its options parsed cleanly
    pub matched: bool,
    /// First error encountered, if any
    pub error: Option<ParseError>,
}

impl ParseResult {
    fn fail(mut self, error: ParseError) -> Self {
        self.error = Some(error);
        self
    }

    /// True when the line was a directive that failed to parse
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl CommandTable {
    /// Parse a single input line
    ///
    /// Options are consumed as `(name, value)` pairs from left to right and
    /// parsing stops at the first error. Every option a command declares must
    /// be supplied exactly once.
    pub fn parse(&self, line: &str) -> ParseResult {
        let result = ParseResult::default();
        if !line.starts_with(COMMAND_PREFIX) {
            return result;
        }

        let mut tokens = line.split(' ');
        let head = tokens.next().unwrap_or_default();
        let Some(command) = self.find(head) else {
            return result;
        };

        let mut result = ParseResult {
            command: Some(command.kind()),
            ..result
        };

        let arguments: Vec<&str> = tokens.collect();
        let mut seen: Vec<&str> = Vec::with_capacity(command.options().len());

        for pair in arguments.chunks(2) {
            let name = pair[0];
            if seen.len() >= command.options().len() {
                return result.fail(ParseError::with_detail(
                    ParseErrorKind::UnexpectedArgument,
                    name,
                ));
            }

            let Some(&raw) = pair.get(1) else {
                return result.fail(ParseError::new(ParseErrorKind::ArgumentNotSpecified));
            };

            let Some(option) = command.option(name) else {
                return result.fail(ParseError::with_detail(
                    ParseErrorKind::UnrecognizedArgument,
                    name,
                ));
            };

            if seen.contains(&name) {
                return result.fail(ParseError::with_detail(
                    ParseErrorKind::UnexpectedArgument,
                    name,
                ));
            }

            match option.kind().parse(raw) {
                Some(value) => option.apply(&mut result, value),
                None => {
                    return result.fail(ParseError::with_detail(
                        ParseErrorKind::InvalidValue,
                        format!("{} {}", option.label(), raw),
                    ));
                }
            }
            seen.push(name);
        }

        if let Some(missing) = command.options().iter().find(|opt| !seen.contains(&opt.name())) {
            return result.fail(ParseError::with_detail(
                ParseErrorKind::ArgumentNotSpecified,
                missing.name(),
            ));
        }

        result.matched = true;
        result
    }
}
