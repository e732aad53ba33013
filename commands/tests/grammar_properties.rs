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

//! Property tests for the command grammar

use chatline_commands::{CommandTable, ParseErrorKind};
use proptest::prelude::*;

proptest! {
    #[test]
    fn lines_without_prefix_never_match(line in "[^:].*") {
        let result = CommandTable::new().parse(&line);
        prop_assert!(result.command.is_none());
        prop_assert!(!result.matched);
        prop_assert!(result.error.is_none());
    }

    #[test]
    fn any_period_round_trips(period in any::<u64>(), channel in "[a-z][a-z0-9_]{0,15}") {
        let line = format!(":history -channel {channel} -period {period}");
        let result = CommandTable::new().parse(&line);
        prop_assert!(result.matched);
        prop_assert_eq!(result.period, Some(period));
        prop_assert_eq!(result.channel, Some(channel));
    }

    #[test]
    fn negative_periods_are_invalid(period in 1i64..i64::MAX) {
        let line = format!(":history -channel general -period -{period}");
        let result = CommandTable::new().parse(&line);
        prop_assert!(!result.matched);
        prop_assert_eq!(result.error.map(|e| e.kind), Some(ParseErrorKind::InvalidValue));
    }

    #[test]
    fn arbitrary_directives_never_panic(line in ":[ -~]{0,64}") {
        let result = CommandTable::new().parse(&line);
        prop_assert!(!(result.matched && result.error.is_some()));
    }
}

#[test]
fn catalog_is_identical_across_tables() {
    let tables: Vec<_> = (0..4).map(|_| CommandTable::new()).collect();
    for table in &tables {
        assert_eq!(table.catalog(), tables[0].catalog());
        assert_eq!(table.catalog(), table.catalog());
    }
}

#[test]
fn catalog_lists_every_command() {
    let table = CommandTable::new();
    for command in table.commands() {
        assert!(table.catalog().contains(command.name()));
        for option in command.options() {
            assert!(table.catalog().contains(option.name()));
        }
    }
}
