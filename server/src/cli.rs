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

//! Command line interface

use chatline_service::ServerConfig;
use clap::{ArgAction, Parser};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

#[derive(Debug, Parser)]
#[command(name = "chatline")]
#[command(about = "Line-oriented TCP chat server")]
#[command(version)]
pub struct Cli {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Seconds without input before a client is disconnected
    #[arg(long, default_value_t = 300)]
    pub idle_timeout: u64,

    /// Maximum number of concurrent clients
    #[arg(long, default_value_t = 1000)]
    pub max_connections: usize,

    /// Longest accepted input line in bytes
    #[arg(long, default_value_t = 4096)]
    pub max_line_length: usize,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.bind)
            .with_idle_timeout(Duration::from_secs(self.idle_timeout))
            .with_max_connections(self.max_connections)
            .with_max_line_length(self.max_line_length)
    }

    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["chatline"]).unwrap();
        let config = cli.server_config();

        assert_eq!(config.bind_address, "127.0.0.1:5000".parse().unwrap());
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.max_line_length, 4096);
        assert_eq!(cli.log_level(), Level::INFO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "chatline",
            "--bind",
            "0.0.0.0:6000",
            "--idle-timeout",
            "30",
            "--max-connections",
            "8",
            "-vv",
        ])
        .unwrap();
        let config = cli.server_config();

        assert_eq!(config.bind_address.port(), 6000);
        assert_eq!(config.idle_timeout, Duration::from_secs(30));
        assert_eq!(config.max_connections, 8);
        assert_eq!(cli.log_level(), Level::TRACE);
    }

    #[test]
    fn test_rejects_bad_address() {
        assert!(Cli::try_parse_from(["chatline", "--bind", "not-an-address"]).is_err());
    }
}
