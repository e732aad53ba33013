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

//! Chatline server binary

mod cli;

use chatline_backend::MemoryBackend;
use chatline_service::ChatServer;
use clap::Parser;
use cli::Cli;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(cli.log_level().into()))
        .init();

    let server = ChatServer::new(cli.server_config(), Arc::new(MemoryBackend::new())).await?;
    server.start().await?;
    info!(bind_address = %server.bind_address(), "Chatline listening, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!(snapshot = %server.snapshot(), "Shutdown requested");
    server.shutdown().await?;
    Ok(())
}
