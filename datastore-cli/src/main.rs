//! Cloud Datastore command-line client
//!
//! Usage:
//!   datastore-cli --emulator-host localhost:8081 --project demo get Account 1
//!   datastore-cli find Account level 5 --all
//!   datastore-cli save Account '{"email":"a@x.com"}' --id 7
//!   datastore-cli serve --port 8081

use anyhow::Result;
use clap::Parser;
use datastore_cli::{Cli, run};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut stdout = std::io::stdout().lock();
    run(cli, &mut stdout).await
}
