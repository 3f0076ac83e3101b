//! Process entry point: parses the CLI surface, validates the resulting
//! [`Config`](nova_ltc::Config), and installs the tracing subscriber every other Nova crate logs
//! through. Opening a `Db`, wiring up RDMA transports, and driving the connection/compaction
//! worker loops are out of scope here: component bring-up belongs to whichever process role
//! `--comp` selects, not to flag parsing.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Cli::parse().into_config();
    config.validate()?;

    tracing::info!(
        db_path = %config.db_path,
        server_id = config.server_id,
        comp = ?config.comp,
        "nova-server configuration accepted",
    );

    Ok(())
}
