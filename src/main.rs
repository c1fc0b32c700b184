mod cli;
mod commands;
mod config;
mod http;
mod logging;
mod modal;
mod model;
mod selection;
mod storage;
mod store;
mod sync;
mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, commands::run(args))
}
