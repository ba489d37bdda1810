use anyhow::Result;
use clap::Parser;
use evorobo_core::init_logging;
use evorobo_lib::watch::{self, WatchConfig};

fn main() -> Result<()> {
    let config = WatchConfig::parse();
    init_logging();
    watch::run(&config)
}
