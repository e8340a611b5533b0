//! pwpatchd - endpoint lifecycle and host supervision
//!
//! Resets the virtual endpoints on every start, then either launches the
//! host once or stays resident with `--auto` to re-establish routing on a
//! timer. `--kill` tears the endpoints down instead.

use clap::Parser;
use color_eyre::eyre::Result;

use pwpatch::cli::DaemonArgs;
use pwpatch::config::Config;
use pwpatch::supervisor;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = DaemonArgs::parse();
    let config = Config::load()?;

    supervisor::run(config, args).await
}
