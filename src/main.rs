//! pwpatch one-shot CLI
//!
//! Three commands, exactly one per invocation: link source channels to a
//! sink (optionally disconnecting), search port listings, or set the
//! server's processing quantum.

use clap::Parser;
use color_eyre::eyre::{Result, bail};
use tracing_subscriber::EnvFilter;

use pwpatch::cli::Args;
use pwpatch::ports::{Direction, PortDirectory};
use pwpatch::registry;
use pwpatch::router::ChannelRouter;
use pwpatch::tool::ToolRunner;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pwpatch=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let args = Args::parse();
    let runner = ToolRunner::default();

    if let Some(ref link) = args.link {
        // clap guarantees exactly two values: SOURCE then SINK.
        let (source, sink) = (&link[0], &link[1]);
        let router = ChannelRouter::new(runner);

        let routes = if args.disconnect {
            router.disconnect(sink, source).await?
        } else {
            router.connect(sink, source).await?
        };
        println!(
            "{} {} channel pair(s): {} -> {}",
            if args.disconnect { "unlinked" } else { "linked" },
            routes.len(),
            source,
            sink
        );

        if args.verify && !args.disconnect {
            let confirmed = router.verify(&routes).await?;
            if confirmed < routes.len() {
                bail!("only {} of {} links confirmed", confirmed, routes.len());
            }
            println!("all {} link(s) confirmed", confirmed);
        }
        return Ok(());
    }

    if let Some(ref query) = args.search {
        let direction = if args.inputs {
            Direction::Input
        } else {
            Direction::Output
        };
        let directory = PortDirectory::new(runner);
        for line in directory
            .list_ports(direction)
            .await?
            .iter()
            .filter(|l| l.contains(query.as_str()))
        {
            println!("{line}");
        }
        return Ok(());
    }

    if let Some(samples) = args.sample {
        registry::set_quantum(&runner, samples).await?;
        println!("quantum set to {samples}");
    }

    Ok(())
}
