//! Command-line interface definitions
//!
//! Uses clap for argument parsing with derive macros. Two surfaces: the
//! one-shot `pwpatch` tool and the `pwpatchd` supervisor.

use clap::{ArgGroup, Parser};

/// pwpatch - one-shot PipeWire patching
///
/// Exactly one of --link / --search / --sample must be given.
#[derive(Debug, Parser)]
#[command(name = "pwpatch")]
#[command(version)]
#[command(about = "Wire PipeWire source channels to sink channels by name")]
#[command(group(
    ArgGroup::new("command")
        .required(true)
        .args(["link", "search", "sample"]),
))]
#[command(after_help = "\
EXAMPLES:
  pwpatch -l Virtual-Source Default-Sink    Link source channels to a sink
  pwpatch -l Virtual-Source Default-Sink -d Disconnect the same channels
  pwpatch -S Default-Sink -i                Search input port listings
  pwpatch -s 256                            Force the processing quantum

CHANNEL PAIRING:
  Port listings are matched by substring; the first integer on each matching
  line is the port id. The sink's first two input ports become left/right and
  source ports alternate against them by listing order.")]
pub struct Args {
    /// Link SOURCE channels to SINK channels (use -d to disconnect instead)
    #[arg(short = 'l', long, num_args = 2, value_names = ["SOURCE", "SINK"])]
    pub link: Option<Vec<String>>,

    /// Disconnect instead of connect (only with --link)
    #[arg(short = 'd', long, requires = "link", conflicts_with_all = ["search", "sample"])]
    pub disconnect: bool,

    /// Re-query the link table afterwards and report unconfirmed links
    #[arg(long, requires = "link")]
    pub verify: bool,

    /// Print port listing lines containing STRING
    #[arg(short = 'S', long, value_name = "STRING")]
    pub search: Option<String>,

    /// Search input ports (with --search)
    #[arg(short = 'i', long, requires = "search", conflicts_with = "outputs")]
    pub inputs: bool,

    /// Search output ports (with --search, the default side)
    #[arg(short = 'o', long, requires = "search")]
    pub outputs: bool,

    /// Set the server's sample buffer size (clock.force-quantum)
    #[arg(short = 's', long, value_name = "NUM")]
    pub sample: Option<u32>,
}

/// pwpatchd - endpoint lifecycle and host supervision
#[derive(Debug, Parser)]
#[command(name = "pwpatchd")]
#[command(version)]
#[command(about = "Keep the audio host alive and re-establish routing on a timer")]
#[command(after_help = "\
MODES:
  pwpatchd                 Reset endpoints, launch the host headless, exit
  pwpatchd --show          Same, but the host keeps its UI
  pwpatchd --auto          Stay resident: poll host liveness and re-route
  pwpatchd --kill          Tear down the virtual endpoints and exit")]
pub struct DaemonArgs {
    /// Launch the host application with its UI visible
    #[arg(long)]
    pub show: bool,

    /// Run the periodic supervision loop (liveness check + routing pass)
    #[arg(long)]
    pub auto: bool,

    /// Tear down the virtual endpoints and exit
    #[arg(long, conflicts_with_all = ["show", "auto"])]
    pub kill: bool,

    /// Poll interval in seconds (overrides config)
    #[arg(short = 't', long = "interval", value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Source name for the routing pass (overrides config)
    #[arg(short = 'i', long = "source", value_name = "NAME")]
    pub source: Option<String>,

    /// Sink name for the routing pass (overrides config)
    #[arg(short = 'o', long = "sink", value_name = "NAME")]
    pub sink: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn link_takes_source_then_sink() {
        let args = Args::parse_from(["pwpatch", "-l", "Virtual-Source", "Default-Sink"]);
        assert_eq!(
            args.link.as_deref(),
            Some(&["Virtual-Source".to_string(), "Default-Sink".to_string()][..])
        );
        assert!(!args.disconnect);
    }

    #[test]
    fn link_accepts_disconnect_flag() {
        let args = Args::parse_from(["pwpatch", "-l", "a", "b", "-d"]);
        assert!(args.disconnect);
    }

    #[test]
    fn one_command_is_required() {
        let err = Args::try_parse_from(["pwpatch"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn commands_are_mutually_exclusive() {
        let err = Args::try_parse_from(["pwpatch", "-S", "x", "-s", "256"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn disconnect_requires_link() {
        assert!(Args::try_parse_from(["pwpatch", "-S", "x", "-d"]).is_err());
    }

    #[test]
    fn search_direction_flags_conflict() {
        assert!(Args::try_parse_from(["pwpatch", "-S", "x", "-i", "-o"]).is_err());
    }

    #[test]
    fn daemon_kill_conflicts_with_auto() {
        assert!(DaemonArgs::try_parse_from(["pwpatchd", "--kill", "--auto"]).is_err());
    }

    #[test]
    fn daemon_accepts_overrides() {
        let args = DaemonArgs::parse_from([
            "pwpatchd", "--auto", "-t", "10", "-i", "Src", "-o", "Snk",
        ]);
        assert!(args.auto);
        assert_eq!(args.interval, Some(10));
        assert_eq!(args.source.as_deref(), Some("Src"));
        assert_eq!(args.sink.as_deref(), Some("Snk"));
    }
}
