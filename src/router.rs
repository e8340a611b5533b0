//! Channel router
//!
//! Pairs a resolved source's output ports with a resolved sink's input ports
//! left-to-left and right-to-right, then issues one `pw-link` invocation per
//! pair. Sink and source are resolved independently, each by its own pattern
//! over its own side of the graph, joined only by position parity.
//!
//! Link commands are best-effort: the router reports success once every pair
//! has been dispatched, without confirming the server applied them. The
//! optional [`ChannelRouter::verify`] pass re-queries the link table for
//! callers that want confirmation.

use tracing::{debug, info};

use crate::error::RouteError;
use crate::ports::{Direction, Port, PortDirectory};
use crate::tool::ToolRunner;

/// A planned source-to-sink wire, the unit of connect/disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub source: Port,
    pub sink: Port,
}

/// Issues connect/disconnect commands for matched sink/source patterns.
#[derive(Debug, Clone)]
pub struct ChannelRouter {
    directory: PortDirectory,
    runner: ToolRunner,
}

impl ChannelRouter {
    #[must_use]
    pub fn new(runner: ToolRunner) -> Self {
        Self {
            directory: PortDirectory::new(runner),
            runner,
        }
    }

    /// Connect every paired channel of `source_pattern` to `sink_pattern`.
    ///
    /// Returns the routes that were dispatched.
    ///
    /// # Errors
    /// Returns `EndpointNotFound` if either pattern resolves to zero ports
    /// (nothing is dispatched in that case), or `Query`/`Spawn` if a tool
    /// invocation fails outright.
    pub async fn connect(
        &self,
        sink_pattern: &str,
        source_pattern: &str,
    ) -> Result<Vec<Route>, RouteError> {
        self.apply(sink_pattern, source_pattern, false).await
    }

    /// Disconnect every paired channel; the exact inverse of
    /// [`ChannelRouter::connect`] on the same patterns.
    ///
    /// # Errors
    /// Same failure modes as [`ChannelRouter::connect`].
    pub async fn disconnect(
        &self,
        sink_pattern: &str,
        source_pattern: &str,
    ) -> Result<Vec<Route>, RouteError> {
        self.apply(sink_pattern, source_pattern, true).await
    }

    async fn apply(
        &self,
        sink_pattern: &str,
        source_pattern: &str,
        disconnect: bool,
    ) -> Result<Vec<Route>, RouteError> {
        // Resolve both sides before touching anything: all-or-nothing at the
        // resolution stage, no partial connects when one side is missing.
        let sinks = self
            .directory
            .find_matching(Direction::Input, sink_pattern)
            .await?;
        if sinks.is_empty() {
            return Err(RouteError::EndpointNotFound(sink_pattern.to_string()));
        }

        let sources = self
            .directory
            .find_matching(Direction::Output, source_pattern)
            .await?;
        if sources.is_empty() {
            return Err(RouteError::EndpointNotFound(source_pattern.to_string()));
        }

        let routes = plan_routes(&sinks, &sources);
        debug!(
            "{} {} route(s) for {} -> {}",
            if disconnect { "unlinking" } else { "linking" },
            routes.len(),
            source_pattern,
            sink_pattern
        );

        for route in &routes {
            let args = link_args(route, disconnect);
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            self.runner.dispatch("pw-link", &args).await?;
        }

        info!(
            "dispatched {} {} command(s): {} -> {}",
            routes.len(),
            if disconnect { "unlink" } else { "link" },
            source_pattern,
            sink_pattern
        );
        Ok(routes)
    }

    /// Re-query the link table and count how many of `routes` are present.
    ///
    /// An enhancement over the fire-and-forget dispatch, not a behavior
    /// change: callers opt in when they want confirmation that links formed.
    ///
    /// # Errors
    /// Returns `Query`/`Spawn` if the link listing fails.
    pub async fn verify(&self, routes: &[Route]) -> Result<usize, RouteError> {
        let lines = self.runner.lines("pw-link", &["-I", "-l"]).await?;
        let pairs = parse_link_pairs(&lines);
        let confirmed = routes
            .iter()
            .filter(|r| {
                pairs.contains(&(r.source.id, r.sink.id)) || pairs.contains(&(r.sink.id, r.source.id))
            })
            .count();
        Ok(confirmed)
    }
}

/// Pair channels by position parity.
///
/// The first two sink input ports are taken as {left, right} (stereo
/// assumption; extra sink ports are ignored). The full ordered source
/// sequence alternates against them: even index to left, odd index to right.
/// A mono sink has no right, so odd-index sources go unrouted; with fewer
/// sources than sink channels the tail sink channel is simply left silent.
#[must_use]
pub fn plan_routes(sinks: &[Port], sources: &[Port]) -> Vec<Route> {
    let left = sinks.first();
    let right = sinks.get(1);

    sources
        .iter()
        .filter_map(|source| {
            let target = if source.position % 2 == 0 { left } else { right };
            target.map(|sink| Route {
                source: source.clone(),
                sink: sink.clone(),
            })
        })
        .collect()
}

/// Arguments for one `pw-link` invocation: source id, sink id, and the
/// disconnect flag when unlinking.
#[must_use]
pub fn link_args(route: &Route, disconnect: bool) -> Vec<String> {
    let mut args = vec![route.source.id.to_string(), route.sink.id.to_string()];
    if disconnect {
        args.push("-d".to_string());
    }
    args
}

/// Parse `pw-link -I -l` output into (port, peer) id pairs.
///
/// The listing alternates port lines (id then name) with indented arrow lines
/// (`|->` / `|<-` followed by the peer's id and name). Each arrow line is
/// paired with the most recent port line; lines that fit neither shape are
/// ignored.
#[must_use]
pub fn parse_link_pairs(lines: &[String]) -> Vec<(u32, u32)> {
    fn first_id(text: &str) -> Option<u32> {
        let start = text.find(|c: char| c.is_ascii_digit())?;
        let digits: String = text[start..]
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    }

    let mut pairs = Vec::new();
    let mut current: Option<u32> = None;

    for line in lines {
        if let Some(arrow) = line.find("|->").or_else(|| line.find("|<-")) {
            if let (Some(port), Some(peer)) = (current, first_id(&line[arrow + 3..])) {
                pairs.push((port, peer));
            }
        } else if let Some(id) = first_id(line) {
            current = Some(id);
        }
    }
    pairs
}
