//! Port directory
//!
//! Lists the audio server's live input/output ports via `pw-link` and
//! resolves name patterns to numeric port ids. Listings are free text, one
//! port per line, in the tool's port-registration order; the position of a
//! port within the filtered listing is the only channel information we get,
//! so it doubles as the left/right proxy (first-seen = left). That ordering
//! is a convention of the tool's output, not a guaranteed contract.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::error::RouteError;
use crate::tool::ToolRunner;

static ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("static regex"));

/// Which side of the audio graph to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    fn flag(self) -> &'static str {
        match self {
            Self::Input => "-i",
            Self::Output => "-o",
        }
    }
}

/// A live port, valid for one routing pass only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    /// Numeric id assigned by the audio server.
    pub id: u32,
    /// 0-based rank within the filtered listing; even = left, odd = right.
    pub position: usize,
}

/// Queries live ports from the audio server. No caching: ports are ephemeral
/// and re-enumerated on every call.
#[derive(Debug, Clone)]
pub struct PortDirectory {
    runner: ToolRunner,
}

impl PortDirectory {
    #[must_use]
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }

    /// List port lines verbatim, in the order the tool emits them.
    ///
    /// # Errors
    /// Returns `Query`/`Spawn` if `pw-link` cannot be run.
    pub async fn list_ports(&self, direction: Direction) -> Result<Vec<String>, RouteError> {
        self.runner
            .lines("pw-link", &["-I", direction.flag()])
            .await
    }

    /// Resolve a name pattern to ports: substring filter over the listing,
    /// leading numeric id per line, position = rank in the filtered sequence.
    ///
    /// Zero matches yields an empty vec, not an error; callers decide whether
    /// emptiness means `EndpointNotFound`.
    ///
    /// # Errors
    /// Returns `Query`/`Spawn` if the listing itself fails.
    pub async fn find_matching(
        &self,
        direction: Direction,
        pattern: &str,
    ) -> Result<Vec<Port>, RouteError> {
        let lines = self.list_ports(direction).await?;
        Ok(extract_ports(&lines, pattern))
    }
}

/// Filter `lines` to those containing `pattern` and extract a [`Port`] from
/// each: the id is the first integer substring of the line, the position is
/// the rank among successful extractions.
///
/// A line with no integer is malformed; it is logged and skipped without
/// disturbing the positions of the well-formed lines around it.
#[must_use]
pub fn extract_ports(lines: &[String], pattern: &str) -> Vec<Port> {
    let mut ports = Vec::new();
    for line in lines.iter().filter(|l| l.contains(pattern)) {
        match parse_port_id(line) {
            Ok(id) => ports.push(Port {
                id,
                position: ports.len(),
            }),
            Err(e) => warn!("skipping port line: {}", e),
        }
    }
    ports
}

/// First integer substring of a listing line.
fn parse_port_id(line: &str) -> Result<u32, RouteError> {
    ID_RE
        .find(line)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| RouteError::MalformedLine(line.trim().to_string()))
}
