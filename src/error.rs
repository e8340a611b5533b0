//! Error types for the routing core
//!
//! The routing modules return typed errors so callers can tell a missing
//! endpoint apart from a failing tool. Binaries convert these into
//! `color_eyre` reports at the top level.

use std::io;

/// Errors produced while querying or mutating audio-server state.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// An external tool could not be reached, timed out, or exited non-zero
    /// on a query path where its output is required.
    #[error("`{tool}` query failed: {reason}")]
    Query { tool: String, reason: String },

    /// A name pattern resolved to zero ports. Aborts the current routing
    /// attempt only; the supervisor loop retries on the next interval.
    #[error("no ports matched pattern `{0}`")]
    EndpointNotFound(String),

    /// A listing line with no extractable numeric id. Always recovered
    /// locally by the port directory (skip and continue).
    #[error("no port id in listing line `{0}`")]
    MalformedLine(String),

    /// A process failed to launch (external tool or the host application).
    #[error("failed to spawn `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
}

impl RouteError {
    pub(crate) fn query(tool: &str, reason: impl Into<String>) -> Self {
        Self::Query {
            tool: tool.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn spawn(command: &str, source: io::Error) -> Self {
        Self::Spawn {
            command: command.to_string(),
            source,
        }
    }
}
