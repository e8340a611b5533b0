//! pwpatch - `PipeWire` Patcher
//!
//! Discovers audio endpoints on a `PipeWire`/PulseAudio server, creates or
//! tears down virtual endpoints, and wires source channels to sink channels
//! by invoking the server's command-line tools (`pw-link`, `pactl`,
//! `pw-metadata`) and parsing their textual output.
//!
//! The core is the channel-matching protocol: resolve human-supplied names to
//! numeric port ids from free-text listings, pair left/right channels by
//! position parity, and issue link/unlink commands idempotently. The
//! `pwpatchd` binary supervises an audio-processing host on top of that,
//! re-establishing the routing on a timer.

pub mod cli;
pub mod config;
pub mod error;
pub mod ports;
pub mod registry;
pub mod router;
pub mod supervisor;
pub mod tool;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::RouteError;
pub use tool::ToolRunner;
