//! Virtual endpoint lifecycle
//!
//! Manages the null-sink and pipe-source modules on the audio server via
//! `pactl`. The server's module table is global mutable state shared with
//! every other application on the host, so nothing here is atomic: each
//! operation re-queries presence before acting and is safe to repeat.

use tracing::{debug, info};

use crate::error::RouteError;
use crate::tool::{Runner, ToolRunner};

const NULL_SINK_MODULE: &str = "module-null-sink";
const PIPE_SOURCE_MODULE: &str = "module-pipe-source";

/// Creates, destroys, and counts virtual sink/source endpoints.
#[derive(Debug, Clone)]
pub struct EndpointRegistry<R = ToolRunner> {
    runner: R,
    sink_name: String,
    source_name: String,
}

impl<R: Runner> EndpointRegistry<R> {
    #[must_use]
    pub fn new(runner: R, sink_name: &str, source_name: &str) -> Self {
        Self {
            runner,
            sink_name: sink_name.to_string(),
            source_name: source_name.to_string(),
        }
    }

    /// Count lines in the server's full object listing that contain `pattern`.
    ///
    /// A query failure propagates as [`RouteError::Query`]; it is never
    /// silently treated as "zero endpoints".
    ///
    /// # Errors
    /// Returns `Query`/`Spawn` if `pactl list` cannot be run.
    pub async fn count_matching(&self, pattern: &str) -> Result<usize, RouteError> {
        let lines = self.runner.lines("pactl", &["list"]).await?;
        Ok(lines.iter().filter(|l| l.contains(pattern)).count())
    }

    /// Load a null-sink module. The server does not dedupe: calling this
    /// while the sink exists loads a duplicate. Use [`Self::ensure_sink`]
    /// unless a duplicate is acceptable.
    ///
    /// # Errors
    /// Returns `Query`/`Spawn` if the load command fails.
    pub async fn create_sink(&self) -> Result<(), RouteError> {
        let arg = format!("sink_name={}", self.sink_name);
        self.runner
            .output("pactl", &["load-module", NULL_SINK_MODULE, &arg])
            .await?;
        info!("loaded {} as {}", NULL_SINK_MODULE, self.sink_name);
        Ok(())
    }

    /// Load a pipe-source module. Same duplication caveat as [`Self::create_sink`].
    ///
    /// # Errors
    /// Returns `Query`/`Spawn` if the load command fails.
    pub async fn create_source(&self) -> Result<(), RouteError> {
        let arg = format!("source_name={}", self.source_name);
        self.runner
            .output("pactl", &["load-module", PIPE_SOURCE_MODULE, &arg])
            .await?;
        info!("loaded {} as {}", PIPE_SOURCE_MODULE, self.source_name);
        Ok(())
    }

    /// Create the sink only if no matching endpoint exists yet.
    ///
    /// # Errors
    /// Returns `Query`/`Spawn` if the presence check or the load fails.
    pub async fn ensure_sink(&self) -> Result<(), RouteError> {
        if self.count_matching(&self.sink_name).await? > 0 {
            debug!("sink {} already present, skipping create", self.sink_name);
            return Ok(());
        }
        self.create_sink().await
    }

    /// Create the source only if no matching endpoint exists yet.
    ///
    /// # Errors
    /// Returns `Query`/`Spawn` if the presence check or the load fails.
    pub async fn ensure_source(&self) -> Result<(), RouteError> {
        if self.count_matching(&self.source_name).await? > 0 {
            debug!(
                "source {} already present, skipping create",
                self.source_name
            );
            return Ok(());
        }
        self.create_source().await
    }

    /// Unload the most recently loaded null-sink module, if any.
    ///
    /// # Errors
    /// Returns `Query`/`Spawn` if the presence check or the unload fails.
    pub async fn destroy_sink(&self) -> Result<(), RouteError> {
        if self.count_matching(&self.sink_name).await? == 0 {
            debug!("no sink matching {}, nothing to unload", self.sink_name);
            return Ok(());
        }
        self.runner
            .output("pactl", &["unload-module", NULL_SINK_MODULE])
            .await?;
        info!("unloaded {}", NULL_SINK_MODULE);
        Ok(())
    }

    /// Unload the most recently loaded pipe-source module, if any.
    ///
    /// # Errors
    /// Returns `Query`/`Spawn` if the presence check or the unload fails.
    pub async fn destroy_source(&self) -> Result<(), RouteError> {
        if self.count_matching(&self.source_name).await? == 0 {
            debug!(
                "no source matching {}, nothing to unload",
                self.source_name
            );
            return Ok(());
        }
        self.runner
            .output("pactl", &["unload-module", PIPE_SOURCE_MODULE])
            .await?;
        info!("unloaded {}", PIPE_SOURCE_MODULE);
        Ok(())
    }

    /// Destroy then recreate both endpoints, unconditionally.
    ///
    /// Guarantees a clean single instance of each regardless of prior drift
    /// (duplicates, stale modules from a crashed run). The source loads
    /// before the sink; the pipe source must exist when the sink comes up.
    ///
    /// # Errors
    /// Returns the first `Query`/`Spawn` error encountered.
    pub async fn reset(&self) -> Result<(), RouteError> {
        self.teardown().await?;
        self.create_source().await?;
        self.create_sink().await?;
        Ok(())
    }

    /// Destroy both endpoints, no-op for whichever is absent.
    ///
    /// # Errors
    /// Returns the first `Query`/`Spawn` error encountered.
    pub async fn teardown(&self) -> Result<(), RouteError> {
        self.destroy_sink().await?;
        self.destroy_source().await?;
        Ok(())
    }
}

/// Set the server's processing quantum (sample buffer size).
///
/// # Errors
/// Returns `Query`/`Spawn` if `pw-metadata` fails.
pub async fn set_quantum(runner: &ToolRunner, samples: u32) -> Result<(), RouteError> {
    let value = samples.to_string();
    runner
        .output(
            "pw-metadata",
            &["-n", "settings", "0", "clock.force-quantum", &value],
        )
        .await?;
    info!("set clock.force-quantum to {}", samples);
    Ok(())
}
