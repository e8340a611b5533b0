//! Supervisor mode
//!
//! Owns the restart/liveness policy for the audio-processing host and
//! re-establishes the channel routing on a fixed interval. Every failure
//! inside the loop is logged and the loop continues to the next poll; the
//! interval is the only retry mechanism. The supervisor never exits on
//! routing errors while in automatic mode.

use std::process::Stdio;

use color_eyre::eyre::Result;
use sd_notify::NotifyState;
use tokio::signal;
use tracing::{debug, error, info, warn};

use crate::cli::DaemonArgs;
use crate::config::Config;
use crate::error::RouteError;
use crate::registry::EndpointRegistry;
use crate::router::ChannelRouter;
use crate::tool::{Capture, ToolRunner};

/// Keeps the host application alive and the virtual endpoints wired.
pub struct Supervisor {
    config: Config,
    runner: ToolRunner,
    registry: EndpointRegistry,
    router: ChannelRouter,
    show: bool,
}

/// Run the supervisor with the given configuration and CLI overrides.
///
/// # Errors
/// Returns an error only for startup failures (teardown/reset against an
/// unreachable server). Errors inside the automatic loop are logged instead.
pub async fn run(mut config: Config, args: DaemonArgs) -> Result<()> {
    if let Some(interval) = args.interval {
        config.settings.poll_interval_secs = interval;
    }
    if let Some(ref source) = args.source {
        config.endpoints.source = source.clone();
    }
    if let Some(ref sink) = args.sink {
        config.endpoints.sink = sink.clone();
    }

    init_tracing(&config.settings.log_level);

    let runner = ToolRunner::new(config.tool_timeout());
    let supervisor = Supervisor {
        registry: EndpointRegistry::new(runner, &config.endpoints.sink, &config.endpoints.source),
        router: ChannelRouter::new(runner),
        show: args.show,
        runner,
        config,
    };

    // Clean slate: any running host instance is stopped before we rebuild
    // endpoints, so it reconnects to the fresh graph when relaunched.
    supervisor.stop_host().await;

    if args.kill {
        info!("tearing down virtual endpoints");
        supervisor.registry.teardown().await?;
        return Ok(());
    }

    supervisor.registry.reset().await?;
    info!(
        "endpoints ready: sink={} source={}",
        supervisor.config.endpoints.sink, supervisor.config.endpoints.source
    );

    if !args.auto {
        if let Err(e) = supervisor.spawn_host() {
            error!("host launch failed: {e}");
        }
        return Ok(());
    }

    supervisor.run_loop().await;
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("pwpatch={log_level}")));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

impl Supervisor {
    /// The periodic supervision loop: liveness check + routing pass per tick.
    async fn run_loop(&self) {
        info!(
            "supervising every {}s",
            self.config.settings.poll_interval_secs
        );
        let _ = sd_notify::notify(false, &[NotifyState::Ready]);

        let mut ticker = tokio::time::interval(self.config.poll_interval());
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.supervise_once().await;
                }
                _ = signal::ctrl_c() => {
                    info!("shutting down");
                    let _ = sd_notify::notify(false, &[NotifyState::Stopping]);
                    break;
                }
            }
        }
    }

    /// One supervision pass. Never fails; every error is logged and the next
    /// interval retries.
    async fn supervise_once(&self) {
        match self.host_pid().await {
            Ok(Some(pid)) => debug!("host {} running (pid {})", self.config.host.command, pid),
            Ok(None) => {
                info!("host {} not running, launching", self.config.host.command);
                if let Err(e) = self.spawn_host() {
                    error!("host launch failed: {e}");
                }
            }
            Err(e) => error!("host liveness check failed: {e}"),
        }

        self.routing_pass().await;
    }

    async fn routing_pass(&self) {
        let sink = &self.config.endpoints.sink;
        let source = &self.config.endpoints.source;

        match self.router.connect(sink, source).await {
            Ok(routes) => {
                if self.config.settings.verify_links {
                    match self.router.verify(&routes).await {
                        Ok(confirmed) if confirmed < routes.len() => warn!(
                            "only {} of {} links confirmed for {} -> {}",
                            confirmed,
                            routes.len(),
                            source,
                            sink
                        ),
                        Ok(_) => {}
                        Err(e) => warn!("link verification failed: {e}"),
                    }
                }
            }
            Err(RouteError::EndpointNotFound(pattern)) => {
                warn!("routing skipped, no ports matched `{pattern}`");
            }
            Err(e) => error!("routing pass failed: {e}"),
        }
    }

    /// Pid of the running host instance, if any.
    ///
    /// Timeouts and abnormal exits propagate as errors instead of reading as
    /// "not running": spawning a second host next to a live one is worse than
    /// skipping a launch until the check recovers.
    async fn host_pid(&self) -> Result<Option<u32>, RouteError> {
        let capture = self
            .runner
            .capture("pgrep", &["-f", &self.config.host.command])
            .await?;
        interpret_pgrep(&capture)
    }

    /// Stop the running host instance, if any. Best-effort.
    async fn stop_host(&self) {
        match self.host_pid().await {
            Ok(Some(pid)) => {
                info!("stopping host {} (pid {})", self.config.host.command, pid);
                let pid = pid.to_string();
                if let Err(e) = self.runner.dispatch("kill", &[&pid]).await {
                    warn!("could not stop host: {e}");
                }
            }
            Ok(None) => {}
            Err(e) => warn!("host liveness check failed: {e}"),
        }
    }

    /// Launch the host detached, headless unless --show was given. A reaper
    /// task waits on the child so exits do not leave zombies behind.
    fn spawn_host(&self) -> Result<(), RouteError> {
        let host = &self.config.host;
        let mut cmd = tokio::process::Command::new(&host.command);
        cmd.args(&host.args);
        if !self.show && !host.headless_arg.is_empty() {
            cmd.arg(&host.headless_arg);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = cmd
            .spawn()
            .map_err(|e| RouteError::spawn(&host.command, e))?;

        info!(
            "launched {} ({})",
            host.command,
            if self.show { "with UI" } else { "headless" }
        );

        tokio::spawn(async move {
            let _ = child.wait().await;
        });
        Ok(())
    }
}

/// Map a completed `pgrep` invocation to a pid. Exit 1 means "no processes
/// matched" and is the only non-zero exit carrying liveness information;
/// anything else is a failed check.
fn interpret_pgrep(capture: &Capture) -> Result<Option<u32>, RouteError> {
    match capture.code {
        Some(0) => Ok(capture
            .stdout
            .lines()
            .next()
            .and_then(|l| l.trim().parse().ok())),
        Some(1) => Ok(None),
        Some(code) => Err(RouteError::query(
            "pgrep",
            format!("exit {}: {}", code, capture.stderr.trim()),
        )),
        None => Err(RouteError::query("pgrep", "killed by signal")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(code: Option<i32>, stdout: &str) -> Capture {
        Capture {
            code,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    #[test]
    fn pgrep_match_yields_first_pid() {
        let pid = interpret_pgrep(&capture(Some(0), "4321\n4400\n")).unwrap();
        assert_eq!(pid, Some(4321));
    }

    #[test]
    fn pgrep_no_match_means_not_running() {
        let pid = interpret_pgrep(&capture(Some(1), "")).unwrap();
        assert_eq!(pid, None);
    }

    #[test]
    fn pgrep_abnormal_exit_is_an_error_not_a_missing_host() {
        let err = interpret_pgrep(&capture(Some(2), "")).unwrap_err();
        assert!(matches!(err, RouteError::Query { .. }));
    }

    #[test]
    fn pgrep_signal_death_is_an_error() {
        let err = interpret_pgrep(&capture(None, "")).unwrap_err();
        assert!(matches!(err, RouteError::Query { .. }));
    }
}
