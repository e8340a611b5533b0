//! Configuration management
//!
//! Loads and validates the TOML configuration file: endpoint names used by
//! the routing pass, the host application command line, and supervisor
//! settings. A commented default is written on first run.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{Context, ContextCompat, Result, bail};
use serde::Deserialize;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub settings: Settings,
    pub endpoints: Endpoints,
    pub host: Host,
}

/// Supervisor and tooling settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub log_level: String,
    /// Seconds between supervision passes; also the only retry mechanism.
    pub poll_interval_secs: u64,
    /// Hard cap on any single external tool invocation.
    pub tool_timeout_ms: u64,
    /// Re-query the link table after each routing pass and log what's missing.
    pub verify_links: bool,
}

/// Virtual endpoint names. These double as substring patterns over the port
/// listings, so they must be distinctive.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Endpoints {
    pub sink: String,
    pub source: String,
}

/// The audio-processing host application the supervisor keeps alive.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Host {
    pub command: String,
    pub args: Vec<String>,
    /// Appended to the command line unless the supervisor runs with --show.
    pub headless_arg: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            poll_interval_secs: 5,
            tool_timeout_ms: 5000,
            verify_links: false,
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            sink: "Default-Sink".to_string(),
            source: "Virtual-Source".to_string(),
        }
    }
}

impl Default for Host {
    fn default() -> Self {
        Self {
            command: "carla-jack-multi".to_string(),
            args: Vec::new(),
            headless_arg: "-n".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            endpoints: Endpoints::default(),
            host: Host::default(),
        }
    }
}

impl Config {
    /// Load configuration from the XDG config path, writing the default file
    /// first if none exists.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read/written, fails to parse,
    /// or fails validation.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, writing the default file
    /// first if none exists.
    ///
    /// The first-run notice goes to stderr: this runs before the tracing
    /// subscriber exists, since the subscriber's level comes from the config.
    ///
    /// # Errors
    /// Same failure modes as [`Config::load`].
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            fs::write(config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write config: {config_path:?}"))?;
            eprintln!("Created default config at: {}", config_path.display());
        }

        let contents = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config: {config_path:?}"))?;

        Self::from_toml_str(&contents).with_context(|| format!("Invalid config: {config_path:?}"))
    }

    /// Parse and validate a config from TOML text.
    ///
    /// # Errors
    /// Returns an error on parse failure or validation failure.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        match self.settings.log_level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            level => {
                bail!("Invalid log_level '{level}'. Must be: error, warn, info, debug, or trace")
            }
        }

        if self.settings.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be greater than 0");
        }
        if self.settings.tool_timeout_ms == 0 {
            bail!("tool_timeout_ms must be greater than 0");
        }

        for (field, name) in [
            ("endpoints.sink", &self.endpoints.sink),
            ("endpoints.source", &self.endpoints.source),
        ] {
            if name.is_empty() {
                bail!("{field} must not be empty");
            }
            if name.chars().any(char::is_whitespace) {
                bail!("{field} must not contain whitespace: '{name}'");
            }
        }

        if self.host.command.is_empty() {
            bail!("host.command must not be empty");
        }

        Ok(())
    }

    /// Tool timeout as a [`Duration`].
    #[must_use]
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.settings.tool_timeout_ms)
    }

    /// Poll interval as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.settings.poll_interval_secs)
    }

    /// XDG config path, creating the directory if needed.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined or created.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("pwpatch");
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config dir: {config_dir:?}"))?;
        Ok(config_dir.join("config.toml"))
    }
}

const DEFAULT_CONFIG: &str = r#"# pwpatch configuration
#
# The supervisor (pwpatchd) keeps the host application alive and re-wires
# the virtual source to the virtual sink on every poll.

[settings]
log_level = "info"        # error, warn, info, debug, trace
poll_interval_secs = 5    # seconds between supervision passes
tool_timeout_ms = 5000    # hard cap on any pactl/pw-link invocation
verify_links = false      # re-query the link table after each routing pass

[endpoints]
# Names double as substring patterns over port listings - keep them distinctive.
sink = "Default-Sink"
source = "Virtual-Source"

[host]
# Audio-processing host the supervisor keeps running.
command = "carla-jack-multi"
args = []                 # e.g. ["/home/you/.audio/session.carxp"]
headless_arg = "-n"       # appended unless pwpatchd runs with --show
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_file_parses_and_validates() {
        let config = Config::from_toml_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.settings.poll_interval_secs, 5);
        assert_eq!(config.endpoints.sink, "Default-Sink");
        assert_eq!(config.endpoints.source, "Virtual-Source");
        assert_eq!(config.host.command, "carla-jack-multi");
        assert!(!config.settings.verify_links);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.settings.log_level, "info");
        assert_eq!(config.settings.tool_timeout_ms, 5000);
        assert_eq!(config.host.headless_arg, "-n");
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let config = Config::from_toml_str(
            r#"
            [endpoints]
            sink = "Studio-Sink"
            "#,
        )
        .unwrap();
        assert_eq!(config.endpoints.sink, "Studio-Sink");
        assert_eq!(config.endpoints.source, "Virtual-Source");
    }

    #[test]
    fn rejects_invalid_log_level() {
        let toml = r#"
            [settings]
            log_level = "loud"
        "#;
        assert!(Config::from_toml_str(toml).is_err());
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let toml = r"
            [settings]
            poll_interval_secs = 0
        ";
        assert!(Config::from_toml_str(toml).is_err());
    }

    #[test]
    fn rejects_endpoint_names_with_whitespace() {
        let toml = r#"
            [endpoints]
            sink = "My Sink"
        "#;
        assert!(Config::from_toml_str(toml).is_err());
    }

    #[test]
    fn rejects_empty_host_command() {
        let toml = r#"
            [host]
            command = ""
        "#;
        assert!(Config::from_toml_str(toml).is_err());
    }

    #[test]
    fn first_load_writes_default_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.endpoints.sink, "Default-Sink");
        assert_eq!(config.settings.poll_interval_secs, 5);
        assert_eq!(fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);
    }

    #[test]
    fn load_keeps_existing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [endpoints]
            sink = "Studio-Sink"
            "#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.endpoints.sink, "Studio-Sink");
        assert!(!fs::read_to_string(&path).unwrap().contains("Default-Sink"));
    }

    #[test]
    fn load_rejects_invalid_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "not toml at all [").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn rejects_unknown_keys() {
        let toml = r"
            [settings]
            pol_interval_secs = 5
        ";
        assert!(Config::from_toml_str(toml).is_err());
    }
}
