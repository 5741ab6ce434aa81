//! Configuration types for agenda-get

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Output location settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory agendas are written to (None = `$HOME/agendas`)
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Remove everything in the output directory before the run (default: true)
    ///
    /// Diagnostic files from a previous run would otherwise be mistaken for
    /// fresh failures.
    #[serde(default = "default_true")]
    pub clear_on_start: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            clear_on_start: true,
        }
    }
}

/// HTTP client settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header sent with every request (default: "Agenda-Get/3.0")
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

/// Terminal progress indicator settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Draw the progress line at all (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Redraw interval (default: 500ms)
    #[serde(default = "default_redraw_interval", with = "millis_serde")]
    pub interval: Duration,

    /// Width of the fill bar in characters (default: 20)
    #[serde(default = "default_bar_width")]
    pub bar_width: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_redraw_interval(),
            bar_width: default_bar_width(),
        }
    }
}

/// Main configuration for agenda-get
///
/// Every field has a default, so an empty JSON object is a valid config file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Output location
    #[serde(default)]
    pub output: OutputConfig,

    /// HTTP client behavior
    #[serde(default)]
    pub http: HttpConfig,

    /// Progress display
    #[serde(default)]
    pub progress: ProgressConfig,

    /// Sites to fetch, by entity name (empty = every site in the catalog)
    #[serde(default)]
    pub sites: Vec<String>,
}

impl Config {
    /// Load a configuration from a JSON file
    ///
    /// Missing fields fall back to their defaults. The result is validated
    /// before it is returned.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("can't read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the run misbehave
    pub fn validate(&self) -> Result<()> {
        if self.progress.interval.is_zero() {
            return Err(Error::config(
                "progress.interval",
                "redraw interval must be greater than zero",
            ));
        }
        if self.progress.bar_width == 0 {
            return Err(Error::config(
                "progress.bar_width",
                "bar width must be greater than zero",
            ));
        }
        if self.http.timeout.is_zero() {
            return Err(Error::config(
                "http.timeout",
                "request timeout must be greater than zero",
            ));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(Error::config(
                "http.user_agent",
                "user agent must not be empty",
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    "Agenda-Get/3.0".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_redraw_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_bar_width() -> usize {
    20
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds)
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
