//! Watch configuration file support for diffi.
//!
//! Loads `diffi.toml` from the watched directory, falling back to
//! `<config dir>/diffi/config.toml`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use diffi_core::{BackoffLadder, FailureStep, PollConfig, WorkingTreeResolver, DEFAULT_INTERVAL};

/// Watch settings loaded from `diffi.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Base polling interval, e.g. `"5s"`
    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,
    /// Report untracked files (default: true)
    pub include_untracked: Option<bool>,
    /// Only report paths with an image extension (default: false)
    pub images_only: Option<bool>,
    /// Explicit failure ladder; the default is scaled to `interval`
    #[serde(default)]
    pub ladder: Vec<RungConfig>,
}

/// One rung of a configured failure ladder
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RungConfig {
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
    /// Surface the failure to the user at this rung
    #[serde(default)]
    pub alert: bool,
}

/// The config file name
pub const CONFIG_FILE_NAME: &str = "diffi.toml";

/// Flags that take precedence over the file
#[derive(Debug, Default, Clone, Copy)]
pub struct Overrides {
    pub interval: Option<Duration>,
    pub no_untracked: bool,
    pub images_only: bool,
}

impl WatchConfig {
    /// Load configuration for a watched directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if a project or user file exists and parses
    /// - `Ok(None)` if neither file exists
    /// - `Err(...)` if a file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        if let Some(config) = Self::load_from(&working_dir.join(CONFIG_FILE_NAME))? {
            return Ok(Some(config));
        }

        match user_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    fn load_from(config_path: &Path) -> Result<Option<Self>> {
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: WatchConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Interval and ladder for the poller.
    /// Priority: flag > file > default
    pub fn poll_config(&self, overrides: Overrides) -> Result<PollConfig> {
        let interval = overrides
            .interval
            .or(self.interval)
            .unwrap_or(DEFAULT_INTERVAL);
        if interval.is_zero() {
            anyhow::bail!("Polling interval must be greater than zero");
        }
        if interval.checked_mul(8).is_none() {
            anyhow::bail!("Polling interval {:?} is too large", interval);
        }

        let config = PollConfig::with_interval(interval);
        if self.ladder.is_empty() {
            return Ok(config);
        }

        let steps = self
            .ladder
            .iter()
            .map(|rung| {
                if rung.alert {
                    FailureStep::alert(rung.delay)
                } else {
                    FailureStep::wait(rung.delay)
                }
            })
            .collect();
        let ladder = BackoffLadder::new(steps).context("Invalid [[ladder]] configuration")?;

        Ok(config.with_ladder(ladder))
    }

    pub fn resolver(&self, overrides: Overrides) -> WorkingTreeResolver {
        let include_untracked = !overrides.no_untracked && self.include_untracked.unwrap_or(true);
        let images_only = overrides.images_only || self.images_only.unwrap_or(false);

        WorkingTreeResolver::new()
            .with_untracked(include_untracked)
            .images_only(images_only)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("diffi").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(content: &str) -> WatchConfig {
        toml::from_str(content).unwrap()
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse("");
        let poll = config.poll_config(Overrides::default()).unwrap();

        assert_eq!(poll.interval, DEFAULT_INTERVAL);
        assert_eq!(poll.ladder, BackoffLadder::default());
    }

    #[test]
    fn test_interval_scales_default_ladder() {
        let config = parse(r#"interval = "2s""#);
        let poll = config.poll_config(Overrides::default()).unwrap();

        assert_eq!(poll.interval, Duration::from_secs(2));
        assert_eq!(poll.ladder, BackoffLadder::default_for(Duration::from_secs(2)));
    }

    #[test]
    fn test_flag_beats_file() {
        let config = parse(r#"interval = "2s""#);
        let overrides = Overrides {
            interval: Some(Duration::from_secs(30)),
            ..Overrides::default()
        };

        let poll = config.poll_config(overrides).unwrap();
        assert_eq!(poll.interval, Duration::from_secs(30));
    }

    #[test]
    fn test_explicit_ladder() {
        let config = parse(
            r#"
            [[ladder]]
            delay = "1s"

            [[ladder]]
            delay = "1m"
            alert = true
            "#,
        );
        let poll = config.poll_config(Overrides::default()).unwrap();

        assert_eq!(
            poll.ladder.steps(),
            &[
                FailureStep::wait(Duration::from_secs(1)),
                FailureStep::alert(Duration::from_secs(60)),
            ]
        );
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = parse(r#"interval = "0s""#);
        assert!(config.poll_config(Overrides::default()).is_err());
    }

    #[test]
    fn test_oversized_interval_rejected() {
        let overrides = Overrides {
            interval: Some(Duration::from_secs(u64::MAX / 4)),
            ..Overrides::default()
        };
        let err = WatchConfig::default().poll_config(overrides).unwrap_err();
        assert!(err.to_string().contains("too large"));

        let config = parse(r#"interval = "100000000000y""#);
        assert!(config.poll_config(Overrides::default()).is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(toml::from_str::<WatchConfig>("colour = true").is_err());
        assert!(toml::from_str::<WatchConfig>("[[ladder]]\ndelay = \"1s\"\nretry = 3").is_err());
    }

    #[test]
    fn test_load_project_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "images_only = true\ninclude_untracked = false\n",
        )
        .unwrap();

        let config = WatchConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.images_only, Some(true));
        assert_eq!(config.include_untracked, Some(false));
    }

    #[test]
    fn test_load_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "interval = [").unwrap();

        assert!(WatchConfig::load(dir.path()).is_err());
    }
}
