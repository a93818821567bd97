use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;

/// Structured log events for a watch session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    PollingStarted {
        path: PathBuf,
        interval_secs: f64,
    },
    ChangesDetected {
        path: PathBuf,
        count: usize,
    },
    ResolutionFailed {
        path: PathBuf,
        error: String,
        consecutive_failures: usize,
        retry_in_secs: f64,
        user_visible: bool,
    },
    PollingStopped {
        path: PathBuf,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }

    /// Early ladder failures stay out of human-readable output.
    fn is_quiet(&self) -> bool {
        matches!(
            self,
            LogEvent::ResolutionFailed {
                user_visible: false,
                ..
            }
        )
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for watch events, written to stderr so stdout stays free for
/// change lists.
pub struct Logger {
    format: LogFormat,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self { format }
    }

    pub fn log(&self, event: &LogEvent) {
        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        let _ = writeln!(std::io::stderr(), "{}", event.with_timestamp());
    }

    fn log_pretty(&self, event: &LogEvent) {
        if event.is_quiet() {
            return;
        }

        let mut stderr = std::io::stderr();
        match event {
            LogEvent::PollingStarted {
                path,
                interval_secs,
            } => {
                let _ = writeln!(
                    stderr,
                    "{} {} {} {}",
                    "▶".bright_cyan(),
                    "Watching".bright_cyan().bold(),
                    path.display(),
                    format!("(every {:.0}s)", interval_secs).dimmed()
                );
            }
            LogEvent::ChangesDetected { count, .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} changed {}",
                    "●".bright_blue(),
                    count,
                    if *count == 1 { "file" } else { "files" }
                );
            }
            LogEvent::ResolutionFailed {
                error,
                consecutive_failures,
                retry_in_secs,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "✗".bright_red(),
                    error.bright_red(),
                    format!(
                        "(failure {}, retrying in {:.0}s)",
                        consecutive_failures, retry_in_secs
                    )
                    .dimmed()
                );
            }
            LogEvent::PollingStopped { path } => {
                let _ = writeln!(
                    stderr,
                    "{} Stopped watching {}",
                    "■".bright_yellow(),
                    path.display()
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        if event.is_quiet() {
            return;
        }

        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::PollingStarted {
                path,
                interval_secs,
            } => format!(
                "[{}] watch:start {} {:.0}s",
                timestamp,
                path.display(),
                interval_secs
            ),
            LogEvent::ChangesDetected { count, .. } => {
                format!("[{}] changes:{}", timestamp, count)
            }
            LogEvent::ResolutionFailed {
                error,
                consecutive_failures,
                retry_in_secs,
                ..
            } => format!(
                "[{}] error:{} retry={:.0}s {}",
                timestamp, consecutive_failures, retry_in_secs, error
            ),
            LogEvent::PollingStopped { path } => {
                format!("[{}] watch:stop {}", timestamp, path.display())
            }
        };
        let _ = writeln!(std::io::stderr(), "{}", msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(user_visible: bool) -> LogEvent {
        LogEvent::ResolutionFailed {
            path: PathBuf::from("/repo"),
            error: "Repository unavailable".to_string(),
            consecutive_failures: 3,
            retry_in_secs: 10.0,
            user_visible,
        }
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("compact".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_json_event_is_tagged_and_timestamped() {
        let value = failure(true).with_timestamp();

        assert_eq!(value["event"], "resolution_failed");
        assert_eq!(value["consecutive_failures"], 3);
        assert_eq!(value["user_visible"], true);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_event_round_trips_through_json() {
        let event = LogEvent::PollingStarted {
            path: PathBuf::from("/repo"),
            interval_secs: 5.0,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(serde_json::from_str::<LogEvent>(&json).unwrap(), event);
    }

    #[test]
    fn test_only_hidden_failures_are_quiet() {
        assert!(failure(false).is_quiet());
        assert!(!failure(true).is_quiet());
        assert!(!LogEvent::PollingStopped {
            path: PathBuf::from("/repo")
        }
        .is_quiet());
    }
}
