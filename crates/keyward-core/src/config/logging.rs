//! `[logging]` section.

use serde::{Deserialize, Serialize};

/// Output encoding for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line, human readable.
    Pretty,
    /// Single-line, human readable.
    Compact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parses_lowercase() {
        let parsed: LoggingConfig =
            serde_json::from_str(r#"{"format":"compact"}"#).unwrap();
        assert_eq!(parsed.format, LogFormat::Compact);
        assert_eq!(parsed.level, "info");
    }
}
