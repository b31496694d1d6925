// Logger configuration
use serde::{Deserialize, Serialize};

use crate::redactor::RedactionConfig;

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty when attached to a colour terminal in development, JSON otherwise
    #[default]
    Auto,
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub log_level: String,
    pub format: LogFormat,
    pub redaction_enabled: bool,
    pub hash_for_correlation: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Auto,
            redaction_enabled: true,
            hash_for_correlation: true,
        }
    }
}

impl LoggerConfig {
    pub fn redaction(&self) -> RedactionConfig {
        RedactionConfig {
            enabled: self.redaction_enabled,
            hash_for_correlation: self.hash_for_correlation,
            ..RedactionConfig::default()
        }
    }
}
