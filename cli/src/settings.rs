use fskmodem_core::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read session file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse session file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Session parameters as stored in a JSON file; absent fields keep their defaults
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_start_threshold: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_end_threshold: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receive_timeout_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preamble_seconds: Option<f64>,
}

impl SessionFile {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay the fields that are set onto `config`
    pub fn apply(&self, mut config: SessionConfig) -> SessionConfig {
        if let Some(baud_rate) = self.baud_rate {
            config.baud_rate = baud_rate;
        }
        if let Some(start) = self.signal_start_threshold {
            config.signal_start_threshold = start;
        }
        if let Some(end) = self.signal_end_threshold {
            config.signal_end_threshold = end;
        }
        if let Some(timeout) = self.receive_timeout_seconds {
            config.receive_timeout_seconds = timeout;
        }
        if let Some(preamble) = self.preamble_seconds {
            config.preamble_seconds = preamble;
        }
        config
    }
}

impl From<&SessionConfig> for SessionFile {
    fn from(config: &SessionConfig) -> Self {
        Self {
            baud_rate: Some(config.baud_rate),
            signal_start_threshold: Some(config.signal_start_threshold),
            signal_end_threshold: Some(config.signal_end_threshold),
            receive_timeout_seconds: Some(config.receive_timeout_seconds),
            preamble_seconds: Some(config.preamble_seconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file: SessionFile = serde_json::from_str(r#"{ "baud_rate": 2400 }"#).unwrap();
        let config = file.apply(SessionConfig::default());
        assert_eq!(config.baud_rate, 2400);
        assert_eq!(config.signal_start_threshold, 18000);
        assert_eq!(config.signal_end_threshold, 14000);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<SessionFile, _> = serde_json::from_str(r#"{ "baud": 2400 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_effective_config_round_trips() {
        let config = SessionConfig::new(4800).with_thresholds(20000, 12000);
        let json = serde_json::to_string(&SessionFile::from(&config)).unwrap();
        let parsed: SessionFile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.apply(SessionConfig::default()), config);
    }

    #[test]
    fn test_load_missing_file() {
        let result = SessionFile::load(Path::new("/nonexistent/session.json"));
        assert!(matches!(result, Err(SettingsError::Read { .. })));
    }
}
