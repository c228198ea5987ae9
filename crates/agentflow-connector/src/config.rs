//! Connector configuration.
//!
//! Precedence, lowest to highest: built-in defaults, TOML file, the
//! `AGENTFLOW_WEBSOCKET_URL` environment variable, command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use agentflow_protocol::{
    DEFAULT_ENDPOINT, ENDPOINT_ENV_VAR, ENTRY_AGENT, KICKOFF_MESSAGE, RECONNECT_DELAY_SECS,
    SIMULATION_STEP_MS,
};

use crate::ConnectorError;

/// Where inbound events come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// The real backend over WebSocket.
    #[default]
    Live,
    /// The scripted in-process backend.
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Delay between two scripted events.
    pub step_interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step_interval_ms: SIMULATION_STEP_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Backend WebSocket endpoint.
    pub endpoint: String,
    /// Fixed delay before each reconnection attempt.
    pub reconnect_delay_secs: u64,
    /// Agent receiving chat messages and the run kickoff.
    pub entry_agent: String,
    /// Text of the kickoff message sent when a run starts.
    pub kickoff_message: String,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
    pub source: DataSource,
    pub simulation: SimulationConfig,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            reconnect_delay_secs: RECONNECT_DELAY_SECS,
            entry_agent: ENTRY_AGENT.to_string(),
            kickoff_message: KICKOFF_MESSAGE.to_string(),
            log_filter: "info".to_string(),
            source: DataSource::Live,
            simulation: SimulationConfig::default(),
        }
    }
}

impl ConnectorConfig {
    /// `~/.config/agentflow/config.toml` (platform equivalent).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("agentflow").join("config.toml"))
    }

    /// Load from an explicit path (which must exist), or from the default
    /// path when present, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConnectorError> {
        match path {
            Some(p) => Self::from_file(p),
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConnectorError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "Loaded connector config");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConnectorError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENDPOINT_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            self.endpoint = endpoint.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<(), ConnectorError> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| ConnectorError::Config(format!("invalid endpoint '{}': {e}", self.endpoint)))?;
        if url.scheme() != "ws" {
            return Err(ConnectorError::Config(format!(
                "endpoint must use the ws:// scheme, got '{}'",
                url.scheme()
            )));
        }
        if self.reconnect_delay_secs == 0 {
            return Err(ConnectorError::Config(
                "reconnect_delay_secs must be positive".into(),
            ));
        }
        if self.entry_agent.trim().is_empty() {
            return Err(ConnectorError::Config("entry_agent must not be empty".into()));
        }
        if self.source == DataSource::Simulated && self.simulation.step_interval_ms == 0 {
            return Err(ConnectorError::Config(
                "simulation.step_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.simulation.step_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ConnectorConfig::default();
        assert_eq!(config.endpoint, "ws://localhost:8000/ws/frontend");
        assert_eq!(config.entry_agent, "orchestration-agent");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ConnectorConfig::from_toml_str(
            r#"
            reconnect_delay_secs = 2
            source = "simulated"

            [simulation]
            step_interval_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.reconnect_delay(), Duration::from_secs(2));
        assert_eq!(config.source, DataSource::Simulated);
        assert_eq!(config.step_interval(), Duration::from_millis(250));
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config =
            ConnectorConfig::from_toml_str(r#"endpoint = "ws://file-host:1/ws""#).unwrap();
        config.apply_env_from(|key| {
            (key == ENDPOINT_ENV_VAR).then(|| "ws://env-host:2/ws/frontend".to_string())
        });
        assert_eq!(config.endpoint, "ws://env-host:2/ws/frontend");
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let mut config = ConnectorConfig::default();
        config.apply_env_from(|_| Some("   ".to_string()));
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ConnectorConfig::default();
        config.endpoint = "http://localhost:8000".into();
        assert!(config.validate().is_err());

        let mut config = ConnectorConfig::default();
        config.endpoint = "not a url".into();
        assert!(config.validate().is_err());

        let mut config = ConnectorConfig::default();
        config.reconnect_delay_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "endpoint = \"ws://backend.internal:9000/ws/frontend\"\nentry_agent = \"document-agent\"\n",
        )
        .unwrap();

        let config = ConnectorConfig::load(Some(&path)).unwrap();
        assert_eq!(config.endpoint, "ws://backend.internal:9000/ws/frontend");
        assert_eq!(config.entry_agent, "document-agent");
        assert_eq!(config.reconnect_delay_secs, RECONNECT_DELAY_SECS);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConnectorConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConnectorError::Io(_)));
    }

    #[test]
    fn test_unknown_source_fails_to_parse() {
        assert!(ConnectorConfig::from_toml_str(r#"source = "carrier-pigeon""#).is_err());
    }
}
