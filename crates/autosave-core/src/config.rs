//! Session configuration.

use serde::Deserialize;

/// Tunables for one editing session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before a save is issued.
    pub debounce_ms: u64,
    /// Window after local activity during which incoming copies with an
    /// unknown fingerprint are treated as noise rather than genuine
    /// external changes. Integrators may narrow or widen this without
    /// changing the classification contract.
    pub grace_window_ms: u64,
    /// How long the "updated by <actor>" notice stays visible.
    pub notice_duration_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            grace_window_ms: 2000,
            notice_duration_ms: 3000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AutosaveConfig::default();
        assert_eq!(config.debounce_ms, 500);
        assert_eq!(config.grace_window_ms, 2000);
        assert_eq!(config.notice_duration_ms, 3000);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: AutosaveConfig = serde_json::from_str(r#"{"debounce_ms": 250}"#).unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.grace_window_ms, 2000);
    }
}
