//! Synchronization configuration.

use std::time::Duration;

use quire_core::defaults;

/// Configuration for the save scheduler and snapshot reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Quiet period before a content change is written.
    pub content_debounce_ms: u64,
    /// Quiet period before a title change is written.
    pub title_debounce_ms: u64,
    /// Skip snapshots that equal the last content this client submitted.
    pub echo_detection: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            content_debounce_ms: defaults::CONTENT_SAVE_DEBOUNCE_MS,
            title_debounce_ms: defaults::TITLE_SAVE_DEBOUNCE_MS,
            echo_detection: true,
        }
    }
}

impl SyncConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `QUIRE_CONTENT_DEBOUNCE_MS` | `800` | Content save quiet period |
    /// | `QUIRE_TITLE_DEBOUNCE_MS` | `600` | Title save quiet period |
    /// | `QUIRE_ECHO_DETECTION` | `true` | Treat echoes of our own writes as no-ops |
    pub fn from_env() -> Self {
        let base = Self::default();

        let content_debounce_ms = std::env::var("QUIRE_CONTENT_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(base.content_debounce_ms);

        let title_debounce_ms = std::env::var("QUIRE_TITLE_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(base.title_debounce_ms);

        let echo_detection = std::env::var("QUIRE_ECHO_DETECTION")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "off"))
            .unwrap_or(base.echo_detection);

        Self {
            content_debounce_ms,
            title_debounce_ms,
            echo_detection,
        }
    }

    /// Set the content save quiet period.
    pub fn with_content_debounce_ms(mut self, ms: u64) -> Self {
        self.content_debounce_ms = ms;
        self
    }

    /// Set the title save quiet period.
    pub fn with_title_debounce_ms(mut self, ms: u64) -> Self {
        self.title_debounce_ms = ms;
        self
    }

    /// Enable or disable echo detection.
    pub fn with_echo_detection(mut self, enabled: bool) -> Self {
        self.echo_detection = enabled;
        self
    }

    pub fn content_debounce(&self) -> Duration {
        Duration::from_millis(self.content_debounce_ms)
    }

    pub fn title_debounce(&self) -> Duration {
        Duration::from_millis(self.title_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_config_default() {
        let config = SyncConfig::default();
        assert_eq!(config.content_debounce_ms, 800);
        assert_eq!(config.title_debounce_ms, 600);
        assert!(config.echo_detection);
    }

    #[test]
    fn test_sync_config_builder() {
        let config = SyncConfig::default()
            .with_content_debounce_ms(50)
            .with_title_debounce_ms(20)
            .with_echo_detection(false);

        assert_eq!(config.content_debounce(), Duration::from_millis(50));
        assert_eq!(config.title_debounce(), Duration::from_millis(20));
        assert!(!config.echo_detection);
    }
}
