//! Editor configuration.

use quire_core::defaults;

use crate::keymap::Key;

/// Configuration for the editing surface and its input extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    /// Character that opens the slash command menu.
    pub slash_trigger: char,
    /// Key that expands an abbreviation on the current line.
    pub abbreviation_key: Key,
    /// Buffer capacity of the editor event bus.
    pub event_capacity: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            slash_trigger: defaults::SLASH_TRIGGER,
            abbreviation_key: Key::from_name(defaults::ABBREVIATION_KEY).unwrap_or(Key::Tab),
            event_capacity: defaults::EVENT_BUS_CAPACITY,
        }
    }
}

impl EditorConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `QUIRE_SLASH_TRIGGER` | `/` | Single character opening the command menu |
    /// | `QUIRE_ABBREVIATION_KEY` | `Tab` | Key name that expands abbreviations |
    ///
    /// Values that do not parse fall back to the defaults.
    pub fn from_env() -> Self {
        let base = Self::default();

        let slash_trigger = std::env::var("QUIRE_SLASH_TRIGGER")
            .ok()
            .and_then(|v| {
                let mut chars = v.trim().chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if !c.is_whitespace() => Some(c),
                    _ => None,
                }
            })
            .unwrap_or(base.slash_trigger);

        let abbreviation_key = std::env::var("QUIRE_ABBREVIATION_KEY")
            .ok()
            .and_then(|v| Key::from_name(v.trim()))
            .unwrap_or(base.abbreviation_key);

        Self {
            slash_trigger,
            abbreviation_key,
            ..base
        }
    }

    /// Set the slash menu trigger character.
    pub fn with_slash_trigger(mut self, trigger: char) -> Self {
        self.slash_trigger = trigger;
        self
    }

    /// Set the abbreviation expansion key.
    pub fn with_abbreviation_key(mut self, key: Key) -> Self {
        self.abbreviation_key = key;
        self
    }

    /// Set the event bus capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.slash_trigger, '/');
        assert_eq!(config.abbreviation_key, Key::Tab);
        assert_eq!(config.event_capacity, 256);
    }

    #[test]
    fn test_builders() {
        let config = EditorConfig::default()
            .with_slash_trigger('!')
            .with_abbreviation_key(Key::Enter)
            .with_event_capacity(8);
        assert_eq!(config.slash_trigger, '!');
        assert_eq!(config.abbreviation_key, Key::Enter);
        assert_eq!(config.event_capacity, 8);
    }
}
