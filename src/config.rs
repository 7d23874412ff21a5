// src/config.rs
//! Dictionary sizing.

use crate::error::ConfigError;

/// Environment variable that overrides [`DictionaryConfig::operation_name_buffer_size`].
pub const BUFFER_SIZE_ENV: &str = "OPNAME_BUFFER_SIZE";

/// Default combined capacity of resolved plus pending entries.
pub const DEFAULT_OPERATION_NAME_BUFFER_SIZE: usize = 1000 * 10000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DictionaryConfig {
    /// Upper bound on `resolved + pending`, checked when a miss is admitted.
    /// Existing entries are never evicted to honour it.
    pub operation_name_buffer_size: usize,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            operation_name_buffer_size: DEFAULT_OPERATION_NAME_BUFFER_SIZE,
        }
    }
}

impl DictionaryConfig {
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.operation_name_buffer_size = size;
        self
    }

    /// Defaults, overridden by `OPNAME_BUFFER_SIZE` when it is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_override(std::env::var(BUFFER_SIZE_ENV).ok().as_deref())
    }

    fn apply_override(self, raw: Option<&str>) -> Result<Self, ConfigError> {
        match raw {
            None => Ok(self),
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map(|size| self.with_buffer_size(size))
                .map_err(|_| ConfigError::InvalidValue {
                    key: BUFFER_SIZE_ENV,
                    value: raw.to_string(),
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_agent_buffer() {
        assert_eq!(DictionaryConfig::default().operation_name_buffer_size, 10_000_000);
    }

    #[test]
    fn override_parses_and_rejects() {
        let cfg = DictionaryConfig::default().apply_override(Some(" 64 ")).unwrap();
        assert_eq!(cfg.operation_name_buffer_size, 64);

        let err = DictionaryConfig::default().apply_override(Some("lots")).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue { key: BUFFER_SIZE_ENV, value: "lots".into() }
        );

        let untouched = DictionaryConfig::default().apply_override(None).unwrap();
        assert_eq!(untouched, DictionaryConfig::default());
    }
}
