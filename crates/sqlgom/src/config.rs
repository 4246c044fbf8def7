//! Query source configuration, settable in code or loaded from TOML.

use crate::error::{OrmError, OrmResult};
use crate::monitor::TracingSqlHook;
use serde::Deserialize;
use std::path::Path;

/// Configuration for a [`crate::QuerySource`].
///
/// Loadable from TOML; every key is optional:
///
/// ```toml
/// log_sql = true
/// log_prefix = "billing"
/// max_sql_length = 500
/// default_page_size = 50
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Whether to install a [`TracingSqlHook`].
    pub log_sql: bool,
    /// Prefix recorded on every SQL event.
    pub log_prefix: Option<String>,
    /// Truncate logged SQL after this many bytes. `None` logs it whole.
    pub max_sql_length: Option<usize>,
    /// Page size used by `paginate` when the caller passes a non-positive one.
    pub default_page_size: i64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            log_sql: true,
            log_prefix: None,
            max_sql_length: Some(200),
            default_page_size: 20,
        }
    }
}

impl DbConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(source: &str) -> OrmResult<Self> {
        let config: DbConfig = toml::from_str(source)?;
        config.validate()
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> OrmResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| OrmError::config(format!("reading {}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    fn validate(self) -> OrmResult<Self> {
        if self.default_page_size <= 0 {
            return Err(OrmError::config(format!(
                "default_page_size must be positive, got {}",
                self.default_page_size
            )));
        }
        Ok(self)
    }

    /// Enable or disable SQL logging.
    pub fn log_sql(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }

    pub fn log_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.log_prefix = Some(prefix.into());
        self
    }

    pub fn max_sql_length(mut self, len: Option<usize>) -> Self {
        self.max_sql_length = len;
        self
    }

    /// Set the fallback page size. Non-positive values are ignored.
    pub fn default_page_size(mut self, size: i64) -> Self {
        if size > 0 {
            self.default_page_size = size;
        }
        self
    }

    /// The SQL hook this configuration asks for, if any.
    pub fn tracing_hook(&self) -> Option<TracingSqlHook> {
        if !self.log_sql {
            return None;
        }
        let mut hook = TracingSqlHook::new();
        hook.max_sql_length = self.max_sql_length;
        hook.prefix = self.log_prefix.clone();
        Some(hook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = DbConfig::default();
        assert!(cfg.log_sql);
        assert_eq!(cfg.max_sql_length, Some(200));
        assert_eq!(cfg.default_page_size, 20);
    }

    #[test]
    fn parses_partial_toml() {
        let cfg = DbConfig::from_toml_str("log_prefix = \"shop\"\ndefault_page_size = 50\n").unwrap();
        assert_eq!(cfg.log_prefix.as_deref(), Some("shop"));
        assert_eq!(cfg.default_page_size, 50);
        assert!(cfg.log_sql);
    }

    #[test]
    fn rejects_bad_toml() {
        assert!(DbConfig::from_toml_str("log_sql = \"yes\"").unwrap_err().is_config());
        assert!(DbConfig::from_toml_str("default_page_size = 0").unwrap_err().is_config());
    }

    #[test]
    fn disabled_logging_has_no_hook() {
        assert!(DbConfig::new().log_sql(false).tracing_hook().is_none());
        let hook = DbConfig::new().log_prefix("x").tracing_hook().unwrap();
        assert_eq!(hook.prefix.as_deref(), Some("x"));
    }
}
