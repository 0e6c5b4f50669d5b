//! # Configuration
//!
//! Settings loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`ATRIL_*`)
//! 2. Defaults (this file)
//!
//! | Variable                     | Default          |
//! |------------------------------|------------------|
//! | `ATRIL_DB_PATH`              | `./atril.db`     |
//! | `ATRIL_DB_MAX_CONNECTIONS`   | `5`              |
//! | `ATRIL_DEFAULT_PAYMENT_NOTE` | `Pago`           |
//! | `ATRIL_WHATSAPP_PREFIX`      | `549`            |
//! | `ATRIL_SHOP_NAME`            | `la librería`    |
//!
//! Read-only after initialization, so no lock.

use std::path::PathBuf;

use atril_core::notify::NotifyConfig;
use atril_core::DEFAULT_PAYMENT_NOTE;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::pool::DbConfig;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtrilConfig {
    /// SQLite file path.
    pub database_path: PathBuf,

    /// Pool size.
    pub max_connections: u32,

    /// Label stored on payments recorded without a note.
    pub default_payment_note: String,

    /// WhatsApp link formatting.
    pub notify: NotifyConfig,
}

impl Default for AtrilConfig {
    fn default() -> Self {
        AtrilConfig {
            database_path: PathBuf::from("./atril.db"),
            max_connections: 5,
            default_payment_note: DEFAULT_PAYMENT_NOTE.to_string(),
            notify: NotifyConfig::default(),
        }
    }
}

impl AtrilConfig {
    /// Loads configuration from `ATRIL_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults.
    ///
    /// Blank values count as unset. An unparsable pool size is logged and
    /// ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = AtrilConfig::default();

        if let Some(path) = get("ATRIL_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(raw) = get("ATRIL_DB_MAX_CONNECTIONS") {
            match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => config.max_connections = n,
                _ => warn!(value = %raw, "Ignoring invalid ATRIL_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(note) = get("ATRIL_DEFAULT_PAYMENT_NOTE") {
            config.default_payment_note = note.trim().to_string();
        }

        if let Some(prefix) = get("ATRIL_WHATSAPP_PREFIX") {
            config.notify.country_prefix = prefix.chars().filter(char::is_ascii_digit).collect();
        }

        if let Some(name) = get("ATRIL_SHOP_NAME") {
            config.notify.shop_name = name.trim().to_string();
        }

        config
    }

    /// Pool settings for [`Database::new`](crate::Database::new).
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone()).max_connections(self.max_connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AtrilConfig::from_lookup(|_| None);
        assert_eq!(config, AtrilConfig::default());
        assert_eq!(config.default_payment_note, "Pago");
        assert_eq!(config.notify.country_prefix, "549");
    }

    #[test]
    fn test_overrides() {
        let config = AtrilConfig::from_lookup(lookup_from(&[
            ("ATRIL_DB_PATH", "/var/lib/atril/shop.db"),
            ("ATRIL_DB_MAX_CONNECTIONS", "8"),
            ("ATRIL_DEFAULT_PAYMENT_NOTE", "Efectivo"),
            ("ATRIL_WHATSAPP_PREFIX", "+598"),
            ("ATRIL_SHOP_NAME", "Librería Atril"),
        ]));

        assert_eq!(config.database_path, PathBuf::from("/var/lib/atril/shop.db"));
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.default_payment_note, "Efectivo");
        assert_eq!(config.notify.country_prefix, "598");
        assert_eq!(config.notify.shop_name, "Librería Atril");

        let db = config.db_config();
        assert_eq!(db.max_connections, 8);
        assert_eq!(db.database_path, config.database_path);
    }

    #[test]
    fn test_invalid_and_blank_values_fall_back() {
        let config = AtrilConfig::from_lookup(lookup_from(&[
            ("ATRIL_DB_MAX_CONNECTIONS", "many"),
            ("ATRIL_DEFAULT_PAYMENT_NOTE", "   "),
        ]));

        assert_eq!(config.max_connections, 5);
        assert_eq!(config.default_payment_note, "Pago");
    }
}
