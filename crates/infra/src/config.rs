//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_ROUTING_NUMBER: &str = "021000089";
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),
}

/// Which store backs the services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    InMemory,
    Postgres { database_url: String },
}

/// Credentials of the administrator created at startup when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub session_ttl: Duration,
    pub store: StoreConfig,
    pub seed_demo_data: bool,
    pub admin: BootstrapAdmin,
    /// JSON log lines unless `LOG_FORMAT=pretty`.
    pub json_logs: bool,
    pub routing_number: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Unset and blank variables take their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = match var("BIND_ADDR") {
            Some(v) => v.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: e.to_string(),
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let ttl_minutes = match var("SESSION_TTL_MINUTES") {
            Some(v) => v
                .parse::<i64>()
                .ok()
                .filter(|m| *m > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    name: "SESSION_TTL_MINUTES",
                    reason: format!("expected a positive number of minutes, got '{v}'"),
                })?,
            None => 60,
        };

        let persistent = parse_flag("USE_PERSISTENT_STORES", var("USE_PERSISTENT_STORES"), false)?;
        let store = if persistent {
            StoreConfig::Postgres {
                database_url: var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            }
        } else {
            StoreConfig::InMemory
        };
        // Demo customers only make sense for a throwaway store.
        let seed_demo_data = parse_flag("SEED_DEMO_DATA", var("SEED_DEMO_DATA"), !persistent)?;

        let admin = BootstrapAdmin {
            username: var("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
            password: var("ADMIN_PASSWORD").unwrap_or_else(|| {
                warn!("ADMIN_PASSWORD not set; using insecure dev default");
                "admin12345".to_string()
            }),
        };

        let json_logs = !matches!(var("LOG_FORMAT").as_deref(), Some("pretty"));

        let routing_number = var("BANK_ROUTING_NUMBER").unwrap_or_else(|| DEFAULT_ROUTING_NUMBER.to_string());
        fcb_banking::transfer::routing_number(&routing_number).map_err(|e| ConfigError::Invalid {
            name: "BANK_ROUTING_NUMBER",
            reason: e.to_string(),
        })?;

        Ok(Self {
            bind_addr,
            jwt_secret,
            session_ttl: Duration::minutes(ttl_minutes),
            store,
            seed_demo_data,
            admin,
            json_logs,
            routing_number,
        })
    }
}

fn parse_flag(name: &'static str, value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            name,
            reason: format!("expected true or false, got '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_give_an_in_memory_dev_setup() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.store, StoreConfig::InMemory);
        assert!(cfg.seed_demo_data);
        assert!(cfg.json_logs);
        assert_eq!(cfg.session_ttl, Duration::minutes(60));
        assert_eq!(cfg.routing_number, DEFAULT_ROUTING_NUMBER);
    }

    #[test]
    fn persistent_store_requires_a_database_url() {
        assert_eq!(
            config(&[("USE_PERSISTENT_STORES", "true")]),
            Err(ConfigError::Missing("DATABASE_URL"))
        );

        let cfg = config(&[
            ("USE_PERSISTENT_STORES", "true"),
            ("DATABASE_URL", "postgres://bank@localhost/bank"),
        ])
        .unwrap();
        assert!(matches!(cfg.store, StoreConfig::Postgres { .. }));
        assert!(!cfg.seed_demo_data);
    }

    #[test]
    fn bad_values_are_reported_by_name() {
        let err = config(&[("SESSION_TTL_MINUTES", "-5")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SESSION_TTL_MINUTES", .. }));

        let err = config(&[("BANK_ROUTING_NUMBER", "1234")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "BANK_ROUTING_NUMBER", .. }));

        let err = config(&[("SEED_DEMO_DATA", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SEED_DEMO_DATA", .. }));
    }

    #[test]
    fn pretty_logs_are_opt_in() {
        assert!(!config(&[("LOG_FORMAT", "pretty")]).unwrap().json_logs);
    }
}
