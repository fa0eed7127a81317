//! Process configuration read from the environment.

use std::net::SocketAddr;

use thiserror::Error;

pub const BIND_ADDR_ENV: &str = "STOCKLEDGER_BIND_ADDR";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const DB_MAX_CONNECTIONS_ENV: &str = "STOCKLEDGER_DB_MAX_CONNECTIONS";

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is invalid: {message}")]
    Invalid { var: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// When unset the server runs on the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = get(BIND_ADDR_ENV)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: BIND_ADDR_ENV,
                message: e.to_string(),
            })?;

        let db_max_connections = match get(DB_MAX_CONNECTIONS_ENV) {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: DB_MAX_CONNECTIONS_ENV,
                        message: format!("expected a positive integer, got {raw:?}"),
                    });
                }
            },
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };

        Ok(Self {
            bind_addr,
            database_url: get(DATABASE_URL_ENV),
            db_max_connections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
    }

    #[test]
    fn explicit_values_win_and_blank_url_is_unset() {
        let cfg = ApiConfig::from_lookup(lookup(&[
            (BIND_ADDR_ENV, "127.0.0.1:9000"),
            (DATABASE_URL_ENV, "   "),
            (DB_MAX_CONNECTIONS_ENV, "25"),
        ]))
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.db_max_connections, 25);
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = ApiConfig::from_lookup(lookup(&[(DB_MAX_CONNECTIONS_ENV, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: DB_MAX_CONNECTIONS_ENV, .. }));

        let err = ApiConfig::from_lookup(lookup(&[(BIND_ADDR_ENV, "localhost")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: BIND_ADDR_ENV, .. }));
    }
}
