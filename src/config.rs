use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::CorsLayer;

use crate::rooms::{MAX_USER_COUNT_INTERVAL, ManagerConfig};

const DEFAULT_ORIGINS: &str = "http://localhost,http://127.0.0.1:8000,http://chat.deeptoon.co.kr";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub allowed_origins: Vec<String>,
    pub manager: ManagerConfig,
}

impl Config {
    /// Reads the process environment, after loading `.env` if there is one.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8000".to_owned())
            .parse::<SocketAddr>()
            .context("BIND_ADDR")?;

        let defaults = ManagerConfig::default();
        let manager = ManagerConfig {
            idle_grace: secs(&var, "ROOM_IDLE_GRACE_SECS")?.unwrap_or(defaults.idle_grace),
            user_count_interval: secs(&var, "USER_COUNT_INTERVAL_SECS")?
                .unwrap_or(defaults.user_count_interval),
        };
        if manager.user_count_interval.is_zero() {
            anyhow::bail!("USER_COUNT_INTERVAL_SECS must be positive");
        }
        if manager.user_count_interval > MAX_USER_COUNT_INTERVAL {
            anyhow::bail!(
                "USER_COUNT_INTERVAL_SECS must be at most {}",
                MAX_USER_COUNT_INTERVAL.as_secs()
            );
        }

        let allowed_origins = var("ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ORIGINS.to_owned())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_owned)
            .collect();

        Ok(Self { bind_addr, allowed_origins, manager })
    }

    pub fn cors(&self) -> anyhow::Result<CorsLayer> {
        let origins = self
            .allowed_origins
            .iter()
            .map(|origin| HeaderValue::from_str(origin).with_context(|| format!("bad origin {origin:?}")))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::ORIGIN, header::CONTENT_LENGTH, header::CONTENT_TYPE])
            .allow_credentials(true))
    }
}

fn secs(var: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<Duration>> {
    var(key)
        .map(|value| value.trim().parse::<u64>().map(Duration::from_secs))
        .transpose()
        .with_context(|| format!("{key} must be a whole number of seconds"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test_log::test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.manager, ManagerConfig::default());
        assert_eq!(config.allowed_origins.len(), 3);
        assert!(config.cors().is_ok());
    }

    #[test_log::test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("ROOM_IDLE_GRACE_SECS", "30"),
            ("USER_COUNT_INTERVAL_SECS", " 2 "),
            ("ALLOWED_ORIGINS", "http://a.test, http://b.test,"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.manager.idle_grace, Duration::from_secs(30));
        assert_eq!(config.manager.user_count_interval, Duration::from_secs(2));
        assert_eq!(config.allowed_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test_log::test]
    fn rejects_bad_numbers() {
        assert!(Config::from_lookup(lookup(&[("ROOM_IDLE_GRACE_SECS", "soon")])).is_err());
        assert!(Config::from_lookup(lookup(&[("USER_COUNT_INTERVAL_SECS", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[("USER_COUNT_INTERVAL_SECS", "86401")])).is_err());
        assert!(
            Config::from_lookup(lookup(&[("USER_COUNT_INTERVAL_SECS", "18446744073709551615")]))
                .is_err()
        );
        assert!(Config::from_lookup(lookup(&[("USER_COUNT_INTERVAL_SECS", "86400")])).is_ok());
    }
}
