use std::{env, fmt::Display, str::FromStr};

use thiserror::Error;

use crate::constants::DEFAULT_DELIVERY_CHARGE;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    /// Without a database the service runs on the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub session_secret: String,
    pub delivery_charge: f64,
}

impl Config {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("No .env file loaded: {e}");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let session_secret = var("SESSION_SECRET_KEY").ok_or(ConfigError::Missing("SESSION_SECRET_KEY"))?;
        let delivery_charge: f64 = try_load(&var, "DELIVERY_CHARGE", DEFAULT_DELIVERY_CHARGE)?;
        if !delivery_charge.is_finite() || delivery_charge < 0. {
            return Err(ConfigError::Invalid {
                key: "DELIVERY_CHARGE",
                reason: "must be a non-negative number".to_string(),
            });
        }

        Ok(Self {
            port: try_load(&var, "PORT", 8000)?,
            database_url: var("DATABASE_URL"),
            database_max_connections: try_load(&var, "DATABASE_MAX_CONNECTIONS", 10)?,
            redis_url: var("REDIS_URL"),
            session_secret,
            delivery_charge,
        })
    }
}

fn try_load<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_fill_everything_but_the_secret() {
        let config = Config::from_lookup(lookup(&[("SESSION_SECRET_KEY", "s3cret")])).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.database_url, None);
        assert_eq!(config.redis_url, None);
        assert_eq!(config.delivery_charge, 60.);
        assert_eq!(config.database_max_connections, 10);
    }

    #[test]
    fn secret_is_required() {
        assert_eq!(
            Config::from_lookup(lookup(&[("SESSION_SECRET_KEY", " ")])),
            Err(ConfigError::Missing("SESSION_SECRET_KEY"))
        );
    }

    #[test]
    fn bad_numbers_are_reported() {
        let result = Config::from_lookup(lookup(&[
            ("SESSION_SECRET_KEY", "s3cret"),
            ("PORT", "eighty"),
        ]));
        assert!(matches!(result, Err(ConfigError::Invalid { key: "PORT", .. })));

        let result = Config::from_lookup(lookup(&[
            ("SESSION_SECRET_KEY", "s3cret"),
            ("DELIVERY_CHARGE", "-5"),
        ]));
        assert!(matches!(result, Err(ConfigError::Invalid { key: "DELIVERY_CHARGE", .. })));
    }
}
