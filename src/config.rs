use anyhow::{bail, Context, Result};
use std::env;
use std::net::SocketAddr;
use tracing::{info, warn};

use crate::finder::ListNames;

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
const DEFAULT_ADDR: &str = "0.0.0.0:5321";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub account_id: String,
    pub access_token: Option<String>,
    pub base_url: String,
    pub watched_list: String,
    pub neverwatch_list: String,
    pub addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so callers other than
    /// the process environment (tests, the debug binary) can feed values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| -> Result<String> {
            match value(key) {
                Some(v) => Ok(v),
                None => bail!("Missing required environment variable: {}", key),
            }
        };

        let api_key = required("TMDB_API_KEY")?;
        let account_id = required("TMDB_ACCOUNT_ID")?;
        let access_token = value("TMDB_ACCESS_TOKEN");
        if access_token.is_none() {
            warn!("TMDB_ACCESS_TOKEN not set - list lookups and updates will fail");
        }

        let addr = value("MOVIE_FINDER_ADDR")
            .unwrap_or_else(|| DEFAULT_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("MOVIE_FINDER_ADDR is not a valid socket address")?;

        info!("All required environment variables are set");
        Ok(Self {
            api_key,
            account_id,
            access_token,
            base_url: value("TMDB_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            watched_list: value("WATCHED_LIST_NAME").unwrap_or_else(|| "Watched".to_string()),
            neverwatch_list: value("NEVERWATCH_LIST_NAME")
                .unwrap_or_else(|| "NeverWatch".to_string()),
            addr,
        })
    }

    pub fn list_names(&self) -> ListNames {
        ListNames {
            watched: self.watched_list.clone(),
            neverwatch: self.neverwatch_list.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let err = Config::from_lookup(lookup(&[("TMDB_ACCOUNT_ID", "42")])).unwrap_err();
        assert!(err.to_string().contains("TMDB_API_KEY"));
    }

    #[test]
    fn blank_account_id_counts_as_missing() {
        let err = Config::from_lookup(lookup(&[
            ("TMDB_API_KEY", "key"),
            ("TMDB_ACCOUNT_ID", "  "),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("TMDB_ACCOUNT_ID"));
    }

    #[test]
    fn access_token_is_optional_and_defaults_apply() {
        let config = Config::from_lookup(lookup(&[
            ("TMDB_API_KEY", "key"),
            ("TMDB_ACCOUNT_ID", "42"),
        ]))
        .expect("config");
        assert!(config.access_token.is_none());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.watched_list, "Watched");
        assert_eq!(config.neverwatch_list, "NeverWatch");
        assert_eq!(config.addr.port(), 5321);
    }

    #[test]
    fn overrides_are_honoured() {
        let config = Config::from_lookup(lookup(&[
            ("TMDB_API_KEY", "key"),
            ("TMDB_ACCOUNT_ID", "42"),
            ("TMDB_ACCESS_TOKEN", "token"),
            ("TMDB_BASE_URL", "http://localhost:9000/3/"),
            ("WATCHED_LIST_NAME", "Seen"),
            ("MOVIE_FINDER_ADDR", "127.0.0.1:8080"),
        ]))
        .expect("config");
        assert_eq!(config.access_token.as_deref(), Some("token"));
        assert_eq!(config.base_url, "http://localhost:9000/3");
        assert_eq!(config.list_names().watched, "Seen");
        assert_eq!(config.addr.to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn rejects_bad_bind_address() {
        assert!(Config::from_lookup(lookup(&[
            ("TMDB_API_KEY", "key"),
            ("TMDB_ACCOUNT_ID", "42"),
            ("MOVIE_FINDER_ADDR", "not-an-address"),
        ]))
        .is_err());
    }
}
