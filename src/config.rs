//! Runtime configuration.
//!
//! Defaults, overlaid by `SIGSCOPE_*` environment variables, overlaid by CLI
//! flags in the binary.

use crate::parser::DEFAULT_EVENT_WINDOW;
use crate::remote::chain::DEFAULT_RPC_URL;
use crate::remote::fourbyte::DEFAULT_FOURBYTE_URL;
use crate::remote::openchain::DEFAULT_OPENCHAIN_URL;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "db/scraper.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub rpc_url: String,
    pub db_path: PathBuf,
    pub openchain_url: String,
    pub fourbyte_url: String,
    pub http_timeout_secs: u64,
    /// Upper bound on in-flight signature lookups.
    pub concurrency: usize,
    pub event_window: usize,
}

impl Default for Config {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            openchain_url: DEFAULT_OPENCHAIN_URL.to_string(),
            fourbyte_url: DEFAULT_FOURBYTE_URL.to_string(),
            http_timeout_secs: 10,
            concurrency: cpus * 4,
            event_window: DEFAULT_EVENT_WINDOW,
        }
    }
}

impl Config {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Apply `SIGSCOPE_*` values from `lookup`. Unparseable numbers are ignored.
    pub fn overlay<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("SIGSCOPE_RPC_URL") {
            self.rpc_url = v;
        }
        if let Some(v) = get("SIGSCOPE_DB_PATH") {
            self.db_path = PathBuf::from(v);
        }
        if let Some(v) = get("SIGSCOPE_OPENCHAIN_URL") {
            self.openchain_url = v;
        }
        if let Some(v) = get("SIGSCOPE_FOURBYTE_URL") {
            self.fourbyte_url = v;
        }
        if let Some(v) = get("SIGSCOPE_HTTP_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.http_timeout_secs = v;
        }
        if let Some(v) = get("SIGSCOPE_CONCURRENCY").and_then(|v| v.parse::<usize>().ok()) {
            self.concurrency = v.max(1);
        }
        self
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
