//! Runtime configuration, read from the environment (and `.env` when present).

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Workspace opened before the first request is read.
    pub workspace: Option<PathBuf>,
    /// `tracing` filter directive, e.g. `info` or `schoold=debug`.
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let workspace = lookup("SCHOOLD_WORKSPACE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let log_filter = lookup("SCHOOLD_LOG").unwrap_or_else(|| "info".to_string());
        let log_format = match lookup("SCHOOLD_LOG_FORMAT").as_deref() {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        Self {
            workspace,
            log_filter,
            log_format,
        }
    }
}
