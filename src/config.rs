//! Server configuration read from the environment.

use crate::Error;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "127.0.0.1:8501";
pub const DEFAULT_LOGO: &str = "itechlogo.jpg";

/// Settings for the HTTP host. Model settings live in [`crate::factory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Address the server listens on (`ASSISTANT_BIND`).
    pub bind: SocketAddr,
    /// Image shown in the page header (`ASSISTANT_LOGO`).
    pub logo_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8501)),
            logo_path: PathBuf::from(DEFAULT_LOGO),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let bind = lookup("ASSISTANT_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind.trim().parse::<SocketAddr>().map_err(|e| {
            Error::config(format!("Invalid ASSISTANT_BIND '{bind}' (expected host:port): {e}"))
        })?;

        let logo_path = lookup("ASSISTANT_LOGO")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOGO));

        Ok(Self { bind, logo_path })
    }
}

/// Log the outcome of loading `.env`. A missing file is expected.
pub fn report_dotenv(result: &Result<PathBuf, dotenvy::Error>) {
    match result {
        Ok(path) => tracing::info!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => tracing::debug!("No .env file found"),
        Err(e) => tracing::warn!(error = %e, "Failed to load .env file"),
    }
}
