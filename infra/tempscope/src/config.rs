use crate::error::{Result, TempScopeErrorExt};
use crate::naming::DEFAULT_EXTENSION;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment prefix for overrides, e.g. `MHUB_TEMPSCOPE__STORE_NAMES=true`.
pub const ENV_PREFIX: &str = "MHUB_TEMPSCOPE";

/// Declarative scope settings, usually loaded with [`load_config`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Directory the scope is created in. Defaults to the system temp directory.
    pub parent_dir: Option<PathBuf>,
    /// Directory-name prefix. Defaults to the process-scoped naming prefix.
    pub prefix: Option<String>,
    /// Whether issued names are recorded unless a call says otherwise.
    pub store_names: bool,
    /// Extension used by helpers that do not take one.
    pub extension: String,
    /// Sweep sibling scopes older than this many seconds before creating a new one.
    pub purge_stale_after_secs: Option<u64>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            parent_dir: None,
            prefix: None,
            store_names: false,
            extension: DEFAULT_EXTENSION.to_owned(),
            purge_stale_after_secs: None,
        }
    }
}

impl ScopeConfig {
    #[must_use]
    pub fn purge_stale_after(&self) -> Option<Duration> {
        self.purge_stale_after_secs.map(Duration::from_secs)
    }
}

/// Loads a [`ScopeConfig`] from a file, overlaid with `MHUB_TEMPSCOPE__*` environment variables.
///
/// The file format follows its extension (`.toml`, `.json`, `.yaml`, ...).
///
/// # Errors
/// Returns [`TempScopeError::Config`](crate::TempScopeError::Config) if the file is
/// missing or malformed, or a value cannot be deserialized.
pub fn load_config(path: impl AsRef<Path>) -> Result<ScopeConfig> {
    load_layered(path.as_ref(), environment())
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX).separator("__")
}

fn load_layered(path: &Path, environment: Environment) -> Result<ScopeConfig> {
    let builder =
        Config::builder().add_source(File::from(path).required(true)).add_source(environment);

    info!("Loading temp scope config from {}", path.display());

    builder
        .build()
        .context("Failed to build temp scope config")?
        .try_deserialize::<ScopeConfig>()
        .context("Failed to deserialize temp scope config")
}
