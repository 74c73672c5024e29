use crate::config::ScopeConfig;
use crate::error::{IoResultExt, Result, TempScopeError};
use crate::maintenance;
use crate::naming::{self, DEFAULT_EXTENSION};
use crate::scope::TempScope;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, trace};

/// Number of successive ticks tried before giving up on a taken directory name.
const MAX_CREATE_ATTEMPTS: u32 = 16;

#[derive(Debug, Clone)]
struct ScopeSettings {
    parent: Option<PathBuf>,
    prefix: Option<String>,
    store_names: bool,
    extension: String,
    purge_stale: Option<Duration>,
}

impl Default for ScopeSettings {
    fn default() -> Self {
        Self {
            parent: None,
            prefix: None,
            store_names: false,
            extension: DEFAULT_EXTENSION.to_owned(),
            purge_stale: None,
        }
    }
}

/// Fluent configuration for a [`TempScope`].
#[derive(Debug, Default, Clone)]
pub struct TempScopeBuilder {
    settings: ScopeSettings,
}

impl TempScopeBuilder {
    #[must_use = "Creates a new scope builder with default configuration"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a builder from loaded configuration.
    #[must_use]
    pub fn from_config(config: &ScopeConfig) -> Self {
        Self {
            settings: ScopeSettings {
                parent: config.parent_dir.clone(),
                prefix: config.prefix.clone(),
                store_names: config.store_names,
                extension: config.extension.clone(),
                purge_stale: config.purge_stale_after(),
            },
        }
    }

    #[must_use = "Sets the directory the scope is created in"]
    pub fn parent(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.parent = Some(path.into());
        self
    }

    /// Overrides the process-scoped naming prefix for this scope only.
    #[must_use = "Sets the scope directory name prefix"]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.settings.prefix = Some(prefix.into());
        self
    }

    #[must_use = "Sets whether issued names are recorded by default"]
    pub const fn store_names(mut self, enable: bool) -> Self {
        self.settings.store_names = enable;
        self
    }

    #[must_use = "Sets the extension used when none is given"]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.settings.extension = extension.into();
        self
    }

    /// Sweeps sibling scopes with the same prefix that are older than `threshold`.
    ///
    /// Live scopes of this process are never swept. Scopes still held by another
    /// process with the same prefix are not protected.
    #[must_use = "Enables the stale scope sweep"]
    pub const fn purge_stale(mut self, threshold: Duration) -> Self {
        self.settings.purge_stale = Some(threshold);
        self
    }

    /// Validates the configuration and creates the scope directory.
    ///
    /// Boot sequence:
    /// 1. **Validation**: the parent must be non-empty, the prefix a plain name
    ///    fragment and the default extension acceptable.
    /// 2. **Sweep**: when enabled, stale sibling scopes are removed best-effort.
    /// 3. **Creation**: the parent is created recursively, then the scope directory
    ///    itself non-recursively, so an existing directory is never adopted. A taken
    ///    name advances the tick and retries.
    ///
    /// # Errors
    ///
    /// Returns [`TempScopeError::InvalidArgument`] for rejected settings.
    /// Returns [`TempScopeError::Construction`] if the directory cannot be created.
    pub fn create(self) -> Result<TempScope> {
        let ScopeSettings { parent, prefix, store_names, extension, purge_stale } = self.settings;

        let parent = parent.unwrap_or_else(std::env::temp_dir);
        naming::validate_parent(&parent)?;
        let prefix = match prefix {
            Some(prefix) => {
                naming::validate_prefix(&prefix)?;
                prefix
            },
            None => naming::naming_prefix(),
        };
        naming::validate_extension(&extension)?;

        if let Some(threshold) = purge_stale {
            maintenance::purge_stale(&parent, &prefix, threshold);
        }

        std::fs::create_dir_all(&parent)
            .construction(format!("Failed to create scope parent: {}", parent.display()))?;

        let mut attempt = 0;
        let base_dir = loop {
            let candidate = parent.join(naming::scope_dir_name(&prefix, naming::next_tick()));
            match std::fs::create_dir(&candidate) {
                Ok(()) => break candidate,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    attempt += 1;
                    trace!(path = %candidate.display(), attempt, "Scope directory name taken");
                    if attempt >= MAX_CREATE_ATTEMPTS {
                        return Err(TempScopeError::Construction {
                            source: err,
                            context: Some(
                                format!("No free scope directory name under {}", parent.display())
                                    .into(),
                            ),
                        });
                    }
                },
                Err(err) => {
                    return Err(TempScopeError::Construction {
                        source: err,
                        context: Some(
                            format!("Failed to create scope directory: {}", candidate.display())
                                .into(),
                        ),
                    });
                },
            }
        };

        info!(path = %base_dir.display(), store_names, "Temp scope created");

        Ok(TempScope::from_parts(base_dir, store_names, extension))
    }
}
