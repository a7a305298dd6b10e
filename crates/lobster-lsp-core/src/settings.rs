//! Per-document settings resolution.
//!
//! Effective settings are the global defaults merged with whatever the editor
//! returns for the document's scope. Editor answers are cached per URI in a
//! single-flight cell: concurrent resolutions for the same URI share one
//! configuration request, and the first answer schedules one probe of the
//! resolved executable.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::{OnceCell, mpsc};

use crate::error::ConfigError;

/// Name of the executable used when nothing else is configured.
pub const DEFAULT_EXECUTABLE: &str = "lobster";

/// Configuration section requested from the editor.
pub const CONFIGURATION_SECTION: &str = "lobster";

/// Effective configuration for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LobsterSettings {
    /// Path or name of the compiler executable.
    pub executable: String,
    /// Import search paths, in lookup order.
    pub imports: Vec<String>,
    /// Experimental language features.
    pub experimental: bool,
}

impl Default for LobsterSettings {
    fn default() -> Self {
        Self {
            executable: DEFAULT_EXECUTABLE.to_string(),
            imports: Vec::new(),
            experimental: true,
        }
    }
}

/// Settings as sent by the editor. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsOverride {
    pub executable: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub imports: Vec<String>,
    pub experimental: Option<bool>,
}

/// Editors send `null` for a cleared list setting.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl SettingsOverride {
    /// Executable this override selects, falling back to `global`.
    pub fn executable_or<'a>(&'a self, global: &'a LobsterSettings) -> &'a str {
        self.executable
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(&global.executable)
    }
}

impl LobsterSettings {
    /// Merge an editor override over these global settings.
    ///
    /// Imports are the global list, then the override's entries not already
    /// in it, then `document_dir`. The experimental flag is OR-ed: an explicit
    /// `false` cannot switch off a globally enabled flag.
    pub fn merged(&self, over: &SettingsOverride, document_dir: Option<&Path>) -> Self {
        let mut imports = self.imports.clone();
        let extra = document_dir.map(|dir| dir.to_string_lossy().into_owned());
        for import in over.imports.iter().chain(extra.as_ref()) {
            if !imports.contains(import) {
                imports.push(import.clone());
            }
        }

        Self {
            executable: over.executable_or(self).to_string(),
            imports,
            experimental: over.experimental.unwrap_or(false) || self.experimental,
        }
    }

    /// New global settings from a pushed configuration: every field the
    /// editor sets replaces ours.
    pub fn overridden_by(&self, over: &SettingsOverride) -> Self {
        Self {
            executable: over.executable_or(self).to_string(),
            imports: if over.imports.is_empty() {
                self.imports.clone()
            } else {
                over.imports.clone()
            },
            experimental: over.experimental.unwrap_or(self.experimental),
        }
    }
}

/// Where per-document overrides come from (the editor, in production).
#[async_trait]
pub trait ConfigurationSource: Send + Sync {
    /// Fetch the `lobster` section for `uri`. `Ok(None)` means the editor had
    /// nothing for this scope.
    async fn fetch(&self, uri: &str) -> Result<Option<SettingsOverride>, ConfigError>;
}

type SettingsCell = Arc<OnceCell<Option<SettingsOverride>>>;

/// Resolves and caches effective settings per document URI.
pub struct SettingsResolver {
    source: Arc<dyn ConfigurationSource>,
    global: RwLock<LobsterSettings>,
    has_configuration_capability: AtomicBool,
    cache: Mutex<HashMap<String, SettingsCell>>,
    probes: mpsc::UnboundedSender<String>,
}

impl SettingsResolver {
    /// Create a resolver. Executables that need probing are sent on `probes`.
    pub fn new(
        source: Arc<dyn ConfigurationSource>,
        global: LobsterSettings,
        probes: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self {
            source,
            global: RwLock::new(global),
            has_configuration_capability: AtomicBool::new(false),
            cache: Mutex::new(HashMap::new()),
            probes,
        }
    }

    /// Record whether the editor answers `workspace/configuration`.
    pub fn set_configuration_capability(&self, enabled: bool) {
        self.has_configuration_capability
            .store(enabled, Ordering::SeqCst);
    }

    pub fn has_configuration_capability(&self) -> bool {
        self.has_configuration_capability.load(Ordering::SeqCst)
    }

    pub fn global(&self) -> LobsterSettings {
        self.global
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_global(&self, settings: LobsterSettings) {
        *self.global.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }

    /// Effective settings for `uri`.
    pub async fn resolve(&self, uri: &str, document_dir: Option<&Path>) -> LobsterSettings {
        let global = self.global();
        if !self.has_configuration_capability() {
            return global;
        }

        let cell = {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(cache.entry(uri.to_string()).or_default())
        };

        let over = cell.get_or_init(|| self.fetch_and_probe(uri)).await;
        match over {
            Some(over) => global.merged(over, document_dir),
            None => global,
        }
    }

    /// Drop the cached entry for a closed document.
    pub fn forget(&self, uri: &str) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uri);
    }

    /// Number of cached entries.
    pub fn cached(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Ask for the executable at `path` to be probed.
    pub fn request_probe(&self, path: &str) {
        if self.probes.send(path.to_string()).is_err() {
            tracing::debug!(path, "probe worker has stopped; dropping probe request");
        }
    }

    async fn fetch_and_probe(&self, uri: &str) -> Option<SettingsOverride> {
        tracing::debug!(uri, "fetching document configuration");
        let over = match self.source.fetch(uri).await {
            Ok(over) => over,
            Err(err) => {
                tracing::warn!(uri, error = %err, "falling back to default settings");
                None
            }
        };

        let global = self.global();
        let executable = match &over {
            Some(over) => over.executable_or(&global),
            None => global.executable.as_str(),
        };
        self.request_probe(executable);
        over
    }
}
