use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{error, info, warn};

use crate::{
    config::{ScriptConfiguration, ScriptEntry},
    data::PersistentData,
    definition::ScriptDefinition,
    error::LoadError,
    registry::ScriptRegistry,
};

const DATA_DIR: &str = "data";

/// Builds definitions from the script configuration and fills the registry.
#[derive(Debug)]
pub struct ScriptLoader {
    config_path: PathBuf,
    scripts_dir: PathBuf,
    data_dir: PathBuf,
    registry: Arc<ScriptRegistry>,
}

impl ScriptLoader {
    /// Scripts are read from `scripts_dir`; their data lives in its `data`
    /// subdirectory unless [`with_data_dir`](Self::with_data_dir) says otherwise.
    pub fn new(config_path: impl Into<PathBuf>, scripts_dir: impl Into<PathBuf>, registry: Arc<ScriptRegistry>) -> Self {
        let scripts_dir = scripts_dir.into();
        Self {
            config_path: config_path.into(),
            data_dir: scripts_dir.join(DATA_DIR),
            scripts_dir,
            registry,
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn registry(&self) -> &Arc<ScriptRegistry> {
        &self.registry
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn data_file(&self, identifier: &str) -> PathBuf {
        self.data_dir.join(format!("{identifier}_data.yml"))
    }

    /// Registers every loadable script and returns how many were registered.
    /// Individual scripts that cannot be loaded are logged and skipped.
    pub fn load(&self) -> Result<usize, LoadError> {
        let config = ScriptConfiguration::load(&self.config_path)?;

        let mut loaded = 0;
        for (identifier, entry) in config.entries() {
            if let Some(definition) = self.load_definition(identifier, entry) {
                self.registry.register(Arc::new(definition));
                loaded += 1;
            }
        }

        info!(loaded, configured = config.len(), "Scripts loaded");
        Ok(loaded)
    }

    /// Flushes all data, drops every definition and loads from scratch.
    pub fn reload(&self) -> Result<usize, LoadError> {
        self.registry.save_all();
        self.registry.clear();
        self.load()
    }

    fn load_definition(&self, identifier: &str, entry: &ScriptEntry) -> Option<ScriptDefinition> {
        let path = self.scripts_dir.join(&entry.file);
        let template = match fs::read_to_string(&path) {
            Ok(template) => template,
            Err(e) => {
                warn!(script = %identifier, path = %path.display(), error = %e, "Script file could not be read, skipping");
                return None;
            }
        };

        let data = match PersistentData::load(identifier, self.data_file(identifier)) {
            Ok(data) => data,
            Err(e) => {
                error!(script = %identifier, error = %e, "Failed to load script data, skipping");
                return None;
            }
        };

        let mut definition = ScriptDefinition::new(identifier, template, Arc::new(data));
        if let Some(Err(e)) = entry.cache.as_deref().map(|spec| definition.apply_cache_policy(spec)) {
            error!(script = %identifier, error = %e, "Invalid cache policy, caching disabled");
        }

        Some(definition)
    }
}
