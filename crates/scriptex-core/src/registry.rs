use std::sync::Arc;

use dashmap::DashMap;
use itertools::Itertools;
use tracing::{error, warn};

use crate::definition::ScriptDefinition;

/// Loaded script definitions by identifier.
#[derive(Debug, Default)]
pub struct ScriptRegistry {
    scripts: DashMap<String, Arc<ScriptDefinition>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `definition`, returning the one it replaced.
    pub fn register(&self, definition: Arc<ScriptDefinition>) -> Option<Arc<ScriptDefinition>> {
        let previous = self
            .scripts
            .insert(definition.identifier().to_string(), definition);

        if let Some(previous) = &previous {
            warn!(script = %previous.identifier(), "Replaced an already registered script");
        }
        previous
    }

    pub fn get(&self, identifier: &str) -> Option<Arc<ScriptDefinition>> {
        self.scripts.get(identifier).map(|entry| Arc::clone(entry.value()))
    }

    pub fn unregister(&self, identifier: &str) -> Option<Arc<ScriptDefinition>> {
        self.scripts.remove(identifier).map(|(_, definition)| definition)
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.scripts.iter().map(|entry| entry.key().clone()).sorted().collect()
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn clear(&self) {
        self.scripts.clear();
    }

    /// Flushes every script's data. Failures are logged and counted.
    pub fn save_all(&self) -> usize {
        self.scripts
            .iter()
            .filter(|entry| match entry.value().data().save() {
                Ok(()) => false,
                Err(e) => {
                    error!(script = %entry.key(), error = %e, "Failed to save script data");
                    true
                }
            })
            .count()
    }

    /// Drops expired cache entries of every script.
    pub fn purge_expired(&self) -> usize {
        self.scripts
            .iter()
            .map(|entry| entry.value().cache().purge_expired())
            .sum()
    }
}
