use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use crate::error::DataError;

/// Key-value store owned by one script definition.
///
/// Scripts on different workers may write concurrently; each write replaces the
/// previous value and [`save`](Self::save) flushes whatever is current.
#[derive(Debug)]
pub struct PersistentData {
    identifier: String,
    path: Option<PathBuf>,
    values: DashMap<String, Value>,
}

impl PersistentData {
    /// A store that is never written to disk.
    pub fn in_memory(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            path: None,
            values: DashMap::new(),
        }
    }

    /// Loads `path`, starting empty when the file does not exist yet.
    pub fn load(identifier: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self, DataError> {
        let path = path.into();
        let values = read(&path)?.into_iter().collect();

        Ok(Self {
            identifier: identifier.into(),
            path: Some(path),
            values,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).map(|v| v.value().clone())
    }

    pub fn set(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.remove(key).map(|(_, v)| v)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn clear(&self) {
        self.values.clear();
    }

    pub fn keys(&self) -> Vec<String> {
        self.snapshot().into_keys().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.values
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn save(&self) -> Result<(), DataError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(path, e))?;
        }

        let yaml = serde_yaml::to_string(&self.snapshot()).map_err(|e| DataError::Yaml {
            path: path.clone(),
            source: e,
        })?;
        fs::write(path, yaml).map_err(|e| io_error(path, e))?;

        debug!(script = %self.identifier, path = %path.display(), "Saved script data");
        Ok(())
    }

    /// Replaces the in-memory values with the file's contents.
    pub fn reload(&self) -> Result<(), DataError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let values = read(path)?;
        self.values.clear();
        for (key, value) in values {
            self.values.insert(key, value);
        }
        Ok(())
    }
}

fn read(path: &Path) -> Result<BTreeMap<String, Value>, DataError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(io_error(path, e)),
    };

    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    serde_yaml::from_str(&content).map_err(|e| DataError::Yaml {
        path: path.to_path_buf(),
        source: e,
    })
}

fn io_error(path: &Path, source: io::Error) -> DataError {
    DataError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let data = PersistentData::load("example", dir.path().join("example_data.yml")).unwrap();
        assert!(data.is_empty());
        assert!(!dir.path().join("example_data.yml").exists());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("example_data.yml");

        let data = PersistentData::load("example", &path).unwrap();
        data.set("count", json!(3));
        data.set("names", json!(["a", "b"]));
        data.save().unwrap();

        let loaded = PersistentData::load("example", &path).unwrap();
        assert_eq!(loaded.get("count"), Some(json!(3)));
        assert_eq!(loaded.get("names"), Some(json!(["a", "b"])));
        assert_eq!(loaded.keys(), vec!["count", "names"]);
    }

    #[test]
    fn test_reload_discards_unsaved_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("example_data.yml");
        fs::write(&path, "greeting: hello\n").unwrap();

        let data = PersistentData::load("example", &path).unwrap();
        data.set("greeting", json!("bye"));
        data.set("extra", json!(true));
        data.reload().unwrap();

        assert_eq!(data.get("greeting"), Some(json!("hello")));
        assert!(!data.exists("extra"));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad_data.yml");
        fs::write(&path, "- just\n- a list\n").unwrap();

        assert!(matches!(
            PersistentData::load("bad", &path),
            Err(DataError::Yaml { .. })
        ));
    }

    #[test]
    fn test_in_memory_save_is_noop() {
        let data = PersistentData::in_memory("tmp");
        data.set("k", json!(1));
        data.save().unwrap();
        assert_eq!(data.remove("k"), Some(json!(1)));
        assert_eq!(data.path(), None);
    }
}
