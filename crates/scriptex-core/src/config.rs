use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::LoadError;

pub const DEFAULT_CONFIG_FILE: &str = "scripts.yml";

/// One configured script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEntry {
    /// Path of the template, relative to the scripts directory.
    pub file: PathBuf,
    /// Cache policy text, `STATIC` or `<integer> <unit>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<String>,
}

impl ScriptEntry {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: impl Into<String>) -> Self {
        self.cache = Some(cache.into());
        self
    }
}

/// The `scripts.yml` mapping of identifier to [`ScriptEntry`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptConfiguration {
    scripts: BTreeMap<String, ScriptEntry>,
}

impl ScriptConfiguration {
    /// Reads `path`. A missing file is an empty configuration.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content, path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Script configuration not found, no scripts will be loaded");
                Ok(Self::default())
            }
            Err(e) => Err(LoadError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, LoadError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(content).map_err(|e| LoadError::Config {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), LoadError> {
        let io_error = |source: io::Error| LoadError::Io {
            path: path.to_path_buf(),
            source,
        };

        let yaml = serde_yaml::to_string(self).map_err(|e| LoadError::Config {
            path: path.to_path_buf(),
            source: e,
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(path, yaml).map_err(io_error)
    }

    pub fn get(&self, identifier: &str) -> Option<&ScriptEntry> {
        self.scripts.get(identifier)
    }

    pub fn insert(&mut self, identifier: impl Into<String>, entry: ScriptEntry) -> Option<ScriptEntry> {
        self.scripts.insert(identifier.into(), entry)
    }

    pub fn remove(&mut self, identifier: &str) -> Option<ScriptEntry> {
        self.scripts.remove(identifier)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ScriptEntry)> {
        self.scripts.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let config = ScriptConfiguration::parse(
            r#"
greeting:
  file: greeting.rhai
counter:
  file: counter.rhai
  cache: 10 SECONDS
"#,
            Path::new("scripts.yml"),
        )
        .unwrap();

        assert_eq!(config.len(), 2);
        assert_eq!(config.get("greeting"), Some(&ScriptEntry::new("greeting.rhai")));
        assert_eq!(
            config.get("counter"),
            Some(&ScriptEntry::new("counter.rhai").with_cache("10 SECONDS"))
        );
        assert_eq!(
            config.entries().map(|(id, _)| id).collect::<Vec<_>>(),
            vec!["counter", "greeting"]
        );
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ScriptConfiguration::load(&dir.path().join("scripts.yml")).unwrap().is_empty());
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            ScriptConfiguration::parse("greeting: 42", Path::new("scripts.yml")),
            Err(LoadError::Config { .. })
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join(DEFAULT_CONFIG_FILE);

        let mut config = ScriptConfiguration::default();
        config.insert("a", ScriptEntry::new("a.rhai").with_cache("STATIC"));
        config.save(&path).unwrap();

        assert_eq!(ScriptConfiguration::load(&path).unwrap(), config);
    }
}
