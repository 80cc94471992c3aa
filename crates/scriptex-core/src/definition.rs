use std::sync::Arc;

use crate::{
    cache::{CachePolicy, ResultCache},
    data::PersistentData,
    error::ConfigError,
};

/// A named script template together with its data store and result cache.
#[derive(Debug)]
pub struct ScriptDefinition {
    identifier: String,
    template: String,
    data: Arc<PersistentData>,
    cache: ResultCache,
}

impl ScriptDefinition {
    pub fn new(identifier: impl Into<String>, template: impl Into<String>, data: Arc<PersistentData>) -> Self {
        Self {
            identifier: identifier.into(),
            template: template.into(),
            data,
            cache: ResultCache::default(),
        }
    }

    /// An uncached definition whose data never touches the disk.
    pub fn ephemeral(identifier: impl Into<String>, template: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let data = Arc::new(PersistentData::in_memory(identifier.clone()));
        Self::new(identifier, template, data)
    }

    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache = ResultCache::new(policy);
        self
    }

    /// Parses `spec` and replaces the cache with an empty one for that policy.
    /// On error the definition is left uncached.
    pub fn apply_cache_policy(&mut self, spec: &str) -> Result<(), ConfigError> {
        match ResultCache::configure(spec) {
            Ok(cache) => {
                self.cache = cache;
                Ok(())
            }
            Err(e) => {
                self.cache = ResultCache::default();
                Err(e)
            }
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn data(&self) -> &Arc<PersistentData> {
        &self.data
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn policy(&self) -> &CachePolicy {
        self.cache.policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TimeUnit;

    #[test]
    fn test_apply_cache_policy() {
        let mut definition = ScriptDefinition::ephemeral("example", "return 1;");
        assert_eq!(definition.policy(), &CachePolicy::Disabled);

        definition.apply_cache_policy("30 seconds").unwrap();
        assert_eq!(
            definition.policy(),
            &CachePolicy::time_boxed(30, TimeUnit::Seconds).unwrap()
        );
        assert!(definition.cache().is_allocated());
    }

    #[test]
    fn test_malformed_policy_falls_back_to_disabled() {
        let mut definition =
            ScriptDefinition::ephemeral("example", "return 1;").with_cache_policy(CachePolicy::Static);

        assert!(definition.apply_cache_policy("STATIC FOREVER").is_err());
        assert_eq!(definition.policy(), &CachePolicy::Disabled);
        assert!(!definition.cache().is_allocated());
    }
}
