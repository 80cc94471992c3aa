//! `scriptex-core` turns configured script templates into strings.
//!
//! A [`ScriptDefinition`] pairs a template with its [`PersistentData`] and a
//! [`ResultCache`]. The [`Evaluator`] scans the template for `%placeholders%`
//! outside comments, runs the result on the calling worker's interpreter and
//! memoizes the output according to the definition's [`CachePolicy`].
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use scriptex_core::{CachePolicy, Evaluator, Identity, MapSubstitutionService, ScriptDefinition, StaticHost};
//!
//! let evaluator = Evaluator::new(
//!     scriptex_runtime::initialize()?,
//!     Arc::new(MapSubstitutionService::new()),
//!     Arc::new(StaticHost::default()),
//! );
//! let definition = Arc::new(ScriptDefinition::ephemeral("sum", "return 1 + 1;").with_cache_policy(CachePolicy::Static));
//! assert_eq!(evaluator.evaluate(&definition, &Identity::Anonymous, &[]), "2");
//! ```
pub mod cache;
pub mod cleanup;
pub mod command;
pub mod config;
pub mod data;
pub mod definition;
pub mod error;
pub mod host;
pub mod identity;
pub mod loader;
pub mod pipeline;
pub mod registry;
pub mod substitution;
pub mod template;

pub use cache::{CachePolicy, RequesterKey, ResultCache, TimeUnit, argument_key};
pub use cleanup::{CleanupService, DEFAULT_CLEANUP_INTERVAL};
pub use command::{
    CommandHandler, CommandOutput, CommandRegistrar, CommandRegistry, ExpansionCommand, ExpansionCommandRouter,
    InMemoryCommandRegistry,
};
pub use config::{DEFAULT_CONFIG_FILE, ScriptConfiguration, ScriptEntry};
pub use data::PersistentData;
pub use definition::ScriptDefinition;
pub use error::{ConfigError, DataError, EvaluationError, LoadError, SubstitutionError};
pub use host::{ExpansionInfo, HostApi, HostServer, StaticHost};
pub use identity::{Identity, OfflinePlayer, OnlinePlayer};
pub use loader::ScriptLoader;
pub use pipeline::{Evaluator, SCRIPT_ERROR};
pub use registry::ScriptRegistry;
pub use substitution::{MapSubstitutionService, SubstitutionService};
pub use template::{Segment, TemplateScanner};
