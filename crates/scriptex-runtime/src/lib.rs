//! `scriptex-runtime` hosts the isolated script interpreter used by scriptex.
//!
//! The script library is injected once per process through [`initialize`]; the
//! resulting [`InterpreterFactory`] builds restricted interpreters, and an
//! [`InterpreterPool`] keeps one of them per worker thread.
//!
//! ```rust,ignore
//! use scriptex_runtime::{Bindings, InterpreterPool};
//!
//! let pool = InterpreterPool::new(scriptex_runtime::initialize()?);
//! let result = pool
//!     .acquire(Bindings::new())?
//!     .execute(Bindings::new(), "return 1 + 1;")?;
//! assert_eq!(result.as_int().unwrap(), 2);
//! ```
mod bindings;
mod bootstrap;
mod error;
mod library;
mod pool;

pub use bindings::Bindings;
pub use bootstrap::{
    EngineExtension, InterpreterFactory, SCRIPT_LOG_TARGET, initialize, initialize_with, is_initialized,
};
pub use error::{BootstrapError, ContextCreationError, ExecutionError};
pub use library::{Library, LibraryModule, LibrarySource, MANIFEST_FILE};
pub use pool::{ExecutionContext, InterpreterPool};

pub use rhai;
