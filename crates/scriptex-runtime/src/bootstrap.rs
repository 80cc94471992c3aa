//! One-time injection of the script library and the interpreter factory built on it.
//!
//! The library is verified and compiled once per process. Every interpreter the
//! factory creates sees the standard package and the library modules as static
//! namespaces, kept apart from anything the host registers through an
//! [`EngineExtension`].
use std::{fmt, sync::Arc};

use once_cell::sync::OnceCell;
use rhai::{Engine, Module, Scope, module_resolvers::DummyModuleResolver};
use tracing::{debug, info};

use crate::{
    error::{BootstrapError, ContextCreationError},
    library::{Library, LibrarySource},
};

pub const SCRIPT_LOG_TARGET: &str = "scriptex::script";

static LIBRARY: OnceCell<Arc<Library>> = OnceCell::new();

/// Host hook run on every interpreter right after it is created.
pub trait EngineExtension: Send + Sync {
    fn register(&self, engine: &mut Engine);
}

/// Injects the embedded library (once) and returns a factory bound to it.
pub fn initialize() -> Result<InterpreterFactory, BootstrapError> {
    initialize_with(&LibrarySource::Embedded)
}

/// Like [`initialize`], reading the library from `source` if nothing has been
/// injected yet. Once a library is injected, later calls reuse it regardless of
/// `source`.
pub fn initialize_with(source: &LibrarySource) -> Result<InterpreterFactory, BootstrapError> {
    let library = LIBRARY.get_or_try_init(|| {
        let library = Library::load(source)?;
        info!(
            modules = ?library.module_names().collect::<Vec<_>>(),
            "Script library injected"
        );
        Ok::<_, BootstrapError>(Arc::new(library))
    })?;

    Ok(InterpreterFactory::new(Arc::clone(library)))
}

pub fn is_initialized() -> bool {
    LIBRARY.get().is_some()
}

#[derive(Clone)]
pub struct InterpreterFactory {
    library: Arc<Library>,
    extensions: Vec<Arc<dyn EngineExtension>>,
    no_native_escape: bool,
}

impl fmt::Debug for InterpreterFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterpreterFactory")
            .field("library", &self.library.module_names().collect::<Vec<_>>())
            .field("extensions", &self.extensions.len())
            .field("no_native_escape", &self.no_native_escape)
            .finish()
    }
}

impl InterpreterFactory {
    pub fn new(library: Arc<Library>) -> Self {
        Self {
            library,
            extensions: Vec::new(),
            no_native_escape: true,
        }
    }

    pub fn with_extension(mut self, extension: Arc<dyn EngineExtension>) -> Self {
        self.extensions.push(extension);
        self
    }

    pub fn library(&self) -> &Arc<Library> {
        &self.library
    }

    pub fn is_restricted(&self) -> bool {
        self.no_native_escape
    }

    pub fn create(&self) -> Result<Engine, ContextCreationError> {
        let mut engine = Engine::new_raw();
        engine.register_global_module(self.library.standard.clone());

        if self.no_native_escape {
            engine.disable_symbol("eval");
            engine.set_module_resolver(DummyModuleResolver::new());
        }

        engine.on_print(|text| info!(target: SCRIPT_LOG_TARGET, "{text}"));
        engine.on_debug(|text, source, pos| {
            debug!(
                target: SCRIPT_LOG_TARGET,
                source = source.unwrap_or_default(),
                position = %pos,
                "{text}"
            )
        });

        for module in self.library.modules() {
            let instance = Module::eval_ast_as_new(Scope::new(), &module.ast, &engine).map_err(|e| {
                ContextCreationError::Library {
                    module: module.name.clone(),
                    message: e.to_string(),
                }
            })?;
            engine.register_static_module(module.name.as_str(), instance.into());
        }

        for extension in &self.extensions {
            extension.register(&mut engine);
        }

        Ok(engine)
    }
}
