use std::{
    sync::Arc,
    thread::{self, ThreadId},
};

use dashmap::DashMap;
use rhai::{Dynamic, Engine, Scope};
use tracing::debug;

use crate::{
    bindings::Bindings,
    bootstrap::InterpreterFactory,
    error::{ContextCreationError, ExecutionError},
};

/// One interpreter per worker thread, created lazily on first use.
///
/// Interpreters are never released or handed to another thread. The pool does
/// no locking of its own around execution: two calls on the same thread simply
/// run one after the other.
#[derive(Debug)]
pub struct InterpreterPool {
    factory: InterpreterFactory,
    slots: DashMap<ThreadId, Arc<Engine>>,
}

impl InterpreterPool {
    pub fn new(factory: InterpreterFactory) -> Self {
        Self {
            factory,
            slots: DashMap::new(),
        }
    }

    pub fn factory(&self) -> &InterpreterFactory {
        &self.factory
    }

    /// Returns a fresh context on the calling thread's interpreter with
    /// `defaults` installed.
    pub fn acquire(&self, defaults: Bindings) -> Result<ExecutionContext, ContextCreationError> {
        let engine = self.interpreter()?;
        let mut scope = Scope::new();
        defaults.install(&mut scope);
        Ok(ExecutionContext { engine, scope })
    }

    /// Number of workers that have an interpreter.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn interpreter(&self) -> Result<Arc<Engine>, ContextCreationError> {
        let worker = thread::current().id();

        if let Some(engine) = self.slots.get(&worker) {
            return Ok(Arc::clone(engine.value()));
        }

        let engine = Arc::new(self.factory.create()?);
        debug!(?worker, "Created interpreter for worker");
        self.slots.insert(worker, Arc::clone(&engine));
        Ok(engine)
    }
}

/// A worker's interpreter together with the bindings for a single evaluation.
pub struct ExecutionContext {
    engine: Arc<Engine>,
    scope: Scope<'static>,
}

impl ExecutionContext {
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.scope.contains(name)
    }

    pub fn execute(mut self, bindings: Bindings, script: &str) -> Result<Dynamic, ExecutionError> {
        bindings.install(&mut self.scope);
        Ok(self.engine.eval_with_scope::<Dynamic>(&mut self.scope, script)?)
    }
}
