use std::{fmt, sync::Arc};

use rhai::{Array, Dynamic};
use scriptex_runtime::{Bindings, ExecutionError, InterpreterFactory, InterpreterPool};
use tracing::{debug, error};

use crate::{
    cache::{RequesterKey, argument_key},
    definition::ScriptDefinition,
    error::EvaluationError,
    host::{
        ExpansionInfo, HostApi, HostServer, OfflinePlayerHandle, PlaceholderHandle, PlayerHandle, ScriptData,
        ServerHandle, SubstitutionHandle, names,
    },
    identity::Identity,
    substitution::SubstitutionService,
    template::TemplateScanner,
};

/// What every failed evaluation returns.
pub const SCRIPT_ERROR: &str = "Script error (check console)";

/// Turns script definitions into strings.
///
/// Safe to share between worker threads; each worker runs scripts on its own
/// interpreter from the pool.
pub struct Evaluator {
    pool: InterpreterPool,
    substitution: Arc<dyn SubstitutionService>,
    server: Arc<dyn HostServer>,
    expansion: ExpansionInfo,
    scanner: TemplateScanner,
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("pool", &self.pool)
            .field("server", &self.server.name())
            .field("expansion", &self.expansion)
            .finish()
    }
}

impl Evaluator {
    pub fn new(
        factory: InterpreterFactory,
        substitution: Arc<dyn SubstitutionService>,
        server: Arc<dyn HostServer>,
    ) -> Self {
        Self {
            pool: InterpreterPool::new(factory.with_extension(Arc::new(HostApi))),
            substitution,
            server,
            expansion: ExpansionInfo::default(),
            scanner: TemplateScanner::new(),
        }
    }

    pub fn with_expansion(mut self, expansion: ExpansionInfo) -> Self {
        self.expansion = expansion;
        self
    }

    pub fn pool(&self) -> &InterpreterPool {
        &self.pool
    }

    pub fn expansion(&self) -> &ExpansionInfo {
        &self.expansion
    }

    pub fn substitution(&self) -> &Arc<dyn SubstitutionService> {
        &self.substitution
    }

    /// Evaluates `definition`, logging any failure and returning
    /// [`SCRIPT_ERROR`] in its place.
    pub fn evaluate(&self, definition: &Arc<ScriptDefinition>, identity: &Identity, args: &[String]) -> String {
        match self.try_evaluate(definition, identity, args) {
            Ok(result) => result,
            Err(e) => {
                error!(script = %definition.identifier(), error = %e, "Script evaluation failed");
                SCRIPT_ERROR.to_string()
            }
        }
    }

    pub fn try_evaluate(
        &self,
        definition: &Arc<ScriptDefinition>,
        identity: &Identity,
        args: &[String],
    ) -> Result<String, EvaluationError> {
        let cache = definition.cache();
        let keys = cache.policy().is_enabled().then(|| {
            (
                RequesterKey::resolve(cache.policy(), identity.unique_id()),
                argument_key(args),
            )
        });

        if let Some(hit) = keys
            .as_ref()
            .and_then(|(requester, arg_key)| cache.lookup(requester, arg_key))
        {
            debug!(script = %definition.identifier(), "Cache hit");
            return Ok(hit);
        }

        let script = self
            .scanner
            .scan(definition.template(), |token| self.substitution.substitute(identity, token))?;

        let args = args
            .iter()
            .map(|arg| {
                if arg.is_empty() {
                    Ok(Dynamic::from(arg.clone()))
                } else {
                    self.substitution
                        .substitute_bracketed(identity, arg)
                        .map(Dynamic::from)
                }
            })
            .collect::<Result<Array, _>>()?;

        let arg_count = args.len();
        let context = self.pool.acquire(self.default_bindings(definition)?)?;
        let value = context
            .execute(call_bindings(identity, args), &script)
            .map_err(|e| match e {
                // Only an array the size of `args` can be an argument lookup.
                ExecutionError::IndexOutOfBounds { length, .. } if length == arg_count => {
                    EvaluationError::Argument {
                        script: definition.identifier().to_string(),
                        message: e.to_string(),
                    }
                }
                e => EvaluationError::ScriptExecution {
                    script: definition.identifier().to_string(),
                    message: e.to_string(),
                },
            })?;

        let result = if value.is_unit() {
            String::new()
        } else {
            self.substitution
                .substitute_bracketed(identity, &value.to_string())?
        };

        if let Some((requester, arg_key)) = keys {
            cache.store(requester, arg_key, result.clone());
        }

        Ok(result)
    }

    fn default_bindings(&self, definition: &Arc<ScriptDefinition>) -> Result<Bindings, EvaluationError> {
        let data = ScriptData::new(Arc::clone(definition.data()));
        let snapshot = data
            .snapshot()
            .map_err(|e| EvaluationError::ScriptExecution {
                script: definition.identifier().to_string(),
                message: e.to_string(),
            })?;

        let mut bindings = Bindings::new();
        bindings
            .insert(names::DATA, Dynamic::from(data))
            .insert(names::DATA_VAR, snapshot)
            .insert(names::SERVER, Dynamic::from(ServerHandle::new(Arc::clone(&self.server))))
            .insert(names::EXPANSION, Dynamic::from(self.expansion.clone()))
            .insert(
                names::PLACEHOLDER,
                Dynamic::from(PlaceholderHandle::new(Arc::clone(definition))),
            )
            .insert(
                names::SUBSTITUTION,
                Dynamic::from(SubstitutionHandle::new(Arc::clone(&self.substitution))),
            );
        Ok(bindings)
    }
}

fn call_bindings(identity: &Identity, args: Array) -> Bindings {
    let mut bindings = Bindings::new();
    bindings.insert(names::ARGS, Dynamic::from(args));

    if let Some(player) = identity.online_player() {
        bindings
            .insert(names::HOST_PLAYER, Dynamic::from(PlayerHandle::new(player.clone())))
            .insert(names::PLAYER, Dynamic::from(PlayerHandle::new(player.clone())));
    }

    bindings.insert(
        names::OFFLINE_PLAYER,
        identity
            .offline_view()
            .map_or(Dynamic::UNIT, |player| Dynamic::from(OfflinePlayerHandle::new(player))),
    );
    bindings
}
