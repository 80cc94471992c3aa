//! Administrative commands and the registry abstraction hosts plug them into.
use std::{fmt, sync::Arc};

use dashmap::{DashMap, DashSet, mapref::entry::Entry};
use itertools::Itertools;
use strum::IntoEnumIterator;
use tracing::{debug, warn};

use crate::{
    definition::ScriptDefinition, identity::Identity, loader::ScriptLoader, pipeline::Evaluator,
};

pub const COMMAND_NAME: &str = "scriptex";
pub const COMMAND_ALIASES: &[&str] = &["sx"];
const PARSE_IDENTIFIER: &str = "parse-command";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    Lines(Vec<String>),
    None,
}

impl CommandOutput {
    pub fn line(line: impl Into<String>) -> Self {
        CommandOutput::Lines(vec![line.into()])
    }

    pub fn lines(&self) -> &[String] {
        match self {
            CommandOutput::Lines(lines) => lines,
            CommandOutput::None => &[],
        }
    }
}

pub type CommandHandler = Arc<dyn Fn(&Identity, &[String]) -> CommandOutput + Send + Sync>;

/// Where the host keeps its named commands.
pub trait CommandRegistry: Send + Sync {
    /// Returns `false` if `name` is already taken.
    fn register(&self, name: &str, handler: CommandHandler) -> bool;

    /// Returns `false` if nothing was registered under `name`.
    fn unregister(&self, name: &str) -> bool;
}

#[derive(Default)]
pub struct InMemoryCommandRegistry {
    commands: DashMap<String, CommandHandler>,
}

impl fmt::Debug for InMemoryCommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryCommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}

impl InMemoryCommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        self.commands.iter().map(|entry| entry.key().clone()).sorted().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Runs the handler registered under `name`, if any.
    pub fn dispatch(&self, name: &str, sender: &Identity, args: &[String]) -> Option<CommandOutput> {
        // Cloned out so a handler may touch the registry itself.
        let handler = self.commands.get(name).map(|entry| Arc::clone(entry.value()))?;
        Some(handler(sender, args))
    }
}

impl CommandRegistry for InMemoryCommandRegistry {
    fn register(&self, name: &str, handler: CommandHandler) -> bool {
        match self.commands.entry(name.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(handler);
                true
            }
        }
    }

    fn unregister(&self, name: &str) -> bool {
        self.commands.remove(name).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseTarget {
    #[default]
    Me,
    Anonymous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugAction {
    #[default]
    SaveData,
    LoadData,
}

#[derive(Debug, Clone, PartialEq, Eq, strum::EnumIter)]
pub enum ExpansionCommand {
    List,
    Parse { target: ParseTarget, code: String },
    Reload,
    Debug { action: DebugAction, identifier: String },
    Help,
    Unknown(String),
}

impl ExpansionCommand {
    pub fn help(&self) -> Option<String> {
        let (usage, description) = match self {
            ExpansionCommand::List => ("list", "List loaded scripts"),
            ExpansionCommand::Parse { .. } => ("parse <me|anon> <code>", "Evaluate code as a script"),
            ExpansionCommand::Reload => ("reload", "Reload the script configuration"),
            ExpansionCommand::Debug { .. } => (
                "debug <savedata|loaddata> <id>",
                "Flush or re-read a script's data",
            ),
            ExpansionCommand::Help => ("help", "Print command help"),
            ExpansionCommand::Unknown(_) => return None,
        };
        Some(format!("{usage:<32}{description}"))
    }
}

impl From<&[String]> for ExpansionCommand {
    fn from(args: &[String]) -> Self {
        match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["list"] => ExpansionCommand::List,
            ["reload"] => ExpansionCommand::Reload,
            ["help"] | [] => ExpansionCommand::Help,
            ["parse", target @ ("me" | "anon"), code @ ..] if !code.is_empty() => ExpansionCommand::Parse {
                target: if *target == "me" {
                    ParseTarget::Me
                } else {
                    ParseTarget::Anonymous
                },
                code: code.join(" "),
            },
            ["debug", "savedata", identifier] => ExpansionCommand::Debug {
                action: DebugAction::SaveData,
                identifier: identifier.to_string(),
            },
            ["debug", "loaddata", identifier] => ExpansionCommand::Debug {
                action: DebugAction::LoadData,
                identifier: identifier.to_string(),
            },
            _ => ExpansionCommand::Unknown(args.join(" ")),
        }
    }
}

/// Routes `<name> <subcommand> ...` to the script runtime.
pub struct ExpansionCommandRouter {
    name: String,
    aliases: Vec<String>,
    evaluator: Arc<Evaluator>,
    loader: Arc<ScriptLoader>,
}

impl fmt::Debug for ExpansionCommandRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpansionCommandRouter")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .finish()
    }
}

impl ExpansionCommandRouter {
    pub fn new(evaluator: Arc<Evaluator>, loader: Arc<ScriptLoader>) -> Self {
        Self {
            name: COMMAND_NAME.to_string(),
            aliases: COMMAND_ALIASES.iter().map(|alias| alias.to_string()).collect(),
            evaluator,
            loader,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn usage(&self) -> String {
        format!("Usage: {} <list|parse|reload|debug|help>", self.name)
    }

    pub fn execute(&self, sender: &Identity, args: &[String]) -> CommandOutput {
        let command = ExpansionCommand::from(args);
        debug!(?command, "Executing command");

        match command {
            ExpansionCommand::List => self.list(),
            ExpansionCommand::Parse { target, code } => self.parse(sender, target, &code),
            ExpansionCommand::Reload => match self.loader.reload() {
                Ok(loaded) => CommandOutput::line(format!("Reloaded {loaded} script(s)")),
                Err(e) => {
                    warn!(error = %e, "Reload failed");
                    CommandOutput::line(format!("Reload failed: {e}"))
                }
            },
            ExpansionCommand::Debug { action, identifier } => self.debug_data(action, &identifier),
            ExpansionCommand::Help => CommandOutput::Lines(
                std::iter::once(self.usage())
                    .chain(ExpansionCommand::iter().filter_map(|command| command.help()))
                    .collect(),
            ),
            ExpansionCommand::Unknown(_) => CommandOutput::line(self.usage()),
        }
    }

    /// The router as a handler for a [`CommandRegistry`].
    pub fn handler(self: &Arc<Self>) -> CommandHandler {
        let router = Arc::clone(self);
        Arc::new(move |sender: &Identity, args: &[String]| router.execute(sender, args))
    }

    fn list(&self) -> CommandOutput {
        let identifiers = self.loader.registry().identifiers();
        CommandOutput::line(format!(
            "{} script(s) loaded: {}",
            identifiers.len(),
            identifiers.join(", ")
        ))
    }

    fn parse(&self, sender: &Identity, target: ParseTarget, code: &str) -> CommandOutput {
        let identity = match target {
            ParseTarget::Me if sender.is_anonymous() => {
                return CommandOutput::line("Only players can parse as 'me'");
            }
            ParseTarget::Me => sender.clone(),
            ParseTarget::Anonymous => Identity::Anonymous,
        };

        let definition = Arc::new(ScriptDefinition::ephemeral(PARSE_IDENTIFIER, code));
        CommandOutput::line(self.evaluator.evaluate(&definition, &identity, &[]))
    }

    fn debug_data(&self, action: DebugAction, identifier: &str) -> CommandOutput {
        let Some(definition) = self.loader.registry().get(identifier) else {
            return CommandOutput::line(format!("Invalid script identifier '{identifier}'"));
        };

        let (result, verb) = match action {
            DebugAction::SaveData => (definition.data().save(), "Saved"),
            DebugAction::LoadData => (definition.data().reload(), "Loaded"),
        };

        match result {
            Ok(()) => CommandOutput::line(format!("{verb} data of script '{identifier}'")),
            Err(e) => CommandOutput::line(e.to_string()),
        }
    }
}

/// Registers a router under its name and aliases, and removes exactly the
/// names it managed to claim.
pub struct CommandRegistrar {
    router: Arc<ExpansionCommandRouter>,
    registry: Arc<dyn CommandRegistry>,
    owned: DashSet<String>,
}

impl fmt::Debug for CommandRegistrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistrar")
            .field("router", &self.router)
            .field("owned", &self.owned)
            .finish()
    }
}

impl CommandRegistrar {
    pub fn new(router: Arc<ExpansionCommandRouter>, registry: Arc<dyn CommandRegistry>) -> Self {
        Self {
            router,
            registry,
            owned: DashSet::new(),
        }
    }

    /// Returns the number of names claimed.
    pub fn register(&self) -> usize {
        let handler = self.router.handler();
        let names = std::iter::once(self.router.name()).chain(self.router.aliases().iter().map(String::as_str));

        let mut claimed = 0;
        for name in names {
            if self.registry.register(name, Arc::clone(&handler)) {
                self.owned.insert(name.to_string());
                claimed += 1;
            } else {
                warn!(command = %name, "Command name already taken");
            }
        }
        claimed
    }

    pub fn unregister(&self) -> usize {
        let owned = self.owned.iter().map(|name| name.key().clone()).collect::<Vec<_>>();
        self.owned.clear();
        owned
            .iter()
            .filter(|name| self.registry.unregister(name))
            .count()
    }
}
