use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::Arc,
};

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{IntoDiagnostic, miette};
use scriptex_core::{
    CleanupService, CommandRegistrar, Evaluator, ExpansionCommandRouter, Identity, InMemoryCommandRegistry,
    MapSubstitutionService, OnlinePlayer, ScriptDefinition, ScriptLoader, ScriptRegistry, StaticHost,
};
use tracing::debug;
use uuid::Uuid;

use crate::config::{Config, LogFormat, init_tracing};

const PARSE_IDENTIFIER: &str = "cli";

#[derive(Parser, Debug)]
#[command(name = "scriptex")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(after_help = "# Examples:\n\n\
    ## To evaluate a configured script:\n\
    scriptex --dir ./scripts eval greeting\n\n\
    ## To evaluate code on behalf of a player:\n\
    scriptex parse 'Player.name' --player Alex\n\n\
    ## To start an interactive console:\n\
    scriptex console")]
#[command(about = "Evaluates placeholder-aware script templates.", long_about = None)]
pub struct Cli {
    /// Directory containing the script files [env: SCRIPTEX_DIR]
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Script configuration file [env: SCRIPTEX_CONFIG]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log output format [env: SCRIPTEX_LOG_FORMAT]
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    /// Sets a static placeholder value
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value, global = true)]
    values: Vec<(String, String)>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a configured script
    Eval {
        /// Script identifier
        id: String,
        /// Arguments passed to the script as `args`
        args: Vec<String>,
        #[clap(flatten)]
        requester: RequesterArgs,
    },
    /// List configured scripts
    List,
    /// Evaluate code as an uncached script
    Parse {
        code: String,
        #[clap(flatten)]
        requester: RequesterArgs,
    },
    /// Read commands from stdin and dispatch them through the command registry
    Console {
        #[clap(flatten)]
        requester: RequesterArgs,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
struct RequesterArgs {
    /// Evaluate on behalf of this player
    #[arg(long)]
    player: Option<String>,

    /// The player's unique id
    #[arg(long, requires = "player")]
    uuid: Option<Uuid>,

    /// Treat the player as offline
    #[arg(long, requires = "player", default_value_t = false)]
    offline: bool,
}

impl RequesterArgs {
    fn identity(&self) -> Identity {
        match &self.player {
            None => Identity::Anonymous,
            Some(name) => {
                let id = self.uuid.unwrap_or_else(Uuid::new_v4);
                if self.offline {
                    Identity::offline(id, Some(name.clone()))
                } else {
                    Identity::from(OnlinePlayer::new(id, name.clone()))
                }
            }
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))
}

struct Runtime {
    evaluator: Arc<Evaluator>,
    loader: Arc<ScriptLoader>,
}

impl Cli {
    pub fn run(&self) -> miette::Result<()> {
        let config = self.config();
        init_tracing(&config);

        let identity = match &self.command {
            Commands::Eval { requester, .. } | Commands::Parse { requester, .. } | Commands::Console { requester } => {
                requester.identity()
            }
            Commands::List => Identity::Anonymous,
        };

        let runtime = self.runtime(&config, &identity)?;
        let result = match &self.command {
            Commands::Eval { id, args, .. } => {
                let definition = runtime
                    .loader
                    .registry()
                    .get(id)
                    .ok_or_else(|| miette!("Unknown script '{id}'"))?;
                println!("{}", runtime.evaluator.evaluate(&definition, &identity, args));
                Ok(())
            }
            Commands::List => {
                let registry = runtime.loader.registry();
                for id in registry.identifiers() {
                    if let Some(definition) = registry.get(&id) {
                        println!("{} ({})", id.as_str().bold(), definition.policy());
                    }
                }
                Ok(())
            }
            Commands::Parse { code, .. } => {
                let definition = Arc::new(ScriptDefinition::ephemeral(PARSE_IDENTIFIER, code.as_str()));
                println!("{}", runtime.evaluator.evaluate(&definition, &identity, &[]));
                Ok(())
            }
            Commands::Console { .. } => {
                let mut cleanup =
                    CleanupService::new(Arc::clone(runtime.loader.registry()), config.cleanup_interval);
                cleanup.start();
                let result = console(&runtime, &identity);
                cleanup.stop();
                result
            }
        };

        runtime.loader.registry().save_all();
        result
    }

    fn config(&self) -> Config {
        let mut config = Config::from_env();

        if let Some(dir) = &self.dir {
            config.scripts_dir = dir.clone();
        }
        if let Some(file) = &self.config {
            config.config_file = Some(file.clone());
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }

        config
    }

    fn runtime(&self, config: &Config, identity: &Identity) -> miette::Result<Runtime> {
        debug!(dir = %config.scripts_dir.display(), config = %config.config_path().display(), "Starting runtime");
        let factory = scriptex_runtime::initialize().into_diagnostic()?;

        let substitution = self
            .values
            .iter()
            .fold(MapSubstitutionService::new(), |service, (key, value)| {
                service.with_value(key, value)
            });

        let host = identity
            .online_player()
            .cloned()
            .into_iter()
            .fold(StaticHost::default(), StaticHost::with_player);

        let evaluator = Arc::new(Evaluator::new(factory, Arc::new(substitution), Arc::new(host)));
        let loader = Arc::new(ScriptLoader::new(
            config.config_path(),
            &config.scripts_dir,
            Arc::new(ScriptRegistry::new()),
        ));
        loader.load().into_diagnostic()?;

        Ok(Runtime { evaluator, loader })
    }
}

fn console(runtime: &Runtime, identity: &Identity) -> miette::Result<()> {
    let registry = Arc::new(InMemoryCommandRegistry::new());
    let router = Arc::new(ExpansionCommandRouter::new(
        Arc::clone(&runtime.evaluator),
        Arc::clone(&runtime.loader),
    ));
    let registrar = CommandRegistrar::new(router, registry.clone());
    registrar.register();

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line.into_diagnostic()?;
        let words = line.split_whitespace().map(str::to_string).collect::<Vec<_>>();

        let Some((name, args)) = words.split_first() else {
            continue;
        };
        if matches!(name.as_str(), "quit" | "exit") {
            break;
        }

        match registry.dispatch(name, identity, args) {
            Some(output) => {
                for line in output.lines() {
                    writeln!(stdout, "{line}").into_diagnostic()?;
                }
            }
            None => writeln!(
                stdout,
                "{} {}. Known commands: {}",
                "Unknown command".red(),
                name,
                registry.names().join(", ")
            )
            .into_diagnostic()?,
        }
    }

    registrar.unregister();
    Ok(())
}
