//! Host objects handed to scripts and the engine extension that teaches every
//! interpreter about them.
use std::{fmt, sync::Arc};

use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString};
use scriptex_runtime::EngineExtension;

use crate::{
    data::PersistentData,
    definition::ScriptDefinition,
    identity::{Identity, OfflinePlayer, OnlinePlayer},
    substitution::SubstitutionService,
};

/// Binding names scripts are written against.
pub mod names {
    pub const DATA: &str = "Data";
    pub const DATA_VAR: &str = "DataVar";
    pub const SERVER: &str = "BukkitServer";
    pub const EXPANSION: &str = "Expansion";
    pub const PLACEHOLDER: &str = "Placeholder";
    pub const SUBSTITUTION: &str = "PlaceholderAPI";
    pub const ARGS: &str = "args";
    pub const HOST_PLAYER: &str = "BukkitPlayer";
    pub const PLAYER: &str = "Player";
    pub const OFFLINE_PLAYER: &str = "OfflinePlayer";
}

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

/// The server the scripts run inside.
pub trait HostServer: Send + Sync {
    fn name(&self) -> String;

    fn version(&self) -> String;

    fn online_players(&self) -> Vec<OnlinePlayer>;

    fn player(&self, name: &str) -> Option<OnlinePlayer> {
        self.online_players()
            .into_iter()
            .find(|player| player.name.eq_ignore_ascii_case(name))
    }
}

/// A host with a fixed player list.
#[derive(Debug, Clone)]
pub struct StaticHost {
    name: String,
    version: String,
    players: Vec<OnlinePlayer>,
}

impl StaticHost {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            players: Vec::new(),
        }
    }

    pub fn with_player(mut self, player: OnlinePlayer) -> Self {
        self.players.push(player);
        self
    }
}

impl Default for StaticHost {
    fn default() -> Self {
        Self::new("scriptex", env!("CARGO_PKG_VERSION"))
    }
}

impl HostServer for StaticHost {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn version(&self) -> String {
        self.version.clone()
    }

    fn online_players(&self) -> Vec<OnlinePlayer> {
        self.players.clone()
    }
}

/// Metadata of the component that owns every script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionInfo {
    pub identifier: String,
    pub author: String,
    pub version: String,
}

impl Default for ExpansionInfo {
    fn default() -> Self {
        Self {
            identifier: "scriptex".to_string(),
            author: "scriptex contributors".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ServerHandle(Arc<dyn HostServer>);

impl ServerHandle {
    pub fn new(server: Arc<dyn HostServer>) -> Self {
        Self(server)
    }
}

impl fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServerHandle").field(&self.0.name()).finish()
    }
}

#[derive(Clone)]
pub struct SubstitutionHandle(Arc<dyn SubstitutionService>);

impl SubstitutionHandle {
    pub fn new(service: Arc<dyn SubstitutionService>) -> Self {
        Self(service)
    }

    fn set_placeholders(&self, identity: &Identity, text: &str) -> ScriptResult<String> {
        self.0
            .substitute(identity, text)
            .map_err(|e| e.to_string().into())
    }

    fn set_bracket_placeholders(&self, identity: &Identity, text: &str) -> ScriptResult<String> {
        self.0
            .substitute_bracketed(identity, text)
            .map_err(|e| e.to_string().into())
    }
}

#[derive(Debug, Clone)]
pub struct ScriptData(Arc<PersistentData>);

impl ScriptData {
    pub fn new(data: Arc<PersistentData>) -> Self {
        Self(data)
    }

    fn get(&self, key: &str) -> ScriptResult<Dynamic> {
        match self.0.get(key) {
            Some(value) => rhai::serde::to_dynamic(&value),
            None => Ok(Dynamic::UNIT),
        }
    }

    fn get_or(&self, key: &str, default: Dynamic) -> ScriptResult<Dynamic> {
        match self.0.get(key) {
            Some(value) => rhai::serde::to_dynamic(&value),
            None => Ok(default),
        }
    }

    fn set(&self, key: &str, value: Dynamic) -> ScriptResult<()> {
        let value = rhai::serde::from_dynamic::<serde_json::Value>(&value)
            .map_err(|e| format!("Value cannot be stored under '{key}': {e}"))?;
        self.0.set(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> ScriptResult<Dynamic> {
        match self.0.remove(key) {
            Some(value) => rhai::serde::to_dynamic(&value),
            None => Ok(Dynamic::UNIT),
        }
    }

    fn keys(&self) -> Array {
        self.0.keys().into_iter().map(Dynamic::from).collect()
    }

    fn save(&self) -> ScriptResult<()> {
        self.0.save().map_err(|e| e.to_string().into())
    }

    /// The whole store as a script map.
    pub fn snapshot(&self) -> ScriptResult<Dynamic> {
        rhai::serde::to_dynamic(self.0.snapshot())
    }
}

#[derive(Debug, Clone)]
pub struct PlaceholderHandle(Arc<ScriptDefinition>);

impl PlaceholderHandle {
    pub fn new(definition: Arc<ScriptDefinition>) -> Self {
        Self(definition)
    }
}

#[derive(Debug, Clone)]
pub struct PlayerHandle(OnlinePlayer);

impl PlayerHandle {
    pub fn new(player: OnlinePlayer) -> Self {
        Self(player)
    }
}

#[derive(Debug, Clone)]
pub struct OfflinePlayerHandle(OfflinePlayer);

impl OfflinePlayerHandle {
    pub fn new(player: OfflinePlayer) -> Self {
        Self(player)
    }
}

fn optional(value: Option<&str>) -> Dynamic {
    value.map_or(Dynamic::UNIT, |v| Dynamic::from(v.to_string()))
}

/// Registers every host handle type on an interpreter.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostApi;

impl EngineExtension for HostApi {
    fn register(&self, engine: &mut Engine) {
        register_data(engine);
        register_server(engine);
        register_players(engine);
        register_substitution(engine);

        engine
            .register_type_with_name::<ExpansionInfo>("Expansion")
            .register_get("identifier", |e: &mut ExpansionInfo| e.identifier.clone())
            .register_get("author", |e: &mut ExpansionInfo| e.author.clone())
            .register_get("version", |e: &mut ExpansionInfo| e.version.clone());

        engine
            .register_type_with_name::<PlaceholderHandle>("Placeholder")
            .register_get("identifier", |p: &mut PlaceholderHandle| p.0.identifier().to_string())
            .register_get("script", |p: &mut PlaceholderHandle| p.0.template().to_string())
            .register_get("data", |p: &mut PlaceholderHandle| ScriptData::new(Arc::clone(p.0.data())))
            .register_fn("save_data", |p: &mut PlaceholderHandle| -> ScriptResult<()> {
                p.0.data().save().map_err(|e| e.to_string().into())
            });
    }
}

fn register_data(engine: &mut Engine) {
    engine
        .register_type_with_name::<ScriptData>("ScriptData")
        .register_fn("get", |d: &mut ScriptData, key: ImmutableString| d.get(&key))
        .register_fn("get_or", |d: &mut ScriptData, key: ImmutableString, default: Dynamic| {
            d.get_or(&key, default)
        })
        .register_fn("set", |d: &mut ScriptData, key: ImmutableString, value: Dynamic| {
            d.set(&key, value)
        })
        .register_fn("exists", |d: &mut ScriptData, key: ImmutableString| d.0.exists(&key))
        .register_fn("remove", |d: &mut ScriptData, key: ImmutableString| d.remove(&key))
        .register_fn("clear", |d: &mut ScriptData| d.0.clear())
        .register_fn("keys", |d: &mut ScriptData| d.keys())
        .register_fn("save", |d: &mut ScriptData| d.save());
}

fn register_server(engine: &mut Engine) {
    engine
        .register_type_with_name::<ServerHandle>("Server")
        .register_get("name", |s: &mut ServerHandle| s.0.name())
        .register_get("version", |s: &mut ServerHandle| s.0.version())
        .register_fn("online_players", |s: &mut ServerHandle| -> Array {
            s.0.online_players()
                .into_iter()
                .map(|player| Dynamic::from(PlayerHandle::new(player)))
                .collect()
        })
        .register_fn("player", |s: &mut ServerHandle, name: ImmutableString| {
            s.0.player(&name)
                .map_or(Dynamic::UNIT, |player| Dynamic::from(PlayerHandle::new(player)))
        });
}

fn register_players(engine: &mut Engine) {
    engine
        .register_type_with_name::<PlayerHandle>("Player")
        .register_get("name", |p: &mut PlayerHandle| p.0.name.clone())
        .register_get("uuid", |p: &mut PlayerHandle| p.0.id.to_string())
        .register_get("display_name", |p: &mut PlayerHandle| p.0.display_name.clone())
        .register_get("world", |p: &mut PlayerHandle| optional(p.0.world.as_deref()))
        .register_get("is_online", |_: &mut PlayerHandle| true)
        .register_fn("to_string", |p: &mut PlayerHandle| p.0.name.clone());

    engine
        .register_type_with_name::<OfflinePlayerHandle>("OfflinePlayer")
        .register_get("name", |p: &mut OfflinePlayerHandle| optional(p.0.name.as_deref()))
        .register_get("uuid", |p: &mut OfflinePlayerHandle| p.0.id.to_string())
        .register_get("is_online", |p: &mut OfflinePlayerHandle| p.0.online)
        .register_fn("to_string", |p: &mut OfflinePlayerHandle| p.0.id.to_string());
}

fn register_substitution(engine: &mut Engine) {
    engine
        .register_type_with_name::<SubstitutionHandle>("PlaceholderAPI")
        .register_fn("set_placeholders", |s: &mut SubstitutionHandle, text: ImmutableString| {
            s.set_placeholders(&Identity::Anonymous, &text)
        })
        .register_fn(
            "set_placeholders",
            |s: &mut SubstitutionHandle, player: PlayerHandle, text: ImmutableString| {
                s.set_placeholders(&Identity::Online(player.0), &text)
            },
        )
        .register_fn(
            "set_placeholders",
            |s: &mut SubstitutionHandle, player: OfflinePlayerHandle, text: ImmutableString| {
                s.set_placeholders(&Identity::Offline(player.0), &text)
            },
        )
        .register_fn(
            "set_bracket_placeholders",
            |s: &mut SubstitutionHandle, text: ImmutableString| {
                s.set_bracket_placeholders(&Identity::Anonymous, &text)
            },
        )
        .register_fn(
            "set_bracket_placeholders",
            |s: &mut SubstitutionHandle, player: PlayerHandle, text: ImmutableString| {
                s.set_bracket_placeholders(&Identity::Online(player.0), &text)
            },
        )
        .register_fn(
            "set_bracket_placeholders",
            |s: &mut SubstitutionHandle, player: OfflinePlayerHandle, text: ImmutableString| {
                s.set_bracket_placeholders(&Identity::Offline(player.0), &text)
            },
        );
}
