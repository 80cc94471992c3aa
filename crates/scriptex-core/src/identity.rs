use uuid::Uuid;

/// A requester that is currently connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlinePlayer {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub world: Option<String>,
}

impl OnlinePlayer {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            display_name: name.clone(),
            name,
            world: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_world(mut self, world: impl Into<String>) -> Self {
        self.world = Some(world.into());
        self
    }
}

/// What is known about a requester whether or not they are connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflinePlayer {
    pub id: Uuid,
    pub name: Option<String>,
    pub online: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    Online(OnlinePlayer),
    Offline(OfflinePlayer),
    #[default]
    Anonymous,
}

impl Identity {
    pub fn offline(id: Uuid, name: Option<String>) -> Self {
        Identity::Offline(OfflinePlayer {
            id,
            name,
            online: false,
        })
    }

    pub fn unique_id(&self) -> Option<Uuid> {
        match self {
            Identity::Online(player) => Some(player.id),
            Identity::Offline(player) => Some(player.id),
            Identity::Anonymous => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Identity::Online(player) => Some(&player.name),
            Identity::Offline(player) => player.name.as_deref(),
            Identity::Anonymous => None,
        }
    }

    pub fn online_player(&self) -> Option<&OnlinePlayer> {
        match self {
            Identity::Online(player) => Some(player),
            _ => None,
        }
    }

    /// The possibly-offline view, available for every known requester.
    pub fn offline_view(&self) -> Option<OfflinePlayer> {
        match self {
            Identity::Online(player) => Some(OfflinePlayer {
                id: player.id,
                name: Some(player.name.clone()),
                online: true,
            }),
            Identity::Offline(player) => Some(player.clone()),
            Identity::Anonymous => None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }
}

impl From<OnlinePlayer> for Identity {
    fn from(player: OnlinePlayer) -> Self {
        Identity::Online(player)
    }
}

impl From<OfflinePlayer> for Identity {
    fn from(player: OfflinePlayer) -> Self {
        Identity::Offline(player)
    }
}
