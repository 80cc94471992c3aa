use std::{collections::HashMap, sync::LazyLock};

use regex_lite::{Captures, Regex};

use crate::{error::SubstitutionError, identity::Identity};

static PERCENT_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"%([^%]+)%").unwrap());
static BRACKET_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").unwrap());

/// The external text-substitution service.
///
/// `substitute` receives a single `%token%` found in a template;
/// `substitute_bracketed` receives free text containing `{token}`s (arguments
/// and results).
pub trait SubstitutionService: Send + Sync {
    fn substitute(&self, identity: &Identity, text: &str) -> Result<String, SubstitutionError>;

    fn substitute_bracketed(&self, identity: &Identity, text: &str) -> Result<String, SubstitutionError>;
}

/// Resolves tokens from a fixed table plus a few requester-derived keys.
/// Unknown tokens are left untouched.
#[derive(Debug, Clone, Default)]
pub struct MapSubstitutionService {
    values: HashMap<String, String>,
}

impl MapSubstitutionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn resolve(&self, identity: &Identity, key: &str) -> Option<String> {
        match key {
            "player_name" => identity.name().map(str::to_string),
            "player_uuid" => identity.unique_id().map(|id| id.to_string()),
            "player_online" => Some(
                if identity.online_player().is_some() { "yes" } else { "no" }.to_string(),
            ),
            _ => self.values.get(key).cloned(),
        }
    }

    fn replace(&self, pattern: &Regex, identity: &Identity, text: &str) -> String {
        pattern
            .replace_all(text, |caps: &Captures| {
                self.resolve(identity, &caps[1])
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

impl SubstitutionService for MapSubstitutionService {
    fn substitute(&self, identity: &Identity, text: &str) -> Result<String, SubstitutionError> {
        Ok(self.replace(&PERCENT_TOKEN, identity, text))
    }

    fn substitute_bracketed(&self, identity: &Identity, text: &str) -> Result<String, SubstitutionError> {
        Ok(self.replace(&BRACKET_TOKEN, identity, text))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use uuid::Uuid;

    use super::*;
    use crate::identity::OnlinePlayer;

    fn service() -> MapSubstitutionService {
        MapSubstitutionService::new().with_value("server_name", "Lobby")
    }

    #[rstest]
    #[case::known("%server_name%", "Lobby")]
    #[case::unknown("%nope%", "%nope%")]
    #[case::player_name_anonymous("%player_name%", "%player_name%")]
    #[case::embedded("a %server_name% b", "a Lobby b")]
    fn test_substitute(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(service().substitute(&Identity::Anonymous, input).unwrap(), expected);
    }

    #[rstest]
    #[case::known("{server_name}!", "Lobby!")]
    #[case::unknown("{nope}", "{nope}")]
    #[case::percent_untouched("%server_name%", "%server_name%")]
    fn test_substitute_bracketed(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(
            service().substitute_bracketed(&Identity::Anonymous, input).unwrap(),
            expected
        );
    }

    #[test]
    fn test_identity_keys() {
        let id = Uuid::new_v4();
        let identity = Identity::from(OnlinePlayer::new(id, "Alex"));

        assert_eq!(
            service().substitute(&identity, "%player_name% %player_uuid%").unwrap(),
            format!("Alex {id}")
        );
        assert_eq!(
            service().substitute_bracketed(&identity, "{player_online}").unwrap(),
            "yes"
        );
    }
}
