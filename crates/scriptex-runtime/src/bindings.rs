use rhai::{Dynamic, Scope};

/// Named values installed into an interpreter scope before a script runs.
///
/// Insertion order is preserved; inserting an existing name replaces its value
/// in place.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    entries: Vec<(String, Dynamic)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Dynamic) -> &mut Self {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Dynamic> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn install(self, scope: &mut Scope<'static>) {
        for (name, value) in self.entries {
            scope.push_dynamic(name, value);
        }
    }
}

impl<S: Into<String>> FromIterator<(S, Dynamic)> for Bindings {
    fn from_iter<T: IntoIterator<Item = (S, Dynamic)>>(iter: T) -> Self {
        let mut bindings = Bindings::new();
        for (name, value) in iter {
            bindings.insert(name, value);
        }
        bindings
    }
}
