use std::collections::{BTreeMap, BTreeSet};

/// A channel topic.
///
/// Fields fill in independently: `332` carries the content, `333` the
/// setter and time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Topic {
    pub content: String,
    /// Setter, as a nick or full prefix.
    pub who: Option<String>,
    /// Set time in UNIX seconds.
    pub time: Option<String>,
}

/// A channel member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub nick: String,
    /// Member status letters, e.g. `o`, `v`.
    pub modes: BTreeSet<char>,
}

impl User {
    pub fn new(nick: impl Into<String>) -> Self {
        User {
            nick: nick.into(),
            modes: BTreeSet::new(),
        }
    }
}

/// A channel as seen from the upstream connection.
///
/// Members are keyed by their case-folded nick; [`User::nick`] keeps the
/// spelling last seen on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    /// Mode letters that are set, with their parameter if they carry one.
    pub modes: BTreeMap<char, Option<String>>,
    pub(crate) users: BTreeMap<String, User>,
    pub topic: Option<Topic>,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Channel {
            name: name.into(),
            modes: BTreeMap::new(),
            users: BTreeMap::new(),
            topic: None,
        }
    }

    /// Members in folded-nick order.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Look up a member by folded nick.
    pub fn user(&self, key: &str) -> Option<&User> {
        self.users.get(key)
    }

    /// Whether a member with this folded nick is present.
    pub fn has_user(&self, key: &str) -> bool {
        self.users.contains_key(key)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// The channel mode string and its parameters, as in `324`.
    pub fn mode_string(&self) -> (String, Vec<String>) {
        let mut letters = String::from("+");
        let mut params = Vec::new();
        for (mode, param) in &self.modes {
            letters.push(*mode);
            if let Some(param) = param {
                params.push(param.clone());
            }
        }
        (letters, params)
    }
}
