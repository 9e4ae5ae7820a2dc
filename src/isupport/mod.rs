//! ISUPPORT (`005`) capability table.
//!
//! Servers advertise their parameters as `KEY` or `KEY=VALUE` tokens, often
//! split across several `005` lines. [`Isupport`] accumulates them: later
//! tokens overwrite earlier ones, `-KEY` removes a key, and the tokens the
//! state tracker depends on (`PREFIX`, `CHANMODES`, `CHANTYPES`,
//! `CASEMAPPING`) are kept parsed.

mod tokens;

pub use self::tokens::IsupportBuilder;

use crate::casemap::Casemap;

/// Tokens per replayed `005` line.
pub const TOKENS_PER_LINE: usize = 13;

const DEFAULT_CHANTYPES: &str = "#&";

/// Ordered mapping of member mode letters to their NAMES symbols.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixSpec {
    pairs: Vec<(char, char)>,
}

impl PrefixSpec {
    /// Parse a `(modes)symbols` value.
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() {
            return Some(PrefixSpec { pairs: Vec::new() });
        }
        let rest = s.strip_prefix('(')?;
        let (modes, symbols) = rest.split_once(')')?;
        if modes.chars().count() != symbols.chars().count() {
            return None;
        }
        Some(PrefixSpec {
            pairs: modes.chars().zip(symbols.chars()).collect(),
        })
    }

    /// The symbol shown for `mode`, e.g. `o` gives `@`.
    pub fn symbol_for(&self, mode: char) -> Option<char> {
        self.pairs.iter().find(|(m, _)| *m == mode).map(|(_, s)| *s)
    }

    /// The mode a NAMES symbol stands for, e.g. `@` gives `o`.
    pub fn mode_for(&self, symbol: char) -> Option<char> {
        self.pairs.iter().find(|(_, s)| *s == symbol).map(|(m, _)| *m)
    }

    /// Whether `mode` is a member status mode.
    pub fn is_prefix_mode(&self, mode: char) -> bool {
        self.symbol_for(mode).is_some()
    }

    /// Mode letters in rank order, highest first.
    pub fn modes(&self) -> impl Iterator<Item = char> + '_ {
        self.pairs.iter().map(|(m, _)| *m)
    }
}

impl Default for PrefixSpec {
    fn default() -> Self {
        PrefixSpec {
            pairs: vec![('o', '@'), ('v', '+')],
        }
    }
}

/// `CHANMODES` groups by parameter arity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChanModes {
    /// List modes; always take a parameter.
    pub a: String,
    /// Always take a parameter.
    pub b: String,
    /// Take a parameter only when set.
    pub c: String,
    /// Never take a parameter.
    pub d: String,
}

impl ChanModes {
    /// Parse an `A,B,C,D` value. Groups beyond the fourth are ignored.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split(',');
        let (a, b, c, d) = (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
        Some(ChanModes {
            a: a.to_owned(),
            b: b.to_owned(),
            c: c.to_owned(),
            d: d.to_owned(),
        })
    }
}

impl Default for ChanModes {
    fn default() -> Self {
        ChanModes {
            a: "b".into(),
            b: "k".into(),
            c: "l".into(),
            d: "imnpst".into(),
        }
    }
}

/// Accumulated ISUPPORT state for one upstream connection.
#[derive(Clone, Debug, Default)]
pub struct Isupport {
    entries: Vec<(String, Option<String>)>,
    prefix: PrefixSpec,
    chanmodes: ChanModes,
    chantypes: Option<String>,
    casemap: Casemap,
}

impl Isupport {
    /// An empty table with the usual defaults for the parsed tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge raw tokens from one `005` line.
    pub fn update<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for token in tokens {
            let token = token.as_ref();
            if token.is_empty() || token.contains(' ') {
                continue;
            }

            if let Some(key) = token.strip_prefix('-') {
                self.remove(key);
                continue;
            }

            let (key, value) = match token.split_once('=') {
                Some((k, v)) => (k, Some(v)),
                None => (token, None),
            };
            self.insert(key, value);
        }
    }

    fn insert(&mut self, key: &str, value: Option<&str>) {
        let key = key.to_ascii_uppercase();
        let value = value.unwrap_or("");

        match key.as_str() {
            "PREFIX" => match PrefixSpec::parse(value) {
                Some(spec) => self.prefix = spec,
                None => return,
            },
            "CHANMODES" => match ChanModes::parse(value) {
                Some(modes) => self.chanmodes = modes,
                None => return,
            },
            "CHANTYPES" => self.chantypes = Some(value.to_owned()),
            "CASEMAPPING" => self.casemap = Casemap::from_token(value),
            _ => {}
        }

        let value = (!value.is_empty()).then(|| value.to_owned());
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    fn remove(&mut self, key: &str) {
        let key = key.to_ascii_uppercase();
        self.entries.retain(|(k, _)| *k != key);
        match key.as_str() {
            "PREFIX" => self.prefix = PrefixSpec::default(),
            "CHANMODES" => self.chanmodes = ChanModes::default(),
            "CHANTYPES" => self.chantypes = None,
            "CASEMAPPING" => self.casemap = Casemap::default(),
            _ => {}
        }
    }

    /// Raw value of `key`: `None` if never advertised, `Some(None)` for a
    /// bare flag token.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_deref())
    }

    /// Whether no token has been received.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Member status modes and their symbols.
    pub fn prefix(&self) -> &PrefixSpec {
        &self.prefix
    }

    /// Channel mode groups.
    pub fn chanmodes(&self) -> &ChanModes {
        &self.chanmodes
    }

    /// Characters that may begin a channel name.
    pub fn chantypes(&self) -> &str {
        self.chantypes.as_deref().unwrap_or(DEFAULT_CHANTYPES)
    }

    /// The case mapping in force.
    pub fn casemap(&self) -> Casemap {
        self.casemap
    }

    /// Whether `target` names a channel.
    pub fn is_channel(&self, target: &str) -> bool {
        target
            .chars()
            .next()
            .is_some_and(|c| self.chantypes().contains(c))
    }

    /// The stored tokens re-serialized, in first-seen order, for replay.
    pub fn to_lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .fold(IsupportBuilder::new(), |b, (k, v)| b.custom(k, v.as_deref()))
            .build_lines(TOKENS_PER_LINE)
    }
}
