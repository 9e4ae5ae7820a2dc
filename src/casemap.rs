//! IRC case-mapping functions.
//!
//! IRC compares nicknames and channel names case-insensitively, and some
//! mappings also fold punctuation (e.g., `[` and `{`). The mapping in force
//! is advertised by the server through the `CASEMAPPING` ISUPPORT token;
//! `rfc1459` is assumed until one arrives.

/// A case mapping as advertised by `CASEMAPPING`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Casemap {
    /// Only `A-Z` fold to `a-z`.
    Ascii,
    /// ASCII plus `[]\~` folding to `{}|^`.
    #[default]
    Rfc1459,
    /// ASCII plus `[]\` folding to `{}|`.
    StrictRfc1459,
}

impl Casemap {
    /// Map a `CASEMAPPING` value to a mapping; unknown names fall back to
    /// `rfc1459`.
    pub fn from_token(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "ascii" => Casemap::Ascii,
            "strict-rfc1459" => Casemap::StrictRfc1459,
            _ => Casemap::Rfc1459,
        }
    }

    /// The token value naming this mapping.
    pub fn as_str(self) -> &'static str {
        match self {
            Casemap::Ascii => "ascii",
            Casemap::Rfc1459 => "rfc1459",
            Casemap::StrictRfc1459 => "strict-rfc1459",
        }
    }

    fn fold(self, c: char) -> char {
        match (self, c) {
            (_, 'A'..='Z') => c.to_ascii_lowercase(),
            (Casemap::Ascii, _) => c,
            (_, '[') => '{',
            (_, ']') => '}',
            (_, '\\') => '|',
            (Casemap::Rfc1459, '~') => '^',
            _ => c,
        }
    }

    /// Convert a string to IRC lowercase under this mapping.
    pub fn to_lower(self, s: &str) -> String {
        s.chars().map(|c| self.fold(c)).collect()
    }

    /// Compare two strings case-insensitively under this mapping.
    pub fn eq(self, a: &str, b: &str) -> bool {
        a.len() == b.len()
            && a
                .chars()
                .zip(b.chars())
                .all(|(ca, cb)| self.fold(ca) == self.fold(cb))
    }
}
