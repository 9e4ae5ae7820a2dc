//! ISUPPORT token builder.

/// Builder for constructing ISUPPORT token strings.
///
/// Used to replay a stored table as `RPL_ISUPPORT` lines.
#[derive(Debug, Clone, Default)]
pub struct IsupportBuilder {
    tokens: Vec<String>,
}

impl IsupportBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Set the `CHANTYPES` token.
    pub fn chantypes(self, types: &str) -> Self {
        self.custom("CHANTYPES", Some(types))
    }

    /// Set the `CHANMODES` token.
    pub fn chanmodes(self, modes: &str) -> Self {
        self.custom("CHANMODES", Some(modes))
    }

    /// Set the `PREFIX` token with symbols and mode letters.
    pub fn prefix(self, symbols: &str, letters: &str) -> Self {
        self.custom("PREFIX", Some(&format!("({}){}", letters, symbols)))
    }

    /// Set the `CASEMAPPING` token.
    pub fn casemapping(self, mapping: &str) -> Self {
        self.custom("CASEMAPPING", Some(mapping))
    }

    /// Add a token, bare when `value` is `None`.
    pub fn custom(mut self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.tokens.push(format!("{}={}", key, v)),
            None => self.tokens.push(key.to_string()),
        }
        self
    }

    /// Build the tokens into a single space-separated string.
    pub fn build(self) -> String {
        self.tokens.join(" ")
    }

    /// Build the tokens into lines of at most `max_per_line` tokens each.
    pub fn build_lines(self, max_per_line: usize) -> Vec<String> {
        self.tokens
            .chunks(max_per_line.max(1))
            .map(|chunk| chunk.join(" "))
            .collect()
    }
}
