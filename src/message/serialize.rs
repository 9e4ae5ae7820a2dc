use std::fmt::{self, Display, Formatter};

use super::types::Message;

/// Whether the parameter at `index` must be written with a leading `:`.
fn needs_trailing(msg: &Message, index: usize) -> bool {
    let param = &msg.params[index];
    if index + 1 != msg.params.len() {
        return false;
    }

    param.is_empty()
        || param.starts_with(':')
        || param.contains(char::is_whitespace)
        || msg.is_command("PRIVMSG")
        || msg.is_command("NOTICE")
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(ref prefix) = self.prefix {
            write!(f, ":{} ", prefix)?;
        }

        f.write_str(&self.command)?;

        for (i, param) in self.params.iter().enumerate() {
            if needs_trailing(self, i) {
                write!(f, " :{}", param)?;
            } else {
                write!(f, " {}", param)?;
            }
        }

        f.write_str("\r\n")
    }
}
