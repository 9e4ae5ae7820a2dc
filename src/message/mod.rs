mod nom_parser;
mod serialize;
mod types;

pub use self::nom_parser::{DetailedParseError, ParsedMessage};
pub use self::types::Message;
