//! Mode string parsing.
//!
//! A MODE line carries one token such as `+o-v+k` followed by the
//! parameters its letters consume. Which letters consume a parameter is
//! decided by the server's ISUPPORT table, see [`ParamModes`].

mod parse;
mod types;

pub use self::parse::parse;
pub use self::types::{Direction, ModeChange, ParamModes};
