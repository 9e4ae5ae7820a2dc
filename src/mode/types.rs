use std::fmt;

use crate::isupport::Isupport;

/// Whether a mode letter is being set or cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// `+`
    Add,
    /// `-`
    Remove,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Add => "+",
            Direction::Remove => "-",
        })
    }
}

/// A single resolved mode change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeChange {
    pub direction: Direction,
    pub mode: char,
    pub param: Option<String>,
}

impl ModeChange {
    pub fn new(direction: Direction, mode: char, param: Option<&str>) -> Self {
        ModeChange {
            direction,
            mode,
            param: param.map(str::to_owned),
        }
    }
}

/// Channel mode letters that consume a parameter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParamModes {
    prefix: String,
    list: String,
    always: String,
    on_set: String,
}

impl ParamModes {
    /// Build the policy from `PREFIX` and `CHANMODES`.
    pub fn from_isupport(isupport: &Isupport) -> Self {
        let chanmodes = isupport.chanmodes();
        ParamModes {
            prefix: isupport.prefix().modes().collect(),
            list: chanmodes.a.clone(),
            always: chanmodes.b.clone(),
            on_set: chanmodes.c.clone(),
        }
    }

    /// Whether `mode` consumes a parameter when applied in `direction`.
    ///
    /// Member status modes and `CHANMODES` groups A and B always do; group
    /// C only when set.
    pub fn takes_param(&self, mode: char, direction: Direction) -> bool {
        self.prefix.contains(mode)
            || self.list.contains(mode)
            || self.always.contains(mode)
            || (direction == Direction::Add && self.on_set.contains(mode))
    }

    /// Whether `mode` is a member status mode.
    pub fn is_prefix_mode(&self, mode: char) -> bool {
        self.prefix.contains(mode)
    }

    /// Whether `mode` is a list mode (group A).
    pub fn is_list_mode(&self, mode: char) -> bool {
        !self.is_prefix_mode(mode) && self.list.contains(mode)
    }
}
