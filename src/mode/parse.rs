//! IRC mode parsing.

use crate::error::ModeParseError;

use super::types::{Direction, ModeChange, ParamModes};

/// Resolve a mode token and its parameters into ordered changes.
///
/// With `policy` set, letters it marks as parameter-consuming take the next
/// parameter in order; with `None` (user modes) no letter does. Letters
/// before the first sign count as `+`. Parameters left over at the end are
/// ignored.
pub fn parse<S: AsRef<str>>(
    modes: &str,
    params: &[S],
    policy: Option<&ParamModes>,
) -> Result<Vec<ModeChange>, ModeParseError> {
    let mut res = vec![];
    let mut args = params.iter().map(|s| s.as_ref());
    let mut direction = Direction::Add;

    for c in modes.chars() {
        match c {
            '+' => direction = Direction::Add,
            '-' => direction = Direction::Remove,
            _ => {
                let param = if policy.is_some_and(|p| p.takes_param(c, direction)) {
                    match args.next() {
                        Some(arg) => Some(arg),
                        None => {
                            return Err(ModeParseError::MissingParameter { mode: c, direction });
                        }
                    }
                } else {
                    None
                };
                res.push(ModeChange::new(direction, c, param));
            }
        }
    }

    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isupport::Isupport;

    fn policy(tokens: &[&str]) -> ParamModes {
        let mut isupport = Isupport::new();
        isupport.update(tokens);
        ParamModes::from_isupport(&isupport)
    }

    #[test]
    fn test_prefix_modes_take_params_in_order() {
        let p = policy(&[]);
        let changes = parse("+o-v", &["alice", "bob"], Some(&p)).unwrap();
        assert_eq!(
            changes,
            vec![
                ModeChange::new(Direction::Add, 'o', Some("alice")),
                ModeChange::new(Direction::Remove, 'v', Some("bob")),
            ]
        );
    }

    #[test]
    fn test_on_set_only_mode() {
        let p = policy(&[]);
        let changes = parse("+l-l", &["10"], Some(&p)).unwrap();
        assert_eq!(
            changes,
            vec![
                ModeChange::new(Direction::Add, 'l', Some("10")),
                ModeChange::new(Direction::Remove, 'l', None),
            ]
        );
    }

    #[test]
    fn test_key_always_takes_param() {
        let p = policy(&[]);
        let changes = parse("-k", &["secret"], Some(&p)).unwrap();
        assert_eq!(
            changes,
            vec![ModeChange::new(Direction::Remove, 'k', Some("secret"))]
        );
    }

    #[test]
    fn test_flag_modes_take_nothing() {
        let p = policy(&[]);
        let changes = parse("+nt-s", &["unused"], Some(&p)).unwrap();
        assert_eq!(changes.len(), 3);
        assert!(changes.iter().all(|c| c.param.is_none()));
        assert_eq!(changes[2].direction, Direction::Remove);
    }

    #[test]
    fn test_missing_param_fails() {
        let p = policy(&[]);
        let err = parse("+o", &[] as &[&str], Some(&p)).unwrap_err();
        assert_eq!(
            err,
            ModeParseError::MissingParameter {
                mode: 'o',
                direction: Direction::Add
            }
        );
    }

    #[test]
    fn test_letters_before_sign_default_to_add() {
        let changes = parse("iw", &[] as &[&str], None).unwrap();
        assert_eq!(
            changes,
            vec![
                ModeChange::new(Direction::Add, 'i', None),
                ModeChange::new(Direction::Add, 'w', None),
            ]
        );
    }

    #[test]
    fn test_custom_chanmodes() {
        let p = policy(&["PREFIX=(qo)~@", "CHANMODES=beI,k,fl,imnpst"]);
        let changes = parse("+qbf", &["owner", "*!*@spam", "30:5"], Some(&p)).unwrap();
        assert_eq!(changes[0].param.as_deref(), Some("owner"));
        assert_eq!(changes[1].param.as_deref(), Some("*!*@spam"));
        assert_eq!(changes[2].param.as_deref(), Some("30:5"));
        assert!(p.is_list_mode('b'));
        assert!(!p.is_list_mode('q'));
    }

    #[test]
    fn test_user_modes_never_take_params() {
        let changes = parse("+o-x", &["ignored"], None).unwrap();
        assert_eq!(changes.len(), 2);
        assert!(changes[0].param.is_none());
    }
}
