//! Property-based tests for IRC message parsing.
//!
//! Uses proptest to generate random IRC components and verify that:
//! 1. Parsing never panics
//! 2. Serialized messages can be re-parsed (roundtrip)
//! 3. Parser invariants hold across random inputs

use proptest::prelude::*;
use slirc_bouncer::mode::{self, Direction, ParamModes};
use slirc_bouncer::{Isupport, Message, Prefix};

// =============================================================================
// STRATEGIES - Generators for valid IRC components
// =============================================================================

/// Valid IRC nickname: starts with letter or special char, followed by
/// letters, digits, or special chars.
fn nickname_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z\\[\\]\\\\^_`{|}][a-zA-Z0-9\\-\\[\\]\\\\^_`{|}]{0,8}")
        .expect("valid regex")
}

/// Valid IRC username (ident): alphanumeric, no spaces or @ or !
fn username_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9]{0,9}").expect("valid regex")
}

/// Valid hostname: simplified version
fn hostname_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9]+(\\.[a-z0-9]+)*").expect("valid regex")
}

/// Valid IRC channel name
fn channel_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[#&][a-zA-Z0-9_\\-]{1,49}").expect("valid regex")
}

/// Message text that doesn't contain CR/LF (which would break IRC protocol)
fn message_text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[^\r\n\0]{0,400}").expect("valid regex")
}

/// A command verb or a three-digit numeric.
fn command_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[A-Za-z]{3,10}").expect("valid regex"),
        (1u16..1000).prop_map(|n| format!("{:03}", n)),
    ]
}

/// A parameter that can sit before the trailing one.
fn middle_param_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        channel_strategy(),
        nickname_strategy(),
        prop::string::string_regex("[+\\-][a-zA-Z]{1,6}").expect("valid regex"),
    ]
}

/// Generate a valid Prefix
fn prefix_strategy() -> impl Strategy<Value = Prefix> {
    prop_oneof![
        // Server name (contains dot)
        prop::string::string_regex("[a-z]+\\.[a-z]+\\.[a-z]+")
            .expect("valid regex")
            .prop_map(Prefix::ServerName),
        // User prefix: nick!user@host
        (
            nickname_strategy(),
            username_strategy(),
            hostname_strategy()
        )
            .prop_map(|(nick, user, host)| Prefix::new(nick, user, host)),
    ]
}

/// Generate a complete valid Message
fn message_strategy() -> impl Strategy<Value = Message> {
    (
        prop::option::of(prefix_strategy()),
        command_strategy(),
        prop::collection::vec(middle_param_strategy(), 0..5),
        prop::option::of(message_text_strategy()),
    )
        .prop_map(|(prefix, command, mut params, trailing)| {
            params.extend(trailing);
            Message {
                prefix,
                command,
                params,
            }
        })
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// The fundamental roundtrip property: parse(serialize(m)) == m
    #[test]
    fn message_roundtrip(msg in message_strategy()) {
        let serialized = msg.to_string();
        let parsed: Message = serialized.parse()
            .expect("Serialized message should be parseable");
        prop_assert_eq!(&msg, &parsed,
            "Roundtrip failed for serialized: {}", serialized);
    }

    /// Prefix roundtrip: any valid prefix can be parsed and re-serialized
    #[test]
    fn prefix_roundtrip(prefix in prefix_strategy()) {
        let serialized = prefix.to_string();
        let parsed = Prefix::new_from_str(&serialized);
        prop_assert_eq!(&prefix, &parsed,
            "Prefix roundtrip failed for: {}", serialized);
    }

    /// PRIVMSG text is always written as a trailing parameter
    #[test]
    fn privmsg_forces_trailing(
        target in channel_strategy(),
        text in message_text_strategy()
    ) {
        let msg = Message::new("PRIVMSG", [target.clone(), text.clone()]);
        let serialized = msg.to_string();
        let expected = format!("PRIVMSG {} :{}\r\n", target, text);
        prop_assert_eq!(serialized, expected);
    }

    /// Parsing arbitrary text never panics
    #[test]
    fn parse_never_panics(input in "\\PC{0,600}") {
        let _ = input.parse::<Message>();
    }

    /// Nickname accessor extracts the nick from a full prefix
    #[test]
    fn source_nickname_extraction(
        nick in nickname_strategy(),
        user in username_strategy(),
        host in hostname_strategy()
    ) {
        let msg = Message::new("PING", ["test"])
            .with_prefix(Prefix::new(nick.clone(), user, host));
        prop_assert_eq!(msg.nick(), Some(nick.as_str()));
    }
}

// =============================================================================
// MODE PARSER PROPERTIES
// =============================================================================

proptest! {
    /// Without parameter-taking letters every letter becomes one change and
    /// no parameter is consumed.
    #[test]
    fn flag_modes_need_no_params(letters in "[imnpst]{1,8}", sign in "[+-]") {
        let policy = ParamModes::from_isupport(&Isupport::new());
        let changes = mode::parse(&format!("{}{}", sign, letters), &["extra"], Some(&policy))
            .expect("flag modes parse");
        prop_assert_eq!(changes.len(), letters.len());
        let direction = if sign == "+" { Direction::Add } else { Direction::Remove };
        prop_assert!(changes.iter().all(|c| c.direction == direction && c.param.is_none()));
    }

    /// Parsing arbitrary mode strings never panics
    #[test]
    fn mode_parse_never_panics(
        modes in "[+\\-a-zA-Z]{0,12}",
        params in prop::collection::vec("[a-z]{1,5}", 0..4)
    ) {
        let policy = ParamModes::from_isupport(&Isupport::new());
        let _ = mode::parse(&modes, &params, Some(&policy));
        let _ = mode::parse(&modes, &params, None);
    }
}
