//! Fuzz target for IRC message parsing
//!
//! Feeds arbitrary bytes through the charset decoder and the parser, and
//! checks that anything that parses also survives a serialize/parse cycle.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_bouncer::{IrcCodec, Message};

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 {
        return;
    }

    // Lossy decoding must never panic, whatever the charset.
    let shift_jis = slirc_bouncer::line::resolve_encoding("shift_jis").ok().flatten();
    let _ = Message::decode(data, shift_jis);

    if let Ok(input) = std::str::from_utf8(data) {
        let _ = IrcCodec::sanitize(input.to_string());

        if let Ok(msg) = input.parse::<Message>() {
            let serialized = msg.to_string();
            let _ = serialized.parse::<Message>();
        }
    }
});
