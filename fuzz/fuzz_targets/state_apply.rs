//! Fuzz target for the state tracker
//!
//! Applies every line of the input to a fresh state; handlers may reject
//! lines but must never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_bouncer::state::NetworkState;
use slirc_bouncer::Message;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let mut state = NetworkState::new("me", "me", "Me");
    for line in input.lines().take(64) {
        if let Ok(msg) = line.parse::<Message>() {
            let _ = state.apply(&msg);
        }
    }
    let _ = state.joined_channels().count();
});
