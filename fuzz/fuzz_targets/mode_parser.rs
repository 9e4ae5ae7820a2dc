//! Fuzz target for mode-string parsing
//!
//! The first line is the mode string, the rest are parameters.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_bouncer::mode::{self, ParamModes};
use slirc_bouncer::Isupport;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let mut lines = input.lines();
    let modes = lines.next().unwrap_or_default();
    let params: Vec<&str> = lines.collect();

    let mut isupport = Isupport::new();
    isupport.update(["PREFIX=(qaohv)~&@%+", "CHANMODES=beI,k,l,imnpst"]);
    let policy = ParamModes::from_isupport(&isupport);

    if let Ok(changes) = mode::parse(modes, &params, Some(&policy)) {
        assert!(changes.len() <= modes.chars().count());
    }
    let _ = mode::parse(modes, &params, None);
});
