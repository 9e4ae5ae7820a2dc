//! Resynchronization snapshot.
//!
//! Rebuilds, from [`NetworkState`], the lines a client would have seen had
//! it been connected all along: welcome, ISUPPORT, own modes, away state,
//! and for every joined channel its JOIN, topic, NAMES and modes.

use crate::prefix::Prefix;
use crate::response::Response;
use crate::state::{Channel, NetworkState, User};
use crate::Message;

/// Upper bound on the bytes of names carried by one `353` line.
const NAMES_CHUNK_LEN: usize = 400;

/// Lines that bring a freshly attached session up to date.
///
/// `server` is the name used as the source of synthesized numerics.
pub fn snapshot(state: &NetworkState, server: &str) -> Vec<Message> {
    let nick = state.nick();
    let welcome = format!("Welcome to the Internet Relay Network {}", nick);
    let mut lines = vec![Response::RPL_WELCOME.reply(server, [nick, welcome.as_str()])];

    for line in state.isupport().to_lines() {
        let params = std::iter::once(nick)
            .chain(line.split(' '))
            .chain(std::iter::once("are supported by this server"));
        lines.push(Response::RPL_ISUPPORT.reply(server, params));
    }

    if !state.modes().is_empty() {
        lines.push(Response::RPL_UMODEIS.reply(server, [nick.to_owned(), state.mode_string()]));
    }
    if state.is_away() {
        lines.push(
            Response::RPL_NOWAWAY.reply(server, [nick, "You have been marked as being away"]),
        );
    }

    for channel in state.joined_channels() {
        channel_lines(state, channel, server, &mut lines);
    }
    lines
}

fn channel_lines(state: &NetworkState, channel: &Channel, server: &str, out: &mut Vec<Message>) {
    let nick = state.nick();
    let name = channel.name.as_str();

    out.push(
        Message::new("JOIN", [name]).with_prefix(Prefix::new(nick, state.user(), server)),
    );

    match &channel.topic {
        Some(topic) => {
            out.push(Response::RPL_TOPIC.reply(server, [nick, name, topic.content.as_str()]));
            if let (Some(who), Some(time)) = (&topic.who, &topic.time) {
                out.push(Response::RPL_TOPICWHOTIME.reply(server, [nick, name, who.as_str(), time.as_str()]));
            }
        }
        None => out.push(Response::rpl_notopic(server, nick, name)),
    }

    let kind = if channel.modes.contains_key(&'s') {
        "@"
    } else if channel.modes.contains_key(&'p') {
        "*"
    } else {
        "="
    };
    for names in names_chunks(state, channel) {
        out.push(Response::RPL_NAMREPLY.reply(server, [nick, kind, name, names.as_str()]));
    }
    out.push(Response::rpl_endofnames(server, nick, name));

    let (letters, params) = channel.mode_string();
    let params = [nick, name, letters.as_str()]
        .into_iter()
        .chain(params.iter().map(String::as_str));
    out.push(Response::RPL_CHANNELMODEIS.reply(server, params));
}

/// The member's highest-ranked status symbol followed by the nick.
fn decorated(state: &NetworkState, user: &User) -> String {
    let prefix = state.isupport().prefix();
    let symbol = prefix
        .modes()
        .find(|mode| user.modes.contains(mode))
        .and_then(|mode| prefix.symbol_for(mode));
    match symbol {
        Some(symbol) => format!("{}{}", symbol, user.nick),
        None => user.nick.clone(),
    }
}

fn names_chunks(state: &NetworkState, channel: &Channel) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for user in channel.users() {
        let entry = decorated(state, user);
        if !current.is_empty() && current.len() + 1 + entry.len() > NAMES_CHUNK_LEN {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&entry);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
