use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::channel::{Channel, Topic, User};
use super::dispatch::Handler;
use super::{ConnectionState, StateAction};
use crate::error::StateError;
use crate::isupport::Isupport;
use crate::mode::{self, Direction, ParamModes};
use crate::prefix::Prefix;
use crate::Message;

type Applied = Result<Vec<StateAction>, StateError>;

/// Everything the upstream connection knows about its network.
///
/// Mutated only through [`NetworkState::apply`]; everyone else reads.
#[derive(Clone, Debug)]
pub struct NetworkState {
    nick: String,
    user: String,
    real: String,
    modes: BTreeSet<char>,
    away: bool,
    channels: BTreeMap<String, Channel>,
    isupport: Isupport,
    connection: ConnectionState,
    server: Option<String>,
}

impl NetworkState {
    /// Fresh state for a connection registering as `nick`.
    #[must_use]
    pub fn new(nick: impl Into<String>, user: impl Into<String>, real: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            user: user.into(),
            real: real.into(),
            modes: BTreeSet::new(),
            away: false,
            channels: BTreeMap::new(),
            isupport: Isupport::new(),
            connection: ConnectionState::Disconnected,
            server: None,
        }
    }

    /// Current nick; authoritative once 001 has been received.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn real(&self) -> &str {
        &self.real
    }

    /// Own user mode letters.
    pub fn modes(&self) -> &BTreeSet<char> {
        &self.modes
    }

    /// Own user modes as a `+iw` string.
    pub fn mode_string(&self) -> String {
        std::iter::once('+').chain(self.modes.iter().copied()).collect()
    }

    pub fn is_away(&self) -> bool {
        self.away
    }

    pub fn isupport(&self) -> &Isupport {
        &self.isupport
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub(crate) fn set_connection_state(&mut self, state: ConnectionState) {
        self.connection = state;
    }

    /// Name the server used as the source of 001, if registered.
    pub fn server_name(&self) -> Option<&str> {
        self.server.as_deref()
    }

    /// Fold a nick or channel name under the server's case mapping.
    pub fn fold(&self, name: &str) -> String {
        self.isupport.casemap().to_lower(name)
    }

    /// Whether `nick` is this connection's own nick.
    pub fn is_own_nick(&self, nick: &str) -> bool {
        self.isupport.casemap().eq(nick, &self.nick)
    }

    /// Look up a channel by name.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&self.fold(name))
    }

    /// Every channel ever seen, including ones since left.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Channels whose member list contains the own nick.
    pub fn joined_channels(&self) -> impl Iterator<Item = &Channel> {
        let me = self.fold(&self.nick);
        self.channels.values().filter(move |c| c.has_user(&me))
    }

    /// Apply one inbound message.
    ///
    /// A failed handler leaves the state exactly as it was.
    pub fn apply(&mut self, msg: &Message) -> Applied {
        match Handler::for_message(msg) {
            Handler::Welcome => self.on_welcome(msg),
            Handler::Isupport => self.on_isupport(msg),
            Handler::Unaway => self.set_away(false),
            Handler::NowAway => self.set_away(true),
            Handler::Names => self.on_names(msg),
            Handler::NoTopic => self.on_no_topic(msg),
            Handler::TopicContent => self.on_topic_content(msg),
            Handler::TopicWhoTime => self.on_topic_who_time(msg),
            Handler::Join => self.on_join(msg),
            Handler::Part => self.on_part(msg),
            Handler::Kick => self.on_kick(msg),
            Handler::Quit => self.on_quit(msg),
            Handler::Nick => self.on_nick(msg),
            Handler::Mode => self.on_mode(msg),
            Handler::Topic => self.on_topic(msg),
            Handler::Ping => Ok(vec![StateAction::Send(Box::new(Message::new(
                "PONG",
                msg.params.first().cloned(),
            )))]),
            Handler::Unhandled => Ok(vec![]),
        }
    }

    fn channel_mut(&mut self, name: &str) -> &mut Channel {
        let key = self.fold(name);
        self.channels
            .entry(key)
            .or_insert_with(|| Channel::new(name))
    }

    fn on_welcome(&mut self, msg: &Message) -> Applied {
        let nick = param(msg, 0)?;
        self.nick = nick.to_owned();
        self.server = msg.prefix.as_ref().map(ToString::to_string);
        self.connection = ConnectionState::Established;
        debug!(nick = %self.nick, "registered");
        Ok(vec![StateAction::Registered])
    }

    fn on_isupport(&mut self, msg: &Message) -> Applied {
        if msg.params.len() < 2 {
            return Err(missing(msg, 1));
        }
        self.isupport.update(&msg.params[1..msg.params.len() - 1]);
        Ok(vec![])
    }

    fn set_away(&mut self, away: bool) -> Applied {
        self.away = away;
        Ok(vec![])
    }

    fn on_names(&mut self, msg: &Message) -> Applied {
        let kind = param(msg, 1)?;
        let name = param(msg, 2)?;
        let names = msg.param(3).unwrap_or("");

        let members: Vec<(String, User)> = names
            .split_whitespace()
            .filter_map(|token| self.names_entry(token))
            .collect();

        let channel = self.channel_mut(name);
        match kind {
            "@" => {
                channel.modes.insert('s', None);
            }
            "*" => {
                channel.modes.insert('p', None);
            }
            _ => {}
        }
        for (key, member) in members {
            let user = channel
                .users
                .entry(key)
                .or_insert_with(|| User::new(member.nick.clone()));
            user.modes.extend(member.modes);
        }
        Ok(vec![])
    }

    /// Split a NAMES token into its folded key and a member carrying the
    /// status modes its symbols stand for.
    fn names_entry(&self, token: &str) -> Option<(String, User)> {
        let prefix = self.isupport.prefix();
        let bare = token.trim_start_matches(|c: char| prefix.mode_for(c).is_some());
        let nick = bare.split('!').next().unwrap_or(bare);
        if nick.is_empty() {
            return None;
        }

        let mut user = User::new(nick);
        user.modes = token[..token.len() - bare.len()]
            .chars()
            .filter_map(|c| prefix.mode_for(c))
            .collect();
        Some((self.fold(nick), user))
    }

    fn on_join(&mut self, msg: &Message) -> Applied {
        let nick = source(msg)?;
        let names = param(msg, 0)?;
        let key = self.fold(nick);
        for name in names.split(',').filter(|n| !n.is_empty()) {
            self.channel_mut(name)
                .users
                .entry(key.clone())
                .or_insert_with(|| User::new(nick));
        }
        Ok(vec![])
    }

    fn on_part(&mut self, msg: &Message) -> Applied {
        let nick = source(msg)?;
        let names = param(msg, 0)?;
        let key = self.fold(nick);
        for name in names.split(',').filter(|n| !n.is_empty()) {
            self.channel_mut(name).users.remove(&key);
        }
        Ok(vec![])
    }

    fn on_kick(&mut self, msg: &Message) -> Applied {
        let names = param(msg, 0)?;
        let keys: Vec<String> = param(msg, 1)?.split(',').map(|n| self.fold(n)).collect();
        for name in names.split(',').filter(|n| !n.is_empty()) {
            let channel = self.channel_mut(name);
            for key in &keys {
                channel.users.remove(key);
            }
        }
        Ok(vec![])
    }

    fn on_quit(&mut self, msg: &Message) -> Applied {
        let key = self.fold(source(msg)?);
        for channel in self.channels.values_mut() {
            channel.users.remove(&key);
        }
        Ok(vec![])
    }

    fn on_nick(&mut self, msg: &Message) -> Applied {
        let old = source(msg)?;
        let new = param(msg, 0)?;

        if self.is_own_nick(old) {
            self.nick = new.to_owned();
        }

        let old_key = self.fold(old);
        let new_key = self.fold(new);
        for channel in self.channels.values_mut() {
            if let Some(mut user) = channel.users.remove(&old_key) {
                user.nick = new.to_owned();
                channel.users.insert(new_key.clone(), user);
            }
        }
        Ok(vec![])
    }

    fn on_mode(&mut self, msg: &Message) -> Applied {
        let target = param(msg, 0)?;
        let modes = param(msg, 1)?;

        if self.isupport.is_channel(target) {
            let policy = ParamModes::from_isupport(&self.isupport);
            let changes = mode::parse(modes, &msg.params[2..], Some(&policy))?;

            let folded: Vec<Option<String>> = changes
                .iter()
                .map(|c| c.param.as_deref().map(|p| self.fold(p)))
                .collect();
            let channel = self.channel_mut(target);

            for (change, key) in changes.into_iter().zip(folded) {
                if policy.is_prefix_mode(change.mode) {
                    let (Some(nick), Some(key)) = (change.param, key) else {
                        continue;
                    };
                    match change.direction {
                        Direction::Add => {
                            channel
                                .users
                                .entry(key)
                                .or_insert_with(|| User::new(nick))
                                .modes
                                .insert(change.mode);
                        }
                        Direction::Remove => {
                            if let Some(user) = channel.users.get_mut(&key) {
                                user.modes.remove(&change.mode);
                            }
                        }
                    }
                } else if policy.is_list_mode(change.mode) {
                    continue;
                } else {
                    match change.direction {
                        Direction::Add => {
                            channel.modes.insert(change.mode, change.param);
                        }
                        Direction::Remove => {
                            channel.modes.remove(&change.mode);
                        }
                    }
                }
            }
        } else if self.is_own_nick(target) {
            let no_params: &[&str] = &[];
            for change in mode::parse(modes, no_params, None)? {
                match change.direction {
                    Direction::Add => self.modes.insert(change.mode),
                    Direction::Remove => self.modes.remove(&change.mode),
                };
            }
        }
        Ok(vec![])
    }

    fn on_topic(&mut self, msg: &Message) -> Applied {
        let name = param(msg, 0)?;
        let content = msg.param(1).unwrap_or("");
        let who = msg.prefix.as_ref().map(Prefix::to_string);

        let channel = self.channel_mut(name);
        if !content.is_empty() {
            channel.topic = Some(Topic {
                content: content.to_owned(),
                who,
                time: Some(chrono::Utc::now().timestamp().to_string()),
            });
        }
        Ok(vec![])
    }

    fn on_no_topic(&mut self, msg: &Message) -> Applied {
        let name = param(msg, 1)?;
        self.channel_mut(name).topic = None;
        Ok(vec![])
    }

    fn on_topic_content(&mut self, msg: &Message) -> Applied {
        let name = param(msg, 1)?;
        let content = param(msg, 2)?;
        self.channel_mut(name)
            .topic
            .get_or_insert_with(Topic::default)
            .content = content.to_owned();
        Ok(vec![])
    }

    fn on_topic_who_time(&mut self, msg: &Message) -> Applied {
        let name = param(msg, 1)?;
        let who = param(msg, 2)?;
        let time = param(msg, 3)?;
        let topic = self
            .channel_mut(name)
            .topic
            .get_or_insert_with(Topic::default);
        topic.who = Some(who.to_owned());
        topic.time = Some(time.to_owned());
        Ok(vec![])
    }
}

fn missing(msg: &Message, index: usize) -> StateError {
    StateError::MissingParameter {
        command: msg.command.clone(),
        index,
    }
}

fn param(msg: &Message, index: usize) -> Result<&str, StateError> {
    msg.param(index).ok_or_else(|| missing(msg, index))
}

fn source(msg: &Message) -> Result<&str, StateError> {
    msg.prefix
        .as_ref()
        .and_then(Prefix::nick)
        .ok_or_else(|| StateError::MissingPrefix(msg.command.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModeParseError;

    fn state() -> NetworkState {
        let mut state = NetworkState::new("me", "me", "Me");
        feed(&mut state, ":irc.test 001 me :Welcome");
        state
    }

    fn feed(state: &mut NetworkState, line: &str) -> Vec<StateAction> {
        let msg = Message::parse(line).unwrap();
        state.apply(&msg).unwrap()
    }

    fn modes(user: &User) -> String {
        user.modes.iter().collect()
    }

    #[test]
    fn test_welcome_sets_nick_and_registers() {
        let mut state = NetworkState::new("wanted", "u", "Real");
        let actions = feed(&mut state, ":irc.test 001 wanted_ :Welcome");
        assert_eq!(actions, vec![StateAction::Registered]);
        assert_eq!(state.nick(), "wanted_");
        assert_eq!(state.server_name(), Some("irc.test"));
        assert_eq!(state.connection_state(), ConnectionState::Established);
    }

    #[test]
    fn test_isupport_excludes_human_suffix() {
        let mut state = state();
        feed(
            &mut state,
            ":irc.test 005 me PREFIX=(qo)~@ CHANTYPES=# :are supported by this server",
        );
        assert_eq!(state.isupport().prefix().symbol_for('q'), Some('~'));
        assert_eq!(state.isupport().get("are supported by this server"), None);
        assert!(!state.isupport().is_channel("&x"));
    }

    #[test]
    fn test_names_reply_resolves_prefixes() {
        let mut state = state();
        feed(&mut state, ":irc.test 353 me = #chan :@alice +bob carol");

        let channel = state.channel("#chan").unwrap();
        assert_eq!(channel.user_count(), 3);
        assert_eq!(modes(channel.user("alice").unwrap()), "o");
        assert_eq!(modes(channel.user("bob").unwrap()), "v");
        assert_eq!(modes(channel.user("carol").unwrap()), "");
        assert!(channel.modes.is_empty());
    }

    #[test]
    fn test_names_type_sets_channel_flags() {
        let mut state = state();
        feed(&mut state, ":irc.test 353 me @ #secret :me");
        feed(&mut state, ":irc.test 353 me * #private :me");
        assert!(state.channel("#secret").unwrap().modes.contains_key(&'s'));
        assert!(state.channel("#private").unwrap().modes.contains_key(&'p'));
    }

    #[test]
    fn test_names_multi_prefix_and_userhost() {
        let mut state = state();
        feed(&mut state, ":irc.test 353 me = #chan :@+dave!d@host");
        let channel = state.channel("#chan").unwrap();
        let dave = channel.user("dave").unwrap();
        assert_eq!(dave.nick, "dave");
        assert_eq!(modes(dave), "ov");
    }

    #[test]
    fn test_join_part_kick_quit() {
        let mut state = state();
        feed(&mut state, ":me!u@h JOIN #a");
        feed(&mut state, ":bob!u@h JOIN #a");
        feed(&mut state, ":bob!u@h JOIN #b");
        feed(&mut state, ":carol!u@h JOIN #a");
        assert_eq!(state.channel("#a").unwrap().user_count(), 3);

        feed(&mut state, ":carol!u@h PART #a :bye");
        assert!(!state.channel("#a").unwrap().has_user("carol"));

        feed(&mut state, ":me!u@h KICK #a,#b bob :out");
        assert!(!state.channel("#a").unwrap().has_user("bob"));
        assert!(!state.channel("#b").unwrap().has_user("bob"));

        feed(&mut state, ":bob!u@h JOIN #b");
        feed(&mut state, ":bob!u@h QUIT :gone");
        assert!(state.channels().all(|c| !c.has_user("bob")));
        assert_eq!(state.channels().count(), 2);
    }

    #[test]
    fn test_channel_names_fold_case() {
        let mut state = state();
        feed(&mut state, ":me!u@h JOIN #Rust");
        feed(&mut state, ":irc.test 353 me = #rust :@me");
        assert_eq!(state.channels().count(), 1);
        assert_eq!(state.channel("#RUST").unwrap().name, "#Rust");
    }

    #[test]
    fn test_nick_change_moves_member_and_keeps_modes() {
        let mut state = state();
        feed(&mut state, ":irc.test 353 me = #a :@old me");
        feed(&mut state, ":irc.test 353 me = #b :+old");
        feed(&mut state, ":old!u@h NICK new");

        let a = state.channel("#a").unwrap();
        assert!(!a.has_user("old"));
        assert_eq!(a.user("new").unwrap().nick, "new");
        assert_eq!(modes(a.user("new").unwrap()), "o");
        assert_eq!(modes(state.channel("#b").unwrap().user("new").unwrap()), "v");
        assert_eq!(state.nick(), "me");
    }

    #[test]
    fn test_own_nick_change() {
        let mut state = state();
        feed(&mut state, ":me!u@h JOIN #a");
        feed(&mut state, ":ME!u@h NICK me2");
        assert_eq!(state.nick(), "me2");
        assert_eq!(state.joined_channels().count(), 1);
    }

    #[test]
    fn test_mode_prefix_letters_and_flags() {
        let mut state = state();
        feed(&mut state, ":irc.test 005 me PREFIX=(o)@ :are supported");
        feed(&mut state, ":irc.test 353 me = #a :alice bob");
        feed(&mut state, ":op!u@h MODE #a +o-v alice bob");

        let channel = state.channel("#a").unwrap();
        assert_eq!(modes(channel.user("alice").unwrap()), "o");
        assert_eq!(modes(channel.user("bob").unwrap()), "");
        assert!(channel.modes.is_empty());
    }

    #[test]
    fn test_mode_channel_params() {
        let mut state = state();
        feed(&mut state, ":op!u@h MODE #a +ntlk 10 key");
        let channel = state.channel("#a").unwrap();
        assert_eq!(channel.modes.get(&'l'), Some(&Some("10".to_string())));
        assert_eq!(channel.modes.get(&'k'), Some(&Some("key".to_string())));
        assert_eq!(channel.modes.get(&'n'), Some(&None));

        feed(&mut state, ":op!u@h MODE #a -lk key");
        let channel = state.channel("#a").unwrap();
        assert!(!channel.modes.contains_key(&'l'));
        assert!(!channel.modes.contains_key(&'k'));
    }

    #[test]
    fn test_mode_list_letters_are_not_stored() {
        let mut state = state();
        feed(&mut state, ":op!u@h MODE #a +b *!*@spam");
        assert!(state.channel("#a").unwrap().modes.is_empty());
    }

    #[test]
    fn test_malformed_mode_leaves_state_untouched() {
        let mut state = state();
        feed(&mut state, ":irc.test 353 me = #a :alice");
        let before = state.channel("#a").cloned();

        let msg = Message::parse(":op!u@h MODE #a +nto").unwrap();
        let err = state.apply(&msg).unwrap_err();
        assert_eq!(
            err,
            StateError::MalformedMode(ModeParseError::MissingParameter {
                mode: 'o',
                direction: Direction::Add,
            })
        );
        assert_eq!(state.channel("#a").cloned(), before);
    }

    #[test]
    fn test_user_modes_only_for_own_nick() {
        let mut state = state();
        feed(&mut state, ":me MODE me :+iw");
        feed(&mut state, ":me MODE me -w");
        feed(&mut state, ":other MODE other +x");
        assert_eq!(state.mode_string(), "+i");
    }

    #[test]
    fn test_topic_flow() {
        let mut state = state();
        feed(&mut state, ":irc.test 332 me #a :hello world");
        feed(&mut state, ":irc.test 333 me #a alice 1700000000");
        let topic = state.channel("#a").unwrap().topic.clone().unwrap();
        assert_eq!(topic.content, "hello world");
        assert_eq!(topic.who.as_deref(), Some("alice"));
        assert_eq!(topic.time.as_deref(), Some("1700000000"));

        feed(&mut state, ":bob!b@h TOPIC #a :new topic");
        let topic = state.channel("#a").unwrap().topic.clone().unwrap();
        assert_eq!(topic.content, "new topic");
        assert_eq!(topic.who.as_deref(), Some("bob!b@h"));
        assert!(topic.time.unwrap().parse::<i64>().is_ok());

        feed(&mut state, ":bob!b@h TOPIC #a :");
        assert!(state.channel("#a").unwrap().topic.is_some());

        feed(&mut state, ":irc.test 331 me #a :No topic is set");
        assert!(state.channel("#a").unwrap().topic.is_none());
    }

    #[test]
    fn test_away_numerics() {
        let mut state = state();
        feed(&mut state, ":irc.test 306 me :You have been marked as away");
        assert!(state.is_away());
        feed(&mut state, ":irc.test 305 me :You are no longer marked as away");
        assert!(!state.is_away());
    }

    #[test]
    fn test_ping_replies_with_same_token() {
        let mut state = state();
        let actions = feed(&mut state, "PING :token123");
        assert_eq!(
            actions,
            vec![StateAction::Send(Box::new(Message::new("PONG", ["token123"])))]
        );
    }

    #[test]
    fn test_missing_prefix_is_contained() {
        let mut state = state();
        let msg = Message::parse("JOIN #a").unwrap();
        assert_eq!(
            state.apply(&msg),
            Err(StateError::MissingPrefix("JOIN".into()))
        );
        assert_eq!(state.channels().count(), 0);
    }
}
