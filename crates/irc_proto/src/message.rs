//! The `Message` ADT and its pattern-matching semantics.

use std::collections::HashMap;

use crate::icase::ICaseStr;

/// An IRCv3 tag value: a bare flag or a text value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Flag,
    Value(String),
}

impl Tag {
    /// Scalar match rule (§4.2): a flag only matches a flag, a value only
    /// matches an equal value.
    fn matches(&self, other: &Tag) -> bool {
        self == other
    }
}

/// The source of a message: either an opaque server name, or a fully
/// parsed `nick!user@host` hostmask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prefix {
    Server(ICaseStr),
    Hostmask {
        nick: ICaseStr,
        user: ICaseStr,
        host: ICaseStr,
    },
}

impl Prefix {
    /// A prefix parses into a hostmask only if it contains both `!` and
    /// `@`, split once each, left to right.
    pub fn parse(raw: &str) -> Prefix {
        if let Some(bang) = raw.find('!') {
            if let Some(at) = raw[bang..].find('@') {
                let at = bang + at;
                let nick = &raw[..bang];
                let user = &raw[bang + 1..at];
                let host = &raw[at + 1..];
                return Prefix::Hostmask {
                    nick: nick.into(),
                    user: user.into(),
                    host: host.into(),
                };
            }
        }
        Prefix::Server(raw.into())
    }

    pub fn as_str_repr(&self) -> String {
        match self {
            Prefix::Server(s) => s.as_str().to_string(),
            Prefix::Hostmask { nick, user, host } => {
                format!("{nick}!{user}@{host}")
            }
        }
    }
}

/// A message, or a pattern over messages when some fields are left empty.
///
/// Any field may be `None`/empty when this value is used as a pattern
/// passed to [`Message::matches`].
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub tags: HashMap<ICaseStr, Tag>,
    pub prefix: Option<Prefix>,
    pub verb: Option<ICaseStr>,
    pub args: Vec<ICaseStr>,
}

impl Message {
    pub fn new(verb: impl Into<ICaseStr>, args: Vec<ICaseStr>) -> Self {
        Message {
            tags: HashMap::new(),
            prefix: None,
            verb: Some(verb.into()),
            args,
        }
    }

    /// A pattern matching any verb at all (`Message::default()`).
    pub fn any() -> Self {
        Message::default()
    }

    /// A pattern matching a single verb, regardless of args/prefix/tags.
    pub fn for_verb(verb: impl Into<ICaseStr>) -> Self {
        Message {
            tags: HashMap::new(),
            prefix: None,
            verb: Some(verb.into()),
            args: Vec::new(),
        }
    }

    pub fn verb_str(&self) -> Option<&str> {
        self.verb.as_ref().map(ICaseStr::as_str)
    }

    pub fn arg(&self, i: usize) -> Option<&str> {
        self.args.get(i).map(ICaseStr::as_str)
    }

    /// Does this pattern (`self`) match the concrete message `other`?
    ///
    /// - Every tag in `self.tags` must be present in `other.tags` with a
    ///   matching value.
    /// - `self.args` must be a prefix-length subset: `len(self.args) <=
    ///   len(other.args)`, and every present arg must match positionally.
    /// - `self.prefix` and `self.verb` match `None` against anything, else
    ///   require case-folded equality.
    pub fn matches(&self, other: &Message) -> bool {
        for (key, pattern_tag) in &self.tags {
            match other.tags.get(key) {
                Some(actual_tag) if pattern_tag.matches(actual_tag) => {}
                _ => return false,
            }
        }

        if self.args.len() > other.args.len() {
            return false;
        }
        for (pattern_arg, actual_arg) in self.args.iter().zip(other.args.iter()) {
            if pattern_arg != actual_arg {
                return false;
            }
        }

        match (&self.prefix, &other.prefix) {
            (None, _) => {}
            (Some(p), Some(o)) if p == o => {}
            _ => return false,
        }

        match (&self.verb, &other.verb) {
            (None, _) => {}
            (Some(v), Some(o)) if v == o => {}
            _ => return false,
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(verb: &str, args: &[&str]) -> Message {
        Message::new(verb, args.iter().map(|a| ICaseStr::from(*a)).collect())
    }

    #[test]
    fn empty_pattern_matches_anything() {
        let pattern = Message::any();
        assert!(pattern.matches(&msg("PRIVMSG", &["#chan", "hi"])));
        assert!(pattern.matches(&msg("PING", &[])));
    }

    #[test]
    fn verb_pattern_matches_only_same_verb_case_folded() {
        let pattern = Message::for_verb("privmsg");
        assert!(pattern.matches(&msg("PRIVMSG", &["#chan", "hi"])));
        assert!(!pattern.matches(&msg("NOTICE", &["#chan", "hi"])));
    }

    #[test]
    fn arg_arity_rule_requires_at_least_k_args() {
        let mut pattern = Message::any();
        pattern.args = vec!["#chan".into()];
        assert!(pattern.matches(&msg("JOIN", &["#chan"])));
        assert!(pattern.matches(&msg("JOIN", &["#chan", "extra"])));
        assert!(!pattern.matches(&msg("JOIN", &[])));
    }

    #[test]
    fn prefix_hostmask_requires_both_bang_and_at() {
        assert_eq!(
            Prefix::parse("nick!user@host"),
            Prefix::Hostmask {
                nick: "nick".into(),
                user: "user".into(),
                host: "host".into(),
            }
        );
        assert_eq!(
            Prefix::parse("irc.fwilson.me"),
            Prefix::Server("irc.fwilson.me".into())
        );
        // only a `!`, no `@`: stays opaque
        assert_eq!(
            Prefix::parse("nick!onlybang"),
            Prefix::Server("nick!onlybang".into())
        );
    }
}
