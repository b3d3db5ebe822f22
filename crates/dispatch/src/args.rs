//! Binding raw command tokens to a handler's declared parameters

use crate::{message::InboundMessage, message::User, prelude::*};

/// Values injected from the inbound message rather than parsed from tokens
///
/// A parameter declared with one of these names is always bound from
/// context, whatever kind it was declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContextKey {
    /// The inbound message itself
    Message,
    /// The channel the message was sent in
    Channel,
    /// The guild the message was sent in, if any
    Guild,
    /// The message author
    Author,
    /// Users mentioned by the message
    UserMentions,
    /// Channels mentioned by the message
    ChannelMentions,
    /// Every token following the command name, untouched by binding
    LeftoverArgs,
}

impl ContextKey {
    /// Every context key, in injection order
    pub const ALL: [Self; 7] = [
        Self::Message,
        Self::Channel,
        Self::Guild,
        Self::Author,
        Self::UserMentions,
        Self::ChannelMentions,
        Self::LeftoverArgs,
    ];

    /// The reserved parameter name for this key
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Channel => "channel",
            Self::Guild => "guild",
            Self::Author => "author",
            Self::UserMentions => "user_mentions",
            Self::ChannelMentions => "channel_mentions",
            Self::LeftoverArgs => "leftover_args",
        }
    }

    /// Look up the key reserving the given parameter name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> { Self::ALL.into_iter().find(|k| k.name() == name) }
}

/// How a parameter receives its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Injected from the inbound message
    Context(ContextKey),
    /// The next token, which must be present
    Required,
    /// The next token if any remain, with a default shown in usage text
    Optional(Option<&'static str>),
    /// Every remaining token, as a list
    Variadic,
    /// Every remaining token, joined with single spaces
    Greedy,
}

/// A single declared handler parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Param {
    name: &'static str,
    kind: ParamKind,
}

impl Param {
    /// Declare a parameter
    ///
    /// Reserved context names are always coerced to [`ParamKind::Context`].
    #[must_use]
    pub fn new(name: &'static str, kind: ParamKind) -> Self {
        let kind = ContextKey::from_name(name).map_or(kind, ParamKind::Context);
        Self { name, kind }
    }

    /// Declare a required positional parameter
    #[inline]
    #[must_use]
    pub fn required(name: &'static str) -> Self { Self::new(name, ParamKind::Required) }

    /// Declare an optional positional parameter
    #[inline]
    #[must_use]
    pub fn optional(name: &'static str, default: Option<&'static str>) -> Self {
        Self::new(name, ParamKind::Optional(default))
    }

    /// Declare a parameter capturing all remaining tokens
    #[inline]
    #[must_use]
    pub fn variadic(name: &'static str) -> Self { Self::new(name, ParamKind::Variadic) }

    /// Declare a parameter capturing all remaining tokens as one string
    #[inline]
    #[must_use]
    pub fn greedy(name: &'static str) -> Self { Self::new(name, ParamKind::Greedy) }

    /// Declare a context-injected parameter
    #[inline]
    #[must_use]
    pub fn context(key: ContextKey) -> Self {
        Self {
            name: key.name(),
            kind: ParamKind::Context(key),
        }
    }

    /// The name of this parameter
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str { self.name }

    /// How this parameter receives its value
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ParamKind { self.kind }

    /// The fragment of auto-generated usage text for this parameter, if it
    /// is positional
    #[must_use]
    pub fn usage(&self) -> Option<String> {
        match self.kind {
            ParamKind::Required => Some(self.name.into()),
            ParamKind::Optional(Some(d)) => Some(format!("[{}={d}]", self.name)),
            ParamKind::Optional(None) => Some(format!("[{}]", self.name)),
            ParamKind::Context(_) | ParamKind::Variadic | ParamKind::Greedy => None,
        }
    }
}

/// A context value resolved from the inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextValue {
    /// See [`ContextKey::Message`]
    Message(Box<InboundMessage>),
    /// See [`ContextKey::Channel`]
    Channel(ChannelId),
    /// See [`ContextKey::Guild`]
    Guild(Option<GuildId>),
    /// See [`ContextKey::Author`]
    Author(User),
    /// See [`ContextKey::UserMentions`]
    UserMentions(Vec<User>),
    /// See [`ContextKey::ChannelMentions`]
    ChannelMentions(Vec<ChannelId>),
    /// See [`ContextKey::LeftoverArgs`]
    LeftoverArgs(Vec<String>),
}

impl ContextValue {
    fn resolve(key: ContextKey, msg: Option<&InboundMessage>, tokens: &[String]) -> Option<Self> {
        Some(match key {
            ContextKey::Message => Self::Message(Box::new(msg?.clone())),
            ContextKey::Channel => Self::Channel(msg?.channel_id),
            ContextKey::Guild => Self::Guild(msg?.guild_id),
            ContextKey::Author => Self::Author(msg?.author.clone()),
            ContextKey::UserMentions => {
                Self::UserMentions(msg.map(|m| m.mentions.clone()).unwrap_or_default())
            },
            ContextKey::ChannelMentions => Self::ChannelMentions(
                msg.map(|m| m.channel_mentions.clone())
                    .unwrap_or_default(),
            ),
            ContextKey::LeftoverArgs => Self::LeftoverArgs(tokens.to_vec()),
        })
    }
}

/// A bound argument value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A single positional token
    Token(String),
    /// A variadic capture
    Tokens(Vec<String>),
    /// A greedy capture
    Joined(String),
    /// A context-injected value
    Context(ContextValue),
}

/// Binding failed because positional parameters were left unsatisfied
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Missing arguments: {}", .missing.join(", "))]
pub struct UsageMismatch {
    /// The names of the unsatisfied parameters
    pub missing: Vec<&'static str>,
}

/// The arguments bound for a single command invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args(BTreeMap<&'static str, Value>);

impl Args {
    /// Get a bound value by parameter name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> { self.0.get(name) }

    /// Returns true if a value was bound for the given parameter
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool { self.0.contains_key(name) }

    /// Get a positional or greedy argument as a string
    #[must_use]
    pub fn str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            Value::Token(s) | Value::Joined(s) => Some(s.as_str()),
            Value::Tokens(_) | Value::Context(_) => None,
        }
    }

    /// Get a variadic argument
    #[must_use]
    pub fn tokens(&self, name: &str) -> Option<&[String]> {
        match self.get(name)? {
            Value::Tokens(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    fn context(&self, key: ContextKey) -> Option<&ContextValue> {
        match self.get(key.name())? {
            Value::Context(c) => Some(c),
            _ => None,
        }
    }

    /// The inbound message, if declared and available
    #[must_use]
    pub fn message(&self) -> Option<&InboundMessage> {
        match self.context(ContextKey::Message)? {
            ContextValue::Message(m) => Some(m.as_ref()),
            _ => None,
        }
    }

    /// The channel the message was sent in, if declared and available
    #[must_use]
    pub fn channel(&self) -> Option<ChannelId> {
        match self.context(ContextKey::Channel)? {
            ContextValue::Channel(c) => Some(*c),
            _ => None,
        }
    }

    /// The guild the message was sent in, if declared and sent in a guild
    #[must_use]
    pub fn guild(&self) -> Option<GuildId> {
        match self.context(ContextKey::Guild)? {
            ContextValue::Guild(g) => *g,
            _ => None,
        }
    }

    /// The message author, if declared and available
    #[must_use]
    pub fn author(&self) -> Option<&User> {
        match self.context(ContextKey::Author)? {
            ContextValue::Author(u) => Some(u),
            _ => None,
        }
    }

    /// Users mentioned by the message, or nothing if not declared
    #[must_use]
    pub fn user_mentions(&self) -> &[User] {
        match self.context(ContextKey::UserMentions) {
            Some(ContextValue::UserMentions(v)) => v.as_slice(),
            _ => &[],
        }
    }

    /// Channels mentioned by the message, or nothing if not declared
    #[must_use]
    pub fn channel_mentions(&self) -> &[ChannelId] {
        match self.context(ContextKey::ChannelMentions) {
            Some(ContextValue::ChannelMentions(v)) => v.as_slice(),
            _ => &[],
        }
    }

    /// Every token following the command name, or nothing if not declared
    #[must_use]
    pub fn leftover_args(&self) -> &[String] {
        match self.context(ContextKey::LeftoverArgs) {
            Some(ContextValue::LeftoverArgs(v)) => v.as_slice(),
            _ => &[],
        }
    }
}

/// Split command text into tokens
///
/// Quotes group words in the usual shell manner.  Text with unbalanced quotes
/// falls back to plain whitespace splitting.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    shell_words::split(text).unwrap_or_else(|e| {
        trace!(%e, "Falling back to whitespace tokenization");
        text.split_whitespace().map(Into::into).collect()
    })
}

/// Bind tokens to the given parameter list
///
/// Context parameters are resolved from `msg` and never consume tokens.
/// Positional parameters consume tokens in declaration order, and any tokens
/// left over once every parameter is bound are dropped.
///
/// Every greedy parameter receives the same joined text, even though the
/// first one consumes the tokens it joins.
///
/// # Errors
/// This function returns an error if any required parameter had no token
/// left to bind.
pub fn bind(
    params: &[Param],
    msg: Option<&InboundMessage>,
    tokens: &[String],
) -> Result<Args, UsageMismatch> {
    let mut args = BTreeMap::new();
    let mut missing = vec![];
    let mut rest = tokens;
    let mut joined: Option<String> = None;

    for param in params {
        let value = match param.kind {
            ParamKind::Context(key) => {
                ContextValue::resolve(key, msg, tokens).map(Value::Context)
            },
            ParamKind::Variadic => Some(Value::Tokens(std::mem::take(&mut rest).to_vec())),
            ParamKind::Greedy => {
                let s = joined.get_or_insert_with(|| std::mem::take(&mut rest).join(" "));
                Some(Value::Joined(s.clone()))
            },
            ParamKind::Optional(_) | ParamKind::Required => {
                if let Some((head, tail)) = rest.split_first() {
                    rest = tail;
                    Some(Value::Token(head.clone()))
                } else {
                    if param.kind == ParamKind::Required {
                        missing.push(param.name);
                    }
                    None
                }
            },
        };

        if let Some(value) = value {
            args.insert(param.name, value);
        }
    }

    if missing.is_empty() {
        Ok(Args(args))
    } else {
        Err(UsageMismatch { missing })
    }
}
