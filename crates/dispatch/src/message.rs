//! Inbound message data and handles to sent messages

use serenity::model::mention::{Mention, Mentionable};

use crate::prelude::*;

/// A user referenced by an inbound message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    /// The user's ID
    pub id: UserId,
    /// The user's display name
    pub name: String,
    /// Whether this user is a bot account
    pub bot: bool,
}

impl User {
    /// Construct a new non-bot user
    #[inline]
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bot: false,
        }
    }

    /// Get a mention of this user, displayed as `<@id>`
    #[inline]
    #[must_use]
    pub fn mention(&self) -> Mention { self.id.mention() }
}

/// A handle to a message, sufficient to edit or delete it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    /// The channel the message was sent in
    pub channel_id: ChannelId,
    /// The ID of the message
    pub message_id: MessageId,
}

impl MessageRef {
    /// Construct a new message handle
    #[inline]
    pub fn new(channel_id: impl Into<ChannelId>, message_id: impl Into<MessageId>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        }
    }
}

/// A text message received from the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// The ID of this message
    pub id: MessageId,
    /// The channel this message was sent in
    pub channel_id: ChannelId,
    /// The guild this message was sent in, or `None` for direct messages
    pub guild_id: Option<GuildId>,
    /// The author of this message
    pub author: User,
    /// The raw text of this message
    pub content: String,
    /// Users mentioned by this message
    pub mentions: Vec<User>,
    /// Channels mentioned by this message
    pub channel_mentions: Vec<ChannelId>,
    /// URLs of any files attached to this message
    pub attachments: Vec<String>,
}

impl InboundMessage {
    /// Get a handle to this message
    #[inline]
    #[must_use]
    pub fn handle(&self) -> MessageRef {
        MessageRef {
            channel_id: self.channel_id,
            message_id: self.id,
        }
    }

    /// Returns true if this message was sent outside of a guild
    #[inline]
    #[must_use]
    pub fn is_direct(&self) -> bool { self.guild_id.is_none() }
}

/// Scan message text for channel mentions of the form `<#id>`
#[must_use]
pub fn parse_channel_mentions(content: &str) -> Vec<ChannelId> {
    let mut ret = vec![];
    let mut rest = content;

    while let Some(start) = rest.find("<#") {
        rest = &rest[start + 2..];
        let Some(end) = rest.find('>') else { break };

        match rest[..end].parse::<u64>() {
            Ok(id) if id != 0 => {
                ret.push(ChannelId::new(id));
                rest = &rest[end + 1..];
            },
            _ => (),
        }
    }

    ret
}
