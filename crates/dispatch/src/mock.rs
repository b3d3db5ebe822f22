//! An in-memory [`Platform`] recording everything sent through it

use parking_lot::Mutex;

use crate::{
    message::{parse_channel_mentions, InboundMessage, MessageRef, User},
    outbound::{DeleteError, Platform, SendError},
    prelude::*,
    response::Content,
};

/// Channel used by [`guild_message`]
pub const GUILD_CHANNEL: u64 = 100;
/// Guild used by [`guild_message`]
pub const GUILD: u64 = 200;
/// Channel used by [`direct_message`]
pub const DM_CHANNEL: u64 = 300;

/// A message posted through a [`MockPlatform`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    /// The channel it was posted to
    pub dest: ChannelId,
    /// Its current content
    pub content: Content,
    /// Its assigned ID
    pub id: MessageId,
}

impl Sent {
    /// Get a handle to this message
    #[must_use]
    pub fn handle(&self) -> MessageRef { MessageRef::new(self.dest, self.id) }
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    sent: Vec<Sent>,
    deleted: Vec<MessageRef>,
    typing: Vec<ChannelId>,
    admins: HashSet<(GuildId, UserId)>,
    fail_sends: bool,
    fail_typing: bool,
}

/// A recording [`Platform`] for tests
#[derive(Debug, Clone, Default)]
pub struct MockPlatform(Arc<Mutex<State>>);

impl MockPlatform {
    /// Every message posted so far, including any since deleted
    #[must_use]
    pub fn sent(&self) -> Vec<Sent> { self.0.lock().sent.clone() }

    /// The content of every message posted so far, as text where possible
    #[must_use]
    pub fn sent_text(&self) -> Vec<String> {
        self.0
            .lock()
            .sent
            .iter()
            .map(|s| match &s.content {
                Content::Text(t) => t.clone(),
                Content::Embed(e) => format!("{e:?}"),
            })
            .collect()
    }

    /// Every message deleted so far, in order
    #[must_use]
    pub fn deleted(&self) -> Vec<MessageRef> { self.0.lock().deleted.clone() }

    /// Every channel a typing indicator was shown in
    #[must_use]
    pub fn typing_calls(&self) -> Vec<ChannelId> { self.0.lock().typing.clone() }

    /// Grant a user the guild administrator permission
    pub fn grant_admin(&self, guild: impl Into<GuildId>, user: impl Into<UserId>) {
        self.0.lock().admins.insert((guild.into(), user.into()));
    }

    /// Make every subsequent send fail with a transport error
    pub fn fail_sends(&self, fail: bool) { self.0.lock().fail_sends = fail; }

    /// Make every subsequent typing indicator fail with a transport error
    pub fn fail_typing(&self, fail: bool) { self.0.lock().fail_typing = fail; }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn send(&self, dest: ChannelId, content: &Content) -> Result<MessageRef, SendError> {
        let mut state = self.0.lock();

        if state.fail_sends {
            return Err(anyhow::anyhow!("Request failed").into());
        }

        state.next_id += 1;
        let id = MessageId::new(10_000 + state.next_id);
        state.sent.push(Sent {
            dest,
            content: content.clone(),
            id,
        });

        Ok(MessageRef::new(dest, id))
    }

    async fn delete(&self, msg: MessageRef) -> Result<(), DeleteError> {
        let mut state = self.0.lock();

        if state.deleted.contains(&msg) {
            return Err(DeleteError::NotFound);
        }

        state.deleted.push(msg);
        Ok(())
    }

    async fn edit(&self, msg: MessageRef, content: &Content) -> Result<MessageRef, SendError> {
        let mut state = self.0.lock();

        if state.deleted.contains(&msg) {
            return Err(SendError::NotFound);
        }

        let sent = state
            .sent
            .iter_mut()
            .find(|s| s.handle() == msg)
            .ok_or(SendError::NotFound)?;
        sent.content = content.clone();

        Ok(msg)
    }

    async fn typing(&self, dest: ChannelId) -> Result<(), SendError> {
        let mut state = self.0.lock();

        if state.fail_typing {
            return Err(anyhow::anyhow!("Request failed").into());
        }

        state.typing.push(dest);
        Ok(())
    }

    async fn is_guild_admin(&self, guild: GuildId, user: UserId) -> anyhow::Result<bool> {
        Ok(self.0.lock().admins.contains(&(guild, user)))
    }
}

/// Construct a user with the given ID and name
#[must_use]
pub fn user(id: u64, name: &str) -> User { User::new(id, name) }

/// Construct a message sent by `author` in [`GUILD_CHANNEL`] of [`GUILD`]
#[must_use]
pub fn guild_message(author: User, content: &str) -> InboundMessage {
    InboundMessage {
        id: MessageId::new(900),
        channel_id: ChannelId::new(GUILD_CHANNEL),
        guild_id: Some(GuildId::new(GUILD)),
        author,
        content: content.into(),
        mentions: vec![],
        channel_mentions: parse_channel_mentions(content),
        attachments: vec![],
    }
}

/// Construct a direct message sent by `author`
#[must_use]
pub fn direct_message(author: User, content: &str) -> InboundMessage {
    InboundMessage {
        guild_id: None,
        channel_id: ChannelId::new(DM_CHANNEL),
        ..guild_message(author, content)
    }
}
