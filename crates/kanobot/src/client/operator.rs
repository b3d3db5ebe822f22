//! Moderation and account actions beyond plain messaging

use kano_dispatch::{DeleteError, MessageRef, Platform, User};
use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};

use crate::prelude::*;

/// A message read back from channel history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: MessageId,
    pub author: User,
    pub pinned: bool,
}

/// A webhook created for relaying feed posts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Webhook {
    pub id: u64,
    pub url: String,
}

#[async_trait]
pub trait Operator: Platform {
    /// Read up to `limit` of the most recent messages in a channel, newest
    /// first
    async fn history(&self, channel: ChannelId, limit: usize) -> Result<Vec<HistoryEntry>>;

    async fn kick(&self, guild: GuildId, user: UserId) -> Result;

    async fn set_username(&self, name: &str) -> Result;

    async fn set_avatar(&self, image: Vec<u8>) -> Result;

    async fn channel_exists(&self, guild: GuildId, channel: ChannelId) -> Result<bool>;

    /// Create a category nobody but the bot can post in
    async fn create_category(&self, guild: GuildId, name: &str) -> Result<ChannelId>;

    async fn create_text_channel(
        &self,
        guild: GuildId,
        name: &str,
        category: ChannelId,
    ) -> Result<ChannelId>;

    async fn create_webhook(&self, channel: ChannelId, name: &str) -> Result<Webhook>;

    async fn delete_channel(&self, channel: ChannelId) -> Result;

    /// Delete messages one at a time, returning how many were removed
    async fn delete_many(&self, channel: ChannelId, ids: &[MessageId]) -> Result<usize> {
        let mut n = 0;

        for &id in ids {
            match self.delete(MessageRef::new(channel, id)).await {
                Ok(()) => n += 1,
                Err(DeleteError::NotFound) => (),
                Err(DeleteError::Forbidden) => bail!("Missing permission to delete messages"),
                Err(DeleteError::Http(e)) => return Err(e.context("Error deleting message")),
            }
        }

        Ok(n)
    }
}

#[cfg(test)]
pub mod mock {
    use kano_dispatch::{
        mock::MockPlatform, CannedReplies, CommandTable, Content, DispatchConfig, Dispatcher,
        Identity, SendError,
    };
    use parking_lot::Mutex;

    use super::*;
    use crate::client::commands::{self, CommandDeps};

    pub const BOT: u64 = 99;
    pub const OWNER: u64 = 1;

    #[derive(Debug, Default)]
    pub struct State {
        pub history: Vec<HistoryEntry>,
        pub kicked: Vec<(GuildId, UserId)>,
        pub username: Option<String>,
        pub avatar: Option<Vec<u8>>,
        pub fail_profile: bool,
        pub channels: Vec<(GuildId, String, Option<ChannelId>)>,
        pub deleted_channels: Vec<ChannelId>,
    }

    #[derive(Debug, Clone, Default)]
    pub struct MockOperator {
        pub platform: MockPlatform,
        pub state: Arc<Mutex<State>>,
    }

    #[async_trait]
    impl Platform for MockOperator {
        async fn send(&self, dest: ChannelId, content: &Content) -> Result<MessageRef, SendError> {
            self.platform.send(dest, content).await
        }

        async fn delete(&self, msg: MessageRef) -> Result<(), DeleteError> {
            self.platform.delete(msg).await
        }

        async fn edit(&self, msg: MessageRef, content: &Content) -> Result<MessageRef, SendError> {
            self.platform.edit(msg, content).await
        }

        async fn typing(&self, dest: ChannelId) -> Result<(), SendError> {
            self.platform.typing(dest).await
        }

        async fn is_guild_admin(&self, guild: GuildId, user: UserId) -> Result<bool> {
            self.platform.is_guild_admin(guild, user).await
        }
    }

    #[async_trait]
    impl Operator for MockOperator {
        async fn history(&self, _: ChannelId, limit: usize) -> Result<Vec<HistoryEntry>> {
            Ok(self.state.lock().history.iter().take(limit).cloned().collect())
        }

        async fn kick(&self, guild: GuildId, user: UserId) -> Result {
            self.state.lock().kicked.push((guild, user));
            Ok(())
        }

        async fn set_username(&self, name: &str) -> Result {
            let mut state = self.state.lock();
            ensure!(!state.fail_profile, "Rate limited");
            state.username = Some(name.into());
            Ok(())
        }

        async fn set_avatar(&self, image: Vec<u8>) -> Result {
            let mut state = self.state.lock();
            ensure!(!state.fail_profile, "Rate limited");
            state.avatar = Some(image);
            Ok(())
        }

        async fn channel_exists(&self, _: GuildId, channel: ChannelId) -> Result<bool> {
            let state = self.state.lock();
            Ok(usize::try_from(channel.get())
                .ok()
                .and_then(|i| i.checked_sub(1))
                .is_some_and(|i| i < state.channels.len())
                && !state.deleted_channels.contains(&channel))
        }

        async fn create_category(&self, guild: GuildId, name: &str) -> Result<ChannelId> {
            let mut state = self.state.lock();
            state.channels.push((guild, name.into(), None));
            Ok(ChannelId::new(state.channels.len() as u64))
        }

        async fn create_text_channel(
            &self,
            guild: GuildId,
            name: &str,
            category: ChannelId,
        ) -> Result<ChannelId> {
            let mut state = self.state.lock();
            state.channels.push((guild, name.into(), Some(category)));
            Ok(ChannelId::new(state.channels.len() as u64))
        }

        async fn create_webhook(&self, channel: ChannelId, name: &str) -> Result<Webhook> {
            Ok(Webhook {
                id: channel.get() + 5000,
                url: format!("https://example.invalid/webhooks/{channel}/{name}"),
            })
        }

        async fn delete_channel(&self, channel: ChannelId) -> Result {
            self.state.lock().deleted_channels.push(channel);
            Ok(())
        }
    }

    pub fn config() -> DispatchConfig {
        DispatchConfig {
            owner_id: Some(UserId::new(OWNER)),
            dev_ids: [UserId::new(OWNER)].into_iter().collect(),
            ..DispatchConfig::default()
        }
    }

    pub fn dispatcher(cfg: DispatchConfig, deps: &CommandDeps) -> Dispatcher<MockOperator> {
        Dispatcher::new(
            cfg,
            Identity {
                id: UserId::new(BOT),
                name: "kanobot".into(),
                avatar_url: None,
            },
            CommandTable::new(commands::list(deps)).unwrap(),
            CannedReplies::default(),
        )
    }
}
