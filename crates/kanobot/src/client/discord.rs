//! The Discord side of [`Platform`] and [`Operator`], on top of Serenity

use kano_dispatch::{
    message::parse_channel_mentions, Content, DeleteError, Embed, InboundMessage, MessageRef,
    Platform, SendError, User,
};
use serenity::{
    builder::{
        CreateAttachment, CreateChannel, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter,
        CreateMessage, CreateWebhook, EditMessage, EditProfile, GetMessages,
    },
    client::Context,
    model::{
        channel::{ChannelType, Message, PermissionOverwrite, PermissionOverwriteType},
        id::{ChannelId, GuildId, MessageId, RoleId, UserId},
        permissions::Permissions,
        Timestamp,
    },
};

use super::operator::{HistoryEntry, Operator, Webhook};
use crate::prelude::*;

const HISTORY_PAGE: usize = 100;

fn status(err: &serenity::Error) -> Option<u16> {
    match err {
        serenity::Error::Http(e) => e.status_code().map(|s| s.as_u16()),
        _ => None,
    }
}

fn send_error(err: serenity::Error) -> SendError {
    match status(&err) {
        Some(403) => SendError::Forbidden,
        Some(404) => SendError::NotFound,
        _ => SendError::Http(err.into()),
    }
}

fn delete_error(err: serenity::Error) -> DeleteError {
    match status(&err) {
        Some(403) => DeleteError::Forbidden,
        Some(404) => DeleteError::NotFound,
        _ => DeleteError::Http(err.into()),
    }
}

pub fn user(u: &serenity::model::user::User) -> User {
    User {
        id: u.id,
        name: u.name.clone(),
        bot: u.bot,
    }
}

/// Strip a gateway message down to what the dispatcher needs
pub fn inbound(msg: &Message) -> InboundMessage {
    InboundMessage {
        id: msg.id,
        channel_id: msg.channel_id,
        guild_id: msg.guild_id,
        author: user(&msg.author),
        content: msg.content.clone(),
        mentions: msg.mentions.iter().map(user).collect(),
        channel_mentions: parse_channel_mentions(&msg.content),
        attachments: msg.attachments.iter().map(|a| a.url.clone()).collect(),
    }
}

fn embed(e: &Embed) -> CreateEmbed {
    let mut b = CreateEmbed::new();

    if let Some(ref title) = e.title {
        b = b.title(title);
    }

    if let Some(ref desc) = e.description {
        b = b.description(desc);
    }

    for f in &e.fields {
        b = b.field(&f.name, &f.value, f.inline);
    }

    if let Some(ref footer) = e.footer {
        let mut f = CreateEmbedFooter::new(&footer.text);
        if let Some(ref url) = footer.icon_url {
            f = f.icon_url(url);
        }
        b = b.footer(f);
    }

    if let Some(ref author) = e.author {
        let mut a = CreateEmbedAuthor::new(&author.name);
        if let Some(ref url) = author.icon_url {
            a = a.icon_url(url);
        }
        b = b.author(a);
    }

    if let Some(ts) = e
        .timestamp
        .and_then(|t| Timestamp::from_unix_timestamp(t.timestamp()).ok())
    {
        b = b.timestamp(ts);
    }

    if let Some(colour) = e.colour {
        b = b.colour(colour);
    }

    b
}

/// Serenity's [`Context`] as a message platform
#[derive(Debug, Clone)]
pub struct Discord(pub Context);

#[async_trait]
impl Platform for Discord {
    async fn send(&self, dest: ChannelId, content: &Content) -> Result<MessageRef, SendError> {
        let msg = match content {
            Content::Text(s) => CreateMessage::new().content(s),
            Content::Embed(e) => CreateMessage::new().embed(embed(e)),
        };

        let sent = dest.send_message(&self.0, msg).await.map_err(send_error)?;
        Ok(MessageRef::new(sent.channel_id, sent.id))
    }

    async fn delete(&self, msg: MessageRef) -> Result<(), DeleteError> {
        msg.channel_id
            .delete_message(&self.0, msg.message_id)
            .await
            .map_err(delete_error)
    }

    async fn edit(&self, msg: MessageRef, content: &Content) -> Result<MessageRef, SendError> {
        let edit = match content {
            Content::Text(s) => EditMessage::new().content(s),
            Content::Embed(e) => EditMessage::new().embed(embed(e)),
        };

        let edited = msg
            .channel_id
            .edit_message(&self.0, msg.message_id, edit)
            .await
            .map_err(send_error)?;
        Ok(MessageRef::new(edited.channel_id, edited.id))
    }

    async fn typing(&self, dest: ChannelId) -> Result<(), SendError> {
        dest.broadcast_typing(&self.0).await.map_err(send_error)
    }

    async fn is_guild_admin(&self, guild_id: GuildId, user: UserId) -> Result<bool> {
        let member = guild_id
            .member(&self.0, user)
            .await
            .context("Error fetching guild member")?;

        let perms = {
            let guild = self
                .0
                .cache
                .guild(guild_id)
                .context("Guild missing from cache")?;

            if guild.owner_id == user {
                Permissions::all()
            } else {
                let everyone = guild
                    .roles
                    .get(&RoleId::new(guild_id.get()))
                    .map_or_else(Permissions::empty, |r| r.permissions);

                member
                    .roles
                    .iter()
                    .filter_map(|r| guild.roles.get(r))
                    .fold(everyone, |p, r| p | r.permissions)
            }
        };

        Ok(perms.administrator())
    }
}

#[async_trait]
impl Operator for Discord {
    async fn history(&self, channel: ChannelId, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut out = Vec::with_capacity(limit);
        let mut before: Option<MessageId> = None;

        while out.len() < limit {
            let page = (limit - out.len()).min(HISTORY_PAGE);
            let mut req = GetMessages::new().limit(u8::try_from(page).unwrap_or(u8::MAX));
            if let Some(id) = before {
                req = req.before(id);
            }

            let msgs = channel
                .messages(&self.0, req)
                .await
                .context("Error reading channel history")?;
            let Some(last) = msgs.last() else { break };
            before = Some(last.id);

            let n = msgs.len();
            out.extend(msgs.into_iter().map(|m| HistoryEntry {
                id: m.id,
                author: user(&m.author),
                pinned: m.pinned,
            }));

            if n < page {
                break;
            }
        }

        Ok(out)
    }

    async fn kick(&self, guild: GuildId, user: UserId) -> Result {
        guild
            .kick(&self.0, user)
            .await
            .context("Error kicking guild member")
    }

    async fn set_username(&self, name: &str) -> Result {
        let mut me = self.0.cache.current_user().clone();

        me.edit(&self.0, EditProfile::new().username(name))
            .await
            .context("Error changing username")
    }

    async fn set_avatar(&self, image: Vec<u8>) -> Result {
        let mut me = self.0.cache.current_user().clone();
        let avatar = CreateAttachment::bytes(image, "avatar.png");

        me.edit(&self.0, EditProfile::new().avatar(&avatar))
            .await
            .context("Error changing avatar")
    }

    async fn channel_exists(&self, guild: GuildId, channel: ChannelId) -> Result<bool> {
        let channels = guild
            .channels(&self.0)
            .await
            .context("Error listing guild channels")?;

        Ok(channels.contains_key(&channel))
    }

    async fn create_category(&self, guild: GuildId, name: &str) -> Result<ChannelId> {
        let read_only = PermissionOverwrite {
            allow: Permissions::empty(),
            deny: Permissions::SEND_MESSAGES,
            kind: PermissionOverwriteType::Role(RoleId::new(guild.get())),
        };

        let chan = guild
            .create_channel(
                &self.0,
                CreateChannel::new(name)
                    .kind(ChannelType::Category)
                    .permissions([read_only]),
            )
            .await
            .context("Error creating category")?;

        Ok(chan.id)
    }

    async fn create_text_channel(
        &self,
        guild: GuildId,
        name: &str,
        category: ChannelId,
    ) -> Result<ChannelId> {
        let chan = guild
            .create_channel(
                &self.0,
                CreateChannel::new(name)
                    .kind(ChannelType::Text)
                    .category(category),
            )
            .await
            .context("Error creating text channel")?;

        Ok(chan.id)
    }

    async fn create_webhook(&self, channel: ChannelId, name: &str) -> Result<Webhook> {
        let hook = channel
            .create_webhook(&self.0, CreateWebhook::new(name))
            .await
            .context("Error creating webhook")?;

        Ok(Webhook {
            id: hook.id.get(),
            url: hook.url().context("Webhook has no URL")?,
        })
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result {
        channel
            .delete(&self.0)
            .await
            .context("Error deleting channel")?;

        Ok(())
    }
}
