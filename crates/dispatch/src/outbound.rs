//! Outbound chat primitives and their best-effort wrappers

use crate::{message::MessageRef, prelude::*, response::Content};

/// Maximum length of a plain-text chat message
pub const MESSAGE_CHAR_LIMIT: usize = 2000;

/// An error arising from sending or editing a message
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The bot may not post in the destination
    #[error("Missing permissions")]
    Forbidden,
    /// The destination or target message does not exist
    #[error("Target not found")]
    NotFound,
    /// Any other transport failure, including oversize content
    #[error("HTTP error: {0}")]
    Http(#[from] anyhow::Error),
}

/// An error arising from deleting a message
#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    /// The bot may not delete the message
    #[error("Missing permissions")]
    Forbidden,
    /// The message no longer exists
    #[error("Message not found")]
    NotFound,
    /// Any other transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] anyhow::Error),
}

/// The raw operations the dispatcher needs from a chat platform
///
/// Implementors should be cheap to clone, as handles are moved into detached
/// cleanup tasks.
#[async_trait]
pub trait Platform: Clone + Send + Sync + 'static {
    /// Post a message to a channel
    async fn send(&self, dest: ChannelId, content: &Content) -> Result<MessageRef, SendError>;

    /// Delete a message
    async fn delete(&self, msg: MessageRef) -> Result<(), DeleteError>;

    /// Replace the content of a message
    async fn edit(&self, msg: MessageRef, content: &Content) -> Result<MessageRef, SendError>;

    /// Show a typing indicator in a channel
    async fn typing(&self, dest: ChannelId) -> Result<(), SendError>;

    /// Check whether a user holds the administrator permission in a guild
    async fn is_guild_admin(&self, guild: GuildId, user: UserId) -> anyhow::Result<bool>;
}

/// Options for [`PlatformExt::safe_send`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOpts {
    /// Delete the sent message after this long, or never if zero
    pub expire_in: Duration,
    /// Another message to delete after the same delay
    pub also_delete: Option<MessageRef>,
    /// Log failures at debug rather than warn level
    pub quiet: bool,
}

impl SendOpts {
    /// Set the delay after which to delete the sent message
    #[inline]
    #[must_use]
    pub fn expire_in(self, expire_in: Duration) -> Self { Self { expire_in, ..self } }

    /// Set another message to delete after the same delay
    #[inline]
    #[must_use]
    pub fn also_delete(self, also_delete: Option<MessageRef>) -> Self {
        Self {
            also_delete,
            ..self
        }
    }

    /// Set whether to log failures quietly
    #[inline]
    #[must_use]
    pub fn quiet(self, quiet: bool) -> Self { Self { quiet, ..self } }
}

macro_rules! log_failure {
    ($quiet:expr, $($args:tt)*) => {
        if $quiet {
            debug!($($args)*);
        } else {
            warn!($($args)*);
        }
    };
}

/// Best-effort wrappers over [`Platform`] which log failures rather than
/// returning them
#[async_trait]
pub trait PlatformExt: Platform {
    /// Send a message, scheduling its deletion and that of `also_delete`
    async fn safe_send(
        &self,
        dest: ChannelId,
        content: Content,
        opts: SendOpts,
    ) -> Option<MessageRef> {
        let SendOpts {
            expire_in,
            also_delete,
            quiet,
        } = opts;

        let sent = match self.send(dest, &content).await {
            Ok(m) => Some(m),
            Err(SendError::Forbidden) => {
                log_failure!(quiet, "Cannot send message to {dest}, no permission");
                None
            },
            Err(SendError::NotFound) => {
                log_failure!(quiet, "Cannot send message to {dest}, invalid channel?");
                None
            },
            Err(SendError::Http(e)) => {
                if content.len() > MESSAGE_CHAR_LIMIT {
                    log_failure!(
                        quiet,
                        "Message is over the message size limit ({MESSAGE_CHAR_LIMIT})"
                    );
                } else {
                    log_failure!(quiet, "Failed to send message");
                    trace!(?e, ?content, "Transport error sending to {dest}");
                }
                None
            },
        };

        if let Some(msg) = sent {
            if !expire_in.is_zero() {
                self.delete_later(msg, expire_in);
            }
        }

        if let Some(msg) = also_delete {
            self.delete_later(msg, expire_in);
        }

        sent
    }

    /// Delete a message, treating a missing target as already done
    async fn safe_delete(&self, msg: MessageRef, quiet: bool) -> bool {
        match self.delete(msg).await {
            Ok(()) => true,
            Err(DeleteError::Forbidden) => {
                log_failure!(quiet, "Cannot delete message {}, no permission", msg.message_id);
                false
            },
            Err(DeleteError::NotFound) => {
                log_failure!(quiet, "Cannot delete message {}, message not found", msg.message_id);
                false
            },
            Err(DeleteError::Http(e)) => {
                log_failure!(quiet, "Failed to delete message {}: {e:?}", msg.message_id);
                false
            },
        }
    }

    /// Edit a message, optionally re-sending it if the target vanished
    async fn safe_edit(
        &self,
        msg: MessageRef,
        content: Content,
        send_if_fail: bool,
        quiet: bool,
    ) -> Option<MessageRef> {
        match self.edit(msg, &content).await {
            Ok(m) => Some(m),
            Err(SendError::NotFound) => {
                log_failure!(quiet, "Cannot edit message {}, message not found", msg.message_id);
                if send_if_fail {
                    log_failure!(quiet, "Sending message instead");
                    self.safe_send(msg.channel_id, content, SendOpts::default().quiet(quiet))
                        .await
                } else {
                    None
                }
            },
            Err(e) => {
                log_failure!(quiet, "Failed to edit message {}: {e}", msg.message_id);
                None
            },
        }
    }

    /// Show a typing indicator, logging any failure
    async fn send_typing(&self, dest: ChannelId) {
        match self.typing(dest).await {
            Ok(()) => (),
            Err(SendError::Forbidden) => {
                warn!("Could not send typing to {dest}, no permission");
            },
            Err(e) => debug!("Could not send typing to {dest}: {e}"),
        }
    }

    /// Delete a message after a delay, in a detached task
    fn delete_later(&self, msg: MessageRef, after: Duration) {
        let this = self.clone();
        tokio::spawn(
            async move {
                tokio::time::sleep(after).await;
                this.safe_delete(msg, true).await;
            }
            .instrument(tracing::debug_span!("delete_later", message = %msg.message_id)),
        );
    }
}

impl<P: Platform> PlatformExt for P {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPlatform;

    #[tokio::test(start_paused = true)]
    async fn test_expiry() {
        let mock = MockPlatform::default();
        let dest = ChannelId::new(5);

        let sent = mock
            .safe_send(
                dest,
                "hi".into(),
                SendOpts::default().expire_in(Duration::from_secs(10)),
            )
            .await
            .unwrap();
        assert!(mock.deleted().is_empty());

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(mock.deleted(), vec![sent]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_expires() {
        let mock = MockPlatform::default();
        mock.safe_send(ChannelId::new(5), "hi".into(), SendOpts::default())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(mock.deleted().is_empty());
        assert_eq!(mock.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_idempotent_delete() {
        let mock = MockPlatform::default();
        let sent = mock
            .safe_send(ChannelId::new(5), "hi".into(), SendOpts::default())
            .await
            .unwrap();

        assert!(mock.safe_delete(sent, false).await);
        assert!(!mock.safe_delete(sent, false).await);
        assert_eq!(mock.deleted(), vec![sent]);
    }

    #[tokio::test]
    async fn test_failed_send() {
        let mock = MockPlatform::default();
        mock.fail_sends(true);

        let sent = mock
            .safe_send(ChannelId::new(5), "x".repeat(3000).into(), SendOpts::default())
            .await;
        assert!(sent.is_none());
        assert!(mock.sent().is_empty());
    }

    #[tokio::test]
    async fn test_edit_fallback() {
        let mock = MockPlatform::default();
        let gone = MessageRef::new(5_u64, 999_u64);

        assert!(mock.safe_edit(gone, "new".into(), false, true).await.is_none());
        let sent = mock.safe_edit(gone, "new".into(), true, true).await.unwrap();

        assert_eq!(sent.channel_id, ChannelId::new(5));
        assert_eq!(mock.sent()[0].content, Content::text("new"));
    }
}
