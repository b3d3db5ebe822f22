//! The message-to-command pipeline

use crate::{
    args,
    canned::CannedReplies,
    command::CommandTable,
    config::{DispatchConfig, Identity},
    error::{Error, Signal},
    message::{InboundMessage, User},
    outbound::{Platform, PlatformExt, SendOpts},
    prelude::*,
    response::render,
};

/// How long usage text stays visible after a malformed invocation
pub const USAGE_EXPIRY: Duration = Duration::from_secs(60);

/// How long to wait before cleaning up an invoking message that got no
/// response
pub const CLEANUP_GRACE: Duration = Duration::from_secs(5);

/// The reply to commands sent in direct messages by anyone but the owner
pub const DM_REFUSAL: &str = "You cannot use this bot in private messages.";

/// Everything a command handler can see about the invocation it is serving
pub struct Invocation<'a, P: Platform> {
    /// The platform to send responses through
    pub platform: &'a P,
    /// The dispatcher configuration
    pub config: &'a DispatchConfig,
    /// The bot's own account
    pub identity: &'a Identity,
    /// Every registered command
    pub commands: &'a CommandTable<P>,
    /// The message that triggered this invocation, or `None` if the command
    /// was invoked internally
    pub message: Option<&'a InboundMessage>,
    /// The lower-cased name the command was invoked with
    pub command: &'a str,
}

impl<'a, P: Platform> fmt::Debug for Invocation<'a, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("identity", &self.identity)
            .field("message", &self.message)
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

impl<'a, P: Platform> Invocation<'a, P> {
    /// Construct a new invocation
    #[inline]
    #[must_use]
    pub fn new(
        platform: &'a P,
        config: &'a DispatchConfig,
        identity: &'a Identity,
        commands: &'a CommandTable<P>,
        message: Option<&'a InboundMessage>,
        command: &'a str,
    ) -> Self {
        Self {
            platform,
            config,
            identity,
            commands,
            message,
            command,
        }
    }

    /// The invoking user, if any
    #[inline]
    #[must_use]
    pub fn author(&self) -> Option<&'a User> { self.message.map(|m| &m.author) }

    /// The channel the invocation came from, if any
    #[inline]
    #[must_use]
    pub fn channel(&self) -> Option<ChannelId> { self.message.map(|m| m.channel_id) }

    /// Returns true if the invoking user is the owner, or if there is no
    /// invoking message
    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.message
            .map_or(true, |m| self.config.is_owner(m.author.id))
    }

    /// Returns true if the invoking user is a dev user
    #[must_use]
    pub fn is_dev(&self) -> bool {
        self.message
            .is_some_and(|m| self.config.dev_ids.contains(&m.author.id))
    }

    /// Returns true if the invoking user is a configured admin user or an
    /// administrator of the guild the message was sent in
    pub async fn is_admin(&self) -> bool {
        let Some(msg) = self.message else {
            return false;
        };

        if self.config.admin_ids.contains(&msg.author.id) {
            return true;
        }

        let Some(guild) = msg.guild_id else {
            return false;
        };

        match self.platform.is_guild_admin(guild, msg.author.id).await {
            Ok(b) => b,
            Err(e) => {
                warn!(?e, "Failed to look up guild permissions for {}", msg.author.id);
                false
            },
        }
    }
}

/// Routes inbound messages to command handlers and their results back to
/// chat
pub struct Dispatcher<P: Platform> {
    config: Arc<DispatchConfig>,
    identity: Identity,
    commands: Arc<CommandTable<P>>,
    replies: Arc<CannedReplies>,
}

impl<P: Platform> fmt::Debug for Dispatcher<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("identity", &self.identity)
            .field("commands", &self.commands)
            .field("replies", &self.replies)
            .finish()
    }
}

impl<P: Platform> Dispatcher<P> {
    /// Construct a new dispatcher
    #[must_use]
    pub fn new(
        config: DispatchConfig,
        identity: Identity,
        commands: CommandTable<P>,
        replies: CannedReplies,
    ) -> Self {
        Self {
            config: Arc::new(config),
            identity,
            commands: Arc::new(commands),
            replies: Arc::new(replies),
        }
    }

    /// The dispatcher configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Arc<DispatchConfig> { &self.config }

    /// The bot's own account
    #[inline]
    #[must_use]
    pub fn identity(&self) -> &Identity { &self.identity }

    /// Every registered command
    #[inline]
    #[must_use]
    pub fn commands(&self) -> &Arc<CommandTable<P>> { &self.commands }

    /// Handle a single inbound message
    ///
    /// Every failure is handled and logged here, except for control signals
    /// raised by a command.
    ///
    /// # Errors
    /// This method returns an error if the invoked command requested a
    /// restart or shutdown.
    #[instrument(level = "debug", skip_all, fields(message = %msg.id, author = %msg.author.id))]
    pub async fn dispatch(&self, platform: &P, msg: &InboundMessage) -> Result<(), Signal> {
        let cfg = &*self.config;

        if cfg.block_channels.contains(&msg.channel_id) {
            return Ok(());
        }

        let content = msg.content.trim();
        let Some(rest) = content.strip_prefix(cfg.command_prefix.as_str()) else {
            return Ok(());
        };

        if msg.author.id == self.identity.id {
            warn!("Ignoring command from myself ({content})");
            return Ok(());
        }

        if rest.starts_with(char::is_whitespace) {
            return Ok(());
        }

        let mut tokens = args::tokenize(rest);
        if tokens.is_empty() {
            return Ok(());
        }
        let command = tokens.remove(0).to_lowercase();

        let Some(entry) = self.commands.get(&command) else {
            self.canned_reply(platform, msg, &command, &tokens).await;
            return Ok(());
        };

        if msg.is_direct() && !(cfg.is_owner(msg.author.id) && cfg.dm_commands.contains(&command))
        {
            platform
                .safe_send(msg.channel_id, DM_REFUSAL.into(), SendOpts::default())
                .await;
            return Ok(());
        }

        info!(
            "{}/{}: {}",
            msg.author.id,
            msg.author.name,
            content.replace('\n', "\n... ")
        );

        let info = entry.info();
        let args = match args::bind(info.params(), Some(msg), &tokens) {
            Ok(a) => a,
            Err(e) => {
                debug!(%e, "Invalid usage of {command}");
                let usage = render::usage(
                    cfg,
                    &self.identity,
                    &command,
                    &info.usage(&cfg.command_prefix),
                );
                platform
                    .safe_send(
                        msg.channel_id,
                        usage,
                        SendOpts::default().expire_in(USAGE_EXPIRY),
                    )
                    .await;

                if cfg.delete_invoking {
                    platform.delete_later(msg.handle(), CLEANUP_GRACE);
                }

                return Ok(());
            },
        };

        let inv = Invocation::new(
            platform,
            cfg,
            &self.identity,
            &self.commands,
            Some(msg),
            &command,
        );

        platform.send_typing(msg.channel_id).await;
        let res = entry.handler().run(&inv, &args).await;

        let also_delete = cfg.delete_invoking.then(|| msg.handle());
        let expiry = |d: Duration| if cfg.delete_messages { d } else { Duration::ZERO };
        let mut sent = None;
        let mut responded = false;

        let ret = match res {
            Ok(None) => Ok(()),
            Ok(Some(res)) => {
                responded = true;
                let opts = SendOpts::default()
                    .expire_in(expiry(res.expiry()))
                    .also_delete(also_delete);
                let content = render::response(cfg, &self.identity, &command, &msg.author, res);

                sent = platform.safe_send(msg.channel_id, content, opts).await;
                Ok(())
            },
            Err(Error::Signal(s)) => {
                info!("{command} raised {s:?}");
                Err(s)
            },
            Err(e) => {
                if let Some((message, expire_in)) = e.user_facing() {
                    error!("Error in {command}: {}: {message}", e.kind());

                    let opts = SendOpts::default()
                        .expire_in(expiry(expire_in))
                        .also_delete(also_delete);
                    let content = render::error(cfg, &self.identity, &message);

                    sent = platform.safe_send(msg.channel_id, content, opts).await;
                } else {
                    error!("Unexpected error in {command}: {e:?}");

                    // The echo never expires, so it does not count as a response
                    if cfg.debug_mode {
                        let content = render::codeblock(&format!("{e:?}"), None);
                        platform
                            .safe_send(msg.channel_id, content.into(), SendOpts::default())
                            .await;
                    }
                }

                Ok(())
            },
        };

        if sent.is_none() && !responded && cfg.delete_invoking {
            platform.delete_later(msg.handle(), CLEANUP_GRACE);
        }

        ret
    }

    async fn canned_reply(&self, platform: &P, msg: &InboundMessage, trigger: &str, args: &[String]) {
        let Some(guild) = msg.guild_id else { return };
        let Some(text) = self.replies.pick(guild, trigger, args) else {
            return;
        };

        trace!(trigger, "Sending canned reply");
        platform
            .safe_send(msg.channel_id, text.into(), SendOpts::default().quiet(true))
            .await;
    }
}
