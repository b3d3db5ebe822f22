//! Process-wide settings consumed by the dispatcher and renderer

use crate::prelude::*;

/// Commands usable in direct messages unless configured otherwise
pub const DEFAULT_DM_COMMANDS: [&str; 5] = ["joinserver", "ban", "setavatar", "restart", "help"];

/// Read-only dispatcher settings, constructed once at startup
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Leading text marking a message as a command
    pub command_prefix: String,
    /// Whether to expire bot responses after their requested delay
    pub delete_messages: bool,
    /// Whether to clean up the messages that invoked commands
    pub delete_invoking: bool,
    /// Whether to render plain-text responses as embeds
    pub embeds: bool,
    /// Whether to echo unexpected errors into chat
    pub debug_mode: bool,
    /// The bot owner, if known
    pub owner_id: Option<UserId>,
    /// Users granted the admin tier outright
    pub admin_ids: HashSet<UserId>,
    /// Users granted the dev tier
    pub dev_ids: HashSet<UserId>,
    /// Channels in which all messages are ignored
    pub block_channels: HashSet<ChannelId>,
    /// Commands the owner may use in direct messages
    pub dm_commands: HashSet<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            command_prefix: "!".into(),
            delete_messages: true,
            delete_invoking: false,
            embeds: false,
            debug_mode: false,
            owner_id: None,
            admin_ids: HashSet::new(),
            dev_ids: HashSet::new(),
            block_channels: HashSet::new(),
            dm_commands: DEFAULT_DM_COMMANDS.into_iter().map(Into::into).collect(),
        }
    }
}

impl DispatchConfig {
    /// Returns true if the given user is the configured owner
    #[inline]
    #[must_use]
    pub fn is_owner(&self, user: UserId) -> bool { self.owner_id == Some(user) }
}

/// The bot's own account, used to ignore its own messages and to brand
/// embeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The bot's user ID
    pub id: UserId,
    /// The bot's username
    pub name: String,
    /// The bot's avatar, if it has one
    pub avatar_url: Option<String>,
}
