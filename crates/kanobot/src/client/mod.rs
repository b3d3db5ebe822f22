use kano_dispatch::{config::DEFAULT_DM_COMMANDS, DispatchConfig, HelpfulError, Signal};
use serenity::{
    model::{
        gateway::GatewayIntents,
        id::{ChannelId, UserId},
    },
    Client,
};
use tokio::sync::mpsc;

use crate::{prelude::*, util::DebugShim};

mod commands;
mod discord;
mod handler;
mod operator;

/// Owner IDs below this are certainly not real accounts
const MIN_OWNER_ID: u64 = 10_000;

/// Who owns the bot, or `auto` to ask Discord
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OwnerId {
    #[default]
    Auto,
    Id(UserId),
}

impl FromStr for OwnerId {
    type Err = HelpfulError;

    fn from_str(s: &str) -> Result<Self, HelpfulError> {
        let s = s.trim();

        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }

        match s.parse::<u64>() {
            Ok(id) if id >= MIN_OWNER_ID => Ok(Self::Id(UserId::new(id))),
            _ => Err(HelpfulError::new(
                format!("An invalid OwnerID was set: {s}"),
                "Correct your OwnerID.  The ID should be just a number, approximately 18 \
                 characters long, or 'auto'.  If you don't know what your ID is, read the \
                 instructions in the options or ask in the help server.",
            )
            .preface("An error has occured reading the config:")),
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct ClientOpts {
    /// The Discord API token to use
    #[arg(long, env)]
    discord_token: DebugShim<String>,

    /// The owner's user ID, or "auto" to use the application owner
    #[arg(long, env, default_value = "auto")]
    owner_id: OwnerId,

    /// Users allowed to run admin commands
    #[arg(long, env, value_delimiter = ',')]
    admin_ids: Vec<u64>,

    /// Users allowed to run dev commands
    #[arg(long, env, value_delimiter = ',')]
    dev_ids: Vec<u64>,

    /// Channels in which all messages are ignored
    #[arg(long, env, value_delimiter = ',')]
    block_channels: Vec<u64>,

    /// Leading text marking a message as a command
    #[arg(long, env, default_value = "!")]
    command_prefix: String,

    /// Render plain-text responses as embeds
    #[arg(long, env)]
    embeds: bool,

    /// Expire bot responses after their requested delay
    #[arg(long, env, default_value_t = true, action = clap::ArgAction::Set)]
    delete_messages: bool,

    /// Clean up the messages that invoked commands
    #[arg(long, env)]
    delete_invoking: bool,

    /// Echo unexpected errors into chat
    #[arg(long, env)]
    debug_mode: bool,

    /// Commands the owner may use in direct messages
    #[arg(
        long,
        env,
        value_delimiter = ',',
        default_values_t = DEFAULT_DM_COMMANDS.map(String::from),
    )]
    dm_commands: Vec<String>,

    /// Timeout in seconds for outbound HTTP requests
    #[arg(long, env, default_value_t = 10)]
    timeout: u64,

    /// Bearer token for the Twitter API, enabling the feed relay
    #[arg(long, env)]
    twitter_bearer_token: Option<DebugShim<String>>,

    /// Where feed subscriptions are stored
    #[arg(long, env, default_value = "config/webhook.json")]
    webhook_file: PathBuf,

    /// Where per-guild canned replies are read from
    #[arg(long, env, default_value = "config/reply_file.json")]
    reply_file: PathBuf,
}

impl ClientOpts {
    #[inline]
    pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout) }

    /// Dispatcher settings, before the owner has been resolved
    fn dispatch_config(&self) -> DispatchConfig {
        let ids = |v: &[u64]| -> Vec<u64> { v.iter().filter(|&&i| i != 0).copied().collect() };

        DispatchConfig {
            command_prefix: self.command_prefix.clone(),
            delete_messages: self.delete_messages,
            delete_invoking: self.delete_invoking,
            embeds: self.embeds,
            debug_mode: self.debug_mode,
            owner_id: None,
            admin_ids: ids(&self.admin_ids).into_iter().map(UserId::new).collect(),
            dev_ids: ids(&self.dev_ids).into_iter().map(UserId::new).collect(),
            block_channels: ids(&self.block_channels)
                .into_iter()
                .map(ChannelId::new)
                .collect(),
            dm_commands: self.dm_commands.iter().map(|c| c.to_lowercase()).collect(),
        }
    }
}

pub async fn build(opts: &ClientOpts, signals: mpsc::UnboundedSender<Signal>) -> Result<Client> {
    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;
    let handler = handler::Handler::new_rc(opts.clone(), signals);

    Client::builder(&opts.discord_token.0, intents)
        .event_handler_arc(handler)
        .await
        .context("Error constructing Serenity client")
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct Opts {
        #[command(flatten)]
        client: ClientOpts,
    }

    fn parse(args: &[&str]) -> Result<ClientOpts, clap::Error> {
        Opts::try_parse_from(
            ["kanobot", "--discord-token", "abc"]
                .iter()
                .chain(args),
        )
        .map(|o| o.client)
    }

    #[test]
    fn test_owner_id() {
        assert_eq!("auto".parse::<OwnerId>(), Ok(OwnerId::Auto));
        assert_eq!(
            "123456789012345678".parse::<OwnerId>(),
            Ok(OwnerId::Id(UserId::new(123_456_789_012_345_678)))
        );

        let err = "9999".parse::<OwnerId>().unwrap_err();
        assert!(err.message_no_format().contains("An invalid OwnerID was set: 9999"));
        assert!(err
            .message_no_format()
            .starts_with("An error has occured reading the config:"));
        assert!("me".parse::<OwnerId>().is_err());
    }

    #[test]
    fn test_defaults() {
        let opts = parse(&[]).unwrap();
        let cfg = opts.dispatch_config();

        assert_eq!(opts.owner_id, OwnerId::Auto);
        assert_eq!(opts.timeout(), Duration::from_secs(10));
        assert_eq!(opts.webhook_file, Path::new("config/webhook.json"));
        assert_eq!(opts.reply_file, Path::new("config/reply_file.json"));
        assert!(opts.twitter_bearer_token.is_none());

        assert_eq!(cfg.command_prefix, "!");
        assert!(cfg.delete_messages);
        assert!(!cfg.delete_invoking);
        assert!(!cfg.embeds);
        assert_eq!(cfg.dm_commands.len(), DEFAULT_DM_COMMANDS.len());
        assert!(cfg.dm_commands.contains("joinserver"));
    }

    #[test]
    fn test_lists() {
        let opts = parse(&[
            "--admin-ids",
            "20000,30000",
            "--block-channels",
            "5",
            "--delete-messages",
            "false",
            "--dm-commands",
            "Help,restart",
            "--owner-id",
            "123456789012345678",
        ])
        .unwrap();
        let cfg = opts.dispatch_config();

        assert_eq!(cfg.admin_ids.len(), 2);
        assert!(cfg.admin_ids.contains(&UserId::new(30_000)));
        assert!(cfg
            .block_channels
            .contains(&ChannelId::new(5)));
        assert!(!cfg.delete_messages);
        assert_eq!(cfg.dm_commands.len(), 2);
        assert!(cfg.dm_commands.contains("help"));
    }

    #[test]
    fn test_bad_owner_rejected() {
        assert!(parse(&["--owner-id", "42"]).is_err());
    }
}
