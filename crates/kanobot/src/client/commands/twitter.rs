use super::prelude::*;
use crate::feed::{
    store::{Subscription, Subscriptions},
    Feed, FeedSlot,
};

const FEED_CATEGORY: &str = "twitter";

fn feed(slot: &FeedSlot) -> Result<&Arc<Feed>> { slot.get().context("Feed not started") }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Subscribe,
    Unsubscribe,
}

impl Action {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "+" => Some(Self::Subscribe),
            "-" => Some(Self::Unsubscribe),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct SetTwitterCommand {
    feed: Arc<FeedSlot>,
}

impl SetTwitterCommand {
    pub fn new(feed: Arc<FeedSlot>) -> Self { Self { feed } }

    async fn subscribe<P: Operator>(
        platform: &P,
        subs: &mut Subscriptions,
        guild: GuildId,
        channel_name: &str,
        mut sub: Subscription,
    ) -> Result<(), CommandError> {
        let create_failed =
            || CommandError::new(format!("Create channel {channel_name} failed")).expire_in(secs(30));

        let existing = match subs.category(guild) {
            Some(c) => platform
                .channel_exists(guild, c)
                .await
                .unwrap_or(false)
                .then_some(c),
            None => None,
        };

        let category = match existing {
            Some(c) => c,
            None => {
                let c = platform
                    .create_category(guild, FEED_CATEGORY)
                    .await
                    .map_err(|e| {
                        warn!(?e, "Error creating feed category");
                        create_failed()
                    })?;
                subs.set_category(guild, c);
                c
            },
        };

        let channel = platform
            .create_text_channel(guild, channel_name, category)
            .await
            .map_err(|e| {
                warn!(?e, "Error creating feed channel");
                create_failed()
            })?;

        let webhook = platform
            .create_webhook(channel, channel_name)
            .await
            .map_err(|e| CommandError::new(format!("{e:#}")).expire_in(secs(30)))?;

        sub.channel_id = channel.get();
        sub.webhook_id = webhook.id;
        sub.webhook_url = webhook.url;
        subs.subscribe(sub);

        Ok(())
    }
}

#[async_trait]
impl<P: Operator> Command<P> for SetTwitterCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::new("set_twitter", [
            Param::context(ContextKey::Guild),
            Param::required("action"),
            Param::required("name"),
            Param::optional("new_channel_name", None),
            Param::optional("include_reply_to_user", None),
            Param::optional("include_user_reply", None),
            Param::optional("include_retweet", None),
        ])
        .doc(
            "
            Usage:
                {command_prefix}set_twitter [+, -] [name] | optional [new_channel_name] [includeReplyToUser] [includeUserReply] [includeRetweet]
                {command_prefix}set_twitter + [name]
                {command_prefix}set_twitter + [name] [new_channel_name] True True True
                {command_prefix}set_twitter - [name]

            Add a webhook relaying a Twitter user's statuses.
            Any value given for the include flags turns them on.
            ",
        )
    }

    async fn run(&self, inv: &Invocation<'_, P>, args: &Args) -> CommandResult {
        let feed = feed(&self.feed)?;
        let guild = args
            .guild()
            .ok_or_else(|| CommandError::new("This command can only be used in a server"))?;

        let Some(action) = args.str("action").and_then(Action::parse) else {
            return Ok(Some(
                Response::new("Invalid action must be + or - ")
                    .reply(true)
                    .delete_after(secs(10)),
            ));
        };

        let new_channel_name = args.str("new_channel_name");
        if new_channel_name.is_some_and(|n| !(2..=32).contains(&n.chars().count())) {
            return Ok(Some(
                Response::new("Invalid channel name, Must be between 2 and 32 in length")
                    .reply(true)
                    .delete_after(secs(20)),
            ));
        }

        let name = args.str("name").context("Missing account name")?;
        let account = match feed.api().user_by_name(name).await {
            Ok(a) => a,
            Err(e) => {
                debug!(?e, "Account lookup failed");
                return Ok(Some(
                    Response::new("Invalid twitter id, name. e.g. @kano_2525 or kano_2525")
                        .reply(true),
                ));
            },
        };

        let mut subs = feed.load().await?;

        match action {
            Action::Subscribe => {
                if subs.find(guild, &account.id).is_some() {
                    return Ok(Some(Response::new(format!(
                        "Already subscribed \n{}\n",
                        account.name
                    ))));
                }

                let sub = Subscription {
                    guild_id: guild.get(),
                    channel_id: 0,
                    webhook_url: String::new(),
                    webhook_id: 0,
                    twitter_id: account.id.clone(),
                    include_reply_to_user: Some(args.contains("include_reply_to_user")),
                    include_user_reply: Some(args.contains("include_user_reply")),
                    include_retweet: Some(args.contains("include_retweet")),
                };
                let channel_name = new_channel_name.unwrap_or(&account.username);

                Self::subscribe(inv.platform, &mut subs, guild, channel_name, sub).await?;
            },
            Action::Unsubscribe => {
                let Some(sub) = subs.unsubscribe(guild, &account.id) else {
                    return Ok(Some(Response::new(format!(
                        "{} did not subscribe",
                        account.name
                    ))));
                };

                let deleted = match sub.channel() {
                    Some(c) => inv.platform.delete_channel(c).await,
                    None => Err(anyhow!("Subscription has no channel")),
                };

                if let Err(e) = deleted {
                    warn!(?e, "Error deleting feed channel");
                    return Err(CommandError::new("Delete channel failed")
                        .expire_in(secs(20))
                        .into());
                }
            },
        }

        feed.save(&subs).await?;
        feed.reload().await?;

        Ok(Some(Response::new(format!(
            "{} :ok_hand:\n\n{}\n",
            match action {
                Action::Subscribe => "Subscribe",
                Action::Unsubscribe => "Unsubscribe",
            },
            account.name
        ))))
    }
}

#[derive(Debug)]
pub struct ReloadTwitterCommand {
    feed: Arc<FeedSlot>,
}

impl ReloadTwitterCommand {
    pub fn new(feed: Arc<FeedSlot>) -> Self { Self { feed } }
}

#[async_trait]
impl<P: Operator> Command<P> for ReloadTwitterCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::new("reload_twitter", []).doc(
            "
            Usage:
                {command_prefix}reload_twitter

            Reloads the Twitter stream.
            ",
        )
    }

    async fn run(&self, _: &Invocation<'_, P>, _: &Args) -> CommandResult {
        feed(&self.feed)?.reload().await?;

        Ok(Some(Response::new(":ok_hand:\n Reload success")))
    }
}

#[cfg(test)]
mod tests {
    use kano_dispatch::mock;
    use serenity::model::id::{ChannelId, GuildId};

    use super::{super::test_util::*, *};
    use crate::client::operator::mock::{config, MockOperator};

    fn admin() -> kano_dispatch::DispatchConfig {
        let mut cfg = config();
        cfg.admin_ids.insert(42_u64.into());
        cfg
    }

    fn sub(twitter_id: &str) -> Subscription {
        Subscription {
            guild_id: mock::GUILD,
            channel_id: 0,
            webhook_url: String::new(),
            webhook_id: 0,
            twitter_id: twitter_id.into(),
            include_reply_to_user: Some(true),
            include_user_reply: Some(false),
            include_retweet: Some(false),
        }
    }

    #[tokio::test]
    async fn test_feed_not_configured() {
        let msg = mock::guild_message(member(), "!set_twitter + kano_2525");
        let (op, _) = run(admin(), &msg).await;

        assert_eq!(op.platform.sent_text(), [
            "```\nYou don't have permission to use that command.\nReason: Twitter is not \
             configured\n```"
        ]);
    }

    #[tokio::test]
    async fn test_admin_checked_first() {
        let msg = mock::guild_message(member(), "!reload_twitter");
        let (op, _) = run(config(), &msg).await;

        assert!(op.platform.sent_text()[0].contains("only admin users can use this command"));
    }

    #[tokio::test]
    async fn test_subscribe_creates_channels() {
        let op = MockOperator::default();
        let guild = GuildId::new(mock::GUILD);
        let mut subs = Subscriptions::default();

        SetTwitterCommand::subscribe(&op, &mut subs, guild, "kano", sub("1"))
            .await
            .unwrap();
        SetTwitterCommand::subscribe(&op, &mut subs, guild, "other", sub("2"))
            .await
            .unwrap();

        // The category is created once and reused
        let channels = op.state.lock().channels.clone();
        assert_eq!(channels, [
            (guild, "twitter".to_owned(), None),
            (guild, "kano".to_owned(), Some(ChannelId::new(1))),
            (guild, "other".to_owned(), Some(ChannelId::new(1))),
        ]);

        assert_eq!(subs.category(guild), Some(ChannelId::new(1)));
        assert_eq!(subs.twitter_ids, ["1", "2"]);

        let first = subs.find(guild, "1").unwrap();
        assert_eq!(first.channel(), Some(ChannelId::new(2)));
        assert_eq!(first.webhook_id, 5002);
        assert_eq!(first.webhook_url, "https://example.invalid/webhooks/2/kano");
        assert_eq!(first.include_retweet, Some(false));
    }

    #[tokio::test]
    async fn test_subscribe_recreates_missing_category() {
        let op = MockOperator::default();
        let guild = GuildId::new(mock::GUILD);
        let mut subs = Subscriptions::default();
        subs.set_category(guild, ChannelId::new(77));

        SetTwitterCommand::subscribe(&op, &mut subs, guild, "kano", sub("1"))
            .await
            .unwrap();

        assert_eq!(subs.category(guild), Some(ChannelId::new(1)));
    }

    #[test]
    fn test_action() {
        assert_eq!(Action::parse("+"), Some(Action::Subscribe));
        assert_eq!(Action::parse("-"), Some(Action::Unsubscribe));
        assert_eq!(Action::parse("add"), None);
    }
}
