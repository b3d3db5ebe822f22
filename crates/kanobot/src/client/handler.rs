use kano_dispatch::{CannedReplies, CommandTable, Dispatcher, HelpfulError, Identity, Signal};
use parking_lot::RwLock;
use serenity::{
    client::Context,
    model::{channel::Message, gateway::Ready, id::UserId},
};
use tokio::sync::mpsc;

use super::{
    commands::{self, CommandDeps},
    discord::{self, Discord},
    ClientOpts, OwnerId,
};
use crate::{
    feed::{api::Api, Feed, FeedSlot},
    prelude::*,
    util,
};

/// Everything built once the gateway reports ready
#[derive(Debug)]
struct Session {
    dispatcher: Dispatcher<Discord>,
    // Held so the stream task lives as long as the session
    _feed: Arc<FeedSlot>,
}

#[derive(Debug)]
pub struct Handler {
    opts: ClientOpts,
    signals: mpsc::UnboundedSender<Signal>,
    session: RwLock<Option<Arc<Session>>>,
}

impl Handler {
    pub fn new_rc(opts: ClientOpts, signals: mpsc::UnboundedSender<Signal>) -> Arc<Self> {
        Arc::new(Self {
            opts,
            signals,
            session: RwLock::new(None),
        })
    }

    fn signal(&self, signal: Signal) {
        if self.signals.send(signal).is_err() {
            warn!(?signal, "Run loop is gone, dropping signal");
        }
    }

    async fn resolve_owner(&self, ctx: &Context, me: UserId) -> Result<UserId> {
        let owner = match self.opts.owner_id {
            OwnerId::Id(id) => id,
            OwnerId::Auto => ctx
                .http
                .get_current_application_info()
                .await
                .context("Error fetching application info")?
                .owner
                .map(|u| u.id)
                .context("Application has no owner")?,
        };

        if owner == me {
            return Err(HelpfulError::new(
                "Your OwnerID is incorrect or you've used the wrong credentials.",
                "The bot's user ID and the id for OwnerID is identical.  This is wrong.  The \
                 bot needs a bot account to function, meaning you cannot use your own \
                 account to run the bot on.  The OwnerID is the id of the owner, not the bot.  \
                 Figure out which one is which and use the correct information.",
            )
            .preface("An error has occured validating the config:")
            .into());
        }

        Ok(owner)
    }

    async fn start_feed(&self, http: reqwest::Client, slot: &FeedSlot) -> Result {
        let Some(ref token) = self.opts.twitter_bearer_token else {
            info!("No Twitter token set, feed relay disabled");
            return Ok(());
        };

        let api = Api::new(
            util::stream_client(self.opts.timeout())?,
            token.0.clone(),
            self.opts.timeout(),
        );
        let feed = Feed::start(api, http, self.opts.webhook_file.clone())
            .await
            .context("Error starting feed relay")?;

        if !slot.set(feed) {
            warn!("Feed relay was already running");
        }

        Ok(())
    }

    async fn init(&self, ctx: &Context, ready: &Ready) -> Result<Session> {
        let me = ready.user.id;
        let owner = self.resolve_owner(ctx, me).await?;

        let mut config = self.opts.dispatch_config();
        config.owner_id = Some(owner);
        config.dev_ids.insert(owner);

        let replies: CannedReplies = crate::store::read(&self.opts.reply_file)
            .await
            .context("Error loading canned replies")?;

        let deps = CommandDeps {
            http: util::http_client(self.opts.timeout())?,
            feed: Arc::default(),
        };

        // The feed is optional, so a failure here only disables it
        if let Err(e) = self.start_feed(deps.http.clone(), &deps.feed).await {
            error!("{e:?}");
        }

        let table =
            CommandTable::new(commands::list(&deps)).context("Error building command table")?;

        let identity = Identity {
            id: me,
            name: ready.user.name.clone(),
            avatar_url: ready.user.avatar_url(),
        };

        info!(
            bot = %identity.name,
            id = %me,
            %owner,
            prefix = %config.command_prefix,
            commands = table.len(),
            embeds = config.embeds,
            delete_messages = config.delete_messages,
            delete_invoking = config.delete_invoking,
            debug_mode = config.debug_mode,
            feed = deps.feed.get().is_some(),
            "Connected"
        );

        if config.block_channels.is_empty() {
            debug!("No blocked channels");
        } else {
            info!(channels = ?config.block_channels, "Ignoring blocked channels");
        }

        Ok(Session {
            dispatcher: Dispatcher::new(config, identity, table, replies),
            _feed: deps.feed,
        })
    }
}

#[instrument(skip(f))]
async fn handler(method: &'static str, f: impl Future<Output = Result<()>>) {
    match f.await {
        Ok(()) => (),
        Err(e) => error!("Error in {method}: {e:?}"),
    }
}

#[async_trait]
impl serenity::client::EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        handler("ready", async move {
            let resumed = self.session.read().is_some();
            if resumed {
                info!("Gateway session resumed");
                return Ok(());
            }

            match self.init(&ctx, &ready).await {
                Ok(session) => {
                    *self.session.write() = Some(Arc::new(session));
                    Ok(())
                },
                Err(e) => {
                    match e.downcast_ref::<HelpfulError>() {
                        Some(h) => error!("{}", h.message()),
                        None => error!("Error during startup: {e:?}"),
                    }

                    self.signal(Signal::Terminate);
                    Ok(())
                },
            }
        })
        .await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        handler("message", async move {
            let session = self.session.read().clone();
            let Some(session) = session else {
                trace!("Message received before ready, ignoring");
                return Ok(());
            };

            let inbound = discord::inbound(&msg);
            if let Err(signal) = session.dispatcher.dispatch(&Discord(ctx), &inbound).await {
                info!(?signal, "Forwarding control signal");
                self.signal(signal);
            }

            Ok(())
        })
        .await;
    }
}
