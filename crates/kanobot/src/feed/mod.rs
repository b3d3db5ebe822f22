//! Relaying followed accounts' statuses into guild channels via webhooks

pub mod api;
pub mod relay;
pub mod store;

use kano_dispatch::Capability;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tokio::{sync::RwLock, task::JoinHandle};

use self::{
    api::Api,
    relay::{Status, StreamEvent, WebhookPayload},
    store::Subscriptions,
};
use crate::prelude::*;

const MIN_BACKOFF: Duration = Duration::from_secs(5);
const MAX_BACKOFF: Duration = Duration::from_secs(320);

/// Holds the feed once it has started, gating the commands that need it
#[derive(Debug, Default)]
pub struct FeedSlot(OnceCell<Arc<Feed>>);

impl FeedSlot {
    #[inline]
    pub fn get(&self) -> Option<&Arc<Feed>> { self.0.get() }

    /// Install the feed, returning false if one was already installed
    pub fn set(&self, feed: Arc<Feed>) -> bool { self.0.set(feed).is_ok() }
}

impl Capability for FeedSlot {
    fn name(&self) -> &str { "Twitter" }

    fn is_available(&self) -> bool { self.0.get().is_some() }
}

#[derive(Debug)]
pub struct Feed {
    api: Api,
    webhooks: reqwest::Client,
    store_path: PathBuf,
    subs: Arc<RwLock<Subscriptions>>,
    stream: Mutex<Option<JoinHandle<()>>>,
}

impl Feed {
    /// Load subscriptions and open the stream
    pub async fn start(api: Api, webhooks: reqwest::Client, store_path: PathBuf) -> Result<Arc<Self>> {
        let feed = Arc::new(Self {
            api,
            webhooks,
            store_path,
            subs: Arc::default(),
            stream: Mutex::new(None),
        });

        feed.reload().await?;
        Ok(feed)
    }

    #[inline]
    pub fn api(&self) -> &Api { &self.api }

    pub async fn load(&self) -> Result<Subscriptions> { crate::store::read(&self.store_path).await }

    pub async fn save(&self, subs: &Subscriptions) -> Result {
        crate::store::write(&self.store_path, subs).await
    }

    /// Re-read the subscription file, resync stream rules and reconnect
    #[instrument(level = "info", skip(self))]
    pub async fn reload(&self) -> Result {
        let subs = self.load().await?;
        let followed = subs.followed();
        self.api
            .sync_rules(followed.iter().copied())
            .await
            .context("Error syncing stream rules")?;
        let any = !followed.is_empty();

        *self.subs.write().await = subs;

        let task = any.then(|| {
            tokio::spawn(
                stream(
                    self.api.clone(),
                    Arc::clone(&self.subs),
                    self.webhooks.clone(),
                )
                .instrument(info_span!("feed_stream")),
            )
        });

        if let Some(old) = mem::replace(&mut *self.stream.lock(), task) {
            old.abort();
        }

        if any {
            info!("Feed stream (re)started");
        } else {
            info!("No subscriptions, feed stream idle");
        }

        Ok(())
    }
}

impl Drop for Feed {
    fn drop(&mut self) {
        if let Some(task) = self.stream.get_mut().take() {
            task.abort();
        }
    }
}

async fn stream(api: Api, subs: Arc<RwLock<Subscriptions>>, webhooks: reqwest::Client) {
    let mut backoff = MIN_BACKOFF;

    loop {
        match api.connect().await {
            Ok(res) => {
                info!("Feed stream connected");
                backoff = MIN_BACKOFF;

                if let Err(e) = read_stream(res, &subs, &webhooks).await {
                    warn!("Feed stream dropped: {e:?}");
                }
            },
            Err(e) => warn!("Feed stream error: {e:?}"),
        }

        warn!("Reconnecting feed stream in {backoff:?}");
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

async fn read_stream(
    res: reqwest::Response,
    subs: &RwLock<Subscriptions>,
    webhooks: &reqwest::Client,
) -> Result {
    let mut body = res.bytes_stream();
    let mut buf = Vec::new();

    while let Some(chunk) = body.next().await {
        buf.extend_from_slice(&chunk.context("Error reading stream")?);

        while let Some(end) = buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buf.drain(..=end).collect();
            let Ok(line) = std::str::from_utf8(&line) else {
                warn!("Non-UTF-8 line in stream");
                continue;
            };
            let line = line.trim();

            // Keep-alive
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<StreamEvent>(line) {
                Ok(ev) => match Status::from_event(ev) {
                    Some(s) => dispatch(&s, subs, webhooks).await,
                    None => trace!("Stream event without a status"),
                },
                Err(e) => warn!("Malformed stream event: {e}"),
            }
        }
    }

    bail!("Stream closed by server")
}

async fn dispatch(status: &Status, subs: &RwLock<Subscriptions>, webhooks: &reqwest::Client) {
    info!("{} posted {}", status.author.username, status.id);
    let payload = Arc::new(WebhookPayload::for_status(status));

    let subs = subs.read().await;
    for sub in subs.discord.iter().filter(|s| relay::should_relay(status, s)) {
        let http = webhooks.clone();
        let url = sub.webhook_url.clone();
        let payload = Arc::clone(&payload);

        tokio::spawn(
            async move {
                if let Err(e) = relay::post(&http, &url, &payload).await {
                    warn!("Webhook post failed: {e:?}");
                }
            }
            .instrument(debug_span!("relay", channel = sub.channel_id)),
        );
    }
}
