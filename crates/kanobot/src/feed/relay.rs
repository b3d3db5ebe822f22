//! Deciding which statuses to relay, and posting them to webhooks

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::store::Subscription;
use crate::prelude::*;

const MAX_WEBHOOK_ATTEMPTS: usize = 5;
const MAX_RETRY_WAIT_SECS: f64 = 600.0;

/// An account as returned by the feed API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Reference {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    author_id: String,
    #[serde(default)]
    in_reply_to_user_id: Option<String>,
    #[serde(default)]
    referenced_tweets: Vec<Reference>,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<Account>,
}

/// One line of the filtered stream
#[derive(Debug, Deserialize)]
pub struct StreamEvent {
    #[serde(default)]
    data: Option<Post>,
    #[serde(default)]
    includes: Includes,
}

/// A status worth considering for relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub id: String,
    pub author: Account,
    pub in_reply_to_user_id: Option<String>,
    pub is_retweet: bool,
}

impl Status {
    /// Pull the status and its expanded author out of a stream event
    pub fn from_event(ev: StreamEvent) -> Option<Self> {
        let StreamEvent { data, includes } = ev;
        let post = data?;
        let author = includes
            .users
            .into_iter()
            .find(|u| u.id == post.author_id)?;

        Some(Self {
            is_retweet: post.referenced_tweets.iter().any(|r| r.kind == "retweeted"),
            id: post.id,
            author,
            in_reply_to_user_id: post.in_reply_to_user_id,
        })
    }

    pub fn url(&self) -> String {
        format!(
            "https://twitter.com/{}/status/{}",
            self.author.username, self.id
        )
    }
}

/// Decide whether a status should be relayed for a subscription
///
/// Flags missing from the stored subscription fall back to the permissive
/// choice, except replies from other accounts which must be opted into.
pub fn should_relay(status: &Status, sub: &Subscription) -> bool {
    let mut relay = if status.author.id == sub.twitter_id {
        !(sub.include_user_reply == Some(false) && status.in_reply_to_user_id.is_some())
    } else {
        sub.include_reply_to_user == Some(true)
            && status.in_reply_to_user_id.as_deref() == Some(sub.twitter_id.as_str())
    };

    if sub.include_retweet == Some(false) && status.is_retweet {
        relay = false;
    }

    relay
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookPayload {
    pub username: String,
    pub avatar_url: Option<String>,
    pub content: String,
}

impl WebhookPayload {
    pub fn for_status(status: &Status) -> Self {
        Self {
            username: status.author.name.clone(),
            avatar_url: status.author.profile_image_url.clone(),
            content: status.url(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RateLimited {
    retry_after: f64,
}

fn retry_wait(retry_after: f64) -> Duration {
    Duration::from_secs_f64(retry_after.max(0.0).min(MAX_RETRY_WAIT_SECS)) + Duration::from_millis(100)
}

/// Post to a webhook, waiting out rate limits
#[instrument(level = "debug", skip(http, payload))]
pub async fn post(http: &reqwest::Client, url: &str, payload: &WebhookPayload) -> Result {
    for _ in 0..MAX_WEBHOOK_ATTEMPTS {
        let res = http
            .post(url)
            .json(payload)
            .send()
            .await
            .context("Error sending webhook request")?;
        let status = res.status();

        if status.is_success() {
            return Ok(());
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let body: RateLimited = res
                .json()
                .await
                .context("Error parsing rate limit response")?;
            let wait = retry_wait(body.retry_after);

            debug!(?wait, "Webhook rate limited");
            tokio::time::sleep(wait).await;
            continue;
        }

        let text = res.text().await.unwrap_or_default();
        bail!("Webhook responded with {status}: {text}");
    }

    bail!("Webhook still rate limited after {MAX_WEBHOOK_ATTEMPTS} attempts")
}
