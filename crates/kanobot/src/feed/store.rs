//! Feed subscriptions as persisted in the webhook file

use serde::{Deserialize, Serialize};
use serenity::model::id::{ChannelId, GuildId};

use crate::prelude::*;

/// One followed account relayed into one guild channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub guild_id: u64,
    pub channel_id: u64,
    pub webhook_url: String,
    pub webhook_id: u64,
    pub twitter_id: String,
    /// Relay statuses by other accounts replying to the followed one
    #[serde(
        rename = "includeReplyToUser",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub include_reply_to_user: Option<bool>,
    /// Relay replies written by the followed account
    #[serde(
        rename = "includeUserReply",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub include_user_reply: Option<bool>,
    #[serde(
        rename = "includeRetweet",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub include_retweet: Option<bool>,
}

impl Subscription {
    #[inline]
    pub fn guild(&self) -> Option<GuildId> { (self.guild_id != 0).then(|| GuildId::new(self.guild_id)) }

    #[inline]
    pub fn channel(&self) -> Option<ChannelId> {
        (self.channel_id != 0).then(|| ChannelId::new(self.channel_id))
    }
}

/// The full contents of the webhook file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriptions {
    #[serde(rename = "Discord", default)]
    pub discord: Vec<Subscription>,
    #[serde(default)]
    pub twitter_ids: Vec<String>,
    /// Feed category channel per guild, keyed by stringified guild ID
    #[serde(rename = "Category_ids", default)]
    pub category_ids: BTreeMap<String, u64>,
}

impl Subscriptions {
    pub fn find(&self, guild: GuildId, twitter_id: &str) -> Option<&Subscription> {
        self.discord
            .iter()
            .find(|s| s.guild_id == guild.get() && s.twitter_id == twitter_id)
    }

    pub fn category(&self, guild: GuildId) -> Option<ChannelId> {
        self.category_ids
            .get(&guild.to_string())
            .filter(|&&c| c != 0)
            .map(|&c| ChannelId::new(c))
    }

    pub fn set_category(&mut self, guild: GuildId, category: ChannelId) {
        self.category_ids.insert(guild.to_string(), category.get());
    }

    pub fn subscribe(&mut self, sub: Subscription) {
        self.twitter_ids.push(sub.twitter_id.clone());
        self.discord.push(sub);
    }

    /// Remove a subscription and one matching entry from the followed IDs
    pub fn unsubscribe(&mut self, guild: GuildId, twitter_id: &str) -> Option<Subscription> {
        let idx = self
            .discord
            .iter()
            .position(|s| s.guild_id == guild.get() && s.twitter_id == twitter_id)?;
        let sub = self.discord.remove(idx);

        if let Some(i) = self.twitter_ids.iter().position(|t| *t == sub.twitter_id) {
            self.twitter_ids.remove(i);
        }

        Some(sub)
    }

    /// Every account with at least one subscription
    pub fn followed(&self) -> BTreeSet<&str> { self.twitter_ids.iter().map(String::as_str).collect() }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY: &str = r#"{
        "Category_ids": { "200": 11 },
        "Discord": [
            {
                "channel_id": 12,
                "guild_id": 200,
                "includeReplyToUser": false,
                "includeRetweet": true,
                "includeUserReply": false,
                "twitter_id": "783214",
                "webhook_id": 13,
                "webhook_url": "https://discord.com/api/webhooks/13/abc"
            },
            {
                "channel_id": 22,
                "guild_id": 300,
                "twitter_id": "783214",
                "webhook_id": 23,
                "webhook_url": "https://discord.com/api/webhooks/23/def"
            }
        ],
        "twitter_ids": ["783214", "783214"]
    }"#;

    fn sub(guild: u64, id: &str) -> Subscription {
        Subscription {
            guild_id: guild,
            channel_id: 5,
            webhook_url: "https://example.invalid".into(),
            webhook_id: 6,
            twitter_id: id.into(),
            include_reply_to_user: Some(false),
            include_user_reply: Some(false),
            include_retweet: Some(false),
        }
    }

    #[test]
    fn test_legacy_layout() {
        let subs: Subscriptions = serde_json::from_str(LEGACY).unwrap();

        assert_eq!(subs.discord.len(), 2);
        assert_eq!(subs.category(GuildId::new(200)), Some(ChannelId::new(11)));
        assert_eq!(subs.category(GuildId::new(300)), None);

        let first = subs.find(GuildId::new(200), "783214").unwrap();
        assert_eq!(first.include_retweet, Some(true));
        assert_eq!(first.channel(), Some(ChannelId::new(12)));

        let second = subs.find(GuildId::new(300), "783214").unwrap();
        assert_eq!(second.include_user_reply, None);

        // Absent flags stay absent when written back
        let json = serde_json::to_value(second).unwrap();
        assert!(json.get("includeUserReply").is_none());
    }

    #[test]
    fn test_empty_file() {
        let subs: Subscriptions = serde_json::from_str("{}").unwrap();
        assert_eq!(subs, Subscriptions::default());
        assert!(subs.followed().is_empty());
    }

    #[test]
    fn test_subscribe_unsubscribe() {
        let guild = GuildId::new(200);
        let mut subs = Subscriptions::default();

        subs.subscribe(sub(200, "1"));
        subs.subscribe(sub(300, "1"));
        subs.subscribe(sub(200, "2"));
        assert_eq!(subs.twitter_ids, ["1", "1", "2"]);
        assert_eq!(subs.followed().into_iter().collect::<Vec<_>>(), ["1", "2"]);

        assert_eq!(subs.unsubscribe(guild, "1"), Some(sub(200, "1")));
        assert_eq!(subs.twitter_ids, ["1", "2"]);
        assert!(subs.find(guild, "1").is_none());
        assert!(subs.find(GuildId::new(300), "1").is_some());

        assert_eq!(subs.unsubscribe(guild, "1"), None);
    }
}
