//! A minimal client for the Twitter v2 API

use serde::{Deserialize, Serialize};

use super::relay::Account;
use crate::{prelude::*, util::DebugShim};

const API_BASE: &str = "https://api.twitter.com/2";
const RULE_TAG_PREFIX: &str = "kanobot:";
const STREAM_FIELDS: [(&str, &str); 3] = [
    ("expansions", "author_id"),
    ("tweet.fields", "in_reply_to_user_id,referenced_tweets"),
    ("user.fields", "profile_image_url"),
];

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    title: String,
    #[serde(default)]
    detail: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T> {
        let Self { data, errors } = self;

        data.ok_or_else(|| match errors.first() {
            Some(e) => anyhow!("{}: {}", e.title, e.detail),
            None => anyhow!("Response contained no data"),
        })
    }
}

/// A filtered-stream rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl Rule {
    /// Match every status written by or replying to the given account
    pub fn follow(account_id: &str) -> Self {
        Self {
            id: None,
            value: format!("from:{account_id} OR to:{account_id}"),
            tag: Some(format!("{RULE_TAG_PREFIX}{account_id}")),
        }
    }

    fn is_ours(&self) -> bool {
        self.tag
            .as_deref()
            .is_some_and(|t| t.starts_with(RULE_TAG_PREFIX))
    }
}

/// The changes needed to bring the stream rules in line with the followed
/// accounts
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RuleDiff {
    pub add: Vec<Rule>,
    pub delete: Vec<String>,
}

impl RuleDiff {
    pub fn new<'a>(current: &[Rule], followed: impl IntoIterator<Item = &'a str>) -> Self {
        let wanted: BTreeMap<String, Rule> = followed
            .into_iter()
            .map(Rule::follow)
            .map(|r| (r.value.clone(), r))
            .collect();

        let delete = current
            .iter()
            .filter(|r| r.is_ours() && !wanted.contains_key(&r.value))
            .filter_map(|r| r.id.clone())
            .collect();

        let add = wanted
            .into_values()
            .filter(|w| !current.iter().any(|r| r.value == w.value))
            .collect();

        Self { add, delete }
    }

    #[inline]
    pub fn is_empty(&self) -> bool { self.add.is_empty() && self.delete.is_empty() }
}

#[derive(Debug, Clone)]
pub struct Api {
    http: reqwest::Client,
    token: DebugShim<String>,
    timeout: Duration,
}

impl Api {
    /// Construct a new client
    ///
    /// `http` should not carry a total request timeout, since it is also used
    /// to hold the stream open.  `timeout` bounds every other request.
    pub fn new(http: reqwest::Client, token: String, timeout: Duration) -> Self {
        Self {
            http,
            token: token.into(),
            timeout,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{API_BASE}{path}"))
            .bearer_auth(&self.token.0)
    }

    async fn send<T: serde::de::DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        req.timeout(self.timeout)
            .send()
            .await
            .context("Error sending API request")?
            .error_for_status()
            .context("API request failed")?
            .json()
            .await
            .context("Error parsing API response")
    }

    /// Look up an account by its handle, with or without a leading `@`
    #[instrument(level = "debug", skip(self))]
    pub async fn user_by_name(&self, name: &str) -> Result<Account> {
        let name = name.trim_start_matches('@');
        ensure!(
            !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
            "Invalid account name {name:?}"
        );

        let env: Envelope<Account> = self.send(
            self.request(reqwest::Method::GET, &format!("/users/by/username/{name}"))
                .query(&[("user.fields", "profile_image_url")]),
        )
        .await?;

        env.into_data()
    }

    pub async fn rules(&self) -> Result<Vec<Rule>> {
        let env: Envelope<Vec<Rule>> =
            self.send(self.request(reqwest::Method::GET, "/tweets/search/stream/rules")).await?;

        // No data means no rules
        Ok(env.data.unwrap_or_default())
    }

    /// Replace our stream rules so exactly the given accounts are followed
    #[instrument(level = "debug", skip(self, followed))]
    pub async fn sync_rules<'a>(&self, followed: impl IntoIterator<Item = &'a str>) -> Result {
        let diff = RuleDiff::new(&self.rules().await?, followed);
        if diff.is_empty() {
            return Ok(());
        }

        debug!(add = diff.add.len(), delete = diff.delete.len(), "Updating stream rules");

        if !diff.delete.is_empty() {
            let _: serde_json::Value = self.send(
                self.request(reqwest::Method::POST, "/tweets/search/stream/rules")
                    .json(&serde_json::json!({ "delete": { "ids": diff.delete } })),
            )
            .await
            .context("Error deleting stream rules")?;
        }

        if !diff.add.is_empty() {
            let _: serde_json::Value = self.send(
                self.request(reqwest::Method::POST, "/tweets/search/stream/rules")
                    .json(&serde_json::json!({ "add": diff.add })),
            )
            .await
            .context("Error adding stream rules")?;
        }

        Ok(())
    }

    /// Open the filtered stream
    pub async fn connect(&self) -> Result<reqwest::Response> {
        self.request(reqwest::Method::GET, "/tweets/search/stream")
            .query(&STREAM_FIELDS)
            .send()
            .await
            .context("Error connecting to stream")?
            .error_for_status()
            .context("Stream connection refused")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, value: &str, tag: Option<&str>) -> Rule {
        Rule {
            id: Some(id.into()),
            value: value.into(),
            tag: tag.map(Into::into),
        }
    }

    #[test]
    fn test_follow_rule() {
        let r = Rule::follow("42");
        assert_eq!(r.value, "from:42 OR to:42");
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            serde_json::json!({ "value": "from:42 OR to:42", "tag": "kanobot:42" })
        );
    }

    #[test]
    fn test_rule_diff() {
        let current = [
            rule("1", "from:1 OR to:1", Some("kanobot:1")),
            rule("2", "from:2 OR to:2", Some("kanobot:2")),
            rule("3", "cats has:images", Some("someone else")),
        ];

        let diff = RuleDiff::new(&current, ["2", "4", "4"]);
        assert_eq!(diff.delete, ["1"]);
        assert_eq!(diff.add, [Rule::follow("4")]);

        assert!(RuleDiff::new(&current[..2], ["1", "2"]).is_empty());
        assert_eq!(RuleDiff::new(&current, []).delete, ["1", "2"]);
    }

    #[test]
    fn test_envelope_errors() {
        let env: Envelope<Account> = serde_json::from_str(
            r#"{ "errors": [{ "title": "Not Found Error", "detail": "Could not find user" }] }"#,
        )
        .unwrap();

        assert_eq!(
            env.into_data().unwrap_err().to_string(),
            "Not Found Error: Could not find user"
        );
    }
}
