//! Per-guild canned replies for otherwise unknown commands

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Reply templates keyed by guild ID, then by trigger word
///
/// Serialized as `{ "<guild id>": { "<trigger>": ["template", ...] } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CannedReplies(BTreeMap<u64, BTreeMap<String, Vec<String>>>);

impl CannedReplies {
    /// Get every template registered for a trigger in a guild
    #[must_use]
    pub fn lookup(&self, guild: GuildId, trigger: &str) -> Option<&[String]> {
        self.0
            .get(&guild.get())?
            .get(trigger)
            .map(Vec::as_slice)
            .filter(|t| !t.is_empty())
    }

    /// Pick a random template for a trigger and fill it in with `args`
    ///
    /// Returns `None` if there is no such trigger or the chosen template
    /// could not be filled in.
    #[must_use]
    pub fn pick(&self, guild: GuildId, trigger: &str, args: &[String]) -> Option<String> {
        let template = self.lookup(guild, trigger)?.choose(&mut rand::thread_rng())?;
        let ret = format(template, args);

        if ret.is_none() {
            debug!(%template, "Couldn't fill in canned reply");
        }

        ret
    }

    /// Register a new template for a trigger in a guild
    pub fn insert(&mut self, guild: GuildId, trigger: impl Into<String>, template: impl Into<String>) {
        self.0
            .entry(guild.get())
            .or_default()
            .entry(trigger.into())
            .or_default()
            .push(template.into());
    }

    /// Returns true if no templates are registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.values().all(BTreeMap::is_empty) }
}

/// Fill in `{}` and `{N}` placeholders from `args`
///
/// `{{` and `}}` produce literal braces.  Returns `None` for malformed
/// placeholders or out-of-range indices.
#[must_use]
pub fn format(template: &str, args: &[String]) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    let mut next = 0;

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            },
            '{' => {
                let mut spec = String::new();
                loop {
                    match chars.next()? {
                        '}' => break,
                        c => spec.push(c),
                    }
                }

                let idx = if spec.is_empty() {
                    next += 1;
                    next - 1
                } else {
                    spec.parse::<usize>().ok()?
                };

                out.push_str(args.get(idx)?);
            },
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            },
            '}' => return None,
            c => out.push(c),
        }
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &[&str]) -> Vec<String> { s.iter().map(|&s| s.into()).collect() }

    #[test]
    fn test_format() {
        let a = args(&["cat", "dog"]);

        assert_eq!(format("no args", &a).as_deref(), Some("no args"));
        assert_eq!(format("{} and {}", &a).as_deref(), Some("cat and dog"));
        assert_eq!(format("{1} before {0}", &a).as_deref(), Some("dog before cat"));
        assert_eq!(format("{{literal}}", &a).as_deref(), Some("{literal}"));
        assert_eq!(format("{2}", &a), None);
        assert_eq!(format("{} {} {}", &a), None);
        assert_eq!(format("{name}", &a), None);
        assert_eq!(format("{unclosed", &a), None);
        assert_eq!(format("stray }", &a), None);
    }

    #[test]
    fn test_pick() {
        let guild = GuildId::new(5);
        let mut replies = CannedReplies::default();
        assert!(replies.is_empty());

        replies.insert(guild, "cat", "meow at {}");
        assert!(!replies.is_empty());

        assert_eq!(
            replies.pick(guild, "cat", &args(&["you"])).as_deref(),
            Some("meow at you")
        );
        assert_eq!(replies.pick(guild, "cat", &[]), None);
        assert_eq!(replies.pick(guild, "dog", &[]), None);
        assert_eq!(replies.pick(GuildId::new(6), "cat", &[]), None);
    }

    #[test]
    fn test_deserialize() {
        let replies: CannedReplies =
            serde_json::from_str(r#"{ "42": { "hello": ["hi!", "hey {0}"] } }"#).unwrap();

        assert_eq!(replies.lookup(GuildId::new(42), "hello").unwrap().len(), 2);
        assert!(replies.lookup(GuildId::new(42), "bye").is_none());
    }
}
