//! The value a command returns, and how it is turned into outbound content

mod embed;
pub mod render;

pub use embed::*;

use crate::prelude::*;

/// The body of an outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Plain message text
    Text(String),
    /// A rich content embed
    Embed(Embed),
}

impl Content {
    /// Construct plain-text content
    #[inline]
    pub fn text(s: impl Into<String>) -> Self { Self::Text(s.into()) }

    /// Get the text of this content, if it is plain text
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            Self::Embed(_) => None,
        }
    }

    /// Get the embed of this content, if it is rich content
    #[inline]
    #[must_use]
    pub fn as_embed(&self) -> Option<&Embed> {
        match self {
            Self::Text(_) => None,
            Self::Embed(e) => Some(e),
        }
    }

    /// Approximate number of characters this content occupies
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(s) => s.chars().count(),
            Self::Embed(e) => e.len(),
        }
    }

    /// Returns true if this content has no text at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl From<String> for Content {
    fn from(s: String) -> Self { Self::Text(s) }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self { Self::Text(s.into()) }
}

impl From<Embed> for Content {
    fn from(e: Embed) -> Self { Self::Embed(e) }
}

/// Whether, and how, to fence response text as a code block
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Codeblock {
    /// Send the text as-is
    #[default]
    Off,
    /// Fence the text with no language tag
    Plain,
    /// Fence the text with the given language tag
    Lang(String),
}

/// What a command sends back, and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    content: Content,
    reply: bool,
    delete_after: Duration,
    codeblock: Codeblock,
    embed: bool,
}

impl Response {
    /// Construct a new response with default options
    #[inline]
    pub fn new(content: impl Into<Content>) -> Self {
        Self {
            content: content.into(),
            reply: false,
            delete_after: Duration::ZERO,
            codeblock: Codeblock::Off,
            embed: true,
        }
    }

    /// Set whether to mention the invoking user
    #[inline]
    #[must_use]
    pub fn reply(self, reply: bool) -> Self { Self { reply, ..self } }

    /// Set how long after sending to delete the response, or zero for never
    #[inline]
    #[must_use]
    pub fn delete_after(self, delete_after: Duration) -> Self {
        Self {
            delete_after,
            ..self
        }
    }

    /// Set whether to fence the response text as a code block
    #[inline]
    #[must_use]
    pub fn codeblock(self, codeblock: Codeblock) -> Self { Self { codeblock, ..self } }

    /// Set whether the response may be rendered as an embed
    #[inline]
    #[must_use]
    pub fn embed(self, embed: bool) -> Self { Self { embed, ..self } }

    /// Whether to mention the invoking user
    #[inline]
    #[must_use]
    pub fn is_reply(&self) -> bool { self.reply }

    /// How long after sending to delete the response
    #[inline]
    #[must_use]
    pub fn expiry(&self) -> Duration { self.delete_after }

    /// Whether the response may be rendered as an embed
    #[inline]
    #[must_use]
    pub fn allows_embed(&self) -> bool { self.embed }

    /// The content as it will be rendered, with any code fence applied
    #[must_use]
    pub fn content(&self) -> Content { self.clone().into_content() }

    /// Consume the response, yielding its rendered content
    #[must_use]
    pub fn into_content(self) -> Content {
        let Self {
            content, codeblock, ..
        } = self;

        match (content, codeblock) {
            (c, Codeblock::Off) | (c @ Content::Embed(_), _) => c,
            (Content::Text(s), Codeblock::Plain) => Content::Text(render::codeblock(&s, None)),
            (Content::Text(s), Codeblock::Lang(l)) => {
                Content::Text(render::codeblock(&s, Some(l.as_str())))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codeblock() {
        let res = Response::new("hi").codeblock(Codeblock::Plain);
        assert_eq!(res.content(), Content::text("```\nhi\n```"));

        let res = Response::new("fn main() {}").codeblock(Codeblock::Lang("rs".into()));
        assert_eq!(res.content(), Content::text("```rs\nfn main() {}\n```"));

        let res = Response::new("hi");
        assert_eq!(res.content(), Content::text("hi"));
    }

    #[test]
    fn test_codeblock_ignores_embeds() {
        let embed = Embed::default().title("t");
        let res = Response::new(embed.clone()).codeblock(Codeblock::Plain);
        assert_eq!(res.into_content(), Content::Embed(embed));
    }

    #[test]
    fn test_defaults() {
        let res = Response::new("x");
        assert!(!res.is_reply());
        assert!(res.allows_embed());
        assert_eq!(res.expiry(), Duration::ZERO);
    }
}
