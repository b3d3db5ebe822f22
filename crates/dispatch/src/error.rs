//! Failure kinds a command can raise
//!
//! User-facing errors ([`CommandError`], [`PermissionsError`],
//! [`HelpfulError`]) are shown in chat and always carry an expiry.
//! [`Signal`]s unwind past the dispatcher to the run loop, and anything else
//! is logged and only echoed to chat in debug mode.

use crate::{prelude::*, response::Response};

/// How long permission failures stay visible
pub const PERMISSION_EXPIRY: Duration = Duration::from_secs(30);

/// Wrap width used when formatting [`HelpfulError`]s
pub const HELPFUL_WRAP_WIDTH: usize = 80;

/// An expected failure whose message is shown to the user
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
    expire_in: Duration,
}

impl CommandError {
    /// Construct a new error that never expires
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            expire_in: Duration::ZERO,
        }
    }

    /// Set how long the error message stays visible
    #[inline]
    #[must_use]
    pub fn expire_in(self, expire_in: Duration) -> Self { Self { expire_in, ..self } }

    /// The message to show the user
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str { &self.message }

    /// How long the error message stays visible
    #[inline]
    #[must_use]
    pub fn expiry(&self) -> Duration { self.expire_in }
}

/// A permission gate rejected the invoking user
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("You don't have permission to use that command.\nReason: {reason}")]
pub struct PermissionsError {
    reason: String,
    expire_in: Duration,
}

impl PermissionsError {
    /// Construct a new error with the standard expiry
    #[inline]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            expire_in: PERMISSION_EXPIRY,
        }
    }

    /// The gate-specific reason for the rejection
    #[inline]
    #[must_use]
    pub fn reason(&self) -> &str { &self.reason }

    /// The full message to show the user
    #[inline]
    #[must_use]
    pub fn message(&self) -> String { self.to_string() }

    /// How long the error message stays visible
    #[inline]
    #[must_use]
    pub fn expiry(&self) -> Duration { self.expire_in }
}

/// An error walking the user through a problem and its solution
///
/// Mostly raised while loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpfulError {
    issue: String,
    solution: String,
    preface: String,
    footnote: String,
    expire_in: Duration,
}

impl HelpfulError {
    /// Construct a new error from a problem description and its fix
    #[inline]
    pub fn new(issue: impl Into<String>, solution: impl Into<String>) -> Self {
        Self {
            issue: issue.into(),
            solution: solution.into(),
            preface: "An error has occured:".into(),
            footnote: String::new(),
            expire_in: Duration::ZERO,
        }
    }

    /// Replace the leading line of the message
    #[inline]
    #[must_use]
    pub fn preface(self, preface: impl Into<String>) -> Self {
        Self {
            preface: preface.into(),
            ..self
        }
    }

    /// Set a trailing note for the message
    #[inline]
    #[must_use]
    pub fn footnote(self, footnote: impl Into<String>) -> Self {
        Self {
            footnote: footnote.into(),
            ..self
        }
    }

    /// Set how long the error message stays visible
    #[inline]
    #[must_use]
    pub fn expire_in(self, expire_in: Duration) -> Self { Self { expire_in, ..self } }

    /// How long the error message stays visible
    #[inline]
    #[must_use]
    pub fn expiry(&self) -> Duration { self.expire_in }

    /// The message, with the problem and solution word-wrapped
    #[must_use]
    pub fn message(&self) -> String { self.format(Some(HELPFUL_WRAP_WIDTH)) }

    /// The message without any wrapping
    #[must_use]
    pub fn message_no_format(&self) -> String { self.format(None) }

    fn format(&self, width: Option<usize>) -> String {
        let mut s = format!(
            "{}\n{}\n\n{}",
            self.preface,
            pretty_wrap(&self.issue, "  Problem:", width),
            pretty_wrap(&self.solution, "  Solution:", width),
        );

        if !self.footnote.is_empty() {
            s.push_str("\n\n");
            s.push_str(&self.footnote);
        }

        s
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message_no_format())
    }
}

impl std::error::Error for HelpfulError {}

fn pretty_wrap(text: &str, pretext: &str, width: Option<usize>) -> String {
    let Some(width) = width else {
        return format!("{}\n{text}", pretext.trim());
    };

    let mut out = pretext.trim_end().to_owned();
    for line in wrap(text, width.saturating_sub(5).max(1)) {
        out.push_str("\n    ");
        out.push_str(&line);
    }

    out
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = vec![];
    let mut line = String::new();

    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }

        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }

    if !line.is_empty() {
        lines.push(line);
    }

    lines
}

/// A control-flow request for the outer run loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Signal {
    /// Tear down the client and start a new one
    #[error("Restart requested")]
    Restart,
    /// Shut the process down
    #[error("Termination requested")]
    Terminate,
}

/// Any failure a command handler can return
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An expected, user-facing failure
    #[error(transparent)]
    Command(#[from] CommandError),
    /// A permission gate rejected the invoking user
    #[error(transparent)]
    Permissions(#[from] PermissionsError),
    /// A problem/solution style failure
    #[error(transparent)]
    Helpful(#[from] HelpfulError),
    /// A request to restart or terminate
    #[error("Control signal: {0}")]
    Signal(#[from] Signal),
    /// An unexpected error
    #[error("Unexpected error: {0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// The message and expiry to show in chat, if this error is user-facing
    #[must_use]
    pub fn user_facing(&self) -> Option<(String, Duration)> {
        match self {
            Self::Command(e) => Some((e.message().to_owned(), e.expiry())),
            Self::Permissions(e) => Some((e.message(), e.expiry())),
            Self::Helpful(e) => Some((e.message(), e.expiry())),
            Self::Signal(_) | Self::Other(_) => None,
        }
    }

    /// A short name for the kind of this error, for logging
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Command(_) => "CommandError",
            Self::Permissions(_) => "PermissionsError",
            Self::Helpful(_) => "HelpfulError",
            Self::Signal(Signal::Restart) => "RestartSignal",
            Self::Signal(Signal::Terminate) => "TerminateSignal",
            Self::Other(_) => "Error",
        }
    }
}

/// Return type for command handlers
pub type CommandResult = Result<Option<Response>, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissions_message() {
        let err = PermissionsError::new("only the owner can use this command");
        assert_eq!(
            err.message(),
            "You don't have permission to use that command.\nReason: only the owner can use \
             this command"
        );
        assert_eq!(err.expiry(), Duration::from_secs(30));

        let err = Error::from(err);
        let (msg, expiry) = err.user_facing().unwrap();
        assert!(msg.starts_with("You don't have permission to use that command.\nReason: "));
        assert_eq!(expiry, PERMISSION_EXPIRY);
    }

    #[test]
    fn test_helpful_format() {
        let err = HelpfulError::new("No OwnerID was set.", "Please set the OwnerID option.")
            .preface("An error has occured reading the config:");

        assert_eq!(
            err.message_no_format(),
            "An error has occured reading the config:\nProblem:\nNo OwnerID was set.\n\n\
             Solution:\nPlease set the OwnerID option."
        );
        assert_eq!(
            err.message(),
            "An error has occured reading the config:\n  Problem:\n    No OwnerID was set.\n\n  \
             Solution:\n    Please set the OwnerID option."
        );
    }

    #[test]
    fn test_wrap() {
        let text = "one two three four five six seven";
        let lines = wrap(text, 10);
        assert_eq!(lines, ["one two", "three four", "five six", "seven"]);
        assert!(lines.iter().all(|l| l.len() <= 10));
    }

    #[test]
    fn test_signals_not_user_facing() {
        assert!(Error::from(Signal::Restart).user_facing().is_none());
        assert!(Error::from(anyhow::anyhow!("oops")).user_facing().is_none());
        assert_eq!(
            Error::from(CommandError::new("nope").expire_in(Duration::from_secs(20))).user_facing(),
            Some(("nope".to_owned(), Duration::from_secs(20)))
        );
    }
}
