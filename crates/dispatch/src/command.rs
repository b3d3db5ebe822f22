//! Command descriptors and the table they are looked up in

use crate::{
    args::{Args, Param},
    dispatch::Invocation,
    error::CommandResult,
    outbound::Platform,
    prelude::*,
};

/// The permission level required to run a command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    /// Anyone may run the command
    #[default]
    Public,
    /// Only admin users may run the command
    Admin,
    /// Only the bot owner may run the command
    Owner,
    /// Only dev users may run the command
    Dev,
}

/// The descriptor of a command, built at registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    name: String,
    params: Vec<Param>,
    tier: Tier,
    doc: Option<String>,
}

impl CommandInfo {
    /// Describe a command with the given name and parameter list
    ///
    /// The name is lower-cased, as command lookup is case-insensitive.
    #[inline]
    pub fn new(name: impl AsRef<str>, params: impl IntoIterator<Item = Param>) -> Self {
        Self {
            name: name.as_ref().to_lowercase(),
            params: params.into_iter().collect(),
            tier: Tier::Public,
            doc: None,
        }
    }

    /// Set the usage documentation for this command
    ///
    /// `{command_prefix}` is replaced with the configured prefix when the
    /// documentation is shown.
    #[inline]
    #[must_use]
    pub fn doc(self, doc: impl Into<String>) -> Self {
        Self {
            doc: Some(doc.into()),
            ..self
        }
    }

    /// The name of this command
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    /// The declared parameters of this command
    #[inline]
    #[must_use]
    pub fn params(&self) -> &[Param] { &self.params }

    /// The permission level required to run this command
    #[inline]
    #[must_use]
    pub fn tier(&self) -> Tier { self.tier }

    pub(crate) fn raise_tier(&mut self, tier: Tier) { self.tier = self.tier.max(tier); }

    /// The usage text for this command
    ///
    /// Falls back to a generated `Usage:` line listing the positional
    /// parameters if no documentation was set.
    #[must_use]
    pub fn usage(&self, prefix: &str) -> String {
        if let Some(ref doc) = self.doc {
            return dedent(&doc.replace("{command_prefix}", prefix));
        }

        let keys: Vec<_> = self.params.iter().filter_map(Param::usage).collect();
        format!("Usage: {prefix}{} {}", self.name, keys.join(" "))
            .trim_end()
            .to_owned()
    }
}

fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    text.lines()
        .map(|l| l.get(indent..).unwrap_or_else(|| l.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}

/// A prefix command handler
#[async_trait]
pub trait Command<P: Platform>: fmt::Debug + Send + Sync {
    /// Describe this command
    fn info(&self) -> CommandInfo;

    /// Run this command with the arguments bound from an invocation
    async fn run(&self, inv: &Invocation<'_, P>, args: &Args) -> CommandResult;
}

/// An error constructing a [`CommandTable`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// Two handlers registered the same name
    #[error("Duplicate command name {0:?}")]
    Duplicate(String),
}

/// A registered command
pub struct Entry<P: Platform> {
    info: CommandInfo,
    handler: Arc<dyn Command<P>>,
}

impl<P: Platform> fmt::Debug for Entry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("info", &self.info)
            .field("handler", &self.handler)
            .finish()
    }
}

impl<P: Platform> Entry<P> {
    /// The descriptor of this command
    #[inline]
    #[must_use]
    pub fn info(&self) -> &CommandInfo { &self.info }

    /// The handler for this command
    #[inline]
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn Command<P>> { &self.handler }
}

/// An immutable mapping from command names to handlers
pub struct CommandTable<P: Platform>(BTreeMap<String, Entry<P>>);

impl<P: Platform> fmt::Debug for CommandTable<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl<P: Platform> CommandTable<P> {
    /// Build a table from a list of handlers
    ///
    /// # Errors
    /// This function returns an error if two handlers share a name.
    pub fn new(handlers: impl IntoIterator<Item = Arc<dyn Command<P>>>) -> Result<Self, TableError> {
        let mut map = BTreeMap::new();

        for handler in handlers {
            let info = handler.info();
            let name = info.name().to_owned();

            if map.contains_key(&name) {
                return Err(TableError::Duplicate(name));
            }

            trace!(%name, tier = ?info.tier(), "Registering command");
            map.insert(name, Entry { info, handler });
        }

        Ok(Self(map))
    }

    /// Look up a command by its (lower-case) name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Entry<P>> { self.0.get(name) }

    /// Iterate over every command, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &Entry<P>> { self.0.values() }

    /// The number of registered commands
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Returns true if no commands are registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}
