//! Prefix-command dispatch for Serenity bots
//!
//! Turns raw chat messages into calls against plain command handlers:
//! tokenizing, binding tokens to each handler's declared parameters, running
//! the permission gates wrapped around it, and turning its return value back
//! into outbound messages with automatic expiry and cleanup.

#![deny(
    clippy::disallowed_methods,
    clippy::suspicious,
    clippy::style,
    clippy::clone_on_ref_ptr,
    missing_debug_implementations,
    missing_copy_implementations
)]
#![warn(clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod args;
pub mod canned;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod message;
#[cfg(any(test, feature = "test"))]
pub mod mock;
pub mod outbound;
pub mod response;

pub use args::{Args, ContextKey, Param};
pub use canned::CannedReplies;
pub use command::{Command, CommandInfo, CommandTable, Tier};
pub use config::{DispatchConfig, Identity};
pub use dispatch::{Dispatcher, Invocation};
pub use error::{CommandError, CommandResult, Error, HelpfulError, PermissionsError, Signal};
pub use gate::{Capability, CommandExt, Gate, Gated};
pub use message::{InboundMessage, MessageRef, User};
pub use outbound::{DeleteError, Platform, PlatformExt, SendError, SendOpts};
pub use response::{Codeblock, Content, Embed, Response};

mod prelude {
    #![allow(unused_imports)]

    pub use std::{
        borrow::Cow,
        collections::{BTreeMap, BTreeSet},
        fmt,
        str::FromStr,
        sync::Arc,
        time::Duration,
    };

    pub use async_trait::async_trait;
    pub use hashbrown::{HashMap, HashSet};
    pub use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};
    pub use tracing::{debug, error, info, instrument, trace, warn, Instrument};
}
