mod help;
mod id;
mod joinserver;
mod kick;
mod purge;
mod restart;
mod setavatar;
mod setname;
mod shutdown;
mod twitter;

pub(self) mod prelude {
    pub use kano_dispatch::{
        args::ContextKey, response::render, Args, Command, CommandError, CommandExt,
        CommandInfo, CommandResult, Invocation, Param, PlatformExt, Response, SendOpts, Signal,
        Tier,
    };
    pub use serenity::model::id::{ChannelId, GuildId, UserId};

    pub use super::super::operator::Operator;
    pub use crate::prelude::*;

    #[inline]
    pub fn secs(n: u64) -> Duration { Duration::from_secs(n) }
}

use kano_dispatch::{Capability, CommandExt};

use crate::{feed::FeedSlot, prelude::Arc};

/// Shared resources handed to command constructors
#[derive(Debug, Clone)]
pub struct CommandDeps {
    pub http: reqwest::Client,
    pub feed: Arc<FeedSlot>,
}

pub fn list<P: prelude::Operator>(deps: &CommandDeps) -> Vec<Arc<dyn prelude::Command<P>>> {
    let feed = || Arc::clone(&deps.feed) as Arc<dyn Capability>;

    vec![
        Arc::new(help::HelpCommand),
        Arc::new(id::IdCommand),
        Arc::new(joinserver::JoinServerCommand.admin_only()),
        Arc::new(kick::KickCommand.admin_only()),
        Arc::new(purge::PurgeCommand.admin_only()),
        Arc::new(restart::RestartCommand.admin_only()),
        Arc::new(setavatar::SetAvatarCommand::new(deps.http.clone()).owner_only()),
        Arc::new(setname::SetNameCommand.owner_only()),
        Arc::new(shutdown::ShutdownCommand.owner_only()),
        Arc::new(
            twitter::SetTwitterCommand::new(Arc::clone(&deps.feed))
                .requires(feed())
                .admin_only(),
        ),
        Arc::new(
            twitter::ReloadTwitterCommand::new(Arc::clone(&deps.feed))
                .requires(feed())
                .admin_only(),
        ),
    ]
}

#[cfg(test)]
pub(super) mod test_util {
    use kano_dispatch::{mock as dmock, DispatchConfig, InboundMessage, Signal};

    use super::{super::operator::mock::*, *};

    pub fn deps() -> CommandDeps {
        CommandDeps {
            http: reqwest::Client::new(),
            feed: Arc::default(),
        }
    }

    /// Dispatch one message through the full command set
    pub async fn run(
        cfg: DispatchConfig,
        msg: &InboundMessage,
    ) -> (MockOperator, Result<(), Signal>) {
        let op = MockOperator::default();
        let res = dispatcher(cfg, &deps()).dispatch(&op, msg).await;
        (op, res)
    }

    pub fn owner() -> kano_dispatch::User { dmock::user(OWNER, "Owner") }

    pub fn member() -> kano_dispatch::User { dmock::user(42, "Member") }
}

#[cfg(test)]
mod tests {
    use kano_dispatch::CommandTable;

    use super::{super::operator::mock::MockOperator, *};

    #[test]
    fn test_no_duplicates() {
        let table = CommandTable::<MockOperator>::new(list(&test_util::deps())).unwrap();
        assert_eq!(table.len(), 11);

        let tier = |n: &str| table.get(n).unwrap().info().tier();
        assert_eq!(tier("help"), prelude::Tier::Public);
        assert_eq!(tier("purge"), prelude::Tier::Admin);
        assert_eq!(tier("set_twitter"), prelude::Tier::Admin);
        assert_eq!(tier("shutdown"), prelude::Tier::Owner);
    }
}
