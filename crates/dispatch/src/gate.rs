//! Permission gates wrapped around command handlers

use crate::{
    args::Args,
    command::{Command, CommandInfo, Tier},
    dispatch::Invocation,
    error::{CommandResult, PermissionsError},
    outbound::Platform,
    prelude::*,
};

/// An optional subsystem a command may depend on
pub trait Capability: fmt::Debug + Send + Sync {
    /// A human-readable name for this subsystem
    fn name(&self) -> &str;

    /// Returns true if this subsystem is initialized and usable
    fn is_available(&self) -> bool;
}

/// A single permission check
#[derive(Debug, Clone)]
pub enum Gate {
    /// Only the configured owner, or an invocation with no message
    Owner,
    /// Configured admin users, or guild administrators
    Admin,
    /// Configured dev users
    Dev,
    /// Anyone, provided the given subsystem is available
    Requires(Arc<dyn Capability>),
}

impl Gate {
    /// The permission level this gate imposes
    #[must_use]
    pub fn tier(&self) -> Tier {
        match self {
            Self::Owner => Tier::Owner,
            Self::Admin => Tier::Admin,
            Self::Dev => Tier::Dev,
            Self::Requires(_) => Tier::Public,
        }
    }

    /// Check this gate against an invocation
    ///
    /// # Errors
    /// This method returns an error describing why the invoking user was
    /// rejected.
    pub async fn check<P: Platform>(&self, inv: &Invocation<'_, P>) -> Result<(), PermissionsError> {
        let (ok, reason) = match self {
            Self::Owner => (inv.is_owner(), "only the owner can use this command".into()),
            Self::Admin => (
                inv.is_admin().await,
                "only admin users can use this command".into(),
            ),
            Self::Dev => (inv.is_dev(), "only dev users can use this command".into()),
            Self::Requires(cap) => (cap.is_available(), format!("{} is not configured", cap.name())),
        };

        if ok {
            Ok(())
        } else {
            debug!(gate = ?self, command = inv.command, "Permission check failed");
            Err(PermissionsError::new(reason))
        }
    }
}

/// A command wrapped in a permission gate
///
/// Gates compose by wrapping, and the outermost gate is checked first.
#[derive(Debug)]
pub struct Gated<H> {
    gate: Gate,
    inner: H,
}

#[async_trait]
impl<P: Platform, H: Command<P>> Command<P> for Gated<H> {
    fn info(&self) -> CommandInfo {
        let mut info = self.inner.info();
        info.raise_tier(self.gate.tier());
        info
    }

    async fn run(&self, inv: &Invocation<'_, P>, args: &Args) -> CommandResult {
        self.gate.check(inv).await?;
        self.inner.run(inv, args).await
    }
}

/// Helpers for wrapping commands in gates
pub trait CommandExt: Sized {
    /// Wrap this command in the given gate
    fn gated(self, gate: Gate) -> Gated<Self> { Gated { gate, inner: self } }

    /// Restrict this command to the owner
    fn owner_only(self) -> Gated<Self> { self.gated(Gate::Owner) }

    /// Restrict this command to admin users
    fn admin_only(self) -> Gated<Self> { self.gated(Gate::Admin) }

    /// Restrict this command to dev users
    fn dev_only(self) -> Gated<Self> { self.gated(Gate::Dev) }

    /// Disable this command unless the given subsystem is available
    fn requires(self, cap: Arc<dyn Capability>) -> Gated<Self> { self.gated(Gate::Requires(cap)) }
}

impl<T: fmt::Debug + Send + Sync> CommandExt for T {}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::{
        command::CommandTable,
        config::{DispatchConfig, Identity},
        error::Error,
        mock::{self, MockPlatform},
        Response,
    };

    #[derive(Debug)]
    struct Ping;

    #[async_trait]
    impl Command<MockPlatform> for Ping {
        fn info(&self) -> CommandInfo { CommandInfo::new("ping", []) }

        async fn run(&self, _: &Invocation<'_, MockPlatform>, _: &Args) -> CommandResult {
            Ok(Some(Response::new("pong")))
        }
    }

    #[derive(Debug)]
    struct Toggle(AtomicBool);

    impl Capability for Toggle {
        fn name(&self) -> &str { "Twitter" }

        fn is_available(&self) -> bool { self.0.load(Ordering::SeqCst) }
    }

    struct Fixture {
        platform: MockPlatform,
        config: DispatchConfig,
        identity: Identity,
        commands: CommandTable<MockPlatform>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                platform: MockPlatform::default(),
                config: DispatchConfig {
                    owner_id: Some(UserId::new(1)),
                    admin_ids: [UserId::new(2)].into_iter().collect(),
                    dev_ids: [UserId::new(1), UserId::new(3)].into_iter().collect(),
                    ..DispatchConfig::default()
                },
                identity: Identity {
                    id: UserId::new(99),
                    name: "bot".into(),
                    avatar_url: None,
                },
                commands: CommandTable::new([]).unwrap(),
            }
        }

        async fn run(
            &self,
            cmd: &(dyn Command<MockPlatform>),
            msg: Option<&crate::InboundMessage>,
        ) -> CommandResult {
            let inv = Invocation::new(
                &self.platform,
                &self.config,
                &self.identity,
                &self.commands,
                msg,
                "ping",
            );
            cmd.run(&inv, &Args::default()).await
        }
    }

    fn reason(res: CommandResult) -> String {
        match res {
            Err(Error::Permissions(e)) => e.reason().to_owned(),
            r => panic!("Expected permissions error, got {r:?}"),
        }
    }

    #[tokio::test]
    async fn test_owner() {
        let fx = Fixture::new();
        let cmd = Ping.owner_only();

        let owner = mock::guild_message(mock::user(1, "Owner"), "!ping");
        let other = mock::guild_message(mock::user(5, "Other"), "!ping");

        assert!(fx.run(&cmd, Some(&owner)).await.is_ok());
        assert!(fx.run(&cmd, None).await.is_ok());

        let err = fx.run(&cmd, Some(&other)).await.unwrap_err();
        let (msg, expiry) = err.user_facing().unwrap();
        assert!(msg.starts_with("You don't have permission to use that command.\nReason: "));
        assert_eq!(expiry, Duration::from_secs(30));
        assert_eq!(
            reason(fx.run(&cmd, Some(&other)).await),
            "only the owner can use this command"
        );
    }

    #[tokio::test]
    async fn test_admin() {
        let fx = Fixture::new();
        let cmd = Ping.admin_only();

        let listed = mock::guild_message(mock::user(2, "Listed"), "!ping");
        let guild_admin = mock::guild_message(mock::user(7, "Mod"), "!ping");
        let other = mock::guild_message(mock::user(5, "Other"), "!ping");

        assert!(fx.run(&cmd, Some(&listed)).await.is_ok());
        assert_eq!(
            reason(fx.run(&cmd, Some(&guild_admin)).await),
            "only admin users can use this command"
        );

        fx.platform.grant_admin(mock::GUILD, 7_u64);
        assert!(fx.run(&cmd, Some(&guild_admin)).await.is_ok());
        assert!(fx.run(&cmd, Some(&other)).await.is_err());
    }

    #[tokio::test]
    async fn test_dev_and_capability() {
        let fx = Fixture::new();
        let toggle = Arc::new(Toggle(AtomicBool::new(false)));
        let cmd = Ping.dev_only().requires(Arc::clone(&toggle) as Arc<dyn Capability>);

        let dev = mock::guild_message(mock::user(3, "Dev"), "!ping");
        let other = mock::guild_message(mock::user(5, "Other"), "!ping");

        // Outermost gate is checked first
        assert_eq!(
            reason(fx.run(&cmd, Some(&other)).await),
            "Twitter is not configured"
        );

        toggle.0.store(true, Ordering::SeqCst);
        assert_eq!(
            reason(fx.run(&cmd, Some(&other)).await),
            "only dev users can use this command"
        );
        assert!(fx.run(&cmd, Some(&dev)).await.is_ok());
    }

    #[test]
    fn test_tier() {
        let info = Command::<MockPlatform>::info(&Ping.admin_only().owner_only());
        assert_eq!(info.tier(), Tier::Owner);

        let info = Command::<MockPlatform>::info(&Ping.owner_only().admin_only());
        assert_eq!(info.tier(), Tier::Owner);

        let info = Command::<MockPlatform>::info(&Ping);
        assert_eq!(info.tier(), Tier::Public);
    }
}
