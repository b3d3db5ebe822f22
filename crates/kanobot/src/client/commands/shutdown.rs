use super::prelude::*;

#[derive(Debug, Default)]
pub struct ShutdownCommand;

#[async_trait]
impl<P: Operator> Command<P> for ShutdownCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::new("shutdown", [Param::context(ContextKey::Channel)])
    }

    async fn run(&self, inv: &Invocation<'_, P>, args: &Args) -> CommandResult {
        let channel = args.channel().context("Missing invoking channel")?;

        inv.platform
            .safe_send(channel, "\u{1f44b} Shutting down.".into(), SendOpts::default())
            .await;

        Err(Signal::Terminate.into())
    }
}

#[cfg(test)]
mod tests {
    use kano_dispatch::{mock, Signal};

    use super::super::test_util::*;
    use crate::client::operator::mock::config;

    #[tokio::test]
    async fn test_owner_only() {
        let msg = mock::guild_message(member(), "!shutdown");
        let (op, res) = run(config(), &msg).await;

        assert_eq!(res, Ok(()));
        assert_eq!(op.platform.sent_text(), [
            "```\nYou don't have permission to use that command.\nReason: only the owner can use \
             this command\n```"
        ]);
    }

    #[tokio::test]
    async fn test_shutdown() {
        let msg = mock::guild_message(owner(), "!shutdown");
        let (op, res) = run(config(), &msg).await;

        assert_eq!(res, Err(Signal::Terminate));
        assert_eq!(op.platform.sent_text(), ["\u{1f44b} Shutting down."]);
    }
}
