use super::prelude::*;

#[derive(Debug, Default)]
pub struct RestartCommand;

#[async_trait]
impl<P: Operator> Command<P> for RestartCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::new("restart", [Param::context(ContextKey::Channel)]).doc(
            "
            Usage:
                {command_prefix}restart

            Restarts the bot.
            ",
        )
    }

    async fn run(&self, inv: &Invocation<'_, P>, args: &Args) -> CommandResult {
        let channel = args.channel().context("Missing invoking channel")?;

        let msg = inv
            .platform
            .safe_send(channel, "\u{1f44b} Restarting.".into(), SendOpts::default())
            .await;
        tokio::time::sleep(secs(3)).await;

        if let Some(msg) = msg {
            inv.platform.safe_delete(msg, false).await;
        }

        Err(Signal::Restart.into())
    }
}

#[cfg(test)]
mod tests {
    use kano_dispatch::{mock, Signal};

    use super::super::test_util::*;
    use crate::client::operator::mock::config;

    #[tokio::test(start_paused = true)]
    async fn test_restart() {
        let mut cfg = config();
        cfg.admin_ids.insert(42_u64.into());

        let msg = mock::guild_message(member(), "!restart");
        let (op, res) = run(cfg, &msg).await;

        assert_eq!(res, Err(Signal::Restart));
        assert_eq!(op.platform.sent_text(), ["\u{1f44b} Restarting."]);
        assert_eq!(op.platform.deleted(), [op.platform.sent()[0].handle()]);
    }
}
