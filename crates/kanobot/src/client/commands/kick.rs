use super::prelude::*;

#[derive(Debug, Default)]
pub struct KickCommand;

#[async_trait]
impl<P: Operator> Command<P> for KickCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::new("kick", [
            Param::context(ContextKey::Guild),
            Param::context(ContextKey::UserMentions),
        ])
        .doc(
            "
            Usage:
                {command_prefix}kick @user

            Kick user from server.
            ",
        )
    }

    async fn run(&self, inv: &Invocation<'_, P>, args: &Args) -> CommandResult {
        let guild = args
            .guild()
            .ok_or_else(|| CommandError::new("This command can only be used in a server"))?;

        let mut names = vec![];
        for user in args.user_mentions() {
            inv.platform
                .kick(guild, user.id)
                .await
                .with_context(|| format!("Error kicking {}", user.id))?;
            names.push(user.name.as_str());
        }

        Ok(Some(Response::new(format!(
            "successfully kicked {} from this server!",
            names.join(", ")
        ))))
    }
}

#[cfg(test)]
mod tests {
    use kano_dispatch::mock;
    use serenity::model::id::{GuildId, UserId};

    use super::super::test_util::*;
    use crate::client::operator::mock::config;

    #[tokio::test]
    async fn test_kick() {
        let mut cfg = config();
        cfg.admin_ids.insert(42_u64.into());

        let mut msg = mock::guild_message(member(), "!kick <@7> <@8>");
        msg.mentions = vec![mock::user(7, "Bob"), mock::user(8, "Eve")];
        let (op, _) = run(cfg, &msg).await;

        let guild = GuildId::new(mock::GUILD);
        assert_eq!(op.state.lock().kicked, [
            (guild, UserId::new(7)),
            (guild, UserId::new(8))
        ]);
        assert_eq!(op.platform.sent_text(), [
            "successfully kicked Bob, Eve from this server!"
        ]);
    }
}
