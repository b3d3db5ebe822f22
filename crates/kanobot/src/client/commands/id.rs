use super::prelude::*;

#[derive(Debug, Default)]
pub struct IdCommand;

#[async_trait]
impl<P: Operator> Command<P> for IdCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::new("id", [
            Param::context(ContextKey::Author),
            Param::context(ContextKey::UserMentions),
        ])
        .doc(
            "
            Usage:
                {command_prefix}id [@user]

            Tells the user their id or the id of another user.
            ",
        )
    }

    async fn run(&self, _: &Invocation<'_, P>, args: &Args) -> CommandResult {
        let text = if let Some(user) = args.user_mentions().first() {
            format!("**{}**'s ID is `{}`", user.name, user.id)
        } else {
            let author = args.author().context("Missing invoking user")?;
            format!("Your ID is `{}`", author.id)
        };

        Ok(Some(Response::new(text).reply(true).delete_after(secs(35))))
    }
}

#[cfg(test)]
mod tests {
    use kano_dispatch::mock;

    use super::super::test_util::*;
    use crate::client::operator::mock::config;

    #[tokio::test]
    async fn test_own_id() {
        let msg = mock::guild_message(member(), "!id");
        let (op, res) = run(config(), &msg).await;

        assert!(res.is_ok());
        assert_eq!(op.platform.sent_text(), ["<@42>: Your ID is `42`"]);
    }

    #[tokio::test]
    async fn test_mentioned_id() {
        let mut msg = mock::guild_message(member(), "!id <@7>");
        msg.mentions.push(mock::user(7, "Bob"));
        let (op, _) = run(config(), &msg).await;

        assert_eq!(op.platform.sent_text(), ["<@42>: **Bob**'s ID is `7`"]);
    }
}
