use super::prelude::*;

/// Permissions requested by the generated invite link
const INVITE_PERMISSIONS: u64 = 70_380_544;

pub fn invite_url(client_id: UserId) -> String {
    format!(
        "https://discord.com/oauth2/authorize?client_id={client_id}&scope=bot&permissions={INVITE_PERMISSIONS}"
    )
}

#[derive(Debug, Default)]
pub struct JoinServerCommand;

#[async_trait]
impl<P: Operator> Command<P> for JoinServerCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::new("joinserver", [
            Param::context(ContextKey::Message),
            Param::optional("server_link", None),
        ])
        .doc(
            "
            Usage:
                {command_prefix}joinserver invite_link

            Asks the bot to join a server.
            Note: Bot accounts cannot use invite links.
            ",
        )
    }

    async fn run(&self, inv: &Invocation<'_, P>, _: &Args) -> CommandResult {
        Ok(Some(
            Response::new(format!(
                "Bot accounts can't use invite links!\nClick here to add me to a server: \n{}",
                invite_url(inv.identity.id)
            ))
            .reply(true),
        ))
    }
}

#[cfg(test)]
mod tests {
    use kano_dispatch::mock;

    use super::super::test_util::*;
    use crate::client::operator::mock::config;

    #[tokio::test]
    async fn test_invite_link() {
        let mut cfg = config();
        cfg.admin_ids.insert(42_u64.into());

        let msg = mock::guild_message(member(), "!joinserver https://discord.gg/abc");
        let (op, _) = run(cfg, &msg).await;

        assert_eq!(op.platform.sent_text(), [
            "<@42>: Bot accounts can't use invite links!\nClick here to add me to a server: \
             \nhttps://discord.com/oauth2/authorize?client_id=99&scope=bot&permissions=70380544"
        ]);
    }
}
