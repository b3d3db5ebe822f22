use super::prelude::*;

#[derive(Debug, Default)]
pub struct SetNameCommand;

#[async_trait]
impl<P: Operator> Command<P> for SetNameCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::new("setname", [
            Param::context(ContextKey::LeftoverArgs),
            Param::required("name"),
        ])
        .doc(
            "
            Usage:
                {command_prefix}setname name

            Changes the bot's username.
            Note: This operation is limited by discord to twice per hour.
            ",
        )
    }

    async fn run(&self, inv: &Invocation<'_, P>, args: &Args) -> CommandResult {
        // Every token after the command, so multi-word names survive
        let name = args.leftover_args().join(" ");

        if let Err(e) = inv.platform.set_username(&name).await {
            debug!(?e, "Username change rejected");
            return Err(CommandError::new(
                "Failed to change name. Did you change names too many times? Remember name \
                 changes are limited to twice per hour.",
            )
            .expire_in(secs(20))
            .into());
        }

        Ok(Some(Response::new("\n:ok_hand:").delete_after(secs(20))))
    }
}
