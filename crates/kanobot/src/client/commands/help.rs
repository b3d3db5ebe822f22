use super::prelude::*;

#[derive(Debug, Default)]
pub struct HelpCommand;

#[async_trait]
impl<P: Operator> Command<P> for HelpCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::new("help", [
            Param::context(ContextKey::Author),
            Param::optional("command", None),
        ])
        .doc(
            "
            Usage:
                {command_prefix}help [command]

            Prints a help message.
            If a command is specified, it prints a help message for that command.
            Otherwise, it lists the available commands.
            ",
        )
    }

    async fn run(&self, inv: &Invocation<'_, P>, args: &Args) -> CommandResult {
        let prefix = inv.config.command_prefix.as_str();

        if let Some(name) = args.str("command") {
            let res = match inv.commands.get(&name.to_lowercase()) {
                Some(e) if e.info().tier() != Tier::Dev => {
                    Response::new(render::codeblock(&e.info().usage(prefix), None))
                        .delete_after(secs(60))
                },
                _ => Response::new("No such command").delete_after(secs(10)),
            };

            return Ok(Some(res));
        }

        let is_admin = inv.is_admin().await;
        let is_owner = args.author().is_some_and(|a| inv.config.is_owner(a.id));

        let names: BTreeSet<_> = inv
            .commands
            .iter()
            .map(|e| e.info())
            .filter(|i| i.name() != "help")
            .filter(|i| match i.tier() {
                Tier::Public => true,
                Tier::Admin => is_admin,
                Tier::Owner => is_owner,
                Tier::Dev => false,
            })
            .map(|i| format!("{prefix}{}", i.name()))
            .collect();

        let list = names.into_iter().collect::<Vec<_>>().join(", ");

        Ok(Some(
            Response::new(format!(
                "**Available commands**\n```{list}```\n\nYou can use `{prefix}help x` for more \
                 info about each command."
            ))
            .reply(true),
        ))
    }
}
