use super::prelude::*;

const MAX_SEARCH_RANGE: usize = 1000;
const DEFAULT_SEARCH_RANGE: &str = "50";

#[derive(Debug, Default)]
pub struct PurgeCommand;

#[async_trait]
impl<P: Operator> Command<P> for PurgeCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::new("purge", [
            Param::context(ContextKey::Channel),
            Param::context(ContextKey::UserMentions),
            Param::optional("search_range", Some(DEFAULT_SEARCH_RANGE)),
            Param::optional("user", None),
        ])
        .doc(
            "
            Usage:
                {command_prefix}purge [range] [user]

            Removes up to [range] recent unpinned messages from the channel.
            Default: 50, Max: 1000
            e.g. {command_prefix}purge
                 {command_prefix}purge 80
            [user] may be a name or an @mention
            e.g. {command_prefix}purge 30 bots
            ",
        )
    }

    async fn run(&self, inv: &Invocation<'_, P>, args: &Args) -> CommandResult {
        let channel = args.channel().context("Missing invoking channel")?;

        let Ok(range) = args
            .str("search_range")
            .unwrap_or(DEFAULT_SEARCH_RANGE)
            .parse::<usize>()
        else {
            return Ok(Some(
                Response::new("Enter a number.  NUMBER.  That means digits. `15`.  Etc.")
                .reply(true)
                .delete_after(secs(8)),
            ));
        };
        let range = range.min(MAX_SEARCH_RANGE);

        let mentions = args.user_mentions();
        let name = args.str("user");

        let ids: Vec<_> = inv
            .platform
            .history(channel, range)
            .await?
            .into_iter()
            .filter(|m| !m.pinned)
            .filter(|m| {
                if !mentions.is_empty() {
                    mentions.iter().any(|u| u.id == m.author.id)
                } else if let Some(name) = name {
                    m.author.name == name
                } else {
                    true
                }
            })
            .map(|m| m.id)
            .collect();

        debug!(range, n = ids.len(), "Purging messages");
        let deleted = inv.platform.delete_many(channel, &ids).await?;

        Ok(Some(
            Response::new(format!(
                "successfully deleted {deleted} messages from this channel!"
            ))
            .reply(true)
            .delete_after(secs(8)),
        ))
    }
}
