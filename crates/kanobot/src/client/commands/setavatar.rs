use super::prelude::*;

#[derive(Debug)]
pub struct SetAvatarCommand {
    http: reqwest::Client,
}

impl SetAvatarCommand {
    pub fn new(http: reqwest::Client) -> Self { Self { http } }

    fn command_info() -> CommandInfo {
        CommandInfo::new("setavatar", [
            Param::context(ContextKey::Message),
            Param::optional("url", None),
        ])
        .doc(
            "
            Usage:
                {command_prefix}setavatar [url]

            Changes the bot's avatar.
            Attaching a file and leaving the url parameter blank also works.
            ",
        )
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .http
            .get(url)
            .send()
            .await
            .context("Error requesting image")?
            .error_for_status()
            .context("Image request failed")?
            .bytes()
            .await
            .context("Error downloading image")?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl<P: Operator> Command<P> for SetAvatarCommand {
    fn info(&self) -> CommandInfo { Self::command_info() }

    async fn run(&self, inv: &Invocation<'_, P>, args: &Args) -> CommandResult {
        let msg = args.message().context("Missing invoking message")?;

        let source = msg.attachments.first().cloned().or_else(|| {
            args.str("url")
                .map(|u| u.trim_matches(|c| c == '<' || c == '>').to_owned())
        });

        let Some(source) = source else {
            let usage = Self::command_info().usage(&inv.config.command_prefix);
            return Ok(Some(
                Response::new(render::codeblock(&usage, None))
                    .reply(true)
                    .delete_after(secs(30)),
            ));
        };

        let res = match self.download(&source).await {
            Ok(image) => inv.platform.set_avatar(image).await,
            Err(e) => Err(e),
        };

        if let Err(e) = res {
            return Err(CommandError::new(format!("Unable to change avatar: {e:#}"))
                .expire_in(secs(20))
                .into());
        }

        Ok(Some(Response::new("\n:ok_hand:").delete_after(secs(20))))
    }
}
