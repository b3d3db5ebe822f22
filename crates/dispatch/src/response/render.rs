//! Turning responses, errors and usage text into outbound content

use chrono::Utc;
use rand::seq::SliceRandom;

use super::{Content, Embed, Response, ERROR_COLOUR, PALETTE};
use crate::{
    config::{DispatchConfig, Identity},
    message::User,
};

/// Fence text as a Markdown code block
#[must_use]
pub fn codeblock(text: &str, lang: Option<&str>) -> String {
    format!("```{}\n{text}\n```", lang.unwrap_or_default())
}

/// A blank embed carrying the bot's branding and a random accent colour
#[must_use]
pub fn branded(identity: &Identity) -> Embed {
    let colour = PALETTE
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(PALETTE[0]);

    Embed::default()
        .colour(colour)
        .footer(format!("© ({})", identity.name), identity.avatar_url.clone())
        .author(identity.name.clone(), identity.avatar_url.clone())
        .timestamp(Utc::now())
}

/// Render the response returned by a command
///
/// Plain text is wrapped in a branded embed titled with the command name when
/// both the config and the response allow it, and replies are prefixed with a
/// mention of the invoking user.
#[must_use]
pub fn response(
    cfg: &DispatchConfig,
    identity: &Identity,
    command: &str,
    author: &User,
    res: Response,
) -> Content {
    let embed = cfg.embeds && res.allows_embed();
    let reply = res.is_reply();

    let content = match res.into_content() {
        Content::Text(s) if embed => branded(identity).title(command).description(s).into(),
        c => c,
    };

    if !reply {
        return content;
    }

    match content {
        Content::Text(s) => Content::Text(format!("{}: {s}", author.mention())),
        Content::Embed(mut e) => {
            e.description = Some(format!(
                "{} {}",
                author.mention(),
                e.description.unwrap_or_default()
            ));
            Content::Embed(e)
        },
    }
}

/// Render a user-facing error message
#[must_use]
pub fn error(cfg: &DispatchConfig, identity: &Identity, message: &str) -> Content {
    if cfg.embeds {
        branded(identity)
            .field("Error", message, false)
            .colour(ERROR_COLOUR)
            .into()
    } else {
        Content::Text(codeblock(message, None))
    }
}

/// Render the usage text for a command
#[must_use]
pub fn usage(cfg: &DispatchConfig, identity: &Identity, command: &str, text: &str) -> Content {
    let text = codeblock(text, None);

    if cfg.embeds {
        branded(identity).title(command).description(text).into()
    } else {
        Content::Text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{prelude::*, response::Codeblock};

    fn identity() -> Identity {
        Identity {
            id: UserId::new(1),
            name: "kanobot".into(),
            avatar_url: Some("https://cdn.example/a.png".into()),
        }
    }

    fn config(embeds: bool) -> DispatchConfig {
        DispatchConfig {
            embeds,
            ..DispatchConfig::default()
        }
    }

    #[test]
    fn test_plain_reply() {
        let author = User::new(77_u64, "U");
        let content = response(
            &config(false),
            &identity(),
            "id",
            &author,
            Response::new("ok").reply(true),
        );

        assert_eq!(content, Content::text("<@77>: ok"));
    }

    #[test]
    fn test_embed_wrapping() {
        let author = User::new(77_u64, "U");
        let content = response(
            &config(true),
            &identity(),
            "id",
            &author,
            Response::new("ok").reply(true),
        );

        let embed = content.as_embed().unwrap();
        assert_eq!(embed.title.as_deref(), Some("id"));
        assert_eq!(embed.description.as_deref(), Some("<@77> ok"));
        assert_eq!(embed.footer.as_ref().unwrap().text, "© (kanobot)");
        assert_eq!(embed.author.as_ref().unwrap().name, "kanobot");
        assert!(embed.timestamp.is_some());
        assert!(PALETTE.contains(&embed.colour.unwrap()));
    }

    #[test]
    fn test_embed_opt_out() {
        let author = User::new(77_u64, "U");
        let content = response(
            &config(true),
            &identity(),
            "help",
            &author,
            Response::new("hi").embed(false).codeblock(Codeblock::Plain),
        );

        assert_eq!(content, Content::text("```\nhi\n```"));
    }

    #[test]
    fn test_error() {
        assert_eq!(
            error(&config(false), &identity(), "bad"),
            Content::text("```\nbad\n```")
        );

        let content = error(&config(true), &identity(), "bad");
        let embed = content.as_embed().unwrap();
        assert_eq!(embed.colour, Some(ERROR_COLOUR));
        assert_eq!(embed.fields[0].name, "Error");
        assert_eq!(embed.fields[0].value, "bad");
    }
}
