//! Transport-neutral chat replies.
//!
//! The gateway commands turn a [`Reply`] into a serenity embed, the
//! interactions endpoint serializes it straight into Discord's JSON shape.

use poise::serenity_prelude as serenity;
use serde::Serialize;

pub const SUCCESS_COLOR: u32 = 0xBEBEFE;
pub const ERROR_COLOR: u32 = 0xE02B2B;

/// Discord's "only visible to the invoking user" message flag
pub const EPHEMERAL_FLAG: u64 = 1 << 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tone {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tone: Tone,
    pub fields: Vec<ReplyField>,
    pub footer: Option<String>,
    pub ephemeral: bool,
}

impl Reply {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: Some(description.into()),
            tone: Tone::Success,
            fields: Vec::new(),
            footer: None,
            ephemeral: true,
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            title: None,
            description: Some(description.into()),
            tone: Tone::Error,
            fields: Vec::new(),
            footer: None,
            ephemeral: true,
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(ReplyField {
            name: name.into(),
            value: value.into(),
            inline: false,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }

    pub fn public(mut self) -> Self {
        self.ephemeral = false;
        self
    }

    pub fn color(&self) -> u32 {
        match self.tone {
            Tone::Success => SUCCESS_COLOR,
            Tone::Error => ERROR_COLOR,
        }
    }

    pub fn is_error(&self) -> bool {
        self.tone == Tone::Error
    }

    pub fn to_embed(&self) -> serenity::CreateEmbed {
        let mut embed = serenity::CreateEmbed::new().color(self.color());
        if let Some(title) = &self.title {
            embed = embed.title(title);
        }
        if let Some(description) = &self.description {
            embed = embed.description(description);
        }
        for field in &self.fields {
            embed = embed.field(&field.name, &field.value, field.inline);
        }
        if let Some(footer) = &self.footer {
            embed = embed.footer(serenity::CreateEmbedFooter::new(footer));
        }
        embed
    }

    pub fn to_create_reply(&self) -> poise::CreateReply {
        poise::CreateReply::default()
            .embed(self.to_embed())
            .ephemeral(self.ephemeral)
    }

    /// Discord embed object
    pub fn embed_json(&self) -> serde_json::Value {
        let mut embed = serde_json::json!({ "color": self.color() });
        if let Some(title) = &self.title {
            embed["title"] = title.clone().into();
        }
        if let Some(description) = &self.description {
            embed["description"] = description.clone().into();
        }
        if !self.fields.is_empty() {
            embed["fields"] = serde_json::json!(self.fields);
        }
        if let Some(footer) = &self.footer {
            embed["footer"] = serde_json::json!({ "text": footer });
        }
        embed
    }

    /// Message payload for interaction responses and webhook edits
    pub fn message_json(&self) -> serde_json::Value {
        let mut message = serde_json::json!({ "embeds": [self.embed_json()] });
        if self.ephemeral {
            message["flags"] = EPHEMERAL_FLAG.into();
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_reply_shape() {
        let reply = Reply::error("You do not have an active shift to end.");
        assert!(reply.is_error());
        assert!(reply.ephemeral);
        assert_eq!(
            reply.message_json(),
            serde_json::json!({
                "embeds": [{
                    "color": ERROR_COLOR,
                    "description": "You do not have an active shift to end."
                }],
                "flags": 64
            })
        );
    }

    #[test]
    fn test_success_reply_with_fields() {
        let reply = Reply::success("Shift started", "<@1>, your shift has been logged.")
            .field("Start time", "<t:0:F> (<t:0:R>)")
            .footer("footer text")
            .public();
        let json = reply.message_json();
        assert!(json.get("flags").is_none());
        let embed = &json["embeds"][0];
        assert_eq!(embed["title"], "Shift started");
        assert_eq!(embed["color"], SUCCESS_COLOR);
        assert_eq!(embed["fields"][0]["name"], "Start time");
        assert_eq!(embed["fields"][0]["inline"], false);
        assert_eq!(embed["footer"]["text"], "footer text");
    }
}
