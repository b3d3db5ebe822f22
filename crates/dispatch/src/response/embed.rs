use chrono::{DateTime, Utc};

/// Accent colours for branded embeds
pub const PALETTE: [u32; 43] = [
    0x7f_0000, 0x53_5900, 0x40_d9ff, 0x8c_7399, 0xd9_7b6c, 0xf2_ff40, 0x8f_b6bf, 0x50_2d59,
    0x66_504d, 0x89_b359, 0x00_aaff, 0xd6_00e6, 0x40_1100, 0x44_ff00, 0x1a_2b33, 0xff_00aa,
    0xff_8c40, 0x17_330d, 0x00_66bf, 0x33_001b, 0xb3_9886, 0xbf_ffd0, 0x16_3a59, 0x8c_235b,
    0x8c_5e00, 0x00_733d, 0x00_0c59, 0xff_bfd9, 0x4c_3300, 0x36_d98d, 0x3d_3df2, 0x59_0018,
    0xf2_c200, 0x26_4d40, 0xc8_bfff, 0xf2_3d6d, 0xd9_c36c, 0x2d_b3aa, 0xb3_80ff, 0xff_0022,
    0x33_3226, 0x00_5c73, 0x7c_29a6,
];

/// Accent colour for error embeds
pub const ERROR_COLOUR: u32 = 0xcc_0000;

/// A message rich content embed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Embed {
    /// Title line
    pub title: Option<String>,
    /// Main body text
    pub description: Option<String>,
    /// Additional named sections
    pub fields: Vec<EmbedField>,
    /// Footer line
    pub footer: Option<EmbedFooter>,
    /// Author line
    pub author: Option<EmbedAuthor>,
    /// Timestamp shown next to the footer
    pub timestamp: Option<DateTime<Utc>>,
    /// Accent colour, as `0xRRGGBB`
    pub colour: Option<u32>,
}

/// A named section of an [`Embed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    /// Field heading
    pub name: String,
    /// Field body
    pub value: String,
    /// Whether the field may share a row with its neighbors
    pub inline: bool,
}

/// The footer of an [`Embed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedFooter {
    /// Footer text
    pub text: String,
    /// Footer icon
    pub icon_url: Option<String>,
}

/// The author line of an [`Embed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedAuthor {
    /// Author name
    pub name: String,
    /// Author icon
    pub icon_url: Option<String>,
}

impl Embed {
    /// Set the title of this embed
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the description of this embed
    #[must_use]
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Add a field to this embed
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    /// Set the footer of this embed
    #[must_use]
    pub fn footer(mut self, text: impl Into<String>, icon_url: Option<String>) -> Self {
        self.footer = Some(EmbedFooter {
            text: text.into(),
            icon_url,
        });
        self
    }

    /// Set the author line of this embed
    #[must_use]
    pub fn author(mut self, name: impl Into<String>, icon_url: Option<String>) -> Self {
        self.author = Some(EmbedAuthor {
            name: name.into(),
            icon_url,
        });
        self
    }

    /// Set the timestamp of this embed
    #[must_use]
    pub fn timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.timestamp = Some(ts);
        self
    }

    /// Set the accent colour of this embed
    #[must_use]
    pub fn colour(mut self, colour: u32) -> Self {
        self.colour = Some(colour);
        self
    }

    /// Total number of text characters in this embed
    #[must_use]
    pub fn len(&self) -> usize {
        let count = |s: &str| s.chars().count();

        self.title.as_deref().map_or(0, count)
            + self.description.as_deref().map_or(0, count)
            + self
                .fields
                .iter()
                .map(|f| count(&f.name) + count(&f.value))
                .sum::<usize>()
            + self.footer.as_ref().map_or(0, |f| count(&f.text))
            + self.author.as_ref().map_or(0, |a| count(&a.name))
    }

    /// Returns true if this embed contains no text
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
