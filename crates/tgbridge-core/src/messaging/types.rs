use std::{borrow::Cow, fmt, str::FromStr};

use crate::errors::Error;

/// Rich-text formatting applied to outgoing text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParseMode {
    #[default]
    Plain,
    Html,
    MarkdownV2,
    /// Telegram's legacy Markdown.
    Markdown,
}

impl FromStr for ParseMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "plain" | "none" => Ok(Self::Plain),
            "html" => Ok(Self::Html),
            "markdownv2" => Ok(Self::MarkdownV2),
            "markdown" => Ok(Self::Markdown),
            other => Err(Error::Config(format!("unknown parse mode: {other}"))),
        }
    }
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Plain => "plain",
            Self::Html => "HTML",
            Self::MarkdownV2 => "MarkdownV2",
            Self::Markdown => "Markdown",
        };
        f.write_str(name)
    }
}

/// Media to send: either something already on the platform, or new bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Asset {
    /// Opaque file id of a previously uploaded file.
    ByReference(String),
    ByContent {
        bytes: Cow<'static, [u8]>,
        file_name: String,
    },
}

impl Asset {
    pub fn file_id(id: impl Into<String>) -> Self {
        Self::ByReference(id.into())
    }

    pub fn upload(bytes: impl Into<Cow<'static, [u8]>>, file_name: impl Into<String>) -> Self {
        Self::ByContent {
            bytes: bytes.into(),
            file_name: file_name.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

/// Inline keyboard, laid out row by row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn new(rows: Vec<Vec<InlineButton>>) -> Self {
        Self { rows }
    }

    pub fn single_row(buttons: Vec<InlineButton>) -> Self {
        Self {
            rows: vec![buttons],
        }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &InlineButton> {
        self.rows.iter().flatten()
    }
}
