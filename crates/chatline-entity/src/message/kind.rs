//! Message kind enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Plain text content.
    Text,
    /// Image attachment.
    Image,
    /// Video attachment.
    Video,
}

impl MessageKind {
    /// Whether this kind requires a media reference.
    pub fn requires_media(&self) -> bool {
        matches!(self, Self::Image | Self::Video)
    }

    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = chatline_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            _ => Err(chatline_core::AppError::validation(format!(
                "Invalid message kind: '{s}'. Expected one of: text, image, video"
            ))),
        }
    }
}
