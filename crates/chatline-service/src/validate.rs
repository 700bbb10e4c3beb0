//! Per-kind message content validation.

use chatline_core::error::AppError;
use chatline_core::result::AppResult;
use chatline_entity::message::MessageKind;

/// Validated message content ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidContent {
    /// Trimmed textual content.
    pub content: Option<String>,
    /// Media reference.
    pub media_url: Option<String>,
}

/// Validates content for the given kind.
///
/// Text must be non-empty after trimming and within `max_chars`. Image and
/// video messages must carry a media reference; their caption, if present,
/// is trimmed and bounded the same way.
pub fn validate_content(
    kind: MessageKind,
    content: Option<&str>,
    media_url: Option<&str>,
    max_chars: usize,
) -> AppResult<ValidContent> {
    let trimmed = content.map(str::trim).filter(|c| !c.is_empty());

    if let Some(text) = trimmed {
        if text.chars().count() > max_chars {
            return Err(AppError::validation(format!(
                "Message content exceeds {max_chars} characters"
            )));
        }
    }

    match kind {
        MessageKind::Text => {
            let text = trimmed.ok_or_else(|| {
                AppError::validation("Text messages require non-empty content")
            })?;
            Ok(ValidContent {
                content: Some(text.to_string()),
                media_url: None,
            })
        }
        MessageKind::Image | MessageKind::Video => {
            let media = media_url
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .ok_or_else(|| {
                    AppError::validation(format!("{kind} messages require a media reference"))
                })?;
            Ok(ValidContent {
                content: trimmed.map(str::to_string),
                media_url: Some(media.to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_trimmed_and_required() {
        let valid = validate_content(MessageKind::Text, Some("  hi  "), None, 5000).unwrap();
        assert_eq!(valid.content.as_deref(), Some("hi"));

        assert!(validate_content(MessageKind::Text, Some("   "), None, 5000).is_err());
        assert!(validate_content(MessageKind::Text, None, None, 5000).is_err());
    }

    #[test]
    fn oversized_text_is_rejected() {
        let long = "x".repeat(5001);
        assert!(validate_content(MessageKind::Text, Some(&long), None, 5000).is_err());
        let max = "x".repeat(5000);
        assert!(validate_content(MessageKind::Text, Some(&max), None, 5000).is_ok());
    }

    #[test]
    fn media_kinds_require_reference() {
        assert!(validate_content(MessageKind::Image, None, None, 5000).is_err());
        let valid =
            validate_content(MessageKind::Video, Some("look"), Some("https://cdn/x.mp4"), 5000)
                .unwrap();
        assert_eq!(valid.media_url.as_deref(), Some("https://cdn/x.mp4"));
        assert_eq!(valid.content.as_deref(), Some("look"));
    }
}
