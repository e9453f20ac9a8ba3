//! Content-type classification

use mime_guess::mime::{self, Mime};

/// What a received payload is treated as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    Video,
    Image,
    Unknown,
}

/// Subtypes that select a class regardless of the top-level type
/// (e.g. `application/mp4`).
const SUBTYPE_TABLE: &[(&str, ContentClass)] = &[
    ("mp4", ContentClass::Video),
    ("png", ContentClass::Image),
    ("jpeg", ContentClass::Image),
    ("jpg", ContentClass::Image),
];

/// Classify a declared `Content-Type` value.
///
/// `video/*` and `image/*` win outright; otherwise the subtype is looked up in
/// a fixed table. Unparseable values are [`ContentClass::Unknown`].
pub fn classify(content_type: &str) -> ContentClass {
    let Ok(parsed) = content_type.trim().parse::<Mime>() else {
        return ContentClass::Unknown;
    };

    let top = parsed.type_().as_str();
    if top.eq_ignore_ascii_case(mime::VIDEO.as_str()) {
        return ContentClass::Video;
    }
    if top.eq_ignore_ascii_case(mime::IMAGE.as_str()) {
        return ContentClass::Image;
    }

    let subtype = parsed.subtype().as_str();
    SUBTYPE_TABLE
        .iter()
        .find(|(name, _)| subtype.eq_ignore_ascii_case(name))
        .map(|(_, class)| *class)
        .unwrap_or(ContentClass::Unknown)
}
