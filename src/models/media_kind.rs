//! Coarse media classification derived from a stored content type.

use std::fmt;

/// Coarse category of a stored blob.
///
/// Routes are scoped to a set of kinds; a record whose kind is not accepted
/// by the route it was requested through is reported as absent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    Other,
}

impl MediaKind {
    /// Classify a MIME-like content type.
    ///
    /// Case-insensitive substring match on `image`, `audio` and `video`, in
    /// that order. Empty or unrecognised types yield `Other`.
    pub fn classify(content_type: &str) -> Self {
        let lowered = content_type.to_ascii_lowercase();
        if lowered.contains("image") {
            MediaKind::Image
        } else if lowered.contains("audio") {
            MediaKind::Audio
        } else if lowered.contains("video") {
            MediaKind::Video
        } else {
            MediaKind::Other
        }
    }

    /// URL path segment under `/v1/media` that serves this kind.
    pub fn route_prefix(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio | MediaKind::Video => "resource",
            MediaKind::Other => "file",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Other => "other",
        };
        f.write_str(name)
    }
}
