//! Content-type handling for downloaded media.

/// Image types the vision providers accept.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/heic",
    "image/heif",
];

/// Lowercase the essence of a content type and drop parameters.
///
/// `Image/JPEG; charset=binary` becomes `image/jpeg`.
pub fn normalize_content_type(raw: &str) -> String {
    let essence = raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match essence.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => essence,
    }
}

/// Whether a content type is on the image allow-list.
pub fn is_allowed_image(content_type: &str) -> bool {
    let normalized = normalize_content_type(content_type);
    ALLOWED_IMAGE_TYPES.contains(&normalized.as_str())
}

/// Content types that say nothing about the payload.
pub(crate) fn is_generic(content_type: &str) -> bool {
    matches!(
        normalize_content_type(content_type).as_str(),
        "" | "application/octet-stream" | "binary/octet-stream"
    )
}

/// Detect an image type from its leading bytes.
pub fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [_, _, _, _, b'f', b't', b'y', b'p', b'h', b'e', b'i', b'c', ..] => Some("image/heic"),
        [_, _, _, _, b'f', b't', b'y', b'p', b'm', b'i', b'f', b'1', ..] => Some("image/heif"),
        _ => None,
    }
}
