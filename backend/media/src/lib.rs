//! Media retrieval: resolve a provider media reference, download it, and
//! verify it is an image we can send to a vision model.

pub mod fetcher;
pub mod mime_detect;

pub use fetcher::MediaFetcher;
pub use mime_detect::{is_allowed_image, normalize_content_type, sniff_image_type, ALLOWED_IMAGE_TYPES};
