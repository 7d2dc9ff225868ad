use std::sync::Arc;

use docsnap_core::{FetchedMedia, MediaApi, OversizedMedia, PipelineError};
use tracing::{debug, info};

use crate::mime_detect::{is_allowed_image, is_generic, normalize_content_type, sniff_image_type};

/// Resolves and downloads inbound media as one logical fetch.
pub struct MediaFetcher {
    api: Arc<dyn MediaApi>,
    max_bytes: u64,
}

impl MediaFetcher {
    pub fn new(api: Arc<dyn MediaApi>, max_bytes: u64) -> Self {
        Self { api, max_bytes }
    }

    /// Resolve `media_ref`, download it, and verify type and size.
    ///
    /// Metadata that already rules the media out (non-image type, oversized)
    /// short-circuits before the download.
    pub async fn fetch_media(&self, media_ref: &str) -> Result<FetchedMedia, PipelineError> {
        let location = self
            .api
            .resolve(media_ref)
            .await
            .map_err(|e| PipelineError::MediaFetchFailed(format!("{e:#}")))?;

        if let Some(declared) = location.content_type.as_deref() {
            if !is_generic(declared) && !is_allowed_image(declared) {
                return Err(PipelineError::InvalidMediaType(normalize_content_type(declared)));
            }
        }
        if let Some(size) = location.size_bytes {
            self.check_size(size)?;
        }

        let (bytes, served_type) = self
            .api
            .download(&location, self.max_bytes)
            .await
            .map_err(|e| match e.downcast_ref::<OversizedMedia>() {
                Some(over) => PipelineError::MediaTooLarge {
                    size: over.size,
                    limit: over.limit,
                },
                None => PipelineError::MediaFetchFailed(format!("{e:#}")),
            })?;

        // The content endpoint's type wins over metadata; generic types fall
        // back to metadata, then to the bytes themselves.
        let content_type = [served_type.as_deref(), location.content_type.as_deref()]
            .into_iter()
            .flatten()
            .find(|ct| !is_generic(ct))
            .map(normalize_content_type)
            .or_else(|| sniff_image_type(&bytes).map(str::to_string))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        if !is_allowed_image(&content_type) {
            debug!(%content_type, "downloaded media is not an allowed image");
            return Err(PipelineError::InvalidMediaType(content_type));
        }

        let size_bytes = bytes.len() as u64;
        self.check_size(size_bytes)?;

        info!(%content_type, size_bytes, "media fetched");
        Ok(FetchedMedia {
            bytes,
            content_type,
            size_bytes,
        })
    }

    fn check_size(&self, size: u64) -> Result<(), PipelineError> {
        if size > self.max_bytes {
            return Err(PipelineError::MediaTooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}
