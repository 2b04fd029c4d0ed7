//! Camera snapshot capture.
//!
//! [`CameraSource`] is the seam between the inspection engine and real
//! cameras. The production implementation fetches a still frame over
//! HTTP; tests substitute an in-memory source.

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CameraError;

/// HTTP timeout for a single snapshot fetch.
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// CapturedImage
// ---------------------------------------------------------------------------

/// A snapshot frame plus the metadata the provider payloads need.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    /// Detected MIME type, e.g. `image/jpeg`.
    pub mime: &'static str,
    /// Pixel dimensions when the header could be decoded. Logging only.
    pub dimensions: Option<(u32, u32)>,
}

impl CapturedImage {
    /// Wrap raw snapshot bytes, probing the format from the header.
    ///
    /// An empty body is a camera failure. Bytes the probe cannot
    /// recognise are still forwarded under a JPEG fallback MIME; the
    /// provider is the authority on whether a frame is usable.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CameraError> {
        if bytes.is_empty() {
            return Err(CameraError::Unavailable("camera returned no data".into()));
        }

        let (mime, dimensions) = match image::guess_format(&bytes) {
            Ok(format) => (
                format.to_mime_type(),
                image::ImageReader::with_format(Cursor::new(&bytes), format)
                    .into_dimensions()
                    .ok(),
            ),
            Err(_) => ("image/jpeg", None),
        };

        Ok(Self {
            bytes,
            mime,
            dimensions,
        })
    }
}

// ---------------------------------------------------------------------------
// CameraSource
// ---------------------------------------------------------------------------

/// Source of snapshot frames, keyed by a zone's `camera_ref`.
#[async_trait]
pub trait CameraSource: Send + Sync {
    /// Fetch the current frame for the given camera reference.
    async fn capture(&self, camera_ref: &str) -> Result<CapturedImage, CameraError>;
}

/// Fetches snapshots from HTTP still-image endpoints.
///
/// `camera_ref` is the full snapshot URL. Any transport or status
/// failure reads as the camera being unavailable.
pub struct HttpCameraSource {
    client: reqwest::Client,
}

impl HttpCameraSource {
    pub fn new() -> Result<Self, CameraError> {
        let client = reqwest::Client::builder()
            .timeout(SNAPSHOT_TIMEOUT)
            .build()
            .map_err(|e| CameraError::Unavailable(format!("HTTP client setup failed: {e}")))?;
        Ok(Self { client })
    }

    /// Build a source reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CameraSource for HttpCameraSource {
    async fn capture(&self, camera_ref: &str) -> Result<CapturedImage, CameraError> {
        let response = self
            .client
            .get(camera_ref)
            .send()
            .await
            .map_err(|e| CameraError::Unavailable(format!("snapshot request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CameraError::Unavailable(format!(
                "snapshot endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CameraError::Unavailable(format!("snapshot body read failed: {e}")))?;

        let image = CapturedImage::from_bytes(bytes.to_vec())?;
        tracing::debug!(
            camera_ref,
            mime = image.mime,
            bytes = image.bytes.len(),
            dimensions = ?image.dimensions,
            "Captured camera snapshot"
        );
        Ok(image)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
