//! Data-URL image decoding.
//!
//! Browser canvases hand us `data:image/jpeg;base64,<payload>`; the payload is
//! everything after the first comma.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("image payload is empty")]
    EmptyPayload,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("could not decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Strip the `data:<mime>;base64,` header if present.
pub fn data_url_payload(data_url: &str) -> &str {
    let trimmed = data_url.trim();
    match trimmed.split_once(',') {
        Some((_, payload)) => payload.trim(),
        None => trimmed,
    }
}

/// Decode a data URL (or bare base64 string) into an RGB bitmap.
pub fn decode_data_url(data_url: &str) -> Result<RgbImage, DecodeError> {
    let payload = data_url_payload(data_url);
    if payload.is_empty() {
        return Err(DecodeError::EmptyPayload);
    }

    let bytes = STANDARD.decode(payload)?;
    let image = image::load_from_memory(&bytes)?;

    tracing::debug!(
        bytes = bytes.len(),
        width = image.width(),
        height = image.height(),
        "decoded request image"
    );

    Ok(image.to_rgb8())
}
