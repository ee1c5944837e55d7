//! Sample image handling
//!
//! Decodes inline base64 payloads (with or without a data-URI prefix),
//! validates that the bytes are a real picture, and stores accepted images
//! under the data folder's uploads directory.

use chrono::{DateTime, Utc};
use moltwatch_common::{time, Error, Result};
use std::path::Path;
use tracing::debug;

/// Decode an inline image payload, stripping a `data:image/...;base64,`
/// prefix when present.
pub fn decode_inline_image(payload: &str) -> Result<Vec<u8>> {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    let encoded = match payload.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:image") => rest,
        _ => payload,
    };

    BASE64
        .decode(encoded.trim())
        .map_err(|e| Error::InvalidInput(format!("image is not valid base64: {e}")))
}

/// Check that the bytes decode into a valid picture
pub fn validate_image(bytes: &[u8]) -> Result<()> {
    image::load_from_memory(bytes)
        .map(|_| ())
        .map_err(|e| Error::InvalidInput(format!("image is not a decodable picture: {e}")))
}

/// Store a validated image, returning its reference (relative to the data
/// folder). File name carries the rfid and capture time, matching the
/// device upload convention.
pub async fn store_image(
    uploads_dir: &Path,
    rfid: &str,
    captured_at: DateTime<Utc>,
    bytes: &[u8],
) -> Result<String> {
    let safe_rfid: String = rfid
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let filename = format!("{}_{}.jpg", safe_rfid, time::file_stamp(captured_at));

    tokio::fs::create_dir_all(uploads_dir).await?;
    let path = uploads_dir.join(&filename);
    tokio::fs::write(&path, bytes).await?;
    debug!("stored sample image at {}", path.display());

    Ok(format!("uploads/{filename}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    /// Smallest valid picture we can make: 1x1 PNG encoded in memory
    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::new(1, 1);
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_plain_base64() {
        let png = tiny_png();
        let encoded = BASE64.encode(&png);
        assert_eq!(decode_inline_image(&encoded).unwrap(), png);
    }

    #[test]
    fn test_decode_data_uri() {
        let png = tiny_png();
        let payload = format!("data:image/png;base64,{}", BASE64.encode(&png));
        assert_eq!(decode_inline_image(&payload).unwrap(), png);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_inline_image("@@not-base64@@").is_err());
    }

    #[test]
    fn test_validate_accepts_real_picture() {
        validate_image(&tiny_png()).unwrap();
    }

    #[test]
    fn test_validate_rejects_non_picture() {
        assert!(validate_image(b"definitely not an image").is_err());
    }

    #[tokio::test]
    async fn test_store_image_sanitizes_rfid() {
        let dir = tempfile::tempdir().unwrap();
        let ts = chrono::Utc::now();
        let image_ref = store_image(dir.path(), "A12/../evil", ts, &tiny_png())
            .await
            .unwrap();
        assert!(image_ref.starts_with("uploads/A12"));
        assert!(!image_ref.contains(".."));
        assert!(dir.path().join(image_ref.trim_start_matches("uploads/")).exists());
    }
}
