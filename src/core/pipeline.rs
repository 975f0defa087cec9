//! End-to-end artifact codecs
//!
//! Export, image path:
//!
//! ```text
//! envelope ─► JSON ─► UTF-8 ─┬─► checksum ──────────────┐
//!                            └─► gzip ─► frame(payload, checksum) ─► pixels ─► PNG
//! ```
//!
//! Import mirrors it and re-checksums the decompressed bytes against the
//! value carried in the frame. Every stage hands its first error straight
//! back; nothing is retried.

use crate::checksum::checksum;
use crate::compression::{self, CompressionConfig};
use crate::container::{self, Decoration};
use crate::envelope::{self, Envelope};
use crate::error::{ArchiveError, Result, ValidationError};
use crate::frame;
use crate::progress::{ProgressSink, Stage};
use tracing::debug;

/// PNG file signature
pub const PNG_SIGNATURE: [u8; 8] = *b"\x89PNG\r\n\x1a\n";

/// Whether an artifact looks like an image export rather than a document
pub fn is_image(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
}

/// Serialize an envelope as a document artifact
pub fn encode_document(envelope: &Envelope, progress: &dyn ProgressSink) -> Result<String> {
    progress.report(Stage::Serialize, 0.5, None);
    let text = envelope::serialize(envelope)?;
    debug!("Serialized envelope to {} bytes", text.len());
    Ok(text)
}

/// Parse and validate a document artifact
pub fn decode_document(text: &str, progress: &dyn ProgressSink) -> Result<Envelope> {
    progress.report(Stage::Validate, 0.0, None);
    envelope::decode(text)
}

/// Serialize, compress and frame an envelope into a PNG artifact
pub fn encode_image(
    envelope: &Envelope,
    compression: &CompressionConfig,
    decoration: &Decoration,
    progress: &dyn ProgressSink,
) -> Result<Vec<u8>> {
    progress.report(Stage::Serialize, 0.1, None);
    let text = envelope::serialize(envelope)?;

    progress.report(Stage::Encode, 0.2, None);
    let raw = text.into_bytes();
    let digest = checksum(&raw);

    progress.report(Stage::Compress, 0.3, None);
    let compressed = compression::compress(&raw, compression)?;
    debug!(
        "Compressed {} bytes to {} (crc32 {:#010x})",
        raw.len(),
        compressed.len(),
        digest
    );

    progress.report(Stage::Frame, 0.6, None);
    let block = frame::encode_frame(&compressed, digest)?;

    progress.report(Stage::Embed, 0.8, None);
    container::embed(&block, decoration)
}

/// Extract, verify and validate the envelope carried by a PNG artifact
pub fn decode_image(image: &[u8], progress: &dyn ProgressSink) -> Result<Envelope> {
    decode_image_limited(image, compression::MAX_DECOMPRESSED_LEN, progress)
}

/// [`decode_image`] with an explicit cap on the decompressed envelope size
pub fn decode_image_limited(
    image: &[u8],
    max_payload: usize,
    progress: &dyn ProgressSink,
) -> Result<Envelope> {
    progress.report(Stage::Extract, 0.0, None);
    let block = container::extract(image)?;

    progress.report(Stage::Frame, 0.1, None);
    let (compressed, expected) = frame::decode_frame(&block.pixels, block.width, block.height)?;

    progress.report(Stage::Decompress, 0.2, None);
    let raw = compression::decompress_limited(&compressed, max_payload)?;

    verify_and_validate(raw, expected, progress)
}

fn verify_and_validate(
    raw: Vec<u8>,
    expected: u32,
    progress: &dyn ProgressSink,
) -> Result<Envelope> {
    progress.report(Stage::Verify, 0.3, None);
    let actual = checksum(&raw);
    if actual != expected {
        return Err(ArchiveError::Integrity { expected, actual });
    }

    let text = String::from_utf8(raw).map_err(|e| {
        ValidationError::InvalidSyntax(format!("payload is not UTF-8: {}", e))
    })?;

    progress.report(Stage::Validate, 0.4, None);
    envelope::decode(&text)
}

/// [`encode_image`] with the blocking codec work moved off the async runtime
#[cfg(feature = "async")]
pub async fn encode_image_async(
    envelope: &Envelope,
    compression: CompressionConfig,
    decoration: Decoration,
    progress: &dyn ProgressSink,
) -> Result<Vec<u8>> {
    progress.report(Stage::Serialize, 0.1, None);
    let raw = envelope::serialize(envelope)?.into_bytes();
    let digest = checksum(&raw);

    progress.report(Stage::Compress, 0.3, None);
    let compressed = compression::compress_async(raw, compression).await?;

    progress.report(Stage::Frame, 0.6, None);
    let block = frame::encode_frame(&compressed, digest)?;

    progress.report(Stage::Embed, 0.8, None);
    tokio::task::spawn_blocking(move || container::embed(&block, &decoration))
        .await
        .map_err(|e| ArchiveError::Image(format!("image encode task failed: {}", e)))?
}

/// [`decode_image`] with the blocking codec work moved off the async runtime
#[cfg(feature = "async")]
pub async fn decode_image_async(image: Vec<u8>, progress: &dyn ProgressSink) -> Result<Envelope> {
    progress.report(Stage::Extract, 0.0, None);
    let block = tokio::task::spawn_blocking(move || container::extract(&image))
        .await
        .map_err(|e| ArchiveError::Image(format!("image decode task failed: {}", e)))??;

    progress.report(Stage::Frame, 0.1, None);
    let (compressed, expected) = frame::decode_frame(&block.pixels, block.width, block.height)?;

    progress.report(Stage::Decompress, 0.2, None);
    let raw = compression::decompress_async(compressed, compression::MAX_DECOMPRESSED_LEN).await?;

    verify_and_validate(raw, expected, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Settings;
    use crate::progress::NoProgress;
    use crate::records::{Collections, Tag};

    fn sample() -> Envelope {
        let mut collections = Collections::default();
        for id in 1..=50 {
            collections.tags.push(Tag {
                id,
                name: format!("tag-{}", id),
                color: None,
            });
        }
        Envelope::build(collections, Settings::new(), "Pipeline")
    }

    #[test]
    fn test_image_round_trip() {
        let envelope = sample();
        let image = encode_image(
            &envelope,
            &CompressionConfig::default(),
            &Decoration::default(),
            &NoProgress,
        )
        .unwrap();

        assert!(is_image(&image));
        assert_eq!(decode_image(&image, &NoProgress).unwrap(), envelope);
    }

    #[test]
    fn test_document_round_trip() {
        let envelope = sample();
        let text = encode_document(&envelope, &NoProgress).unwrap();
        assert!(!is_image(text.as_bytes()));
        assert_eq!(decode_document(&text, &NoProgress).unwrap(), envelope);
    }

    #[test]
    fn test_checksum_mismatch_is_integrity_error() {
        let raw = b"{}".to_vec();
        let wrong = checksum(&raw) ^ 1;
        assert!(matches!(
            verify_and_validate(raw, wrong, &NoProgress),
            Err(ArchiveError::Integrity { .. })
        ));
    }

    #[test]
    fn test_non_utf8_payload() {
        let raw = vec![0xFF, 0xFE, 0x00];
        let digest = checksum(&raw);
        assert!(matches!(
            verify_and_validate(raw, digest, &NoProgress),
            Err(ArchiveError::Validation(ValidationError::InvalidSyntax(_)))
        ));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let image = encode_image(
            &sample(),
            &CompressionConfig::default(),
            &Decoration::default(),
            &NoProgress,
        )
        .unwrap();

        assert!(matches!(
            decode_image_limited(&image, 256, &NoProgress),
            Err(ArchiveError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_fractions_stay_below_import() {
        let image = encode_image(
            &sample(),
            &CompressionConfig::default(),
            &Decoration::default(),
            &NoProgress,
        )
        .unwrap();

        let fractions = std::cell::RefCell::new(Vec::new());
        let sink = |_: Stage, fraction: f64, _: Option<&str>| fractions.borrow_mut().push(fraction);
        decode_image(&image, &sink).unwrap();

        let fractions = fractions.into_inner();
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert!(fractions.iter().all(|f| *f < crate::restore::IMPORT_START));
    }

    #[test]
    fn test_framed_garbage_is_decode_error() {
        let block = frame::encode_frame(b"not gzip at all", 0).unwrap();
        let image = container::embed(&block, &Decoration::default()).unwrap();
        assert!(matches!(
            decode_image(&image, &NoProgress),
            Err(ArchiveError::Decode(_))
        ));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_async_round_trip() {
        let envelope = sample();
        let image = encode_image_async(
            &envelope,
            CompressionConfig::default(),
            Decoration::default(),
            &NoProgress,
        )
        .await
        .unwrap();
        let decoded = decode_image_async(image, &NoProgress).await.unwrap();
        assert_eq!(decoded, envelope);
    }
}
