use thiserror::Error;

/// Structural corruption of a frame, pixel block or image container
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("missing start marker")]
    MissingStartMarker,

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),

    #[error("wrong data length: header claims {declared} bytes, {available} available")]
    WrongDataLength { declared: u64, available: u64 },

    #[error("missing end marker")]
    MissingEndMarker,

    #[error("missing metadata marker")]
    MissingMetadataMarker,

    #[error("dimensions out of bounds: {block_width}x{block_height} block in {canvas_width}x{canvas_height} image")]
    DimensionsOutOfBounds {
        block_width: u32,
        block_height: u32,
        canvas_width: u32,
        canvas_height: u32,
    },

    #[error("pixel buffer size mismatch: expected {expected} bytes, got {actual}")]
    PixelBufferMismatch { expected: usize, actual: usize },

    #[error("payload too large for image container: {0} bytes")]
    PayloadTooLarge(usize),

    #[error("not a png image: {0}")]
    NotPng(String),

    #[error("unsupported pixel format: {0}")]
    UnsupportedPixelFormat(String),
}

/// Envelope schema failures, reported in the order they are checked
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid syntax: {0}")]
    InvalidSyntax(String),

    #[error("not a recognized export")]
    NotRecognized,

    #[error("unsupported version: {0}")]
    UnsupportedVersion(String),

    #[error("missing collections")]
    MissingCollections,

    #[error("missing collection: {0}")]
    MissingCollection(&'static str),

    #[error("collection {0} is not a list")]
    NotAList(&'static str),

    #[error("missing settings")]
    MissingSettings,

    #[error("collection {collection} row {index} is malformed: {reason}")]
    MalformedRow {
        collection: &'static str,
        index: usize,
        reason: String,
    },

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Integrity error: checksum mismatch (expected {expected:#010x}, got {actual:#010x})")]
    Integrity { expected: u32, actual: u32 },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_messages_are_user_facing() {
        assert_eq!(
            FormatError::MissingStartMarker.to_string(),
            "missing start marker"
        );
        assert_eq!(
            FormatError::MissingEndMarker.to_string(),
            "missing end marker"
        );
        assert_eq!(
            FormatError::UnsupportedVersion(7).to_string(),
            "unsupported version: 7"
        );

        let err: ArchiveError = FormatError::MissingMetadataMarker.into();
        assert_eq!(err.to_string(), "Format error: missing metadata marker");
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::MissingCollection("words").to_string(),
            "missing collection: words"
        );
        assert_eq!(
            ValidationError::NotAList("tags").to_string(),
            "collection tags is not a list"
        );
        assert_eq!(
            ValidationError::UnsupportedVersion("2".into()).to_string(),
            "unsupported version: 2"
        );
    }

    #[test]
    fn test_integrity_message_shows_both_checksums() {
        let err = ArchiveError::Integrity {
            expected: 0xCBF43926,
            actual: 0,
        };
        let msg = err.to_string();
        assert!(msg.contains("checksum mismatch"));
        assert!(msg.contains("0xcbf43926"));
    }
}
