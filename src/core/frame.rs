//! Marker-delimited binary frame packed into RGB pixel triplets
//!
//! ## Layout
//!
//! ```text
//! offset  size  field
//! 0       8     start marker "LXFRAME>"
//! 8       1     format version (1)
//! 9       4     payload length N (big-endian u32)
//! 13      N     payload
//! 13+N    4     checksum (big-endian u32)
//! 17+N    8     end marker "<LXFRAME"
//! ```
//!
//! The frame is then laid out three bytes per pixel (R, G, B) across a
//! near-square RGBA grid. Alpha is always 255 and trailing capacity is zero.
//!
//! The checksum is carried opaquely: this layer never computes or checks it,
//! and knows nothing about what the payload contains.

use crate::error::{FormatError, Result};

pub const START_MARKER: [u8; 8] = *b"LXFRAME>";
pub const END_MARKER: [u8; 8] = *b"<LXFRAME";
pub const FORMAT_VERSION: u8 = 1;

/// Start marker + version + length
pub const HEADER_LEN: usize = 8 + 1 + 4;

/// Checksum + end marker
pub const FOOTER_LEN: usize = 4 + 8;

/// Frame bytes carried by one pixel
pub const BYTES_PER_PIXEL: usize = 3;

/// RGBA
pub const CHANNELS: usize = 4;

/// RGBA pixel grid carrying a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBlock {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA, `width * height * 4` bytes
    pub pixels: Vec<u8>,
}

impl PixelBlock {
    /// Number of frame bytes the block can hold
    pub fn capacity(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }
}

/// Total frame length for a payload of `payload_len` bytes
pub const fn frame_len(payload_len: usize) -> usize {
    HEADER_LEN + payload_len + FOOTER_LEN
}

/// Serialize payload and checksum into the raw frame byte stream
pub fn frame_bytes(payload: &[u8], checksum: u32) -> Result<Vec<u8>> {
    let length = u32::try_from(payload.len())
        .map_err(|_| FormatError::PayloadTooLarge(payload.len()))?;

    let mut bytes = Vec::with_capacity(frame_len(payload.len()));
    bytes.extend_from_slice(&START_MARKER);
    bytes.push(FORMAT_VERSION);
    bytes.extend_from_slice(&length.to_be_bytes());
    bytes.extend_from_slice(payload);
    bytes.extend_from_slice(&checksum.to_be_bytes());
    bytes.extend_from_slice(&END_MARKER);

    Ok(bytes)
}

/// Parse a raw frame byte stream, ignoring anything after the end marker
///
/// Checks run in a fixed order: start marker, version, length, end marker.
pub fn parse_frame(stream: &[u8]) -> Result<(Vec<u8>, u32)> {
    if stream.get(..START_MARKER.len()) != Some(&START_MARKER[..]) {
        return Err(FormatError::MissingStartMarker.into());
    }

    let version = stream
        .get(8)
        .copied()
        .ok_or(FormatError::UnsupportedVersion(0))?;
    if version != FORMAT_VERSION {
        return Err(FormatError::UnsupportedVersion(version).into());
    }

    let available = stream.len() as u64;
    let length_bytes: [u8; 4] = stream
        .get(9..HEADER_LEN)
        .and_then(|b| b.try_into().ok())
        .ok_or(FormatError::WrongDataLength {
            declared: 0,
            available,
        })?;
    let declared = u32::from_be_bytes(length_bytes) as u64;

    // Widened to u64 so a hostile length cannot wrap the bound check
    if HEADER_LEN as u64 + declared + FOOTER_LEN as u64 > available {
        return Err(FormatError::WrongDataLength {
            declared,
            available,
        }
        .into());
    }

    let payload_end = HEADER_LEN + declared as usize;
    let payload = stream[HEADER_LEN..payload_end].to_vec();

    let mut checksum_bytes = [0u8; 4];
    checksum_bytes.copy_from_slice(&stream[payload_end..payload_end + 4]);
    let checksum = u32::from_be_bytes(checksum_bytes);

    let end = &stream[payload_end + 4..payload_end + FOOTER_LEN];
    if end != END_MARKER {
        return Err(FormatError::MissingEndMarker.into());
    }

    Ok((payload, checksum))
}

/// Smallest near-square grid holding `byte_len` bytes at three per pixel
///
/// Width is the ceiling of the square root of the pixel count, height is
/// however many rows that width needs. Never smaller than 1x1.
pub fn block_dimensions(byte_len: usize) -> (u32, u32) {
    let pixels = byte_len.div_ceil(BYTES_PER_PIXEL).max(1) as u64;

    let mut width = (pixels as f64).sqrt().ceil() as u64;
    // Float sqrt can be off by one for large inputs
    while width * width < pixels {
        width += 1;
    }
    while width > 1 && (width - 1) * (width - 1) >= pixels {
        width -= 1;
    }
    let height = pixels.div_ceil(width);

    (width as u32, height as u32)
}

/// Lay a byte stream out as RGB triplets in an opaque RGBA grid
pub fn pack_pixels(bytes: &[u8]) -> PixelBlock {
    let (width, height) = block_dimensions(bytes.len());
    let pixel_count = width as usize * height as usize;

    let mut pixels = vec![0u8; pixel_count * CHANNELS];
    for (pixel, rgba) in pixels.chunks_exact_mut(CHANNELS).enumerate() {
        let start = pixel * BYTES_PER_PIXEL;
        for (channel, value) in rgba[..BYTES_PER_PIXEL].iter_mut().enumerate() {
            *value = bytes.get(start + channel).copied().unwrap_or(0);
        }
        rgba[3] = 0xFF;
    }

    PixelBlock {
        width,
        height,
        pixels,
    }
}

/// Read every pixel's R, G, B back into a byte stream (alpha dropped)
pub fn unpack_pixels(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let expected = width as usize * height as usize * CHANNELS;
    if pixels.len() != expected {
        return Err(FormatError::PixelBufferMismatch {
            expected,
            actual: pixels.len(),
        }
        .into());
    }

    let mut bytes = Vec::with_capacity(width as usize * height as usize * BYTES_PER_PIXEL);
    for rgba in pixels.chunks_exact(CHANNELS) {
        bytes.extend_from_slice(&rgba[..BYTES_PER_PIXEL]);
    }
    Ok(bytes)
}

/// Frame a payload and pack it into a pixel block
pub fn encode_frame(payload: &[u8], checksum: u32) -> Result<PixelBlock> {
    let bytes = frame_bytes(payload, checksum)?;
    Ok(pack_pixels(&bytes))
}

/// Unpack a pixel block and parse the frame it carries
pub fn decode_frame(pixels: &[u8], width: u32, height: u32) -> Result<(Vec<u8>, u32)> {
    let stream = unpack_pixels(pixels, width, height)?;
    parse_frame(&stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArchiveError;

    fn assert_format(result: Result<(Vec<u8>, u32)>, expected: FormatError) {
        match result {
            Err(ArchiveError::Format(err)) => assert_eq!(err, expected),
            other => panic!("expected {:?}, got {:?}", expected, other),
        }
    }

    /// Overwrite frame byte `offset` inside a packed block
    fn poke(block: &mut PixelBlock, offset: usize, value: u8) {
        let pixel = offset / BYTES_PER_PIXEL;
        let channel = offset % BYTES_PER_PIXEL;
        block.pixels[pixel * CHANNELS + channel] = value;
    }

    #[test]
    fn test_exact_byte_layout() {
        let bytes = frame_bytes(&[0xAA, 0xBB], 0).unwrap();

        assert_eq!(bytes.len(), 27);
        assert_eq!(&bytes[0..8], &START_MARKER);
        assert_eq!(bytes[8], 1);
        assert_eq!(&bytes[9..13], &[0x00, 0x00, 0x00, 0x02]);
        assert_eq!(&bytes[13..15], &[0xAA, 0xBB]);
        assert_eq!(&bytes[15..19], &[0x00, 0x00, 0x00, 0x00]);
        assert_eq!(&bytes[19..27], &END_MARKER);
    }

    #[test]
    fn test_checksum_is_big_endian() {
        let bytes = frame_bytes(b"", 0xCBF43926).unwrap();
        assert_eq!(&bytes[13..17], &[0xCB, 0xF4, 0x39, 0x26]);
    }

    #[test]
    fn test_pixel_packing() {
        let block = encode_frame(&[0xAA, 0xBB], 0).unwrap();

        // 27 bytes -> 9 pixels -> 3x3
        assert_eq!((block.width, block.height), (3, 3));
        assert_eq!(block.pixels.len(), 36);

        // First pixel carries the first three marker bytes
        assert_eq!(&block.pixels[0..4], &[b'L', b'X', b'F', 0xFF]);
        // Every alpha is opaque
        assert!(block.pixels.chunks_exact(4).all(|p| p[3] == 0xFF));
    }

    #[test]
    fn test_padding_is_zero_filled() {
        // 25 bytes -> 9 pixels (27 capacity), 2 bytes of padding
        let block = encode_frame(&[], 7).unwrap();
        assert_eq!(block.capacity(), 27);
        let last = &block.pixels[block.pixels.len() - 4..];
        assert_eq!(last, &[b'E', 0, 0, 0xFF]);
    }

    #[test]
    fn test_block_dimensions() {
        assert_eq!(block_dimensions(0), (1, 1));
        assert_eq!(block_dimensions(3), (1, 1));
        assert_eq!(block_dimensions(4), (2, 1));
        assert_eq!(block_dimensions(27), (3, 3));
        assert_eq!(block_dimensions(28), (4, 3));
        assert_eq!(block_dimensions(30), (4, 3));
        // 10 pixels: width 4, 3 rows
        let (w, h) = block_dimensions(10 * 3);
        assert_eq!((w, h), (4, 3));
    }

    #[test]
    fn test_block_dimensions_are_minimal() {
        for len in 1..2000usize {
            let (w, h) = block_dimensions(len);
            let pixels = len.div_ceil(3);
            assert!((w as usize) * (h as usize) >= pixels, "len {}", len);
            assert!(h <= w, "len {} gave {}x{}", len, w, h);
            assert!(((w - 1) as usize) * ((w - 1) as usize) < pixels);
        }
    }

    #[test]
    fn test_round_trip_empty() {
        let block = encode_frame(&[], 0).unwrap();
        let (payload, checksum) = decode_frame(&block.pixels, block.width, block.height).unwrap();
        assert!(payload.is_empty());
        assert_eq!(checksum, 0);
    }

    #[test]
    fn test_round_trip_large() {
        let payload: Vec<u8> = (0..12_345u32).map(|i| (i * 7 + 3) as u8).collect();
        let block = encode_frame(&payload, 0xDEADBEEF).unwrap();
        let (decoded, checksum) = decode_frame(&block.pixels, block.width, block.height).unwrap();
        assert_eq!(decoded, payload);
        assert_eq!(checksum, 0xDEADBEEF);
    }

    #[test]
    fn test_missing_start_marker() {
        let mut block = encode_frame(b"payload", 1).unwrap();
        for offset in 0..8 {
            poke(&mut block, offset, 0);
        }
        assert_format(
            decode_frame(&block.pixels, block.width, block.height),
            FormatError::MissingStartMarker,
        );
    }

    #[test]
    fn test_unsupported_version() {
        let mut block = encode_frame(b"payload", 1).unwrap();
        poke(&mut block, 8, 2);
        assert_format(
            decode_frame(&block.pixels, block.width, block.height),
            FormatError::UnsupportedVersion(2),
        );
    }

    #[test]
    fn test_corrupted_length_fails_cleanly() {
        let mut block = encode_frame(b"payload", 1).unwrap();
        for (i, b) in [0xFF, 0x00, 0x00, 0x00].iter().enumerate() {
            poke(&mut block, 9 + i, *b);
        }
        let result = decode_frame(&block.pixels, block.width, block.height);
        assert!(matches!(
            result,
            Err(ArchiveError::Format(FormatError::WrongDataLength {
                declared: 0xFF00_0000,
                ..
            }))
        ));
    }

    #[test]
    fn test_max_length_does_not_overflow() {
        let mut bytes = frame_bytes(b"abc", 0).unwrap();
        bytes[9..13].copy_from_slice(&[0xFF; 4]);
        assert!(matches!(
            parse_frame(&bytes),
            Err(ArchiveError::Format(FormatError::WrongDataLength { .. }))
        ));
    }

    #[test]
    fn test_missing_end_marker() {
        let mut block = encode_frame(&[0xAA, 0xBB], 0).unwrap();
        poke(&mut block, 20, b'?');
        assert_format(
            decode_frame(&block.pixels, block.width, block.height),
            FormatError::MissingEndMarker,
        );
    }

    #[test]
    fn test_truncated_streams() {
        assert_format(parse_frame(&[]), FormatError::MissingStartMarker);
        assert_format(parse_frame(&START_MARKER), FormatError::UnsupportedVersion(0));

        let mut short = START_MARKER.to_vec();
        short.extend_from_slice(&[FORMAT_VERSION, 0, 0]);
        assert_format(
            parse_frame(&short),
            FormatError::WrongDataLength {
                declared: 0,
                available: 11,
            },
        );
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut bytes = frame_bytes(b"xyz", 42).unwrap();
        bytes.extend_from_slice(&[0u8; 100]);
        let (payload, checksum) = parse_frame(&bytes).unwrap();
        assert_eq!(payload, b"xyz");
        assert_eq!(checksum, 42);
    }

    #[test]
    fn test_pixel_buffer_mismatch() {
        let block = encode_frame(b"payload", 1).unwrap();
        let result = decode_frame(&block.pixels[4..], block.width, block.height);
        assert!(matches!(
            result,
            Err(ArchiveError::Format(FormatError::PixelBufferMismatch { .. }))
        ));
    }
}
