//! Corruption detection through the full image import path
//!
//! Each test damages one layer of an otherwise valid artifact and checks
//! that import stops with that layer's error and leaves the store untouched.

use lexicon_archive::core::checksum::checksum;
use lexicon_archive::core::compression::{compress, CompressionConfig};
use lexicon_archive::core::container::{self, Decoration, BLOCK_OFFSET};
use lexicon_archive::core::envelope;
use lexicon_archive::core::frame::{self, PixelBlock, BYTES_PER_PIXEL, CHANNELS};
use lexicon_archive::core::records::Tag;
use lexicon_archive::{
    ArchiveError, CollectionKind, Collections, Envelope, FormatError, LexiconStore,
    MemorySettings, MemoryStore, NoProgress, Settings, Transfer,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn payload() -> (Vec<u8>, u32) {
    let mut collections = Collections::default();
    collections.tags.push(Tag {
        id: 1,
        name: "kept".into(),
        color: None,
    });
    let raw = envelope::serialize(&Envelope::build(collections, Settings::new(), "Good"))
        .unwrap()
        .into_bytes();
    let digest = checksum(&raw);
    (compress(&raw, &CompressionConfig::default()).unwrap(), digest)
}

fn valid_block() -> PixelBlock {
    let (compressed, digest) = payload();
    frame::encode_frame(&compressed, digest).unwrap()
}

/// Overwrite one frame byte inside a pixel block
fn poke(block: &mut PixelBlock, offset: usize, value: u8) {
    let pixel = offset / BYTES_PER_PIXEL;
    block.pixels[pixel * CHANNELS + offset % BYTES_PER_PIXEL] = value;
}

fn image_of(block: &PixelBlock) -> Vec<u8> {
    container::embed(block, &Decoration::default()).unwrap()
}

/// Decode a PNG, let `edit` change the raw RGBA canvas, encode it again
fn edit_canvas(image: &[u8], edit: impl FnOnce(&mut [u8], u32)) -> Vec<u8> {
    let decoder = png::Decoder::new(image);
    let mut reader = decoder.read_info().unwrap();
    let mut canvas = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut canvas).unwrap();
    canvas.truncate(info.buffer_size());
    edit(&mut canvas, info.width);

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, info.width, info.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(&canvas).unwrap();
        writer.finish().unwrap();
    }
    out
}

/// Import into a store seeded with one row and return the error
fn import_error(image: &[u8]) -> ArchiveError {
    let mut seed = Collections::default();
    seed.tags.push(Tag {
        id: 42,
        name: "original".into(),
        color: None,
    });
    let transfer = Transfer::new(MemoryStore::new(), MemorySettings::default());
    let seed = envelope::serialize(&Envelope::build(seed, Settings::new(), "Seed")).unwrap();
    transfer.import_document(&seed, &NoProgress).unwrap();

    let err = transfer.import_image(image, &NoProgress).unwrap_err();

    let (store, _) = transfer.into_inner();
    let tags = store.query_all(CollectionKind::Tags).unwrap();
    assert_eq!(tags.len(), 1, "store changed after failed import: {}", err);
    assert_eq!(store.persist_count(), 1);
    err
}

#[test]
fn test_valid_image_imports() {
    let transfer = Transfer::new(MemoryStore::new(), MemorySettings::default());
    let summary = transfer
        .import_image(&image_of(&valid_block()), &NoProgress)
        .unwrap();
    assert_eq!(summary.total_rows(), 1);
}

#[test]
fn test_flipped_start_marker() {
    let mut block = valid_block();
    poke(&mut block, 0, b'X');

    assert!(matches!(
        import_error(&image_of(&block)),
        ArchiveError::Format(FormatError::MissingStartMarker)
    ));
}

#[test]
fn test_unsupported_version() {
    let mut block = valid_block();
    poke(&mut block, 8, 2);

    assert!(matches!(
        import_error(&image_of(&block)),
        ArchiveError::Format(FormatError::UnsupportedVersion(2))
    ));
}

#[test]
fn test_huge_length_field() {
    let mut block = valid_block();
    for (i, byte) in 0xFF00_0000u32.to_be_bytes().into_iter().enumerate() {
        poke(&mut block, 9 + i, byte);
    }

    assert!(matches!(
        import_error(&image_of(&block)),
        ArchiveError::Format(FormatError::WrongDataLength {
            declared: 0xFF00_0000,
            ..
        })
    ));
}

#[test]
fn test_flipped_end_marker() {
    let (compressed, digest) = payload();
    let mut block = frame::encode_frame(&compressed, digest).unwrap();
    let end = frame::frame_len(compressed.len()) - 1;
    poke(&mut block, end, b'?');

    assert!(matches!(
        import_error(&image_of(&block)),
        ArchiveError::Format(FormatError::MissingEndMarker)
    ));
}

#[test]
fn test_checksum_mismatch() {
    let (compressed, digest) = payload();
    let block = frame::encode_frame(&compressed, digest ^ 0x0000_0100).unwrap();

    match import_error(&image_of(&block)) {
        ArchiveError::Integrity { expected, actual } => {
            assert_eq!(expected, digest ^ 0x0000_0100);
            assert_eq!(actual, digest);
        }
        other => panic!("expected integrity error, got {}", other),
    }
}

#[test]
fn test_corrupted_compressed_payload() {
    let (mut compressed, digest) = payload();
    let middle = compressed.len() / 2;
    compressed.truncate(middle);
    let block = frame::encode_frame(&compressed, digest).unwrap();

    assert!(matches!(
        import_error(&image_of(&block)),
        ArchiveError::Decode(_)
    ));
}

#[test]
fn test_random_payload_bit_flips() {
    let (compressed, digest) = payload();
    // Skip the gzip header's timestamp and OS bytes, which decoders ignore
    let start = frame::HEADER_LEN + 10;
    let mut rng = StdRng::seed_from_u64(0x1e71c0);

    for _ in 0..64 {
        let mut block = frame::encode_frame(&compressed, digest).unwrap();
        let offset = start + rng.gen_range(0..compressed.len() - 10);
        let index = (offset / BYTES_PER_PIXEL) * CHANNELS + offset % BYTES_PER_PIXEL;
        block.pixels[index] ^= 1 << rng.gen_range(0..8);

        let err = import_error(&image_of(&block));
        assert!(
            matches!(err, ArchiveError::Decode(_) | ArchiveError::Integrity { .. }),
            "unexpected error at offset {}: {}",
            offset,
            err
        );
    }
}

#[test]
fn test_erased_metadata_tag() {
    let image = edit_canvas(&image_of(&valid_block()), |canvas, _| {
        canvas[0..3].copy_from_slice(&[0, 0, 0]);
    });

    assert!(matches!(
        import_error(&image),
        ArchiveError::Format(FormatError::MissingMetadataMarker)
    ));
}

#[test]
fn test_header_claims_oversized_block() {
    let image = edit_canvas(&image_of(&valid_block()), |canvas, _| {
        // Pixel 1 carries the width bytes
        canvas[4] = 0x7F;
        canvas[5] = 0xFF;
    });

    assert!(matches!(
        import_error(&image),
        ArchiveError::Format(FormatError::DimensionsOutOfBounds { .. })
    ));
}

#[test]
fn test_decoration_damage_is_harmless() {
    let block = valid_block();
    let image = edit_canvas(&image_of(&block), |canvas, width| {
        // Scribble over the bottom-right margin pixel
        let last = canvas.len() - CHANNELS;
        canvas[last..].copy_from_slice(&[1, 2, 3, 255]);
        // and one margin pixel just left of the block
        let row = (BLOCK_OFFSET + 1) as usize;
        let x = (BLOCK_OFFSET - 1) as usize;
        let at = (row * width as usize + x) * CHANNELS;
        canvas[at..at + CHANNELS].copy_from_slice(&[9, 9, 9, 255]);
    });

    let transfer = Transfer::new(MemoryStore::new(), MemorySettings::default());
    assert!(transfer.import_image(&image, &NoProgress).is_ok());
}

#[test]
fn test_not_a_png() {
    assert!(matches!(
        import_error(b"\x89PNG\r\n\x1a\nthis is not really a png"),
        ArchiveError::Format(FormatError::NotPng(_))
    ));
}
