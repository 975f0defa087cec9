#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lexicon_archive::core::frame::{decode_frame, CHANNELS};

#[derive(Arbitrary, Debug)]
struct Input {
    width: u8,
    height: u8,
    pixels: Vec<u8>,
}

// Arbitrary pixel grids must decode to a frame or a format error, never panic
fuzz_target!(|input: Input| {
    let width = input.width as u32;
    let height = input.height as u32;

    let mut pixels = input.pixels;
    pixels.resize(width as usize * height as usize * CHANNELS, 0);

    let _ = decode_frame(&pixels, width, height);
});
