#![no_main]
use libfuzzer_sys::fuzz_target;
use lexicon_archive::{inspect_image, NoProgress};
use lexicon_archive::core::pipeline::decode_image;

fuzz_target!(|data: &[u8]| {
    if inspect_image(data).is_ok() {
        // Anything that inspects cleanly must also decode
        assert!(decode_image(data, &NoProgress).is_ok());
    }
});
