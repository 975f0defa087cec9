#![no_main]
use libfuzzer_sys::fuzz_target;
use lexicon_archive::core::envelope;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // A document that validates must survive a serialize/validate cycle
    if let Ok(parsed) = envelope::decode(text) {
        let again = envelope::serialize(&parsed).unwrap();
        assert_eq!(envelope::decode(&again).unwrap(), parsed);
    }
});
