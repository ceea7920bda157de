#![no_main]
use gsecm6::cm6::{self, DecodeOptions, InvalidBytePolicy, SampleCount};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must never panic; only Reject may return an error.
    let Some((&control, input)) = data.split_first() else {
        return;
    };
    let differences = u32::from(control & 0x07);
    let count = match control >> 6 {
        0 => SampleCount::All,
        n => SampleCount::Exactly(usize::from(n) * input.len() / 2),
    };

    for invalid_bytes in [
        InvalidBytePolicy::Zero,
        InvalidBytePolicy::Warn,
        InvalidBytePolicy::Reject,
    ] {
        let opts = DecodeOptions {
            differences,
            count,
            invalid_bytes,
        };
        match cm6::decode(input, &opts) {
            Ok(decoded) => assert!(decoded.samples.len() <= input.len()),
            Err(e) => assert_eq!(invalid_bytes, InvalidBytePolicy::Reject, "{e}"),
        }
    }
});
