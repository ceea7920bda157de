#![no_main]
use gsecm6::cm6::{self, DecodeOptions, DigitBudget, EncodeOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&control, rest)) = data.split_first() else {
        return;
    };
    let differences = u32::from(control & 0x03);
    let samples: Vec<i32> = rest
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    let before = samples.clone();

    let symbols = cm6::encode(&samples, &EncodeOptions {
        differences,
        budget: DigitBudget::Extended,
    })
    .expect("extended budget accepts every i32");
    let decoded = cm6::decode(&symbols, &DecodeOptions {
        differences,
        ..Default::default()
    })
    .unwrap();
    assert!(decoded.is_clean());
    assert_eq!(decoded.samples, samples);
    assert_eq!(samples, before);

    // The GSE budget either produces the same stream or refuses outright.
    let mut out = Vec::new();
    match cm6::encode_into(&samples, &mut out, &EncodeOptions {
        differences,
        budget: DigitBudget::Gse,
    }) {
        Ok(_) => assert_eq!(out, symbols),
        Err(_) => assert!(out.is_empty()),
    }
});
