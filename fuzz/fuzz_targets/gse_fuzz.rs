#![no_main]
use std::io::Cursor;

use gsecm6::gse::{ChecksumPolicy, GseReader, ReaderOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for checksum in [ChecksumPolicy::Warn, ChecksumPolicy::Enforce] {
        let reader = GseReader::with_options(Cursor::new(data), ReaderOptions { checksum });
        for waveform in reader.take(64) {
            let Ok(w) = waveform else {
                break;
            };
            assert_eq!(w.header.sample_count, w.samples.len());
            assert_eq!(w.checksum, gsecm6::cm6::checksum(&w.samples));
        }
    }
});
