// CM6 codec: GSE2 "compressed 6-bit" ASCII encoding of i32 sample arrays.
//
// Each sample (after differencing) becomes 1..=7 printable symbols. The
// first symbol carries a sign flag, a continuation flag and the top four
// magnitude bits; every following symbol carries a continuation flag and
// five more magnitude bits.
//
// # Modules
//
// - `alphabet`: the 64-symbol table and its inverse
// - `diff`: in-place finite differencing and its inverse
// - `encoder`: samples -> symbols
// - `decoder`: symbols -> samples, with truncation/short-decode warnings
// - `checksum`: GSE CHK2 checksum over logical samples

pub mod alphabet;
pub mod checksum;
pub mod decoder;
pub mod diff;
pub mod encoder;

pub use checksum::{ChecksumMismatch, checksum, verify};
pub use decoder::{
    DecodeError, DecodeOptions, DecodeWarning, Decoded, InvalidBytePolicy, SampleCount, decode,
    decode_all,
};
pub use encoder::{DigitBudget, EncodeError, EncodeOptions, encode, encode_into};

/// Differencing order fixed by the GSE2 format.
pub const DEFAULT_DIFFERENCES: u32 = 2;

/// Magnitude bits carried by the first symbol of a value.
pub const FIRST_DIGIT_BITS: u32 = 4;

/// Magnitude bits carried by each following symbol.
pub const NEXT_DIGIT_BITS: u32 = 5;

bitflags::bitflags! {
    /// Flag bits inside a 6-bit CM6 code.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DigitFlags: u8 {
        /// Set on the first symbol of a negative value.
        const SIGN = 0x10;
        /// Another symbol of the same value follows.
        const CONTINUE = 0x20;
    }
}

impl DigitFlags {
    /// Flags carried by a 6-bit code. Magnitude bits are ignored.
    #[inline]
    pub fn of(code: u8) -> Self {
        Self::from_bits_truncate(code)
    }
}
