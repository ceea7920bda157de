// CM6 decoder.
//
// Follows the long-standing GSE reader behaviour:
//   - bytes outside the alphabet decode as code 0 unless a stricter
//     `InvalidBytePolicy` is selected
//   - a value cut off mid-continuation keeps its partial accumulation and
//     produces a `Truncated` warning instead of failing the whole decode
//   - magnitude accumulation wraps modulo 2^32, so overlong digit runs can
//     never panic
//
// Only allocation failure (and `InvalidBytePolicy::Reject`) is fatal.

use std::collections::TryReserveError;
use std::fmt;

use log::{trace, warn};
use thiserror::Error;

use super::{DEFAULT_DIFFERENCES, DigitFlags, NEXT_DIGIT_BITS, alphabet, diff};

/// Starting capacity when the sample count is not known in advance.
pub const INITIAL_CAPACITY: usize = 10;

const FIRST_DIGIT_MASK: u8 = 0x0F;
const NEXT_DIGIT_MASK: u8 = 0x1F;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How many values to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleCount {
    /// Decode until the input is exhausted.
    #[default]
    All,
    /// Decode at most this many values; report a shortfall as a warning.
    Exactly(usize),
}

impl SampleCount {
    /// Map the legacy "requested count" convention: positive means exactly
    /// that many, zero or negative means all.
    pub fn from_requested(requested: i64) -> Self {
        match usize::try_from(requested) {
            Ok(n) if n > 0 => Self::Exactly(n),
            _ => Self::All,
        }
    }
}

/// What to do with bytes that are not CM6 symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidBytePolicy {
    /// Treat as code 0 without comment (legacy behaviour).
    #[default]
    Zero,
    /// Treat as code 0 and record a [`DecodeWarning::InvalidByte`].
    Warn,
    /// Fail with [`DecodeError::InvalidByte`].
    Reject,
}

/// Configuration for CM6 decoding.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Differencing order to undo after unpacking.
    pub differences: u32,
    /// Number of values to decode.
    pub count: SampleCount,
    /// Handling of bytes outside the alphabet.
    pub invalid_bytes: InvalidBytePolicy,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            differences: DEFAULT_DIFFERENCES,
            count: SampleCount::All,
            invalid_bytes: InvalidBytePolicy::Zero,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors and warnings
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("allocation failed: {0}")]
    Alloc(#[from] TryReserveError),
    #[error("byte {byte:#04x} at offset {offset} is not a CM6 symbol")]
    InvalidByte { byte: u8, offset: usize },
}

/// Non-fatal conditions found while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeWarning {
    /// Input ended while value `index` still expected a continuation symbol.
    Truncated { index: usize },
    /// Fewer values than requested were present.
    ShortDecode { expected: usize, decoded: usize },
    /// A byte outside the alphabet was read as code 0.
    InvalidByte { byte: u8, offset: usize },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { index } => {
                write!(f, "truncated data: value {index} is missing continuation symbols")
            }
            Self::ShortDecode { expected, decoded } => {
                write!(f, "{decoded} of {expected} samples unpacked")
            }
            Self::InvalidByte { byte, offset } => {
                write!(f, "byte {byte:#04x} at offset {offset} read as code 0")
            }
        }
    }
}

/// Result of a successful decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Logical (un-differenced) samples.
    pub samples: Vec<i32>,
    /// Warnings in the order they were raised.
    pub warnings: Vec<DecodeWarning>,
}

impl Decoded {
    /// True if no warnings were raised.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn is_truncated(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, DecodeWarning::Truncated { .. }))
    }
}

// ---------------------------------------------------------------------------
// Symbol reader
// ---------------------------------------------------------------------------

struct SymbolReader<'a> {
    input: &'a [u8],
    pos: usize,
    policy: InvalidBytePolicy,
}

impl SymbolReader<'_> {
    fn next_code(&mut self, warnings: &mut Vec<DecodeWarning>) -> Result<Option<u8>, DecodeError> {
        let Some(&byte) = self.input.get(self.pos) else {
            return Ok(None);
        };
        let offset = self.pos;
        self.pos += 1;

        if let Some(code) = alphabet::lookup(byte) {
            return Ok(Some(code));
        }
        match self.policy {
            InvalidBytePolicy::Zero => Ok(Some(0)),
            InvalidBytePolicy::Warn => {
                raise(warnings, DecodeWarning::InvalidByte { byte, offset });
                Ok(Some(0))
            }
            InvalidBytePolicy::Reject => Err(DecodeError::InvalidByte { byte, offset }),
        }
    }
}

fn raise(warnings: &mut Vec<DecodeWarning>, warning: DecodeWarning) {
    warn!("cm6: {warning}");
    warnings.push(warning);
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode CM6 symbols into logical samples.
pub fn decode(input: &[u8], opts: &DecodeOptions) -> Result<Decoded, DecodeError> {
    let (limit, mut samples) = match opts.count {
        SampleCount::Exactly(n) => {
            let mut v = Vec::new();
            v.try_reserve_exact(n)?;
            (n, v)
        }
        SampleCount::All => {
            let mut v = Vec::new();
            v.try_reserve_exact(INITIAL_CAPACITY)?;
            (usize::MAX, v)
        }
    };

    let mut reader = SymbolReader {
        input,
        pos: 0,
        policy: opts.invalid_bytes,
    };
    let mut warnings = Vec::new();

    while samples.len() < limit {
        let Some(first) = reader.next_code(&mut warnings)? else {
            break;
        };
        let flags = DigitFlags::of(first);
        let mut more = flags.contains(DigitFlags::CONTINUE);
        let mut magnitude = u32::from(first & FIRST_DIGIT_MASK);

        while more {
            magnitude = magnitude.wrapping_shl(NEXT_DIGIT_BITS);
            let Some(code) = reader.next_code(&mut warnings)? else {
                raise(&mut warnings, DecodeWarning::Truncated {
                    index: samples.len(),
                });
                break;
            };
            more = DigitFlags::of(code).contains(DigitFlags::CONTINUE);
            magnitude = magnitude.wrapping_add(u32::from(code & NEXT_DIGIT_MASK));
        }

        let value = magnitude as i32;
        let value = if flags.contains(DigitFlags::SIGN) {
            value.wrapping_neg()
        } else {
            value
        };

        // Amortized growth; a failure here aborts with no partial result.
        samples.try_reserve(1)?;
        samples.push(value);
    }

    match opts.count {
        SampleCount::Exactly(expected) if samples.len() < expected => {
            raise(&mut warnings, DecodeWarning::ShortDecode {
                expected,
                decoded: samples.len(),
            });
        }
        SampleCount::All => samples.shrink_to_fit(),
        SampleCount::Exactly(_) => {}
    }

    diff::restore(&mut samples, opts.differences);

    trace!(
        "cm6 decode: {} symbols -> {} samples (order {})",
        reader.pos,
        samples.len(),
        opts.differences
    );
    Ok(Decoded { samples, warnings })
}

/// Decode every value in `input` with the given differencing order and
/// default policies, discarding warnings (they are still logged).
pub fn decode_all(input: &[u8], differences: u32) -> Result<Vec<i32>, DecodeError> {
    let opts = DecodeOptions {
        differences,
        ..Default::default()
    };
    decode(input, &opts).map(|d| d.samples)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
