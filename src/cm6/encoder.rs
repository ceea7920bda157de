// CM6 encoder.
//
// Differencing runs on a scratch copy, so the caller's samples are never
// modified, not even transiently. Output is appended to a caller-owned
// `Vec<u8>` grown with `try_reserve`, which keeps already-written bytes
// intact when an allocation fails.

use std::collections::TryReserveError;

use log::trace;
use thiserror::Error;

use super::{DEFAULT_DIFFERENCES, DigitFlags, FIRST_DIGIT_BITS, NEXT_DIGIT_BITS, alphabet, diff};

/// Most symbols a single value can take (extended budget).
pub const MAX_DIGITS: usize = 7;

/// Most symbols a single value can take in standard GSE2 CM6.
pub const GSE_MAX_DIGITS: usize = 6;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How many symbols a single value may occupy.
///
/// Standard CM6 stops at six symbols (29 magnitude bits). Differenced
/// samples can exceed that, so the encoder must either widen or refuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigitBudget {
    /// At most six symbols; larger magnitudes fail with
    /// [`EncodeError::MagnitudeOverflow`].
    Gse,
    /// At most seven symbols, enough for any `i32`.
    #[default]
    Extended,
}

impl DigitBudget {
    /// Maximum symbols per value.
    pub const fn max_digits(self) -> usize {
        match self {
            Self::Gse => GSE_MAX_DIGITS,
            Self::Extended => MAX_DIGITS,
        }
    }

    /// Maximum magnitude bits per value.
    pub const fn max_bits(self) -> u32 {
        FIRST_DIGIT_BITS + NEXT_DIGIT_BITS * (self.max_digits() as u32 - 1)
    }
}

/// Configuration for CM6 encoding.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Differencing order applied before packing.
    pub differences: u32,
    /// Symbol budget per value.
    pub budget: DigitBudget,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            differences: DEFAULT_DIFFERENCES,
            budget: DigitBudget::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum EncodeError {
    /// A differenced value does not fit the symbol budget.
    #[error("differenced sample {index} ({value}) needs more than {max_bits} magnitude bits")]
    MagnitudeOverflow {
        index: usize,
        value: i32,
        max_bits: u32,
    },
    #[error("allocation failed: {0}")]
    Alloc(#[from] TryReserveError),
}

// ---------------------------------------------------------------------------
// Single values
// ---------------------------------------------------------------------------

/// Number of symbols needed for `magnitude`, or `None` if it exceeds `budget`.
#[inline]
pub fn digit_count(magnitude: u32, budget: DigitBudget) -> Option<usize> {
    let bits = u32::BITS - magnitude.leading_zeros();
    let digits = if bits <= FIRST_DIGIT_BITS {
        1
    } else {
        1 + (bits - FIRST_DIGIT_BITS).div_ceil(NEXT_DIGIT_BITS) as usize
    };
    (digits <= budget.max_digits()).then_some(digits)
}

/// Encode one (already differenced) value into `buf` as CM6 symbols.
/// Returns the number of symbols written, or `None` if the value does not
/// fit `budget`.
#[inline]
pub fn encode_value(value: i32, budget: DigitBudget, buf: &mut [u8; MAX_DIGITS]) -> Option<usize> {
    let magnitude = value.unsigned_abs();
    let len = digit_count(magnitude, budget)?;

    for (i, slot) in buf[..len].iter_mut().enumerate() {
        let shift = NEXT_DIGIT_BITS * (len - 1 - i) as u32;
        let mut digit = ((magnitude >> shift) & 0x1F) as u8;
        if i + 1 < len {
            digit |= DigitFlags::CONTINUE.bits();
        }
        // The top bit of the first digit is zero by construction, so the
        // sign flag never overlaps magnitude bits.
        if i == 0 && value < 0 {
            digit |= DigitFlags::SIGN.bits();
        }
        *slot = alphabet::symbol(digit);
    }
    Some(len)
}

// ---------------------------------------------------------------------------
// Sequences
// ---------------------------------------------------------------------------

/// Encode `samples` and append the symbols to `out`.
///
/// Returns the number of bytes appended. On
/// [`EncodeError::MagnitudeOverflow`] `out` is truncated back to its length
/// at entry.
pub fn encode_into(
    samples: &[i32],
    out: &mut Vec<u8>,
    opts: &EncodeOptions,
) -> Result<usize, EncodeError> {
    let start = out.len();

    let mut scratch = Vec::new();
    scratch.try_reserve_exact(samples.len())?;
    scratch.extend_from_slice(samples);
    diff::apply(&mut scratch, opts.differences);

    let mut digits = [0u8; MAX_DIGITS];
    for (index, &value) in scratch.iter().enumerate() {
        let Some(len) = encode_value(value, opts.budget, &mut digits) else {
            out.truncate(start);
            return Err(EncodeError::MagnitudeOverflow {
                index,
                value,
                max_bits: opts.budget.max_bits(),
            });
        };
        out.try_reserve(len)?;
        out.extend_from_slice(&digits[..len]);
    }

    let written = out.len() - start;
    trace!(
        "cm6 encode: {} samples -> {written} symbols (order {})",
        samples.len(),
        opts.differences
    );
    Ok(written)
}

/// Encode `samples` into a fresh buffer.
pub fn encode(samples: &[i32], opts: &EncodeOptions) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    encode_into(samples, &mut out, opts)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(samples: &[i32]) -> Vec<u8> {
        let opts = EncodeOptions {
            differences: 0,
            ..Default::default()
        };
        encode(samples, &opts).unwrap()
    }

    #[test]
    fn single_symbol_values() {
        assert_eq!(raw(&[0]), b"+");
        assert_eq!(raw(&[1]), b"-");
        assert_eq!(raw(&[5]), b"3");
        assert_eq!(raw(&[15]), b"D");
        assert_eq!(raw(&[-5]), b"J");
        assert_eq!(raw(&[-15]), b"T");
    }

    #[test]
    fn small_values_never_continue() {
        let mut buf = [0u8; MAX_DIGITS];
        for v in -15..=15 {
            assert_eq!(encode_value(v, DigitBudget::Gse, &mut buf), Some(1));
            let code = alphabet::lookup(buf[0]).unwrap();
            assert!(!DigitFlags::of(code).contains(DigitFlags::CONTINUE));
        }
    }

    #[test]
    fn two_symbol_boundary() {
        // 16 = 0b1_0000: first digit 0 (+continue), second digit 16.
        assert_eq!(raw(&[16]), b"UE");
        assert_eq!(raw(&[-16]), b"kE");
        // 511 is the largest two-symbol magnitude.
        assert_eq!(raw(&[511]), b"jT");
    }

    #[test]
    fn digit_counts() {
        let b = DigitBudget::Extended;
        assert_eq!(digit_count(0, b), Some(1));
        assert_eq!(digit_count(15, b), Some(1));
        assert_eq!(digit_count(16, b), Some(2));
        assert_eq!(digit_count(511, b), Some(2));
        assert_eq!(digit_count(512, b), Some(3));
        assert_eq!(digit_count((1 << 29) - 1, b), Some(6));
        assert_eq!(digit_count(1 << 29, b), Some(7));
        assert_eq!(digit_count(1 << 31, b), Some(7));
        assert_eq!(digit_count(1 << 29, DigitBudget::Gse), None);
    }

    #[test]
    fn budget_bits() {
        assert_eq!(DigitBudget::Gse.max_bits(), 29);
        assert_eq!(DigitBudget::Extended.max_bits(), 34);
    }

    #[test]
    fn appends_after_existing_output() {
        let mut out = b"XY".to_vec();
        let n = encode_into(&[5, 16], &mut out, &EncodeOptions {
            differences: 0,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(n, 3);
        assert_eq!(out, b"XY3UE");
    }

    #[test]
    fn gse_budget_overflow_rolls_back() {
        let mut out = b"keep".to_vec();
        let opts = EncodeOptions {
            differences: 0,
            budget: DigitBudget::Gse,
        };
        let err = encode_into(&[1, 2, 1 << 29], &mut out, &opts).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::MagnitudeOverflow {
                index: 2,
                value: 536_870_912,
                max_bits: 29
            }
        ));
        assert_eq!(out, b"keep");
    }

    #[test]
    fn caller_samples_untouched() {
        let samples = vec![100, -200, 300, -400, 500];
        let before = samples.clone();
        encode(&samples, &EncodeOptions::default()).unwrap();
        assert_eq!(samples, before);
    }

    #[test]
    fn extended_budget_covers_i32_extremes() {
        assert_eq!(raw(&[i32::MIN]).len(), 7);
        assert_eq!(raw(&[i32::MAX]).len(), 7);
    }
}
