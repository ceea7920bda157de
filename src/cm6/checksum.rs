// GSE2 CHK2 checksum.
//
// A running sum over the logical samples, kept below 10^8 in magnitude by
// truncating (toward zero) remainders. A sample is reduced only when its
// magnitude exceeds 10^8; the running sum is reduced once it reaches 10^8. Rust's `%` on signed integers is
// already truncating, which is exactly the reduction the format requires;
// a floor modulo would give different results for negative sums.

use thiserror::Error;

/// Modulus of the CHK2 running sum.
pub const CHECKSUM_MODULO: i32 = 100_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("CHK2 mismatch: declared {declared}, computed {computed}")]
pub struct ChecksumMismatch {
    pub declared: u32,
    pub computed: u32,
}

#[inline]
fn reduce_sample(value: i32) -> i32 {
    if value.unsigned_abs() > CHECKSUM_MODULO.unsigned_abs() {
        value % CHECKSUM_MODULO
    } else {
        value
    }
}

#[inline]
fn reduce_sum(value: i32) -> i32 {
    if value.unsigned_abs() >= CHECKSUM_MODULO.unsigned_abs() {
        value % CHECKSUM_MODULO
    } else {
        value
    }
}

/// Compute the CHK2 checksum of `samples`.
///
/// Always below 10^8, so it fits the 8-character CHK2 field.
pub fn checksum(samples: &[i32]) -> u32 {
    // The sum is below 10^8 and the sample at most 10^8 in magnitude, so the
    // addition cannot overflow.
    samples
        .iter()
        .fold(0i32, |sum, &sample| reduce_sum(sum + reduce_sample(sample)))
        .unsigned_abs()
}

/// Parse a declared checksum as found after `CHK2`.
pub fn parse_checksum(field: &str) -> Option<u32> {
    field.trim().parse().ok()
}

/// Compare `samples` against a declared checksum. Returns the computed value.
pub fn verify(samples: &[i32], declared: u32) -> Result<u32, ChecksumMismatch> {
    let computed = checksum(samples);
    if computed == declared {
        Ok(computed)
    } else {
        Err(ChecksumMismatch { declared, computed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_sum() {
        assert_eq!(checksum(&[1, 2, 3, 4, 5]), 15);
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn exact_modulus_reduces_to_zero() {
        assert_eq!(checksum(&[60_000_000, 40_000_000]), 0);
        assert_eq!(checksum(&[-60_000_000, -40_000_000]), 0);
        assert_eq!(checksum(&[100_000_000]), 0);
    }

    #[test]
    fn large_samples_are_reduced_first() {
        assert_eq!(checksum(&[150_000_000]), 50_000_000);
        assert_eq!(checksum(&[-150_000_000]), 50_000_000);
        assert_eq!(checksum(&[i32::MAX]), 47_483_647);
        assert_eq!(checksum(&[i32::MIN]), 47_483_648);
    }

    #[test]
    fn reduction_truncates_toward_zero() {
        // -100_000_001 truncates to -1; a floor modulo would give 99_999_999.
        assert_eq!(checksum(&[-99_999_999, -2]), 1);
        assert_eq!(checksum(&[99_999_999, 2]), 1);
    }

    #[test]
    fn sample_of_exactly_the_modulus_is_kept() {
        assert_eq!(checksum(&[-5, 100_000_000]), 99_999_995);
        assert_eq!(checksum(&[7, -100_000_000]), 99_999_993);
        assert_eq!(checksum(&[100_000_001]), 1);
    }

    #[test]
    fn mixed_signs() {
        assert_eq!(checksum(&[-5, 3]), 2);
        assert_eq!(checksum(&[10, -10, 7]), 7);
    }

    #[test]
    fn parse_declared() {
        assert_eq!(parse_checksum("  12345678\n"), Some(12_345_678));
        assert_eq!(parse_checksum("0"), Some(0));
        assert_eq!(parse_checksum("abc"), None);
        assert_eq!(parse_checksum(""), None);
    }

    #[test]
    fn verify_reports_both_values() {
        assert_eq!(verify(&[1, 2, 3], 6), Ok(6));
        assert_eq!(
            verify(&[1, 2, 3], 7),
            Err(ChecksumMismatch {
                declared: 7,
                computed: 6
            })
        );
    }
}
