//! Window-based Least Significant Bits encoding (SPEC_FULL.md §4.1, RFC
//! 4996 §4.5.1 / RFC 3095 §4.5.1).
//!
//! `c_lsb(k, p, reference, value)` emits the `k` low-order bits of `value`.
//! The pair `(k, p)` defines the interpretation interval
//! `[reference - p, reference + (2^k - 1 - p)]`; callers must check
//! [`fits_in_interval`] before emitting, mirroring the original's contract
//! that "the caller must have verified that value lies in that interval."

/// Returns the `k`-bit interpretation interval `[low, high]` for the given
/// reference and shift parameter `p`. Operates in `i64` to accommodate a
/// negative `p` (RFC 4996 allows `p` to be negative for some fields) and
/// values up to 32 bits wide.
pub fn interval(k: u32, p: i64, reference: u64) -> (i64, i64) {
  debug_assert!(k <= 32, "c_lsb: k must fit in 32 bits");
  let span = (1i64 << k) - 1;
  let low = reference as i64 - p;
  let high = reference as i64 + (span - p);
  (low, high)
}

/// True if `value` lies in the `(k, p)` interpretation interval around
/// `reference`.
pub fn fits_in_interval(k: u32, p: i64, reference: u64, value: u64) -> bool {
  let (low, high) = interval(k, p, reference);
  let value = value as i64;
  value >= low && value <= high
}

/// Emits the `k` low-order bits of `value`. Pure function; no state.
///
/// Caller must have already verified `value` lies in the `(k, p)` interval
/// via [`fits_in_interval`]; this function does not re-check it, matching
/// the original `c_lsb`'s contract.
pub fn c_lsb(k: u32, value: u64) -> u32 {
  debug_assert!(k <= 32, "c_lsb: k must fit in 32 bits");
  if k == 32 {
    value as u32
  } else {
    (value & ((1u64 << k) - 1)) as u32
  }
}

/// Finds the smallest `k` in `1..=max_k` such that `value` fits the `(k, p)`
/// interval around `reference`, or `None` if even `max_k` bits don't fit.
///
/// This is the shared "pick the narrowest W-LSB width that still decodes
/// unambiguously" policy used by the CO format decision tree
/// (SPEC_FULL.md §4.6).
pub fn smallest_k(max_k: u32, p: i64, reference: u64, value: u64) -> Option<u32> {
  (1..=max_k).find(|&k| fits_in_interval(k, p, reference, value))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn interval_matches_rfc_formula() {
    // k=4, p=1, reference=10 => [10-1, 10+(15-1)] = [9, 24]
    assert_eq!(interval(4, 1, 10), (9, 24));
  }

  #[test]
  fn c_lsb_masks_low_bits() {
    assert_eq!(c_lsb(4, 0b1111_0110), 0b0110);
    assert_eq!(c_lsb(8, 0xABCD), 0xCD);
    assert_eq!(c_lsb(16, 0x1234_5678), 0x5678);
  }

  #[test]
  fn fits_in_interval_respects_bounds() {
    assert!(fits_in_interval(4, 1, 10, 9));
    assert!(fits_in_interval(4, 1, 10, 24));
    assert!(!fits_in_interval(4, 1, 10, 25));
    assert!(!fits_in_interval(4, 1, 10, 8));
  }

  #[test]
  fn smallest_k_grows_until_it_fits() {
    // value is far from reference; small k shouldn't fit, larger should.
    assert_eq!(smallest_k(16, 0, 1000, 1005), Some(3));
    assert_eq!(smallest_k(2, 0, 1000, 1005), None);
  }
}
