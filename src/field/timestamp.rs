//! Timestamp LSB encoder (SPEC_FULL.md §4.1, RFC 4996 §6.3.1).
//!
//! Four discriminators by required bit width relative to the stored value:
//!
//! | discriminator | bits | total bytes |
//! |----------------|------|-------------|
//! | `0`            | 7    | 1           |
//! | `10`           | 14   | 2           |
//! | `110`          | 21   | 3           |
//! | `111`          | 29   | 4 (full, lossy) |
//!
//! If none of the first three discriminators fit, the full 32-bit value is
//! written under the `111` discriminator and [`encode`] reports a loss flag
//! to the caller, per SPEC_FULL.md's fallback clause.

use crate::field::lsb::fits_in_interval;
use crate::writer::BitWriter;
use crate::error::CompressError;

/// Which discriminator was used, and whether it was the lossy full-value
/// fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampEncoding {
  /// Total bits written, including the discriminator.
  pub total_bits: u32,
  /// True if the full 32-bit value was written (no LSB compression).
  pub lossy: bool,
}

fn choose(value: u32, reference: u32) -> (u32 /* discriminator */, u32 /* disc_bits */, u32 /* value_bits */, bool /* lossy */) {
  if fits_in_interval(7, 0, reference as u64, value as u64) {
    (0b0, 1, 7, false)
  } else if fits_in_interval(14, 0, reference as u64, value as u64) {
    (0b10, 2, 14, false)
  } else if fits_in_interval(21, 0, reference as u64, value as u64) {
    (0b110, 3, 21, false)
  } else {
    (0b111, 3, 32, true)
  }
}

/// Encodes `value` against `reference` (the previously stored TSval or
/// TSecr), writing the discriminator then the residue bits.
pub fn encode(
  writer: &mut BitWriter<'_>,
  value: u32,
  reference: u32,
) -> Result<TimestampEncoding, CompressError> {
  let (disc, disc_bits, value_bits, lossy) = choose(value, reference);
  writer.write_bits(disc, disc_bits)?;
  writer.write_bits(value, value_bits)?;
  Ok(TimestampEncoding {
    total_bits: disc_bits + value_bits,
    lossy,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn small_delta_uses_7_bit_form() {
    let mut dest = [0u8; 2];
    let mut w = BitWriter::new(&mut dest);
    let enc = encode(&mut w, 1005, 1000).unwrap();
    assert_eq!(enc.total_bits, 8);
    assert!(!enc.lossy);
  }

  #[test]
  fn large_delta_falls_back_to_full_32_bits() {
    let mut dest = [0u8; 5];
    let mut w = BitWriter::new(&mut dest);
    let enc = encode(&mut w, 0xFFFF_FFFF, 0).unwrap();
    assert!(enc.lossy);
    assert_eq!(enc.total_bits, 35);
  }
}
