//! DSCP field encoder (SPEC_FULL.md §4.1).
//!
//! DSCP is a 6-bit field carried in the dynamic chain; it compresses the
//! same way as [`crate::field::static_irregular`] but at 6-bit width
//! instead of 8/16.

use crate::writer::BitWriter;
use crate::error::CompressError;

/// Encodes a 6-bit DSCP value as static-or-irregular: a 1-bit changed
/// indicator, followed by the 6-bit value if it changed.
pub fn encode(writer: &mut BitWriter<'_>, value: u8, stored: u8) -> Result<bool, CompressError> {
  debug_assert!(value <= 0x3F && stored <= 0x3F, "dscp: not a 6-bit value");
  let changed = value != stored;
  writer.write_bits(changed as u32, 1)?;
  if changed {
    writer.write_bits(value as u32 & 0x3F, 6)?;
  }
  Ok(changed)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unchanged_dscp_is_one_bit() {
    let mut dest = [0u8; 1];
    let mut w = BitWriter::new(&mut dest);
    assert!(!encode(&mut w, 0x12, 0x12).unwrap());
    assert_eq!(w.finish(), &[0x00]);
  }

  #[test]
  fn changed_dscp_emits_value() {
    let mut dest = [0u8; 1];
    let mut w = BitWriter::new(&mut dest);
    assert!(encode(&mut w, 0x2A, 0x00).unwrap());
    // 1 (changed) followed by 0b101010 => 1101_0100 -> padded with a 0 bit.
    assert_eq!(w.finish(), &[0b1_101010_0]);
  }
}
