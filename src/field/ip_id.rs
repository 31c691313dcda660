//! Behavior-aware IP-ID LSB encoding (SPEC_FULL.md §4.1, `c_ip_id_lsb`,
//! `c_optional_ip_id_lsb`).
//!
//! - SEQUENTIAL: `delta = ip_id - last_ip_id`, W-LSB encoded with interval
//!   parameter `p`.
//! - SEQUENTIAL-SWAPPED: same, but on the byte-swapped `ip_id`.
//! - ZERO: no bits.
//! - RANDOM: a full 16-bit emission.

use crate::classifier::IpIdBehavior;
use crate::field::lsb::c_lsb;
use crate::writer::BitWriter;
use crate::error::CompressError;

/// Encodes `ip_id` given the innermost v4 context's current behavior and
/// `last_ip_id`, writing `k` bits (W-LSB) for the sequential forms, nothing
/// for ZERO, and a full 16-bit value for RANDOM.
pub fn c_ip_id_lsb(
  writer: &mut BitWriter<'_>,
  behavior: IpIdBehavior,
  ip_id: u16,
  last_ip_id: u16,
  k: u32,
) -> Result<(), CompressError> {
  match behavior {
    IpIdBehavior::Sequential => {
      let delta = ip_id.wrapping_sub(last_ip_id);
      writer.write_bits(c_lsb(k, delta as u64), k)
    }
    IpIdBehavior::SequentialSwapped => {
      let delta = ip_id.swap_bytes().wrapping_sub(last_ip_id.swap_bytes());
      writer.write_bits(c_lsb(k, delta as u64), k)
    }
    IpIdBehavior::Zero => Ok(()),
    IpIdBehavior::Random | IpIdBehavior::Unknown => {
      writer.align_to_byte();
      writer.write_u16(ip_id)
    }
  }
}

/// Same as [`c_ip_id_lsb`] but for the "optional" irregular-chain slot,
/// which additionally allows suppressing the field entirely when behavior
/// is ZERO or when the sequential delta is exactly zero with `k == 0`.
pub fn c_optional_ip_id_lsb(
  writer: &mut BitWriter<'_>,
  behavior: IpIdBehavior,
  ip_id: u16,
  last_ip_id: u16,
  k: u32,
) -> Result<(), CompressError> {
  if matches!(behavior, IpIdBehavior::Zero) {
    return Ok(());
  }
  c_ip_id_lsb(writer, behavior, ip_id, last_ip_id, k)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sequential_emits_delta_bits() {
    let mut dest = [0u8; 2];
    let mut w = BitWriter::new(&mut dest);
    c_ip_id_lsb(&mut w, IpIdBehavior::Sequential, 101, 100, 8).unwrap();
    assert_eq!(w.finish(), &[1]);
  }

  #[test]
  fn zero_behavior_emits_nothing() {
    let mut dest = [0u8; 1];
    let mut w = BitWriter::new(&mut dest);
    c_ip_id_lsb(&mut w, IpIdBehavior::Zero, 0, 0, 8).unwrap();
    assert!(w.is_empty());
  }

  #[test]
  fn random_behavior_emits_full_16_bits() {
    let mut dest = [0u8; 2];
    let mut w = BitWriter::new(&mut dest);
    c_ip_id_lsb(&mut w, IpIdBehavior::Random, 0xBEEF, 0x0000, 8).unwrap();
    assert_eq!(w.finish(), &[0xBE, 0xEF]);
  }
}
