//! TCP header and options parsing (SPEC_FULL.md §3, §4.5).
//!
//! `TcpFlags` reuses the teacher lineage's packed-bitfield-with-named-
//! accessors pattern (`tcp_flags!` in the original `tcp.rs`, reworked here
//! as the shared [`crate::macros::bit_flags`] macro).

use crate::error::CompressError;
use crate::macros::bit_flags;
use crate::reader::PacketReader;

/// Data offset + reserved + control bits, packed the way the wire does:
/// high 4 bits data offset, next 3 bits reserved/ECN-nonce, low 9 bits the
/// control flags.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpFlags {
  raw: u16,
}

bit_flags! {
  TcpFlags, u16:
    ns => 8u16,
    cwr => 7u16,
    ece => 6u16,
    urg => 5u16,
    ack => 4u16,
    psh => 3u16,
    rst => 2u16,
    syn => 1u16,
    fin => 0u16,
}

impl TcpFlags {
  /// Builds flags from the raw 16-bit data-offset+flags word.
  pub const fn from_raw(raw: u16) -> Self {
    Self { raw }
  }

  /// Raw 16-bit representation.
  pub const fn raw(&self) -> u16 {
    self.raw
  }

  /// Data offset in 32-bit words.
  pub const fn data_offset(&self) -> u8 {
    (self.raw >> 12) as u8
  }

  /// RST/SYN/FIN packed as a 3-bit field, matching the RFC 4996 §6.3.2
  /// RSF layout (SPEC_FULL.md §4.1).
  pub fn rsf(&self) -> (bool, bool, bool) {
    (self.get_rst(), self.get_syn(), self.get_fin())
  }

  /// ECN-related bits packed for the irregular chain's "1 byte of
  /// combined ECN+res flags" (SPEC_FULL.md §4.6).
  pub fn ecn_res_byte(&self) -> u8 {
    ((self.get_ns() as u8) << 2) | ((self.get_cwr() as u8) << 1) | (self.get_ece() as u8)
  }
}

/// A parsed TCP header (fixed 20-byte part; options carried separately as
/// raw bytes for [`crate::options`] to walk).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TcpHeader {
  /// Sending port.
  pub source_port: u16,
  /// Receiving port.
  pub dest_port: u16,
  /// Sequence number (or initial sequence number if SYN is set).
  pub seq_number: u32,
  /// Acknowledgment number (meaningful only if ACK is set, but always
  /// present on the wire).
  pub ack_number: u32,
  /// Data offset + reserved + control flags.
  pub flags: TcpFlags,
  /// Receive window size.
  pub window: u16,
  /// TCP checksum as carried on the wire.
  pub checksum: u16,
  /// Urgent pointer (meaningful only if URG is set).
  pub urgent_pointer: u16,
  /// Raw options bytes (`4 * (data_offset - 5)` bytes).
  pub options: Vec<u8>,
}

impl TcpHeader {
  /// Fixed TCP header size, options excluded.
  pub const MIN_LEN: usize = 20;

  /// Parses a TCP header, reading `options` out to `4 * (data_offset -
  /// 5)` bytes per the header's own `data_offset` field.
  pub fn parse(reader: &mut PacketReader<'_>) -> Result<Self, CompressError> {
    let source_port = reader.read_u16()?;
    let dest_port = reader.read_u16()?;
    let seq_number = reader.read_u32()?;
    let ack_number = reader.read_u32()?;
    let flags = TcpFlags::from_raw(reader.read_u16()?);
    let window = reader.read_u16()?;
    let checksum = reader.read_u16()?;
    let urgent_pointer = reader.read_u16()?;
    let data_offset = flags.data_offset();
    let options_len = 4usize.saturating_mul((data_offset as usize).saturating_sub(5));
    let options = reader.read_bytes(options_len)?.to_vec();
    Ok(Self {
      source_port,
      dest_port,
      seq_number,
      ack_number,
      flags,
      window,
      checksum,
      urgent_pointer,
      options,
    })
  }

  /// Serializes the fixed 20-byte header back to wire bytes (used by
  /// [`crate::context`] to store `old_tcphdr`, per SPEC_FULL.md §3).
  pub fn to_bytes(&self) -> [u8; Self::MIN_LEN] {
    let mut out = [0u8; Self::MIN_LEN];
    out[0..2].copy_from_slice(&self.source_port.to_be_bytes());
    out[2..4].copy_from_slice(&self.dest_port.to_be_bytes());
    out[4..8].copy_from_slice(&self.seq_number.to_be_bytes());
    out[8..12].copy_from_slice(&self.ack_number.to_be_bytes());
    out[12..14].copy_from_slice(&self.flags.raw().to_be_bytes());
    out[14..16].copy_from_slice(&self.window.to_be_bytes());
    out[16..18].copy_from_slice(&self.checksum.to_be_bytes());
    out[18..20].copy_from_slice(&self.urgent_pointer.to_be_bytes());
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_a_header_with_no_options() {
    let bytes = [
      0xB0, 0xC2, 0x00, 0x50, 0xB0, 0xEE, 0x32, 0xA6, 0x04, 0x39, 0xAE, 0xE6, 0x50, 0x18, 0x00,
      0xE5, 0x76, 0x92, 0x00, 0x00,
    ];
    let mut reader = PacketReader::new(&bytes);
    let header = TcpHeader::parse(&mut reader).unwrap();
    assert_eq!(header.source_port, 45250);
    assert_eq!(header.dest_port, 80);
    assert!(header.flags.get_ack());
    assert!(!header.flags.get_syn());
    assert_eq!(header.options.len(), 0);
  }

  #[test]
  fn round_trips_fixed_header_bytes() {
    let bytes = [
      0xB0, 0xC2, 0x00, 0x50, 0xB0, 0xEE, 0x32, 0xA6, 0x04, 0x39, 0xAE, 0xE6, 0x50, 0x18, 0x00,
      0xE5, 0x76, 0x92, 0x00, 0x00,
    ];
    let mut reader = PacketReader::new(&bytes);
    let header = TcpHeader::parse(&mut reader).unwrap();
    assert_eq!(header.to_bytes(), bytes);
  }

  #[test]
  fn rsf_reads_as_expected() {
    let flags = TcpFlags::from_raw(0x5002); // data_offset 5, SYN set
    assert_eq!(flags.rsf(), (false, true, false));
  }
}
