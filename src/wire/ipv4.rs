//! IPv4 header parsing (SPEC_FULL.md §3, §4.3).
//!
//! Field list and doc comments adapted from the teacher lineage's
//! `ipv4.rs`; the parser itself is rewritten against
//! [`crate::reader::PacketReader`] instead of `binator` combinators, since
//! the compressor reads a concrete byte buffer rather than a generic
//! `Streaming` source.

use std::net::Ipv4Addr;

use crate::error::CompressError;
use crate::reader::PacketReader;
use crate::wire::ip_protocol::{self, IPProtocol};

/// <https://en.wikipedia.org/wiki/Internet_Protocol_version_4>
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ipv4Header {
  /// Always 4 for IPv4.
  pub version: u8,
  /// Header length in 32-bit words; 5 means no options (SPEC_FULL.md
  /// §4.3 requires this for a compressible packet).
  pub ihl: u8,
  /// Differentiated Services Code Point, the high 6 bits of the former
  /// Type of Service byte.
  pub dscp: u8,
  /// Explicit Congestion Notification, the low 2 bits of the former Type
  /// of Service byte.
  pub ecn: u8,
  /// Total packet length in bytes, header included.
  pub total_length: u16,
  /// Fragment identification field; this crate's IP-ID behavior
  /// classifier (SPEC_FULL.md §4.4) tracks this across packets.
  pub id: u16,
  /// Don't Fragment bit.
  pub df: bool,
  /// More Fragments bit.
  pub mf: bool,
  /// Fragment offset, in 8-byte units.
  pub fragment_offset: u16,
  /// Time to Live / hop count.
  pub ttl: u8,
  /// Upper-layer protocol number, or the next header in a tunnel chain.
  pub protocol: IPProtocol,
  /// Header checksum as carried on the wire (not recomputed by this
  /// crate; it is upper-layer concern of the framework).
  pub checksum: u16,
  /// Source address.
  pub source: Ipv4Addr,
  /// Destination address.
  pub destination: Ipv4Addr,
}

impl Ipv4Header {
  /// Fixed header size in bytes when `ihl == 5` (no options), the only
  /// shape this profile accepts (SPEC_FULL.md §4.3).
  pub const MIN_LEN: usize = 20;

  /// Parses a fixed (no-options) IPv4 header. Returns
  /// [`CompressError::Ipv4OptionsPresent`] if `ihl != 5` and
  /// [`CompressError::Fragmented`] if either MF or the "don't reassemble"
  /// fragment offset indicates fragmentation, per SPEC_FULL.md §4.3 steps
  /// 1-2.
  pub fn parse(reader: &mut PacketReader<'_>) -> Result<Self, CompressError> {
    let version_ihl = reader.read_u8()?;
    let version = version_ihl >> 4;
    let ihl = version_ihl & 0x0F;
    if version != 4 {
      return Err(CompressError::UnsupportedIpVersion(version));
    }
    if ihl != 5 {
      return Err(CompressError::Ipv4OptionsPresent(ihl));
    }
    let tos = reader.read_u8()?;
    let dscp = tos >> 2;
    let ecn = tos & 0x3;
    let total_length = reader.read_u16()?;
    let id = reader.read_u16()?;
    let flags_fragment = reader.read_u16()?;
    let df = flags_fragment & 0x4000 != 0;
    let mf = flags_fragment & 0x2000 != 0;
    let fragment_offset = flags_fragment & 0x1FFF;
    if mf || fragment_offset != 0 {
      return Err(CompressError::Fragmented);
    }
    let ttl = reader.read_u8()?;
    let protocol = ip_protocol::parse(reader)?;
    let checksum = reader.read_u16()?;
    let source = Ipv4Addr::from(reader.read_u32()?);
    let destination = Ipv4Addr::from(reader.read_u32()?);
    Ok(Self {
      version,
      ihl,
      dscp,
      ecn,
      total_length,
      id,
      df,
      mf,
      fragment_offset,
      ttl,
      protocol,
      checksum,
      source,
      destination,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_a_plain_header() {
    let bytes = [
      0x45, 0x00, 0x00, 0x38, 0x76, 0xF4, 0x40, 0x00, 0x40, 0x06, 0x80, 0xD9, 0xC0, 0xA8, 0x00,
      0x6C, 0xD0, 0x61, 0xB1, 0x7C,
    ];
    let mut reader = PacketReader::new(&bytes);
    let header = Ipv4Header::parse(&mut reader).unwrap();
    assert_eq!(header.version, 4);
    assert_eq!(header.ihl, 5);
    assert_eq!(header.protocol, IPProtocol::TCP);
    assert!(header.df);
    assert!(!header.mf);
    assert_eq!(header.source, Ipv4Addr::new(192, 168, 0, 108));
    assert_eq!(header.destination, Ipv4Addr::new(208, 97, 177, 124));
  }

  #[test]
  fn rejects_options() {
    let mut bytes = [
      0x46, 0x00, 0x00, 0x38, 0x76, 0xF4, 0x40, 0x00, 0x40, 0x06, 0x80, 0xD9, 0xC0, 0xA8, 0x00,
      0x6C, 0xD0, 0x61, 0xB1, 0x7C, 0x00, 0x00, 0x00, 0x00,
    ];
    bytes[0] = 0x46; // ihl = 6
    let mut reader = PacketReader::new(&bytes);
    assert!(matches!(
      Ipv4Header::parse(&mut reader),
      Err(CompressError::Ipv4OptionsPresent(6))
    ));
  }

  #[test]
  fn rejects_fragments() {
    let bytes = [
      0x45, 0x00, 0x00, 0x38, 0x76, 0xF4, 0x20, 0x00, 0x40, 0x06, 0x80, 0xD9, 0xC0, 0xA8, 0x00,
      0x6C, 0xD0, 0x61, 0xB1, 0x7C,
    ];
    let mut reader = PacketReader::new(&bytes);
    assert!(matches!(Ipv4Header::parse(&mut reader), Err(CompressError::Fragmented)));
  }
}
