//! IPv6 header parsing (SPEC_FULL.md §3, §4.3).
//!
//! Field list and doc comments adapted from the teacher lineage's
//! `ipv6.rs`; rewritten against [`crate::reader::PacketReader`].

use std::net::Ipv6Addr;

use crate::error::CompressError;
use crate::reader::PacketReader;
use crate::wire::ip_protocol::{self, IPProtocol};
use crate::wire::ipv6_ext::{Ipv6ExtKind, Ipv6ExtRecord};

/// <https://en.wikipedia.org/wiki/IPv6_packet>
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ipv6Header {
  /// Always 6.
  pub version: u8,
  /// Differentiated Services Code Point.
  pub dscp: u8,
  /// Explicit Congestion Notification.
  pub ecn: u8,
  /// Identifies a flow of packets between a source and destination.
  pub flow_label: u32,
  /// Payload length, extension headers included, header excluded.
  pub payload_length: u16,
  /// Hop limit, IPv6's analogue of IPv4 TTL.
  pub hop_limit: u8,
  /// Source address.
  pub source: Ipv6Addr,
  /// Destination address.
  pub destination: Ipv6Addr,
  /// Extension headers walked in wire order; the terminating protocol
  /// (always TCP for this profile) is not included here.
  pub extensions: Vec<Ipv6ExtRecord>,
  /// Terminating (innermost) protocol, after walking `extensions`.
  pub terminal_protocol: IPProtocol,
}

impl Ipv6Header {
  /// Fixed IPv6 header size.
  pub const MIN_LEN: usize = 40;

  /// Parses the fixed header and walks the extension-header chain,
  /// rejecting any extension kind this profile doesn't recognize
  /// (SPEC_FULL.md §4.3 step 3).
  pub fn parse(reader: &mut PacketReader<'_>) -> Result<Self, CompressError> {
    let version_class_high = reader.read_u8()?;
    let version = version_class_high >> 4;
    if version != 6 {
      return Err(CompressError::UnsupportedIpVersion(version));
    }
    let class_low_flow_high = reader.read_u8()?;
    let traffic_class = ((version_class_high & 0x0F) << 4) | (class_low_flow_high >> 4);
    let dscp = traffic_class >> 2;
    let ecn = traffic_class & 0x3;
    let flow_mid = reader.read_u8()?;
    let flow_low = reader.read_u8()?;
    let flow_label =
      (((class_low_flow_high & 0x0F) as u32) << 16) | ((flow_mid as u32) << 8) | flow_low as u32;
    let payload_length = reader.read_u16()?;
    let mut next_header = ip_protocol::parse(reader)?;
    let hop_limit = reader.read_u8()?;
    let source = Ipv6Addr::from(<[u8; 16]>::try_from(reader.read_bytes(16)?).unwrap());
    let destination = Ipv6Addr::from(<[u8; 16]>::try_from(reader.read_bytes(16)?).unwrap());

    let mut extensions = Vec::new();
    loop {
      match Ipv6ExtKind::from_protocol(next_header) {
        Some(kind) => {
          let this_next = ip_protocol::parse(reader)?;
          let record = Ipv6ExtRecord::parse(reader, kind, this_next)?;
          next_header = this_next;
          extensions.push(record);
        }
        None => break,
      }
    }
    let terminal_protocol = next_header;

    Ok(Self {
      version,
      dscp,
      ecn,
      flow_label,
      payload_length,
      hop_limit,
      source,
      destination,
      extensions,
      terminal_protocol,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_a_plain_tcp_header() {
    let mut bytes = vec![0x60, 0x00, 0x00, 0x00, 0x00, 0x14, 0x06, 0x40];
    bytes.extend_from_slice(&[0x20; 16]); // source
    bytes.extend_from_slice(&[0x30; 16]); // destination
    let mut reader = PacketReader::new(&bytes);
    let header = Ipv6Header::parse(&mut reader).unwrap();
    assert_eq!(header.version, 6);
    assert_eq!(header.terminal_protocol, IPProtocol::TCP);
    assert!(header.extensions.is_empty());
  }
}
