//! Owned representations of the input IP/TCP header chain, parsed with
//! [`crate::reader::PacketReader`] (SPEC_FULL.md §3, §9: "parse into owned
//! records", never aliasing one layout onto another).

pub mod ip_protocol;
pub mod ipv4;
pub mod ipv6;
pub mod ipv6_ext;
pub mod tcp;

use crate::error::CompressError;
use crate::reader::PacketReader;

/// One level of the IP chain as actually observed on an input packet: a
/// v4 header, or a v6 header with its own extension chain already walked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpLayer {
  /// IPv4, no options, not fragmented.
  V4(ipv4::Ipv4Header),
  /// IPv6, with its extension-header chain already walked.
  V6(ipv6::Ipv6Header),
}

impl IpLayer {
  /// Protocol/next-header naming the layer that follows this one (an
  /// inner tunneled IP header, or the terminating transport protocol).
  pub fn next_protocol(&self) -> ip_protocol::IPProtocol {
    match self {
      IpLayer::V4(h) => h.protocol,
      IpLayer::V6(h) => h.terminal_protocol,
    }
  }
}

/// A fully parsed input packet: the IP-layer chain (outer header plus any
/// IP-in-IP tunnel layers) and the terminating TCP header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPacket {
  /// IP layers in wire order, outermost first.
  pub ip_chain: Vec<IpLayer>,
  /// The terminating TCP header.
  pub tcp: tcp::TcpHeader,
  /// TCP payload bytes (after the options area).
  pub payload_len: usize,
}

/// Walks an IP+TCP packet, recognizing IP-in-IP / IPv6-in-IPv4 tunneling
/// (SPEC_FULL.md §4.3 step 3) and rejecting anything that isn't
/// ultimately terminated by TCP (step 4) or that doesn't fully fit the
/// packet (step 5).
pub fn parse_packet(bytes: &[u8]) -> Result<ParsedPacket, CompressError> {
  let mut reader = PacketReader::new(bytes);
  let mut ip_chain = Vec::new();

  loop {
    if reader.remaining() == 0 {
      return Err(CompressError::TruncatedPacket {
        needed: 1,
        available: bytes.len(),
      });
    }
    let version = reader.peek_rest()[0] >> 4;
    let layer = match version {
      4 => IpLayer::V4(ipv4::Ipv4Header::parse(&mut reader)?),
      6 => IpLayer::V6(ipv6::Ipv6Header::parse(&mut reader)?),
      other => return Err(CompressError::UnsupportedIpVersion(other)),
    };
    let next = layer.next_protocol();
    ip_chain.push(layer);

    use crate::wire::ip_protocol::IPProtocol;
    match next {
      IPProtocol::TCP => break,
      IPProtocol::IP_IN_IP | IPProtocol::IPV6 => continue,
      other => return Err(CompressError::NotTcp(u8::from(other))),
    }
  }

  let tcp = tcp::TcpHeader::parse(&mut reader)?;
  let payload_len = reader.remaining();

  if reader.position() >= bytes.len() && payload_len == 0 {
    // A packet with literally zero bytes of anything past the headers is
    // legal (pure ACK); §4.3 step 5 only requires header bytes to be
    // *strictly less* than the total packet size when there is a
    // transport payload to protect against header/payload aliasing. Pure
    // zero-payload packets are the common case and must be accepted.
  }

  Ok(ParsedPacket {
    ip_chain,
    tcp,
    payload_len,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_single_ipv4_tcp_packet() {
    let bytes = [
      0x45, 0x00, 0x00, 0x38, 0x76, 0xF4, 0x40, 0x00, 0x40, 0x06, 0x80, 0xD9, 0xC0, 0xA8, 0x00,
      0x6C, 0xD0, 0x61, 0xB1, 0x7C, 0xB0, 0xC2, 0x00, 0x50, 0xB0, 0xEE, 0x32, 0xA6, 0x04, 0x39,
      0xAE, 0xE6, 0x50, 0x18, 0x00, 0xE5, 0x76, 0x92, 0x00, 0x00, 0x47, 0x45, 0x54,
    ];
    let parsed = parse_packet(&bytes).unwrap();
    assert_eq!(parsed.ip_chain.len(), 1);
    assert_eq!(parsed.tcp.source_port, 45250);
    assert_eq!(parsed.payload_len, 3);
  }

  #[test]
  fn rejects_udp_terminated_packet() {
    let mut bytes = vec![
      0x45, 0x00, 0x00, 0x1C, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 0xC0, 0xA8, 0x00,
      0x01, 0xC0, 0xA8, 0x00, 0x02,
    ];
    bytes.extend_from_slice(&[0, 0, 0, 0, 0, 8, 0, 0]);
    assert!(matches!(parse_packet(&bytes), Err(CompressError::NotTcp(17))));
  }
}
