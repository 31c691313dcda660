//! IPv6 extension header records (SPEC_FULL.md §3, §4.3).
//!
//! The recognized extension set is {hop-by-hop, routing, destination
//! options, AH, MIME (ESP carried in "minimal encapsulation" form, named
//! MIME in the data model), GRE}; anything else is rejected per §4.3 step
//! 3 ("Refuse unknown extensions").

use crate::error::CompressError;
use crate::reader::PacketReader;
use crate::wire::ip_protocol::IPProtocol;

/// Which of the recognized IPv6 extension kinds a record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Ipv6ExtKind {
  /// Hop-by-Hop Options header.
  HopByHop,
  /// Routing header.
  Routing,
  /// Destination Options header.
  DestinationOptions,
  /// Authentication Header.
  Ah,
  /// Minimal encapsulation / ESP-carried header, named "MIME" in the data
  /// model (SPEC_FULL.md §3).
  Mime,
  /// Generic Routing Encapsulation.
  Gre,
}

impl Ipv6ExtKind {
  /// Classifies a next-header protocol number, or `None` if it isn't one
  /// of the extensions this profile understands.
  pub fn from_protocol(protocol: IPProtocol) -> Option<Self> {
    match protocol {
      IPProtocol::HOPOPT => Some(Self::HopByHop),
      IPProtocol::IPV6_ROUTE => Some(Self::Routing),
      IPProtocol::OPTS_6 => Some(Self::DestinationOptions),
      IPProtocol::AH => Some(Self::Ah),
      IPProtocol::ESP => Some(Self::Mime),
      IPProtocol::GRE => Some(Self::Gre),
      _ => None,
    }
  }
}

/// One IPv6 extension header: its kind, its own next-header, and its raw
/// length+value bytes (opaque to the compressor beyond length tracking and
/// byte-equality comparisons used by `check_context`/dynamic-chain
/// refresh).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ipv6ExtRecord {
  /// Which extension kind this is.
  pub kind: Ipv6ExtKind,
  /// The next-header value carried by this extension (protocol of the
  /// header that follows).
  pub next_header: IPProtocol,
  /// Raw header bytes (fixed 2-byte next-header + length prefix and the
  /// length-driven value bytes that follow), used for byte-exact dynamic
  /// chain re-emission on change.
  pub raw: Vec<u8>,
}

impl Ipv6ExtRecord {
  /// Parses one extension header given its already-classified `kind` and
  /// the already-known `next_header` protocol byte read by the caller.
  /// Extension headers share the "next header, length in 8-byte units
  /// minus one, then value" shape (RFC 8200 §4).
  pub fn parse(
    reader: &mut PacketReader<'_>,
    kind: Ipv6ExtKind,
    next_header: IPProtocol,
  ) -> Result<Self, CompressError> {
    let len_field = reader.read_u8()?;
    let total_len = (len_field as usize + 1) * 8;
    // 2 bytes (next_header, len_field) already consumed by caller+self;
    // the remaining `total_len - 2` bytes are the rest of this header.
    let rest = reader.read_bytes(total_len - 2)?;
    let mut raw = Vec::with_capacity(total_len);
    raw.push(u8::from(next_header));
    raw.push(len_field);
    raw.extend_from_slice(rest);
    Ok(Self {
      kind,
      next_header,
      raw,
    })
  }
}
