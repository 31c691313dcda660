//! Per-flow compressor state (SPEC_FULL.md §3).
//!
//! Design note (SPEC_FULL.md §9): the IP-chain context is a single owned
//! `Vec` of sum-typed records (`IpContext`), not a packed byte area with
//! variant-length strides; global catalogues are plain associated consts,
//! not mutable singletons.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::classifier::IpIdBehavior;
use crate::options::TcpOptionsTable;
use crate::wire::ip_protocol::IPProtocol;
use crate::wire::ipv6_ext::Ipv6ExtKind;
use crate::wire::tcp::TcpHeader;
use crate::wire::{IpLayer, ParsedPacket};

/// One IPv6 extension header's worth of context (mirrors
/// [`crate::wire::ipv6_ext::Ipv6ExtRecord`] but lives in the
/// long-lived context rather than a single parse).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6ExtContext {
  /// Extension kind.
  pub kind: Ipv6ExtKind,
  /// This extension's own next-header value.
  pub next_header: IPProtocol,
  /// Raw bytes as last observed, used to detect dynamic-chain changes
  /// (SPEC_FULL.md §8 scenario 6).
  pub raw: Vec<u8>,
}

/// IPv4-flavored IP-layer context record (SPEC_FULL.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Context {
  /// Source address.
  pub source: Ipv4Addr,
  /// Destination address.
  pub destination: Ipv4Addr,
  /// Protocol of the layer that follows.
  pub protocol: IPProtocol,
  /// Differentiated Services Code Point.
  pub dscp: u8,
  /// Explicit Congestion Notification bits.
  pub ecn: u8,
  /// Time to live.
  pub ttl: u8,
  /// Don't Fragment bit.
  pub df: bool,
  /// Most recently observed IP-ID, host order.
  pub last_ip_id: u16,
  /// Current IP-ID behavior classification.
  pub ip_id_behavior: IpIdBehavior,
  /// Behavior observed before the most recent transition, used by the CO
  /// format gate to detect "IP-ID behavior changed" (SPEC_FULL.md §4.6).
  pub last_ip_id_behavior: IpIdBehavior,
}

/// IPv6-flavored IP-layer context record (SPEC_FULL.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6Context {
  /// Source address.
  pub source: Ipv6Addr,
  /// Destination address.
  pub destination: Ipv6Addr,
  /// Flow label.
  pub flow_label: u32,
  /// Differentiated Services Code Point.
  pub dscp: u8,
  /// Explicit Congestion Notification bits.
  pub ecn: u8,
  /// Hop limit.
  pub hop_limit: u8,
  /// Extension-header sub-records, in wire order.
  pub extensions: Vec<Ipv6ExtContext>,
  /// Terminating protocol after the extension chain.
  pub terminal_protocol: IPProtocol,
}

/// One level of the IP-chain context, v4 or v6 (SPEC_FULL.md §3, §9: a
/// sum type, never a coerced/aliased union).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpContext {
  /// IPv4 layer.
  V4(Ipv4Context),
  /// IPv6 layer, extensions included.
  V6(Ipv6Context),
}

impl IpContext {
  /// Outer TTL/HopLimit, used by the irregular-chain TTL-change trigger
  /// (SPEC_FULL.md §4.6).
  pub fn ttl_or_hop_limit(&self) -> u8 {
    match self {
      IpContext::V4(c) => c.ttl,
      IpContext::V6(c) => c.hop_limit,
    }
  }
}

/// TCP-layer context (SPEC_FULL.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpContext {
  /// Last full 20-byte TCP header, used for static-or-irregular /
  /// variable-length-32 comparisons.
  pub old_tcphdr: [u8; TcpHeader::MIN_LEN],
  /// Last observed sequence number, host order.
  pub seq_number: u32,
  /// Last observed ack number, host order.
  pub ack_number: u32,
  /// `seq_number` scaled by the current payload size.
  pub scaled_seq: u32,
  /// `seq_number mod payload_size`.
  pub seq_residue: u32,
  /// `ack_number` scaled by `ack_stride`.
  pub scaled_ack: u32,
  /// `ack_number mod ack_stride`.
  pub ack_residue: u32,
  /// Assumed TCP ack increment; `0` disables scaled-ack encoding
  /// (SPEC_FULL.md §3 invariant).
  pub ack_stride: u32,
  /// Payload size of the previous packet, used to decide scaled-seq
  /// stride stability (SPEC_FULL.md §4.1).
  pub last_payload_size: u32,
  /// 16-bit Master Sequence Number.
  pub msn: u16,
  /// Whether ECN has been observed in use on this flow.
  pub ecn_used: bool,
}

/// The three-state refresh state machine (SPEC_FULL.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
  /// Initialization-and-Refresh: full static + dynamic chain.
  Ir,
  /// First-Order: dynamic chain only.
  Fo,
  /// Second-Order: compressed base header plus irregular chain.
  So,
}

/// A single flow's compressor state (SPEC_FULL.md §3, one per CID).
#[derive(Debug, Clone)]
pub struct FlowContext {
  /// IP-layer context chain, outermost first.
  pub ip_chain: Vec<IpContext>,
  /// TCP-layer context.
  pub tcp: TcpContext,
  /// TCP options table.
  pub options: TcpOptionsTable,
  /// Current refresh state.
  pub state: RefreshState,
  /// TCP source/destination ports (static for the lifetime of the flow).
  source_port: u16,
  dest_port: u16,
}

impl FlowContext {
  /// Returns `(source_port, dest_port)`.
  pub fn tcp_ports(&self) -> (u16, u16) {
    (self.source_port, self.dest_port)
  }

  /// Innermost IP-layer context (the one carrying the IP-ID behavior the
  /// CO format gate keys off of).
  pub fn innermost(&self) -> &IpContext {
    self
      .ip_chain
      .last()
      .expect("ip_chain is never empty for a live context")
  }

  /// Mutable innermost IP-layer context.
  pub fn innermost_mut(&mut self) -> &mut IpContext {
    self
      .ip_chain
      .last_mut()
      .expect("ip_chain is never empty for a live context")
  }

  /// Builds a brand-new context from the first packet of a flow
  /// (SPEC_FULL.md §4.3). `msn_seed` comes from the host's random source.
  pub fn create(packet: &ParsedPacket, msn_seed: u16) -> Self {
    let ip_chain = packet
      .ip_chain
      .iter()
      .map(|layer| match layer {
        IpLayer::V4(h) => IpContext::V4(Ipv4Context {
          source: h.source,
          destination: h.destination,
          protocol: h.protocol,
          dscp: h.dscp,
          ecn: h.ecn,
          ttl: h.ttl,
          df: h.df,
          last_ip_id: h.id,
          ip_id_behavior: IpIdBehavior::Unknown,
          last_ip_id_behavior: IpIdBehavior::Unknown,
        }),
        IpLayer::V6(h) => IpContext::V6(Ipv6Context {
          source: h.source,
          destination: h.destination,
          flow_label: h.flow_label,
          dscp: h.dscp,
          ecn: h.ecn,
          hop_limit: h.hop_limit,
          extensions: h
            .extensions
            .iter()
            .map(|e| Ipv6ExtContext {
              kind: e.kind,
              next_header: e.next_header,
              raw: e.raw.clone(),
            })
            .collect(),
          terminal_protocol: h.terminal_protocol,
        }),
      })
      .collect();

    let tcp = TcpContext {
      old_tcphdr: packet.tcp.to_bytes(),
      seq_number: packet.tcp.seq_number,
      ack_number: packet.tcp.ack_number,
      scaled_seq: 0,
      seq_residue: packet.tcp.seq_number,
      scaled_ack: 0,
      ack_residue: packet.tcp.ack_number,
      ack_stride: 0,
      last_payload_size: packet.payload_len as u32,
      msn: msn_seed,
      ecn_used: packet.tcp.flags.get_ece() || packet.tcp.flags.get_cwr(),
    };

    Self {
      ip_chain,
      tcp,
      options: TcpOptionsTable::new(),
      state: RefreshState::Ir,
      source_port: packet.tcp.source_port,
      dest_port: packet.tcp.dest_port,
    }
  }

  /// Advances MSN by one, modulo 2^16, per the §3 invariant.
  pub fn advance_msn(&mut self) {
    self.tcp.msn = self.tcp.msn.wrapping_add(1);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::wire::parse_packet;

  fn sample_packet() -> ParsedPacket {
    let bytes = [
      0x45, 0x00, 0x00, 0x38, 0x76, 0xF4, 0x40, 0x00, 0x40, 0x06, 0x80, 0xD9, 0xC0, 0xA8, 0x00,
      0x6C, 0xD0, 0x61, 0xB1, 0x7C, 0xB0, 0xC2, 0x00, 0x50, 0xB0, 0xEE, 0x32, 0xA6, 0x04, 0x39,
      0xAE, 0xE6, 0x50, 0x18, 0x00, 0xE5, 0x76, 0x92, 0x00, 0x00,
    ];
    parse_packet(&bytes).unwrap()
  }

  #[test]
  fn create_seeds_unknown_ip_id_behavior_and_ir_state() {
    let packet = sample_packet();
    let ctx = FlowContext::create(&packet, 0xBEEF);
    assert_eq!(ctx.state, RefreshState::Ir);
    assert_eq!(ctx.tcp.msn, 0xBEEF);
    match ctx.innermost() {
      IpContext::V4(v4) => assert_eq!(v4.ip_id_behavior, IpIdBehavior::Unknown),
      _ => panic!("expected v4 context"),
    }
  }

  #[test]
  fn msn_wraps_modulo_2_16() {
    let packet = sample_packet();
    let mut ctx = FlowContext::create(&packet, 0xFFFF);
    ctx.advance_msn();
    assert_eq!(ctx.tcp.msn, 0);
  }
}
