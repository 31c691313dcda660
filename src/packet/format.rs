//! CO-format gate and decision tree (SPEC_FULL.md §4.6).

use crate::classifier::IpIdBehavior;
use crate::context::{FlowContext, IpContext};
use crate::wire::tcp::TcpHeader;
use crate::wire::ParsedPacket;

/// Which wire format the builder settled on for this packet.
///
/// Every variant in the RFC catalogue is named here even though this crate
/// only emits full bit-exact layouts for a representative subset (`IR`,
/// `IrDyn`, `CoCommon`, `Seq1`, `Seq2`, `Seq4`, `Seq8`, `Rnd1`, `Rnd8`); see
/// `packet::co` and `DESIGN.md` for which of the remaining `rnd_3..7` /
/// `seq_3/5/6/7` forms are currently routed through `CoCommon` as an
/// always-correct (if less compact) fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
  /// Full static + dynamic chain.
  Ir,
  /// Dynamic chain only, no static chain.
  IrDyn,
  /// Generalized compressed format, always able to carry any change.
  CoCommon,
  /// Sequential IP-ID, seq LSB only.
  Seq1,
  /// Sequential IP-ID, scaled seq.
  Seq2,
  /// Sequential IP-ID, scaled ack.
  Seq4,
  /// Sequential IP-ID, ECN in use.
  Seq8,
  /// Random/zero IP-ID, seq LSB only.
  Rnd1,
  /// Random/zero IP-ID, ECN in use.
  Rnd8,
}

/// Which CO trigger, if any, forced `co_common` (SPEC_FULL.md §4.6,
/// surfaced to [`crate::collaborators::TraceSink::forced_co_common`]).
pub const TRIGGER_ACK_OR_URG_FLAG: &str = "ack_or_urg_flag_changed";
pub const TRIGGER_IP_ID_BEHAVIOR: &str = "ip_id_behavior_changed";
pub const TRIGGER_DF_CHANGED: &str = "df_changed";
pub const TRIGGER_ECN_FLAGS: &str = "ecn_flags_changed";
pub const TRIGGER_SEQ_ACK_HIGH16: &str = "seq_or_ack_high16_changed";
pub const TRIGGER_URGENT_PRESENT: &str = "urgent_pointer_present";
pub const TRIGGER_OUTER_TTL: &str = "outer_ttl_or_hop_limit_changed";
pub const TRIGGER_OPTIONS_CHANGED: &str = "tcp_options_changed";

fn old_flags(old: &[u8; TcpHeader::MIN_LEN]) -> u16 {
  u16::from_be_bytes([old[12], old[13]])
}

/// Returns the first CO trigger that fires for `context`/`packet`, if any.
fn co_common_trigger(context: &FlowContext, packet: &ParsedPacket) -> Option<&'static str> {
  let old = old_flags(&context.tcp.old_tcphdr);
  let old_ack = old & (1 << 4) != 0;
  let old_urg = old & (1 << 5) != 0;
  if packet.tcp.flags.get_ack() != old_ack || packet.tcp.flags.get_urg() != old_urg {
    return Some(TRIGGER_ACK_OR_URG_FLAG);
  }

  if let IpContext::V4(v4) = context.innermost() {
    if v4.ip_id_behavior != v4.last_ip_id_behavior {
      return Some(TRIGGER_IP_ID_BEHAVIOR);
    }
  }

  if let (IpContext::V4(v4), Some(crate::wire::IpLayer::V4(p))) =
    (context.innermost(), packet.ip_chain.last())
  {
    if v4.df != p.df {
      return Some(TRIGGER_DF_CHANGED);
    }
  }

  let old_ece = old & (1 << 6) != 0;
  let old_cwr = old & (1 << 7) != 0;
  let old_ns = old & (1 << 8) != 0;
  if packet.tcp.flags.get_ece() != old_ece
    || packet.tcp.flags.get_cwr() != old_cwr
    || packet.tcp.flags.get_ns() != old_ns
  {
    return Some(TRIGGER_ECN_FLAGS);
  }

  let old_seq = u32::from_be_bytes([
    context.tcp.old_tcphdr[4],
    context.tcp.old_tcphdr[5],
    context.tcp.old_tcphdr[6],
    context.tcp.old_tcphdr[7],
  ]);
  let old_ack_num = u32::from_be_bytes([
    context.tcp.old_tcphdr[8],
    context.tcp.old_tcphdr[9],
    context.tcp.old_tcphdr[10],
    context.tcp.old_tcphdr[11],
  ]);
  if (packet.tcp.seq_number >> 16) != (old_seq >> 16)
    || (packet.tcp.ack_number >> 16) != (old_ack_num >> 16)
  {
    return Some(TRIGGER_SEQ_ACK_HIGH16);
  }

  if packet.tcp.flags.get_urg() {
    return Some(TRIGGER_URGENT_PRESENT);
  }

  if context
    .ip_chain
    .iter()
    .zip(packet.ip_chain.iter())
    .any(|(c, p)| c.ttl_or_hop_limit() != p.ttl_or_hop_limit())
  {
    return Some(TRIGGER_OUTER_TTL);
  }

  None
}

fn ip_id_is_sequential(context: &FlowContext) -> bool {
  matches!(
    context.innermost(),
    IpContext::V4(v4)
      if matches!(
        v4.ip_id_behavior,
        IpIdBehavior::Sequential | IpIdBehavior::SequentialSwapped
      )
  )
}

/// Decides the packet's format, per SPEC_FULL.md §4.6's decision tree.
/// Returns the format plus the trigger name if `co_common` was forced.
pub fn decide(context: &FlowContext, packet: &ParsedPacket) -> (PacketType, Option<&'static str>) {
  if let Some(trigger) = co_common_trigger(context, packet) {
    return (PacketType::CoCommon, Some(trigger));
  }

  if context.tcp.ecn_used {
    return (
      if ip_id_is_sequential(context) {
        PacketType::Seq8
      } else {
        PacketType::Rnd8
      },
      None,
    );
  }

  if crate::options::any_option_changed(&context.options, &packet.tcp.options).unwrap_or(true) {
    return (PacketType::CoCommon, Some(TRIGGER_OPTIONS_CHANGED));
  }

  let old_seq = u32::from_be_bytes([
    context.tcp.old_tcphdr[4],
    context.tcp.old_tcphdr[5],
    context.tcp.old_tcphdr[6],
    context.tcp.old_tcphdr[7],
  ]);
  let seq_changed = packet.tcp.seq_number != old_seq;
  let candidate_ack_stride = packet.tcp.ack_number.wrapping_sub(context.tcp.ack_number);
  let ack_stable = crate::field::scaled::stride_is_stable(context.tcp.ack_stride, candidate_ack_stride);
  let payload_stable = crate::field::scaled::stride_is_stable(
    context.tcp.last_payload_size,
    packet.payload_len as u32,
  );

  let format = if ip_id_is_sequential(context) {
    if payload_stable && seq_changed {
      PacketType::Seq2
    } else if ack_stable {
      PacketType::Seq4
    } else {
      PacketType::Seq1
    }
  } else {
    PacketType::Rnd1
  };
  (format, None)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::context::FlowContext;
  use crate::wire::parse_packet;

  fn base_packet() -> ParsedPacket {
    let bytes = [
      0x45, 0x00, 0x00, 0x38, 0x76, 0xF4, 0x40, 0x00, 0x40, 0x06, 0x80, 0xD9, 0xC0, 0xA8, 0x00,
      0x6C, 0xD0, 0x61, 0xB1, 0x7C, 0xB0, 0xC2, 0x00, 0x50, 0xB0, 0xEE, 0x32, 0xA6, 0x04, 0x39,
      0xAE, 0xE6, 0x50, 0x18, 0x00, 0xE5, 0x76, 0x92, 0x00, 0x00,
    ];
    parse_packet(&bytes).unwrap()
  }

  #[test]
  fn unchanged_flags_and_ttl_do_not_force_co_common() {
    let packet = base_packet();
    let context = FlowContext::create(&packet, 1);
    let (_, trigger) = decide(&context, &packet);
    assert_eq!(trigger, None);
  }

  #[test]
  fn ttl_change_forces_co_common() {
    let packet = base_packet();
    let mut context = FlowContext::create(&packet, 1);
    if let IpContext::V4(v4) = context.innermost_mut() {
      v4.ttl = v4.ttl.wrapping_add(1);
    }
    let (format, trigger) = decide(&context, &packet);
    assert_eq!(format, PacketType::CoCommon);
    assert_eq!(trigger, Some(TRIGGER_OUTER_TTL));
  }
}
