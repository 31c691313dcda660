//! Per-packet format selection, emission, and context update (SPEC_FULL.md
//! §4.6): "classify → advance state → decide format → build chain(s) →
//! write CRC → update context."

pub mod co;
pub mod format;
pub mod ir;
pub mod irregular;

use crate::classifier::advance_ip_id_behavior;
use crate::config::CompressorProfile;
use crate::context::{FlowContext, IpContext, RefreshState};
use crate::error::CompressError;
use crate::field::scaled::stride_is_stable;
use crate::options::parse_options;
use crate::wire::{IpLayer, ParsedPacket};
use crate::writer::BitWriter;
use format::PacketType;

/// Encodes one packet against `context`, writing into `dest` and returning
/// the number of bytes written. Advances `context` on success; leaves it
/// untouched on failure (SPEC_FULL.md §7).
pub fn encode(
  context: &mut FlowContext,
  packet: &ParsedPacket,
  profile: &CompressorProfile,
  dest: &mut [u8],
) -> Result<(usize, PacketType), CompressError> {
  advance_ip_id_behaviors(context, packet);

  let refresh_forced = profile.force_ir_on_dynamic_change && dynamic_chain_changed(context, packet);
  let (mut format, _trigger) = if context.state == RefreshState::Ir || refresh_forced {
    (PacketType::Ir, None)
  } else if context.state == RefreshState::Fo {
    (PacketType::IrDyn, None)
  } else {
    format::decide(context, packet)
  };

  if refresh_forced && context.state != RefreshState::Ir {
    format = PacketType::Ir;
  }

  let mut writer = BitWriter::new(dest);
  match format {
    PacketType::Ir => ir::build_ir(&mut writer, context, packet)?,
    PacketType::IrDyn => ir::build_ir_dyn(&mut writer, context, packet)?,
    PacketType::CoCommon => co::build_co_common(&mut writer, context, packet)?,
    PacketType::Seq1 => co::build_seq_1(&mut writer, context, packet)?,
    PacketType::Seq2 => co::build_seq_2(&mut writer, context, packet)?,
    PacketType::Seq4 => co::build_seq_4(&mut writer, context, packet)?,
    PacketType::Seq8 => co::build_ecn_branch(&mut writer, context, packet, true)?,
    PacketType::Rnd1 => co::build_rnd_1(&mut writer, context, packet)?,
    PacketType::Rnd8 => co::build_ecn_branch(&mut writer, context, packet, false)?,
  }
  let written = writer.len();

  update_context_after_emission(context, packet, profile, format);

  Ok((written, format))
}

fn advance_ip_id_behaviors(context: &mut FlowContext, packet: &ParsedPacket) {
  for (ctx_layer, pkt_layer) in context.ip_chain.iter_mut().zip(packet.ip_chain.iter()) {
    if let (IpContext::V4(c), IpLayer::V4(p)) = (ctx_layer, pkt_layer) {
      let next = advance_ip_id_behavior(c.ip_id_behavior, c.last_ip_id, p.id);
      c.last_ip_id_behavior = c.ip_id_behavior;
      c.ip_id_behavior = next;
    }
  }
}

fn dynamic_chain_changed(context: &FlowContext, packet: &ParsedPacket) -> bool {
  context
    .ip_chain
    .iter()
    .zip(packet.ip_chain.iter())
    .any(|(c, p)| match (c, p) {
      (IpContext::V4(c), IpLayer::V4(p)) => c.dscp != p.dscp || c.ecn != p.ecn || c.df != p.df,
      (IpContext::V6(c), IpLayer::V6(p)) => c.dscp != p.dscp || c.ecn != p.ecn,
      _ => true,
    })
}

fn update_context_after_emission(
  context: &mut FlowContext,
  packet: &ParsedPacket,
  profile: &CompressorProfile,
  format: PacketType,
) {
  for (ctx_layer, pkt_layer) in context.ip_chain.iter_mut().zip(packet.ip_chain.iter()) {
    match (ctx_layer, pkt_layer) {
      (IpContext::V4(c), IpLayer::V4(p)) => {
        c.last_ip_id = p.id;
        c.dscp = p.dscp;
        c.ecn = p.ecn;
        c.ttl = p.ttl;
        c.df = p.df;
      }
      (IpContext::V6(c), IpLayer::V6(p)) => {
        c.dscp = p.dscp;
        c.ecn = p.ecn;
        c.hop_limit = p.hop_limit;
      }
      _ => {}
    }
  }

  if profile.detect_ack_stride && context.tcp.ack_number != packet.tcp.ack_number {
    let candidate = packet.tcp.ack_number.wrapping_sub(context.tcp.ack_number);
    if stride_is_stable(context.tcp.ack_stride, candidate) || context.tcp.ack_stride == 0 {
      context.tcp.ack_stride = candidate;
    }
  }

  if let Ok(parsed) = parse_options(&packet.tcp.options) {
    for opt in parsed {
      if let Err(_err) = context.options.record(opt.kind, &opt.value) {
        // Table full or arena exhausted: this option stays untracked and
        // `index_of`/`any_option_changed` will keep reporting it as new,
        // so later packets fall back to the generic-irregular wrapper for
        // it (SPEC_FULL.md §4.5 step 5) instead of desyncing silently.
        #[cfg(feature = "tracing")]
        tracing::warn!(kind = opt.kind, error = %_err, "tcp options table full, falling back to generic-irregular");
      }
    }
  }

  context.tcp.last_payload_size = packet.payload_len as u32;
  context.tcp.old_tcphdr = packet.tcp.to_bytes();
  context.tcp.seq_number = packet.tcp.seq_number;
  context.tcp.ack_number = packet.tcp.ack_number;

  let seq_scaled = crate::field::scaled::scale(packet.tcp.seq_number, context.tcp.last_payload_size);
  context.tcp.scaled_seq = seq_scaled.scaled;
  context.tcp.seq_residue = seq_scaled.residue;
  let ack_scaled = crate::field::scaled::scale(packet.tcp.ack_number, context.tcp.ack_stride);
  context.tcp.scaled_ack = ack_scaled.scaled;
  context.tcp.ack_residue = ack_scaled.residue;

  context.tcp.ecn_used =
    context.tcp.ecn_used || packet.tcp.flags.get_ece() || packet.tcp.flags.get_cwr();
  context.advance_msn();

  context.state = match context.state {
    RefreshState::Ir => RefreshState::Fo,
    RefreshState::Fo => RefreshState::So,
    RefreshState::So => match format {
      PacketType::Ir | PacketType::IrDyn => RefreshState::Fo,
      _ => RefreshState::So,
    },
  };
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::wire::parse_packet;

  fn sample_bytes() -> [u8; 39] {
    [
      0x45, 0x00, 0x00, 0x38, 0x76, 0xF4, 0x40, 0x00, 0x40, 0x06, 0x80, 0xD9, 0xC0, 0xA8, 0x00,
      0x6C, 0xD0, 0x61, 0xB1, 0x7C, 0xB0, 0xC2, 0x00, 0x50, 0xB0, 0xEE, 0x32, 0xA6, 0x04, 0x39,
      0xAE, 0xE6, 0x50, 0x18, 0x00, 0xE5, 0x76, 0x92, 0x00,
    ]
  }

  #[test]
  fn first_packet_after_create_still_emits_ir() {
    let packet = parse_packet(&sample_bytes()).unwrap();
    let mut context = FlowContext::create(&packet, 1);
    let profile = CompressorProfile::default();
    let mut dest = [0u8; 128];
    let (_written, format) = encode(&mut context, &packet, &profile, &mut dest).unwrap();
    assert_eq!(format, PacketType::Ir);
    assert_eq!(context.state, RefreshState::Fo);
  }

  #[test]
  fn msn_advances_each_encode_call() {
    let packet = parse_packet(&sample_bytes()).unwrap();
    let mut context = FlowContext::create(&packet, 1);
    let profile = CompressorProfile::default();
    let mut dest = [0u8; 128];
    let before = context.tcp.msn;
    encode(&mut context, &packet, &profile, &mut dest).unwrap();
    assert_eq!(context.tcp.msn, before.wrapping_add(1));
  }
}
