//! Irregular-chain emission (SPEC_FULL.md §4.5's "Per-format irregular",
//! §4.6's "irregular chain flag").

use crate::classifier::IpIdBehavior;
use crate::context::{FlowContext, IpContext};
use crate::error::CompressError;
use crate::field::ip_id::c_optional_ip_id_lsb;
use crate::field::lsb::smallest_k;
use crate::field::{sack, static_irregular, timestamp};
use crate::options::{kind, parse_options};
use crate::wire::{IpLayer, ParsedPacket};
use crate::writer::BitWriter;

const IP_ID_MAX_K: u32 = 16;

/// Generic-option change marker (SPEC_FULL.md §4.5): a kind this crate
/// doesn't give first-class irregular treatment changed since the context
/// was last updated.
const GENERIC_OPTION_CHANGE_MARKER: [u8; 2] = [0xFF, 0x00];

/// Emits the irregular chain: per-IP-layer TTL/HopLimit-on-change and
/// optional IP-ID LSB, then per-option irregular fields for any option
/// whose value differs from what's stored in the options table (or that
/// the table has never seen at all).
pub fn write_irregular_chain(
  writer: &mut BitWriter<'_>,
  context: &mut FlowContext,
  packet: &ParsedPacket,
) -> Result<(), CompressError> {
  for (ctx_layer, pkt_layer) in context.ip_chain.iter().zip(packet.ip_chain.iter()) {
    static_irregular::encode8(writer, pkt_layer.ttl_or_hop_limit(), ctx_layer.ttl_or_hop_limit())?;

    if let (IpContext::V4(c), IpLayer::V4(p)) = (ctx_layer, pkt_layer) {
      if c.ip_id_behavior != IpIdBehavior::Zero {
        let k = smallest_k(IP_ID_MAX_K, 0, c.last_ip_id as u64, p.id as u64).unwrap_or(IP_ID_MAX_K);
        c_optional_ip_id_lsb(writer, c.ip_id_behavior, p.id, c.last_ip_id, k)?;
      }
    }
  }

  let parsed_options = parse_options(&packet.tcp.options)?;
  for opt in &parsed_options {
    let index = match context.options.index_of(opt.kind) {
      Some(index) => {
        if !context.options.differs_at(index, &opt.value) {
          continue;
        }
        index
      }
      None => {
        // Never seen this kind before: the table may have a free slot, or
        // may not (SPEC_FULL.md §4.5 step 5) — either way the irregular
        // chain must still announce the change instead of dropping it.
        writer.align_to_byte();
        writer.write_bytes(&GENERIC_OPTION_CHANGE_MARKER)?;
        let _ = context.options.record(opt.kind, &opt.value);
        continue;
      }
    };
    match opt.kind {
      kind::MAXSEG => {
        writer.align_to_byte();
        writer.write_bytes(&opt.value)?;
      }
      kind::WINDOW => {
        writer.align_to_byte();
        writer.write_bytes(&opt.value)?;
      }
      kind::TIMESTAMP if opt.value.len() == 8 => {
        let tsval = u32::from_be_bytes(opt.value[0..4].try_into().unwrap());
        let tsecr = u32::from_be_bytes(opt.value[4..8].try_into().unwrap());
        let old = context.options.value_at(index).unwrap_or(&[0, 0, 0, 0, 0, 0, 0, 0]);
        let old_tsval = u32::from_be_bytes(old[0..4].try_into().unwrap());
        let old_tsecr = u32::from_be_bytes(old[4..8].try_into().unwrap());
        timestamp::encode(writer, tsval, old_tsval)?;
        timestamp::encode(writer, tsecr, old_tsecr)?;
      }
      kind::SACK => {
        let blocks: Vec<sack::SackBlock> = opt
          .value
          .chunks_exact(8)
          .map(|c| sack::SackBlock {
            start: u32::from_be_bytes(c[0..4].try_into().unwrap()),
            end: u32::from_be_bytes(c[4..8].try_into().unwrap()),
          })
          .collect();
        sack::encode_option(writer, &blocks, packet.tcp.ack_number)?;
      }
      _ => {
        writer.align_to_byte();
        writer.write_bytes(&GENERIC_OPTION_CHANGE_MARKER)?;
      }
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::context::FlowContext;
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
  fn ttl_unchanged_and_no_options_emits_small_chain() {
    let packet = sample_packet();
    let mut context = FlowContext::create(&packet, 1);
    let mut dest = [0u8; 32];
    let mut writer = BitWriter::new(&mut dest);
    write_irregular_chain(&mut writer, &mut context, &packet).unwrap();
    assert!(writer.len() <= 4);
  }

  #[test]
  fn a_new_option_kind_emits_the_generic_change_marker_instead_of_dropping_it() {
    let mut packet = sample_packet();
    // An option kind the table has never tracked at all (not a known
    // fixed-index kind, and `record` has never been called for it).
    packet.tcp.options = vec![254, 4, 0xAB, 0xCD];
    let mut context = FlowContext::create(&packet, 1);
    let mut dest = [0u8; 32];
    let mut writer = BitWriter::new(&mut dest);
    write_irregular_chain(&mut writer, &mut context, &packet).unwrap();
    let out = writer.finish();
    assert!(out.ends_with(&GENERIC_OPTION_CHANGE_MARKER));
    // and the option is now tracked after the marker was emitted.
    assert!(context.options.index_of(254).is_some());
  }
}
