//! IR / IR-DYN static and dynamic chain builders (SPEC_FULL.md §4.5, §4.6).

use crate::classifier::IpIdBehavior;
use crate::context::{FlowContext, IpContext};
use crate::crc::crc8;
use crate::error::CompressError;
use crate::field::{dscp, rsf, static_irregular};
use crate::options::parse_options;
use crate::wire::{IpLayer, ParsedPacket};
use crate::writer::BitWriter;

/// Packet-type discriminator bytes (RFC 6846 §5.2.1 packet type octet);
/// not meaningful without a matching decompressor, but fixed so repeated
/// runs over the same input are byte-for-byte reproducible.
const DISCRIMINATOR_IR: u8 = 0xFD;
const DISCRIMINATOR_IR_DYN: u8 = 0xF8;

fn write_static_chain(writer: &mut BitWriter<'_>, packet: &ParsedPacket) -> Result<(), CompressError> {
  for layer in &packet.ip_chain {
    match layer {
      IpLayer::V4(h) => {
        writer.write_u8(4)?;
        writer.write_u8(u8::from(h.protocol))?;
        writer.write_u32(u32::from(h.source))?;
        writer.write_u32(u32::from(h.destination))?;
      }
      IpLayer::V6(h) => {
        writer.write_u8(6)?;
        writer.write_u8(u8::from(h.terminal_protocol))?;
        writer.write_bits(h.flow_label, 20)?;
        writer.align_to_byte();
        writer.write_bytes(&h.source.octets())?;
        writer.write_bytes(&h.destination.octets())?;
      }
    }
  }
  writer.write_u16(packet.tcp.source_port)?;
  writer.write_u16(packet.tcp.dest_port)?;
  Ok(())
}

/// Writes the dynamic chain shared by IR, IR-DYN, and (when `list_present`)
/// the CO family's option list, recording every option into `context`'s
/// options table as it goes (SPEC_FULL.md §4.5's "Dynamic-chain form").
fn write_dynamic_chain(
  writer: &mut BitWriter<'_>,
  context: &mut FlowContext,
  packet: &ParsedPacket,
) -> Result<(), CompressError> {
  for (ctx_layer, pkt_layer) in context.ip_chain.iter().zip(packet.ip_chain.iter()) {
    match (ctx_layer, pkt_layer) {
      (IpContext::V4(c), IpLayer::V4(p)) => {
        dscp::encode(writer, p.dscp, c.dscp)?;
        writer.write_bits(p.ecn as u32, 2)?;
        writer.write_bits(p.df as u32, 1)?;
        let behavior_code = match c.ip_id_behavior {
          IpIdBehavior::Sequential => 0,
          IpIdBehavior::SequentialSwapped => 1,
          IpIdBehavior::Random => 2,
          IpIdBehavior::Zero => 3,
          IpIdBehavior::Unknown => 2,
        };
        writer.write_bits(behavior_code, 2)?;
        writer.align_to_byte();
        writer.write_u16(p.id)?;
        writer.write_u8(p.ttl)?;
      }
      (IpContext::V6(c), IpLayer::V6(p)) => {
        dscp::encode(writer, p.dscp, c.dscp)?;
        writer.write_bits(p.ecn as u32, 2)?;
        writer.align_to_byte();
        writer.write_u8(p.hop_limit)?;
      }
      _ => {
        return Err(CompressError::InvariantViolation(
          "ip chain shape changed between context and packet",
        ))
      }
    }
  }

  writer.align_to_byte();
  writer.write_u16(context.tcp.msn)?;
  writer.write_u32(packet.tcp.seq_number)?;
  writer.write_u32(packet.tcp.ack_number)?;
  writer.write_u16(packet.tcp.window)?;
  writer.write_u16(packet.tcp.urgent_pointer)?;

  let (rst, syn, fin) = packet.tcp.flags.rsf();
  match rsf::rsf_index_enc(rst, syn, fin) {
    Some(idx) => writer.write_bits(idx.bits(), 2)?,
    None => {
      writer.write_bits(0b11, 2)?;
      writer.write_bits(rst as u32, 1)?;
      writer.write_bits(syn as u32, 1)?;
      writer.write_bits(fin as u32, 1)?;
    }
  }
  writer.write_bits(context.tcp.ecn_used as u32, 1)?;

  let parsed_options = parse_options(&packet.tcp.options)?;
  writer.align_to_byte();
  writer.write_u8(parsed_options.len() as u8)?;
  for opt in &parsed_options {
    let index = context.options.record(opt.kind, &opt.value)?;
    writer.write_u8(index as u8)?;
  }
  writer.write_bytes(&packet.tcp.options)?;

  Ok(())
}

/// Builds a full IR packet: discriminator, static chain, dynamic chain,
/// CRC-8 over everything written so far.
pub fn build_ir(
  writer: &mut BitWriter<'_>,
  context: &mut FlowContext,
  packet: &ParsedPacket,
) -> Result<(), CompressError> {
  let start = writer.len();
  writer.write_u8(DISCRIMINATOR_IR)?;
  write_static_chain(writer, packet)?;
  write_dynamic_chain(writer, context, packet)?;
  append_crc8(writer, start)
}

/// Builds an IR-DYN packet: discriminator, dynamic chain only, CRC-8.
pub fn build_ir_dyn(
  writer: &mut BitWriter<'_>,
  context: &mut FlowContext,
  packet: &ParsedPacket,
) -> Result<(), CompressError> {
  let start = writer.len();
  writer.write_u8(DISCRIMINATOR_IR_DYN)?;
  write_dynamic_chain(writer, context, packet)?;
  append_crc8(writer, start)
}

fn append_crc8(writer: &mut BitWriter<'_>, from: usize) -> Result<(), CompressError> {
  writer.align_to_byte();
  let digest = crc8(&writer.written()[from..]);
  writer.write_u8(digest)
}
