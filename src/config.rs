//! Host-tunable compressor defaults (SPEC_FULL.md §6).
//!
//! Everything here has an RFC-matching default; a host embedding this crate
//! may override individual knobs (e.g. to disable ack_stride detection on a
//! link known to never pace acks) without touching the core state machine.

/// W-LSB interpretation-interval shift parameters and feature toggles the
/// RFC leaves to the implementer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompressorProfile {
  /// `p` shift parameter for the sequence-number W-LSB field.
  pub seq_p: i64,
  /// `p` shift parameter for the ack-number W-LSB field.
  pub ack_p: i64,
  /// `p` shift parameter for the IP-ID W-LSB field.
  pub ip_id_p: i64,
  /// Whether to attempt `ack_stride` detection at all; disabling this
  /// forces scaled-ack encoding off for the whole flow.
  pub detect_ack_stride: bool,
  /// Number of consecutive packets an `ack_stride` candidate must hold
  /// before being adopted.
  pub ack_stride_confirm_count: u32,
  /// Forces the next `encode` call to emit IR regardless of the refresh
  /// state machine's own decision; an explicit extension point for hosts
  /// that detect a dynamic-chain field changed out of band (SPEC_FULL.md
  /// §9).
  pub force_ir_on_dynamic_change: bool,
}

impl Default for CompressorProfile {
  fn default() -> Self {
    Self {
      seq_p: 16384,
      ack_p: 16384,
      ip_id_p: 0,
      detect_ack_stride: true,
      ack_stride_confirm_count: 3,
      force_ir_on_dynamic_change: true,
    }
  }
}
