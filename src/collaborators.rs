//! Host-supplied collaborators (SPEC_FULL.md §6): small seams the core
//! calls through rather than hard-coding, mirroring the way the teacher
//! lineage keeps transport/IO concerns behind a trait (`Streaming`) instead
//! of baking them into the parser.

use rand::RngCore;

/// Encodes/decodes a Context ID for wire transmission. The core never picks
/// a wire CID representation itself (SPEC_FULL.md §6: "CID codec: none in
/// the core").
pub trait CidCodec {
  /// Writes `cid` into `dest`, returning the number of bytes written.
  fn encode_cid(&self, cid: u16, dest: &mut [u8]) -> usize;
}

/// Supplies randomness for MSN seeding on context creation (SPEC_FULL.md
/// §4.3 step 7).
pub trait RandomSource {
  /// Returns a fresh 16-bit value to seed a new context's MSN.
  fn next_u16(&mut self) -> u16;
}

/// `rand`-backed default, grounded in the crate the rest of the pack
/// reaches for whenever it needs non-deterministic values.
#[derive(Debug, Default)]
pub struct OsRandomSource;

impl RandomSource for OsRandomSource {
  fn next_u16(&mut self) -> u16 {
    (rand::thread_rng().next_u32() & 0xFFFF) as u16
  }
}

/// Observability sink for refresh-state transitions and forced-format
/// triggers (SPEC_FULL.md §5.1, §9). The core never configures a
/// subscriber itself; callers that want structured logs wire
/// [`TracingTraceSink`] into a `tracing` subscriber of their own choosing.
pub trait TraceSink {
  /// Called when the refresh state machine transitions.
  fn state_transition(&mut self, _from: &str, _to: &str) {}
  /// Called when a CO-format trigger forces `co_common`, naming the
  /// trigger that fired.
  fn forced_co_common(&mut self, _trigger: &'static str) {}
}

/// No-op sink, the default collaborator when a host doesn't care.
#[derive(Debug, Default)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {}

/// `tracing`-backed sink, only compiled in with the `tracing` feature
/// (SPEC_FULL.md §5.1).
#[cfg(feature = "tracing")]
#[derive(Debug, Default)]
pub struct TracingTraceSink;

#[cfg(feature = "tracing")]
impl TraceSink for TracingTraceSink {
  fn state_transition(&mut self, from: &str, to: &str) {
    tracing::debug!(from, to, "refresh state transition");
  }

  fn forced_co_common(&mut self, trigger: &'static str) {
    tracing::debug!(trigger, "forced co_common");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn null_sink_is_inert() {
    let mut sink = NullTraceSink;
    sink.state_transition("Ir", "Fo");
    sink.forced_co_common("ack_flag_changed");
  }

  #[test]
  fn os_random_source_produces_values() {
    let mut source = OsRandomSource;
    let _ = source.next_u16();
  }
}
