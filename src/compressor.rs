//! Public compressor facade (SPEC_FULL.md §6: "entry points →
//! `Compressor` facade methods").

use crate::classifier::{check_context, check_profile};
use crate::collaborators::{OsRandomSource, RandomSource};
use crate::config::CompressorProfile;
use crate::context::FlowContext;
use crate::error::{CompressError, ContextMatch};
use crate::packet::format::PacketType;
use crate::wire::parse_packet;

/// Owns zero or more [`FlowContext`]s and drives the per-packet pipeline:
/// parse → classify → pick or create a context → encode.
///
/// Generic over its random source so hosts can plug in a deterministic one
/// for tests (SPEC_FULL.md §5.4); defaults to [`OsRandomSource`].
pub struct Compressor<R: RandomSource = OsRandomSource> {
  profile: CompressorProfile,
  contexts: Vec<FlowContext>,
  random: R,
}

impl Compressor<OsRandomSource> {
  /// Builds a compressor with the default profile and random source.
  pub fn new() -> Self {
    Self::with_profile(CompressorProfile::default())
  }

  /// Builds a compressor with a custom profile.
  pub fn with_profile(profile: CompressorProfile) -> Self {
    Self {
      profile,
      contexts: Vec::new(),
      random: OsRandomSource,
    }
  }
}

impl Default for Compressor<OsRandomSource> {
  fn default() -> Self {
    Self::new()
  }
}

impl<R: RandomSource> Compressor<R> {
  /// Builds a compressor with an explicit profile and random source.
  pub fn with_profile_and_random(profile: CompressorProfile, random: R) -> Self {
    Self {
      profile,
      contexts: Vec::new(),
      random,
    }
  }

  /// Number of live flow contexts.
  pub fn context_count(&self) -> usize {
    self.contexts.len()
  }

  /// Drops a context by index (the facade's analogue of "destroy").
  pub fn destroy_context(&mut self, index: usize) {
    if index < self.contexts.len() {
      self.contexts.remove(index);
    }
  }

  /// Parses `input`, finds (or creates) its flow context, and writes the
  /// compressed packet into `dest`. Returns the byte count written and
  /// the wire format chosen.
  pub fn compress(&mut self, input: &[u8], dest: &mut [u8]) -> Result<(usize, PacketType), CompressError> {
    let packet = parse_packet(input)?;
    if !check_profile(&packet) {
      return Err(CompressError::NotTcp(0));
    }

    let existing = self
      .contexts
      .iter()
      .position(|ctx| matches!(check_context(ctx, &packet), ContextMatch::Belongs));

    let index = match existing {
      Some(i) => i,
      None => {
        let seed = self.random.next_u16();
        self.contexts.push(FlowContext::create(&packet, seed));
        self.contexts.len() - 1
      }
    };

    crate::packet::encode(&mut self.contexts[index], &packet, &self.profile, dest)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_bytes() -> [u8; 39] {
    [
      0x45, 0x00, 0x00, 0x38, 0x76, 0xF4, 0x40, 0x00, 0x40, 0x06, 0x80, 0xD9, 0xC0, 0xA8, 0x00,
      0x6C, 0xD0, 0x61, 0xB1, 0x7C, 0xB0, 0xC2, 0x00, 0x50, 0xB0, 0xEE, 0x32, 0xA6, 0x04, 0x39,
      0xAE, 0xE6, 0x50, 0x18, 0x00, 0xE5, 0x76, 0x92, 0x00,
    ]
  }

  #[test]
  fn first_packet_creates_a_context() {
    let mut compressor = Compressor::new();
    let mut dest = [0u8; 128];
    let (_written, format) = compressor.compress(&sample_bytes(), &mut dest).unwrap();
    assert_eq!(format, PacketType::Ir);
    assert_eq!(compressor.context_count(), 1);
  }

  #[test]
  fn second_identical_packet_reuses_the_context() {
    let mut compressor = Compressor::new();
    let mut dest = [0u8; 128];
    compressor.compress(&sample_bytes(), &mut dest).unwrap();
    compressor.compress(&sample_bytes(), &mut dest).unwrap();
    assert_eq!(compressor.context_count(), 1);
  }

  #[test]
  fn destroy_context_removes_it() {
    let mut compressor = Compressor::new();
    let mut dest = [0u8; 128];
    compressor.compress(&sample_bytes(), &mut dest).unwrap();
    compressor.destroy_context(0);
    assert_eq!(compressor.context_count(), 0);
  }
}
