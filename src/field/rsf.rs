//! RSF (RST/SYN/FIN) flags index encoder (SPEC_FULL.md §4.1,
//! `rsf_index_enc`, RFC 4996 §6.3.2).
//!
//! The 3-bit RST/SYN/FIN field compresses to a 2-bit index by a fixed
//! table: only the four "one flag or none set" combinations are
//! representable, matching real TCP traffic where at most one of
//! RST/SYN/FIN is ever set on a given segment.

/// The four RSF combinations the 2-bit index can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsfIndex {
  /// No RST/SYN/FIN set.
  None,
  /// RST set.
  Rst,
  /// FIN set.
  Fin,
  /// SYN set.
  Syn,
}

impl RsfIndex {
  /// The 2-bit wire value for this index.
  pub fn bits(self) -> u32 {
    match self {
      RsfIndex::None => 0b00,
      RsfIndex::Rst => 0b01,
      RsfIndex::Fin => 0b10,
      RsfIndex::Syn => 0b11,
    }
  }
}

/// Encodes raw `(rst, syn, fin)` flags to the 2-bit RFC 4996 §6.3.2 index.
///
/// Returns `None` if more than one of the three flags is set; the index
/// cannot represent that combination, so the caller must force a format
/// carrying the flags verbatim (the irregular chain / `co_common`).
pub fn rsf_index_enc(rst: bool, syn: bool, fin: bool) -> Option<RsfIndex> {
  match (rst, syn, fin) {
    (false, false, false) => Some(RsfIndex::None),
    (true, false, false) => Some(RsfIndex::Rst),
    (false, false, true) => Some(RsfIndex::Fin),
    (false, true, false) => Some(RsfIndex::Syn),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn maps_each_single_flag() {
    assert_eq!(rsf_index_enc(false, false, false), Some(RsfIndex::None));
    assert_eq!(rsf_index_enc(true, false, false), Some(RsfIndex::Rst));
    assert_eq!(rsf_index_enc(false, false, true), Some(RsfIndex::Fin));
    assert_eq!(rsf_index_enc(false, true, false), Some(RsfIndex::Syn));
  }

  #[test]
  fn rejects_multiple_flags() {
    assert_eq!(rsf_index_enc(true, true, false), None);
  }
}
