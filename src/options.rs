//! TCP options table (SPEC_FULL.md §3, §6).
//!
//! Sixteen slots: indices 0-7 are reserved for the kinds the profile knows
//! about by name (EOL, NOP, MSS, WSCALE, SACK-permitted, SACK, timestamp,
//! and a spare), indices 8-15 are assigned to whatever other kinds show up
//! on the flow, first free slot first. A dynamic kind that finds every
//! slot occupied by another still-live kind is never evicted to make room;
//! the caller falls back to the generic-irregular option format instead
//! (SPEC_FULL.md §4.5 step 5). Values live in a small bounded arena rather
//! than per-slot `Vec<u8>`s, mirroring the teacher lineage's preference for
//! one contiguous backing store over many small heap allocations (see
//! `binator`'s buffer-oriented parsers).

use crate::error::CompressError;

/// Upper bound on the options arena, matching the largest TCP options area
/// a single header can carry (`4 * 15` bytes of options).
pub const ARENA_CAPACITY: usize = 60 * 4;

/// Known option kinds with a fixed table index (SPEC_FULL.md §6). Anything
/// else gets a dynamic index in `8..16`.
const KNOWN_KINDS: [u8; 7] = [0, 1, 2, 3, 4, 5, 8];

fn fixed_index_for(kind: u8) -> Option<usize> {
  KNOWN_KINDS.iter().position(|&k| k == kind)
}

/// One table slot: the option kind plus its value bytes (kind/length
/// excluded), stored as a range into the shared arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
  kind: u8,
  start: usize,
  len: usize,
  used: bool,
}

impl Slot {
  const EMPTY: Slot = Slot {
    kind: 0,
    start: 0,
    len: 0,
    used: false,
  };
}

/// The 16-slot TCP options context table.
#[derive(Debug, Clone)]
pub struct TcpOptionsTable {
  slots: [Slot; 16],
  arena: Vec<u8>,
}

impl TcpOptionsTable {
  /// An empty table, as seeded for a brand-new flow context.
  pub fn new() -> Self {
    Self {
      slots: [Slot::EMPTY; 16],
      arena: Vec::with_capacity(ARENA_CAPACITY),
    }
  }

  /// Looks up the table index already assigned to `kind`, if any.
  pub fn index_of(&self, kind: u8) -> Option<usize> {
    if let Some(fixed) = fixed_index_for(kind) {
      if self.slots[fixed].used {
        return Some(fixed);
      }
    }
    self.slots[8..16]
      .iter()
      .position(|s| s.used && s.kind == kind)
      .map(|i| i + 8)
  }

  /// Value bytes currently stored for `index`, if occupied.
  pub fn value_at(&self, index: usize) -> Option<&[u8]> {
    let slot = self.slots.get(index)?;
    if !slot.used {
      return None;
    }
    Some(&self.arena[slot.start..slot.start + slot.len])
  }

  /// Returns whether `value` differs from what's stored at `index` (a
  /// fresh index always counts as "differs").
  pub fn differs_at(&self, index: usize, value: &[u8]) -> bool {
    self.value_at(index) != Some(value)
  }

  /// Records `(kind, value)`, assigning a new dynamic index if `kind`
  /// isn't already tracked. Returns the table index used. A no-op (no
  /// arena growth, slot left untouched) when `kind` is already tracked
  /// with this exact `value` — re-recording an unchanged option must
  /// never cost arena space, or a steady stream of per-packet options
  /// (e.g. TCP Timestamp) would exhaust the arena in a few dozen packets.
  /// Fails with [`CompressError::OptionsTableFull`] when `kind` is new and
  /// every dynamic slot is occupied by another still-live kind, and with
  /// [`CompressError::OptionsArenaExhausted`] when the value arena has no
  /// room left; callers must fall back to the generic-irregular option
  /// format in either case rather than evicting a live slot or silently
  /// dropping the option (SPEC_FULL.md §4.5 step 5, §9 resolved open
  /// question).
  pub fn record(&mut self, kind: u8, value: &[u8]) -> Result<usize, CompressError> {
    if let Some(index) = self.index_of(kind) {
      if !self.differs_at(index, value) {
        return Ok(index);
      }
      let slot = self.slots[index];
      if slot.len == value.len() {
        self.arena[slot.start..slot.start + slot.len].copy_from_slice(value);
        return Ok(index);
      }
      return self.store_at(index, kind, value);
    }

    let index = match fixed_index_for(kind) {
      Some(fixed) => fixed,
      None => self
        .first_free_dynamic_slot()
        .ok_or(CompressError::OptionsTableFull { kind })?,
    };
    self.store_at(index, kind, value)
  }

  fn first_free_dynamic_slot(&self) -> Option<usize> {
    self.slots[8..16].iter().position(|s| !s.used).map(|i| i + 8)
  }

  fn store_at(&mut self, index: usize, kind: u8, value: &[u8]) -> Result<usize, CompressError> {
    if self.arena.len() + value.len() > ARENA_CAPACITY {
      return Err(CompressError::OptionsArenaExhausted {
        bound: ARENA_CAPACITY,
      });
    }
    let start = self.arena.len();
    self.arena.extend_from_slice(value);
    self.slots[index] = Slot {
      kind,
      start,
      len: value.len(),
      used: true,
    };
    Ok(index)
  }
}

impl Default for TcpOptionsTable {
  fn default() -> Self {
    Self::new()
  }
}

/// One TCP option as found on the wire: kind byte plus value bytes (the
/// kind/length prefix itself excluded; `NOP`/`EOL` carry an empty value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOption {
  /// Option kind byte.
  pub kind: u8,
  /// Option value, kind/length prefix excluded.
  pub value: Vec<u8>,
}

/// Walks a raw TCP options area (RFC 9293 §3.1) into `(kind, value)`
/// pairs, stopping at EOL or the end of the buffer.
pub fn parse_options(raw: &[u8]) -> Result<Vec<ParsedOption>, CompressError> {
  let mut out = Vec::new();
  let mut i = 0;
  while i < raw.len() {
    match raw[i] {
      kind::EOL => break,
      kind::NOP => {
        out.push(ParsedOption {
          kind: kind::NOP,
          value: Vec::new(),
        });
        i += 1;
      }
      k => {
        let len = *raw
          .get(i + 1)
          .ok_or(CompressError::InvalidTcpOptionLength { kind: k, len: 0 })?;
        if len < 2 {
          return Err(CompressError::InvalidTcpOptionLength { kind: k, len });
        }
        let value_len = len as usize - 2;
        let value = raw
          .get(i + 2..i + 2 + value_len)
          .ok_or(CompressError::InvalidTcpOptionLength { kind: k, len })?
          .to_vec();
        out.push(ParsedOption { kind: k, value });
        i += len as usize;
      }
    }
  }
  Ok(out)
}

/// Whether any option in `raw` is new or differs from what `table` has
/// recorded for it (SPEC_FULL.md §4.6: only `co_common`/`seq_8`/`rnd_8`
/// carry an options list, so the plain `seq_*`/`rnd_1` forms must never be
/// chosen while this is true).
pub fn any_option_changed(table: &TcpOptionsTable, raw: &[u8]) -> Result<bool, CompressError> {
  let parsed = parse_options(raw)?;
  Ok(parsed.iter().any(|opt| match table.index_of(opt.kind) {
    Some(index) => table.differs_at(index, &opt.value),
    None => true,
  }))
}

/// TCP option kinds the profile gives first-class treatment (SPEC_FULL.md
/// §4.5); anything else is carried through the generic option format.
pub mod kind {
  /// End of option list.
  pub const EOL: u8 = 0;
  /// No-operation padding.
  pub const NOP: u8 = 1;
  /// Maximum segment size.
  pub const MAXSEG: u8 = 2;
  /// Window scale.
  pub const WINDOW: u8 = 3;
  /// SACK permitted.
  pub const SACK_PERMITTED: u8 = 4;
  /// SACK blocks.
  pub const SACK: u8 = 5;
  /// Timestamp.
  pub const TIMESTAMP: u8 = 8;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn known_kinds_get_fixed_indices() {
    let mut table = TcpOptionsTable::new();
    let idx = table.record(kind::MAXSEG, &[0x05, 0xB4]).unwrap();
    assert_eq!(idx, fixed_index_for(kind::MAXSEG).unwrap());
  }

  #[test]
  fn unknown_kinds_fill_dynamic_slots_then_refuse_to_evict() {
    let mut table = TcpOptionsTable::new();
    let mut indices = Vec::new();
    for kind in 30..38u8 {
      indices.push(table.record(kind, &[kind]).unwrap());
    }
    assert!(indices.iter().all(|&i| (8..16).contains(&i)));

    assert!(matches!(
      table.record(38, &[38]),
      Err(CompressError::OptionsTableFull { kind: 38 })
    ));
    // the 8 live kinds are still intact, none of them got evicted to make room
    for (i, kind) in (30..38u8).enumerate() {
      assert_eq!(table.index_of(kind), Some(8 + i));
    }
  }

  #[test]
  fn re_recording_an_unchanged_value_does_not_grow_the_arena() {
    let mut table = TcpOptionsTable::new();
    table.record(kind::TIMESTAMP, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
    let arena_len_before = table.arena.len();
    for _ in 0..100 {
      table.record(kind::TIMESTAMP, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
    }
    assert_eq!(table.arena.len(), arena_len_before);
  }

  #[test]
  fn re_recording_a_same_length_changed_value_overwrites_in_place() {
    let mut table = TcpOptionsTable::new();
    table.record(kind::TIMESTAMP, &[0, 0, 0, 1, 0, 0, 0, 2]).unwrap();
    let arena_len_before = table.arena.len();
    for tick in 2u32..200 {
      let mut value = tick.to_be_bytes().to_vec();
      value.extend_from_slice(&tick.to_be_bytes());
      table.record(kind::TIMESTAMP, &value).unwrap();
    }
    assert_eq!(table.arena.len(), arena_len_before);
  }

  #[test]
  fn differs_at_detects_changed_value() {
    let mut table = TcpOptionsTable::new();
    let idx = table.record(kind::TIMESTAMP, &[1, 2, 3, 4]).unwrap();
    assert!(!table.differs_at(idx, &[1, 2, 3, 4]));
    assert!(table.differs_at(idx, &[1, 2, 3, 5]));
  }

  #[test]
  fn parses_mss_and_nop_padded_options() {
    let raw = [kind::NOP, kind::NOP, kind::MAXSEG, 4, 0x05, 0xB4];
    let parsed = parse_options(&raw).unwrap();
    assert_eq!(parsed.len(), 3);
    assert_eq!(parsed[2].kind, kind::MAXSEG);
    assert_eq!(parsed[2].value, vec![0x05, 0xB4]);
  }

  #[test]
  fn arena_exhaustion_errors_rather_than_silently_dropping() {
    let mut table = TcpOptionsTable::new();
    let big = vec![0xAAu8; ARENA_CAPACITY];
    table.record(40, &big).unwrap();
    assert!(matches!(
      table.record(41, &[1, 2, 3]),
      Err(CompressError::OptionsArenaExhausted { .. })
    ));
  }
}
