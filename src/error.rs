//! Error taxonomy for the compressor core (see SPEC_FULL.md §5.2 / §7).
//!
//! The taxonomy is intentionally small and flat: shape rejection, capacity
//! rejection, and internal invariant violations. None of these are ever
//! recovered from in a way that advances MSN or `old_tcphdr`.

use thiserror::Error;

/// Everything that can make `create` or `encode` fail.
///
/// A failure never mutates the context: callers may retry with another
/// profile or allocate a fresh context, per SPEC_FULL.md §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompressError {
  /// Outer (or inner, tunneled) IP header is neither v4 nor v6.
  #[error("unsupported IP version {0}")]
  UnsupportedIpVersion(u8),

  /// IPv4 header carries options (IHL != 5).
  #[error("IPv4 header carries options (ihl={0})")]
  Ipv4OptionsPresent(u8),

  /// MF or RF fragmentation flags are set.
  #[error("packet is fragmented")]
  Fragmented,

  /// An IPv6 extension header kind outside the recognized set was seen.
  #[error("unknown IPv6 extension header (next_header={0})")]
  UnknownIpv6Extension(u8),

  /// The header chain did not terminate in TCP.
  #[error("terminating protocol is not TCP (protocol={0})")]
  NotTcp(u8),

  /// The header chain claims more bytes than the packet holds.
  #[error("packet truncated: header chain needs {needed} bytes, packet has {available}")]
  TruncatedPacket {
    /// Bytes the header chain claims to need.
    needed: usize,
    /// Bytes actually available in the packet buffer.
    available: usize,
  },

  /// A TCP option's encoded length does not match its kind's RFC length.
  #[error("invalid TCP option length (kind={kind}, len={len})")]
  InvalidTcpOptionLength {
    /// Option kind byte.
    kind: u8,
    /// Encoded length byte.
    len: u8,
  },

  /// A TCP option kind above 15 was encountered; the index table is
  /// 4 bits wide, so it cannot represent the kind at all.
  #[error("TCP option kind {0} exceeds the indexable range")]
  InvalidTcpOptionKind(u8),

  /// Destination buffer was too small for the compressed packet.
  #[error("destination buffer too small: needed at least {needed} bytes, have {available}")]
  DestinationTooSmall {
    /// Bytes the builder needed.
    needed: usize,
    /// Bytes available in the destination buffer.
    available: usize,
  },

  /// The TCP options value arena overflowed its fixed bound.
  #[error("TCP options arena exhausted (bound={bound} bytes)")]
  OptionsArenaExhausted {
    /// Arena byte bound.
    bound: usize,
  },

  /// `kind` is not yet tracked and every dynamic table slot (8-15) is
  /// occupied by another still-live kind. The caller must fall back to
  /// the generic-irregular option format rather than evict a live slot,
  /// which would desync a real decompressor.
  #[error("TCP options table full, no free dynamic slot for kind {kind}")]
  OptionsTableFull {
    /// The option kind that could not be assigned a slot.
    kind: u8,
  },

  /// A programming-defect-class invariant failed; never produced by bad
  /// wire input, always a bug in this crate or its caller.
  #[error("internal invariant violated: {0}")]
  InvariantViolation(&'static str),
}

/// Result alias used throughout the crate.
pub type CompressResult<T> = Result<T, CompressError>;

/// Outcome of [`crate::classifier::check_context`] (SPEC_FULL.md §6).
///
/// Rendered as a three-way enum instead of the original's `1 | 0 | -1`
/// sentinel integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextMatch {
  /// The packet belongs to this context; proceed to `encode`.
  Belongs,
  /// The packet does not belong to this context; the caller should try
  /// another context or allocate a new one.
  DoesNotBelong,
  /// This profile cannot compress the packet at all (shape rejection).
  CannotCompress,
}
