#![doc = include_str!("../readme.md")]
#![warn(missing_docs)]
#![deny(clippy::default_numeric_fallback)]

//! ROHC-TCP (RFC 6846) header compressor core.
//!
//! [`Compressor`] is the entry point: feed it raw IP+TCP packets via
//! [`Compressor::compress`] and it classifies each one against its live
//! [`FlowContext`]s, creating a new context when nothing matches, and
//! writes the compressed wire format chosen by [`packet::format::decide`].

pub(crate) mod macros;

mod error;
pub use error::{CompressError, CompressResult, ContextMatch};

mod reader;
pub use reader::PacketReader;

mod writer;
pub use writer::BitWriter;

mod crc;
pub use crc::{crc3, crc7, crc8};

pub mod field;
pub mod wire;

mod classifier;
pub use classifier::{check_context, check_profile, IpIdBehavior};

mod context;
pub use context::{FlowContext, IpContext, Ipv4Context, Ipv6Context, RefreshState, TcpContext};

mod options;
pub use options::TcpOptionsTable;

mod config;
pub use config::CompressorProfile;

pub mod collaborators;
pub use collaborators::{CidCodec, NullTraceSink, OsRandomSource, RandomSource, TraceSink};

pub mod packet;
pub use packet::format::PacketType;

mod compressor;
pub use compressor::Compressor;

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use test_log::test;

  use crate::Compressor;

  #[test]
  fn compresses_a_plain_get_request_as_ir() {
    let bytes = [
      0x45, 0x00, 0x00, 0x38, 0x76, 0xF4, 0x40, 0x00, 0x40, 0x06, 0x80, 0xD9, 0xC0, 0xA8, 0x00,
      0x6C, 0xD0, 0x61, 0xB1, 0x7C, 0xB0, 0xC2, 0x00, 0x50, 0xB0, 0xEE, 0x32, 0xA6, 0x04, 0x39,
      0xAE, 0xE6, 0x50, 0x18, 0x00, 0xE5, 0x76, 0x92, 0x00, 0x00, 0x47, 0x45, 0x54, 0x20, 0x2F,
      0x69, 0x6E, 0x64, 0x65, 0x78, 0x2E, 0x68, 0x74, 0x6D, 0x6C, 0x0A,
    ];

    let mut compressor = Compressor::new();
    let mut dest = [0u8; 256];
    let (written, format) = compressor.compress(&bytes, &mut dest).unwrap();
    assert_eq!(format, crate::PacketType::Ir);
    assert!(written > 0);
  }

  #[test]
  fn steady_stream_settles_into_second_order_state() {
    let mut compressor = Compressor::new();
    let mut dest = [0u8; 256];

    let first = [
      0x45, 0x00, 0x00, 0x28, 0x00, 0x01, 0x40, 0x00, 0x40, 0x06, 0x00, 0x00, 0xC0, 0xA8, 0x00,
      0x01, 0xC0, 0xA8, 0x00, 0x02, 0x04, 0xD2, 0x00, 0x50, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
      0x00, 0x00, 0x50, 0x10, 0x20, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];
    compressor.compress(&first, &mut dest).unwrap();

    let mut second = first;
    second[4] = 0x00;
    second[5] = 0x02; // next IP-ID
    let (_, format) = compressor.compress(&second, &mut dest).unwrap();
    assert_ne!(format, crate::PacketType::Ir);
  }
}
