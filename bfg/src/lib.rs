//! BFG: a block-partitioned lossless image codec.
//!
//! # Container
//!
//! A BFG file is a 19-byte little-endian header followed by a payload of
//! per-channel block streams:
//!
//! ```plain
//! .-------------------------------------------------------------.
//! | magic_tag (u32) | version (u8) | width (u32) | height (u32) |
//! |-------------------------------------------------------------|
//! | n_bytes (u32)   | n_channels (u8) | color_mode (u8)         |
//! '-------------------------------------------------------------'
//! ```
//!
//! - `magic_tag` is always [`MAGIC_TAG`].
//! - `version` is always [`VERSION`]; a decoder must reject any other value.
//! - `n_bytes` is the length in bytes of the payload that follows the header.
//! - `color_mode` is reserved and always `0`.
//!
//! # Blocks
//!
//! The payload is `n_channels` independent block streams, concatenated in
//! channel order, each covering exactly `width * height` pixels of that
//! channel. Every block starts with a 1-byte header:
//!
//! ```plain
//! .-------------------------.
//! |         Byte[0]         |
//! |  7  6  5  4  3  2  1  0 |
//! |-----------+-------------|
//! |    tag    |  length - 1 |
//! `-------------------------`
//! ```
//!
//! - 3-bit tag: `0` = FULL, `1` = RUN, `2` = DIFF. Tags `3..=7` are reserved
//!   and rejected by the decoder.
//! - 5-bit `length - 1`, giving a block length range of `1..=32` pixels.
//!
//! FULL carries `length` literal bytes. RUN carries no payload bytes; it
//! repeats the previously emitted pixel of that channel `length` times. DIFF
//! carries `ceil(length * 4 / 8)` bytes of packed 4-bit sign-magnitude
//! deltas (high nibble first within each byte), each delta in `[-7, 7]`
//! applied to the running previous pixel.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(any(feature = "alloc", feature = "std"))]
extern crate alloc;

pub(crate) mod bitbuf;
pub(crate) mod block;
pub mod error;

#[cfg(any(feature = "alloc", feature = "std"))]
pub mod decode;
#[cfg(any(feature = "alloc", feature = "std"))]
pub mod encode;

#[cfg(feature = "std")]
pub mod container;

#[cfg(any(feature = "alloc", feature = "std"))]
pub use decode::decode_image;
#[cfg(any(feature = "alloc", feature = "std"))]
pub use encode::encode_image;
pub use error::{DecodeError, EncodeError};
#[cfg(feature = "std")]
pub use error::ContainerError;

/// Fixed value of a BFG container header's `magic_tag` field.
pub const MAGIC_TAG: u32 = 0xBFBF_BFBF;

/// The only container version this crate reads or writes.
pub const VERSION: u8 = 1;

/// Size in bytes of a BFG container header.
pub const HEADER_LEN: usize = 19;

/// The fixed 19-byte BFG container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub magic_tag: u32,
    pub version: u8,
    pub width: u32,
    pub height: u32,
    pub n_bytes: u32,
    pub n_channels: u8,
    pub color_mode: u8,
}

impl ImageHeader {
    /// Serializes the header to its 19-byte little-endian wire form.
    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&self.magic_tag.to_le_bytes());
        buf[4] = self.version;
        buf[5..9].copy_from_slice(&self.width.to_le_bytes());
        buf[9..13].copy_from_slice(&self.height.to_le_bytes());
        buf[13..17].copy_from_slice(&self.n_bytes.to_le_bytes());
        buf[17] = self.n_channels;
        buf[18] = self.color_mode;
        buf
    }

    /// Parses a header from its 19-byte little-endian wire form.
    ///
    /// This does not validate `magic_tag` or `version`; callers that need a
    /// validated header should go through [`decode_image`] or
    /// [`container::read`], which check both before touching the payload.
    pub fn from_bytes(buf: [u8; HEADER_LEN]) -> Self {
        Self {
            magic_tag: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            version: buf[4],
            width: u32::from_le_bytes(buf[5..9].try_into().unwrap()),
            height: u32::from_le_bytes(buf[9..13].try_into().unwrap()),
            n_bytes: u32::from_le_bytes(buf[13..17].try_into().unwrap()),
            n_channels: buf[17],
            color_mode: buf[18],
        }
    }
}
