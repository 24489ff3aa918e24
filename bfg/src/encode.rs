//! The encoder state machine (spec §4.3): per-channel streaming classifier
//! that emits FULL/RUN/DIFF blocks.

use crate::block::{
    encode_diff_nibble, pixel_delta, write_header, BlockKind, DIFF_BITS, DIFF_MAX_MAGNITUDE,
    MAX_BLOCK_LEN,
};
use crate::error::{AllocationFailureSnafu, EncodeError, InvalidDimensionsSnafu};
use crate::ImageHeader;
use alloc::vec::Vec;
use snafu::{ensure, OptionExt};

#[cfg(feature = "std")]
mod std_api;
#[cfg(feature = "std")]
pub use std_api::*;

/// A strided read-only view over one channel's pixels within an interleaved
/// raw image, so channels never need to be copied into a scratch buffer.
struct ChannelView<'a> {
    pixels: &'a [u8],
    channel: usize,
    n_channels: usize,
}

impl ChannelView<'_> {
    #[inline]
    fn len(&self) -> usize {
        self.pixels.len() / self.n_channels
    }

    #[inline]
    fn get(&self, pixel_index: usize) -> u8 {
        self.pixels[pixel_index * self.n_channels + self.channel]
    }
}

/// Returns `Some(delta)` if RUN can start at this position: the current
/// pixel equals the previous emitted pixel, and the next pixel also equals it.
#[inline]
fn run_startable(curr: u8, prev: u8, next0: u8) -> bool {
    curr == prev && next0 == curr
}

/// Returns `true` if `Δ = curr − prev` alone fits in `[-7, 7]`: the spec's
/// *continue* precondition for an already-open DIFF block, which names no
/// lookahead pixel.
#[inline]
fn diff_continuable(curr: u8, prev: u8) -> bool {
    let delta = pixel_delta(curr, prev);
    (-(DIFF_MAX_MAGNITUDE as i8)..=DIFF_MAX_MAGNITUDE as i8).contains(&delta)
}

/// Returns `Some(delta)` if DIFF can start at this position: both the delta
/// from `prev` to `curr`, and from `curr` to `next0`, fit in `[-7, 7]`.
#[inline]
fn diff_startable(curr: u8, prev: u8, next0: u8) -> Option<i8> {
    let delta = pixel_delta(curr, prev);
    let next_delta = pixel_delta(next0, curr);
    let in_range = |d: i8| (-(DIFF_MAX_MAGNITUDE as i8)..=DIFF_MAX_MAGNITUDE as i8).contains(&d);
    (in_range(delta) && in_range(next_delta)).then_some(delta)
}

/// Picks the cheapest kind startable at this position: RUN, else DIFF, else FULL.
#[inline]
fn choose_kind(curr: u8, prev: u8, next0: u8) -> BlockKind {
    if run_startable(curr, prev, next0) {
        BlockKind::Run
    } else if diff_startable(curr, prev, next0).is_some() {
        BlockKind::Diff
    } else {
        BlockKind::Full
    }
}

/// Encoder state for a single channel's block stream.
struct ChannelEncoder {
    active: BlockKind,
    block_len: u32,
    header_idx: usize,
    prev: u8,
}

impl ChannelEncoder {
    fn new(out: &mut Vec<u8>) -> Self {
        let header_idx = out.len();
        out.push(0);
        Self {
            active: BlockKind::Full,
            block_len: 0,
            header_idx,
            prev: 0,
        }
    }

    /// Closes the active block, if it has any pixels in it, and reserves a
    /// header byte for the next one. A zero-length "close" is a pure no-op:
    /// nothing has been written yet, so there's nothing to finalize.
    fn close_and_reopen(&mut self, out: &mut Vec<u8>, next_kind: BlockKind) {
        if self.block_len > 0 {
            write_header(out, self.header_idx, self.active, self.block_len);
            self.header_idx = out.len();
            out.push(0);
            self.block_len = 0;
        }
        self.active = next_kind;
    }

    fn append_full(&mut self, out: &mut Vec<u8>, pixel: u8) {
        out.push(pixel);
        self.block_len += 1;
        self.prev = pixel;
    }

    fn append_run(&mut self) {
        self.block_len += 1;
        // prev is unchanged: it already equals the repeated value.
    }

    fn append_diff(&mut self, out: &mut Vec<u8>, pixel: u8, delta: i8) {
        // Two nibbles per payload byte, high nibble first.
        let is_high_nibble = self.block_len % 2 == 0;
        if is_high_nibble {
            out.push(0);
        }
        let last = out.len() - 1;
        let bit_offset = if is_high_nibble { 4 } else { 0 };
        let nibble = encode_diff_nibble(delta);
        crate::bitbuf::write_bits(out, last, nibble, DIFF_BITS, bit_offset);
        self.block_len += 1;
        self.prev = pixel;
    }

    fn finish(self, out: &mut Vec<u8>) {
        if self.block_len > 0 {
            write_header(out, self.header_idx, self.active, self.block_len);
        } else {
            // Channel with zero pixels can't happen (width*height >= 1), but
            // if it ever did there's a dangling placeholder header byte to drop.
            out.truncate(self.header_idx);
        }
    }
}

fn encode_channel(view: &ChannelView<'_>, out: &mut Vec<u8>) {
    let n = view.len();
    debug_assert!(n > 0);

    let mut state = ChannelEncoder::new(out);

    for i in 0..n {
        let curr = view.get(i);
        let next0 = view.get((i + 1).min(n - 1));
        let is_last = i == n - 1;

        if state.block_len == MAX_BLOCK_LEN {
            let kind = choose_kind(curr, state.prev, next0);
            state.close_and_reopen(out, kind);
        }

        match state.active {
            BlockKind::Full => {
                if run_startable(curr, state.prev, next0) {
                    state.close_and_reopen(out, BlockKind::Run);
                } else if diff_startable(curr, state.prev, next0).is_some() {
                    state.close_and_reopen(out, BlockKind::Diff);
                }
            }
            BlockKind::Diff => {
                let aligned = (state.block_len * DIFF_BITS) % 8 == 0;
                if aligned && run_startable(curr, state.prev, next0) {
                    state.close_and_reopen(out, BlockKind::Run);
                } else if !diff_continuable(curr, state.prev) {
                    // Delta no longer fits; this block cannot continue.
                    let kind = choose_kind(curr, state.prev, next0);
                    state.close_and_reopen(out, kind);
                }
            }
            BlockKind::Run => {
                if curr != state.prev {
                    let kind = if diff_startable(curr, state.prev, next0).is_some() {
                        BlockKind::Diff
                    } else {
                        BlockKind::Full
                    };
                    state.close_and_reopen(out, kind);
                }
            }
        }

        match state.active {
            BlockKind::Full => state.append_full(out, curr),
            BlockKind::Run => state.append_run(),
            BlockKind::Diff => {
                let delta = pixel_delta(curr, state.prev);
                state.append_diff(out, curr, delta);
            }
        }

        if is_last {
            state.finish(out);
            return;
        }
    }
}

/// Validates `width`, `height`, `n_channels`, and that their product fits a `u32`.
fn validate_dimensions(width: u32, height: u32, n_channels: u8) -> Result<u32, EncodeError> {
    ensure!(
        width >= 1 && height >= 1 && (1..=4).contains(&n_channels),
        InvalidDimensionsSnafu {
            width,
            height,
            n_channels
        }
    );
    let pixel_count = (width as u64) * (height as u64) * (n_channels as u64);
    u32::try_from(pixel_count)
        .ok()
        .context(InvalidDimensionsSnafu {
            width,
            height,
            n_channels,
        })
}

/// Encodes a raw interleaved image into a BFG header + payload.
///
/// `pixels` must have exactly `width * height * n_channels` bytes, in the
/// row-major, channel-interleaved layout of spec §3.
pub fn encode_image(
    width: u32,
    height: u32,
    n_channels: u8,
    pixels: &[u8],
) -> Result<(ImageHeader, Vec<u8>), EncodeError> {
    let total_bytes = validate_dimensions(width, height, n_channels)?;
    ensure!(
        pixels.len() as u64 == total_bytes as u64,
        InvalidDimensionsSnafu {
            width,
            height,
            n_channels
        }
    );

    // Worst case: every pixel is its own FULL block of length 1 (one header
    // byte plus one literal byte per pixel).
    let worst_case = (total_bytes as usize).saturating_mul(2);
    let mut out = Vec::new();
    out.try_reserve_exact(worst_case)
        .ok()
        .context(AllocationFailureSnafu {
            requested_bytes: worst_case,
        })?;

    for channel in 0..n_channels as usize {
        let view = ChannelView {
            pixels,
            channel,
            n_channels: n_channels as usize,
        };
        encode_channel(&view, &mut out);
    }

    let header = ImageHeader {
        magic_tag: crate::MAGIC_TAG,
        version: crate::VERSION,
        width,
        height,
        n_bytes: out.len() as u32,
        n_channels,
        color_mode: 0,
    };

    Ok((header, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_image;

    fn roundtrip(width: u32, height: u32, n_channels: u8, pixels: &[u8]) {
        let (header, payload) = encode_image(width, height, n_channels, pixels).unwrap();
        assert_eq!(header.magic_tag, crate::MAGIC_TAG);
        assert_eq!(header.version, crate::VERSION);
        assert_eq!(header.width, width);
        assert_eq!(header.height, height);
        assert_eq!(header.n_channels, n_channels);
        assert_eq!(header.n_bytes as usize, payload.len());

        let decoded = decode_image(&header, &payload).unwrap();
        assert_eq!(decoded, pixels, "round-trip mismatch");

        assert!(payload.len() <= 2 * width as usize * height as usize * n_channels as usize);
    }

    #[test]
    fn single_gray_pixel() {
        roundtrip(1, 1, 1, &[42]);
    }

    #[test]
    fn run_of_five() {
        let pixels = [7u8, 7, 7, 7, 7];
        roundtrip(1, 5, 1, &pixels);
        let (_, payload) = encode_image(1, 5, 1, &pixels).unwrap();
        assert!(payload.len() <= 3);
    }

    #[test]
    fn gradient_in_diff_range() {
        let pixels = [10u8, 13, 16, 19, 22, 25, 28, 31];
        roundtrip(1, 8, 1, &pixels);
    }

    #[test]
    fn diff_continues_past_an_out_of_range_lookahead() {
        // At i=3 (curr=9, prev=6), Δ=3 is in range, so the DIFF block must
        // continue even though the *next* pixel's delta (100-9=91) isn't
        // startable from 9. Only the final 9->100 step forces a new block.
        let pixels = [0u8, 3, 6, 9, 100];
        roundtrip(1, 5, 1, &pixels);

        let (_, payload) = encode_image(1, 5, 1, &pixels).unwrap();
        let mut blocks = Vec::new();
        let mut idx = 0;
        while idx < payload.len() {
            let (tag, len) = crate::block::read_header(&payload, idx);
            let kind = BlockKind::from_tag(tag).unwrap();
            blocks.push((kind, len));
            idx += 1 + kind.payload_len(len);
        }
        assert_eq!(blocks, [(BlockKind::Diff, 4), (BlockKind::Full, 1)]);
    }

    #[test]
    fn delta_out_of_range_forces_full() {
        let pixels = [0u8, 100, 200];
        roundtrip(1, 3, 1, &pixels);
        let (_, payload) = encode_image(1, 3, 1, &pixels).unwrap();
        assert_eq!(payload.len(), 4);
    }

    #[test]
    fn two_channels_different_patterns() {
        let pixels = [0u8, 255, 0, 255, 0, 255, 0, 255];
        roundtrip(1, 4, 2, &pixels);
    }

    #[test]
    fn run_preference_property() {
        // A run of >= 2 identical pixels must include at least one RUN block.
        let pixels = [5u8; 10];
        let (_, payload) = encode_image(1, 10, 1, &pixels).unwrap();
        let mut has_run = false;
        let mut idx = 0;
        while idx < payload.len() {
            let (tag, len) = crate::block::read_header(&payload, idx);
            let kind = BlockKind::from_tag(tag).unwrap();
            if kind == BlockKind::Run {
                has_run = true;
            }
            idx += 1 + kind.payload_len(len);
        }
        assert!(has_run, "expected at least one RUN block");
    }

    #[test]
    fn rejects_invalid_dimensions() {
        assert!(encode_image(0, 1, 1, &[]).is_err());
        assert!(encode_image(1, 1, 0, &[1]).is_err());
        assert!(encode_image(1, 1, 5, &[1, 2, 3, 4, 5]).is_err());
    }

    #[test]
    fn diff_deltas_never_exceed_magnitude_seven() {
        let pixels: alloc::vec::Vec<u8> = (0..=255u16).map(|v| (v % 256) as u8).collect();
        let (_, payload) = encode_image(1, pixels.len() as u32, 1, &pixels).unwrap();
        let mut idx = 0;
        while idx < payload.len() {
            let (tag, len) = crate::block::read_header(&payload, idx);
            let kind = BlockKind::from_tag(tag).unwrap();
            if kind == BlockKind::Diff {
                let payload_bytes = &payload[idx + 1..idx + 1 + kind.payload_len(len)];
                for slot in 0..len {
                    let byte = payload_bytes[(slot * DIFF_BITS / 8) as usize];
                    let bit_offset = 4 - (slot * DIFF_BITS) % 8;
                    let nibble = (byte >> bit_offset) & 0b1111;
                    let delta = crate::block::decode_diff_nibble(nibble);
                    assert!((-7..=7).contains(&delta));
                }
            }
            idx += 1 + kind.payload_len(len);
        }
    }
}
