//! The decoder (spec §4.4): walks blocks per channel, dispatches by kind,
//! and reconstructs the interleaved raw pixel array.

use crate::block::{decode_diff_nibble, read_header, BlockKind, DIFF_BITS};
use crate::error::{
    AllocationFailureDecodeAllocFailSnafu, BadMagicSnafu, DecodeError, MalformedBlockSnafu,
    TruncatedSnafu, UnsupportedVersionSnafu,
};
use crate::ImageHeader;
use alloc::vec::Vec;
use snafu::{ensure, OptionExt};

/// Decodes a BFG header + payload back into the interleaved raw pixel array.
pub fn decode_image(header: &ImageHeader, payload: &[u8]) -> Result<Vec<u8>, DecodeError> {
    ensure!(
        header.magic_tag == crate::MAGIC_TAG,
        BadMagicSnafu {
            magic_tag: header.magic_tag
        }
    );
    ensure!(
        header.version == crate::VERSION,
        UnsupportedVersionSnafu {
            version: header.version
        }
    );
    ensure!(
        payload.len() >= header.n_bytes as usize,
        TruncatedSnafu {
            expected: header.n_bytes,
            actual: payload.len(),
        }
    );
    let payload = &payload[..header.n_bytes as usize];

    let n_channels = header.n_channels as usize;
    // width/height/n_channels come straight from an untrusted header, so the
    // output buffer's size must be derived with checked arithmetic and
    // allocated fallibly rather than trusted to fit a `Vec::with_capacity`.
    let pixels_per_channel = (header.width as usize)
        .checked_mul(header.height as usize)
        .context(MalformedBlockSnafu {
            reason: "width * height overflows usize",
        })?;
    let total_bytes = pixels_per_channel
        .checked_mul(n_channels)
        .context(MalformedBlockSnafu {
            reason: "width * height * n_channels overflows usize",
        })?;

    let mut out = Vec::new();
    out.try_reserve_exact(total_bytes)
        .ok()
        .context(AllocationFailureDecodeAllocFailSnafu {
            requested_bytes: total_bytes,
        })?;
    out.resize(total_bytes, 0);

    let mut idx = 0usize;
    for channel in 0..n_channels {
        let mut prev = 0u8;
        let mut px_count = 0usize;

        while px_count < pixels_per_channel {
            ensure!(
                idx < payload.len(),
                MalformedBlockSnafu {
                    reason: "unexpected end of channel block stream"
                }
            );
            let (tag, length) = read_header(payload, idx);
            let kind = BlockKind::from_tag(tag).context(MalformedBlockSnafu {
                reason: "reserved block tag",
            })?;
            idx += 1;

            let payload_len = kind.payload_len(length);
            ensure!(
                idx + payload_len <= payload.len(),
                MalformedBlockSnafu {
                    reason: "block payload overruns remaining bytes"
                }
            );
            ensure!(
                px_count + length as usize <= pixels_per_channel,
                MalformedBlockSnafu {
                    reason: "block overruns channel pixel count"
                }
            );

            match kind {
                BlockKind::Full => {
                    let bytes = &payload[idx..idx + payload_len];
                    for (i, &byte) in bytes.iter().enumerate() {
                        out[(px_count + i) * n_channels + channel] = byte;
                    }
                    prev = bytes[bytes.len() - 1];
                }
                BlockKind::Run => {
                    for i in 0..length as usize {
                        out[(px_count + i) * n_channels + channel] = prev;
                    }
                }
                BlockKind::Diff => {
                    let bytes = &payload[idx..idx + payload_len];
                    for slot in 0..length {
                        let byte = bytes[(slot * DIFF_BITS / 8) as usize];
                        let is_high_nibble = slot % 2 == 0;
                        let bit_offset = if is_high_nibble { 4 } else { 0 };
                        let nibble = (byte >> bit_offset) & 0b1111;
                        let delta = decode_diff_nibble(nibble);
                        prev = prev.wrapping_add(delta as u8);
                        out[(px_count + slot as usize) * n_channels + channel] = prev;
                    }
                }
            }

            idx += payload_len;
            px_count += length as usize;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_image;

    #[test]
    fn bad_magic_is_rejected() {
        let header = ImageHeader {
            magic_tag: 0xDEAD_BEEF,
            version: crate::VERSION,
            width: 1,
            height: 1,
            n_bytes: 2,
            n_channels: 1,
            color_mode: 0,
        };
        let err = decode_image(&header, &[0, 42]).unwrap_err();
        assert!(matches!(err, DecodeError::BadMagic { .. }));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let header = ImageHeader {
            magic_tag: crate::MAGIC_TAG,
            version: 99,
            width: 1,
            height: 1,
            n_bytes: 2,
            n_channels: 1,
            color_mode: 0,
        };
        let err = decode_image(&header, &[0, 42]).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedVersion { .. }));
    }

    #[test]
    fn reserved_tag_is_malformed() {
        let (mut header, _) = encode_image(1, 1, 1, &[1]).unwrap();
        // Tag 7 (0b111) in the top 3 bits is reserved.
        let payload = [0b1110_0000u8];
        header.n_bytes = 1;
        let err = decode_image(&header, &payload).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedBlock { .. }));
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let (mut header, payload) = encode_image(1, 5, 1, &[1, 1, 1, 1, 1]).unwrap();
        header.n_bytes = payload.len() as u32 + 10;
        let err = decode_image(&header, &payload).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
    }

    #[test]
    fn oversized_dimensions_are_rejected_without_allocating() {
        // A header claiming a huge image but only a tiny payload must be
        // rejected as malformed rather than driving an overflowing or
        // unbounded allocation from untrusted width/height/n_channels.
        let header = ImageHeader {
            magic_tag: crate::MAGIC_TAG,
            version: crate::VERSION,
            width: u32::MAX,
            height: u32::MAX,
            n_bytes: 2,
            n_channels: 4,
            color_mode: 0,
        };
        let err = decode_image(&header, &[0, 42]).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedBlock { .. }));
    }
}
