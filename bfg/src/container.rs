//! File-backed container I/O (spec §6). Thin wrappers around
//! [`crate::encode_image`] and [`crate::decode_image`] that own the header
//! framing and file handles, so CLI and library callers don't have to.

use crate::error::{ContainerError, DecodeSnafu, EncodeSnafu, IoSnafu};
use crate::{decode_image, encode_image, ImageHeader, HEADER_LEN};
use snafu::ResultExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Encodes `pixels` and writes a complete BFG file to `path`.
pub fn write(
    path: impl AsRef<Path>,
    width: u32,
    height: u32,
    n_channels: u8,
    pixels: &[u8],
) -> Result<ImageHeader, ContainerError> {
    let (header, payload) = encode_image(width, height, n_channels, pixels).context(EncodeSnafu)?;
    let mut file = File::create(path).context(IoSnafu)?;
    file.write_all(&header.to_bytes()).context(IoSnafu)?;
    file.write_all(&payload).context(IoSnafu)?;
    Ok(header)
}

/// Reads a BFG file from `path` and decodes it into the interleaved raw
/// pixel array, alongside the header describing its dimensions.
pub fn read(path: impl AsRef<Path>) -> Result<(ImageHeader, Vec<u8>), ContainerError> {
    let mut file = File::open(path).context(IoSnafu)?;
    let mut raw = Vec::new();
    file.read_to_end(&mut raw).context(IoSnafu)?;

    let header_bytes: [u8; HEADER_LEN] =
        raw.get(..HEADER_LEN)
            .and_then(|s| s.try_into().ok())
            .ok_or(ContainerError::Decode {
                source: crate::error::DecodeError::Truncated {
                    expected: HEADER_LEN as u32,
                    actual: raw.len(),
                },
            })?;
    let header = ImageHeader::from_bytes(header_bytes);
    let payload = &raw[HEADER_LEN..];

    let pixels = decode_image(&header, payload).context(DecodeSnafu)?;
    Ok((header, pixels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_roundtrips() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("bfg-container-test-{:x}.bfg", 0x5eed_u32));
        let pixels = [0u8, 10, 20, 30, 255, 0, 1, 1];

        let written = write(&path, 2, 2, 2, &pixels).unwrap();
        let (read_header, decoded) = read(&path).unwrap();

        assert_eq!(written, read_header);
        assert_eq!(decoded, pixels);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn read_of_truncated_header_fails() {
        let dir = std::env::temp_dir();
        let path = dir.join("bfg-container-test-truncated.bfg");
        std::fs::write(&path, [0u8, 1, 2]).unwrap();

        let err = read(&path).unwrap_err();
        assert!(matches!(err, ContainerError::Decode { .. }));

        std::fs::remove_file(&path).unwrap();
    }
}
