//! `std::io::Write`-based wrapper around [`super::encode_image`], used by
//! [`crate::container::write`] and directly by callers who already hold an
//! open writer.

use crate::error::ContainerError;
use crate::ImageHeader;
use std::io::Write;

/// Encodes `pixels` and writes the 19-byte header followed by the payload to `w`.
pub fn encode_to_writer<W: Write>(
    width: u32,
    height: u32,
    n_channels: u8,
    pixels: &[u8],
    mut w: W,
) -> Result<ImageHeader, ContainerError> {
    let (header, payload) = super::encode_image(width, height, n_channels, pixels)?;
    w.write_all(&header.to_bytes())
        .map_err(|source| ContainerError::Io { source })?;
    w.write_all(&payload)
        .map_err(|source| ContainerError::Io { source })?;
    Ok(header)
}
