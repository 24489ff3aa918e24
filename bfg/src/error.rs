//! Error taxonomy for the core codec (spec §7).

use snafu::Snafu;

/// Errors the encoder can surface.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EncodeError {
    /// `width`/`height` is zero, `n_channels` is outside `1..=4`, or
    /// `width * height * n_channels` doesn't fit in a `u32`.
    #[snafu(display(
        "invalid image dimensions: {width}x{height}x{n_channels} channels"
    ))]
    InvalidDimensions {
        width: u32,
        height: u32,
        n_channels: u8,
    },

    /// The worst-case output buffer could not be allocated.
    #[snafu(display("failed to allocate {requested_bytes} bytes for the encoded payload"))]
    AllocationFailure { requested_bytes: usize },
}

/// Errors the decoder can surface.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DecodeError {
    /// Container header `magic_tag` did not match `0xBFBFBFBF`.
    #[snafu(display("bad magic tag: {magic_tag:#010x}"))]
    BadMagic { magic_tag: u32 },

    /// Container header `version` is not a version this decoder understands.
    #[snafu(display("unsupported container version: {version}"))]
    UnsupportedVersion { version: u8 },

    /// A block header carried a reserved tag, its declared length would
    /// overrun the remaining payload, or the decoded pixel count for a
    /// channel didn't land exactly on `width * height`.
    #[snafu(display("malformed block: {reason}"))]
    MalformedBlock { reason: &'static str },

    /// Fewer payload bytes were supplied than the header's `n_bytes` promised.
    #[snafu(display("truncated payload: expected {expected} bytes, got {actual}"))]
    Truncated { expected: u32, actual: usize },

    /// The header's `width * height * n_channels` overflows `usize`, or the
    /// resulting output buffer could not be allocated.
    #[snafu(display("failed to allocate {requested_bytes} bytes for the decoded image"))]
    #[snafu(context(suffix(DecodeAllocFailSnafu)))]
    AllocationFailure { requested_bytes: usize },
}

/// Errors surfaced by the file-backed container API (`std` feature only).
#[cfg(feature = "std")]
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ContainerError {
    #[snafu(display("container I/O error"))]
    Io { source: std::io::Error },

    #[snafu(display("{source}"))]
    Encode { source: EncodeError },

    #[snafu(display("{source}"))]
    Decode { source: DecodeError },
}

#[cfg(feature = "std")]
impl From<EncodeError> for ContainerError {
    fn from(source: EncodeError) -> Self {
        ContainerError::Encode { source }
    }
}

#[cfg(feature = "std")]
impl From<DecodeError> for ContainerError {
    fn from(source: DecodeError) -> Self {
        ContainerError::Decode { source }
    }
}
