use crate::dds::CompressionType;
use crate::pixel::PixelFormat;

/// Errors from image construction, conversion, codec dispatch and DDS handling.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ImageError {
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("no conversion from {from:?} to {to:?}")]
    UnsupportedConversion { from: PixelFormat, to: PixelFormat },

    #[error("{format:?} is not channel-compatible with {compression:?}")]
    IncompatiblePixelFormat {
        format: PixelFormat,
        compression: CompressionType,
    },

    #[error("inconsistent cube faces or volume slices: {0}")]
    InconsistentCubeFaces(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("encode failed: {0}")]
    Encode(String),

    /// A container header that is structurally invalid.
    #[error("malformed container: {0}")]
    MalformedContainer(String),

    #[error("image is not initialized")]
    NotInitialized,

    #[error("dimensions too large: {width}x{height}")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// Input ended before the header or payload it declares. Truncated
    /// containers report this rather than [`ImageError::MalformedContainer`].
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
