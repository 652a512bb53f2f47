/// Pixel memory format of an [`crate::ImageFile`] buffer.
///
/// Channels are always stored in canonical R, G, B, A order. Multi-byte
/// samples (16-bit integer, 32-bit float) are native endian in memory.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Sentinel; never used for a live buffer.
    #[default]
    Unknown,
    /// 1 channel, 8-bit unsigned normalized.
    R8,
    /// 2 channels, 8-bit unsigned normalized.
    RG8,
    /// 3 channels, 8-bit unsigned normalized.
    RGB8,
    /// 4 channels, 8-bit unsigned normalized.
    RGBA8,
    /// 1 channel, 16-bit unsigned normalized.
    R16,
    /// 3 channels, 16-bit unsigned normalized.
    RGB16,
    /// 4 channels, 16-bit unsigned normalized.
    RGBA16,
    /// 1 channel, 32-bit float.
    R32F,
    /// 2 channels, 32-bit float.
    RG32F,
    /// 3 channels, 32-bit float.
    RGB32F,
    /// 4 channels, 32-bit float.
    RGBA32F,
}

/// How a channel's bits are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumericKind {
    /// Unsigned integer mapped to `[0, 1]` by dividing by the type maximum.
    UNorm,
    /// IEEE-754 float, used as-is.
    Float,
}

impl PixelFormat {
    /// Every concrete (non-`Unknown`) format.
    pub const ALL: [PixelFormat; 11] = [
        Self::R8,
        Self::RG8,
        Self::RGB8,
        Self::RGBA8,
        Self::R16,
        Self::RGB16,
        Self::RGBA16,
        Self::R32F,
        Self::RG32F,
        Self::RGB32F,
        Self::RGBA32F,
    ];

    /// Number of channels (0 for `Unknown`).
    pub const fn channel_count(self) -> usize {
        match self {
            Self::Unknown => 0,
            Self::R8 | Self::R16 | Self::R32F => 1,
            Self::RG8 | Self::RG32F => 2,
            Self::RGB8 | Self::RGB16 | Self::RGB32F => 3,
            Self::RGBA8 | Self::RGBA16 | Self::RGBA32F => 4,
        }
    }

    /// Bytes per single channel sample (0 for `Unknown`).
    pub const fn bytes_per_channel(self) -> usize {
        match self {
            Self::Unknown => 0,
            Self::R8 | Self::RG8 | Self::RGB8 | Self::RGBA8 => 1,
            Self::R16 | Self::RGB16 | Self::RGBA16 => 2,
            Self::R32F | Self::RG32F | Self::RGB32F | Self::RGBA32F => 4,
        }
    }

    /// Bytes per pixel (0 for `Unknown`).
    pub const fn bytes_per_pixel(self) -> usize {
        self.channel_count() * self.bytes_per_channel()
    }

    /// Whether samples are 32-bit floats.
    pub const fn is_float(self) -> bool {
        matches!(
            self,
            Self::R32F | Self::RG32F | Self::RGB32F | Self::RGBA32F
        )
    }

    /// Whether the format carries an alpha channel.
    pub const fn has_alpha(self) -> bool {
        self.channel_count() == 4
    }

    /// Numeric interpretation, or `None` for `Unknown`.
    pub const fn kind(self) -> Option<NumericKind> {
        match self {
            Self::Unknown => None,
            _ if self.is_float() => Some(NumericKind::Float),
            _ => Some(NumericKind::UNorm),
        }
    }

    /// Look up the format with the given shape.
    ///
    /// Returns `Unknown` for combinations this crate does not represent
    /// (e.g. two-channel 16-bit).
    pub const fn from_parts(channels: usize, bytes_per_channel: usize, float: bool) -> Self {
        match (channels, bytes_per_channel, float) {
            (1, 1, false) => Self::R8,
            (2, 1, false) => Self::RG8,
            (3, 1, false) => Self::RGB8,
            (4, 1, false) => Self::RGBA8,
            (1, 2, false) => Self::R16,
            (3, 2, false) => Self::RGB16,
            (4, 2, false) => Self::RGBA16,
            (1, 4, true) => Self::R32F,
            (2, 4, true) => Self::RG32F,
            (3, 4, true) => Self::RGB32F,
            (4, 4, true) => Self::RGBA32F,
            _ => Self::Unknown,
        }
    }

    /// Buffer length for an image of this format, or `None` on overflow.
    pub(crate) fn buffer_len(self, width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(self.bytes_per_pixel()))
    }
}

/// Typed pixel that can view an 8-bit [`crate::ImageFile`] buffer.
#[cfg(feature = "rgb")]
pub trait ImagePixel: Copy {
    /// The buffer format this pixel type reinterprets.
    fn format() -> PixelFormat;
}

#[cfg(feature = "rgb")]
impl ImagePixel for rgb::RGB8 {
    fn format() -> PixelFormat {
        PixelFormat::RGB8
    }
}

#[cfg(feature = "rgb")]
impl ImagePixel for rgb::RGBA8 {
    fn format() -> PixelFormat {
        PixelFormat::RGBA8
    }
}
