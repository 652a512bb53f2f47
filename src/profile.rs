//! Color profile attached to an image.
//!
//! The core never interprets a profile. It only stores it, clones it into
//! images derived from the carrier, and hands it back to callers. An image
//! without a profile is treated as sRGB by [`crate::ImageFile::effective_color_profile`].

/// An immutable color-space descriptor.
///
/// Cloning copies the payload; two images never share a mutable profile.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColorProfile {
    source: ProfileSource,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum ProfileSource {
    Srgb,
    LinearSrgb,
    Icc(Box<[u8]>),
}

impl ColorProfile {
    /// The standard sRGB profile (IEC 61966-2-1).
    pub const fn srgb() -> Self {
        Self {
            source: ProfileSource::Srgb,
        }
    }

    /// sRGB primaries with a linear transfer curve.
    pub const fn linear_srgb() -> Self {
        Self {
            source: ProfileSource::LinearSrgb,
        }
    }

    /// Wrap an opaque profile payload (typically ICC bytes) supplied by an
    /// external component. The bytes are kept verbatim.
    pub fn from_icc(bytes: impl Into<Box<[u8]>>) -> Self {
        Self {
            source: ProfileSource::Icc(bytes.into()),
        }
    }

    /// Whether this is the named sRGB profile.
    pub fn is_srgb(&self) -> bool {
        matches!(self.source, ProfileSource::Srgb)
    }

    /// Whether this is the named linear sRGB profile.
    pub fn is_linear_srgb(&self) -> bool {
        matches!(self.source, ProfileSource::LinearSrgb)
    }

    /// The opaque payload, if this profile was built from bytes.
    pub fn icc_bytes(&self) -> Option<&[u8]> {
        match &self.source {
            ProfileSource::Icc(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl Default for ColorProfile {
    fn default() -> Self {
        Self::srgb()
    }
}
