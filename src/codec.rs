//! Boundary to bit-stream codecs for non-DDS file formats.
//!
//! The core does not parse PNG, JPEG and friends. It hands bytes to an
//! [`ImageCodec`] looked up by [`FileFormat`] in a [`CodecRegistry`] and
//! validates what comes back before it becomes an [`crate::ImageFile`].
//!
//! ```
//! use zenimagefile::{CodecRegistry, FileFormat};
//!
//! let registry = CodecRegistry::builtin();
//! assert!(!registry.supports(FileFormat::Jpeg));
//! assert!(!registry.supports(FileFormat::Dds));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::ImageError;
use crate::format::FileFormat;
use crate::limits::Limits;
use crate::pixel::PixelFormat;
use crate::profile::ColorProfile;

/// Pixels produced by a codec.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Packed rows, canonical channel order, native-endian samples.
    pub pixels: Vec<u8>,
    pub color_profile: Option<ColorProfile>,
}

impl DecodedImage {
    /// Check the buffer-size invariant.
    pub(crate) fn validate(&self) -> Result<(), ImageError> {
        if self.width == 0 || self.height == 0 {
            return Err(ImageError::Decode(format!(
                "codec produced empty image {}x{}",
                self.width, self.height
            )));
        }
        if self.format == PixelFormat::Unknown {
            return Err(ImageError::Decode(
                "codec produced an unknown pixel format".into(),
            ));
        }
        let expected = self
            .format
            .buffer_len(self.width, self.height)
            .ok_or(ImageError::DimensionsTooLarge {
                width: self.width,
                height: self.height,
            })?;
        if self.pixels.len() != expected {
            return Err(ImageError::Decode(format!(
                "codec produced {} bytes for {}x{} {:?}, expected {expected}",
                self.pixels.len(),
                self.width,
                self.height,
                self.format
            )));
        }
        Ok(())
    }
}

/// Encoder settings passed through to the codec untouched.
///
/// The core never interprets these. Codecs read the fields they understand
/// and ignore the rest.
///
/// ```
/// use zenimagefile::EncodeOptions;
///
/// let options = EncodeOptions::new().with_quality(85).with_effort(6);
/// assert_eq!(options.quality, Some(85));
/// assert!(!options.lossless);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct EncodeOptions {
    /// Lossy quality, 0 (smallest) to 100 (best).
    pub quality: Option<u8>,
    /// Speed/size trade-off, codec-defined scale.
    pub effort: Option<u8>,
    /// Prefer a lossless mode where the format has one.
    pub lossless: bool,
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values above 100 are clamped.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality.min(100));
        self
    }

    pub fn with_effort(mut self, effort: u8) -> Self {
        self.effort = Some(effort);
        self
    }

    pub fn with_lossless(mut self, lossless: bool) -> Self {
        self.lossless = lossless;
        self
    }
}

/// Borrowed view of an image handed to a codec for encoding.
#[derive(Clone, Copy, Debug)]
pub struct EncodeInput<'a> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: &'a [u8],
    pub color_profile: Option<&'a ColorProfile>,
    pub options: EncodeOptions,
}

/// A bit-stream codec for one or more file formats.
pub trait ImageCodec: Send + Sync {
    /// Decode `data`, already identified as `format`.
    fn decode(
        &self,
        data: &[u8],
        format: FileFormat,
        limits: Option<&Limits>,
    ) -> Result<DecodedImage, ImageError>;

    /// Encode pixels as `format`.
    fn encode(&self, image: &EncodeInput<'_>, format: FileFormat) -> Result<Vec<u8>, ImageError>;
}

/// Dispatch table from file format to codec.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<FileFormat, Arc<dyn ImageCodec>>,
}

impl CodecRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry holding the codecs compiled into this crate.
    ///
    /// Built on first use and never mutated afterwards.
    pub fn builtin() -> &'static CodecRegistry {
        static BUILTIN: OnceLock<CodecRegistry> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            #[allow(unused_mut)]
            let mut registry = CodecRegistry::new();
            #[cfg(feature = "pnm")]
            {
                let pnm: Arc<dyn ImageCodec> = Arc::new(crate::pnm::PnmCodec);
                for format in crate::pnm::FORMATS {
                    registry.register(format, Arc::clone(&pnm));
                }
            }
            #[cfg(feature = "bmp")]
            registry.register(FileFormat::Bmp, Arc::new(crate::bmp::BmpCodec));
            tracing::debug!(formats = registry.codecs.len(), "built-in codec registry ready");
            registry
        })
    }

    /// Register `codec` for `format`, replacing any previous entry.
    ///
    /// DDS is handled in-crate and cannot be overridden here.
    pub fn register(&mut self, format: FileFormat, codec: Arc<dyn ImageCodec>) {
        if matches!(format, FileFormat::Unknown | FileFormat::Dds) {
            tracing::warn!(%format, "ignoring codec registration");
            return;
        }
        self.codecs.insert(format, codec);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, format: FileFormat, codec: Arc<dyn ImageCodec>) -> Self {
        self.register(format, codec);
        self
    }

    /// Codec for `format`, if one is registered.
    pub fn get(&self, format: FileFormat) -> Option<&Arc<dyn ImageCodec>> {
        self.codecs.get(&format)
    }

    pub fn supports(&self, format: FileFormat) -> bool {
        self.codecs.contains_key(&format)
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats: Vec<_> = self.codecs.keys().copied().collect();
        formats.sort_by_key(|f| f.code());
        f.debug_struct("CodecRegistry")
            .field("formats", &formats)
            .finish()
    }
}
