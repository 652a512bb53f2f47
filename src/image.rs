//! The owning image container and its load/save requests.

use crate::codec::{CodecRegistry, DecodedImage, EncodeInput, EncodeOptions};
use crate::convert;
use crate::dds::{self, SurfaceRef};
use crate::error::ImageError;
use crate::format::FileFormat;
use crate::limits::Limits;
use crate::pixel::PixelFormat;
use crate::profile::ColorProfile;

#[cfg(feature = "rgb")]
use rgb::AsPixels as _;

/// One 2D raster that owns its pixel buffer.
///
/// An `ImageFile` is either uninitialized (no buffer, zero dimensions) or
/// live: `width > 0`, `height > 0`, a concrete [`PixelFormat`], and a buffer
/// of exactly `width * height * format.bytes_per_pixel()` bytes. Rows are
/// packed top-down; samples are native endian.
///
/// `Clone` deep-copies the buffer and the color profile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageFile {
    width: u32,
    height: u32,
    format: PixelFormat,
    color_profile: Option<ColorProfile>,
    pixels: Vec<u8>,
    file_format: FileFormat,
}

fn allocate(format: PixelFormat, width: u32, height: u32) -> Result<Vec<u8>, ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidDimension { width, height });
    }
    if format == PixelFormat::Unknown {
        return Err(ImageError::UnsupportedFormat(
            "cannot allocate an Unknown pixel format".to_string(),
        ));
    }
    let too_large = || ImageError::DimensionsTooLarge { width, height };
    let len = format.buffer_len(width, height).ok_or_else(too_large)?;
    let mut pixels = Vec::new();
    pixels.try_reserve_exact(len).map_err(|_| too_large())?;
    pixels.resize(len, 0);
    Ok(pixels)
}

impl ImageFile {
    /// An uninitialized image.
    pub fn new() -> Self {
        Self::default()
    }

    /// A live, zero-filled image. See [`ImageFile::init`].
    pub fn blank(
        width: u32,
        height: u32,
        format: PixelFormat,
        color_profile: Option<ColorProfile>,
    ) -> Result<Self, ImageError> {
        let mut image = Self::new();
        image.init(width, height, format, color_profile)?;
        Ok(image)
    }

    /// Wrap an existing buffer. Its length must match the dimensions and
    /// format exactly.
    pub fn from_pixels(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Vec<u8>,
        color_profile: Option<ColorProfile>,
    ) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidDimension { width, height });
        }
        if format == PixelFormat::Unknown {
            return Err(ImageError::UnsupportedFormat(
                "Unknown pixel format".to_string(),
            ));
        }
        let needed = format
            .buffer_len(width, height)
            .ok_or(ImageError::DimensionsTooLarge { width, height })?;
        if pixels.len() < needed {
            return Err(ImageError::BufferTooSmall {
                needed,
                actual: pixels.len(),
            });
        }
        if pixels.len() > needed {
            return Err(ImageError::InvalidDimension { width, height });
        }
        Ok(Self {
            width,
            height,
            format,
            color_profile,
            pixels,
            file_format: FileFormat::Unknown,
        })
    }

    /// Import a platform bitmap: 32-bit B, G, R, A rows with `stride` bytes
    /// between row starts. The result is RGBA8.
    pub fn from_bgra8(
        width: u32,
        height: u32,
        stride: usize,
        bgra: &[u8],
        color_profile: Option<ColorProfile>,
    ) -> Result<Self, ImageError> {
        let mut pixels = allocate(PixelFormat::RGBA8, width, height)?;
        let row_bytes = width as usize * 4;
        if stride < row_bytes {
            return Err(ImageError::InvalidDimension { width, height });
        }
        let needed = stride
            .checked_mul(height as usize - 1)
            .and_then(|n| n.checked_add(row_bytes))
            .ok_or(ImageError::DimensionsTooLarge { width, height })?;
        if bgra.len() < needed {
            return Err(ImageError::BufferTooSmall {
                needed,
                actual: bgra.len(),
            });
        }
        for (dst, src) in pixels
            .chunks_exact_mut(row_bytes)
            .zip(bgra.chunks(stride))
        {
            for (d, s) in dst.chunks_exact_mut(4).zip(src[..row_bytes].chunks_exact(4)) {
                d.copy_from_slice(&[s[2], s[1], s[0], s[3]]);
            }
        }
        Ok(Self {
            width,
            height,
            format: PixelFormat::RGBA8,
            color_profile,
            pixels,
            file_format: FileFormat::Unknown,
        })
    }

    pub(crate) fn from_decoded(decoded: DecodedImage, file_format: FileFormat) -> Self {
        Self {
            width: decoded.width,
            height: decoded.height,
            format: decoded.format,
            color_profile: decoded.color_profile,
            pixels: decoded.pixels,
            file_format,
        }
    }

    /// Allocate a zero-filled buffer, replacing any previous content.
    ///
    /// On error the image is left unchanged.
    pub fn init(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        color_profile: Option<ColorProfile>,
    ) -> Result<(), ImageError> {
        let pixels = allocate(format, width, height)?;
        *self = Self {
            width,
            height,
            format,
            color_profile,
            pixels,
            file_format: FileFormat::Unknown,
        };
        Ok(())
    }

    /// Release the buffer and return to the uninitialized state.
    pub fn exit(&mut self) {
        *self = Self::default();
    }

    /// Decode `data`, replacing this image's content on success.
    ///
    /// Sniffed content wins over `declared`, which is only consulted when
    /// the bytes carry no recognizable signature. On error the image is left
    /// unchanged. Use [`LoadRequest`] for limits or a custom registry.
    pub fn load(&mut self, data: &[u8], declared: FileFormat) -> Result<(), ImageError> {
        *self = LoadRequest::new(data).with_format(declared).load()?;
        Ok(())
    }

    /// Encode into `format`. DDS is written uncompressed by this crate;
    /// everything else goes through [`CodecRegistry::builtin`].
    pub fn save(&self, format: FileFormat) -> Result<Vec<u8>, ImageError> {
        SaveRequest::new(format).save(self)
    }

    /// Fill this image with `source` converted to `target`, copying the
    /// source's color profile.
    pub fn convert_from(&mut self, source: &ImageFile, target: PixelFormat) -> Result<(), ImageError> {
        if !source.is_initialized() {
            return Err(ImageError::NotInitialized);
        }
        let pixels = convert::convert(&source.pixels, source.format, target)?;
        tracing::trace!(
            width = source.width,
            height = source.height,
            from = ?source.format,
            to = ?target,
            "converted image"
        );
        *self = Self {
            width: source.width,
            height: source.height,
            format: target,
            color_profile: source.color_profile.clone(),
            pixels,
            file_format: FileFormat::Unknown,
        };
        Ok(())
    }

    /// Advisory extension lookup. See [`FileFormat::from_extension`].
    pub fn get_file_type(file_name: &str) -> FileFormat {
        FileFormat::from_extension(file_name)
    }

    pub fn is_initialized(&self) -> bool {
        !self.pixels.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Whether the pixel format carries an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.format.has_alpha()
    }

    /// The format this image was loaded from, `Unknown` for images built in
    /// memory.
    pub fn file_format(&self) -> FileFormat {
        self.file_format
    }

    /// The attached profile, if any.
    pub fn color_profile(&self) -> Option<&ColorProfile> {
        self.color_profile.as_ref()
    }

    /// The attached profile, or sRGB when none is attached.
    pub fn effective_color_profile(&self) -> ColorProfile {
        self.color_profile.clone().unwrap_or_default()
    }

    pub fn set_color_profile(&mut self, profile: Option<ColorProfile>) {
        self.color_profile = profile;
    }

    /// Packed pixel bytes. Empty when uninitialized.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Take the buffer, leaving the image uninitialized.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Reinterpret an 8-bit RGB or RGBA buffer as typed pixels.
    ///
    /// Returns [`ImageError::UnsupportedConversion`] if the buffer format
    /// doesn't match `P`.
    #[cfg(feature = "rgb")]
    pub fn as_pixels<P: crate::ImagePixel>(&self) -> Result<&[P], ImageError>
    where
        [u8]: rgb::AsPixels<P>,
    {
        if self.format != P::format() {
            return Err(ImageError::UnsupportedConversion {
                from: self.format,
                to: P::format(),
            });
        }
        Ok(self.pixels.as_pixels())
    }

    /// Zero-copy [`imgref::ImgRef`] view of typed pixels.
    #[cfg(feature = "imgref")]
    pub fn as_imgref<P: crate::ImagePixel>(&self) -> Result<imgref::ImgRef<'_, P>, ImageError>
    where
        [u8]: rgb::AsPixels<P>,
    {
        let pixels: &[P] = self.as_pixels()?;
        Ok(imgref::ImgRef::new(
            pixels,
            self.width as usize,
            self.height as usize,
        ))
    }

    /// Copy into an [`imgref::ImgVec`] of typed pixels.
    #[cfg(feature = "imgref")]
    pub fn to_imgvec<P: crate::ImagePixel>(&self) -> Result<imgref::ImgVec<P>, ImageError>
    where
        [u8]: rgb::AsPixels<P>,
    {
        let pixels: &[P] = self.as_pixels()?;
        Ok(imgref::ImgVec::new(
            pixels.to_vec(),
            self.width as usize,
            self.height as usize,
        ))
    }

    pub(crate) fn surface(&self) -> SurfaceRef<'_> {
        SurfaceRef {
            width: self.width,
            height: self.height,
            format: self.format,
            pixels: &self.pixels,
            srgb: self.color_profile.as_ref().is_some_and(ColorProfile::is_srgb),
        }
    }
}

/// Resolve the format to decode `data` as.
fn resolve_format(data: &[u8], declared: FileFormat) -> Result<FileFormat, ImageError> {
    match (FileFormat::sniff(data), declared) {
        (FileFormat::Unknown, FileFormat::Unknown) => Err(ImageError::UnsupportedFormat(
            "unrecognized content and no declared format".to_string(),
        )),
        (FileFormat::Unknown, declared) => Ok(declared),
        (sniffed, declared) => {
            if declared != FileFormat::Unknown && declared != sniffed {
                tracing::debug!(%sniffed, %declared, "content signature overrides declared format");
            }
            Ok(sniffed)
        }
    }
}

/// Configurable decode of external bytes into an [`ImageFile`].
///
/// ```
/// use zenimagefile::{FileFormat, LoadRequest, Limits};
///
/// let ppm = b"P6\n2 1\n255\n\xff\x00\x00\x00\xff\x00";
/// let image = LoadRequest::new(ppm)
///     .with_limits(Limits { max_pixels: Some(1 << 20), ..Default::default() })
///     .load()?;
/// assert_eq!(image.file_format(), FileFormat::PpmRaw);
/// # Ok::<(), zenimagefile::ImageError>(())
/// ```
#[derive(Clone, Debug)]
pub struct LoadRequest<'a> {
    data: &'a [u8],
    declared: FileFormat,
    limits: Option<Limits>,
    registry: Option<&'a CodecRegistry>,
}

impl<'a> LoadRequest<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            declared: FileFormat::Unknown,
            limits: None,
            registry: None,
        }
    }

    /// Fallback format when the content has no recognizable signature.
    pub fn with_format(mut self, declared: FileFormat) -> Self {
        self.declared = declared;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Use `registry` instead of [`CodecRegistry::builtin`].
    pub fn with_registry(mut self, registry: &'a CodecRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Decode into a new live image.
    pub fn load(self) -> Result<ImageFile, ImageError> {
        let format = resolve_format(self.data, self.declared)?;
        tracing::debug!(%format, bytes = self.data.len(), "loading image");
        let limits = self.limits.as_ref();

        if format == FileFormat::Dds {
            let decoded = dds::decode_first_surface(self.data, limits)?;
            return Ok(ImageFile::from_decoded(decoded, format));
        }

        let registry = self.registry.unwrap_or_else(|| CodecRegistry::builtin());
        let codec = registry
            .get(format)
            .ok_or_else(|| ImageError::UnsupportedFormat(format!("no codec registered for {format}")))?;
        let decoded = codec.decode(self.data, format, limits).map_err(|e| match e {
            ImageError::Decode(_) | ImageError::LimitExceeded(_) => e,
            other => ImageError::Decode(other.to_string()),
        })?;
        decoded.validate()?;
        if let Some(limits) = limits {
            limits.check(decoded.width, decoded.height)?;
            limits.check_memory(decoded.pixels.len())?;
        }
        tracing::debug!(
            width = decoded.width,
            height = decoded.height,
            pixel_format = ?decoded.format,
            "decoded image"
        );
        Ok(ImageFile::from_decoded(decoded, format))
    }
}

/// Configurable encode of an [`ImageFile`] into a file format.
#[derive(Clone, Debug)]
pub struct SaveRequest<'a> {
    format: FileFormat,
    limits: Option<Limits>,
    registry: Option<&'a CodecRegistry>,
    options: EncodeOptions,
}

impl<'a> SaveRequest<'a> {
    pub fn new(format: FileFormat) -> Self {
        Self {
            format,
            limits: None,
            registry: None,
            options: EncodeOptions::default(),
        }
    }

    /// Reject images larger than `limits` before encoding.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Use `registry` instead of [`CodecRegistry::builtin`].
    pub fn with_registry(mut self, registry: &'a CodecRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Settings handed to the registered codec. Uncompressed DDS output
    /// has nothing to tune and ignores them.
    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn save(&self, image: &ImageFile) -> Result<Vec<u8>, ImageError> {
        if !image.is_initialized() {
            return Err(ImageError::NotInitialized);
        }
        if let Some(limits) = &self.limits {
            limits.check(image.width, image.height)?;
            limits.check_memory(image.pixels.len())?;
        }
        tracing::debug!(
            format = %self.format,
            width = image.width,
            height = image.height,
            pixel_format = ?image.format,
            "saving image"
        );

        if self.format == FileFormat::Dds {
            return dds::encode_uncompressed(&image.surface());
        }

        let registry = self.registry.unwrap_or_else(|| CodecRegistry::builtin());
        let codec = registry.get(self.format).ok_or_else(|| {
            ImageError::UnsupportedFormat(format!("no codec registered for {}", self.format))
        })?;
        let input = EncodeInput {
            width: image.width,
            height: image.height,
            format: image.format,
            pixels: &image.pixels,
            color_profile: image.color_profile.as_ref(),
            options: self.options,
        };
        codec.encode(&input, self.format).map_err(|e| match e {
            ImageError::Encode(_) => e,
            other => ImageError::Encode(other.to_string()),
        })
    }
}
