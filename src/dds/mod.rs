//! DDS texture containers with BC4/BC5/BC6H/BC7 block compression.
//!
//! Writing supports uncompressed surfaces in every [`PixelFormat`] plus the
//! four block codecs, for single images, cube maps and volume textures.
//! Reading additionally accepts BC1/BC2/BC3, half-float and BGRA/BGRX
//! payloads, legacy (FourCC/bitmask) headers, and files with mip chains
//! (only the top level is decoded).
//!
//! Block order is row-major. Edge blocks are padded by repeating the last
//! row/column; decoding discards the padding using the header dimensions.
//!
//! ```
//! use zenimagefile::{ImageFile, PixelFormat};
//! use zenimagefile::dds::{self, CompressionType};
//!
//! let image = ImageFile::from_pixels(5, 5, PixelFormat::R8, vec![128; 25], None)?;
//! let blob = dds::compress(&image, CompressionType::Bc4)?;
//! let back = dds::decompress(&blob)?;
//! assert_eq!((back.width(), back.height()), (5, 5));
//! # Ok::<(), zenimagefile::ImageError>(())
//! ```

mod bc1;
mod bc4;
mod bc6h;
mod bc7;
mod bits;
mod fit;
mod header;

use std::io::Write;
use std::ops::Range;

use crate::codec::DecodedImage;
use crate::convert;
use crate::error::ImageError;
use crate::format::FileFormat;
use crate::image::ImageFile;
use crate::limits::{Limits, check_surface};
use crate::pixel::PixelFormat;
use crate::profile::ColorProfile;

use header::{DdsHeader, HeaderSpec, Layout, SurfaceFormat, write_header};

/// Block codec applied by [`compress`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompressionType {
    /// Raw surface in the image's own pixel format.
    #[default]
    None,
    /// One channel, 8 bytes per block.
    Bc4,
    /// Two channels, 16 bytes per block.
    Bc5,
    /// Unsigned half-float RGB, 16 bytes per block.
    Bc6h,
    /// RGBA, 16 bytes per block.
    Bc7,
}

impl CompressionType {
    /// Whether an image in `format` can be compressed without converting
    /// it first.
    pub const fn accepts(self, format: PixelFormat) -> bool {
        match self {
            Self::None => format.channel_count() > 0,
            Self::Bc4 => format.channel_count() == 1,
            Self::Bc5 => format.channel_count() == 2,
            Self::Bc6h | Self::Bc7 => matches!(format.channel_count(), 3 | 4),
        }
    }
}

/// Borrowed view of one surface to encode.
#[derive(Clone, Copy)]
pub(crate) struct SurfaceRef<'a> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: &'a [u8],
    pub srgb: bool,
}

impl<'a> SurfaceRef<'a> {
    fn of(image: &'a ImageFile) -> Result<Self, ImageError> {
        if !image.is_initialized() {
            return Err(ImageError::NotInitialized);
        }
        Ok(image.surface())
    }
}

/// Swap each multi-byte sample between native and little-endian order.
/// A no-op on little-endian hosts.
fn reorder_samples(buf: &mut [u8], bytes_per_sample: usize) {
    if cfg!(target_endian = "big") && bytes_per_sample > 1 {
        buf.chunks_exact_mut(bytes_per_sample)
            .for_each(<[u8]>::reverse);
    }
}

// ── Encoding ────────────────────────────────────────────────────────────

fn encode_raw(surface: &SurfaceRef<'_>) -> Result<(SurfaceFormat, Vec<u8>), ImageError> {
    match surface.format {
        PixelFormat::Unknown => Err(ImageError::UnsupportedFormat(
            "cannot store an Unknown pixel format".to_string(),
        )),
        PixelFormat::RGB16 => {
            // no RGB16 surface format exists; pad to RGBA16 with opaque alpha
            let mut out = Vec::with_capacity(surface.pixels.len() / 6 * 8);
            for px in surface.pixels.chunks_exact(6) {
                out.extend_from_slice(px);
                out.extend_from_slice(&u16::MAX.to_ne_bytes());
            }
            reorder_samples(&mut out, 2);
            Ok((SurfaceFormat::Rgb16Tagged, out))
        }
        format => {
            let mut out = surface.pixels.to_vec();
            reorder_samples(&mut out, format.bytes_per_channel());
            Ok((SurfaceFormat::Plain(format), out))
        }
    }
}

/// Split `texels` into 4x4 blocks, clamping reads at the right and bottom
/// edges, and concatenate the encoded blocks.
fn encode_blocks<T: Copy, const B: usize>(
    texels: &[T],
    width: usize,
    height: usize,
    encode: impl Fn(&[T; 16]) -> [u8; B],
) -> Vec<u8> {
    let (blocks_x, blocks_y) = (width.div_ceil(4), height.div_ceil(4));
    let mut out = Vec::with_capacity(blocks_x * blocks_y * B);
    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            let block = core::array::from_fn(|i| {
                let x = (bx * 4 + i % 4).min(width - 1);
                let y = (by * 4 + i / 4).min(height - 1);
                texels[y * width + x]
            });
            out.extend_from_slice(&encode(&block));
        }
    }
    out
}

fn encode_surface(
    surface: &SurfaceRef<'_>,
    compression: CompressionType,
) -> Result<(SurfaceFormat, Vec<u8>), ImageError> {
    let SurfaceRef {
        width,
        height,
        format,
        pixels,
        ..
    } = *surface;
    if !compression.accepts(format) {
        return Err(ImageError::IncompatiblePixelFormat {
            format,
            compression,
        });
    }
    let (w, h) = (width as usize, height as usize);
    let encoded = match compression {
        CompressionType::None => return encode_raw(surface),
        CompressionType::Bc4 => {
            let texels = convert::convert(pixels, format, PixelFormat::R8)?;
            (SurfaceFormat::Bc4, encode_blocks(&texels, w, h, bc4::encode_block))
        }
        CompressionType::Bc5 => {
            let rg = convert::convert(pixels, format, PixelFormat::RG8)?;
            let texels: Vec<[u8; 2]> = rg.chunks_exact(2).map(|c| [c[0], c[1]]).collect();
            (
                SurfaceFormat::Bc5,
                encode_blocks(&texels, w, h, bc4::encode_bc5_block),
            )
        }
        CompressionType::Bc6h => {
            let texels: Vec<[f32; 3]> = pixels
                .chunks_exact(format.bytes_per_pixel())
                .map(|px| {
                    let [r, g, b, _] = convert::load_pixel(px, format);
                    [r, g, b]
                })
                .collect();
            (
                SurfaceFormat::Bc6h { signed: false },
                encode_blocks(&texels, w, h, bc6h::encode_block),
            )
        }
        CompressionType::Bc7 => {
            let rgba = convert::convert(pixels, format, PixelFormat::RGBA8)?;
            let texels: Vec<[u8; 4]> = rgba
                .chunks_exact(4)
                .map(|c| [c[0], c[1], c[2], c[3]])
                .collect();
            (SurfaceFormat::Bc7, encode_blocks(&texels, w, h, bc7::encode_block))
        }
    };
    tracing::trace!(
        width,
        height,
        ?compression,
        bytes = encoded.1.len(),
        "encoded DDS surface"
    );
    Ok(encoded)
}

/// Header plus concatenated payloads. Every surface has the same format.
fn assemble(
    first: &SurfaceRef<'_>,
    surfaces: Vec<(SurfaceFormat, Vec<u8>)>,
    layout: Layout,
) -> Result<Vec<u8>, ImageError> {
    let Some(&(format, _)) = surfaces.first() else {
        return Err(ImageError::Encode("no surfaces to write".to_string()));
    };
    let payload: usize = surfaces.iter().map(|(_, p)| p.len()).sum();
    let mut out = Vec::with_capacity(4 + header::HEADER_SIZE + header::DX10_SIZE + payload);
    write_header(
        &HeaderSpec {
            width: first.width,
            height: first.height,
            format,
            srgb: first.srgb,
            layout,
        },
        &mut out,
    );
    for (_, p) in &surfaces {
        out.extend_from_slice(p);
    }
    Ok(out)
}

/// Uncompressed single-surface DDS, used by [`ImageFile::save`].
pub(crate) fn encode_uncompressed(surface: &SurfaceRef<'_>) -> Result<Vec<u8>, ImageError> {
    let encoded = encode_raw(surface)?;
    assemble(surface, vec![encoded], Layout::Texture2D)
}

/// Compress `image` into a complete DDS blob.
///
/// The image format must already be channel-compatible with `compression`
/// (see [`CompressionType::accepts`]); otherwise this fails with
/// [`ImageError::IncompatiblePixelFormat`]. Convert first with
/// [`ImageFile::convert_from`].
pub fn compress(image: &ImageFile, compression: CompressionType) -> Result<Vec<u8>, ImageError> {
    let surface = SurfaceRef::of(image)?;
    tracing::debug!(
        width = surface.width,
        height = surface.height,
        format = ?surface.format,
        ?compression,
        "compressing DDS"
    );
    let encoded = encode_surface(&surface, compression)?;
    assemble(&surface, vec![encoded], Layout::Texture2D)
}

/// Validate that `images` share dimensions and format.
fn consistent_surfaces<'a>(
    images: &'a [ImageFile],
    what: &str,
) -> Result<Vec<SurfaceRef<'a>>, ImageError> {
    let surfaces = images
        .iter()
        .map(SurfaceRef::of)
        .collect::<Result<Vec<_>, _>>()?;
    let Some(first) = surfaces.first() else {
        return Err(ImageError::InconsistentCubeFaces(format!("no {what}s")));
    };
    for (i, s) in surfaces.iter().enumerate().skip(1) {
        if (s.width, s.height, s.format) != (first.width, first.height, first.format) {
            return Err(ImageError::InconsistentCubeFaces(format!(
                "{what} {i} is {}x{} {:?}, {what} 0 is {}x{} {:?}",
                s.width, s.height, s.format, first.width, first.height, first.format
            )));
        }
    }
    Ok(surfaces)
}

fn multi_surface_blob(
    surfaces: &[SurfaceRef<'_>],
    compress_bc6h: bool,
    layout: Layout,
) -> Result<Vec<u8>, ImageError> {
    let compression = if compress_bc6h {
        CompressionType::Bc6h
    } else {
        CompressionType::None
    };
    let encoded = surfaces
        .iter()
        .map(|s| encode_surface(s, compression))
        .collect::<Result<Vec<_>, _>>()?;
    assemble(&surfaces[0], encoded, layout)
}

/// Build a cube-map DDS from six faces in +X, -X, +Y, -Y, +Z, -Z order.
///
/// All faces must share width, height and pixel format. With
/// `compress_bc6h` the faces (3 or 4 channels) are BC6H-compressed;
/// otherwise they are stored raw.
pub fn save_cube_map(faces: &[ImageFile], compress_bc6h: bool) -> Result<Vec<u8>, ImageError> {
    if faces.len() != 6 {
        return Err(ImageError::InconsistentCubeFaces(format!(
            "a cube map needs 6 faces, got {}",
            faces.len()
        )));
    }
    let surfaces = consistent_surfaces(faces, "face")?;
    tracing::debug!(
        width = surfaces[0].width,
        height = surfaces[0].height,
        format = ?surfaces[0].format,
        compress_bc6h,
        "saving DDS cube map"
    );
    multi_surface_blob(&surfaces, compress_bc6h, Layout::Cube)
}

/// [`save_cube_map`] into a sink. Nothing is written unless the whole blob
/// was built.
pub fn write_cube_map<W: Write>(
    faces: &[ImageFile],
    compress_bc6h: bool,
    sink: &mut W,
) -> Result<(), ImageError> {
    let blob = save_cube_map(faces, compress_bc6h)?;
    sink.write_all(&blob)?;
    Ok(())
}

/// Build a volume-texture DDS from slices ordered front to back.
///
/// The depth recorded in the header is `slices.len()`.
pub fn save_volume_texture(
    slices: &[ImageFile],
    compress_bc6h: bool,
) -> Result<Vec<u8>, ImageError> {
    let surfaces = consistent_surfaces(slices, "slice")?;
    let depth = u32::try_from(surfaces.len())
        .map_err(|_| ImageError::InconsistentCubeFaces("too many slices".to_string()))?;
    tracing::debug!(
        width = surfaces[0].width,
        height = surfaces[0].height,
        depth,
        compress_bc6h,
        "saving DDS volume texture"
    );
    multi_surface_blob(&surfaces, compress_bc6h, Layout::Volume { depth })
}

/// [`save_volume_texture`] into a sink. Nothing is written unless the whole
/// blob was built.
pub fn write_volume_texture<W: Write>(
    slices: &[ImageFile],
    compress_bc6h: bool,
    sink: &mut W,
) -> Result<(), ImageError> {
    let blob = save_volume_texture(slices, compress_bc6h)?;
    sink.write_all(&blob)?;
    Ok(())
}

/// Write an already-encoded DDS blob to a sink after validating its header
/// and payload length.
pub fn save_from_memory<W: Write>(blob: &[u8], sink: &mut W) -> Result<(), ImageError> {
    let header = DdsHeader::parse(blob)?;
    header.check_payload(blob)?;
    sink.write_all(blob)?;
    Ok(())
}

// ── Decoding ────────────────────────────────────────────────────────────

/// Decode consecutive 4x4 blocks into a `width` x `height` texel grid,
/// dropping texels that fall outside it.
fn decode_blocks<T: Copy + Default, const B: usize>(
    data: &[u8],
    width: usize,
    height: usize,
    decode: impl Fn(&[u8; B]) -> [T; 16],
) -> Vec<T> {
    let blocks_x = width.div_ceil(4);
    let mut out = vec![T::default(); width * height];
    for (i, chunk) in data.chunks_exact(B).enumerate() {
        let mut block = [0u8; B];
        block.copy_from_slice(chunk);
        let (bx, by) = (i % blocks_x, i / blocks_x);
        for (t, texel) in decode(&block).into_iter().enumerate() {
            let (x, y) = (bx * 4 + t % 4, by * 4 + t / 4);
            if x < width && y < height {
                out[y * width + x] = texel;
            }
        }
    }
    out
}

fn flatten<const N: usize>(texels: Vec<[u8; N]>) -> Vec<u8> {
    texels.into_iter().flatten().collect()
}

/// Turn one on-disk surface into native-endian pixels in
/// `format.output_format()`. `data` is exactly one surface long.
fn decode_surface(format: SurfaceFormat, data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    match format {
        SurfaceFormat::Plain(f) => {
            let mut out = data.to_vec();
            reorder_samples(&mut out, f.bytes_per_channel());
            out
        }
        SurfaceFormat::Rgb16Tagged => {
            let mut out: Vec<u8> = data
                .chunks_exact(8)
                .flat_map(|px| px[..6].iter().copied())
                .collect();
            reorder_samples(&mut out, 2);
            out
        }
        SurfaceFormat::Bgra8 { alpha } => data
            .chunks_exact(4)
            .flat_map(|px| [px[2], px[1], px[0], if alpha { px[3] } else { 255 }])
            .collect(),
        SurfaceFormat::Bgr8 => data
            .chunks_exact(3)
            .flat_map(|px| [px[2], px[1], px[0]])
            .collect(),
        SurfaceFormat::Half(_) => data
            .chunks_exact(2)
            .flat_map(|s| {
                half::f16::from_bits(u16::from_le_bytes([s[0], s[1]]))
                    .to_f32()
                    .to_ne_bytes()
            })
            .collect(),
        SurfaceFormat::Bc1 => flatten(decode_blocks(data, w, h, bc1::decode_bc1_block)),
        SurfaceFormat::Bc2 => flatten(decode_blocks(data, w, h, bc1::decode_bc2_block)),
        SurfaceFormat::Bc3 => flatten(decode_blocks(data, w, h, bc1::decode_bc3_block)),
        SurfaceFormat::Bc4 => decode_blocks(data, w, h, bc4::decode_block),
        SurfaceFormat::Bc5 => flatten(decode_blocks(data, w, h, bc4::decode_bc5_block)),
        SurfaceFormat::Bc6h { signed } => {
            decode_blocks(data, w, h, |b: &[u8; bc6h::BLOCK_BYTES]| {
                bc6h::decode_block(b, signed)
            })
            .into_iter()
            .flat_map(|[r, g, b]| [r, g, b, 1.0])
            .flat_map(f32::to_ne_bytes)
            .collect()
        }
        SurfaceFormat::Bc7 => flatten(decode_blocks(data, w, h, bc7::decode_block)),
    }
}

fn decode_range(
    header: &DdsHeader,
    data: &[u8],
    range: Range<usize>,
    limits: Option<&Limits>,
) -> Result<DecodedImage, ImageError> {
    let format = header.format.output_format();
    let out_len = format
        .buffer_len(header.width, header.height)
        .ok_or(ImageError::DimensionsTooLarge {
            width: header.width,
            height: header.height,
        })?;
    check_surface(limits, header.width, header.height, out_len)?;
    tracing::trace!(
        width = header.width,
        height = header.height,
        surface = ?header.format,
        offset = range.start,
        "decoding DDS surface"
    );
    let pixels = decode_surface(header.format, &data[range], header.width, header.height);
    Ok(DecodedImage {
        width: header.width,
        height: header.height,
        format,
        pixels,
        color_profile: header.srgb.then(ColorProfile::srgb),
    })
}

/// Parse the header, bounds-check the payload, and decode the selected
/// top-level surfaces.
fn decode_surfaces(
    blob: &[u8],
    limits: Option<&Limits>,
    select: impl Fn(&DdsHeader, Vec<Range<usize>>) -> Result<Vec<Range<usize>>, ImageError>,
) -> Result<(DdsHeader, Vec<ImageFile>), ImageError> {
    let header = DdsHeader::parse(blob)?;
    let ranges = select(&header, header.check_payload(blob)?)?;
    let images = ranges
        .into_iter()
        .map(|range| {
            decode_range(&header, blob, range, limits)
                .map(|d| ImageFile::from_decoded(d, FileFormat::Dds))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((header, images))
}

/// First top-level surface, used by [`ImageFile::load`].
pub(crate) fn decode_first_surface(
    blob: &[u8],
    limits: Option<&Limits>,
) -> Result<DecodedImage, ImageError> {
    let header = DdsHeader::parse(blob)?;
    let range = header
        .check_payload(blob)?
        .into_iter()
        .next()
        .ok_or_else(|| ImageError::MalformedContainer("no surfaces".to_string()))?;
    decode_range(&header, blob, range, limits)
}

/// Decode the first surface of a DDS blob.
///
/// For cube maps this is the +X face; for volumes, the front slice.
pub fn decompress(blob: &[u8]) -> Result<ImageFile, ImageError> {
    decompress_with_limits(blob, &Limits::default())
}

/// [`decompress`] with resource limits checked before the output buffer is
/// allocated.
pub fn decompress_with_limits(blob: &[u8], limits: &Limits) -> Result<ImageFile, ImageError> {
    let decoded = decode_first_surface(blob, Some(limits))?;
    tracing::debug!(
        width = decoded.width,
        height = decoded.height,
        format = ?decoded.format,
        "decompressed DDS"
    );
    Ok(ImageFile::from_decoded(decoded, FileFormat::Dds))
}

/// Decode all six faces of a cube-map DDS in +X, -X, +Y, -Y, +Z, -Z order.
pub fn load_cube_map(blob: &[u8]) -> Result<[ImageFile; 6], ImageError> {
    let (header, faces) = decode_surfaces(blob, None, |header, ranges| {
        if header.layout != Layout::Cube {
            return Err(ImageError::MalformedContainer(
                "not a cube map".to_string(),
            ));
        }
        Ok(ranges)
    })?;
    tracing::debug!(
        width = header.width,
        height = header.height,
        "loaded DDS cube map"
    );
    faces
        .try_into()
        .map_err(|_| ImageError::MalformedContainer("cube map without 6 faces".to_string()))
}

/// Decode every slice of a volume-texture DDS, front to back, and return
/// them with the depth from the header.
pub fn load_volume_texture(blob: &[u8]) -> Result<(Vec<ImageFile>, u32), ImageError> {
    let (header, slices) = decode_surfaces(blob, None, |header, ranges| match header.layout {
        Layout::Volume { .. } => Ok(ranges),
        _ => Err(ImageError::MalformedContainer(
            "not a volume texture".to_string(),
        )),
    })?;
    let Layout::Volume { depth } = header.layout else {
        return Err(ImageError::MalformedContainer(
            "not a volume texture".to_string(),
        ));
    };
    tracing::debug!(
        width = header.width,
        height = header.height,
        depth,
        "loaded DDS volume texture"
    );
    Ok((slices, depth))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(width: u32, height: u32, format: PixelFormat, pixels: Vec<u8>) -> ImageFile {
        ImageFile::from_pixels(width, height, format, pixels, None).unwrap()
    }

    fn payload(blob: &[u8]) -> &[u8] {
        let header = DdsHeader::parse(blob).unwrap();
        &blob[header.data_offset..]
    }

    #[test]
    fn compatibility_table() {
        use CompressionType::*;
        assert!(Bc4.accepts(PixelFormat::R16));
        assert!(!Bc4.accepts(PixelFormat::RG8));
        assert!(Bc5.accepts(PixelFormat::RG32F));
        assert!(Bc6h.accepts(PixelFormat::RGB8));
        assert!(Bc7.accepts(PixelFormat::RGBA32F));
        assert!(!Bc7.accepts(PixelFormat::R8));
        assert!(None.accepts(PixelFormat::RGB16));
        assert!(!None.accepts(PixelFormat::Unknown));
    }

    #[test]
    fn incompatible_format_is_rejected() {
        let img = image(4, 4, PixelFormat::RGB8, vec![0; 48]);
        assert!(matches!(
            compress(&img, CompressionType::Bc4),
            Err(ImageError::IncompatiblePixelFormat {
                format: PixelFormat::RGB8,
                compression: CompressionType::Bc4
            })
        ));
    }

    #[test]
    fn uninitialized_image_is_rejected() {
        assert!(matches!(
            compress(&ImageFile::new(), CompressionType::None),
            Err(ImageError::NotInitialized)
        ));
    }

    #[test]
    fn five_by_five_uses_four_blocks() {
        let pixels: Vec<u8> = (0..25).map(|i| i * 10).collect();
        let img = image(5, 5, PixelFormat::R8, pixels);
        let blob = compress(&img, CompressionType::Bc4).unwrap();
        assert_eq!(payload(&blob).len(), 4 * bc4::BLOCK_BYTES);
        let back = decompress(&blob).unwrap();
        assert_eq!((back.width(), back.height()), (5, 5));
        assert_eq!(back.format(), PixelFormat::R8);
        assert_eq!(back.pixels().len(), 25);
    }

    #[test]
    fn edge_padding_repeats_last_column() {
        // 5 wide: the second block column holds only x = 4, repeated
        let pixels: Vec<u8> = (0..5).map(|x| if x == 4 { 255 } else { 0 }).collect();
        let img = image(5, 1, PixelFormat::R8, pixels.clone());
        let blob = compress(&img, CompressionType::Bc4).unwrap();
        let second = &payload(&blob)[8..16];
        let mut block = [0u8; 8];
        block.copy_from_slice(second);
        assert_eq!(bc4::decode_block(&block), [255; 16]);
        assert_eq!(decompress(&blob).unwrap().pixels(), &pixels[..]);
    }

    #[test]
    fn rgb16_survives_the_rgba16_detour() {
        let pixels: Vec<u8> = [1u16, 2, 3, 65535, 0, 40000]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect();
        let img = image(2, 1, PixelFormat::RGB16, pixels.clone());
        let blob = compress(&img, CompressionType::None).unwrap();
        assert_eq!(payload(&blob).len(), 16);
        let back = decompress(&blob).unwrap();
        assert_eq!(back.format(), PixelFormat::RGB16);
        assert_eq!(back.pixels(), &pixels[..]);
    }

    #[test]
    fn bc6h_decodes_to_rgba32f() {
        let pixels: Vec<u8> = (0..16)
            .flat_map(|i| [0.5f32 + i as f32 / 64.0, 1.0, 2.0])
            .flat_map(f32::to_ne_bytes)
            .collect();
        let img = image(4, 4, PixelFormat::RGB32F, pixels);
        let back = decompress(&compress(&img, CompressionType::Bc6h).unwrap()).unwrap();
        assert_eq!(back.format(), PixelFormat::RGBA32F);
        let first: Vec<f32> = back.pixels()[..16]
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert!((first[0] - 0.5).abs() < 0.05);
        assert!((first[1] - 1.0).abs() < 0.05);
        assert!((first[2] - 2.0).abs() < 0.1);
        assert_eq!(first[3], 1.0);
    }

    #[test]
    fn reads_bgrx_payload() {
        let mut blob = compress(
            &image(1, 1, PixelFormat::RGBA8, vec![0; 4]),
            CompressionType::None,
        )
        .unwrap();
        // DXGI B8G8R8X8_UNORM
        blob[4 + header::HEADER_SIZE] = 88;
        let n = blob.len();
        blob[n - 4..].copy_from_slice(&[10, 20, 30, 0]);
        let back = decompress(&blob).unwrap();
        assert_eq!(back.pixels(), &[30, 20, 10, 255]);
    }

    #[test]
    fn reads_half_floats() {
        let mut blob = compress(
            &image(1, 1, PixelFormat::RG32F, vec![0; 8]),
            CompressionType::None,
        )
        .unwrap();
        // DXGI R16G16_FLOAT with a 4-byte payload
        blob[4 + header::HEADER_SIZE] = 34;
        let n = blob.len();
        blob.truncate(n - 4);
        blob[n - 8..n - 6].copy_from_slice(&half::f16::from_f32(0.25).to_bits().to_le_bytes());
        blob[n - 6..n - 4].copy_from_slice(&half::f16::from_f32(-3.0).to_bits().to_le_bytes());
        let back = decompress(&blob).unwrap();
        assert_eq!(back.format(), PixelFormat::RG32F);
        let v: Vec<f32> = back
            .pixels()
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(v, [0.25, -3.0]);
    }

    #[test]
    fn truncated_payload_fails_before_decoding() {
        let blob = compress(
            &image(8, 8, PixelFormat::RGBA8, vec![7; 256]),
            CompressionType::Bc7,
        )
        .unwrap();
        assert!(matches!(
            decompress(&blob[..blob.len() - 1]),
            Err(ImageError::UnexpectedEof)
        ));
    }

    #[test]
    fn limits_are_checked() {
        let blob = compress(
            &image(8, 8, PixelFormat::R8, vec![0; 64]),
            CompressionType::None,
        )
        .unwrap();
        let limits = Limits {
            max_width: Some(4),
            ..Default::default()
        };
        assert!(matches!(
            decompress_with_limits(&blob, &limits),
            Err(ImageError::LimitExceeded(_))
        ));
    }

    #[test]
    fn cube_map_face_order() {
        let faces: Vec<ImageFile> = (0..6u8)
            .map(|i| image(2, 2, PixelFormat::R8, vec![i; 4]))
            .collect();
        let blob = save_cube_map(&faces, false).unwrap();
        assert_eq!(payload(&blob).len(), 24);
        let loaded = load_cube_map(&blob).unwrap();
        for (i, face) in loaded.iter().enumerate() {
            assert_eq!(face.pixels(), &[i as u8; 4]);
        }
        // the first surface is +X
        assert_eq!(decompress(&blob).unwrap().pixels(), &[0; 4]);
    }

    #[test]
    fn cube_map_needs_six_consistent_faces() {
        let mut faces: Vec<ImageFile> = (0..5)
            .map(|_| image(2, 2, PixelFormat::R8, vec![0; 4]))
            .collect();
        assert!(matches!(
            save_cube_map(&faces, false),
            Err(ImageError::InconsistentCubeFaces(_))
        ));
        faces.push(image(2, 2, PixelFormat::RG8, vec![0; 8]));
        let mut sink = Vec::new();
        assert!(matches!(
            write_cube_map(&faces, false, &mut sink),
            Err(ImageError::InconsistentCubeFaces(_))
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn bc6h_cube_requires_color_faces() {
        let faces: Vec<ImageFile> = (0..6)
            .map(|_| image(4, 4, PixelFormat::R8, vec![0; 16]))
            .collect();
        assert!(matches!(
            save_cube_map(&faces, true),
            Err(ImageError::IncompatiblePixelFormat { .. })
        ));
    }

    #[test]
    fn volume_roundtrip() {
        let slices: Vec<ImageFile> = (0..3u8)
            .map(|i| image(3, 2, PixelFormat::RGB8, vec![i * 40; 18]))
            .collect();
        let mut blob = Vec::new();
        write_volume_texture(&slices, false, &mut blob).unwrap();
        let (loaded, depth) = load_volume_texture(&blob).unwrap();
        assert_eq!(depth, 3);
        assert_eq!(loaded.len(), 3);
        for (a, b) in loaded.iter().zip(&slices) {
            assert_eq!(a.pixels(), b.pixels());
            assert_eq!(a.format(), PixelFormat::RGB8);
        }
        assert!(matches!(
            load_cube_map(&blob),
            Err(ImageError::MalformedContainer(_))
        ));
    }

    #[test]
    fn empty_volume_is_rejected() {
        assert!(matches!(
            save_volume_texture(&[], false),
            Err(ImageError::InconsistentCubeFaces(_))
        ));
    }

    #[test]
    fn save_from_memory_validates() {
        let blob = compress(
            &image(4, 4, PixelFormat::R8, vec![0; 16]),
            CompressionType::Bc4,
        )
        .unwrap();
        let mut sink = Vec::new();
        save_from_memory(&blob, &mut sink).unwrap();
        assert_eq!(sink, blob);

        let mut sink = Vec::new();
        assert!(save_from_memory(&blob[..blob.len() - 2], &mut sink).is_err());
        assert!(save_from_memory(b"not a dds file at all", &mut sink).is_err());
        assert!(sink.is_empty());
    }
}
