//! PNM encoder: P5, P6, PFM.

use crate::codec::EncodeInput;
use crate::error::ImageError;
use crate::format::FileFormat;
use crate::pixel::PixelFormat;

/// Encode pixels to the requested PNM variant.
pub(super) fn encode_pnm(image: &EncodeInput<'_>, format: FileFormat) -> Result<Vec<u8>, ImageError> {
    let EncodeInput {
        width,
        height,
        format: layout,
        pixels,
        ..
    } = *image;
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidDimension { width, height });
    }
    let expected = layout
        .buffer_len(width, height)
        .ok_or(ImageError::DimensionsTooLarge { width, height })?;
    if pixels.len() < expected {
        return Err(ImageError::BufferTooSmall {
            needed: expected,
            actual: pixels.len(),
        });
    }
    let pixels = &pixels[..expected];

    match (format, layout) {
        (FileFormat::PgmRaw, PixelFormat::R8) => Ok(encode_integer("P5", width, height, 255, pixels)),
        (FileFormat::PgmRaw, PixelFormat::R16) => {
            Ok(encode_integer("P5", width, height, 65535, pixels))
        }
        (FileFormat::PpmRaw, PixelFormat::RGB8) => {
            Ok(encode_integer("P6", width, height, 255, pixels))
        }
        (FileFormat::PpmRaw, PixelFormat::RGB16) => {
            Ok(encode_integer("P6", width, height, 65535, pixels))
        }
        (FileFormat::Pfm, PixelFormat::R32F) => Ok(encode_pfm("Pf", width, height, pixels)),
        (FileFormat::Pfm, PixelFormat::RGB32F) => Ok(encode_pfm("PF", width, height, pixels)),
        _ => Err(ImageError::Encode(format!(
            "cannot encode {layout:?} as {format}"
        ))),
    }
}

fn encode_integer(magic: &str, width: u32, height: u32, maxval: u32, pixels: &[u8]) -> Vec<u8> {
    let header = format!("{magic}\n{width} {height}\n{maxval}\n");
    let mut out = Vec::with_capacity(header.len() + pixels.len());
    out.extend_from_slice(header.as_bytes());
    if maxval > 255 {
        // 16-bit samples are big-endian on disk
        for pair in pixels.chunks_exact(2) {
            let v = u16::from_ne_bytes([pair[0], pair[1]]);
            out.extend_from_slice(&v.to_be_bytes());
        }
    } else {
        out.extend_from_slice(pixels);
    }
    out
}

fn encode_pfm(magic: &str, width: u32, height: u32, pixels: &[u8]) -> Vec<u8> {
    let header = format!("{magic}\n{width} {height}\n-1.0\n");
    let mut out = Vec::with_capacity(header.len() + pixels.len());
    out.extend_from_slice(header.as_bytes());

    // PFM stores bottom-to-top, little-endian for a negative scale
    let row_bytes = pixels.len() / height as usize;
    for row in pixels.chunks_exact(row_bytes).rev() {
        for s in row.chunks_exact(4) {
            let v = f32::from_ne_bytes([s[0], s[1], s[2], s[3]]);
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    out
}
