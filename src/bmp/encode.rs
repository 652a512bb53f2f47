//! BMP encoder: uncompressed 24-bit and 32-bit bottom-up bitmaps.

use crate::codec::EncodeInput;
use crate::error::ImageError;
use crate::pixel::PixelFormat;

const HEADERS_LEN: usize = 54;

pub(super) fn encode_bmp(image: &EncodeInput<'_>) -> Result<Vec<u8>, ImageError> {
    let (width, height) = (image.width, image.height);
    if width == 0 || height == 0 || width > i32::MAX as u32 || height > i32::MAX as u32 {
        return Err(ImageError::InvalidDimension { width, height });
    }
    let src_bpp = match image.format {
        PixelFormat::RGB8 => 3,
        PixelFormat::RGBA8 => 4,
        other => {
            return Err(ImageError::Encode(format!(
                "BMP encodes RGB8 or RGBA8, got {other:?}"
            )));
        }
    };
    let too_large = ImageError::DimensionsTooLarge { width, height };
    let w = width as usize;
    let h = height as usize;
    let expected = image
        .format
        .buffer_len(width, height)
        .ok_or(ImageError::DimensionsTooLarge { width, height })?;
    if image.pixels.len() < expected {
        return Err(ImageError::BufferTooSmall {
            needed: expected,
            actual: image.pixels.len(),
        });
    }

    // 24-bit rows pad to 4 bytes; 32-bit rows are always aligned
    let row_stride = w
        .checked_mul(src_bpp)
        .and_then(|r| r.checked_add(3))
        .map(|r| r & !3)
        .ok_or(ImageError::DimensionsTooLarge { width, height })?;
    let pixel_data_size = row_stride
        .checked_mul(h)
        .ok_or(ImageError::DimensionsTooLarge { width, height })?;
    let file_size = pixel_data_size
        .checked_add(HEADERS_LEN)
        .filter(|&size| u32::try_from(size).is_ok())
        .ok_or(too_large)?;

    let mut out = Vec::with_capacity(file_size);
    write_bmp_header(
        &mut out,
        file_size,
        pixel_data_size,
        width,
        height,
        (src_bpp * 8) as u16,
    );

    let pad_bytes = row_stride - w * src_bpp;
    for row in image.pixels[..expected].chunks_exact(w * src_bpp).rev() {
        for px in row.chunks_exact(src_bpp) {
            out.extend_from_slice(&[px[2], px[1], px[0]]);
            if src_bpp == 4 {
                out.push(px[3]);
            }
        }
        out.extend(core::iter::repeat_n(0u8, pad_bytes));
    }

    Ok(out)
}

fn write_bmp_header(
    out: &mut Vec<u8>,
    file_size: usize,
    pixel_data_size: usize,
    width: u32,
    height: u32,
    bpp: u16,
) {
    // File header (14 bytes)
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(file_size as u32).to_le_bytes());
    out.extend_from_slice(&[0u8; 4]); // reserved
    out.extend_from_slice(&(HEADERS_LEN as u32).to_le_bytes());

    // BITMAPINFOHEADER (40 bytes)
    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&(height as i32).to_le_bytes()); // positive = bottom-up
    out.extend_from_slice(&1u16.to_le_bytes()); // planes
    out.extend_from_slice(&bpp.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // BI_RGB
    out.extend_from_slice(&(pixel_data_size as u32).to_le_bytes());
    out.extend_from_slice(&2835u32.to_le_bytes()); // 72 DPI
    out.extend_from_slice(&2835u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // colors used
    out.extend_from_slice(&0u32.to_le_bytes()); // important colors
}
