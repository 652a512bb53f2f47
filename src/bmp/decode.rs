//! BMP decoder: 8-bit palettized, 16/24/32-bit `BI_RGB` and `BI_BITFIELDS`.

use crate::error::ImageError;
use crate::pixel::PixelFormat;

const FILE_HEADER_LEN: usize = 14;
const INFO_HEADER_LEN: usize = 40;

const BI_RGB: u32 = 0;
const BI_BITFIELDS: u32 = 3;
const BI_ALPHABITFIELDS: u32 = 6;

/// Parsed bitmap headers.
pub(super) struct BmpHeader {
    pub width: u32,
    pub height: u32,
    pub top_down: bool,
    pub bits_per_pixel: u16,
    pub data_offset: usize,
    /// R, G, B, A channel masks for 16/32-bit images; `None` for plain 24/32-bit.
    pub masks: Option<[u32; 4]>,
    /// RGB palette for 8-bit images.
    pub palette: Vec<[u8; 3]>,
}

impl BmpHeader {
    pub fn pixel_format(&self) -> PixelFormat {
        let alpha = match self.masks {
            Some(masks) => masks[3] != 0,
            None => self.bits_per_pixel == 32,
        };
        if alpha {
            PixelFormat::RGBA8
        } else {
            PixelFormat::RGB8
        }
    }

    fn row_stride(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(usize::from(self.bits_per_pixel))?
            .checked_add(31)
            .map(|bits| bits / 32 * 4)
    }
}

fn u16_at(data: &[u8], off: usize) -> Result<u16, ImageError> {
    data.get(off..off + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(ImageError::UnexpectedEof)
}

fn u32_at(data: &[u8], off: usize) -> Result<u32, ImageError> {
    data.get(off..off + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(ImageError::UnexpectedEof)
}

pub(super) fn parse_header(data: &[u8]) -> Result<BmpHeader, ImageError> {
    if data.get(..2) != Some(b"BM".as_slice()) {
        return Err(ImageError::Decode("missing BM signature".into()));
    }
    let data_offset = u32_at(data, 10)? as usize;
    let info_len = u32_at(data, 14)? as usize;
    if info_len < INFO_HEADER_LEN {
        return Err(ImageError::UnsupportedFormat(format!(
            "BMP info header of {info_len} bytes"
        )));
    }
    let raw_width = u32_at(data, 18)? as i32;
    let raw_height = u32_at(data, 22)? as i32;
    let bits_per_pixel = u16_at(data, 28)?;
    let compression = u32_at(data, 30)?;
    let colors_used = u32_at(data, 46)?;

    if raw_width <= 0 || raw_height == 0 {
        return Err(ImageError::InvalidDimension {
            width: raw_width.unsigned_abs(),
            height: raw_height.unsigned_abs(),
        });
    }
    let width = raw_width.unsigned_abs();
    let height = raw_height.unsigned_abs();
    let top_down = raw_height < 0;

    let masks = match (compression, bits_per_pixel) {
        (BI_RGB, 8 | 24 | 32) => None,
        (BI_RGB, 16) => Some([0x7c00, 0x03e0, 0x001f, 0]),
        (BI_BITFIELDS | BI_ALPHABITFIELDS, 16 | 32) => {
            let mask_base = FILE_HEADER_LEN + INFO_HEADER_LEN;
            let has_alpha_mask = compression == BI_ALPHABITFIELDS || info_len >= 56;
            let alpha = if has_alpha_mask {
                u32_at(data, mask_base + 12)?
            } else {
                0
            };
            Some([
                u32_at(data, mask_base)?,
                u32_at(data, mask_base + 4)?,
                u32_at(data, mask_base + 8)?,
                alpha,
            ])
        }
        _ => {
            return Err(ImageError::UnsupportedFormat(format!(
                "BMP with {bits_per_pixel} bpp and compression {compression}"
            )));
        }
    };

    let mut palette = Vec::new();
    if bits_per_pixel == 8 {
        let count = match colors_used {
            0 => 256,
            n => n.min(256) as usize,
        };
        let base = FILE_HEADER_LEN + info_len;
        let table = data
            .get(base..base + count * 4)
            .ok_or(ImageError::UnexpectedEof)?;
        palette = table.chunks_exact(4).map(|e| [e[2], e[1], e[0]]).collect();
    }

    Ok(BmpHeader {
        width,
        height,
        top_down,
        bits_per_pixel,
        data_offset,
        masks,
        palette,
    })
}

/// Decode the pixel array into top-down RGB8/RGBA8 rows.
pub(super) fn decode_pixels(
    data: &[u8],
    header: &BmpHeader,
    out_bytes: usize,
) -> Result<Vec<u8>, ImageError> {
    let w = header.width as usize;
    let h = header.height as usize;
    let stride = header.row_stride().ok_or(ImageError::DimensionsTooLarge {
        width: header.width,
        height: header.height,
    })?;
    let needed = stride.checked_mul(h).ok_or(ImageError::DimensionsTooLarge {
        width: header.width,
        height: header.height,
    })?;
    let raster = data
        .get(header.data_offset..)
        .and_then(|d| d.get(..needed))
        .ok_or(ImageError::UnexpectedEof)?;

    let format = header.pixel_format();
    let out_bpp = format.bytes_per_pixel();
    let mut out = vec![0u8; out_bytes];

    for y in 0..h {
        let src_row = if header.top_down { y } else { h - 1 - y };
        let src = &raster[src_row * stride..src_row * stride + stride];
        let dst = &mut out[y * w * out_bpp..(y + 1) * w * out_bpp];
        match (header.bits_per_pixel, header.masks) {
            (8, _) => {
                for (px, &index) in dst.chunks_exact_mut(3).zip(&src[..w]) {
                    let entry = header.palette.get(usize::from(index)).ok_or_else(|| {
                        ImageError::Decode(format!("palette index {index} out of range"))
                    })?;
                    px.copy_from_slice(entry);
                }
            }
            (24, None) => {
                for (px, bgr) in dst.chunks_exact_mut(3).zip(src.chunks_exact(3)) {
                    px.copy_from_slice(&[bgr[2], bgr[1], bgr[0]]);
                }
            }
            (32, None) => {
                for (px, bgra) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                    px.copy_from_slice(&[bgra[2], bgra[1], bgra[0], bgra[3]]);
                }
            }
            (bpp, Some(masks)) => {
                let bytes = usize::from(bpp / 8);
                for (px, raw) in dst.chunks_exact_mut(out_bpp).zip(src.chunks_exact(bytes)) {
                    let value = match *raw {
                        [a, b] => u32::from(u16::from_le_bytes([a, b])),
                        [a, b, c, d] => u32::from_le_bytes([a, b, c, d]),
                        _ => 0,
                    };
                    for (sample, &mask) in px.iter_mut().zip(&masks) {
                        *sample = extract_channel(value, mask);
                    }
                }
            }
            (bpp, None) => {
                return Err(ImageError::UnsupportedFormat(format!("BMP with {bpp} bpp")));
            }
        }
    }

    // 32-bit BI_RGB files commonly leave the fourth byte zeroed
    if header.bits_per_pixel == 32
        && header.masks.is_none()
        && out.chunks_exact(4).all(|px| px[3] == 0)
    {
        out.chunks_exact_mut(4).for_each(|px| px[3] = 255);
    }
    Ok(out)
}

/// Scale a masked channel to 8 bits.
fn extract_channel(value: u32, mask: u32) -> u8 {
    if mask == 0 {
        return 255;
    }
    let shift = mask.trailing_zeros();
    let max = mask >> shift;
    let v = (value & mask) >> shift;
    ((u64::from(v) * 255 + u64::from(max) / 2) / u64::from(max)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(bpp: u16, compression: u32, width: i32, height: i32, extra: &[u8]) -> Vec<u8> {
        let offset = (FILE_HEADER_LEN + INFO_HEADER_LEN + extra.len()) as u32;
        let mut out = Vec::new();
        out.extend_from_slice(b"BM");
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&40u32.to_le_bytes());
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(&height.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&bpp.to_le_bytes());
        out.extend_from_slice(&compression.to_le_bytes());
        out.extend_from_slice(&[0u8; 16]);
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(extra);
        out
    }

    #[test]
    fn palettized_top_down() {
        let mut palette = vec![0u8; 256 * 4];
        palette[4..8].copy_from_slice(&[30, 20, 10, 0]);
        let mut data = header(8, BI_RGB, 2, -1, &palette);
        data.extend_from_slice(&[1, 0, 0, 0]);
        let h = parse_header(&data).unwrap();
        assert!(h.top_down);
        let px = decode_pixels(&data, &h, 6).unwrap();
        assert_eq!(px, [10, 20, 30, 0, 0, 0]);
    }

    #[test]
    fn bitfields_565() {
        let masks: Vec<u8> = [0xf800u32, 0x07e0, 0x001f]
            .iter()
            .flat_map(|m| m.to_le_bytes())
            .collect();
        let mut data = header(16, BI_BITFIELDS, 1, 1, &masks);
        data.extend_from_slice(&0xf800u16.to_le_bytes());
        data.extend_from_slice(&[0, 0]);
        let h = parse_header(&data).unwrap();
        assert_eq!(h.pixel_format(), PixelFormat::RGB8);
        assert_eq!(decode_pixels(&data, &h, 3).unwrap(), [255, 0, 0]);
    }

    #[test]
    fn zero_alpha_becomes_opaque() {
        let mut data = header(32, BI_RGB, 1, 1, &[]);
        data.extend_from_slice(&[1, 2, 3, 0]);
        let h = parse_header(&data).unwrap();
        assert_eq!(decode_pixels(&data, &h, 4).unwrap(), [3, 2, 1, 255]);
    }

    #[test]
    fn truncated_raster() {
        let mut data = header(24, BI_RGB, 4, 4, &[]);
        data.extend_from_slice(&[0u8; 10]);
        let h = parse_header(&data).unwrap();
        assert!(matches!(
            decode_pixels(&data, &h, 48),
            Err(ImageError::UnexpectedEof)
        ));
    }

    #[test]
    fn rle_is_unsupported() {
        let data = header(8, 1, 1, 1, &[]);
        assert!(matches!(
            parse_header(&data),
            Err(ImageError::UnsupportedFormat(_))
        ));
    }
}
