//! Windows bitmap codec (uncompressed and bitfield variants).
//!
//! Bitmaps store BGR(A) samples; everything leaving this module is RGB(A).

mod decode;
mod encode;

use crate::codec::{DecodedImage, EncodeInput, ImageCodec};
use crate::error::ImageError;
use crate::format::FileFormat;
use crate::limits::{Limits, check_surface};

/// Built-in BMP codec.
///
/// Decodes 8-bit palettized, 24-bit and 32-bit images (`BI_RGB` or
/// `BI_BITFIELDS`), top-down or bottom-up. Encodes `RGB8` as 24-bit and
/// `RGBA8` as 32-bit bottom-up bitmaps.
#[derive(Clone, Copy, Debug, Default)]
pub struct BmpCodec;

impl ImageCodec for BmpCodec {
    fn decode(
        &self,
        data: &[u8],
        _format: FileFormat,
        limits: Option<&Limits>,
    ) -> Result<DecodedImage, ImageError> {
        let header = decode::parse_header(data)?;
        let format = header.pixel_format();
        let out_bytes = format
            .buffer_len(header.width, header.height)
            .ok_or(ImageError::DimensionsTooLarge {
                width: header.width,
                height: header.height,
            })?;
        check_surface(limits, header.width, header.height, out_bytes)?;
        let pixels = decode::decode_pixels(data, &header, out_bytes)?;
        Ok(DecodedImage {
            width: header.width,
            height: header.height,
            format,
            pixels,
            color_profile: None,
        })
    }

    fn encode(&self, image: &EncodeInput<'_>, _format: FileFormat) -> Result<Vec<u8>, ImageError> {
        encode::encode_bmp(image)
    }
}
