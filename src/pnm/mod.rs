//! PNM family codec: P5 (PGM), P6 (PPM), PFM.
//!
//! Integer samples are big-endian on disk; PFM byte order follows the sign of
//! the scale field and rows are stored bottom-up. All of it is normalized to
//! native-endian, top-down buffers here.

mod decode;
mod encode;

use crate::codec::{DecodedImage, EncodeInput, ImageCodec};
use crate::error::ImageError;
use crate::format::FileFormat;
use crate::limits::{Limits, check_surface};
use crate::pixel::PixelFormat;

/// File formats handled by [`PnmCodec`].
pub(crate) const FORMATS: [FileFormat; 3] =
    [FileFormat::PgmRaw, FileFormat::PpmRaw, FileFormat::Pfm];

/// Which PNM sub-format a header declared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PnmKind {
    /// P5, one channel.
    Pgm,
    /// P6, three channels.
    Ppm,
    /// `Pf` (gray) or `PF` (RGB), 32-bit float.
    Pfm { channels: usize },
}

/// Parsed PNM header.
pub(crate) struct PnmHeader {
    pub kind: PnmKind,
    pub width: u32,
    pub height: u32,
    /// Integer maxval; unused for PFM.
    pub maxval: u32,
    /// PFM scale; negative means little-endian samples.
    pub pfm_scale: f32,
    pub data_offset: usize,
}

impl PnmHeader {
    fn pixel_format(&self) -> PixelFormat {
        let wide = self.maxval > 255;
        match self.kind {
            PnmKind::Pgm if wide => PixelFormat::R16,
            PnmKind::Pgm => PixelFormat::R8,
            PnmKind::Ppm if wide => PixelFormat::RGB16,
            PnmKind::Ppm => PixelFormat::RGB8,
            PnmKind::Pfm { channels: 1 } => PixelFormat::R32F,
            PnmKind::Pfm { .. } => PixelFormat::RGB32F,
        }
    }
}

/// Built-in codec for binary PGM/PPM and PFM.
#[derive(Clone, Copy, Debug, Default)]
pub struct PnmCodec;

impl ImageCodec for PnmCodec {
    fn decode(
        &self,
        data: &[u8],
        format: FileFormat,
        limits: Option<&Limits>,
    ) -> Result<DecodedImage, ImageError> {
        let header = decode::parse_header(data)?;
        let declared = match header.kind {
            PnmKind::Pgm => FileFormat::PgmRaw,
            PnmKind::Ppm => FileFormat::PpmRaw,
            PnmKind::Pfm { .. } => FileFormat::Pfm,
        };
        if declared != format {
            tracing::debug!(%format, %declared, "pnm header disagrees with requested format");
        }

        let pixel_format = header.pixel_format();
        let out_bytes = pixel_format
            .buffer_len(header.width, header.height)
            .ok_or(ImageError::DimensionsTooLarge {
                width: header.width,
                height: header.height,
            })?;
        check_surface(limits, header.width, header.height, out_bytes)?;

        let payload = data
            .get(header.data_offset..)
            .ok_or(ImageError::UnexpectedEof)?;
        let pixels = match header.kind {
            PnmKind::Pfm { .. } => decode::decode_pfm(payload, &header, out_bytes)?,
            _ => decode::decode_integer(payload, &header, pixel_format, out_bytes)?,
        };

        Ok(DecodedImage {
            width: header.width,
            height: header.height,
            format: pixel_format,
            pixels,
            color_profile: None,
        })
    }

    fn encode(&self, image: &EncodeInput<'_>, format: FileFormat) -> Result<Vec<u8>, ImageError> {
        encode::encode_pnm(image, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::EncodeOptions;

    fn input(format: PixelFormat, width: u32, height: u32, pixels: &[u8]) -> EncodeInput<'_> {
        EncodeInput {
            width,
            height,
            format,
            pixels,
            color_profile: None,
            options: EncodeOptions::default(),
        }
    }

    #[test]
    fn ppm_roundtrip() {
        let pixels = [255u8, 0, 0, 0, 255, 0, 0, 0, 255, 9, 9, 9];
        let encoded = PnmCodec
            .encode(&input(PixelFormat::RGB8, 2, 2, &pixels), FileFormat::PpmRaw)
            .unwrap();
        assert!(encoded.starts_with(b"P6\n2 2\n255\n"));
        let decoded = PnmCodec.decode(&encoded, FileFormat::PpmRaw, None).unwrap();
        assert_eq!(decoded.format, PixelFormat::RGB8);
        assert_eq!(decoded.pixels, pixels);
    }

    #[test]
    fn pgm16_is_big_endian_on_disk() {
        let pixels: Vec<u8> = [0x0102u16, 0xfffe].iter().flat_map(|v| v.to_ne_bytes()).collect();
        let encoded = PnmCodec
            .encode(&input(PixelFormat::R16, 2, 1, &pixels), FileFormat::PgmRaw)
            .unwrap();
        assert!(encoded.ends_with(&[0x01, 0x02, 0xff, 0xfe]));
        let decoded = PnmCodec.decode(&encoded, FileFormat::PgmRaw, None).unwrap();
        assert_eq!(decoded.format, PixelFormat::R16);
        assert_eq!(decoded.pixels, pixels);
    }

    #[test]
    fn pfm_roundtrip_flips_rows() {
        let vals = [0.0f32, 0.25, 0.5, 0.75, 1.0, 1.5];
        let pixels: Vec<u8> = vals.iter().flat_map(|v| v.to_ne_bytes()).collect();
        let encoded = PnmCodec
            .encode(&input(PixelFormat::R32F, 3, 2, &pixels), FileFormat::Pfm)
            .unwrap();
        let decoded = PnmCodec.decode(&encoded, FileFormat::Pfm, None).unwrap();
        assert_eq!(decoded.format, PixelFormat::R32F);
        assert_eq!(decoded.pixels, pixels);
    }

    #[test]
    fn header_comments_and_small_maxval() {
        let data = b"P5\n# comment\n2 1\n# another\n15\n\x00\x0f";
        let decoded = PnmCodec.decode(data, FileFormat::PgmRaw, None).unwrap();
        assert_eq!(decoded.pixels, [0, 255]);
    }

    #[test]
    fn truncated_payload() {
        let data = b"P6\n4 4\n255\n\x00\x00";
        assert!(matches!(
            PnmCodec.decode(data, FileFormat::PpmRaw, None),
            Err(ImageError::UnexpectedEof)
        ));
    }

    #[test]
    fn limits_apply() {
        let data = b"P5\n64 64\n255\n";
        let limits = Limits {
            max_width: Some(32),
            ..Default::default()
        };
        assert!(matches!(
            PnmCodec.decode(data, FileFormat::PgmRaw, Some(&limits)),
            Err(ImageError::LimitExceeded(_))
        ));
    }

    #[test]
    fn rgba_is_not_encodable() {
        let pixels = [0u8; 4];
        assert!(matches!(
            PnmCodec.encode(&input(PixelFormat::RGBA8, 1, 1, &pixels), FileFormat::PpmRaw),
            Err(ImageError::Encode(_))
        ));
    }
}
