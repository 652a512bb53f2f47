use super::{PnmHeader, PnmKind};
use crate::error::ImageError;
use crate::pixel::PixelFormat;

/// Cursor over the whitespace/comment separated header tokens.
struct Tokens<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn skip_space(&mut self) {
        while let Some(&b) = self.data.get(self.pos) {
            if b == b'#' {
                while let Some(&c) = self.data.get(self.pos) {
                    self.pos += 1;
                    if c == b'\n' || c == b'\r' {
                        break;
                    }
                }
            } else if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn next(&mut self) -> Result<&'a [u8], ImageError> {
        self.skip_space();
        let start = self.pos;
        while let Some(&b) = self.data.get(self.pos) {
            if b.is_ascii_whitespace() || b == b'#' {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            return Err(ImageError::UnexpectedEof);
        }
        Ok(&self.data[start..self.pos])
    }

    fn next_u32(&mut self, what: &str) -> Result<u32, ImageError> {
        let tok = self.next()?;
        core::str::from_utf8(tok)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ImageError::Decode(format!("invalid PNM {what}")))
    }

    /// Exactly one whitespace byte separates the header from the raster.
    fn end_of_header(&mut self) -> Result<usize, ImageError> {
        match self.data.get(self.pos) {
            Some(b) if b.is_ascii_whitespace() => Ok(self.pos + 1),
            Some(_) => Err(ImageError::Decode("missing PNM header terminator".into())),
            None => Err(ImageError::UnexpectedEof),
        }
    }
}

pub(super) fn parse_header(data: &[u8]) -> Result<PnmHeader, ImageError> {
    let mut tokens = Tokens { data, pos: 0 };
    let kind = match tokens.next()? {
        b"P5" => PnmKind::Pgm,
        b"P6" => PnmKind::Ppm,
        b"Pf" => PnmKind::Pfm { channels: 1 },
        b"PF" => PnmKind::Pfm { channels: 3 },
        other => {
            return Err(ImageError::UnsupportedFormat(format!(
                "PNM variant {:?}",
                String::from_utf8_lossy(other)
            )));
        }
    };
    let width = tokens.next_u32("width")?;
    let height = tokens.next_u32("height")?;
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidDimension { width, height });
    }

    let (maxval, pfm_scale) = match kind {
        PnmKind::Pfm { .. } => {
            let tok = tokens.next()?;
            let scale: f32 = core::str::from_utf8(tok)
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|s: &f32| s.is_finite() && *s != 0.0)
                .ok_or_else(|| ImageError::Decode("invalid PFM scale".into()))?;
            (0, scale)
        }
        _ => {
            let maxval = tokens.next_u32("maxval")?;
            if maxval == 0 || maxval > 65535 {
                return Err(ImageError::Decode(format!("PNM maxval {maxval} out of range")));
            }
            (maxval, 1.0)
        }
    };
    let data_offset = tokens.end_of_header()?;

    Ok(PnmHeader {
        kind,
        width,
        height,
        maxval,
        pfm_scale,
        data_offset,
    })
}

/// P5/P6 samples, rescaled to the full range of the output sample type.
pub(super) fn decode_integer(
    payload: &[u8],
    header: &PnmHeader,
    format: PixelFormat,
    out_bytes: usize,
) -> Result<Vec<u8>, ImageError> {
    let wide = header.maxval > 255;
    let samples = out_bytes / format.bytes_per_channel();
    let src_len = if wide { samples * 2 } else { samples };
    let src = payload.get(..src_len).ok_or(ImageError::UnexpectedEof)?;
    let maxval = header.maxval;

    if !wide {
        if maxval == 255 {
            return Ok(src.to_vec());
        }
        return Ok(src
            .iter()
            .map(|&v| ((u32::from(v).min(maxval) * 255 + maxval / 2) / maxval) as u8)
            .collect());
    }

    let mut out = Vec::with_capacity(out_bytes);
    for pair in src.chunks_exact(2) {
        let v = u32::from(u16::from_be_bytes([pair[0], pair[1]])).min(maxval);
        let scaled = if maxval == 65535 {
            v
        } else {
            (v * 65535 + maxval / 2) / maxval
        };
        out.extend_from_slice(&(scaled as u16).to_ne_bytes());
    }
    Ok(out)
}

/// PFM rows are bottom-up; byte order follows the sign of the scale.
pub(super) fn decode_pfm(
    payload: &[u8],
    header: &PnmHeader,
    out_bytes: usize,
) -> Result<Vec<u8>, ImageError> {
    let src = payload.get(..out_bytes).ok_or(ImageError::UnexpectedEof)?;
    let little = header.pfm_scale < 0.0;
    let row_bytes = out_bytes / header.height as usize;

    let mut out = Vec::with_capacity(out_bytes);
    for row in src.chunks_exact(row_bytes).rev() {
        for s in row.chunks_exact(4) {
            let bytes = [s[0], s[1], s[2], s[3]];
            let v = if little {
                f32::from_le_bytes(bytes)
            } else {
                f32::from_be_bytes(bytes)
            };
            out.extend_from_slice(&v.to_ne_bytes());
        }
    }
    Ok(out)
}
