//! Pixel format conversion engine.
//!
//! Every pixel goes through a float32 working pixel `[r, g, b, a]`:
//! unsigned-normalized samples are divided by their type maximum, float
//! samples are taken as-is. Channels the source lacks are filled with
//! `G = B = 0` and `A = 1`. The target keeps its first N channels; unorm
//! targets are clamped to `[0, 1]` and rounded to nearest.
//!
//! Input is always canonical R,G,B,A order. Byte-order quirks of particular
//! sources (BGR bitmaps, BGRA DDS payloads) are normalized by the module
//! that reads them, never here.

use crate::error::ImageError;
use crate::pixel::PixelFormat;

/// Working pixel used when a source has no value for a channel.
const FILL: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Convert a packed pixel buffer from one format to another.
///
/// `src.len()` must be a multiple of `from.bytes_per_pixel()`. Converting a
/// format to itself returns an exact copy.
pub fn convert(src: &[u8], from: PixelFormat, to: PixelFormat) -> Result<Vec<u8>, ImageError> {
    if from == PixelFormat::Unknown || to == PixelFormat::Unknown {
        return Err(ImageError::UnsupportedConversion { from, to });
    }
    let src_bpp = from.bytes_per_pixel();
    if src.len() % src_bpp != 0 {
        return Err(ImageError::BufferTooSmall {
            needed: src.len().next_multiple_of(src_bpp),
            actual: src.len(),
        });
    }
    if from == to {
        return Ok(src.to_vec());
    }

    let pixel_count = src.len() / src_bpp;
    let dst_bpp = to.bytes_per_pixel();
    let mut out = vec![0u8; pixel_count * dst_bpp];
    for (src_px, dst_px) in src.chunks_exact(src_bpp).zip(out.chunks_exact_mut(dst_bpp)) {
        let rgba = load_pixel(src_px, from);
        store_pixel(&rgba, to, dst_px);
    }
    Ok(out)
}

/// Read one pixel into the float working representation.
pub(crate) fn load_pixel(px: &[u8], format: PixelFormat) -> [f32; 4] {
    let bpc = format.bytes_per_channel();
    let mut rgba = FILL;
    for (c, sample) in px.chunks_exact(bpc).take(format.channel_count()).enumerate() {
        rgba[c] = read_sample(sample);
    }
    rgba
}

/// Write the first `format.channel_count()` working channels into `out`.
pub(crate) fn store_pixel(rgba: &[f32; 4], format: PixelFormat, out: &mut [u8]) {
    let bpc = format.bytes_per_channel();
    for (c, sample) in out.chunks_exact_mut(bpc).take(format.channel_count()).enumerate() {
        write_sample(rgba[c], sample);
    }
}

/// Sample width is implied by the slice length (1, 2 or 4 bytes).
fn read_sample(sample: &[u8]) -> f32 {
    match *sample {
        [v] => f32::from(v) / 255.0,
        [a, b] => f32::from(u16::from_ne_bytes([a, b])) / 65535.0,
        [a, b, c, d] => f32::from_ne_bytes([a, b, c, d]),
        _ => 0.0,
    }
}

fn write_sample(v: f32, sample: &mut [u8]) {
    match sample.len() {
        1 => sample[0] = unorm(v, 255.0) as u8,
        2 => sample.copy_from_slice(&(unorm(v, 65535.0) as u16).to_ne_bytes()),
        4 => sample.copy_from_slice(&v.to_ne_bytes()),
        _ => {}
    }
}

/// Quantize a working value to an unsigned-normalized integer range.
pub(crate) fn unorm(v: f32, max: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        (v.clamp(0.0, 1.0) * max).round()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16s(vals: &[u16]) -> Vec<u8> {
        vals.iter().flat_map(|v| v.to_ne_bytes()).collect()
    }

    fn f32s(vals: &[f32]) -> Vec<u8> {
        vals.iter().flat_map(|v| v.to_ne_bytes()).collect()
    }

    #[test]
    fn rgb8_to_rgba8_adds_opaque_alpha() {
        let src = [10u8, 20, 30, 40, 50, 60];
        let out = convert(&src, PixelFormat::RGB8, PixelFormat::RGBA8).unwrap();
        assert_eq!(out, [10, 20, 30, 255, 40, 50, 60, 255]);
    }

    #[test]
    fn rgba8_to_rgb8_drops_alpha() {
        let src = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let out = convert(&src, PixelFormat::RGBA8, PixelFormat::RGB8).unwrap();
        assert_eq!(out, [1, 2, 3, 5, 6, 7]);
    }

    #[test]
    fn r8_to_rgba8_zero_fills() {
        let out = convert(&[200u8], PixelFormat::R8, PixelFormat::RGBA8).unwrap();
        assert_eq!(out, [200, 0, 0, 255]);
    }

    #[test]
    fn rgb_to_r_drops_green_and_blue() {
        let out = convert(&[9u8, 100, 200], PixelFormat::RGB8, PixelFormat::R8).unwrap();
        assert_eq!(out, [9]);
    }

    #[test]
    fn widen_8_to_16() {
        let out = convert(&[0u8, 128, 255], PixelFormat::RGB8, PixelFormat::RGB16).unwrap();
        assert_eq!(out, u16s(&[0, 32896, 65535]));
    }

    #[test]
    fn narrow_16_to_8_rounds() {
        let src = u16s(&[0, 257, 65535, 128]);
        let out = convert(&src, PixelFormat::RGBA16, PixelFormat::RGBA8).unwrap();
        assert_eq!(out, [0, 1, 255, 0]);
    }

    #[test]
    fn float_to_unorm_clamps_and_handles_nan() {
        let src = f32s(&[-1.0, 0.5, 2.0, f32::NAN]);
        let out = convert(&src, PixelFormat::RGBA32F, PixelFormat::RGBA8).unwrap();
        assert_eq!(out, [0, 128, 255, 0]);
    }

    #[test]
    fn float_to_float_is_unclamped() {
        let src = f32s(&[4.5]);
        let out = convert(&src, PixelFormat::R32F, PixelFormat::RGBA32F).unwrap();
        assert_eq!(out, f32s(&[4.5, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn identity_is_exact() {
        let src = f32s(&[f32::NAN, -0.0, 1e30]);
        let out = convert(&src, PixelFormat::RGB32F, PixelFormat::RGB32F).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn unknown_is_rejected() {
        assert!(matches!(
            convert(&[0u8], PixelFormat::Unknown, PixelFormat::R8),
            Err(ImageError::UnsupportedConversion { .. })
        ));
        assert!(matches!(
            convert(&[0u8], PixelFormat::R8, PixelFormat::Unknown),
            Err(ImageError::UnsupportedConversion { .. })
        ));
    }

    #[test]
    fn ragged_buffer_is_rejected() {
        assert!(matches!(
            convert(&[0u8; 5], PixelFormat::RGB8, PixelFormat::R8),
            Err(ImageError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn all_pairs_are_defined() {
        for from in PixelFormat::ALL {
            let src = vec![0u8; from.bytes_per_pixel() * 3];
            for to in PixelFormat::ALL {
                let out = convert(&src, from, to).unwrap();
                assert_eq!(out.len(), to.bytes_per_pixel() * 3, "{from:?} -> {to:?}");
            }
        }
    }
}
