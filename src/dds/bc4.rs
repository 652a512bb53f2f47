//! BC4 (one channel) and BC5 (two BC4 blocks) codecs.
//!
//! A block is two 8-bit endpoints followed by sixteen 3-bit indices. When
//! `e0 > e1` the palette holds eight interpolated values; otherwise six,
//! plus the constants 0 and 255.

pub(crate) const BLOCK_BYTES: usize = 8;

fn palette(e0: u8, e1: u8) -> [u8; 8] {
    let (a, b) = (u32::from(e0), u32::from(e1));
    let mut p = [e0, e1, 0, 0, 0, 0, 0, 0];
    if e0 > e1 {
        for i in 2..8u32 {
            p[i as usize] = (((8 - i) * a + (i - 1) * b + 3) / 7) as u8;
        }
    } else {
        for i in 2..6u32 {
            p[i as usize] = (((6 - i) * a + (i - 1) * b + 2) / 5) as u8;
        }
        p[7] = 255;
    }
    p
}

/// Pick the nearest palette entry per value; returns indices and squared error.
fn fit(values: &[u8; 16], palette: &[u8; 8]) -> ([u8; 16], u32) {
    let mut indices = [0u8; 16];
    let mut error = 0u32;
    for (idx, &v) in indices.iter_mut().zip(values) {
        let (best, err) = palette
            .iter()
            .enumerate()
            .map(|(i, &p)| (i, u32::from(v.abs_diff(p)).pow(2)))
            .min_by_key(|&(_, err)| err)
            .unwrap_or((0, 0));
        *idx = best as u8;
        error += err;
    }
    (indices, error)
}

pub(crate) fn encode_block(values: &[u8; 16]) -> [u8; BLOCK_BYTES] {
    let lo = values.iter().copied().min().unwrap_or(0);
    let hi = values.iter().copied().max().unwrap_or(0);

    // eight interpolated values spanning the full range
    let mut best = (hi, lo);
    let (mut best_idx, mut best_err) = fit(values, &palette(hi, lo));

    // six values between the inner extremes, with 0 and 255 available exactly
    let inner = values.iter().copied().filter(|&v| v != 0 && v != 255);
    let lo6 = inner.clone().min().unwrap_or(0);
    let hi6 = inner.max().unwrap_or(0);
    let (idx6, err6) = fit(values, &palette(lo6, hi6));
    if err6 < best_err || hi == lo {
        best = (lo6, hi6);
        best_idx = idx6;
        best_err = err6;
    }
    tracing::trace!(error = best_err, "bc4 block");

    let mut bits = 0u64;
    for (i, &idx) in best_idx.iter().enumerate() {
        bits |= u64::from(idx) << (3 * i);
    }
    let mut block = [0u8; BLOCK_BYTES];
    block[0] = best.0;
    block[1] = best.1;
    block[2..].copy_from_slice(&bits.to_le_bytes()[..6]);
    block
}

pub(crate) fn decode_block(block: &[u8; BLOCK_BYTES]) -> [u8; 16] {
    let p = palette(block[0], block[1]);
    let mut raw = [0u8; 8];
    raw[..6].copy_from_slice(&block[2..]);
    let bits = u64::from_le_bytes(raw);
    core::array::from_fn(|i| p[((bits >> (3 * i)) & 7) as usize])
}

/// BC5: red block then green block.
pub(crate) fn encode_bc5_block(texels: &[[u8; 2]; 16]) -> [u8; 16] {
    let red = encode_block(&texels.map(|t| t[0]));
    let green = encode_block(&texels.map(|t| t[1]));
    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&red);
    out[8..].copy_from_slice(&green);
    out
}

pub(crate) fn decode_bc5_block(block: &[u8; 16]) -> [[u8; 2]; 16] {
    let (r, g) = block.split_at(8);
    let mut red = [0u8; 8];
    let mut green = [0u8; 8];
    red.copy_from_slice(r);
    green.copy_from_slice(g);
    let red = decode_block(&red);
    let green = decode_block(&green);
    core::array::from_fn(|i| [red[i], green[i]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_block_is_exact() {
        for v in [0u8, 1, 128, 254, 255] {
            let block = encode_block(&[v; 16]);
            assert_eq!(decode_block(&block), [v; 16]);
        }
    }

    #[test]
    fn two_values_are_exact() {
        let mut values = [10u8; 16];
        values[5] = 200;
        values[15] = 200;
        assert_eq!(decode_block(&encode_block(&values)), values);
    }

    #[test]
    fn six_value_mode_keeps_extremes() {
        // 0 and 255 plus a tight cluster: the 6-value palette represents
        // both extremes exactly
        let mut values = [100u8; 16];
        values[0] = 0;
        values[1] = 255;
        values[2] = 104;
        let block = encode_block(&values);
        assert!(block[0] <= block[1], "expected 6-value mode");
        let decoded = decode_block(&block);
        assert_eq!(decoded[0], 0);
        assert_eq!(decoded[1], 255);
        for i in 2..16 {
            assert!(decoded[i].abs_diff(values[i]) <= 1);
        }
    }

    #[test]
    fn gradient_error_is_small() {
        let values: [u8; 16] = core::array::from_fn(|i| (i * 16) as u8);
        let decoded = decode_block(&encode_block(&values));
        for (d, v) in decoded.iter().zip(&values) {
            assert!(d.abs_diff(*v) <= 18, "{d} vs {v}");
        }
    }

    #[test]
    fn bc5_channels_are_independent() {
        let texels: [[u8; 2]; 16] = core::array::from_fn(|i| [7, if i % 2 == 0 { 0 } else { 250 }]);
        assert_eq!(decode_bc5_block(&encode_bc5_block(&texels)), texels);
    }
}
