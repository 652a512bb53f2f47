//! BC1/BC2/BC3 block decoding (read-only; this crate never writes them).

use super::bc4;

fn expand_565(c: u16) -> [u8; 3] {
    let r = (c >> 11) & 0x1f;
    let g = (c >> 5) & 0x3f;
    let b = c & 0x1f;
    [
        ((r << 3) | (r >> 2)) as u8,
        ((g << 2) | (g >> 4)) as u8,
        ((b << 3) | (b >> 2)) as u8,
    ]
}

fn mix(a: [u8; 3], b: [u8; 3], wa: u16, wb: u16) -> [u8; 3] {
    let div = wa + wb;
    core::array::from_fn(|c| ((u16::from(a[c]) * wa + u16::from(b[c]) * wb + div / 2) / div) as u8)
}

/// Decode the 8-byte color part. `allow_transparent` enables the 3-color
/// mode with a transparent black entry (BC1 only).
fn decode_color(block: &[u8], allow_transparent: bool) -> [[u8; 4]; 16] {
    let c0 = u16::from_le_bytes([block[0], block[1]]);
    let c1 = u16::from_le_bytes([block[2], block[3]]);
    let e0 = expand_565(c0);
    let e1 = expand_565(c1);
    let opaque = |rgb: [u8; 3]| [rgb[0], rgb[1], rgb[2], 255];

    let palette = if c0 > c1 || !allow_transparent {
        [
            opaque(e0),
            opaque(e1),
            opaque(mix(e0, e1, 2, 1)),
            opaque(mix(e0, e1, 1, 2)),
        ]
    } else {
        [opaque(e0), opaque(e1), opaque(mix(e0, e1, 1, 1)), [0, 0, 0, 0]]
    };

    let indices = u32::from_le_bytes([block[4], block[5], block[6], block[7]]);
    core::array::from_fn(|i| palette[((indices >> (2 * i)) & 3) as usize])
}

pub(crate) fn decode_bc1_block(block: &[u8; 8]) -> [[u8; 4]; 16] {
    decode_color(block, true)
}

/// Explicit 4-bit alpha followed by a BC1 color block.
pub(crate) fn decode_bc2_block(block: &[u8; 16]) -> [[u8; 4]; 16] {
    let mut texels = decode_color(&block[8..], false);
    let alpha = u64::from_le_bytes([
        block[0], block[1], block[2], block[3], block[4], block[5], block[6], block[7],
    ]);
    for (i, t) in texels.iter_mut().enumerate() {
        let a = ((alpha >> (4 * i)) & 0xf) as u8;
        t[3] = a * 17;
    }
    texels
}

/// BC4-style alpha followed by a BC1 color block.
pub(crate) fn decode_bc3_block(block: &[u8; 16]) -> [[u8; 4]; 16] {
    let mut texels = decode_color(&block[8..], false);
    let mut alpha_block = [0u8; bc4::BLOCK_BYTES];
    alpha_block.copy_from_slice(&block[..8]);
    let alpha = bc4::decode_block(&alpha_block);
    for (t, a) in texels.iter_mut().zip(alpha) {
        t[3] = a;
    }
    texels
}
