//! BC6H codec (RGB half float).
//!
//! The decoder handles all 14 modes, signed and unsigned. The encoder writes
//! unsigned data only (negative inputs clamp to zero). It tries every
//! single-region mode, then every two-region mode over the best-fitting
//! partitions, and keeps the candidate with the lowest error. Endpoints are
//! clamped to each region's per-channel range, and no quantized endpoint
//! reconstructs above the region's maximum.

use half::f16;

use super::bc7::{ANCHORS2, PARTITIONS2};
use super::bits::{BitReader, BitWriter};
use super::fit;

pub(crate) const BLOCK_BYTES: usize = 16;

const WEIGHTS3: [i32; 8] = [0, 9, 18, 27, 37, 46, 55, 64];
const WEIGHTS4: [i32; 16] = [0, 4, 9, 13, 17, 21, 26, 30, 34, 38, 43, 47, 51, 55, 60, 64];

/// Largest finite half float, as bits.
const MAX_HALF_BITS: u16 = 0x7bff;

/// Header fields. `W`/`X` are the first region's endpoints, `Y`/`Z` the
/// second's; `D` is the partition index.
#[derive(Clone, Copy)]
enum F {
    D,
    RW,
    RX,
    RY,
    RZ,
    GW,
    GX,
    GY,
    GZ,
    BW,
    BX,
    BY,
    BZ,
}

/// A run of header bits for one field.
#[derive(Clone, Copy)]
struct Seg {
    field: F,
    hi: u8,
    lo: u8,
    /// Stored most significant bit first.
    reversed: bool,
}

/// Bits `hi..=lo` of a field, stored low bit first.
const fn u(field: F, hi: u8, lo: u8) -> Seg {
    Seg {
        field,
        hi,
        lo,
        reversed: false,
    }
}

/// A single bit.
const fn b(field: F, bit: u8) -> Seg {
    u(field, bit, bit)
}

/// Bits `hi..=lo`, stored high bit first.
const fn d(field: F, hi: u8, lo: u8) -> Seg {
    Seg {
        field,
        hi,
        lo,
        reversed: true,
    }
}

struct Mode {
    /// Mode bits as read LSB first (2 bits for values 0 and 1, else 5).
    value: u32,
    transformed: bool,
    two_regions: bool,
    /// Endpoint precision, then delta precision for R, G, B.
    bits: [u32; 4],
    layout: &'static [Seg],
}

use F::*;

#[rustfmt::skip]
const MODES: [Mode; 14] = [
    Mode { value: 0, transformed: true, two_regions: true, bits: [10, 5, 5, 5], layout: &[
        b(GY, 4), b(BY, 4), b(BZ, 4), u(RW, 9, 0), u(GW, 9, 0), u(BW, 9, 0), u(RX, 4, 0),
        b(GZ, 4), u(GY, 3, 0), u(GX, 4, 0), b(BZ, 0), u(GZ, 3, 0), u(BX, 4, 0), b(BZ, 1),
        u(BY, 3, 0), u(RY, 4, 0), b(BZ, 2), u(RZ, 4, 0), b(BZ, 3), u(D, 4, 0),
    ] },
    Mode { value: 1, transformed: true, two_regions: true, bits: [7, 6, 6, 6], layout: &[
        b(GY, 5), b(GZ, 4), b(GZ, 5), u(RW, 6, 0), b(BZ, 0), b(BZ, 1), b(BY, 4), u(GW, 6, 0),
        b(BY, 5), b(BZ, 2), b(GY, 4), u(BW, 6, 0), b(BZ, 3), b(BZ, 5), b(BZ, 4), u(RX, 5, 0),
        u(GY, 3, 0), u(GX, 5, 0), u(GZ, 3, 0), u(BX, 5, 0), u(BY, 3, 0), u(RY, 5, 0),
        u(RZ, 5, 0), u(D, 4, 0),
    ] },
    Mode { value: 2, transformed: true, two_regions: true, bits: [11, 5, 4, 4], layout: &[
        u(RW, 9, 0), u(GW, 9, 0), u(BW, 9, 0), u(RX, 4, 0), b(RW, 10), u(GY, 3, 0), u(GX, 3, 0),
        b(GW, 10), b(BZ, 0), u(GZ, 3, 0), u(BX, 3, 0), b(BW, 10), b(BZ, 1), u(BY, 3, 0),
        u(RY, 4, 0), b(BZ, 2), u(RZ, 4, 0), b(BZ, 3), u(D, 4, 0),
    ] },
    Mode { value: 6, transformed: true, two_regions: true, bits: [11, 4, 5, 4], layout: &[
        u(RW, 9, 0), u(GW, 9, 0), u(BW, 9, 0), u(RX, 3, 0), b(RW, 10), b(GZ, 4), u(GY, 3, 0),
        u(GX, 4, 0), b(GW, 10), u(GZ, 3, 0), u(BX, 3, 0), b(BW, 10), b(BZ, 1), u(BY, 3, 0),
        u(RY, 3, 0), b(BZ, 0), b(BZ, 2), u(RZ, 3, 0), b(GY, 4), b(BZ, 3), u(D, 4, 0),
    ] },
    Mode { value: 10, transformed: true, two_regions: true, bits: [11, 4, 4, 5], layout: &[
        u(RW, 9, 0), u(GW, 9, 0), u(BW, 9, 0), u(RX, 3, 0), b(RW, 10), b(BY, 4), u(GY, 3, 0),
        u(GX, 3, 0), b(GW, 10), b(BZ, 0), u(GZ, 3, 0), u(BX, 4, 0), b(BW, 10), u(BY, 3, 0),
        u(RY, 3, 0), b(BZ, 1), b(BZ, 2), u(RZ, 3, 0), b(BZ, 4), b(BZ, 3), u(D, 4, 0),
    ] },
    Mode { value: 14, transformed: true, two_regions: true, bits: [9, 5, 5, 5], layout: &[
        u(RW, 8, 0), b(BY, 4), u(GW, 8, 0), b(GY, 4), u(BW, 8, 0), b(BZ, 4), u(RX, 4, 0),
        b(GZ, 4), u(GY, 3, 0), u(GX, 4, 0), b(BZ, 0), u(GZ, 3, 0), u(BX, 4, 0), b(BZ, 1),
        u(BY, 3, 0), u(RY, 4, 0), b(BZ, 2), u(RZ, 4, 0), b(BZ, 3), u(D, 4, 0),
    ] },
    Mode { value: 18, transformed: true, two_regions: true, bits: [8, 6, 5, 5], layout: &[
        u(RW, 7, 0), b(GZ, 4), b(BY, 4), u(GW, 7, 0), b(BZ, 2), b(GY, 4), u(BW, 7, 0), b(BZ, 3),
        b(BZ, 4), u(RX, 5, 0), u(GY, 3, 0), u(GX, 4, 0), b(BZ, 0), u(GZ, 3, 0), u(BX, 4, 0),
        b(BZ, 1), u(BY, 3, 0), u(RY, 5, 0), u(RZ, 5, 0), u(D, 4, 0),
    ] },
    Mode { value: 22, transformed: true, two_regions: true, bits: [8, 5, 6, 5], layout: &[
        u(RW, 7, 0), b(BZ, 0), b(BY, 4), u(GW, 7, 0), b(GY, 5), b(GY, 4), u(BW, 7, 0), b(GZ, 5),
        b(BZ, 4), u(RX, 4, 0), b(GZ, 4), u(GY, 3, 0), u(GX, 5, 0), u(GZ, 3, 0), u(BX, 4, 0),
        b(BZ, 1), u(BY, 3, 0), u(RY, 4, 0), b(BZ, 2), u(RZ, 4, 0), b(BZ, 3), u(D, 4, 0),
    ] },
    Mode { value: 26, transformed: true, two_regions: true, bits: [8, 5, 5, 6], layout: &[
        u(RW, 7, 0), b(BZ, 1), b(BY, 4), u(GW, 7, 0), b(BY, 5), b(GY, 4), u(BW, 7, 0), b(BZ, 5),
        b(BZ, 4), u(RX, 4, 0), b(GZ, 4), u(GY, 3, 0), u(GX, 4, 0), b(BZ, 0), u(GZ, 3, 0),
        u(BX, 5, 0), u(BY, 3, 0), u(RY, 4, 0), b(BZ, 2), u(RZ, 4, 0), b(BZ, 3), u(D, 4, 0),
    ] },
    Mode { value: 30, transformed: false, two_regions: true, bits: [6, 6, 6, 6], layout: &[
        u(RW, 5, 0), b(GZ, 4), b(BZ, 0), b(BZ, 1), b(BY, 4), u(GW, 5, 0), b(GY, 5), b(BY, 5),
        b(BZ, 2), b(GY, 4), u(BW, 5, 0), b(GZ, 5), b(BZ, 3), b(BZ, 5), b(BZ, 4), u(RX, 5, 0),
        u(GY, 3, 0), u(GX, 5, 0), u(GZ, 3, 0), u(BX, 5, 0), u(BY, 3, 0), u(RY, 5, 0),
        u(RZ, 5, 0), u(D, 4, 0),
    ] },
    Mode { value: 3, transformed: false, two_regions: false, bits: [10, 10, 10, 10], layout: &[
        u(RW, 9, 0), u(GW, 9, 0), u(BW, 9, 0), u(RX, 9, 0), u(GX, 9, 0), u(BX, 9, 0),
    ] },
    Mode { value: 7, transformed: true, two_regions: false, bits: [11, 9, 9, 9], layout: &[
        u(RW, 9, 0), u(GW, 9, 0), u(BW, 9, 0), u(RX, 8, 0), b(RW, 10), u(GX, 8, 0), b(GW, 10),
        u(BX, 8, 0), b(BW, 10),
    ] },
    Mode { value: 11, transformed: true, two_regions: false, bits: [12, 8, 8, 8], layout: &[
        u(RW, 9, 0), u(GW, 9, 0), u(BW, 9, 0), u(RX, 7, 0), d(RW, 11, 10), u(GX, 7, 0),
        d(GW, 11, 10), u(BX, 7, 0), d(BW, 11, 10),
    ] },
    Mode { value: 15, transformed: true, two_regions: false, bits: [16, 4, 4, 4], layout: &[
        u(RW, 9, 0), u(GW, 9, 0), u(BW, 9, 0), u(RX, 3, 0), d(RW, 15, 10), u(GX, 3, 0),
        d(GW, 15, 10), u(BX, 3, 0), d(BW, 15, 10),
    ] },
];

/// Two-region shapes tried per block, best-fitting first.
const PARTITION_CANDIDATES: usize = 4;

impl Seg {
    fn bit_order(self) -> impl Iterator<Item = u8> {
        let (lo, hi, reversed) = (self.lo, self.hi, self.reversed);
        (0..=hi - lo).map(move |i| if reversed { hi - i } else { lo + i })
    }
}

fn sign_extend(v: i32, bits: u32) -> i32 {
    let shift = 32 - bits;
    (v << shift) >> shift
}

fn unquantize(x: i32, bits: u32, signed: bool) -> i32 {
    if !signed {
        if bits >= 15 || x == 0 {
            x
        } else if x == (1 << bits) - 1 {
            0xffff
        } else {
            ((x << 16) + 0x8000) >> bits
        }
    } else {
        if bits >= 16 {
            return x;
        }
        let (negative, mag) = if x < 0 { (true, -x) } else { (false, x) };
        let unq = if mag == 0 {
            0
        } else if mag >= (1 << (bits - 1)) - 1 {
            0x7fff
        } else {
            ((mag << 15) + 0x4000) >> (bits - 1)
        };
        if negative { -unq } else { unq }
    }
}

/// Scale an interpolated value to half-float bits.
fn finish(x: i32, signed: bool) -> u16 {
    if signed {
        let magnitude = ((x.abs() * 31) >> 5) as u16;
        // values that scale to zero lose their sign
        if x < 0 && magnitude != 0 {
            0x8000 | magnitude
        } else {
            magnitude
        }
    } else {
        ((x * 31) >> 6) as u16
    }
}

fn lerp(a: i32, b: i32, w: i32) -> i32 {
    (a * (64 - w) + b * w + 32) >> 6
}

pub(crate) fn decode_block(block: &[u8; BLOCK_BYTES], signed: bool) -> [[f32; 3]; 16] {
    let mut r = BitReader::new(block);
    let mut value = r.read(2);
    if value > 1 {
        value |= r.read(3) << 2;
    }
    let Some(mode) = MODES.iter().find(|m| m.value == value) else {
        // reserved mode
        return [[0.0; 3]; 16];
    };

    let mut fields = [0i32; 13];
    for seg in mode.layout {
        for bit in seg.bit_order() {
            fields[seg.field as usize] |= (r.read_bit() as i32) << bit;
        }
    }
    let f = |field: F| fields[field as usize];
    let [w_bits, dr, dg, db] = mode.bits;
    let delta_bits = [dr, dg, db];

    // endpoints[region*2 + end][channel]
    let mut ends = [[0i32; 3]; 4];
    let base = [f(RW), f(GW), f(BW)];
    let others = [[f(RX), f(GX), f(BX)], [f(RY), f(GY), f(BY)], [f(RZ), f(GZ), f(BZ)]];
    for c in 0..3 {
        ends[0][c] = if signed {
            sign_extend(base[c], w_bits)
        } else {
            base[c]
        };
        for (e, other) in others.iter().enumerate() {
            let mut v = other[c];
            if signed || mode.transformed {
                v = sign_extend(v, delta_bits[c]);
            }
            if mode.transformed {
                v = (base[c] + v) & ((1 << w_bits) - 1);
                if signed {
                    v = sign_extend(v, w_bits);
                }
            }
            ends[e + 1][c] = v;
        }
    }
    for e in ends.iter_mut() {
        for v in e.iter_mut() {
            *v = unquantize(*v, w_bits, signed);
        }
    }

    let partition = (f(D) & 31) as usize;
    let mut out = [[0.0f32; 3]; 16];
    for (texel, px) in out.iter_mut().enumerate() {
        let (region, weight) = if mode.two_regions {
            let anchor = texel == 0 || texel == usize::from(ANCHORS2[partition]);
            let idx = r.read(if anchor { 2 } else { 3 });
            let region = usize::from((PARTITIONS2[partition] >> texel) & 1 == 1);
            (region, WEIGHTS3[idx as usize])
        } else {
            let idx = r.read(if texel == 0 { 3 } else { 4 });
            (0, WEIGHTS4[idx as usize])
        };
        let (e0, e1) = (ends[region * 2], ends[region * 2 + 1]);
        for c in 0..3 {
            let bits = finish(lerp(e0[c], e1[c], weight), signed);
            px[c] = f16::from_bits(bits).to_f32();
        }
    }
    out
}

/// Half-float bit pattern of a non-negative finite value.
fn to_half_bits(v: f32) -> i32 {
    i32::from(f16::from_f32(v.max(0.0)).to_bits().min(MAX_HALF_BITS))
}

/// Half-float bits a `bits`-wide unsigned endpoint reconstructs to.
fn reconstruct(q: i32, bits: u32) -> i32 {
    i32::from(finish(unquantize(q, bits, false), false))
}

/// `bits`-wide endpoint whose reconstruction is closest to `h` (half bits)
/// without exceeding `ceiling`.
fn quantize_endpoint(h: f32, bits: u32, ceiling: i32) -> i32 {
    let max = (1i32 << bits) - 1;
    let x = h * 64.0 / 31.0;
    let guess = if bits >= 15 {
        x
    } else {
        x * (1u32 << bits) as f32 / 65536.0 - 0.5
    }
    .round() as i32;
    let mut q = (guess - 1..=guess + 1)
        .map(|q| q.clamp(0, max))
        .min_by(|&a, &b| {
            let ea = (reconstruct(a, bits) as f32 - h).abs();
            let eb = (reconstruct(b, bits) as f32 - h).abs();
            ea.total_cmp(&eb)
        })
        .unwrap_or(0);
    while q > 0 && reconstruct(q, bits) > ceiling {
        q -= 1;
    }
    q
}

/// Line fit for the texels of one region, in half bits.
#[derive(Clone, Copy)]
struct RegionFit {
    /// Principal-axis endpoints clamped to the region's per-channel range.
    ends: [[f32; 3]; 2],
    /// Per-channel maximum over the region.
    ceiling: [i32; 3],
    residual: f32,
}

fn fit_region(targets: &[[i32; 3]; 16], member: impl Fn(usize) -> bool) -> RegionFit {
    let mut points = [[0.0f32; 3]; 16];
    let mut n = 0;
    let mut lo = [i32::MAX; 3];
    let mut hi = [0i32; 3];
    for (i, t) in targets.iter().enumerate() {
        if !member(i) {
            continue;
        }
        for c in 0..3 {
            lo[c] = lo[c].min(t[c]);
            hi[c] = hi[c].max(t[c]);
        }
        points[n] = t.map(|v| v as f32);
        n += 1;
    }
    if n == 0 {
        return RegionFit {
            ends: [[0.0; 3]; 2],
            ceiling: [0; 3],
            residual: 0.0,
        };
    }
    let line = fit::principal_line(&points[..n]);
    let clamp = |e: [f32; 3]| -> [f32; 3] {
        core::array::from_fn(|c| e[c].clamp(lo[c] as f32, hi[c] as f32))
    };
    RegionFit {
        ends: [clamp(line.lo), clamp(line.hi)],
        ceiling: hi,
        residual: line.residual,
    }
}

fn region_of(mode: &Mode, partition: usize, texel: usize) -> usize {
    if mode.two_regions {
        usize::from((PARTITIONS2[partition] >> texel) & 1 == 1)
    } else {
        0
    }
}

fn is_anchor(mode: &Mode, partition: usize, texel: usize) -> bool {
    texel == 0 || (mode.two_regions && texel == usize::from(ANCHORS2[partition]))
}

/// Encode with one mode and fixed region fits. Returns the block and its
/// squared error, or `None` when the endpoints do not fit the mode's deltas.
fn encode_mode(
    mode: &Mode,
    targets: &[[i32; 3]; 16],
    partition: usize,
    fits: &[RegionFit; 2],
) -> Option<([u8; BLOCK_BYTES], i64)> {
    let [w_bits, ..] = mode.bits;
    let (regions, weights, index_bits): (usize, &[i32], u32) = if mode.two_regions {
        (2, &WEIGHTS3, 3)
    } else {
        (1, &WEIGHTS4, 4)
    };

    // endpoints as `[region * 2 + end][channel]`
    let mut q = [[0i32; 3]; 4];
    for (e, qe) in q.iter_mut().enumerate().take(regions * 2) {
        let fit = &fits[e / 2];
        *qe = core::array::from_fn(|c| {
            quantize_endpoint(fit.ends[e % 2][c], w_bits, fit.ceiling[c])
        });
    }
    let unq = q.map(|e| e.map(|v| unquantize(v, w_bits, false)));

    let mut indices = [0u32; 16];
    let mut error = 0i64;
    for (texel, (idx, t)) in indices.iter_mut().zip(targets).enumerate() {
        let r = region_of(mode, partition, texel);
        let mut best = (0usize, i64::MAX);
        for (i, &w) in weights.iter().enumerate() {
            let err: i64 = (0..3)
                .map(|c| {
                    let p = i32::from(finish(lerp(unq[2 * r][c], unq[2 * r + 1][c], w), false));
                    i64::from(t[c] - p).pow(2)
                })
                .sum();
            if err < best.1 {
                best = (i, err);
            }
        }
        *idx = best.0 as u32;
        error += best.1;
    }

    // anchor texels have an implicit leading zero bit
    let top = weights.len() as u32 - 1;
    for r in 0..regions {
        let anchor = if r == 0 { 0 } else { usize::from(ANCHORS2[partition]) };
        if indices[anchor] > top / 2 {
            q.swap(2 * r, 2 * r + 1);
            for (texel, idx) in indices.iter_mut().enumerate() {
                if region_of(mode, partition, texel) == r {
                    *idx = top - *idx;
                }
            }
        }
    }

    let slots = [[RW, GW, BW], [RX, GX, BX], [RY, GY, BY], [RZ, GZ, BZ]];
    let mut fields = [0i32; 13];
    for (e, slot) in slots.iter().enumerate().take(regions * 2) {
        for c in 0..3 {
            let mut v = q[e][c];
            if e > 0 && mode.transformed {
                let delta_bits = mode.bits[c + 1];
                let limit = 1 << (delta_bits - 1);
                let delta = v - q[0][c];
                if delta < -limit || delta >= limit {
                    return None;
                }
                v = delta & ((1 << delta_bits) - 1);
            }
            fields[slot[c] as usize] = v;
        }
    }
    fields[D as usize] = partition as i32;

    let mut w = BitWriter::default();
    w.write(mode.value, if mode.value < 2 { 2 } else { 5 });
    for seg in mode.layout {
        for bit in seg.bit_order() {
            w.write((fields[seg.field as usize] >> bit) as u32 & 1, 1);
        }
    }
    for (texel, &idx) in indices.iter().enumerate() {
        let bits = if is_anchor(mode, partition, texel) {
            index_bits - 1
        } else {
            index_bits
        };
        w.write(idx, bits);
    }
    debug_assert_eq!(w.position(), 128);
    Some((w.finish(), error))
}

/// Two-region partitions ordered by how well two lines fit the block,
/// with their region fits.
fn ranked_partitions(targets: &[[i32; 3]; 16]) -> [(usize, [RegionFit; 2]); PARTITION_CANDIDATES] {
    let mut scored: [(usize, [RegionFit; 2]); 32] = core::array::from_fn(|p| {
        let region = |texel: usize| usize::from((PARTITIONS2[p] >> texel) & 1 == 1);
        (
            p,
            [
                fit_region(targets, |t| region(t) == 0),
                fit_region(targets, |t| region(t) == 1),
            ],
        )
    });
    scored.sort_by(|a, b| {
        let ra = a.1[0].residual + a.1[1].residual;
        let rb = b.1[0].residual + b.1[1].residual;
        ra.total_cmp(&rb)
    });
    core::array::from_fn(|i| scored[i])
}

fn keep_better(best: &mut ([u8; BLOCK_BYTES], i64), candidate: Option<([u8; BLOCK_BYTES], i64)>) {
    if let Some(c) = candidate.filter(|c| c.1 < best.1) {
        *best = c;
    }
}

pub(crate) fn encode_block(texels: &[[f32; 3]; 16]) -> [u8; BLOCK_BYTES] {
    let targets: [[i32; 3]; 16] = texels.map(|t| t.map(to_half_bits));
    let mut best = ([0u8; BLOCK_BYTES], i64::MAX);

    let single = fit_region(&targets, |_| true);
    for mode in MODES.iter().filter(|m| !m.two_regions) {
        keep_better(&mut best, encode_mode(mode, &targets, 0, &[single; 2]));
    }
    if best.1 > 0 {
        for (partition, fits) in ranked_partitions(&targets) {
            for mode in MODES.iter().filter(|m| m.two_regions) {
                keep_better(&mut best, encode_mode(mode, &targets, partition, &fits));
            }
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_fill_the_header() {
        for mode in &MODES {
            let mode_bits = if mode.value < 2 { 2 } else { 5 };
            let header: u32 = mode
                .layout
                .iter()
                .map(|s| u32::from(s.hi - s.lo) + 1)
                .sum::<u32>()
                + mode_bits;
            let expected = if mode.two_regions { 82 } else { 65 };
            assert_eq!(header, expected, "mode value {}", mode.value);
        }
    }

    #[test]
    fn reserved_mode_is_black() {
        let mut w = BitWriter::default();
        w.write(19, 5);
        assert_eq!(decode_block(&w.finish(), false), [[0.0; 3]; 16]);
    }

    #[test]
    fn max_endpoint_is_max_half() {
        let mut w = BitWriter::default();
        w.write(3, 5);
        for _ in 0..6 {
            w.write(1023, 10);
        }
        let decoded = decode_block(&w.finish(), false);
        assert_eq!(decoded[0], [65504.0; 3]);
        assert_eq!(decoded[15], [65504.0; 3]);
    }

    #[test]
    fn mode14_reversed_high_bits() {
        // 16-bit base endpoint 0x7be0 reconstructs to exactly 1.0
        let base = 0x7be0u32;
        let mut w = BitWriter::default();
        w.write(15, 5);
        for _ in 0..3 {
            w.write(base & 0x3ff, 10);
        }
        for _ in 0..3 {
            w.write(0, 4);
            for bit in (10..16).rev() {
                w.write((base >> bit) & 1, 1);
            }
        }
        let decoded = decode_block(&w.finish(), false);
        assert!(decoded.iter().all(|px| *px == [1.0; 3]));
    }

    #[test]
    fn signed_finish_never_yields_negative_zero() {
        assert_eq!(finish(-1, true), 0);
        assert_eq!(finish(-2, true), 0x8001);
        assert_eq!(finish(-0x7fff, true), 0xfbff);
        assert_eq!(finish(0x7fff, true), 0x7bff);
    }

    #[test]
    fn signed_zero_block() {
        let mut w = BitWriter::default();
        w.write(3, 5);
        assert_eq!(decode_block(&w.finish(), true), [[0.0; 3]; 16]);
    }

    #[test]
    fn roundtrip_relative_error() {
        let texels: [[f32; 3]; 16] = core::array::from_fn(|i| {
            let (x, y) = ((i % 4) as f32, (i / 4) as f32);
            [0.5 + x / 32.0, 1.0 + y / 64.0, 2.0]
        });
        let decoded = decode_block(&encode_block(&texels), false);
        for (d, t) in decoded.iter().zip(&texels) {
            for c in 0..3 {
                assert!((d[c] - t[c]).abs() <= 0.05 * t[c].abs() + 0.01, "{d:?} vs {t:?}");
            }
        }
    }

    /// Deterministic HDR texels in `[0, 4)`.
    fn noise(seed: u32) -> [[f32; 3]; 16] {
        let mut state = seed;
        core::array::from_fn(|_| {
            core::array::from_fn(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (state >> 8) as f32 / (1u32 << 24) as f32 * 4.0
            })
        })
    }

    fn mode_of(block: &[u8; BLOCK_BYTES]) -> &'static Mode {
        let mut r = BitReader::new(block);
        let mut value = r.read(2);
        if value > 1 {
            value |= r.read(3) << 2;
        }
        MODES.iter().find(|m| m.value == value).unwrap()
    }

    #[test]
    fn quantized_endpoints_respect_ceiling() {
        for bits in [6, 7, 8, 9, 10, 11, 12, 16] {
            for h in [0.0f32, 1.0, 812.0, 15360.0, 17000.5, 31743.0] {
                let q = quantize_endpoint(h, bits, h as i32);
                assert!(reconstruct(q, bits) <= h as i32, "{bits} bits, {h}");
                let loose = quantize_endpoint(h, bits, i32::MAX);
                assert!(q <= loose);
            }
        }
        assert_eq!(reconstruct(quantize_endpoint(31743.0, 10, i32::MAX), 10), 31743);
    }

    #[test]
    fn three_primaries_split_into_regions() {
        // columns: red, red, green, blue
        let texels: [[f32; 3]; 16] = core::array::from_fn(|i| match i % 4 {
            0 | 1 => [1.0, 0.0, 0.0],
            2 => [0.0, 1.0, 0.0],
            _ => [0.0, 0.0, 1.0],
        });
        let block = encode_block(&texels);
        assert!(mode_of(&block).two_regions);
        let decoded = decode_block(&block, false);
        for (d, t) in decoded.iter().zip(&texels) {
            for c in 0..3 {
                assert!((d[c] - t[c]).abs() <= 0.15, "{d:?} vs {t:?}");
            }
        }
    }

    #[test]
    fn decoded_values_stay_below_block_max() {
        for seed in 0..20 {
            let texels = noise(seed);
            let decoded = decode_block(&encode_block(&texels), false);
            for c in 0..3 {
                let max = texels.iter().map(|t| t[c]).fold(0.0, f32::max);
                let out = decoded.iter().map(|t| t[c]).fold(0.0, f32::max);
                // the input itself rounds to half precision
                assert!(out <= max * (1.0 + 1.0 / 1024.0), "seed {seed}: {out} > {max}");
            }
            let mean_error = decoded
                .iter()
                .zip(&texels)
                .flat_map(|(d, t)| (0..3).map(move |c| (d[c] - t[c]).abs()))
                .sum::<f32>()
                / 48.0;
            assert!(mean_error < 1.0, "seed {seed}: {mean_error}");
        }
    }

    #[test]
    fn candidates_decode_to_their_estimated_error() {
        for seed in 0..10 {
            let texels = noise(seed).map(|t| t.map(|v| v * v * 16.0));
            let targets = texels.map(|t| t.map(to_half_bits));
            let single = fit_region(&targets, |_| true);
            for mode in &MODES {
                let partition = if mode.two_regions { seed as usize * 5 % 32 } else { 0 };
                let fits = if mode.two_regions {
                    let region = |t: usize| (PARTITIONS2[partition] >> t) & 1;
                    [
                        fit_region(&targets, |t| region(t) == 0),
                        fit_region(&targets, |t| region(t) == 1),
                    ]
                } else {
                    [single; 2]
                };
                let Some((block, estimate)) = encode_mode(mode, &targets, partition, &fits) else {
                    continue;
                };
                assert_eq!(mode_of(&block).value, mode.value);
                let decoded = decode_block(&block, false);
                let error: i64 = decoded
                    .iter()
                    .zip(&targets)
                    .flat_map(|(d, t)| {
                        (0..3).map(move |c| {
                            i64::from(i32::from(f16::from_f32(d[c]).to_bits()) - t[c]).pow(2)
                        })
                    })
                    .sum();
                assert_eq!(error, estimate, "mode value {}", mode.value);
            }
        }
    }

    #[test]
    fn negative_and_nan_clamp_to_zero() {
        let decoded = decode_block(&encode_block(&[[-3.0, f32::NAN, 0.0]; 16]), false);
        assert!(decoded.iter().all(|px| px.iter().all(|&v| v == 0.0)));
    }
}
