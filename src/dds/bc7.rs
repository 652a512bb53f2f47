//! BC7 codec.
//!
//! The decoder handles all eight modes. The encoder starts from mode 6 (one
//! subset, 4-bit indices). When a single line leaves error it searches the
//! best-fitting partitions: two and three subsets (modes 0 to 3) for opaque
//! blocks, two subsets in mode 7 for blocks with alpha. The candidate with
//! the lowest squared error wins.

use super::bits::{BitReader, BitWriter};
use super::fit;

pub(crate) const BLOCK_BYTES: usize = 16;

/// Per-mode field widths.
struct ModeInfo {
    /// Subsets.
    ns: usize,
    /// Partition bits.
    pb: u32,
    /// Rotation bits.
    rb: u32,
    /// Index-selection bits.
    isb: u32,
    /// Color bits per endpoint channel.
    cb: u32,
    /// Alpha bits per endpoint.
    ab: u32,
    /// Unique p-bit per endpoint.
    epb: bool,
    /// Shared p-bit per subset.
    spb: bool,
    /// Primary index bits.
    ib: u32,
    /// Secondary index bits.
    ib2: u32,
}

const fn mode(
    ns: usize,
    pb: u32,
    rb: u32,
    isb: u32,
    cb: u32,
    ab: u32,
    epb: u32,
    spb: u32,
    ib: u32,
    ib2: u32,
) -> ModeInfo {
    ModeInfo {
        ns,
        pb,
        rb,
        isb,
        cb,
        ab,
        epb: epb != 0,
        spb: spb != 0,
        ib,
        ib2,
    }
}

#[rustfmt::skip]
const MODES: [ModeInfo; 8] = [
    mode(3, 4, 0, 0, 4, 0, 1, 0, 3, 0),
    mode(2, 6, 0, 0, 6, 0, 0, 1, 3, 0),
    mode(3, 6, 0, 0, 5, 0, 0, 0, 2, 0),
    mode(2, 6, 0, 0, 7, 0, 1, 0, 2, 0),
    mode(1, 0, 2, 1, 5, 6, 0, 0, 2, 3),
    mode(1, 0, 2, 0, 7, 8, 0, 0, 2, 2),
    mode(1, 0, 0, 0, 7, 7, 1, 0, 4, 0),
    mode(2, 6, 0, 0, 5, 5, 1, 0, 2, 0),
];

const WEIGHTS2: [u32; 4] = [0, 21, 43, 64];
const WEIGHTS3: [u32; 8] = [0, 9, 18, 27, 37, 46, 55, 64];
const WEIGHTS4: [u32; 16] = [0, 4, 9, 13, 17, 21, 26, 30, 34, 38, 43, 47, 51, 55, 60, 64];

/// Two-subset partitions, one bit per texel. The first 32 entries are
/// shared with BC6H.
#[rustfmt::skip]
pub(crate) const PARTITIONS2: [u16; 64] = [
    0xCCCC, 0x8888, 0xEEEE, 0xECC8, 0xC880, 0xFEEC, 0xFEC8, 0xEC80,
    0xC800, 0xFFEC, 0xFE80, 0xE800, 0xFFE8, 0xFF00, 0xFFF0, 0xF000,
    0xF710, 0x008E, 0x7100, 0x08CE, 0x008C, 0x7310, 0x3100, 0x8CCE,
    0x088C, 0x3110, 0x6666, 0x366C, 0x17E8, 0x0FF0, 0x718E, 0x399C,
    0xaaaa, 0xf0f0, 0x5a5a, 0x33cc, 0x3c3c, 0x55aa, 0x9696, 0xa55a,
    0x73ce, 0x13c8, 0x324c, 0x3bdc, 0x6996, 0xc33c, 0x9966, 0x0660,
    0x0272, 0x04e4, 0x4e40, 0x2720, 0xc936, 0x936c, 0x39c6, 0x639c,
    0x9336, 0x9cc6, 0x817e, 0xe718, 0xccf0, 0x0fcc, 0x7744, 0xee22,
];

/// Three-subset partitions, two bits per texel.
#[rustfmt::skip]
const PARTITIONS3: [u32; 64] = [
    0xaa685050, 0x6a5a5040, 0x5a5a4200, 0x5450a0a8, 0xa5a50000, 0xa0a05050, 0x5555a0a0, 0x5a5a5050,
    0xaa550000, 0xaa555500, 0xaaaa5500, 0x90909090, 0x94949494, 0xa4a4a4a4, 0xa9a59450, 0x2a0a4250,
    0xa5945040, 0x0a425054, 0xa5a5a500, 0x55a0a0a0, 0xa8a85454, 0x6a6a4040, 0xa4a45000, 0x1a1a0500,
    0x0050a4a4, 0xaaa59090, 0x14696914, 0x69691400, 0xa08585a0, 0xaa821414, 0x50a4a450, 0x6a5a0200,
    0xa9a58000, 0x5090a0a8, 0xa8a09050, 0x24242424, 0x00aa5500, 0x24924924, 0x24499224, 0x50a50a50,
    0x500aa550, 0xaaaa4444, 0x66660000, 0xa5a0a5a0, 0x50a050a0, 0x69286928, 0x44aaaa44, 0x66666600,
    0xaa444444, 0x54a854a8, 0x95809580, 0x96969600, 0xa85454a8, 0x80959580, 0xaa141414, 0x96960000,
    0xaaaa1414, 0xa05050a0, 0xa0a5a5a0, 0x96000000, 0x40804080, 0xa9a8a9a8, 0xaaaaaa44, 0x2a4a5254,
];

/// Anchor texel of subset 1 in two-subset partitions.
#[rustfmt::skip]
pub(crate) const ANCHORS2: [u8; 64] = [
    15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,
    15,  2,  8,  2,  2,  8,  8, 15,  2,  8,  2,  2,  8,  8,  2,  2,
    15, 15,  6,  8,  2,  8, 15, 15,  2,  8,  2,  2,  2, 15, 15,  6,
     6,  2,  6,  8, 15, 15,  2,  2, 15, 15, 15, 15, 15,  2,  2, 15,
];

/// Anchor texel of subset 1 in three-subset partitions.
#[rustfmt::skip]
const ANCHORS3_1: [u8; 64] = [
     3,  3, 15, 15,  8,  3, 15, 15,  8,  8,  6,  6,  6,  5,  3,  3,
     3,  3,  8, 15,  3,  3,  6, 10,  5,  8,  8,  6,  8,  5, 15, 15,
     8, 15,  3,  5,  6, 10,  8, 15, 15,  3, 15,  5, 15, 15, 15, 15,
     3, 15,  5,  5,  5,  8,  5, 10,  5, 10,  8, 13, 15, 12,  3,  3,
];

/// Anchor texel of subset 2 in three-subset partitions.
#[rustfmt::skip]
const ANCHORS3_2: [u8; 64] = [
    15,  8,  8,  3, 15, 15,  3,  8, 15, 15, 15, 15, 15, 15, 15,  8,
    15,  8, 15,  3, 15,  8, 15,  8,  3, 15,  6, 10, 15, 15, 10,  8,
    15,  3, 15, 10, 10,  8,  9, 10,  6, 15,  8, 15,  3,  6,  6,  8,
    15,  3, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,  3, 15, 15,  8,
];

fn weights(bits: u32) -> &'static [u32] {
    match bits {
        2 => &WEIGHTS2,
        3 => &WEIGHTS3,
        _ => &WEIGHTS4,
    }
}

fn interpolate(e0: u32, e1: u32, w: u32) -> u8 {
    (((64 - w) * e0 + w * e1 + 32) >> 6) as u8
}

/// Expand a `bits`-wide endpoint value to 8 bits by bit replication.
fn expand(v: u32, bits: u32) -> u32 {
    if bits >= 8 {
        return v;
    }
    (v << (8 - bits)) | (v >> (2 * bits).saturating_sub(8))
}

fn subset_of(info: &ModeInfo, partition: usize, texel: usize) -> usize {
    match info.ns {
        2 => usize::from((PARTITIONS2[partition] >> texel) & 1 == 1),
        3 => ((PARTITIONS3[partition] >> (2 * texel)) & 3) as usize,
        _ => 0,
    }
}

fn is_anchor(info: &ModeInfo, partition: usize, texel: usize) -> bool {
    texel == 0
        || match info.ns {
            2 => texel == usize::from(ANCHORS2[partition]),
            3 => {
                texel == usize::from(ANCHORS3_1[partition])
                    || texel == usize::from(ANCHORS3_2[partition])
            }
            _ => false,
        }
}

pub(crate) fn decode_block(block: &[u8; BLOCK_BYTES]) -> [[u8; 4]; 16] {
    let mode_index = block[0].trailing_zeros() as usize;
    let Some(info) = MODES.get(mode_index) else {
        // reserved mode
        return [[0; 4]; 16];
    };

    let mut r = BitReader::new(block);
    r.read(mode_index as u32 + 1);
    let partition = r.read(info.pb) as usize;
    let rotation = r.read(info.rb);
    let index_selection = r.read(info.isb);

    let endpoints = info.ns * 2;
    let mut ep = [[0u32; 4]; 6];
    for channel in 0..3 {
        for e in ep.iter_mut().take(endpoints) {
            e[channel] = r.read(info.cb);
        }
    }
    for e in ep.iter_mut().take(endpoints) {
        e[3] = if info.ab > 0 { r.read(info.ab) } else { 255 };
    }

    let mut pbits = [0u32; 6];
    if info.epb {
        for p in pbits.iter_mut().take(endpoints) {
            *p = r.read_bit();
        }
    } else if info.spb {
        for s in 0..info.ns {
            let p = r.read_bit();
            pbits[2 * s] = p;
            pbits[2 * s + 1] = p;
        }
    }
    let has_pbit = info.epb || info.spb;
    for (e, &p) in ep.iter_mut().zip(&pbits).take(endpoints) {
        for c in 0..3 {
            e[c] = if has_pbit {
                expand((e[c] << 1) | p, info.cb + 1)
            } else {
                expand(e[c], info.cb)
            };
        }
        if info.ab > 0 {
            e[3] = if has_pbit {
                expand((e[3] << 1) | p, info.ab + 1)
            } else {
                expand(e[3], info.ab)
            };
        }
    }

    let mut primary = [0u32; 16];
    for (texel, idx) in primary.iter_mut().enumerate() {
        let bits = if is_anchor(info, partition, texel) {
            info.ib - 1
        } else {
            info.ib
        };
        *idx = r.read(bits);
    }
    let mut secondary = [0u32; 16];
    if info.ib2 > 0 {
        for (texel, idx) in secondary.iter_mut().enumerate() {
            *idx = r.read(if texel == 0 { info.ib2 - 1 } else { info.ib2 });
        }
    }

    core::array::from_fn(|texel| {
        let s = subset_of(info, partition, texel);
        let (e0, e1) = (ep[2 * s], ep[2 * s + 1]);
        let (color_w, alpha_w) = if info.ib2 == 0 {
            let w = weights(info.ib)[primary[texel] as usize];
            (w, w)
        } else if index_selection == 0 {
            (
                weights(info.ib)[primary[texel] as usize],
                weights(info.ib2)[secondary[texel] as usize],
            )
        } else {
            (
                weights(info.ib2)[secondary[texel] as usize],
                weights(info.ib)[primary[texel] as usize],
            )
        };
        let mut px = [
            interpolate(e0[0], e1[0], color_w),
            interpolate(e0[1], e1[1], color_w),
            interpolate(e0[2], e1[2], color_w),
            interpolate(e0[3], e1[3], alpha_w),
        ];
        match rotation {
            1 => px.swap(0, 3),
            2 => px.swap(1, 3),
            3 => px.swap(2, 3),
            _ => {}
        }
        px
    })
}

/// Partition shapes tried per subset count, best-fitting first.
const PARTITION_CANDIDATES: usize = 4;

/// Subset counts searched and the modes tried for each.
const OPAQUE_SEARCH: [(usize, &[usize]); 2] = [(2, &[1, 3]), (3, &[0, 2])];
const ALPHA_SEARCH: [(usize, &[usize]); 1] = [(2, &[7])];

/// Texels of one subset of a partitioned block.
struct Subset {
    texels: [usize; 16],
    points: [[f32; 4]; 16],
    len: usize,
}

impl Subset {
    fn gather(texels: &[[u8; 4]; 16], info: &ModeInfo, partition: usize, subset: usize) -> Self {
        let mut out = Subset {
            texels: [0; 16],
            points: [[0.0; 4]; 16],
            len: 0,
        };
        for (i, t) in texels.iter().enumerate() {
            if subset_of(info, partition, i) == subset {
                out.texels[out.len] = i;
                out.points[out.len] = t.map(f32::from);
                out.len += 1;
            }
        }
        out
    }

    fn texels(&self) -> &[usize] {
        &self.texels[..self.len]
    }

    fn points(&self) -> &[[f32; 4]] {
        &self.points[..self.len]
    }
}

/// A fully quantized block in one mode, ready to pack.
#[derive(Clone, Copy)]
struct Encoding {
    mode: usize,
    partition: usize,
    /// Endpoints as stored, `[subset * 2 + end][channel]`, without p-bits.
    q: [[u32; 4]; 6],
    /// P-bit per endpoint.
    p: [u32; 6],
    indices: [u32; 16],
    /// Summed squared RGBA error.
    error: u32,
}

/// Quantized endpoints and indices for one subset.
struct SubsetFit {
    q: [[u32; 4]; 2],
    p: [u32; 2],
    /// Indices in subset member order.
    indices: [u32; 16],
    error: u32,
}

/// Endpoint channel value after p-bit insertion and bit expansion.
fn unpack_channel(info: &ModeInfo, q: u32, p: u32, channel: usize) -> u32 {
    let bits = if channel == 3 { info.ab } else { info.cb };
    if bits == 0 {
        255
    } else if info.epb || info.spb {
        expand((q << 1) | p, bits + 1)
    } else {
        expand(q, bits)
    }
}

/// Stored value whose expansion lands closest to `v`.
fn quantize_channel(info: &ModeInfo, v: f32, p: u32, channel: usize) -> u32 {
    let bits = if channel == 3 { info.ab } else { info.cb };
    if bits == 0 {
        return 0;
    }
    let v = v.clamp(0.0, 255.0);
    let max = (1u32 << bits) - 1;
    let guess = (v * max as f32 / 255.0).round() as u32;
    (guess.saturating_sub(1)..=(guess + 1).min(max))
        .min_by(|&a, &b| {
            let ea = (unpack_channel(info, a, p, channel) as f32 - v).abs();
            let eb = (unpack_channel(info, b, p, channel) as f32 - v).abs();
            ea.total_cmp(&eb)
        })
        .unwrap_or(0)
}

fn quantize_subset(
    info: &ModeInfo,
    texels: &[[u8; 4]; 16],
    members: &[usize],
    lo: &[f32; 4],
    hi: &[f32; 4],
) -> SubsetFit {
    let pbits: &[[u32; 2]] = if info.epb {
        &[[0, 0], [0, 1], [1, 0], [1, 1]]
    } else if info.spb {
        &[[0, 0], [1, 1]]
    } else {
        &[[0, 0]]
    };
    let w = weights(info.ib);
    let mut best: Option<SubsetFit> = None;
    for &p in pbits {
        let q: [[u32; 4]; 2] = [
            core::array::from_fn(|c| quantize_channel(info, lo[c], p[0], c)),
            core::array::from_fn(|c| quantize_channel(info, hi[c], p[1], c)),
        ];
        let e0: [u32; 4] = core::array::from_fn(|c| unpack_channel(info, q[0][c], p[0], c));
        let e1: [u32; 4] = core::array::from_fn(|c| unpack_channel(info, q[1][c], p[1], c));

        let mut indices = [0u32; 16];
        let mut error = 0u32;
        for (idx, &texel) in indices.iter_mut().zip(members) {
            let t = texels[texel];
            let mut pick = (0usize, u32::MAX);
            for (i, &weight) in w.iter().enumerate() {
                let err: u32 = (0..4)
                    .map(|c| u32::from(t[c].abs_diff(interpolate(e0[c], e1[c], weight))).pow(2))
                    .sum();
                if err < pick.1 {
                    pick = (i, err);
                }
            }
            *idx = pick.0 as u32;
            error += pick.1;
        }
        if best.as_ref().is_none_or(|b| error < b.error) {
            best = Some(SubsetFit {
                q,
                p,
                indices,
                error,
            });
        }
    }
    best.unwrap_or(SubsetFit {
        q: [[0; 4]; 2],
        p: [0; 2],
        indices: [0; 16],
        error: u32::MAX,
    })
}

fn fit_subset(info: &ModeInfo, texels: &[[u8; 4]; 16], subset: &Subset) -> SubsetFit {
    let line = fit::principal_line(subset.points());
    let fitted = quantize_subset(info, texels, subset.texels(), &line.lo, &line.hi);
    if fitted.error == 0 {
        return fitted;
    }

    // one least-squares pass over the chosen indices
    let w = weights(info.ib);
    let mut ratios = [0.0f32; 16];
    for (r, &idx) in ratios.iter_mut().zip(&fitted.indices).take(subset.len) {
        *r = w[idx as usize] as f32 / 64.0;
    }
    match fit::least_squares_endpoints(subset.points(), &ratios[..subset.len]) {
        Some((lo, hi)) => {
            let refined = quantize_subset(info, texels, subset.texels(), &lo, &hi);
            if refined.error < fitted.error {
                refined
            } else {
                fitted
            }
        }
        None => fitted,
    }
}

fn anchor_of(info: &ModeInfo, partition: usize, subset: usize) -> usize {
    match (info.ns, subset) {
        (_, 0) => 0,
        (2, _) => usize::from(ANCHORS2[partition]),
        (3, 1) => usize::from(ANCHORS3_1[partition]),
        _ => usize::from(ANCHORS3_2[partition]),
    }
}

fn encode_candidate(texels: &[[u8; 4]; 16], mode: usize, partition: usize) -> Encoding {
    let info = &MODES[mode];
    let mut enc = Encoding {
        mode,
        partition,
        q: [[0; 4]; 6],
        p: [0; 6],
        indices: [0; 16],
        error: 0,
    };
    let top = (1u32 << info.ib) - 1;
    for s in 0..info.ns {
        let subset = Subset::gather(texels, info, partition, s);
        let mut fitted = fit_subset(info, texels, &subset);

        // anchor texels have an implicit leading zero bit
        let anchor = anchor_of(info, partition, s);
        let anchor_slot = subset.texels().iter().position(|&t| t == anchor);
        if anchor_slot.is_some_and(|slot| fitted.indices[slot] > top / 2) {
            fitted.q.swap(0, 1);
            fitted.p.swap(0, 1);
            for idx in fitted.indices.iter_mut().take(subset.len) {
                *idx = top - *idx;
            }
        }

        enc.q[2 * s] = fitted.q[0];
        enc.q[2 * s + 1] = fitted.q[1];
        enc.p[2 * s] = fitted.p[0];
        enc.p[2 * s + 1] = fitted.p[1];
        for (&texel, &idx) in subset.texels().iter().zip(&fitted.indices) {
            enc.indices[texel] = idx;
        }
        enc.error = enc.error.saturating_add(fitted.error);
    }
    enc
}

fn pack(enc: &Encoding) -> [u8; BLOCK_BYTES] {
    let info = &MODES[enc.mode];
    let endpoints = info.ns * 2;
    let mut w = BitWriter::default();
    w.write(1 << enc.mode, enc.mode as u32 + 1);
    w.write(enc.partition as u32, info.pb);
    w.write(0, info.rb);
    w.write(0, info.isb);
    for c in 0..3 {
        for e in &enc.q[..endpoints] {
            w.write(e[c], info.cb);
        }
    }
    for e in &enc.q[..endpoints] {
        w.write(e[3], info.ab);
    }
    if info.epb {
        for &p in &enc.p[..endpoints] {
            w.write(p, 1);
        }
    } else if info.spb {
        for s in 0..info.ns {
            w.write(enc.p[2 * s], 1);
        }
    }
    for (texel, &idx) in enc.indices.iter().enumerate() {
        let bits = if is_anchor(info, enc.partition, texel) {
            info.ib - 1
        } else {
            info.ib
        };
        w.write(idx, bits);
    }
    debug_assert_eq!(w.position(), 128);
    w.finish()
}

/// Partitions into `subsets` parts, ordered by how well one line per
/// subset fits the block.
fn ranked_partitions(texels: &[[u8; 4]; 16], subsets: usize) -> [usize; PARTITION_CANDIDATES] {
    let info = if subsets == 2 { &MODES[1] } else { &MODES[0] };
    let mut scored: [(f32, usize); 64] = core::array::from_fn(|p| {
        let residual: f32 = (0..subsets)
            .map(|s| fit::principal_line(Subset::gather(texels, info, p, s).points()).residual)
            .sum();
        (residual, p)
    });
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    core::array::from_fn(|i| scored[i].1)
}

pub(crate) fn encode_block(texels: &[[u8; 4]; 16]) -> [u8; BLOCK_BYTES] {
    let mut best = encode_candidate(texels, 6, 0);
    if best.error > 0 {
        let opaque = texels.iter().all(|t| t[3] == 255);
        let searches = if opaque {
            &OPAQUE_SEARCH[..]
        } else {
            &ALPHA_SEARCH[..]
        };
        for &(subsets, modes) in searches {
            for partition in ranked_partitions(texels, subsets) {
                // mode 0 only addresses the first 16 shapes
                for &mode in modes.iter().filter(|&&m| partition < 1 << MODES[m].pb) {
                    let candidate = encode_candidate(texels, mode, partition);
                    if candidate.error < best.error {
                        best = candidate;
                    }
                }
            }
        }
    }
    pack(&best)
}
