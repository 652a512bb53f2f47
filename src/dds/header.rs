//! DDS header parsing and serialization.
//!
//! Layout: `"DDS "`, a 124-byte `DDS_HEADER` (with an embedded 32-byte pixel
//! format), and optionally a 20-byte `DDS_HEADER_DXT10` when the FourCC is
//! `DX10`. All fields are little-endian.

use bitflags::bitflags;

use crate::error::ImageError;
use crate::pixel::PixelFormat;

pub(crate) const MAGIC: &[u8; 4] = b"DDS ";
pub(crate) const HEADER_SIZE: usize = 124;
pub(crate) const DX10_SIZE: usize = 20;
const PIXEL_FORMAT_SIZE: u32 = 32;

/// Written to `reserved1[9]` so this crate can recognize its own files.
const CRATE_TAG: u32 = u32::from_le_bytes(*b"ZNIF");
/// `reserved1[10]` value: an RGBA16 payload that was RGB16 in memory.
const TAG_RGB16: u32 = 1;

const DXGI_RESOURCE_TEXTURE2D: u32 = 3;
const DXGI_RESOURCE_TEXTURE3D: u32 = 4;
const DXGI_MISC_TEXTURECUBE: u32 = 0x4;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) struct HeaderFlags: u32 {
        const CAPS = 0x1;
        const HEIGHT = 0x2;
        const WIDTH = 0x4;
        const PITCH = 0x8;
        const PIXEL_FORMAT = 0x1000;
        const MIPMAP_COUNT = 0x2_0000;
        const LINEAR_SIZE = 0x8_0000;
        const DEPTH = 0x80_0000;
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) struct Caps: u32 {
        const COMPLEX = 0x8;
        const TEXTURE = 0x1000;
        const MIPMAP = 0x40_0000;
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) struct Caps2: u32 {
        const CUBEMAP = 0x200;
        const POSITIVE_X = 0x400;
        const NEGATIVE_X = 0x800;
        const POSITIVE_Y = 0x1000;
        const NEGATIVE_Y = 0x2000;
        const POSITIVE_Z = 0x4000;
        const NEGATIVE_Z = 0x8000;
        const VOLUME = 0x20_0000;

        const ALL_FACES = Self::POSITIVE_X.bits()
            | Self::NEGATIVE_X.bits()
            | Self::POSITIVE_Y.bits()
            | Self::NEGATIVE_Y.bits()
            | Self::POSITIVE_Z.bits()
            | Self::NEGATIVE_Z.bits();
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) struct PixelFlags: u32 {
        const ALPHA_PIXELS = 0x1;
        const ALPHA = 0x2;
        const FOUR_CC = 0x4;
        const RGB = 0x40;
        const LUMINANCE = 0x2_0000;
    }
}

/// How a surface's bytes are laid out on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SurfaceFormat {
    /// Raw samples in canonical channel order, little-endian.
    Plain(PixelFormat),
    /// RGBA16 on disk, RGB16 in memory.
    Rgb16Tagged,
    /// B, G, R, A/X byte order. Without alpha the fourth byte is ignored.
    Bgra8 { alpha: bool },
    /// Legacy 24-bit B, G, R.
    Bgr8,
    /// Half floats, with the channel count (1, 2 or 4).
    Half(usize),
    Bc1,
    Bc2,
    Bc3,
    Bc4,
    Bc5,
    Bc6h { signed: bool },
    Bc7,
}

impl SurfaceFormat {
    /// Encoded block size for block-compressed formats.
    pub(crate) fn block_bytes(self) -> Option<usize> {
        match self {
            Self::Bc1 | Self::Bc4 => Some(8),
            Self::Bc2 | Self::Bc3 | Self::Bc5 | Self::Bc6h { .. } | Self::Bc7 => Some(16),
            _ => None,
        }
    }

    fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Plain(f) => f.bytes_per_pixel(),
            Self::Rgb16Tagged => 8,
            Self::Bgra8 { .. } => 4,
            Self::Bgr8 => 3,
            Self::Half(n) => 2 * n,
            _ => 0,
        }
    }

    /// Bytes of one `width` x `height` surface, or `None` on overflow.
    pub(crate) fn surface_size(self, width: u32, height: u32) -> Option<usize> {
        match self.block_bytes() {
            Some(block) => (width.div_ceil(4) as usize)
                .checked_mul(height.div_ceil(4) as usize)?
                .checked_mul(block),
            None => (width as usize)
                .checked_mul(height as usize)?
                .checked_mul(self.bytes_per_pixel()),
        }
    }

    /// Row pitch (uncompressed) or top-level linear size (compressed).
    fn pitch_or_linear_size(self, width: u32, height: u32) -> u32 {
        let size = match self.block_bytes() {
            Some(_) => self.surface_size(width, height),
            None => (width as usize).checked_mul(self.bytes_per_pixel()),
        };
        size.and_then(|s| u32::try_from(s).ok()).unwrap_or(0)
    }

    /// The in-memory format a decoded surface ends up in.
    pub(crate) fn output_format(self) -> PixelFormat {
        match self {
            Self::Plain(f) => f,
            Self::Rgb16Tagged => PixelFormat::RGB16,
            Self::Bgra8 { .. } => PixelFormat::RGBA8,
            Self::Bgr8 => PixelFormat::RGB8,
            Self::Half(1) => PixelFormat::R32F,
            Self::Half(2) => PixelFormat::RG32F,
            Self::Half(_) => PixelFormat::RGBA32F,
            Self::Bc4 => PixelFormat::R8,
            Self::Bc5 => PixelFormat::RG8,
            Self::Bc6h { .. } => PixelFormat::RGBA32F,
            Self::Bc1 | Self::Bc2 | Self::Bc3 | Self::Bc7 => PixelFormat::RGBA8,
        }
    }
}

/// Map a DXGI_FORMAT code to a surface format and its sRGB flag.
fn from_dxgi(code: u32) -> Option<(SurfaceFormat, bool)> {
    use SurfaceFormat::*;
    let plain = |f| Some((Plain(f), false));
    match code {
        2 => plain(PixelFormat::RGBA32F),
        6 => plain(PixelFormat::RGB32F),
        10 => Some((Half(4), false)),
        11 => plain(PixelFormat::RGBA16),
        16 => plain(PixelFormat::RG32F),
        28 => plain(PixelFormat::RGBA8),
        29 => Some((Plain(PixelFormat::RGBA8), true)),
        34 => Some((Half(2), false)),
        41 => plain(PixelFormat::R32F),
        49 => plain(PixelFormat::RG8),
        54 => Some((Half(1), false)),
        56 => plain(PixelFormat::R16),
        61 => plain(PixelFormat::R8),
        70 | 71 => Some((Bc1, false)),
        72 => Some((Bc1, true)),
        73 | 74 => Some((Bc2, false)),
        75 => Some((Bc2, true)),
        76 | 77 => Some((Bc3, false)),
        78 => Some((Bc3, true)),
        79 | 80 => Some((Bc4, false)),
        82 | 83 => Some((Bc5, false)),
        87 => Some((Bgra8 { alpha: true }, false)),
        88 => Some((Bgra8 { alpha: false }, false)),
        91 => Some((Bgra8 { alpha: true }, true)),
        93 => Some((Bgra8 { alpha: false }, true)),
        94 | 95 => Some((Bc6h { signed: false }, false)),
        96 => Some((Bc6h { signed: true }, false)),
        97 | 98 => Some((Bc7, false)),
        99 => Some((Bc7, true)),
        _ => None,
    }
}

/// DXGI code this crate writes for a surface format, or `None` when the
/// format needs a legacy header (RGB8, BGR8).
fn to_dxgi(format: SurfaceFormat, srgb: bool) -> Option<u32> {
    use SurfaceFormat::*;
    Some(match format {
        Plain(PixelFormat::R8) => 61,
        Plain(PixelFormat::RG8) => 49,
        Plain(PixelFormat::RGBA8) if srgb => 29,
        Plain(PixelFormat::RGBA8) => 28,
        Plain(PixelFormat::R16) => 56,
        Plain(PixelFormat::RGBA16) | Rgb16Tagged => 11,
        Plain(PixelFormat::R32F) => 41,
        Plain(PixelFormat::RG32F) => 16,
        Plain(PixelFormat::RGB32F) => 6,
        Plain(PixelFormat::RGBA32F) => 2,
        Half(1) => 54,
        Half(2) => 34,
        Half(_) => 10,
        Bgra8 { alpha: true } if srgb => 91,
        Bgra8 { alpha: true } => 87,
        Bgra8 { alpha: false } if srgb => 93,
        Bgra8 { alpha: false } => 88,
        Bc1 if srgb => 72,
        Bc1 => 71,
        Bc2 if srgb => 75,
        Bc2 => 74,
        Bc3 if srgb => 78,
        Bc3 => 77,
        Bc4 => 80,
        Bc5 => 83,
        Bc6h { signed: false } => 95,
        Bc6h { signed: true } => 96,
        Bc7 if srgb => 99,
        Bc7 => 98,
        _ => return None,
    })
}

/// Legacy FourCC codes, including the numeric D3DFMT values some writers
/// store in the FourCC field.
fn from_four_cc(four_cc: [u8; 4]) -> Option<SurfaceFormat> {
    use SurfaceFormat::*;
    Some(match &four_cc {
        b"DXT1" => Bc1,
        b"DXT2" | b"DXT3" => Bc2,
        b"DXT4" | b"DXT5" => Bc3,
        b"ATI1" | b"BC4U" => Bc4,
        b"ATI2" | b"BC5U" => Bc5,
        _ => match u32::from_le_bytes(four_cc) {
            36 => Plain(PixelFormat::RGBA16),
            111 => Half(1),
            112 => Half(2),
            113 => Half(4),
            114 => Plain(PixelFormat::R32F),
            115 => Plain(PixelFormat::RG32F),
            116 => Plain(PixelFormat::RGBA32F),
            _ => return None,
        },
    })
}

/// Uncompressed legacy pixel formats described by bit masks.
fn from_masks(flags: PixelFlags, bit_count: u32, masks: [u32; 4]) -> Option<SurfaceFormat> {
    use SurfaceFormat::*;
    let [r, g, b, a] = masks;
    let has_alpha = flags.contains(PixelFlags::ALPHA_PIXELS) && a != 0;
    if flags.contains(PixelFlags::RGB) {
        return match (bit_count, r, g, b) {
            (24, 0xff, 0xff00, 0xff_0000) => Some(Plain(PixelFormat::RGB8)),
            (24, 0xff_0000, 0xff00, 0xff) => Some(Bgr8),
            (32, 0xff, 0xff00, 0xff_0000) if has_alpha => Some(Plain(PixelFormat::RGBA8)),
            (32, 0xff_0000, 0xff00, 0xff) => Some(Bgra8 { alpha: has_alpha }),
            _ => None,
        };
    }
    if flags.contains(PixelFlags::LUMINANCE) {
        return match (bit_count, r) {
            (8, 0xff) => Some(Plain(PixelFormat::R8)),
            (16, 0xffff) => Some(Plain(PixelFormat::R16)),
            _ => None,
        };
    }
    None
}

/// Surface arrangement within the file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Layout {
    Texture2D,
    /// Six faces, each followed by its mip chain.
    Cube,
    /// `depth` slices at level 0, then the smaller levels.
    Volume { depth: u32 },
}

/// Parsed DDS header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct DdsHeader {
    pub width: u32,
    pub height: u32,
    /// Levels per face (at least 1).
    pub mip_count: u32,
    pub format: SurfaceFormat,
    pub srgb: bool,
    pub layout: Layout,
    /// Offset of the first surface byte.
    pub data_offset: usize,
}

fn u32_at(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn malformed(msg: impl Into<String>) -> ImageError {
    ImageError::MalformedContainer(msg.into())
}

impl DdsHeader {
    /// Parse and validate magic, header and optional DX10 header.
    ///
    /// Does not look at the payload; use [`DdsHeader::check_payload`] for that.
    pub(crate) fn parse(data: &[u8]) -> Result<Self, ImageError> {
        if data.len() < MAGIC.len() {
            return Err(ImageError::UnexpectedEof);
        }
        if &data[..4] != MAGIC {
            return Err(malformed("missing DDS magic"));
        }
        if data.len() < 4 + HEADER_SIZE {
            return Err(ImageError::UnexpectedEof);
        }
        let h = &data[4..4 + HEADER_SIZE];
        let field = |index: usize| u32_at(h, index * 4);

        if field(0) != HEADER_SIZE as u32 {
            return Err(malformed(format!("header size {}", field(0))));
        }
        let height = field(2);
        let width = field(3);
        let depth = field(5);
        let mip_count = field(6).max(1);
        if width == 0 || height == 0 {
            return Err(malformed(format!("zero dimension {width}x{height}")));
        }
        if mip_count > 32 {
            return Err(malformed(format!("mip count {mip_count}")));
        }

        // pixel format at byte 72
        let pf = |index: usize| u32_at(h, 72 + index * 4);
        if pf(0) != PIXEL_FORMAT_SIZE {
            return Err(malformed(format!("pixel format size {}", pf(0))));
        }
        let pixel_flags = PixelFlags::from_bits_retain(pf(1));
        let four_cc = pf(2).to_le_bytes();
        let caps2 = Caps2::from_bits_retain(field(27));
        let reserved_tag = (field(16), field(17));

        let mut data_offset = 4 + HEADER_SIZE;
        let mut srgb = false;
        let mut is_cube = caps2.contains(Caps2::CUBEMAP);
        let mut is_volume = caps2.contains(Caps2::VOLUME);

        let mut format = if pixel_flags.contains(PixelFlags::FOUR_CC) && &four_cc == b"DX10" {
            if data.len() < data_offset + DX10_SIZE {
                return Err(ImageError::UnexpectedEof);
            }
            let dx10 = &data[data_offset..data_offset + DX10_SIZE];
            data_offset += DX10_SIZE;
            let dxgi = u32_at(dx10, 0);
            let dimension = u32_at(dx10, 4);
            let misc = u32_at(dx10, 8);
            is_cube |= misc & DXGI_MISC_TEXTURECUBE != 0;
            is_volume |= dimension == DXGI_RESOURCE_TEXTURE3D;
            let (format, is_srgb) = from_dxgi(dxgi).ok_or_else(|| {
                ImageError::UnsupportedFormat(format!("DXGI format {dxgi}"))
            })?;
            srgb = is_srgb;
            format
        } else if pixel_flags.contains(PixelFlags::FOUR_CC) {
            from_four_cc(four_cc).ok_or_else(|| {
                ImageError::UnsupportedFormat(format!(
                    "FourCC {}",
                    String::from_utf8_lossy(&four_cc)
                ))
            })?
        } else {
            from_masks(pixel_flags, pf(3), [pf(4), pf(5), pf(6), pf(7)]).ok_or_else(|| {
                ImageError::UnsupportedFormat(format!(
                    "legacy pixel format flags {:#x} with {} bits",
                    pixel_flags.bits(),
                    pf(3)
                ))
            })?
        };

        if reserved_tag == (CRATE_TAG, TAG_RGB16) && format == SurfaceFormat::Plain(PixelFormat::RGBA16)
        {
            format = SurfaceFormat::Rgb16Tagged;
        }

        let layout = match (is_cube, is_volume) {
            (true, true) => return Err(malformed("both cube map and volume flags set")),
            (true, false) => {
                if !caps2.contains(Caps2::CUBEMAP) || caps2.contains(Caps2::ALL_FACES) {
                    Layout::Cube
                } else {
                    return Err(ImageError::UnsupportedFormat(
                        "partial cube map".to_string(),
                    ));
                }
            }
            (false, true) => {
                if depth == 0 {
                    return Err(malformed("volume texture with zero depth"));
                }
                Layout::Volume { depth }
            }
            (false, false) => Layout::Texture2D,
        };

        Ok(Self {
            width,
            height,
            mip_count,
            format,
            srgb,
            layout,
            data_offset,
        })
    }

    /// Size of one surface at mip `level` (dimensions halve, minimum 1).
    fn level_size(&self, level: u32) -> Option<usize> {
        let w = (self.width >> level).max(1);
        let h = (self.height >> level).max(1);
        self.format.surface_size(w, h)
    }

    /// Size of the top-level surface.
    pub(crate) fn surface_size(&self) -> Result<usize, ImageError> {
        self.level_size(0)
            .ok_or_else(|| malformed(format!("surface size overflow for {}x{}", self.width, self.height)))
    }

    /// Bytes of one face or volume including the whole mip chain.
    fn chain_size(&self) -> Option<usize> {
        let mut total = 0usize;
        for level in 0..self.mip_count {
            let slices = match self.layout {
                Layout::Volume { depth } => (depth >> level).max(1) as usize,
                _ => 1,
            };
            total = total.checked_add(self.level_size(level)?.checked_mul(slices)?)?;
        }
        Some(total)
    }

    /// Byte ranges of the top-level surfaces: one for a 2D texture, six
    /// faces for a cube map, `depth` slices for a volume.
    ///
    /// Fails when the payload is shorter than the header requires.
    pub(crate) fn check_payload(&self, data: &[u8]) -> Result<Vec<std::ops::Range<usize>>, ImageError> {
        let overflow = || malformed("payload size overflow");
        let surface = self.surface_size()?;
        let chain = self.chain_size().ok_or_else(overflow)?;
        let (count, stride, total) = match self.layout {
            Layout::Texture2D => (1, chain, chain),
            Layout::Cube => (6, chain, chain.checked_mul(6).ok_or_else(overflow)?),
            Layout::Volume { depth } => (depth as usize, surface, chain),
        };
        let needed = self.data_offset.checked_add(total).ok_or_else(overflow)?;
        if data.len() < needed {
            return Err(ImageError::UnexpectedEof);
        }
        Ok((0..count)
            .map(|i| {
                let start = self.data_offset + i * stride;
                start..start + surface
            })
            .collect())
    }
}

/// What to write into a header.
pub(crate) struct HeaderSpec {
    pub width: u32,
    pub height: u32,
    pub format: SurfaceFormat,
    pub srgb: bool,
    pub layout: Layout,
}

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Append magic, header and (if needed) DX10 header. Mip count is written
/// as 0: only the top level is stored.
pub(crate) fn write_header(spec: &HeaderSpec, out: &mut Vec<u8>) {
    let dxgi = to_dxgi(spec.format, spec.srgb);
    let compressed = spec.format.block_bytes().is_some();

    let mut flags =
        HeaderFlags::CAPS | HeaderFlags::HEIGHT | HeaderFlags::WIDTH | HeaderFlags::PIXEL_FORMAT;
    flags |= if compressed {
        HeaderFlags::LINEAR_SIZE
    } else {
        HeaderFlags::PITCH
    };
    let mut caps = Caps::TEXTURE;
    let mut caps2 = Caps2::empty();
    let depth = match spec.layout {
        Layout::Texture2D => 0,
        Layout::Cube => {
            caps |= Caps::COMPLEX;
            caps2 |= Caps2::CUBEMAP | Caps2::ALL_FACES;
            0
        }
        Layout::Volume { depth } => {
            flags |= HeaderFlags::DEPTH;
            caps |= Caps::COMPLEX;
            caps2 |= Caps2::VOLUME;
            depth
        }
    };

    out.extend_from_slice(MAGIC);
    push_u32(out, HEADER_SIZE as u32);
    push_u32(out, flags.bits());
    push_u32(out, spec.height);
    push_u32(out, spec.width);
    push_u32(out, spec.format.pitch_or_linear_size(spec.width, spec.height));
    push_u32(out, depth);
    push_u32(out, 0); // mip count
    let mut reserved = [0u32; 11];
    if spec.format == SurfaceFormat::Rgb16Tagged {
        reserved[9] = CRATE_TAG;
        reserved[10] = TAG_RGB16;
    }
    for r in reserved {
        push_u32(out, r);
    }

    push_u32(out, PIXEL_FORMAT_SIZE);
    match dxgi {
        Some(_) => {
            push_u32(out, PixelFlags::FOUR_CC.bits());
            out.extend_from_slice(b"DX10");
            for _ in 0..5 {
                push_u32(out, 0);
            }
        }
        None => {
            // 24-bit legacy RGB
            let masks = if spec.format == SurfaceFormat::Bgr8 {
                [0xff_0000, 0xff00, 0xff]
            } else {
                [0xff, 0xff00, 0xff_0000]
            };
            push_u32(out, PixelFlags::RGB.bits());
            push_u32(out, 0);
            push_u32(out, 24);
            for m in masks {
                push_u32(out, m);
            }
            push_u32(out, 0);
        }
    }

    push_u32(out, caps.bits());
    push_u32(out, caps2.bits());
    push_u32(out, 0); // caps3
    push_u32(out, 0); // caps4
    push_u32(out, 0); // reserved2

    if let Some(code) = dxgi {
        let dimension = match spec.layout {
            Layout::Volume { .. } => DXGI_RESOURCE_TEXTURE3D,
            _ => DXGI_RESOURCE_TEXTURE2D,
        };
        let misc = if spec.layout == Layout::Cube {
            DXGI_MISC_TEXTURECUBE
        } else {
            0
        };
        push_u32(out, code);
        push_u32(out, dimension);
        push_u32(out, misc);
        push_u32(out, 1); // array size
        push_u32(out, 0); // alpha mode
    }
}
