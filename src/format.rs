//! File format tags, magic-byte sniffing and extension mapping.
//!
//! Classification only: nothing here decodes pixels.

/// Container/file formats an image can be loaded from or saved to.
///
/// Numeric codes are stable and match the codec boundary's tag values.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum FileFormat {
    #[default]
    Unknown = -1,
    Bmp = 0,
    Ico = 1,
    Jpeg = 2,
    Jng = 3,
    Koala = 4,
    /// Amiga IFF/ILBM. Also available as [`FileFormat::IFF`].
    Lbm = 5,
    Mng = 6,
    /// ASCII PBM (P1).
    Pbm = 7,
    /// Binary PBM (P4).
    PbmRaw = 8,
    Pcd = 9,
    Pcx = 10,
    /// ASCII PGM (P2).
    Pgm = 11,
    /// Binary PGM (P5).
    PgmRaw = 12,
    Png = 13,
    /// ASCII PPM (P3).
    Ppm = 14,
    /// Binary PPM (P6).
    PpmRaw = 15,
    Ras = 16,
    Targa = 17,
    Tiff = 18,
    Wbmp = 19,
    Psd = 20,
    Cut = 21,
    Xbm = 22,
    Xpm = 23,
    Dds = 24,
    Gif = 25,
    Hdr = 26,
    FaxG3 = 27,
    Sgi = 28,
    Exr = 29,
    J2k = 30,
    Jp2 = 31,
    Pfm = 32,
    Pict = 33,
    Raw = 34,
    Webp = 35,
    Jxr = 36,
}

impl FileFormat {
    /// Alias: IFF and LBM are the same format.
    pub const IFF: FileFormat = FileFormat::Lbm;

    /// Bytes [`FileFormat::sniff`] looks at.
    pub const SNIFF_BYTES: usize = 16;

    /// Numeric tag of this format.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Detect format from magic bytes. Returns `Unknown` if unrecognized.
    ///
    /// Only the first [`Self::SNIFF_BYTES`] bytes are inspected.
    pub fn sniff(data: &[u8]) -> FileFormat {
        let data = &data[..data.len().min(Self::SNIFF_BYTES)];
        let starts = |magic: &[u8]| data.starts_with(magic);

        if starts(b"DDS ") {
            return FileFormat::Dds;
        }
        if starts(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            return FileFormat::Png;
        }
        if starts(&[0x8A, b'M', b'N', b'G']) {
            return FileFormat::Mng;
        }
        if starts(&[0x8B, b'J', b'N', b'G']) {
            return FileFormat::Jng;
        }
        if starts(&[0xFF, 0xD8, 0xFF]) {
            return FileFormat::Jpeg;
        }
        if starts(b"GIF87a") || starts(b"GIF89a") {
            return FileFormat::Gif;
        }
        if starts(b"II\x2A\x00") || starts(b"MM\x00\x2A") {
            return FileFormat::Tiff;
        }
        if starts(b"II\xBC") {
            return FileFormat::Jxr;
        }
        if starts(b"8BPS") {
            return FileFormat::Psd;
        }
        if starts(b"#?RADIANCE") || starts(b"#?RGBE") {
            return FileFormat::Hdr;
        }
        if starts(&[0x76, 0x2F, 0x31, 0x01]) {
            return FileFormat::Exr;
        }
        if data.len() >= 12 && starts(b"RIFF") && &data[8..12] == b"WEBP" {
            return FileFormat::Webp;
        }
        if starts(&[0x00, 0x00, 0x00, 0x0C, b'j', b'P', b' ', b' ']) {
            return FileFormat::Jp2;
        }
        if starts(&[0xFF, 0x4F, 0xFF, 0x51]) {
            return FileFormat::J2k;
        }
        if starts(&[0x59, 0xA6, 0x6A, 0x95]) {
            return FileFormat::Ras;
        }
        if starts(&[0x01, 0xDA]) {
            return FileFormat::Sgi;
        }
        if starts(b"FORM") {
            return FileFormat::Lbm;
        }
        if starts(b"/* XPM */") {
            return FileFormat::Xpm;
        }
        if starts(&[0x00, 0x00, 0x01, 0x00]) {
            return FileFormat::Ico;
        }
        if data.len() >= 3 && data[0] == 0x0A && data[1] <= 5 && data[2] == 0x01 {
            return FileFormat::Pcx;
        }
        if data.len() >= 2 && data[0] == b'B' && data[1] == b'M' {
            return FileFormat::Bmp;
        }
        if data.len() >= 3 && data[0] == b'P' && is_pnm_separator(data[2]) {
            match data[1] {
                b'1' => return FileFormat::Pbm,
                b'2' => return FileFormat::Pgm,
                b'3' => return FileFormat::Ppm,
                b'4' => return FileFormat::PbmRaw,
                b'5' => return FileFormat::PgmRaw,
                b'6' => return FileFormat::PpmRaw,
                b'f' | b'F' => return FileFormat::Pfm,
                _ => {}
            }
        }

        FileFormat::Unknown
    }

    /// Map a file name (or bare extension) to a format by its extension,
    /// case-insensitively. Advisory only: sniffed content takes precedence.
    pub fn from_extension(name: &str) -> FileFormat {
        let ext = match name.rsplit_once('.') {
            Some((_, ext)) => ext,
            None => name,
        };
        match ext.to_ascii_lowercase().as_str() {
            "bmp" | "dib" => FileFormat::Bmp,
            "ico" => FileFormat::Ico,
            "jpg" | "jpeg" | "jpe" | "jif" | "jfif" => FileFormat::Jpeg,
            "jng" => FileFormat::Jng,
            "koa" => FileFormat::Koala,
            "iff" | "lbm" => FileFormat::Lbm,
            "mng" => FileFormat::Mng,
            "pbm" => FileFormat::Pbm,
            "pcd" => FileFormat::Pcd,
            "pcx" => FileFormat::Pcx,
            "pgm" => FileFormat::Pgm,
            "png" => FileFormat::Png,
            "ppm" => FileFormat::Ppm,
            "ras" => FileFormat::Ras,
            "tga" | "targa" => FileFormat::Targa,
            "tif" | "tiff" => FileFormat::Tiff,
            "wbmp" => FileFormat::Wbmp,
            "psd" => FileFormat::Psd,
            "cut" => FileFormat::Cut,
            "xbm" => FileFormat::Xbm,
            "xpm" => FileFormat::Xpm,
            "dds" => FileFormat::Dds,
            "gif" => FileFormat::Gif,
            "hdr" => FileFormat::Hdr,
            "g3" => FileFormat::FaxG3,
            "sgi" | "rgb" | "rgba" | "bw" => FileFormat::Sgi,
            "exr" => FileFormat::Exr,
            "j2k" | "j2c" => FileFormat::J2k,
            "jp2" => FileFormat::Jp2,
            "pfm" => FileFormat::Pfm,
            "pct" | "pict" | "pic" => FileFormat::Pict,
            "raw" | "cr2" | "crw" | "nef" | "dng" | "arw" | "orf" | "rw2" | "raf" => {
                FileFormat::Raw
            }
            "webp" => FileFormat::Webp,
            "jxr" | "wdp" | "hdp" => FileFormat::Jxr,
            _ => FileFormat::Unknown,
        }
    }

    /// Preferred file extension, without the dot.
    pub fn extension(self) -> Option<&'static str> {
        Some(match self {
            FileFormat::Unknown => return None,
            FileFormat::Bmp => "bmp",
            FileFormat::Ico => "ico",
            FileFormat::Jpeg => "jpg",
            FileFormat::Jng => "jng",
            FileFormat::Koala => "koa",
            FileFormat::Lbm => "iff",
            FileFormat::Mng => "mng",
            FileFormat::Pbm | FileFormat::PbmRaw => "pbm",
            FileFormat::Pcd => "pcd",
            FileFormat::Pcx => "pcx",
            FileFormat::Pgm | FileFormat::PgmRaw => "pgm",
            FileFormat::Png => "png",
            FileFormat::Ppm | FileFormat::PpmRaw => "ppm",
            FileFormat::Ras => "ras",
            FileFormat::Targa => "tga",
            FileFormat::Tiff => "tif",
            FileFormat::Wbmp => "wbmp",
            FileFormat::Psd => "psd",
            FileFormat::Cut => "cut",
            FileFormat::Xbm => "xbm",
            FileFormat::Xpm => "xpm",
            FileFormat::Dds => "dds",
            FileFormat::Gif => "gif",
            FileFormat::Hdr => "hdr",
            FileFormat::FaxG3 => "g3",
            FileFormat::Sgi => "sgi",
            FileFormat::Exr => "exr",
            FileFormat::J2k => "j2k",
            FileFormat::Jp2 => "jp2",
            FileFormat::Pfm => "pfm",
            FileFormat::Pict => "pct",
            FileFormat::Raw => "raw",
            FileFormat::Webp => "webp",
            FileFormat::Jxr => "jxr",
        })
    }
}

fn is_pnm_separator(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'#')
}

impl core::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(self, f)
    }
}
