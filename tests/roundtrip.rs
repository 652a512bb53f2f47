use rstest::rstest;
use zenimagefile::dds::{self, CompressionType};
use zenimagefile::*;

/// Deterministic bytes for a `width` x `height` image. Float formats get
/// finite values so comparisons stay meaningful after conversion.
fn pattern(width: u32, height: u32, format: PixelFormat) -> Vec<u8> {
    let samples = (width * height) as usize * format.channel_count();
    if format.is_float() {
        (0..samples)
            .flat_map(|i| (i as f32 * 0.37 - 2.0).to_ne_bytes())
            .collect()
    } else {
        (0..samples * format.bytes_per_channel())
            .map(|i| (i * 31 + 7) as u8)
            .collect()
    }
}

fn image(width: u32, height: u32, format: PixelFormat) -> ImageFile {
    ImageFile::from_pixels(width, height, format, pattern(width, height, format), None).unwrap()
}

#[rstest]
#[case::r8(PixelFormat::R8)]
#[case::rg8(PixelFormat::RG8)]
#[case::rgb8(PixelFormat::RGB8)]
#[case::rgba8(PixelFormat::RGBA8)]
#[case::r16(PixelFormat::R16)]
#[case::rgb16(PixelFormat::RGB16)]
#[case::rgba16(PixelFormat::RGBA16)]
#[case::r32f(PixelFormat::R32F)]
#[case::rg32f(PixelFormat::RG32F)]
#[case::rgb32f(PixelFormat::RGB32F)]
#[case::rgba32f(PixelFormat::RGBA32F)]
fn dds_uncompressed_is_bit_exact(#[case] format: PixelFormat) {
    let original = image(7, 3, format);

    let blob = dds::compress(&original, CompressionType::None).unwrap();
    let back = dds::decompress(&blob).unwrap();
    assert_eq!(back.format(), format);
    assert_eq!((back.width(), back.height()), (7, 3));
    assert_eq!(back.pixels(), original.pixels());

    let saved = original.save(FileFormat::Dds).unwrap();
    assert_eq!(saved, blob);
    let mut loaded = ImageFile::new();
    loaded.load(&saved, FileFormat::Dds).unwrap();
    assert_eq!(loaded.pixels(), original.pixels());
    assert_eq!(loaded.file_format(), FileFormat::Dds);
}

#[test]
fn dds_srgb_profile_survives() {
    let mut img = image(4, 4, PixelFormat::RGBA8);
    img.set_color_profile(Some(ColorProfile::srgb()));

    let mut loaded = ImageFile::new();
    loaded
        .load(&img.save(FileFormat::Dds).unwrap(), FileFormat::Unknown)
        .unwrap();
    assert_eq!(loaded.color_profile(), Some(&ColorProfile::srgb()));

    let bc7 = dds::decompress(&dds::compress(&img, CompressionType::Bc7).unwrap()).unwrap();
    assert!(bc7.color_profile().is_some_and(ColorProfile::is_srgb));

    // no profile stays no profile
    let plain = image(4, 4, PixelFormat::RGBA8);
    let loaded = dds::decompress(&plain.save(FileFormat::Dds).unwrap()).unwrap();
    assert_eq!(loaded.color_profile(), None);
    assert!(loaded.effective_color_profile().is_srgb());
}

#[cfg(feature = "pnm")]
#[rstest]
#[case::ppm8(FileFormat::PpmRaw, PixelFormat::RGB8)]
#[case::ppm16(FileFormat::PpmRaw, PixelFormat::RGB16)]
#[case::pgm8(FileFormat::PgmRaw, PixelFormat::R8)]
#[case::pgm16(FileFormat::PgmRaw, PixelFormat::R16)]
#[case::pfm_gray(FileFormat::Pfm, PixelFormat::R32F)]
#[case::pfm_rgb(FileFormat::Pfm, PixelFormat::RGB32F)]
fn pnm_roundtrip_through_registry(#[case] file_format: FileFormat, #[case] format: PixelFormat) {
    let original = image(5, 4, format);
    let encoded = original.save(file_format).unwrap();
    assert_eq!(FileFormat::sniff(&encoded), file_format);

    let mut loaded = ImageFile::new();
    loaded.load(&encoded, FileFormat::Unknown).unwrap();
    assert_eq!(loaded.format(), format);
    assert_eq!(loaded.pixels(), original.pixels());
    assert_eq!(loaded.file_format(), file_format);
}

#[cfg(feature = "bmp")]
#[rstest]
#[case::rgb8(PixelFormat::RGB8)]
#[case::rgba8(PixelFormat::RGBA8)]
fn bmp_roundtrip_through_registry(#[case] format: PixelFormat) {
    // odd width exercises row padding
    let mut original = image(3, 5, format);
    if format.has_alpha() {
        // keep alpha nonzero so the decoder does not treat it as padding
        for px in original.pixels_mut().chunks_exact_mut(4) {
            px[3] |= 1;
        }
    }
    let encoded = original.save(FileFormat::Bmp).unwrap();
    assert_eq!(&encoded[..2], b"BM");

    let loaded = LoadRequest::new(&encoded).load().unwrap();
    assert_eq!(loaded.format(), format);
    assert_eq!(loaded.pixels(), original.pixels());
}

#[cfg(feature = "pnm")]
#[test]
fn codec_rejection_is_an_encode_error() {
    let rgba = image(2, 2, PixelFormat::RGBA8);
    assert!(matches!(
        rgba.save(FileFormat::PgmRaw),
        Err(ImageError::Encode(_))
    ));
}

#[test]
fn formats_without_codec_are_unsupported() {
    let img = image(2, 2, PixelFormat::RGB8);
    assert!(matches!(
        img.save(FileFormat::Jpeg),
        Err(ImageError::UnsupportedFormat(_))
    ));
    let mut target = ImageFile::new();
    assert!(matches!(
        target.load(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0], FileFormat::Unknown),
        Err(ImageError::UnsupportedFormat(_))
    ));
    assert!(!target.is_initialized());
}

#[test]
fn cube_map_roundtrip() {
    let faces: Vec<ImageFile> = (0..6)
        .map(|i| {
            let mut face = image(4, 4, PixelFormat::RGBA16);
            face.pixels_mut()[0] = i;
            face
        })
        .collect();
    let mut sink = Vec::new();
    dds::write_cube_map(&faces, false, &mut sink).unwrap();
    let loaded = dds::load_cube_map(&sink).unwrap();
    for (a, b) in loaded.iter().zip(&faces) {
        assert_eq!(a.pixels(), b.pixels());
        assert_eq!(a.format(), PixelFormat::RGBA16);
    }
}

#[test]
fn cube_map_mismatch_writes_nothing() {
    let mut faces: Vec<ImageFile> = (0..6).map(|_| image(4, 4, PixelFormat::RGB8)).collect();
    faces[3] = image(4, 2, PixelFormat::RGB8);
    let mut sink = Vec::new();
    assert!(matches!(
        dds::write_cube_map(&faces, false, &mut sink),
        Err(ImageError::InconsistentCubeFaces(_))
    ));
    assert!(sink.is_empty());
    assert!(matches!(
        dds::save_cube_map(&faces, true),
        Err(ImageError::InconsistentCubeFaces(_))
    ));
}

#[test]
fn volume_mismatch_writes_nothing() {
    let slices = [
        image(4, 4, PixelFormat::RGBA8),
        image(4, 4, PixelFormat::RGB8),
    ];
    let mut sink = Vec::new();
    assert!(matches!(
        dds::write_volume_texture(&slices, false, &mut sink),
        Err(ImageError::InconsistentCubeFaces(_))
    ));
    assert!(sink.is_empty());
}

#[test]
fn bc6h_volume_roundtrip() {
    let slices: Vec<ImageFile> = (0..4)
        .map(|z| {
            let pixels: Vec<u8> = (0..64)
                .flat_map(|i| {
                    let x = (i % 8) as f32;
                    [0.5 + x / 64.0, 1.0 + z as f32 / 16.0, 0.25]
                })
                .flat_map(f32::to_ne_bytes)
                .collect();
            ImageFile::from_pixels(8, 8, PixelFormat::RGB32F, pixels, None).unwrap()
        })
        .collect();
    let blob = dds::save_volume_texture(&slices, true).unwrap();
    let (loaded, depth) = dds::load_volume_texture(&blob).unwrap();
    assert_eq!(depth, 4);
    for (z, slice) in loaded.iter().enumerate() {
        assert_eq!(slice.format(), PixelFormat::RGBA32F);
        let g = f32::from_ne_bytes(slice.pixels()[4..8].try_into().unwrap());
        let expected = 1.0 + z as f32 / 16.0;
        assert!((g - expected).abs() <= 0.05 * expected + 0.01, "{g} vs {expected}");
    }
}
