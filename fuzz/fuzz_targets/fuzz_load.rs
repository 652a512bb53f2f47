#![no_main]
use libfuzzer_sys::fuzz_target;
use zenimagefile::{FileFormat, ImageFile, Limits, LoadRequest, dds};

fuzz_target!(|data: &[u8]| {
    let limits = Limits {
        max_pixels: Some(1 << 22),
        ..Limits::default()
    };

    // Sniffed dispatch through the builtin registry must never panic
    let _ = LoadRequest::new(data).with_limits(limits.clone()).load();

    // DDS entry points, whatever the content
    let _ = dds::decompress_with_limits(data, &limits);
    if data.len() < 1 << 16 {
        let _ = dds::load_cube_map(data);
        let _ = dds::load_volume_texture(data);
    }

    // A declared format is only a hint
    let mut img = ImageFile::new();
    let _ = img.load(data, FileFormat::Bmp);
});
