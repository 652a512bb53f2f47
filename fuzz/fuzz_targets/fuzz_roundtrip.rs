#![no_main]
use libfuzzer_sys::fuzz_target;
use zenimagefile::{FileFormat, Limits, LoadRequest};

fuzz_target!(|data: &[u8]| {
    let limits = Limits {
        max_pixels: Some(1 << 20),
        ..Limits::default()
    };
    let Ok(decoded) = LoadRequest::new(data).with_limits(limits).load() else {
        return;
    };

    // Formats whose writers store every decoded sample exactly
    let target = match decoded.file_format() {
        FileFormat::Dds => FileFormat::Dds,
        FileFormat::PgmRaw | FileFormat::PpmRaw => decoded.file_format(),
        _ => return,
    };
    let Ok(reencoded) = decoded.save(target) else {
        return;
    };
    let Ok(again) = LoadRequest::new(&reencoded).load() else {
        panic!("re-encoded {target:?} failed to load");
    };

    assert_eq!(decoded.pixels(), again.pixels(), "roundtrip pixel mismatch");
    assert_eq!(decoded.format(), again.format());
    assert_eq!(
        (decoded.width(), decoded.height()),
        (again.width(), again.height())
    );
});
