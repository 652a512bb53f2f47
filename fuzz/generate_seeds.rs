#!/usr/bin/env -S cargo +nightly -Zscript
//! Generate seed corpus files for fuzzing.
//! Run: cargo +nightly -Zscript fuzz/generate_seeds.rs

fn main() {
    use std::fs;
    let dir = "fuzz/corpus/fuzz_load";
    fs::create_dir_all(dir).unwrap();

    // PPM 2x2
    let ppm = b"P6\n2 2\n255\n\xff\x00\x00\x00\xff\x00\x00\x00\xff\x80\x80\x80";
    fs::write(format!("{dir}/ppm_2x2.ppm"), ppm).unwrap();

    // PGM 3x2
    let pgm = b"P5\n3 2\n255\n\x00\x40\x80\xc0\xff\x64";
    fs::write(format!("{dir}/pgm_3x2.pgm"), pgm).unwrap();

    // PFM gray 1x1
    let mut pfm = b"Pf\n1 1\n-1.0\n".to_vec();
    pfm.extend_from_slice(&1.0f32.to_le_bytes());
    fs::write(format!("{dir}/pfm_gray_1x1.pfm"), pfm).unwrap();

    // Minimal BMP 1x1 24-bit
    let mut bmp = vec![0u8; 58]; // 54 header + 4 pixel (3 + 1 padding)
    bmp[0] = b'B'; bmp[1] = b'M';
    bmp[2..6].copy_from_slice(&58u32.to_le_bytes()); // file size
    bmp[10..14].copy_from_slice(&54u32.to_le_bytes()); // data offset
    bmp[14..18].copy_from_slice(&40u32.to_le_bytes()); // DIB header size
    bmp[18..22].copy_from_slice(&1i32.to_le_bytes()); // width
    bmp[22..26].copy_from_slice(&1i32.to_le_bytes()); // height
    bmp[26..28].copy_from_slice(&1u16.to_le_bytes()); // planes
    bmp[28..30].copy_from_slice(&24u16.to_le_bytes()); // bpp
    bmp[54] = 0xff; bmp[55] = 0x00; bmp[56] = 0x00; // BGR
    fs::write(format!("{dir}/bmp_1x1.bmp"), bmp).unwrap();

    // DDS 4x4 R8 with a DX10 header (DXGI_FORMAT_R8_UNORM)
    let mut dds = b"DDS ".to_vec();
    let mut header = [0u32; 31];
    header[0] = 124;
    header[1] = 0x1 | 0x2 | 0x4 | 0x1000 | 0x8;
    header[2] = 4;
    header[3] = 4;
    header[4] = 4; // pitch
    header[18] = 32;
    header[19] = 0x4; // FourCC
    header[20] = u32::from_le_bytes(*b"DX10");
    header[26] = 0x1000;
    for v in header.into_iter().chain([61, 3, 0, 1, 0]) {
        dds.extend_from_slice(&v.to_le_bytes());
    }
    dds.extend((0u8..16).map(|i| i * 16));
    fs::write(format!("{dir}/dds_r8_4x4.dds"), &dds).unwrap();

    // Legacy DXT1 4x4, one block
    let mut dxt1 = dds[..128].to_vec();
    dxt1[84..88].copy_from_slice(b"DXT1");
    dxt1[8..12].copy_from_slice(&(0x1007u32 | 0x8_0000).to_le_bytes());
    dxt1[20..24].copy_from_slice(&8u32.to_le_bytes());
    dxt1.extend_from_slice(&[0x00, 0xf8, 0x1f, 0x00, 0xe4, 0xe4, 0xe4, 0xe4]);
    fs::write(format!("{dir}/dds_dxt1_4x4.dds"), dxt1).unwrap();

    // Truncated/malformed seeds for edge coverage
    fs::write(format!("{dir}/empty.bin"), b"").unwrap();
    fs::write(format!("{dir}/just_p6.bin"), b"P6").unwrap();
    fs::write(format!("{dir}/bm_short.bin"), b"BM\x00\x00").unwrap();
    fs::write(format!("{dir}/dds_magic_only.bin"), b"DDS ").unwrap();

    println!("Generated seed corpus in {dir}/");
}
