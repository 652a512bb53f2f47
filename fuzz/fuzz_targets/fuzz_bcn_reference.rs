#![no_main]

// Compares the BC4/BC5/BC6H/BC7 block decoders against bcdec_rs, bit for bit.

use libfuzzer_sys::fuzz_target;
use zenimagefile::dds::{self, CompressionType};
use zenimagefile::{ImageFile, PixelFormat};

/// A 4x4 DDS holding exactly `block`.
fn container(compression: CompressionType, format: PixelFormat, block: &[u8]) -> Vec<u8> {
    let img = ImageFile::blank(4, 4, format, None).unwrap();
    let mut blob = dds::compress(&img, compression).unwrap();
    let offset = blob.len() - block.len();
    blob[offset..].copy_from_slice(block);
    blob
}

fn half_bits(rgba: &[u8]) -> Vec<u16> {
    rgba.chunks_exact(16)
        .flat_map(|px| {
            (0..3).map(move |c| {
                let v = f32::from_ne_bytes([px[4 * c], px[4 * c + 1], px[4 * c + 2], px[4 * c + 3]]);
                half::f16::from_f32(v).to_bits()
            })
        })
        .collect()
}

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let Some(block) = rest.get(..16) else {
        return;
    };

    match selector % 5 {
        0 => {
            let block = &block[..8];
            let ours = dds::decompress(&container(CompressionType::Bc4, PixelFormat::R8, block)).unwrap();
            let mut expected = [0u8; 16];
            bcdec_rs::bc4(block, &mut expected, 4, false);
            assert_eq!(ours.pixels(), &expected[..]);
        }
        1 => {
            let ours = dds::decompress(&container(CompressionType::Bc5, PixelFormat::RG8, block)).unwrap();
            let mut expected = [0u8; 32];
            bcdec_rs::bc5(block, &mut expected, 8, false);
            assert_eq!(ours.pixels(), &expected[..]);
        }
        2 | 3 => {
            let signed = selector % 5 == 3;
            let mut blob = container(CompressionType::Bc6h, PixelFormat::RGB32F, block);
            if signed {
                // DX10 format field: BC6H_SF16
                blob[128..132].copy_from_slice(&96u32.to_le_bytes());
            }
            let ours = dds::decompress(&blob).unwrap();
            let mut expected = [0u16; 48];
            bcdec_rs::bc6h_half(block, &mut expected, 12, signed);
            assert_eq!(half_bits(ours.pixels()), expected);
        }
        _ => {
            let ours = dds::decompress(&container(CompressionType::Bc7, PixelFormat::RGBA8, block)).unwrap();
            let mut expected = [0u8; 64];
            bcdec_rs::bc7(block, &mut expected, 16);
            assert_eq!(ours.pixels(), &expected[..]);
        }
    }
});
