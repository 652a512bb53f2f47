//! Block decoders checked against `bcdec_rs` on arbitrary block contents.

use half::f16;
use zenimagefile::dds::{self, CompressionType};
use zenimagefile::*;

const SIZE: usize = 32;
const BLOCKS: usize = (SIZE / 4) * (SIZE / 4);

struct Lcg(u64);

impl Lcg {
    fn next_u8(&mut self) -> u8 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 33) as u8
    }

    fn fill(&mut self, buf: &mut [u8]) {
        buf.iter_mut().for_each(|b| *b = self.next_u8());
    }
}

/// A `SIZE`x`SIZE` DDS of the given compression whose payload is replaced
/// by `payload`.
fn container(compression: CompressionType, format: PixelFormat, payload: &[u8]) -> Vec<u8> {
    let img = ImageFile::blank(SIZE as u32, SIZE as u32, format, None).unwrap();
    let mut blob = dds::compress(&img, compression).unwrap();
    let offset = blob.len() - payload.len();
    blob[offset..].copy_from_slice(payload);
    blob
}

/// Byte offset of block `b`'s top-left texel in a row-major image.
fn block_origin(b: usize, bytes_per_pixel: usize) -> usize {
    let (bx, by) = (b % (SIZE / 4), b / (SIZE / 4));
    (by * 4 * SIZE + bx * 4) * bytes_per_pixel
}

fn floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[test]
fn bc4_matches_reference() {
    let mut rng = Lcg(4);
    for _ in 0..8 {
        let mut payload = vec![0u8; BLOCKS * 8];
        rng.fill(&mut payload);
        let ours = dds::decompress(&container(CompressionType::Bc4, PixelFormat::R8, &payload))
            .unwrap();

        let mut expected = vec![0u8; SIZE * SIZE];
        for (b, block) in payload.chunks_exact(8).enumerate() {
            bcdec_rs::bc4(block, &mut expected[block_origin(b, 1)..], SIZE, false);
        }
        assert_eq!(ours.pixels(), &expected[..]);
    }
}

#[test]
fn bc5_matches_reference() {
    let mut rng = Lcg(5);
    for _ in 0..8 {
        let mut payload = vec![0u8; BLOCKS * 16];
        rng.fill(&mut payload);
        let ours = dds::decompress(&container(CompressionType::Bc5, PixelFormat::RG8, &payload))
            .unwrap();

        let mut expected = vec![0u8; SIZE * SIZE * 2];
        for (b, block) in payload.chunks_exact(16).enumerate() {
            bcdec_rs::bc5(block, &mut expected[block_origin(b, 2)..], SIZE * 2, false);
        }
        assert_eq!(ours.pixels(), &expected[..]);
    }
}

/// Random BC7 blocks with the mode bit forced so every mode (and the
/// reserved all-zero prefix) shows up.
fn bc7_payload(rng: &mut Lcg) -> Vec<u8> {
    let mut payload = vec![0u8; BLOCKS * 16];
    rng.fill(&mut payload);
    for (i, block) in payload.chunks_exact_mut(16).enumerate() {
        match i % 9 {
            8 => block[0] = 0,
            mode => {
                let high = (0xff00u16 >> (7 - mode)) as u8;
                block[0] = (block[0] & high) | (1 << mode);
            }
        }
    }
    payload
}

fn bc7_reference(payload: &[u8]) -> Vec<u8> {
    let mut expected = vec![0u8; SIZE * SIZE * 4];
    for (b, block) in payload.chunks_exact(16).enumerate() {
        bcdec_rs::bc7(block, &mut expected[block_origin(b, 4)..], SIZE * 4);
    }
    expected
}

#[test]
fn bc7_matches_reference() {
    let mut rng = Lcg(7);
    for _ in 0..8 {
        let payload = bc7_payload(&mut rng);
        let ours = dds::decompress(&container(CompressionType::Bc7, PixelFormat::RGBA8, &payload))
            .unwrap();
        assert_eq!(ours.pixels(), &bc7_reference(&payload)[..]);
    }
}

/// Half-float bits of the RGB channels of an RGBA32F buffer.
fn half_bits(rgba: &[u8]) -> Vec<u16> {
    floats(rgba)
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .map(|v| f16::from_f32(v).to_bits())
        .collect()
}

fn bc6h_reference(payload: &[u8], signed: bool) -> Vec<u16> {
    let mut expected = vec![0u16; SIZE * SIZE * 3];
    for (b, block) in payload.chunks_exact(16).enumerate() {
        let origin = block_origin(b, 3);
        bcdec_rs::bc6h_half(block, &mut expected[origin..], SIZE * 3, signed);
    }
    expected
}

#[test]
fn bc6h_matches_reference() {
    let mut rng = Lcg(6);
    for signed in [false, true] {
        for _ in 0..8 {
            let mut payload = vec![0u8; BLOCKS * 16];
            rng.fill(&mut payload);
            let mut blob = container(CompressionType::Bc6h, PixelFormat::RGB32F, &payload);
            if signed {
                // DX10 format field: BC6H_SF16
                blob[128..132].copy_from_slice(&96u32.to_le_bytes());
            }
            let ours = dds::decompress(&blob).unwrap();
            assert_eq!(
                half_bits(ours.pixels()),
                bc6h_reference(&payload, signed),
                "signed: {signed}"
            );
        }
    }
}

/// Encoder output must decode the same way in both decoders.
#[test]
fn encoded_blocks_match_reference() {
    let mut rng = Lcg(11);
    let mut rgba = vec![0u8; SIZE * SIZE * 4];
    rng.fill(&mut rgba);
    // smooth the lower half so both line and partitioned modes get used
    for (i, px) in rgba.chunks_exact_mut(4).enumerate().skip(SIZE * SIZE / 2) {
        let (x, y) = (i % SIZE, i / SIZE);
        px.copy_from_slice(&[(x * 8) as u8, (y * 4) as u8, 128, 255]);
    }
    let img = ImageFile::from_pixels(SIZE as u32, SIZE as u32, PixelFormat::RGBA8, rgba, None)
        .unwrap();
    let blob = dds::compress(&img, CompressionType::Bc7).unwrap();
    let payload = &blob[blob.len() - BLOCKS * 16..];
    assert_eq!(
        dds::decompress(&blob).unwrap().pixels(),
        &bc7_reference(payload)[..]
    );

    let hdr: Vec<u8> = (0..SIZE * SIZE * 3)
        .map(|_| f32::from(rng.next_u8()) / 16.0)
        .flat_map(f32::to_ne_bytes)
        .collect();
    let img = ImageFile::from_pixels(SIZE as u32, SIZE as u32, PixelFormat::RGB32F, hdr, None)
        .unwrap();
    let blob = dds::compress(&img, CompressionType::Bc6h).unwrap();
    let payload = &blob[blob.len() - BLOCKS * 16..];
    assert_eq!(
        half_bits(dds::decompress(&blob).unwrap().pixels()),
        bc6h_reference(payload, false)
    );
}
