//! # zenimagefile
//!
//! In-memory images with pixel format conversion, a pluggable codec
//! boundary, and DDS texture containers with BC4/BC5/BC6H/BC7 block
//! compression.
//!
//! ## Pixel formats
//!
//! [`PixelFormat`] covers 1 to 4 channels of 8-bit and 16-bit unsigned
//! normalized integers and 32-bit floats (no 2-channel 16-bit). Buffers are
//! packed, top-down, canonical R, G, B, A channel order, native-endian
//! samples. [`convert::convert`] maps between any two concrete formats.
//!
//! ## File formats
//!
//! [`FileFormat::sniff`] classifies bytes by signature. DDS is read and
//! written by this crate ([`dds`]); other formats go through an
//! [`ImageCodec`] looked up in a [`CodecRegistry`]. Built-in codecs:
//!
//! - **PNM** (`pnm` feature): binary PGM (P5), binary PPM (P6), PFM
//! - **BMP** (`bmp` feature): uncompressed 8-bit palettized, 16/24/32-bit
//!
//! ## Non-Goals
//!
//! - Bit-stream codecs for PNG, JPEG and similar formats (plug them in
//!   through [`ImageCodec`])
//! - Color management: a [`ColorProfile`] is carried, never applied
//! - GPU upload and mip generation
//!
//! ## Usage
//!
//! ```
//! use zenimagefile::{ImageFile, PixelFormat, FileFormat};
//! use zenimagefile::dds::{self, CompressionType};
//!
//! let mut rgb = ImageFile::blank(64, 64, PixelFormat::RGB8, None)?;
//! for (i, px) in rgb.pixels_mut().chunks_exact_mut(3).enumerate() {
//!     px.copy_from_slice(&[(i % 64) as u8 * 4, (i / 64) as u8 * 4, 128]);
//! }
//!
//! // BC7 needs 3 or 4 channels; convert first if the format doesn't fit
//! let mut rgba = ImageFile::new();
//! rgba.convert_from(&rgb, PixelFormat::RGBA8)?;
//! let blob = dds::compress(&rgba, CompressionType::Bc7)?;
//!
//! let mut loaded = ImageFile::new();
//! loaded.load(&blob, FileFormat::Unknown)?;
//! assert_eq!(loaded.file_format(), FileFormat::Dds);
//! # Ok::<(), zenimagefile::ImageError>(())
//! ```

#![forbid(unsafe_code)]

mod error;
mod format;
mod image;
mod limits;
mod pixel;
mod profile;

pub mod codec;
pub mod convert;
pub mod dds;

#[cfg(feature = "pnm")]
pub mod pnm;

#[cfg(feature = "bmp")]
pub mod bmp;

// Re-exports
pub use codec::{CodecRegistry, DecodedImage, EncodeInput, EncodeOptions, ImageCodec};
pub use dds::CompressionType;
pub use error::ImageError;
pub use format::FileFormat;
pub use image::{ImageFile, LoadRequest, SaveRequest};
pub use limits::Limits;
#[cfg(feature = "rgb")]
pub use pixel::ImagePixel;
pub use pixel::{NumericKind, PixelFormat};
pub use profile::ColorProfile;
