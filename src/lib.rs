//! A library for turning captured framebuffer pixels into image files.
//!
//! Pixels enter the crate either as a [`NativeImage`] snapshot of a display
//! (in whatever depth, byte order and color model the display uses), as a
//! BMP file, or as a PNG file.  Each path produces a [`PixelBuffer`] with
//! 8-bit RGB or RGBA channels, which can then be written out as a BMP, an
//! ICO/CUR, or a PNG file.
//!
//! # Example
//!
//! ```
//! use pixgrab::{
//!     BitFieldSpec, ByteOrder, NativeFormat, NativeImage, PixelBuffer,
//!     SaveFormat, Visual,
//! };
//!
//! // A 2x1 snapshot of a 16-bit 5-6-5 display: one red and one blue pixel.
//! let data = [0x00, 0xf8, 0x1f, 0x00];
//! let format = NativeFormat {
//!     depth: 16,
//!     bits_per_pixel: 16,
//!     byte_order: ByteOrder::LsbFirst,
//! };
//! let image = NativeImage::new(2, 1, format, 4, &data).unwrap();
//! let visual = Visual::TrueColor(BitFieldSpec::rgb(0xf800, 0x07e0, 0x001f));
//! let pixels = PixelBuffer::from_native(&image, &visual, false).unwrap();
//! assert_eq!(pixels.rgba_at(0, 0), [0xff, 0, 0, 0xff]);
//!
//! let mut file = Vec::<u8>::new();
//! let format = SaveFormat::from_extension("ico").unwrap();
//! pixels.save(&mut file, &format).unwrap();
//! assert_eq!(&file[0..6], &[0, 0, 1, 0, 1, 0]);
//! ```

#![warn(missing_docs)]

#[macro_use]
mod macros;

mod bitfield;
mod bmpdepth;
mod bmpheader;
mod bmpread;
mod bmpwrite;
mod buffer;
mod colortable;
mod error;
mod extract;
mod ico;
mod pngcodec;
mod save;

pub use crate::bitfield::{BitFieldSpec, ChannelMask};
pub use crate::bmpheader::{BmpHeader, Compression, HeaderStyle, Orientation};
pub use crate::bmpread::{BmpImage, BmpReadOptions};
pub use crate::bmpwrite::BmpWriteOptions;
pub use crate::buffer::{ByteOrder, PixelBuffer};
pub use crate::colortable::{ColorTable, MAX_COLORS};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::extract::{NativeFormat, NativeImage, Visual};
pub use crate::ico::{IconImage, ResourceType};
pub use crate::pngcodec::{FilterMask, PngOptions, TransparentColor};
pub use crate::save::SaveFormat;
