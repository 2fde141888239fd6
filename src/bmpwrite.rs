use crate::bmpdepth::BmpDepth;
use crate::bmpheader::{Compression, FILE_HEADER_LEN};
use crate::buffer::PixelBuffer;
use crate::colortable::ColorTable;
use crate::error::Result;
use byteorder::{LittleEndian, WriteBytesExt};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;

//===========================================================================//

// The size of a BITMAPINFOHEADER struct, in bytes.
const INFO_HEADER_LEN: u32 = 40;

// The size of a BITMAPV4HEADER struct, in bytes.
const V4_HEADER_LEN: u32 = 108;

// Channel masks for 32-bit output, stored as B, G, R, A bytes.
const RED_MASK: u32 = 0x00ff_0000;
const GREEN_MASK: u32 = 0x0000_ff00;
const BLUE_MASK: u32 = 0x0000_00ff;
const ALPHA_MASK: u32 = 0xff00_0000;

//===========================================================================//

/// Options for encoding a BMP image.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct BmpWriteOptions {
    /// If true and the pixels have an alpha channel, write a 32-bit image
    /// with a v4 header and explicit channel masks, keeping the alpha.
    pub alpha_bitfields: bool,
    /// If set, write an indexed image (1, 4 or 8 bits-per-pixel, depending
    /// on the palette size) using these colors.  Every pixel's color must be
    /// in the palette.
    pub palette: Option<ColorTable>,
}

//===========================================================================//

impl PixelBuffer {
    /// Encodes the pixels as an uncompressed BMP file.  The writer is
    /// flushed whether or not encoding succeeds.
    pub fn write_bmp<W: Write>(
        &self,
        mut writer: W,
        options: &BmpWriteOptions,
    ) -> Result<()> {
        let result = self.write_bmp_internal(&mut writer, options);
        let flushed = writer.flush();
        result?;
        flushed?;
        Ok(())
    }

    fn write_bmp_internal<W: Write>(
        &self,
        writer: &mut W,
        options: &BmpWriteOptions,
    ) -> Result<()> {
        // Determine the color depth:
        let depth = if let Some(ref palette) = options.palette {
            match BmpDepth::for_palette(palette.len()) {
                Some(depth) => depth,
                None => over_capacity!(
                    "Too many palette colors for BMP ({})",
                    palette.len()
                ),
            }
        } else if options.alpha_bitfields && self.has_alpha() {
            BmpDepth::ThirtyTwo
        } else {
            BmpDepth::TwentyFour
        };
        let mut color_map = HashMap::<(u8, u8, u8), u8>::new();
        if let Some(ref palette) = options.palette {
            for (index, &color) in palette.colors().iter().enumerate() {
                color_map.entry(color).or_insert(index as u8);
            }
        }

        // Determine the size of the encoded data:
        let width = self.width();
        let height = self.height();
        if width > i32::MAX as u32 || height > i32::MAX as u32 {
            over_capacity!("{}x{} image is too large for BMP", width, height);
        }
        let row_size = match depth.row_size(width) {
            Some(row_size) => row_size,
            None => over_capacity!("Row of {} pixels is too long", width),
        };
        let header_len = if depth == BmpDepth::ThirtyTwo {
            V4_HEADER_LEN
        } else {
            INFO_HEADER_LEN
        };
        let num_colors = depth.num_colors();
        let data_offset =
            FILE_HEADER_LEN + header_len + 4 * (num_colors as u32);
        let image_size = (row_size as u64) * (height as u64);
        let file_size = data_offset as u64 + image_size;
        if file_size > u32::MAX as u64 {
            over_capacity!(
                "BMP would be too large (was {} bytes, but max is {})",
                file_size,
                u32::MAX
            );
        }
        log::debug!(
            "Encoding {}x{} BMP at {} bits-per-pixel ({} bytes)",
            width,
            height,
            depth.bits_per_pixel(),
            file_size
        );

        // Encode the pixel array up front, starting from the *bottom* row,
        // so that a color missing from the palette fails before any output:
        let mut data = Vec::<u8>::with_capacity(image_size as usize);
        let mut row = vec![0u8; row_size];
        for y in (0..height).rev() {
            row.fill(0);
            self.encode_bmp_row(y, depth, &color_map, &mut row)?;
            data.extend_from_slice(&row);
        }

        // Write the BITMAPFILEHEADER struct:
        writer.write_all(b"BM")?;
        writer.write_u32::<LittleEndian>(file_size as u32)?;
        writer.write_u16::<LittleEndian>(0)?; // reserved
        writer.write_u16::<LittleEndian>(0)?; // reserved
        writer.write_u32::<LittleEndian>(data_offset)?;

        // Write the BITMAPINFOHEADER (or BITMAPV4HEADER) struct:
        let compression = if depth == BmpDepth::ThirtyTwo {
            Compression::BitFields
        } else {
            Compression::None
        };
        writer.write_u32::<LittleEndian>(header_len)?;
        writer.write_i32::<LittleEndian>(width as i32)?;
        writer.write_i32::<LittleEndian>(height as i32)?;
        writer.write_u16::<LittleEndian>(1)?; // planes
        writer.write_u16::<LittleEndian>(depth.bits_per_pixel())?;
        writer.write_u32::<LittleEndian>(compression.number())?;
        writer.write_u32::<LittleEndian>(image_size as u32)?;
        writer.write_i32::<LittleEndian>(0)?; // horz ppm
        writer.write_i32::<LittleEndian>(0)?; // vert ppm
        writer.write_u32::<LittleEndian>(0)?; // colors used
        writer.write_u32::<LittleEndian>(0)?; // colors important
        if header_len == V4_HEADER_LEN {
            writer.write_u32::<LittleEndian>(RED_MASK)?;
            writer.write_u32::<LittleEndian>(GREEN_MASK)?;
            writer.write_u32::<LittleEndian>(BLUE_MASK)?;
            writer.write_u32::<LittleEndian>(ALPHA_MASK)?;
            writer.write_u32::<LittleEndian>(0)?; // color space type
            writer.write_all(&[0u8; 36])?; // endpoints
            writer.write_all(&[0u8; 12])?; // gamma
        }

        // Write the color table, padded out to the full depth:
        if let Some(ref palette) = options.palette {
            for &(red, green, blue) in palette.colors() {
                writer.write_u8(blue)?;
                writer.write_u8(green)?;
                writer.write_u8(red)?;
                writer.write_u8(0)?;
            }
            for _ in palette.len()..num_colors {
                writer.write_u32::<LittleEndian>(0)?;
            }
        }

        writer.write_all(&data)?;
        Ok(())
    }

    fn encode_bmp_row(
        &self,
        y: u32,
        depth: BmpDepth,
        color_map: &HashMap<(u8, u8, u8), u8>,
        out: &mut [u8],
    ) -> Result<()> {
        let channels = self.n_channels() as usize;
        let pixels = self.row(y).chunks_exact(channels);
        match depth {
            BmpDepth::One | BmpDepth::Four | BmpDepth::Eight => {
                let bits = depth.bits_per_pixel() as usize;
                for (x, pixel) in pixels.enumerate() {
                    let color = (pixel[0], pixel[1], pixel[2]);
                    let index = match color_map.get(&color) {
                        Some(&index) => index,
                        None => unsupported!(
                            "Color {:?} at ({}, {}) is not in the palette",
                            color,
                            x,
                            y
                        ),
                    };
                    let bit = x * bits;
                    out[bit / 8] |= index << (8 - bits - bit % 8);
                }
            }
            BmpDepth::Sixteen => {
                // We never choose BmpDepth::Sixteen above.
                unsupported!("Encoding 16-bpp BMPs is not supported");
            }
            BmpDepth::TwentyFour => {
                for (pixel, bgr) in pixels.zip(out.chunks_exact_mut(3)) {
                    bgr[0] = pixel[2];
                    bgr[1] = pixel[1];
                    bgr[2] = pixel[0];
                }
            }
            BmpDepth::ThirtyTwo => {
                debug_assert_eq!(channels, 4);
                for (pixel, bgra) in pixels.zip(out.chunks_exact_mut(4)) {
                    bgra[0] = pixel[2];
                    bgra[1] = pixel[1];
                    bgra[2] = pixel[0];
                    bgra[3] = pixel[3];
                }
            }
        }
        Ok(())
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::BmpWriteOptions;
    use crate::buffer::PixelBuffer;
    use crate::colortable::ColorTable;
    use crate::error::ErrorKind;

    #[test]
    fn one_pixel_24_bit_layout() {
        let buffer =
            PixelBuffer::from_data(1, 1, false, 4, vec![10, 20, 30, 0])
                .unwrap();
        let mut output = Vec::new();
        buffer.write_bmp(&mut output, &BmpWriteOptions::default()).unwrap();
        let expected: &[u8] = b"BM\x3a\0\0\0\0\0\0\0\x36\0\0\0\
              \x28\0\0\0\x01\0\0\0\x01\0\0\0\x01\0\x18\0\
              \0\0\0\0\x04\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\
              \x1e\x14\x0a\0";
        assert_eq!(output.as_slice(), expected);
    }

    #[test]
    fn palette_depth_and_packing() {
        let pixels = vec![
            0, 0, 0, 255, 255, 255, 0, 0, 0, 0, 0, 0, //
        ];
        let buffer = PixelBuffer::from_data(3, 1, false, 12, pixels).unwrap();
        let palette =
            ColorTable::new(vec![(0, 0, 0), (255, 255, 255)]).unwrap();
        let options =
            BmpWriteOptions { alpha_bitfields: false, palette: Some(palette) };
        let mut output = Vec::new();
        buffer.write_bmp(&mut output, &options).unwrap();
        // 14 + 40 + 2 palette entries + one padded row.
        assert_eq!(output.len(), 14 + 40 + 8 + 4);
        assert_eq!(output[28], 1);
        assert_eq!(&output[54..62], &[0, 0, 0, 0, 255, 255, 255, 0]);
        assert_eq!(&output[62..], &[0b0100_0000, 0, 0, 0]);
    }

    #[test]
    fn color_missing_from_palette_fails() {
        let buffer =
            PixelBuffer::from_data(1, 1, false, 4, vec![1, 2, 3, 0]).unwrap();
        let palette = ColorTable::new(vec![(0, 0, 0)]).unwrap();
        let options =
            BmpWriteOptions { alpha_bitfields: false, palette: Some(palette) };
        let mut output = Vec::new();
        let error = buffer.write_bmp(&mut output, &options).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UnsupportedFormat);
        assert!(output.is_empty());
    }
}

//===========================================================================//
