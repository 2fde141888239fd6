use crate::bmpdepth::BmpDepth;
use crate::buffer::PixelBuffer;
use crate::error::Result;
use byteorder::{LittleEndian, WriteBytesExt};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::io::Write;

//===========================================================================//

// The size of a BITMAPINFOHEADER struct, in bytes.
const BMP_HEADER_LEN: u32 = 40;

// The sizes of the ICONDIR struct and of one ICONDIRENTRY, in bytes.
const ICON_DIR_LEN: u32 = 6;
const ICON_DIR_ENTRY_LEN: u32 = 16;

// Entry width and height are stored in a single byte each.
const MAX_SIZE: u32 = 255;

// Pixels with alpha below this are marked transparent in the AND mask.
const AND_MASK_ALPHA_THRESHOLD: u8 = 0x80;

//===========================================================================//

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
/// The type of resource stored in an ICO/CUR file.
pub enum ResourceType {
    /// Plain images (ICO files)
    Icon,
    /// Images with cursor hotspots (CUR files)
    Cursor,
}

impl ResourceType {
    pub(crate) fn number(&self) -> u16 {
        match *self {
            ResourceType::Icon => 1,
            ResourceType::Cursor => 2,
        }
    }
}

//===========================================================================//

/// A pixel buffer laid out as the single image of an ICO or CUR file.
#[derive(Clone, Debug)]
pub struct IconImage {
    width: u32,
    height: u32,
    depth: BmpDepth,
    hotspot: Option<(u16, u16)>,
    xor_stride: usize,
    and_stride: usize,
    xor_data: Vec<u8>,
    and_data: Vec<u8>,
}

impl IconImage {
    /// Builds the color (XOR) and transparency (AND) masks for `buffer`.
    /// Giving a `hotspot` makes the image a cursor.
    ///
    /// Returns an error if either dimension is over 255 pixels, or if the
    /// hotspot lies outside the image.
    pub fn from_buffer(
        buffer: &PixelBuffer,
        hotspot: Option<(u16, u16)>,
    ) -> Result<IconImage> {
        let width = buffer.width();
        let height = buffer.height();
        if width > MAX_SIZE || height > MAX_SIZE {
            over_capacity!(
                "Image too large for an icon (was {}x{}, but max is {}x{})",
                width,
                height,
                MAX_SIZE,
                MAX_SIZE
            );
        }
        if let Some((x, y)) = hotspot {
            if (x as u32) >= width || (y as u32) >= height {
                bad_dimensions!(
                    "Cursor hotspot ({}, {}) is outside {}x{} image",
                    x,
                    y,
                    width,
                    height
                );
            }
        }
        let depth = if buffer.has_alpha() {
            BmpDepth::ThirtyTwo
        } else if buffer.source_depth() == 16 {
            BmpDepth::Sixteen
        } else {
            BmpDepth::TwentyFour
        };
        // Both strides fit easily, since the width is at most 255.
        let xor_stride = depth.row_size(width).unwrap_or_default();
        let and_stride = BmpDepth::One.row_size(width).unwrap_or_default();
        log::debug!(
            "Encoding {}x{} {} at {} bits-per-pixel",
            width,
            height,
            if hotspot.is_some() { "cursor" } else { "icon" },
            depth.bits_per_pixel()
        );

        // Both masks are stored row by row, starting from the *bottom* row:
        let mut xor_data = Vec::with_capacity(xor_stride * height as usize);
        let mut and_data = Vec::with_capacity(and_stride * height as usize);
        let channels = buffer.n_channels() as usize;
        for y in (0..height).rev() {
            let mut xor_row = vec![0u8; xor_stride];
            let mut and_row = vec![0u8; and_stride];
            let pixels = buffer.row(y).chunks_exact(channels);
            for (x, pixel) in pixels.enumerate() {
                let (red, green, blue) = (pixel[0], pixel[1], pixel[2]);
                match depth {
                    BmpDepth::ThirtyTwo => {
                        let start = 4 * x;
                        xor_row[start..start + 4]
                            .copy_from_slice(&[blue, green, red, pixel[3]]);
                    }
                    BmpDepth::Sixteen => {
                        let word = ((red as u16 >> 3) << 10)
                            | ((green as u16 >> 3) << 5)
                            | (blue as u16 >> 3);
                        let start = 2 * x;
                        xor_row[start..start + 2]
                            .copy_from_slice(&word.to_le_bytes());
                    }
                    _ => {
                        let start = 3 * x;
                        xor_row[start..start + 3]
                            .copy_from_slice(&[blue, green, red]);
                    }
                }
                if buffer.has_alpha() && pixel[3] < AND_MASK_ALPHA_THRESHOLD {
                    and_row[x / 8] |= 1 << (7 - x % 8);
                }
            }
            xor_data.extend_from_slice(&xor_row);
            and_data.extend_from_slice(&and_row);
        }
        Ok(IconImage {
            width,
            height,
            depth,
            hotspot,
            xor_stride,
            and_stride,
            xor_data,
            and_data,
        })
    }

    /// Returns the width of the image, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the image, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the bits-per-pixel of the color mask: 16, 24 or 32.
    pub fn bits_per_pixel(&self) -> u16 {
        self.depth.bits_per_pixel()
    }

    /// Returns `Cursor` if the image has a hotspot, or `Icon` otherwise.
    pub fn resource_type(&self) -> ResourceType {
        if self.hotspot.is_some() {
            ResourceType::Cursor
        } else {
            ResourceType::Icon
        }
    }

    /// Returns the coordinates of the cursor hotspot (pixels right from the
    /// left edge of the image, and pixels down from the top edge), if any.
    pub fn cursor_hotspot(&self) -> Option<(u16, u16)> {
        self.hotspot
    }

    /// Returns the color mask rows, bottom row first.
    pub fn xor_data(&self) -> &[u8] {
        &self.xor_data
    }

    /// Returns the transparency mask rows, bottom row first.
    pub fn and_data(&self) -> &[u8] {
        &self.and_data
    }

    /// Returns the size of the image's BMP data, in bytes.
    pub fn data_size(&self) -> u32 {
        let rows = self.height as usize * (self.and_stride + self.xor_stride);
        BMP_HEADER_LEN + rows as u32
    }

    /// Encodes the image as a single-entry ICO or CUR file.
    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        write_icon_dir(
            &mut writer,
            self.resource_type(),
            std::slice::from_ref(self),
        )
    }
}

//===========================================================================//

fn write_icon_dir<W: Write>(
    writer: &mut W,
    restype: ResourceType,
    entries: &[IconImage],
) -> Result<()> {
    if entries.len() > (u16::MAX as usize) {
        over_capacity!(
            "Too many entries in icon file (was {}, but max is {})",
            entries.len(),
            u16::MAX
        );
    }
    writer.write_u16::<LittleEndian>(0)?; // reserved
    writer.write_u16::<LittleEndian>(restype.number())?;
    writer.write_u16::<LittleEndian>(entries.len() as u16)?;
    let mut data_offset =
        ICON_DIR_LEN + ICON_DIR_ENTRY_LEN * (entries.len() as u32);
    for entry in entries.iter() {
        writer.write_u8(entry.width as u8)?;
        writer.write_u8(entry.height as u8)?;
        writer.write_u8(0)?; // num colors
        writer.write_u8(0)?; // reserved
        match entry.hotspot {
            Some((x, y)) => {
                writer.write_u16::<LittleEndian>(x)?;
                writer.write_u16::<LittleEndian>(y)?;
            }
            None => {
                writer.write_u16::<LittleEndian>(1)?; // color planes
                writer.write_u16::<LittleEndian>(entry.bits_per_pixel())?;
            }
        }
        let data_size = entry.data_size();
        writer.write_u32::<LittleEndian>(data_size)?;
        writer.write_u32::<LittleEndian>(data_offset)?;
        data_offset += data_size;
    }
    for entry in entries.iter() {
        // The height is stored doubled, counting the rows of both the color
        // data and the alpha mask.
        writer.write_u32::<LittleEndian>(BMP_HEADER_LEN)?;
        writer.write_i32::<LittleEndian>(entry.width as i32)?;
        writer.write_i32::<LittleEndian>(2 * entry.height as i32)?;
        writer.write_u16::<LittleEndian>(1)?; // planes
        writer.write_u16::<LittleEndian>(entry.bits_per_pixel())?;
        writer.write_u32::<LittleEndian>(0)?; // compression
        writer.write_u32::<LittleEndian>(0)?; // image size
        writer.write_i32::<LittleEndian>(0)?; // horz ppm
        writer.write_i32::<LittleEndian>(0)?; // vert ppm
        writer.write_u32::<LittleEndian>(0)?; // colors used
        writer.write_u32::<LittleEndian>(0)?; // colors important
        writer.write_all(&entry.xor_data)?;
        writer.write_all(&entry.and_data)?;
    }
    Ok(())
}

//===========================================================================//

impl PixelBuffer {
    /// Encodes the pixels as a single-entry icon, or as a cursor if a
    /// `hotspot` is given.  The writer is flushed whether or not encoding
    /// succeeds.
    pub fn write_ico<W: Write>(
        &self,
        mut writer: W,
        hotspot: Option<(u16, u16)>,
    ) -> Result<()> {
        let result = IconImage::from_buffer(self, hotspot)
            .and_then(|icon| icon.write(&mut writer));
        let flushed = writer.flush();
        result?;
        flushed?;
        Ok(())
    }
}

//===========================================================================//


//===========================================================================//
