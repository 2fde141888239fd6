use crate::bitfield::{BitFieldSpec, ChannelMask};
use crate::bmpdepth::BmpDepth;
use crate::bmpheader::{BmpHeader, Compression, Orientation};
use crate::buffer::{zeroed_bytes, PixelBuffer};
use crate::colortable::ColorTable;
use crate::error::Result;
use byteorder::{ByteOrder, LittleEndian};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::io::Read;

//===========================================================================//

/// Options for decoding a BMP image.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct BmpReadOptions {
    /// If true, an uncompressed 32-bit image whose fourth byte is nonzero
    /// anywhere is treated as having an alpha channel.  Otherwise that byte
    /// is ignored unless a v4/v5 header declares an alpha mask.
    pub detect_alpha: bool,
}

//===========================================================================//

/// A decoded BMP image.
#[derive(Clone, Debug)]
pub struct BmpImage {
    header: BmpHeader,
    pixels: PixelBuffer,
    palette: Option<ColorTable>,
    has_alpha: bool,
    depth: u16,
}

impl BmpImage {
    /// Decodes a BMP image with the default options.
    pub fn read<R: Read>(reader: R) -> Result<BmpImage> {
        BmpImage::read_with_options(reader, &BmpReadOptions::default())
    }

    /// Decodes a BMP image.  Returns an error if the headers are malformed
    /// or unsupported, or if the stream ends before the image is complete;
    /// never returns a partially decoded image.
    pub fn read_with_options<R: Read>(
        mut reader: R,
        options: &BmpReadOptions,
    ) -> Result<BmpImage> {
        let (header, palette) = BmpHeader::read(&mut reader)?;
        let no_palette = ColorTable::default();
        let layout = PixelLayout::classify(&header);
        log::debug!("Decoding BMP pixels as {:?}", layout);
        let (pixels, has_alpha) = match layout {
            PixelLayout::Indexed(depth) => {
                let palette = palette.as_ref().unwrap_or(&no_palette);
                let data = read_pixel_array(&mut reader, &header, depth)?;
                (decode_indexed(&header, depth, palette, &data)?, false)
            }
            PixelLayout::Bgr24 => {
                let data = read_pixel_array(
                    &mut reader,
                    &header,
                    BmpDepth::TwentyFour,
                )?;
                (decode_bgr(&header, &data, 3, false)?, false)
            }
            PixelLayout::Bgrx32 { alpha_mask } => {
                let data = read_pixel_array(
                    &mut reader,
                    &header,
                    BmpDepth::ThirtyTwo,
                )?;
                let has_alpha = alpha_mask
                    || (options.detect_alpha
                        && data.chunks_exact(4).any(|pixel| pixel[3] != 0));
                (decode_bgr(&header, &data, 4, has_alpha)?, has_alpha)
            }
            PixelLayout::BitFields(spec, depth) => {
                let data = read_pixel_array(&mut reader, &header, depth)?;
                let has_alpha = spec.alpha().mask() != 0;
                (decode_bitfields(&header, spec, depth, &data)?, has_alpha)
            }
            PixelLayout::Rle(depth) => {
                let palette = palette.as_ref().unwrap_or(&no_palette);
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                (decode_rle(&header, depth, palette, &data)?, false)
            }
        };
        let depth = layout.storage_depth();
        Ok(BmpImage {
            header,
            pixels: pixels.with_source_depth(depth),
            palette,
            has_alpha,
            depth,
        })
    }

    /// Returns the parsed headers.
    pub fn header(&self) -> &BmpHeader {
        &self.header
    }

    /// Returns the decoded pixels, top row first.
    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    /// Consumes the image and returns its pixels.
    pub fn into_pixels(self) -> PixelBuffer {
        self.pixels
    }

    /// Returns the palette, for images of 8 bits-per-pixel or less.
    pub fn palette(&self) -> Option<&ColorTable> {
        self.palette.as_ref()
    }

    /// Returns true if the decoded pixels carry an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Returns the depth the pixels were stored at: 1, 4, 8, 24 or 32.
    /// 16-bit images report 24.
    pub fn depth(&self) -> u16 {
        self.depth
    }
}

//===========================================================================//

/// The decoding strategy implied by a header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PixelLayout {
    Indexed(BmpDepth),
    Bgr24,
    Bgrx32 { alpha_mask: bool },
    BitFields(BitFieldSpec, BmpDepth),
    Rle(BmpDepth),
}

impl PixelLayout {
    fn classify(header: &BmpHeader) -> PixelLayout {
        let depth = BmpDepth::from_bits_per_pixel(header.bits_per_pixel());
        match (header.compression(), depth, header.masks()) {
            (Compression::Rle8, _, _) => PixelLayout::Rle(BmpDepth::Eight),
            (Compression::Rle4, _, _) => PixelLayout::Rle(BmpDepth::Four),
            (_, Some(BmpDepth::ThirtyTwo), Some(spec))
                if is_canonical_bgra(&spec) =>
            {
                let alpha_mask = spec.alpha().mask() != 0;
                PixelLayout::Bgrx32 { alpha_mask }
            }
            (_, Some(depth), Some(spec)) => {
                PixelLayout::BitFields(spec, depth)
            }
            (_, Some(BmpDepth::TwentyFour), None) => PixelLayout::Bgr24,
            (_, Some(BmpDepth::ThirtyTwo), None) => {
                PixelLayout::Bgrx32 { alpha_mask: false }
            }
            (_, Some(depth), None) => PixelLayout::Indexed(depth),
            // The header has already rejected every other bits-per-pixel.
            (_, None, _) => PixelLayout::Indexed(BmpDepth::Eight),
        }
    }

    fn storage_depth(&self) -> u16 {
        match *self {
            PixelLayout::Indexed(depth) | PixelLayout::Rle(depth) => {
                depth.bits_per_pixel()
            }
            PixelLayout::Bgr24 => 24,
            PixelLayout::Bgrx32 { .. } => 32,
            PixelLayout::BitFields(_, BmpDepth::ThirtyTwo) => 32,
            PixelLayout::BitFields(..) => 24,
        }
    }
}

fn is_canonical_bgra(spec: &BitFieldSpec) -> bool {
    spec.has_rgb_masks(0xff0000, 0xff00, 0xff)
        && (spec.alpha().mask() == 0 || spec.alpha().mask() == 0xff000000)
}

//===========================================================================//

/// Maps the `index`th stored row to its top-down row number.
fn dest_row(header: &BmpHeader, index: u32) -> u32 {
    match header.orientation() {
        Orientation::BottomUp => header.height() - 1 - index,
        Orientation::TopDown => index,
    }
}

fn read_pixel_array<R: Read>(
    reader: &mut R,
    header: &BmpHeader,
    depth: BmpDepth,
) -> Result<Vec<u8>> {
    let size = depth
        .row_size(header.width())
        .and_then(|row_size| row_size.checked_mul(header.height() as usize));
    let size = match size {
        Some(size) => size,
        None => bad_dimensions!(
            "{}x{} BMP is too large",
            header.width(),
            header.height()
        ),
    };
    let mut data = Vec::new();
    reader.take(size as u64).read_to_end(&mut data)?;
    if data.len() < size {
        truncated!(
            "BMP pixel data too short (was {} bytes, but must be {})",
            data.len(),
            size
        );
    }
    Ok(data)
}

fn decode_indexed(
    header: &BmpHeader,
    depth: BmpDepth,
    palette: &ColorTable,
    data: &[u8],
) -> Result<PixelBuffer> {
    let mut buffer = PixelBuffer::new(header.width(), header.height(), false)?;
    let bits = depth.bits_per_pixel() as usize;
    let mask = ((1u16 << bits) - 1) as u8;
    let row_size = data.len() / header.height() as usize;
    for (index, src) in data.chunks_exact(row_size).enumerate() {
        let out = buffer.row_mut(dest_row(header, index as u32));
        for (x, pixel) in out.chunks_exact_mut(3).enumerate() {
            let bit = x * bits;
            let shift = 8 - bits - bit % 8;
            let value = (src[bit / 8] >> shift) & mask;
            let (red, green, blue) = palette.lookup(value as usize);
            pixel.copy_from_slice(&[red, green, blue]);
        }
    }
    Ok(buffer)
}

fn decode_bgr(
    header: &BmpHeader,
    data: &[u8],
    bytes_per_pixel: usize,
    has_alpha: bool,
) -> Result<PixelBuffer> {
    let mut buffer =
        PixelBuffer::new(header.width(), header.height(), has_alpha)?;
    let channels = buffer.n_channels() as usize;
    let row_size = data.len() / header.height() as usize;
    for (index, src) in data.chunks_exact(row_size).enumerate() {
        let out = buffer.row_mut(dest_row(header, index as u32));
        for (bgr, pixel) in src
            .chunks_exact(bytes_per_pixel)
            .zip(out.chunks_exact_mut(channels))
        {
            pixel[0] = bgr[2];
            pixel[1] = bgr[1];
            pixel[2] = bgr[0];
            if has_alpha {
                pixel[3] = bgr[3];
            }
        }
    }
    Ok(buffer)
}

/// Scales one masked channel to 8 bits.
struct ChannelScaler {
    mask: u32,
    shift: u32,
    bits: u32,
    table: Vec<u8>,
}

impl ChannelScaler {
    fn new(channel: ChannelMask) -> ChannelScaler {
        // A missing channel reads as eight zero bits.
        let (shift, bits) = if channel.bits() == 0 {
            (0, 8)
        } else {
            (channel.shift(), channel.bits())
        };
        let table = if bits < 8 {
            let max = (1u32 << bits) - 1;
            (0..=max).map(|j| ((255 * j + max / 2) / max) as u8).collect()
        } else {
            Vec::new()
        };
        ChannelScaler { mask: channel.mask(), shift, bits, table }
    }

    fn scale(&self, pixel: u32) -> u8 {
        let value = (pixel & self.mask) >> self.shift;
        match self.bits.cmp(&8) {
            Ordering::Less => self.table[value as usize],
            Ordering::Equal => value as u8,
            Ordering::Greater => (value >> (self.bits - 8)) as u8,
        }
    }
}

fn decode_bitfields(
    header: &BmpHeader,
    spec: BitFieldSpec,
    depth: BmpDepth,
    data: &[u8],
) -> Result<PixelBuffer> {
    let has_alpha = spec.alpha().mask() != 0;
    let mut buffer =
        PixelBuffer::new(header.width(), header.height(), has_alpha)?;
    let channels = buffer.n_channels() as usize;
    let red = ChannelScaler::new(spec.red());
    let green = ChannelScaler::new(spec.green());
    let blue = ChannelScaler::new(spec.blue());
    let alpha = ChannelScaler::new(spec.alpha());
    let bytes_per_pixel = depth.bits_per_pixel() as usize / 8;
    let row_size = data.len() / header.height() as usize;
    for (index, src) in data.chunks_exact(row_size).enumerate() {
        let out = buffer.row_mut(dest_row(header, index as u32));
        for (word, pixel) in src
            .chunks_exact(bytes_per_pixel)
            .zip(out.chunks_exact_mut(channels))
        {
            let word = if bytes_per_pixel == 2 {
                LittleEndian::read_u16(word) as u32
            } else {
                LittleEndian::read_u32(word)
            };
            pixel[0] = red.scale(word);
            pixel[1] = green.scale(word);
            pixel[2] = blue.scale(word);
            if has_alpha {
                pixel[3] = alpha.scale(word);
            }
        }
    }
    Ok(buffer)
}

//===========================================================================//

/// Palette indices for an RLE image, in stored row order.
struct RleCanvas {
    width: usize,
    height: usize,
    indices: Vec<u8>,
}

impl RleCanvas {
    fn put(&mut self, x: usize, y: usize, index: u8) {
        if x < self.width && y < self.height {
            self.indices[y * self.width + x] = index;
        }
    }
}

fn decode_rle(
    header: &BmpHeader,
    depth: BmpDepth,
    palette: &ColorTable,
    data: &[u8],
) -> Result<PixelBuffer> {
    // Creating the output first bounds the canvas size.
    let mut buffer = PixelBuffer::new(header.width(), header.height(), false)?;
    let width = header.width() as usize;
    let height = header.height() as usize;
    let indices = zeroed_bytes(width * height)?;
    let mut canvas = RleCanvas { width, height, indices };
    run_rle_records(&mut canvas, depth, data)?;
    for (index, src) in canvas.indices.chunks_exact(width).enumerate() {
        let out = buffer.row_mut(dest_row(header, index as u32));
        for (&value, pixel) in src.iter().zip(out.chunks_exact_mut(3)) {
            let (red, green, blue) = palette.lookup(value as usize);
            pixel.copy_from_slice(&[red, green, blue]);
        }
    }
    Ok(buffer)
}

fn run_rle_records(
    canvas: &mut RleCanvas,
    depth: BmpDepth,
    data: &[u8],
) -> Result<()> {
    let four_bit = depth == BmpDepth::Four;
    let nibble = |value: u8, i: usize| -> u8 {
        if !four_bit {
            value
        } else if i % 2 == 0 {
            value >> 4
        } else {
            value & 0xf
        }
    };
    let (mut x, mut y) = (0usize, 0usize);
    let mut pos = 0;
    loop {
        let record = &data[pos.min(data.len())..];
        if record.len() < 2 {
            break;
        }
        let (count, value) = (record[0] as usize, record[1]);
        if count > 0 {
            log::trace!("RLE run of {} at ({}, {})", count, x, y);
            if y < canvas.height {
                for i in 0..count {
                    canvas.put(x + i, y, nibble(value, i));
                }
            }
            x += count;
            pos += 2;
            continue;
        }
        match value {
            0 => {
                log::trace!("RLE end of line at row {}", y);
                x = 0;
                y += 1;
                pos += 2;
            }
            1 => {
                log::trace!("RLE end of bitmap at ({}, {})", x, y);
                return Ok(());
            }
            2 => {
                if record.len() < 4 {
                    break;
                }
                let (dx, dy) = (record[2] as usize, record[3] as usize);
                log::trace!("RLE delta ({}, {}) from ({}, {})", dx, dy, x, y);
                x += dx;
                y += dy;
                pos += 4;
            }
            literal => {
                let literal = literal as usize;
                let bits = depth.bits_per_pixel() as usize;
                let len = 2 + (literal * bits + 15) / 16 * 2;
                if record.len() < len {
                    break;
                }
                log::trace!("RLE literal of {} at ({}, {})", literal, x, y);
                if y < canvas.height {
                    for i in 0..literal {
                        let byte = record[2 + i * bits / 8];
                        canvas.put(x + i, y, nibble(byte, i));
                    }
                }
                x += literal;
                pos += len;
            }
        }
    }
    // The data ran out before an end-of-bitmap record.
    if x >= canvas.width {
        y += 1;
    }
    if y >= canvas.height {
        log::warn!("RLE data ended without an end-of-bitmap record");
        Ok(())
    } else {
        truncated!(
            "RLE data ended at row {} of {} without an end-of-bitmap record",
            y,
            canvas.height
        );
    }
}

//===========================================================================//


//===========================================================================//
