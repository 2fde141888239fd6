use crate::bitfield::BitFieldSpec;
use crate::buffer::{ByteOrder, PixelBuffer};
use crate::colortable::ColorTable;
use crate::error::Result;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

//===========================================================================//

/// The pixel layout of a native display image.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct NativeFormat {
    /// Number of significant bits in each pixel word.
    pub depth: u16,
    /// Number of bits each pixel occupies in a scanline.
    pub bits_per_pixel: u16,
    /// Byte order of pixel words wider than one byte.
    pub byte_order: ByteOrder,
}

//===========================================================================//

/// How pixel words map to colors on the display the image came from.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum Visual {
    /// Each pixel word is an index into a color table.
    Indexed(ColorTable),
    /// Each pixel word packs the channel values directly.
    TrueColor(BitFieldSpec),
    /// Each channel of the pixel word indexes the matching channel of a
    /// color table.
    DirectColor(BitFieldSpec, ColorTable),
}

//===========================================================================//

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PixelSize {
    /// Several pixels per byte, most significant bits first.
    Packed(u32),
    Bytes(usize),
}

/// A read-only snapshot of native display pixels.
#[derive(Clone, Copy, Debug)]
pub struct NativeImage<'a> {
    width: u32,
    height: u32,
    format: NativeFormat,
    size: PixelSize,
    bytes_per_line: usize,
    row_bytes: usize,
    data: &'a [u8],
}

impl<'a> NativeImage<'a> {
    /// Wraps raw scanlines, `bytes_per_line` apart, in the given format.
    /// Returns an error if the format is unsupported or `data` is too short
    /// to hold every scanline.
    pub fn new(
        width: u32,
        height: u32,
        format: NativeFormat,
        bytes_per_line: usize,
        data: &'a [u8],
    ) -> Result<NativeImage<'a>> {
        if width == 0 || height == 0 {
            bad_dimensions!("Invalid native image size {}x{}", width, height);
        }
        let size = match format.bits_per_pixel {
            1 | 2 | 4 => PixelSize::Packed(format.bits_per_pixel as u32),
            8 | 16 | 24 | 32 => {
                PixelSize::Bytes(format.bits_per_pixel as usize / 8)
            }
            other => unsupported!("Unsupported bits-per-pixel ({})", other),
        };
        if format.depth == 0 || format.depth > format.bits_per_pixel {
            unsupported!(
                "Invalid depth (was {}, but must be between 1 and {})",
                format.depth,
                format.bits_per_pixel
            );
        }
        let row_bits = (width as u64) * (format.bits_per_pixel as u64);
        let row_bytes = ((row_bits + 7) / 8) as usize;
        if bytes_per_line < row_bytes {
            bad_dimensions!(
                "Invalid bytes-per-line (was {}, but must be at least {})",
                bytes_per_line,
                row_bytes
            );
        }
        let needed = (height as usize - 1)
            .checked_mul(bytes_per_line)
            .and_then(|len| len.checked_add(row_bytes));
        match needed {
            Some(needed) if data.len() >= needed => {}
            Some(needed) => truncated!(
                "Native image data too short (was {} bytes, but must be {})",
                data.len(),
                needed
            ),
            None => bad_dimensions!("{}x{} image is too large", width, height),
        }
        Ok(NativeImage {
            width,
            height,
            format,
            size,
            bytes_per_line,
            row_bytes,
            data,
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

    /// Returns the pixel layout.
    pub fn format(&self) -> NativeFormat {
        self.format
    }

    fn scanline(&self, y: u32) -> &'a [u8] {
        let start = (y as usize) * self.bytes_per_line;
        &self.data[start..][..self.row_bytes]
    }

    /// Reads the pixel word at column `x` of a scanline.
    fn pixel(&self, scanline: &[u8], x: usize) -> u32 {
        match self.size {
            PixelSize::Packed(bits) => {
                let bit = x * bits as usize;
                let byte = scanline[bit / 8] as u32;
                let shift = 8 - bits - (bit % 8) as u32;
                (byte >> shift) & ((1 << bits) - 1)
            }
            PixelSize::Bytes(len) => {
                let bytes = &scanline[x * len..][..len];
                match self.format.byte_order {
                    ByteOrder::LsbFirst => bytes
                        .iter()
                        .rev()
                        .fold(0, |word, &byte| (word << 8) | byte as u32),
                    ByteOrder::MsbFirst => bytes
                        .iter()
                        .fold(0, |word, &byte| (word << 8) | byte as u32),
                }
            }
        }
    }
}

//===========================================================================//

impl PixelBuffer {
    /// Converts a native display image into 8-bit RGB, or RGBA with an
    /// opaque alpha channel if `with_alpha` is true.
    pub fn from_native(
        image: &NativeImage,
        visual: &Visual,
        with_alpha: bool,
    ) -> Result<PixelBuffer> {
        let mut dest = PixelBuffer::new(image.width, image.height, with_alpha)?
            .with_source_depth(image.format.depth)
            .with_byte_order(image.format.byte_order);
        let converter = Converter::classify(image, visual, with_alpha);
        log::debug!(
            "Converting {}x{} native image (depth {}, {} bpp, {:?}) via {}",
            image.width,
            image.height,
            image.format.depth,
            image.format.bits_per_pixel,
            image.format.byte_order,
            converter.name()
        );
        converter.run(image, &mut dest);
        Ok(dest)
    }
}

//===========================================================================//

/// The conversion strategy for one (layout, byte order, alpha) combination.
#[derive(Clone, Copy, Debug)]
enum Converter<'a> {
    Indexed1 { table: &'a ColorTable },
    Indexed8 { table: &'a ColorTable, mask: u32 },
    Rgb555 { order: ByteOrder, alpha: bool },
    Rgb565 { order: ByteOrder, alpha: bool },
    Rgb888 { order: ByteOrder },
    Generic { visual: &'a Visual },
}

impl<'a> Converter<'a> {
    fn classify(
        image: &NativeImage,
        visual: &'a Visual,
        alpha: bool,
    ) -> Converter<'a> {
        let format = image.format;
        let order = format.byte_order;
        match visual {
            Visual::Indexed(table) => match format.bits_per_pixel {
                1 => Converter::Indexed1 { table },
                8 => Converter::Indexed8 {
                    table,
                    mask: depth_mask(format.depth),
                },
                _ => Converter::Generic { visual },
            },
            Visual::TrueColor(spec) => {
                match (format.depth, format.bits_per_pixel) {
                    (15, 16) if spec.has_rgb_masks(0x7c00, 0x3e0, 0x1f) => {
                        Converter::Rgb555 { order, alpha }
                    }
                    (16, 16) if spec.has_rgb_masks(0xf800, 0x7e0, 0x1f) => {
                        Converter::Rgb565 { order, alpha }
                    }
                    (24, 32) | (32, 32)
                        if spec.has_rgb_masks(0xff0000, 0xff00, 0xff) =>
                    {
                        Converter::Rgb888 { order }
                    }
                    _ => Converter::Generic { visual },
                }
            }
            Visual::DirectColor(..) => Converter::Generic { visual },
        }
    }

    fn name(&self) -> &'static str {
        match *self {
            Converter::Indexed1 { .. } => "1-bit indexed",
            Converter::Indexed8 { .. } => "8-bit indexed",
            Converter::Rgb555 { alpha: false, .. } => "5-5-5 pairs",
            Converter::Rgb555 { alpha: true, .. } => "5-5-5 with alpha",
            Converter::Rgb565 { alpha: false, .. } => "5-6-5 pairs",
            Converter::Rgb565 { alpha: true, .. } => "5-6-5 with alpha",
            Converter::Rgb888 { .. } => "8-8-8",
            Converter::Generic { .. } => "generic bitfields",
        }
    }

    fn run(self, image: &NativeImage, dest: &mut PixelBuffer) {
        match self {
            Converter::Indexed1 { table } => {
                convert_indexed1(image, table, dest)
            }
            Converter::Indexed8 { table, mask } => {
                convert_indexed8(image, table, mask, dest)
            }
            Converter::Rgb555 { order, alpha: false } => {
                convert_16bit_pairs(image, order, expand_555, dest)
            }
            Converter::Rgb555 { order, alpha: true } => {
                convert_16bit_single(image, order, expand_555, dest)
            }
            Converter::Rgb565 { order, alpha: false } => {
                convert_16bit_pairs(image, order, expand_565, dest)
            }
            Converter::Rgb565 { order, alpha: true } => {
                convert_16bit_single(image, order, expand_565, dest)
            }
            Converter::Rgb888 { order } => convert_888(image, order, dest),
            Converter::Generic { visual } => {
                convert_generic(image, visual, dest)
            }
        }
    }
}

//===========================================================================//

fn depth_mask(depth: u16) -> u32 {
    if depth >= 32 {
        u32::MAX
    } else {
        (1 << depth) - 1
    }
}

// Writes one pixel; the alpha byte, if the output has one, is opaque.
fn put_rgb(out: &mut [u8], (red, green, blue): (u8, u8, u8)) {
    out[0] = red;
    out[1] = green;
    out[2] = blue;
    if out.len() == 4 {
        out[3] = u8::MAX;
    }
}

fn read_u16(bytes: &[u8], order: ByteOrder) -> u16 {
    match order {
        ByteOrder::LsbFirst => u16::from_le_bytes([bytes[0], bytes[1]]),
        ByteOrder::MsbFirst => u16::from_be_bytes([bytes[0], bytes[1]]),
    }
}

/// rrrrrggg ggbbbbb -> rrrrrRRR gggggGGG bbbbbBBB
fn expand_555(word: u16) -> (u8, u8, u8) {
    let word = word as u32;
    let red = ((word >> 7) & 0xf8) | ((word >> 12) & 0x7);
    let green = ((word >> 2) & 0xf8) | ((word >> 7) & 0x7);
    let blue = ((word << 3) & 0xf8) | ((word >> 2) & 0x7);
    (red as u8, green as u8, blue as u8)
}

/// rrrrrggg gggbbbbb -> rrrrrRRR ggggggGG bbbbbBBB
fn expand_565(word: u16) -> (u8, u8, u8) {
    let word = word as u32;
    let red = ((word >> 8) & 0xf8) | ((word >> 13) & 0x7);
    let green = ((word >> 3) & 0xfc) | ((word >> 9) & 0x3);
    let blue = ((word << 3) & 0xf8) | ((word >> 2) & 0x7);
    (red as u8, green as u8, blue as u8)
}

fn convert_indexed1(
    image: &NativeImage,
    table: &ColorTable,
    dest: &mut PixelBuffer,
) {
    let channels = dest.n_channels() as usize;
    for y in 0..image.height {
        let src = image.scanline(y);
        let out = dest.row_mut(y);
        for (x, pixel) in out.chunks_exact_mut(channels).enumerate() {
            let index = (src[x >> 3] >> (7 - (x & 7))) & 1;
            put_rgb(pixel, table.lookup(index as usize));
        }
    }
}

fn convert_indexed8(
    image: &NativeImage,
    table: &ColorTable,
    mask: u32,
    dest: &mut PixelBuffer,
) {
    let channels = dest.n_channels() as usize;
    for y in 0..image.height {
        let src = image.scanline(y);
        let out = dest.row_mut(y);
        for (&byte, pixel) in src.iter().zip(out.chunks_exact_mut(channels)) {
            put_rgb(pixel, table.lookup((byte as u32 & mask) as usize));
        }
    }
}

// Converts two pixels per 32-bit word, then the odd pixel out, if any.
fn convert_16bit_pairs(
    image: &NativeImage,
    order: ByteOrder,
    expand: fn(u16) -> (u8, u8, u8),
    dest: &mut PixelBuffer,
) {
    debug_assert_eq!(dest.n_channels(), 3);
    for y in 0..image.height {
        let src = image.scanline(y);
        let out = dest.row_mut(y);
        let mut words = src.chunks_exact(4);
        let mut pairs = out.chunks_exact_mut(6);
        for (word, pair) in words.by_ref().zip(pairs.by_ref()) {
            let word = [word[0], word[1], word[2], word[3]];
            let (first, second) = match order {
                ByteOrder::LsbFirst => {
                    let word = u32::from_le_bytes(word);
                    (word as u16, (word >> 16) as u16)
                }
                ByteOrder::MsbFirst => {
                    let word = u32::from_be_bytes(word);
                    ((word >> 16) as u16, word as u16)
                }
            };
            put_rgb(&mut pair[..3], expand(first));
            put_rgb(&mut pair[3..], expand(second));
        }
        let tail = pairs.into_remainder();
        if !tail.is_empty() {
            put_rgb(tail, expand(read_u16(words.remainder(), order)));
        }
    }
}

fn convert_16bit_single(
    image: &NativeImage,
    order: ByteOrder,
    expand: fn(u16) -> (u8, u8, u8),
    dest: &mut PixelBuffer,
) {
    let channels = dest.n_channels() as usize;
    for y in 0..image.height {
        let src = image.scanline(y);
        let out = dest.row_mut(y);
        for (word, pixel) in
            src.chunks_exact(2).zip(out.chunks_exact_mut(channels))
        {
            put_rgb(pixel, expand(read_u16(word, order)));
        }
    }
}

fn convert_888(image: &NativeImage, order: ByteOrder, dest: &mut PixelBuffer) {
    let channels = dest.n_channels() as usize;
    for y in 0..image.height {
        let src = image.scanline(y);
        let out = dest.row_mut(y);
        for (word, pixel) in
            src.chunks_exact(4).zip(out.chunks_exact_mut(channels))
        {
            let rgb = match order {
                ByteOrder::LsbFirst => (word[2], word[1], word[0]),
                ByteOrder::MsbFirst => (word[1], word[2], word[3]),
            };
            put_rgb(pixel, rgb);
        }
    }
}

/// Handles any depth, byte order and visual, one pixel word at a time.
fn convert_generic(
    image: &NativeImage,
    visual: &Visual,
    dest: &mut PixelBuffer,
) {
    let channels = dest.n_channels() as usize;
    let index_mask = depth_mask(image.format.depth);
    for y in 0..image.height {
        let src = image.scanline(y);
        let out = dest.row_mut(y);
        for (x, pixel) in out.chunks_exact_mut(channels).enumerate() {
            let word = image.pixel(src, x);
            let rgb = match visual {
                Visual::Indexed(table) => {
                    table.lookup((word & index_mask) as usize)
                }
                Visual::TrueColor(spec) => (
                    spec.red().replicate(word),
                    spec.green().replicate(word),
                    spec.blue().replicate(word),
                ),
                Visual::DirectColor(spec, table) => (
                    table.lookup(spec.red().top_byte(word) as usize).0,
                    table.lookup(spec.green().top_byte(word) as usize).1,
                    table.lookup(spec.blue().top_byte(word) as usize).2,
                ),
            };
            put_rgb(pixel, rgb);
        }
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{
        expand_555, expand_565, Converter, NativeFormat, NativeImage, Visual,
    };
    use crate::bitfield::BitFieldSpec;
    use crate::buffer::{ByteOrder, PixelBuffer};
    use crate::colortable::ColorTable;

    fn format(depth: u16, bpp: u16, order: ByteOrder) -> NativeFormat {
        NativeFormat { depth, bits_per_pixel: bpp, byte_order: order }
    }

    #[test]
    fn expansion_formulas_hit_full_scale() {
        assert_eq!(expand_565(0xffff), (0xff, 0xff, 0xff));
        assert_eq!(expand_565(0xf800), (0xff, 0x00, 0x00));
        assert_eq!(expand_565(0x07e0), (0x00, 0xff, 0x00));
        assert_eq!(expand_555(0x7fff), (0xff, 0xff, 0xff));
        assert_eq!(expand_555(0x03e0), (0x00, 0xff, 0x00));
    }

    #[test]
    fn classify_fast_paths() {
        let data = [0u8; 64];
        let rgb565 = Visual::TrueColor(BitFieldSpec::rgb(0xf800, 0x7e0, 0x1f));
        let image = NativeImage::new(
            4,
            2,
            format(16, 16, ByteOrder::MsbFirst),
            8,
            &data,
        )
        .unwrap();
        assert!(matches!(
            Converter::classify(&image, &rgb565, true),
            Converter::Rgb565 { order: ByteOrder::MsbFirst, alpha: true }
        ));
        let rgb888 =
            Visual::TrueColor(BitFieldSpec::rgb(0xff0000, 0xff00, 0xff));
        let image = NativeImage::new(
            4,
            2,
            format(24, 32, ByteOrder::LsbFirst),
            16,
            &data,
        )
        .unwrap();
        assert!(matches!(
            Converter::classify(&image, &rgb888, false),
            Converter::Rgb888 { order: ByteOrder::LsbFirst }
        ));
        // 24 bits per pixel has no fast path.
        let image = NativeImage::new(
            4,
            2,
            format(24, 24, ByteOrder::LsbFirst),
            12,
            &data,
        )
        .unwrap();
        assert!(matches!(
            Converter::classify(&image, &rgb888, false),
            Converter::Generic { .. }
        ));
    }

    #[test]
    fn direct_color_always_takes_generic_path() {
        let data = [0u8; 16];
        let visual = Visual::DirectColor(
            BitFieldSpec::rgb(0xff0000, 0xff00, 0xff),
            ColorTable::grayscale(256).unwrap(),
        );
        let image = NativeImage::new(
            2,
            2,
            format(24, 32, ByteOrder::LsbFirst),
            8,
            &data,
        )
        .unwrap();
        assert!(matches!(
            Converter::classify(&image, &visual, false),
            Converter::Generic { .. }
        ));
    }

    fn is_fast_path(converter: &Converter) -> bool {
        !matches!(converter, Converter::Generic { .. })
    }

    #[test]
    fn fast_paths_match_generic_path() {
        let layouts = [
            (BitFieldSpec::rgb(0x7c00, 0x3e0, 0x1f), 15, 16),
            (BitFieldSpec::rgb(0xf800, 0x7e0, 0x1f), 16, 16),
            (BitFieldSpec::rgb(0xff0000, 0xff00, 0xff), 24, 32),
            (BitFieldSpec::rgb(0xff0000, 0xff00, 0xff), 32, 32),
        ];
        let orders = [ByteOrder::LsbFirst, ByteOrder::MsbFirst];
        for &(masks, depth, bpp) in layouts.iter() {
            let visual = Visual::TrueColor(masks);
            for &order in orders.iter() {
                for &alpha in &[false, true] {
                    for width in 1..=5u32 {
                        // Two rows, each with two bytes of padding.
                        let stride = (width * bpp as u32 / 8) as usize + 2;
                        let data: Vec<u8> = (0..2 * stride)
                            .map(|i| (i as u8).wrapping_mul(37) ^ 0x5a)
                            .collect();
                        let format = format(depth, bpp, order);
                        let image =
                            NativeImage::new(width, 2, format, stride, &data)
                                .unwrap();
                        let converter =
                            Converter::classify(&image, &visual, alpha);
                        assert!(is_fast_path(&converter), "{:?}", format);
                        let fast =
                            PixelBuffer::from_native(&image, &visual, alpha)
                                .unwrap();
                        let mut slow = PixelBuffer::new(width, 2, alpha)
                            .unwrap()
                            .with_source_depth(depth)
                            .with_byte_order(order);
                        Converter::Generic { visual: &visual }
                            .run(&image, &mut slow);
                        assert_eq!(
                            fast, slow,
                            "{} at width {}, alpha {}",
                            converter.name(),
                            width,
                            alpha
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn packed_pixels_are_read_msb_first() {
        let data = [0b1011_0100u8];
        let image = NativeImage::new(
            4,
            1,
            format(2, 2, ByteOrder::LsbFirst),
            1,
            &data,
        )
        .unwrap();
        let words: Vec<u32> =
            (0..4).map(|x| image.pixel(image.scanline(0), x)).collect();
        assert_eq!(words, vec![2, 3, 1, 0]);
    }
}

//===========================================================================//
