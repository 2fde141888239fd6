use crate::buffer::PixelBuffer;
use crate::error::{Error, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::ops::BitOr;
use std::str::FromStr;

//===========================================================================//

// zlib-style compression levels accepted by `PngOptions`.
const MAX_COMPRESSION_LEVEL: u8 = 9;
const DEFAULT_COMPRESSION_LEVEL: u8 = 6;

//===========================================================================//

/// A set of PNG row filters to choose from.  The empty set leaves the choice
/// to the encoder.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct FilterMask(u8);

impl FilterMask {
    /// Let the encoder pick filters adaptively.
    pub const AUTO: FilterMask = FilterMask(0);
    /// The "None" filter (rows stored as-is).
    pub const NONE: FilterMask = FilterMask(0x01);
    /// The "Sub" filter.
    pub const SUB: FilterMask = FilterMask(0x02);
    /// The "Up" filter.
    pub const UP: FilterMask = FilterMask(0x04);
    /// The "Average" filter.
    pub const AVERAGE: FilterMask = FilterMask(0x08);
    /// The "Paeth" filter.
    pub const PAETH: FilterMask = FilterMask(0x10);
    /// All five filters.
    pub const ALL: FilterMask = FilterMask(0x1f);

    /// Returns true if no filter is selected.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns true if every filter in `other` is also in `self`.
    pub fn contains(&self, other: FilterMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Parses a comma-separated, case-insensitive list of filter names:
    /// `NONE`, `SUB`, `UP`, `AVERAGE` (or `AVG`), `PAETH`, `ALL`, and `AUTO`
    /// (or `DEFAULT`), which clears the filters named before it.
    pub fn parse(text: &str) -> Result<FilterMask> {
        let mut mask = FilterMask::AUTO;
        for name in text.split(',') {
            let name = name.trim().to_ascii_uppercase();
            mask = match name.as_str() {
                "NONE" => mask | FilterMask::NONE,
                "SUB" => mask | FilterMask::SUB,
                "UP" => mask | FilterMask::UP,
                "AVERAGE" | "AVG" => mask | FilterMask::AVERAGE,
                "PAETH" => mask | FilterMask::PAETH,
                "ALL" => mask | FilterMask::ALL,
                "AUTO" | "DEFAULT" => FilterMask::AUTO,
                _ => invalid_config!("Unknown PNG filter name {:?}", name),
            };
        }
        Ok(mask)
    }

    /// Returns the single filter in the set, if there is exactly one.
    fn single_filter(&self) -> Option<png::FilterType> {
        match *self {
            FilterMask::NONE => Some(png::FilterType::NoFilter),
            FilterMask::SUB => Some(png::FilterType::Sub),
            FilterMask::UP => Some(png::FilterType::Up),
            FilterMask::AVERAGE => Some(png::FilterType::Avg),
            FilterMask::PAETH => Some(png::FilterType::Paeth),
            _ => None,
        }
    }
}

impl BitOr for FilterMask {
    type Output = FilterMask;

    fn bitor(self, other: FilterMask) -> FilterMask {
        FilterMask(self.0 | other.0)
    }
}

impl FromStr for FilterMask {
    type Err = Error;

    fn from_str(text: &str) -> Result<FilterMask> {
        FilterMask::parse(text)
    }
}

//===========================================================================//

/// A color to mark as fully transparent in PNG output.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum TransparentColor {
    /// An exact RGB value.
    Rgb(u8, u8, u8),
    /// An index into the output palette.
    PaletteIndex(u8),
}

impl TransparentColor {
    /// Parses `#RRGGBB`, `r,g,b` (decimal, each at most 255), a single
    /// palette index `n` (at most 255), or `NONE` (which gives `None`).
    pub fn parse(text: &str) -> Result<Option<TransparentColor>> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("NONE") {
            return Ok(None);
        }
        if let Some(hex) = text.strip_prefix('#') {
            if hex.len() == 6 && hex.is_ascii() {
                let channel =
                    |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
                if let (Ok(red), Ok(green), Ok(blue)) =
                    (channel(0), channel(2), channel(4))
                {
                    return Ok(Some(TransparentColor::Rgb(red, green, blue)));
                }
            }
            invalid_config!("Invalid transparent color {:?}", text);
        }
        let values: Vec<_> =
            text.split(',').map(|part| part.trim().parse::<u8>()).collect();
        match values.as_slice() {
            [Ok(red), Ok(green), Ok(blue)] => {
                Ok(Some(TransparentColor::Rgb(*red, *green, *blue)))
            }
            [Ok(index)] => Ok(Some(TransparentColor::PaletteIndex(*index))),
            _ => invalid_config!("Invalid transparent color {:?}", text),
        }
    }
}

//===========================================================================//

/// Options for encoding a PNG image.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct PngOptions {
    /// zlib-style level from 0 (fastest) to 9 (smallest).
    pub compression_level: u8,
    /// Row filters the encoder may use.
    pub filters: FilterMask,
    /// A color to mark as transparent, for output without alpha.
    pub transparent: Option<TransparentColor>,
}

impl Default for PngOptions {
    fn default() -> PngOptions {
        PngOptions {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            filters: FilterMask::AUTO,
            transparent: None,
        }
    }
}

impl PngOptions {
    /// Returns an error if any value is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.compression_level > MAX_COMPRESSION_LEVEL {
            invalid_config!(
                "Invalid PNG compression level (was {}, but max is {})",
                self.compression_level,
                MAX_COMPRESSION_LEVEL
            );
        }
        Ok(())
    }

    fn compression(&self) -> png::Compression {
        match self.compression_level {
            0..=3 => png::Compression::Fast,
            4..=6 => png::Compression::Default,
            _ => png::Compression::Best,
        }
    }
}

//===========================================================================//

impl PixelBuffer {
    /// Encodes the pixels as an 8-bit RGB or RGBA PNG file.
    pub fn write_png<W: Write>(
        &self,
        writer: W,
        options: &PngOptions,
    ) -> Result<()> {
        options.validate()?;
        match self.write_png_internal(writer, options) {
            Ok(()) => Ok(()),
            Err(png::EncodingError::IoError(error)) => Err(error.into()),
            Err(png::EncodingError::Format(error)) => {
                unsupported!("PNG format error: {}", error);
            }
            Err(png::EncodingError::LimitsExceeded) => {
                over_capacity!("PNG limits exceeded");
            }
            Err(png::EncodingError::Parameter(error)) => {
                unsupported!("PNG parameter error: {}", error);
            }
        }
    }

    fn write_png_internal<W: Write>(
        &self,
        writer: W,
        options: &PngOptions,
    ) -> std::result::Result<(), png::EncodingError> {
        let mut encoder =
            png::Encoder::new(writer, self.width(), self.height());
        encoder.set_depth(png::BitDepth::Eight);
        if self.has_alpha() {
            encoder.set_color(png::ColorType::Rgba);
        } else {
            encoder.set_color(png::ColorType::Rgb);
        }
        encoder.set_compression(options.compression());
        if let Some(filter) = options.filters.single_filter() {
            encoder.set_filter(filter);
            encoder.set_adaptive_filter(png::AdaptiveFilterType::NonAdaptive);
        } else {
            encoder.set_adaptive_filter(png::AdaptiveFilterType::Adaptive);
        }
        match options.transparent {
            Some(TransparentColor::Rgb(red, green, blue))
                if !self.has_alpha() =>
            {
                // tRNS samples are 16-bit big-endian, even at 8-bit depth.
                encoder.set_trns(vec![0, red, 0, green, 0, blue]);
            }
            Some(color) => {
                log::warn!(
                    "Ignoring transparent color {:?} for {} PNG output",
                    color,
                    if self.has_alpha() { "RGBA" } else { "RGB" }
                );
            }
            None => {}
        }
        log::debug!(
            "Encoding {}x{} PNG ({} channels, {:?}, filters {:?})",
            self.width(),
            self.height(),
            self.n_channels(),
            options.compression(),
            options.filters
        );
        let mut writer = encoder.write_header()?;
        let row_len = self.width() as usize * self.n_channels() as usize;
        let mut data = Vec::with_capacity(row_len * self.height() as usize);
        for y in 0..self.height() {
            data.extend_from_slice(self.row(y));
        }
        writer.write_image_data(&data)?;
        Ok(())
    }

    /// Decodes a PNG file into 8-bit RGB or RGBA pixels.  Grayscale images
    /// are widened to RGB, palette images are expanded, and 16-bit samples
    /// are truncated to 8 bits.
    pub fn read_png<R: Read>(reader: R) -> Result<PixelBuffer> {
        match PixelBuffer::read_png_internal(reader) {
            Ok(buffer) => buffer,
            Err(png::DecodingError::IoError(error)) => Err(error.into()),
            Err(png::DecodingError::Format(error)) => {
                malformed!("Malformed PNG data: {}", error);
            }
            Err(png::DecodingError::Parameter(error)) => {
                unsupported!("PNG parameter error: {}", error);
            }
            Err(png::DecodingError::LimitsExceeded) => {
                over_capacity!("PNG limits exceeded");
            }
        }
    }

    fn read_png_internal<R: Read>(
        reader: R,
    ) -> std::result::Result<Result<PixelBuffer>, png::DecodingError> {
        let mut decoder = png::Decoder::new(reader);
        decoder.set_transformations(
            png::Transformations::EXPAND | png::Transformations::STRIP_16,
        );
        let mut png_reader = decoder.read_info()?;
        let mut frame = vec![0u8; png_reader.output_buffer_size()];
        let info = png_reader.next_frame(&mut frame)?;
        log::debug!(
            "Decoded {}x{} PNG as {:?} at {:?}",
            info.width,
            info.height,
            info.color_type,
            info.bit_depth
        );
        Ok(widen_png_frame(&info, &frame))
    }
}

// Copies decoded rows into a pixel buffer, widening gray to RGB.
fn widen_png_frame(
    info: &png::OutputInfo,
    frame: &[u8],
) -> Result<PixelBuffer> {
    let (src_channels, has_alpha) = match info.color_type {
        png::ColorType::Grayscale => (1, false),
        png::ColorType::GrayscaleAlpha => (2, true),
        png::ColorType::Rgb => (3, false),
        png::ColorType::Rgba => (4, true),
        png::ColorType::Indexed => {
            unsupported!("Unexpanded PNG color type: {:?}", info.color_type);
        }
    };
    if info.bit_depth != png::BitDepth::Eight {
        unsupported!("Unsupported PNG bit depth: {:?}", info.bit_depth);
    }
    let mut buffer = PixelBuffer::new(info.width, info.height, has_alpha)?;
    let channels = buffer.n_channels() as usize;
    for (y, src) in frame
        .chunks(info.line_size)
        .take(info.height as usize)
        .enumerate()
    {
        let out = buffer.row_mut(y as u32);
        for (sample, pixel) in src
            .chunks_exact(src_channels)
            .zip(out.chunks_exact_mut(channels))
        {
            match src_channels {
                1 | 2 => {
                    pixel[..3].copy_from_slice(&[sample[0]; 3]);
                    if has_alpha {
                        pixel[3] = sample[1];
                    }
                }
                _ => pixel.copy_from_slice(sample),
            }
        }
    }
    Ok(buffer)
}

//===========================================================================//


//===========================================================================//
