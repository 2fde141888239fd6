use crate::bitfield::BitFieldSpec;
use crate::bmpdepth::BmpDepth;
use crate::colortable::ColorTable;
use crate::error::Result;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read};

//===========================================================================//

// The size of the BITMAPFILEHEADER struct, in bytes.
pub(crate) const FILE_HEADER_LEN: u32 = 14;

// Some files carry a fixed-size preamble before the "BM" signature.
const PREAMBLE_LEN: usize = 128;

// The file header plus the info header's leading size field.
const SIGNATURE_PROBE_LEN: usize = FILE_HEADER_LEN as usize + 4;

// Masks implied by an uncompressed 16-bit image.
const RGB555_MASKS: (u32, u32, u32) = (0x7c00, 0x03e0, 0x001f);

//===========================================================================//

/// The variant of the info header following the file header.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HeaderStyle {
    /// BITMAPCOREHEADER (12 bytes).
    Core,
    /// BITMAPINFOHEADER (40 bytes).
    Info,
    /// BITMAPV4HEADER (108 bytes).
    V4,
    /// BITMAPV5HEADER (124 bytes).
    V5,
}

impl HeaderStyle {
    pub(crate) fn from_size(size: u32) -> Option<HeaderStyle> {
        match size {
            12 => Some(HeaderStyle::Core),
            40 => Some(HeaderStyle::Info),
            108 => Some(HeaderStyle::V4),
            124 => Some(HeaderStyle::V5),
            _ => None,
        }
    }

    /// Returns the size of the header, in bytes.
    pub fn size(&self) -> u32 {
        match *self {
            HeaderStyle::Core => 12,
            HeaderStyle::Info => 40,
            HeaderStyle::V4 => 108,
            HeaderStyle::V5 => 124,
        }
    }

    fn palette_entry_len(&self) -> usize {
        match *self {
            HeaderStyle::Core => 3,
            _ => 4,
        }
    }
}

//===========================================================================//

/// How the pixel array is encoded.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Compression {
    /// Uncompressed pixels (BI_RGB).
    None,
    /// 8-bit run-length encoding (BI_RLE8).
    Rle8,
    /// 4-bit run-length encoding (BI_RLE4).
    Rle4,
    /// Uncompressed pixels with explicit channel masks (BI_BITFIELDS).
    BitFields,
}

impl Compression {
    fn from_number(number: u32) -> Option<Compression> {
        match number {
            0 => Some(Compression::None),
            1 => Some(Compression::Rle8),
            2 => Some(Compression::Rle4),
            3 => Some(Compression::BitFields),
            _ => None,
        }
    }

    pub(crate) fn number(&self) -> u32 {
        match *self {
            Compression::None => 0,
            Compression::Rle8 => 1,
            Compression::Rle4 => 2,
            Compression::BitFields => 3,
        }
    }
}

//===========================================================================//

/// The order in which rows are stored in the pixel array.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Orientation {
    /// The first stored row is the bottom of the image (positive height).
    BottomUp,
    /// The first stored row is the top of the image (negative height).
    TopDown,
}

//===========================================================================//

/// The parsed file and info headers of a BMP image.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BmpHeader {
    file_size: u32,
    data_offset: u32,
    style: HeaderStyle,
    width: u32,
    height: u32,
    orientation: Orientation,
    compression: Compression,
    bits_per_pixel: u16,
    palette_len: usize,
    masks: Option<BitFieldSpec>,
}

impl BmpHeader {
    /// Returns the file size declared in the file header.
    pub fn file_size(&self) -> u32 {
        self.file_size
    }

    /// Returns the offset of the pixel array from the start of the file
    /// header.
    pub fn data_offset(&self) -> u32 {
        self.data_offset
    }

    /// Returns which info header variant the file uses.
    pub fn style(&self) -> HeaderStyle {
        self.style
    }

    /// Returns the width of the image, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the image, in pixels (always positive).
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the row order of the pixel array.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Returns the declared compression.
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Returns the declared bits-per-pixel.
    pub fn bits_per_pixel(&self) -> u16 {
        self.bits_per_pixel
    }

    /// Returns the number of palette entries actually read.
    pub fn palette_len(&self) -> usize {
        self.palette_len
    }

    /// Returns the channel masks, for bitfield and 16-bit images.
    pub fn masks(&self) -> Option<BitFieldSpec> {
        self.masks
    }

    /// Reads the headers, channel masks and palette, leaving `reader`
    /// positioned at the start of the pixel array.
    pub(crate) fn read<R: Read>(
        reader: &mut R,
    ) -> Result<(BmpHeader, Option<ColorTable>)> {
        let mut probe = [0u8; SIGNATURE_PROBE_LEN];
        reader.read_exact(&mut probe)?;
        if &probe[0..2] != b"BM" {
            let mut preamble = [0u8; PREAMBLE_LEN - SIGNATURE_PROBE_LEN];
            reader.read_exact(&mut preamble)?;
            reader.read_exact(&mut probe)?;
            if &probe[0..2] != b"BM" {
                malformed!(
                    "Invalid BMP signature (was {:?}, but must be \"BM\")",
                    String::from_utf8_lossy(&probe[0..2])
                );
            }
            log::warn!("Skipped {}-byte preamble before BMP", PREAMBLE_LEN);
        }
        let mut fields = &probe[2..];
        let file_size = fields.read_u32::<LittleEndian>()?;
        let _reserved1 = fields.read_u16::<LittleEndian>()?;
        let _reserved2 = fields.read_u16::<LittleEndian>()?;
        let data_offset = fields.read_u32::<LittleEndian>()?;
        let header_size = fields.read_u32::<LittleEndian>()?;

        let style = match HeaderStyle::from_size(header_size) {
            Some(style) => style,
            None => {
                unsupported!("Unsupported BMP header size ({})", header_size)
            }
        };
        if data_offset < FILE_HEADER_LEN + header_size {
            malformed!(
                "Invalid BMP pixel offset (was {}, but must be at least {})",
                data_offset,
                FILE_HEADER_LEN + header_size
            );
        }
        let mut gap = (data_offset - FILE_HEADER_LEN - header_size) as usize;

        // Read the rest of the info header:
        let (width, height, orientation, bits_per_pixel, compression) =
            if style == HeaderStyle::Core {
                let width = reader.read_u16::<LittleEndian>()? as u32;
                let height = reader.read_u16::<LittleEndian>()? as u32;
                let _planes = reader.read_u16::<LittleEndian>()?;
                let bits_per_pixel = reader.read_u16::<LittleEndian>()?;
                let orientation = Orientation::BottomUp;
                (width, height, orientation, bits_per_pixel, 0)
            } else {
                let width = reader.read_i32::<LittleEndian>()?;
                if width <= 0 {
                    bad_dimensions!(
                        "Invalid BMP width (was {}, but must be positive)",
                        width
                    );
                }
                let height = reader.read_i32::<LittleEndian>()?;
                let orientation = if height < 0 {
                    Orientation::TopDown
                } else {
                    Orientation::BottomUp
                };
                let _planes = reader.read_u16::<LittleEndian>()?;
                let bits_per_pixel = reader.read_u16::<LittleEndian>()?;
                let compression = reader.read_u32::<LittleEndian>()?;
                let _image_size = reader.read_u32::<LittleEndian>()?;
                let _horz_ppm = reader.read_i32::<LittleEndian>()?;
                let _vert_ppm = reader.read_i32::<LittleEndian>()?;
                let _colors_used = reader.read_u32::<LittleEndian>()?;
                let _colors_important = reader.read_u32::<LittleEndian>()?;
                let width = width as u32;
                let height = height.unsigned_abs();
                (width, height, orientation, bits_per_pixel, compression)
            };
        if width == 0 || height == 0 {
            bad_dimensions!("Invalid BMP size {}x{}", width, height);
        }

        let compression = match Compression::from_number(compression) {
            Some(compression) => compression,
            None => {
                unsupported!("Unsupported BMP compression ({})", compression)
            }
        };
        let valid_depth = match compression {
            Compression::None => {
                BmpDepth::from_bits_per_pixel(bits_per_pixel).is_some()
            }
            Compression::Rle8 => bits_per_pixel == 8,
            Compression::Rle4 => bits_per_pixel == 4,
            Compression::BitFields => {
                bits_per_pixel == 16 || bits_per_pixel == 32
            }
        };
        if !valid_depth {
            unsupported!(
                "Unsupported BMP bits-per-pixel ({}) for {:?} compression",
                bits_per_pixel,
                compression
            );
        }

        // Read the channel masks, which live in the v4/v5 header or, for a
        // plain info header, directly after it:
        let masks = match (compression, style) {
            (Compression::BitFields, HeaderStyle::Info) => {
                if gap < 12 {
                    malformed!(
                        "No room for BMP channel masks before pixel offset \
                         (gap is {} bytes)",
                        gap
                    );
                }
                gap -= 12;
                let red = reader.read_u32::<LittleEndian>()?;
                let green = reader.read_u32::<LittleEndian>()?;
                let blue = reader.read_u32::<LittleEndian>()?;
                Some(BitFieldSpec::rgb(red, green, blue))
            }
            (_, HeaderStyle::V4) | (_, HeaderStyle::V5) => {
                let red = reader.read_u32::<LittleEndian>()?;
                let green = reader.read_u32::<LittleEndian>()?;
                let blue = reader.read_u32::<LittleEndian>()?;
                let alpha = reader.read_u32::<LittleEndian>()?;
                let remainder = header_size as u64 - 56;
                skip_bytes(reader, remainder)?;
                if compression != Compression::BitFields {
                    None
                } else if bits_per_pixel == 32 {
                    Some(BitFieldSpec::new(red, green, blue, alpha))
                } else {
                    Some(BitFieldSpec::rgb(red, green, blue))
                }
            }
            _ => None,
        };
        let plain_16 =
            compression == Compression::None && bits_per_pixel == 16;
        let masks = if plain_16 {
            let (red, green, blue) = RGB555_MASKS;
            Some(BitFieldSpec::rgb(red, green, blue))
        } else {
            masks
        };

        // Read the palette, tolerating one that is cut short by the pixel
        // offset:
        let palette = if bits_per_pixel <= 8 {
            let wanted = 1usize << bits_per_pixel;
            let entry_len = style.palette_entry_len();
            let count = wanted.min(gap / entry_len);
            if count == 0 {
                malformed!(
                    "No room for BMP palette before pixel offset \
                     (gap is {} bytes)",
                    gap
                );
            }
            if count < wanted {
                log::warn!(
                    "BMP palette has only {} of {} entries",
                    count,
                    wanted
                );
            }
            let mut colors = Vec::<(u8, u8, u8)>::with_capacity(count);
            for _ in 0..count {
                let blue = reader.read_u8()?;
                let green = reader.read_u8()?;
                let red = reader.read_u8()?;
                if entry_len == 4 {
                    let _reserved = reader.read_u8()?;
                }
                colors.push((red, green, blue));
            }
            gap -= count * entry_len;
            Some(ColorTable::new(colors)?)
        } else {
            None
        };

        // Skip any filler up to the pixel array:
        skip_bytes(reader, gap as u64)?;

        let header = BmpHeader {
            file_size,
            data_offset,
            style,
            width,
            height,
            orientation,
            compression,
            bits_per_pixel,
            palette_len: palette.as_ref().map_or(0, ColorTable::len),
            masks,
        };
        log::debug!("Read BMP header: {:?}", header);
        Ok((header, palette))
    }
}

//===========================================================================//

fn skip_bytes<R: Read>(reader: &mut R, len: u64) -> Result<()> {
    let skipped = io::copy(&mut reader.by_ref().take(len), &mut io::sink())?;
    if skipped < len {
        truncated!(
            "BMP ended while skipping {} bytes ({} available)",
            len,
            skipped
        );
    }
    Ok(())
}

//===========================================================================//


//===========================================================================//
