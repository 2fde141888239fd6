use crate::error::Result;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

//===========================================================================//

// Size limits for a pixel buffer:
const MIN_WIDTH: u32 = 1;
const MIN_HEIGHT: u32 = 1;
// Largest pixel count of any buffer (16384x16384).
const MAX_PIXELS: u64 = 1 << 28;

//===========================================================================//

/// The order in which the bytes of a multi-byte pixel word are stored.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum ByteOrder {
    /// Least significant byte first (little endian).
    #[default]
    LsbFirst,
    /// Most significant byte first (big endian).
    MsbFirst,
}

//===========================================================================//

/// An owned image with 8-bit RGB or RGBA channels.
///
/// Rows are stored top to bottom, each `rowstride()` bytes apart; the
/// trailing bytes of a row past `width() * n_channels()` are padding.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    n_channels: u8,
    bits_per_sample: u8,
    rowstride: usize,
    byte_order: ByteOrder,
    has_alpha: bool,
    depth: u16,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Creates a zero-filled buffer with each row aligned to a 32-bit
    /// boundary.  Returns an error if either dimension is zero, the image
    /// has more than 2^28 pixels, or the memory can't be allocated.
    pub fn new(width: u32, height: u32, has_alpha: bool) -> Result<Self> {
        validate_size(width, height)?;
        let n_channels = channels_for(has_alpha);
        let rowstride = match aligned_rowstride(width, n_channels) {
            Some(rowstride) => rowstride,
            None => bad_dimensions!("Row of {} pixels is too long", width),
        };
        let size = match rowstride.checked_mul(height as usize) {
            Some(size) => size,
            None => {
                bad_dimensions!("{}x{} image is too large", width, height)
            }
        };
        Ok(PixelBuffer {
            width,
            height,
            n_channels,
            bits_per_sample: 8,
            rowstride,
            byte_order: ByteOrder::default(),
            has_alpha,
            depth: 8 * n_channels as u16,
            pixels: zeroed_bytes(size)?,
        })
    }

    /// Wraps existing pixel data, stored top to bottom with the given
    /// `rowstride`.  `pixels` must hold at least `rowstride * height` bytes.
    pub fn from_data(
        width: u32,
        height: u32,
        has_alpha: bool,
        rowstride: usize,
        pixels: Vec<u8>,
    ) -> Result<Self> {
        validate_size(width, height)?;
        let n_channels = channels_for(has_alpha);
        let min_rowstride = (width as usize) * (n_channels as usize);
        if rowstride < min_rowstride {
            bad_dimensions!(
                "Invalid rowstride (was {}, but must be at least {})",
                rowstride,
                min_rowstride
            );
        }
        let needed = match rowstride.checked_mul(height as usize) {
            Some(needed) => needed,
            None => {
                bad_dimensions!("{}x{} image is too large", width, height)
            }
        };
        if pixels.len() < needed {
            truncated!(
                "Pixel data too short (was {} bytes, but must be {} for \
                 {}x{} image)",
                pixels.len(),
                needed,
                width,
                height
            );
        }
        Ok(PixelBuffer {
            width,
            height,
            n_channels,
            bits_per_sample: 8,
            rowstride,
            byte_order: ByteOrder::default(),
            has_alpha,
            depth: 8 * n_channels as u16,
            pixels,
        })
    }

    /// Records the bits-per-pixel of the source these pixels came from.
    pub fn with_source_depth(mut self, depth: u16) -> Self {
        self.depth = depth;
        self
    }

    /// Records the byte order of the source these pixels came from.
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Returns the width of the image, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the image, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns 4 if the image has an alpha channel, or 3 otherwise.
    pub fn n_channels(&self) -> u8 {
        self.n_channels
    }

    /// Returns the number of bits per channel, which is always 8.
    pub fn bits_per_sample(&self) -> u8 {
        self.bits_per_sample
    }

    /// Returns the distance between the starts of two rows, in bytes.
    pub fn rowstride(&self) -> usize {
        self.rowstride
    }

    /// Returns the byte order of the source these pixels came from.
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Returns true if the image has an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Returns the bits-per-pixel of the source these pixels came from.
    pub fn source_depth(&self) -> u16 {
        self.depth
    }

    /// Returns the raw bytes, including any row padding.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the raw bytes mutably, including any row padding.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Consumes the buffer and returns its raw bytes.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Returns the pixel bytes of row `y` (counted from the top), without
    /// padding.  Panics if `y` is out of range.
    pub fn row(&self, y: u32) -> &[u8] {
        assert!(y < self.height, "row {} out of range", y);
        let start = (y as usize) * self.rowstride;
        &self.pixels[start..][..self.row_len()]
    }

    /// Returns the pixel bytes of row `y` mutably.  Panics if `y` is out of
    /// range.
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        assert!(y < self.height, "row {} out of range", y);
        let start = (y as usize) * self.rowstride;
        let len = self.row_len();
        &mut self.pixels[start..][..len]
    }

    /// Returns the RGBA value of the pixel at `(x, y)`; images without an
    /// alpha channel report an alpha of 255.  Panics if out of range.
    pub fn rgba_at(&self, x: u32, y: u32) -> [u8; 4] {
        assert!(x < self.width, "column {} out of range", x);
        let channels = self.n_channels as usize;
        let pixel = &self.row(y)[(x as usize) * channels..][..channels];
        let alpha = if self.has_alpha { pixel[3] } else { u8::MAX };
        [pixel[0], pixel[1], pixel[2], alpha]
    }

    fn row_len(&self) -> usize {
        (self.width as usize) * (self.n_channels as usize)
    }
}

//===========================================================================//

fn validate_size(width: u32, height: u32) -> Result<()> {
    if width < MIN_WIDTH {
        bad_dimensions!(
            "Invalid width (was {}, but must be at least {})",
            width,
            MIN_WIDTH
        );
    }
    if height < MIN_HEIGHT {
        bad_dimensions!(
            "Invalid height (was {}, but must be at least {})",
            height,
            MIN_HEIGHT
        );
    }
    if (width as u64) * (height as u64) > MAX_PIXELS {
        bad_dimensions!(
            "{}x{} image is too large (max is {} pixels)",
            width,
            height,
            MAX_PIXELS
        );
    }
    Ok(())
}

/// Allocates `len` zero bytes, failing instead of aborting if the allocator
/// refuses.
pub(crate) fn zeroed_bytes(len: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    if bytes.try_reserve_exact(len).is_err() {
        over_capacity!("Unable to allocate {} bytes of pixel data", len);
    }
    bytes.resize(len, 0);
    Ok(bytes)
}

fn channels_for(has_alpha: bool) -> u8 {
    if has_alpha {
        4
    } else {
        3
    }
}

/// Returns the length of a row of `width` pixels with `n_channels` bytes
/// each, rounded up to a multiple of four bytes.
pub(crate) fn aligned_rowstride(width: u32, n_channels: u8) -> Option<usize> {
    let len = (width as usize).checked_mul(n_channels as usize)?;
    Some(len.checked_add(3)? & !3)
}

//===========================================================================//


//===========================================================================//
