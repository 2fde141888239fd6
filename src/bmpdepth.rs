//===========================================================================//

/// The bits-per-pixel values a BMP pixel array can be stored at.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum BmpDepth {
    One,
    Four,
    Eight,
    Sixteen,
    TwentyFour,
    ThirtyTwo,
}

impl BmpDepth {
    pub(crate) fn from_bits_per_pixel(
        bits_per_pixel: u16,
    ) -> Option<BmpDepth> {
        match bits_per_pixel {
            1 => Some(BmpDepth::One),
            4 => Some(BmpDepth::Four),
            8 => Some(BmpDepth::Eight),
            16 => Some(BmpDepth::Sixteen),
            24 => Some(BmpDepth::TwentyFour),
            32 => Some(BmpDepth::ThirtyTwo),
            _ => None,
        }
    }

    /// Returns the narrowest indexed depth whose palette can hold
    /// `num_colors` entries.
    pub(crate) fn for_palette(num_colors: usize) -> Option<BmpDepth> {
        if num_colors <= 2 {
            Some(BmpDepth::One)
        } else if num_colors <= 16 {
            Some(BmpDepth::Four)
        } else if num_colors <= 256 {
            Some(BmpDepth::Eight)
        } else {
            None
        }
    }

    pub(crate) fn bits_per_pixel(&self) -> u16 {
        match *self {
            BmpDepth::One => 1,
            BmpDepth::Four => 4,
            BmpDepth::Eight => 8,
            BmpDepth::Sixteen => 16,
            BmpDepth::TwentyFour => 24,
            BmpDepth::ThirtyTwo => 32,
        }
    }

    /// Returns the full palette size for indexed depths, or zero.
    pub(crate) fn num_colors(&self) -> usize {
        match *self {
            BmpDepth::One => 2,
            BmpDepth::Four => 16,
            BmpDepth::Eight => 256,
            _ => 0,
        }
    }

    /// Returns the length in bytes of one stored row of `width` pixels,
    /// padded to a multiple of four bytes.
    pub(crate) fn row_size(&self, width: u32) -> Option<usize> {
        let bits_per_pixel = self.bits_per_pixel() as usize;
        let bits = (width as usize).checked_mul(bits_per_pixel)?;
        Some(bits.checked_add(31)? / 32 * 4)
    }
}

//===========================================================================//


//===========================================================================//
