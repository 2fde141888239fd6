#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

//===========================================================================//

/// Where one channel lives inside a packed pixel word.  Serializes as the
/// raw mask; the shift and width are always derived from it.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(from = "u32", into = "u32")
)]
pub struct ChannelMask {
    mask: u32,
    shift: u32,
    bits: u32,
}

impl ChannelMask {
    /// Decomposes a bitmask into its shift (position of the lowest set bit)
    /// and width (span from the lowest to the highest set bit).  A zero mask
    /// has a shift and width of zero.
    pub fn from_mask(mask: u32) -> ChannelMask {
        if mask == 0 {
            return ChannelMask { mask, shift: 0, bits: 0 };
        }
        let shift = mask.trailing_zeros();
        let bits = 32 - mask.leading_zeros() - shift;
        ChannelMask { mask, shift, bits }
    }

    /// Returns the raw bitmask.
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Returns the position of the channel's least significant bit.
    pub fn shift(&self) -> u32 {
        self.shift
    }

    /// Returns the number of significant bits in the channel.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Returns the channel value, right-justified.
    pub fn extract(&self, pixel: u32) -> u32 {
        (pixel & self.mask) >> self.shift
    }

    /// Returns the channel value scaled to 8 bits.  Narrow channels are
    /// widened by repeating their bit pattern (so a full-scale value becomes
    /// 0xff); wide channels keep their top 8 bits.
    pub fn replicate(&self, pixel: u32) -> u8 {
        if self.bits == 0 {
            return 0;
        }
        let justified = self.left_justify(pixel);
        let mut component = 0;
        let mut offset = 24;
        while offset < 32 {
            component |= justified >> offset;
            offset += self.bits;
        }
        component as u8
    }

    /// Returns the top 8 bits of the channel value (zero-filled on the right
    /// for channels narrower than 8 bits).
    pub fn top_byte(&self, pixel: u32) -> u8 {
        if self.bits == 0 {
            return 0;
        }
        (self.left_justify(pixel) >> 24) as u8
    }

    // Moves the channel's most significant bit up to bit 31.
    fn left_justify(&self, pixel: u32) -> u32 {
        (pixel & self.mask) << (32 - self.shift - self.bits)
    }
}

impl From<u32> for ChannelMask {
    fn from(mask: u32) -> ChannelMask {
        ChannelMask::from_mask(mask)
    }
}

impl From<ChannelMask> for u32 {
    fn from(channel: ChannelMask) -> u32 {
        channel.mask
    }
}

//===========================================================================//

/// The red, green, blue and alpha masks of a direct-color pixel format.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct BitFieldSpec {
    red: ChannelMask,
    green: ChannelMask,
    blue: ChannelMask,
    alpha: ChannelMask,
}

impl BitFieldSpec {
    /// Creates a spec from four channel bitmasks.  An alpha mask of zero
    /// means the format has no alpha.
    pub fn new(red: u32, green: u32, blue: u32, alpha: u32) -> BitFieldSpec {
        BitFieldSpec {
            red: ChannelMask::from_mask(red),
            green: ChannelMask::from_mask(green),
            blue: ChannelMask::from_mask(blue),
            alpha: ChannelMask::from_mask(alpha),
        }
    }

    /// Creates a spec with no alpha channel.
    pub fn rgb(red: u32, green: u32, blue: u32) -> BitFieldSpec {
        BitFieldSpec::new(red, green, blue, 0)
    }

    /// Returns the red channel.
    pub fn red(&self) -> ChannelMask {
        self.red
    }

    /// Returns the green channel.
    pub fn green(&self) -> ChannelMask {
        self.green
    }

    /// Returns the blue channel.
    pub fn blue(&self) -> ChannelMask {
        self.blue
    }

    /// Returns the alpha channel.
    pub fn alpha(&self) -> ChannelMask {
        self.alpha
    }

    /// Returns true if the red, green and blue masks are exactly the given
    /// values.
    pub(crate) fn has_rgb_masks(
        &self,
        red: u32,
        green: u32,
        blue: u32,
    ) -> bool {
        self.red.mask == red
            && self.green.mask == green
            && self.blue.mask == blue
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{BitFieldSpec, ChannelMask};

    #[test]
    fn decompose_mask() {
        let channel = ChannelMask::from_mask(0xf800);
        assert_eq!(channel.shift(), 11);
        assert_eq!(channel.bits(), 5);
        let channel = ChannelMask::from_mask(0x0000_00ff);
        assert_eq!(channel.shift(), 0);
        assert_eq!(channel.bits(), 8);
        let channel = ChannelMask::from_mask(0);
        assert_eq!(channel.bits(), 0);
    }

    #[test]
    fn five_bit_channel_replicates_to_full_scale() {
        let red = ChannelMask::from_mask(0xf800);
        assert_eq!(red.replicate(0x1f << 11), 0xff);
        assert_eq!(red.replicate(0x10 << 11), 0x84);
        assert_eq!(red.replicate(0), 0x00);
        // A naive shift would have given 0xf8.
        assert_eq!(red.top_byte(0x1f << 11), 0xf8);
    }

    #[test]
    fn two_and_three_bit_channels_replicate() {
        let two = ChannelMask::from_mask(0x3);
        assert_eq!(two.replicate(0x1), 0x55);
        assert_eq!(two.replicate(0x2), 0xaa);
        let three = ChannelMask::from_mask(0x7 << 5);
        assert_eq!(three.replicate(0x5 << 5), 0xb6);
    }

    #[test]
    fn wide_channel_keeps_top_bits() {
        let wide = ChannelMask::from_mask(0x3ff << 20);
        assert_eq!(wide.replicate(0x3ff << 20), 0xff);
        assert_eq!(wide.replicate(0x201 << 20), 0x80);
    }

    #[test]
    fn conversions_go_through_the_mask() {
        let channel = ChannelMask::from(0x07e0);
        assert_eq!(channel, ChannelMask::from_mask(0x07e0));
        assert_eq!((channel.shift(), channel.bits()), (5, 6));
        assert_eq!(u32::from(channel), 0x07e0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialized_masks_are_rederived() {
        let bytes = bincode::serialize(&0xffff_ffffu32).unwrap();
        let full: ChannelMask = bincode::deserialize(&bytes).unwrap();
        assert_eq!((full.shift(), full.bits()), (0, 32));
        assert_eq!(full.replicate(0x8000_0000), 0x80);

        let spec = BitFieldSpec::new(0xf800, 0x7e0, 0x1f, 0);
        let bytes = bincode::serialize(&spec).unwrap();
        assert_eq!(bytes.len(), 16);
        let decoded: BitFieldSpec = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, spec);
        assert_eq!(decoded.green().bits(), 6);
    }

    #[test]
    fn zero_mask_extracts_nothing() {
        let spec = BitFieldSpec::rgb(0xff0000, 0xff00, 0xff);
        assert_eq!(spec.alpha().replicate(0xffff_ffff), 0);
        assert!(spec.has_rgb_masks(0xff0000, 0xff00, 0xff));
    }
}

//===========================================================================//
