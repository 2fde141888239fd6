use crate::error::Result;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

//===========================================================================//

/// The most entries a color table can hold.
pub const MAX_COLORS: usize = 256;

//===========================================================================//

/// An index-to-RGB lookup table, used by indexed display visuals and by BMP
/// palettes.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct ColorTable {
    colors: Vec<(u8, u8, u8)>,
}

impl ColorTable {
    /// Creates a table from `(red, green, blue)` entries.  Returns an error
    /// if there are more than 256 entries.
    pub fn new(colors: Vec<(u8, u8, u8)>) -> Result<ColorTable> {
        if colors.len() > MAX_COLORS {
            over_capacity!(
                "Too many colors in table (was {}, but max is {})",
                colors.len(),
                MAX_COLORS
            );
        }
        Ok(ColorTable { colors })
    }

    /// Creates a table of `count` evenly spaced grays, from black to white.
    pub fn grayscale(count: usize) -> Result<ColorTable> {
        if count > MAX_COLORS {
            over_capacity!(
                "Too many colors in table (was {}, but max is {})",
                count,
                MAX_COLORS
            );
        }
        let max = count.saturating_sub(1).max(1);
        let colors = (0..count)
            .map(|index| {
                let gray = ((index * 255 + max / 2) / max) as u8;
                (gray, gray, gray)
            })
            .collect();
        Ok(ColorTable { colors })
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Returns the entries in index order.
    pub fn colors(&self) -> &[(u8, u8, u8)] {
        &self.colors
    }

    /// Returns the color at `index`, or black if `index` is past the end of
    /// the table.
    pub fn lookup(&self, index: usize) -> (u8, u8, u8) {
        self.colors.get(index).copied().unwrap_or((0, 0, 0))
    }
}

//===========================================================================//


//===========================================================================//
