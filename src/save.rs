use crate::bmpwrite::BmpWriteOptions;
use crate::buffer::PixelBuffer;
use crate::error::Result;
use crate::pngcodec::PngOptions;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::io::Write;

//===========================================================================//

/// The container to encode a pixel buffer as, with its options.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum SaveFormat {
    /// An uncompressed BMP file.
    Bmp(BmpWriteOptions),
    /// A single-entry ICO file, or a CUR file if there is a hotspot.
    Ico {
        /// Cursor hotspot, in pixels from the top-left corner.
        hotspot: Option<(u16, u16)>,
    },
    /// A PNG file.
    Png(PngOptions),
}

impl SaveFormat {
    /// Picks a format with default options from a file extension (`bmp`,
    /// `ico`, `cur` or `png`, in any case).
    pub fn from_extension(extension: &str) -> Result<SaveFormat> {
        let extension =
            extension.trim_start_matches('.').to_ascii_lowercase();
        match extension.as_str() {
            "bmp" => Ok(SaveFormat::Bmp(BmpWriteOptions::default())),
            "ico" | "cur" => Ok(SaveFormat::Ico { hotspot: None }),
            "png" => Ok(SaveFormat::Png(PngOptions::default())),
            _ => unsupported!("No encoder for {:?} files", extension),
        }
    }

    /// Returns the usual file extension for this format.
    pub fn extension(&self) -> &'static str {
        match *self {
            SaveFormat::Bmp(_) => "bmp",
            SaveFormat::Ico { hotspot: Some(_) } => "cur",
            SaveFormat::Ico { hotspot: None } => "ico",
            SaveFormat::Png(_) => "png",
        }
    }
}

//===========================================================================//

impl PixelBuffer {
    /// Encodes the pixels with the one encoder `format` names.
    pub fn save<W: Write>(
        &self,
        writer: W,
        format: &SaveFormat,
    ) -> Result<()> {
        log::debug!(
            "Saving {}x{} image as {}",
            self.width(),
            self.height(),
            format.extension()
        );
        match *format {
            SaveFormat::Bmp(ref options) => self.write_bmp(writer, options),
            SaveFormat::Ico { hotspot } => self.write_ico(writer, hotspot),
            SaveFormat::Png(ref options) => self.write_png(writer, options),
        }
    }
}

//===========================================================================//


//===========================================================================//
