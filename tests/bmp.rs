use byteorder::{LittleEndian, WriteBytesExt};
use pixgrab::{
    BmpImage, BmpReadOptions, BmpWriteOptions, ColorTable, Compression,
    ErrorKind, HeaderStyle, PixelBuffer,
};

//===========================================================================//

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Builds a BMP file with a BITMAPINFOHEADER.  `extra` holds whatever sits
/// between the header and the pixel array (masks, palette, filler).
fn info_bmp(
    width: i32,
    height: i32,
    bits_per_pixel: u16,
    compression: u32,
    extra: &[u8],
    pixels: &[u8],
) -> Vec<u8> {
    let offset = 54 + extra.len() as u32;
    let mut data = Vec::new();
    data.extend_from_slice(b"BM");
    data.write_u32::<LittleEndian>(offset + pixels.len() as u32).unwrap();
    data.write_u32::<LittleEndian>(0).unwrap();
    data.write_u32::<LittleEndian>(offset).unwrap();
    data.write_u32::<LittleEndian>(40).unwrap();
    data.write_i32::<LittleEndian>(width).unwrap();
    data.write_i32::<LittleEndian>(height).unwrap();
    data.write_u16::<LittleEndian>(1).unwrap();
    data.write_u16::<LittleEndian>(bits_per_pixel).unwrap();
    data.write_u32::<LittleEndian>(compression).unwrap();
    data.write_u32::<LittleEndian>(pixels.len() as u32).unwrap();
    data.extend_from_slice(&[0; 16]);
    data.extend_from_slice(extra);
    data.extend_from_slice(pixels);
    data
}

fn palette_bytes(table: &ColorTable) -> Vec<u8> {
    let mut data = Vec::new();
    for &(red, green, blue) in table.colors() {
        data.extend_from_slice(&[blue, green, red, 0]);
    }
    data
}

fn gradient(width: u32, height: u32, has_alpha: bool) -> PixelBuffer {
    let mut buffer = PixelBuffer::new(width, height, has_alpha).unwrap();
    let channels = buffer.n_channels() as usize;
    for y in 0..height {
        let row = buffer.row_mut(y);
        for (x, pixel) in row.chunks_exact_mut(channels).enumerate() {
            pixel[0] = (x * 40) as u8;
            pixel[1] = (y * 60) as u8;
            pixel[2] = (x * 7 + y as usize * 13) as u8;
            if has_alpha {
                pixel[3] = (x * 50 + 5) as u8;
            }
        }
    }
    buffer
}

fn assert_same_rgb(left: &PixelBuffer, right: &PixelBuffer) {
    assert_eq!(left.width(), right.width());
    assert_eq!(left.height(), right.height());
    for y in 0..left.height() {
        for x in 0..left.width() {
            assert_eq!(
                left.rgba_at(x, y)[..3],
                right.rgba_at(x, y)[..3],
                "pixel ({}, {})",
                x,
                y
            );
        }
    }
}

//===========================================================================//

#[test]
fn write_then_read_24_bit() {
    init_logging();
    let original = gradient(5, 3, false);
    let mut file = Vec::new();
    original.write_bmp(&mut file, &BmpWriteOptions::default()).unwrap();
    let image = BmpImage::read(file.as_slice()).unwrap();
    assert_eq!(image.depth(), 24);
    assert!(!image.has_alpha());
    assert!(image.palette().is_none());
    assert_eq!(image.header().style(), HeaderStyle::Info);
    assert_same_rgb(&original, image.pixels());
}

#[test]
fn plain_write_drops_alpha() {
    init_logging();
    let original = gradient(3, 4, true);
    let mut file = Vec::new();
    original.write_bmp(&mut file, &BmpWriteOptions::default()).unwrap();
    let image = BmpImage::read(file.as_slice()).unwrap();
    assert_eq!(image.depth(), 24);
    assert!(!image.pixels().has_alpha());
    assert_same_rgb(&original, image.pixels());
}

#[test]
fn alpha_bitfields_round_trip_keeps_alpha() {
    init_logging();
    let original = gradient(4, 2, true);
    let options = BmpWriteOptions { alpha_bitfields: true, palette: None };
    let mut file = Vec::new();
    original.write_bmp(&mut file, &options).unwrap();
    let image = BmpImage::read(file.as_slice()).unwrap();
    assert_eq!(image.header().style(), HeaderStyle::V4);
    assert_eq!(image.header().compression(), Compression::BitFields);
    assert_eq!(image.depth(), 32);
    assert!(image.has_alpha());
    assert_eq!(image.pixels().row(1), original.row(1));
    assert_eq!(image.pixels().row(0), original.row(0));
}

#[test]
fn palette_round_trip() {
    init_logging();
    let colors = vec![(0, 0, 0), (255, 0, 0), (0, 255, 0), (0, 0, 255)];
    let palette = ColorTable::new(colors.clone()).unwrap();
    let mut buffer = PixelBuffer::new(7, 3, false).unwrap();
    for y in 0..3 {
        for (x, pixel) in buffer.row_mut(y).chunks_exact_mut(3).enumerate() {
            let (red, green, blue) = colors[(x + y as usize) % 4];
            pixel.copy_from_slice(&[red, green, blue]);
        }
    }
    let options =
        BmpWriteOptions { alpha_bitfields: false, palette: Some(palette) };
    let mut file = Vec::new();
    buffer.write_bmp(&mut file, &options).unwrap();
    let image = BmpImage::read(file.as_slice()).unwrap();
    assert_eq!(image.depth(), 4);
    let read_palette = image.palette().unwrap();
    assert_eq!(read_palette.len(), 16);
    assert_eq!(&read_palette.colors()[..4], colors.as_slice());
    assert_same_rgb(&buffer, image.pixels());
}

#[test]
fn decoded_storage_is_rowstride_times_height() {
    init_logging();
    let palette = ColorTable::grayscale(200).unwrap();
    for &(width, height) in &[(1, 1), (2, 3), (5, 1), (9, 4)] {
        let mut buffer = PixelBuffer::new(width, height, true).unwrap();
        for byte in buffer.pixels_mut().iter_mut() {
            *byte = 17;
        }
        let option_sets = [
            BmpWriteOptions::default(),
            BmpWriteOptions { alpha_bitfields: true, palette: None },
            BmpWriteOptions {
                alpha_bitfields: false,
                palette: Some(ColorTable::new(vec![(17, 17, 17)]).unwrap()),
            },
            BmpWriteOptions {
                alpha_bitfields: false,
                palette: Some(palette.clone()),
            },
        ];
        for options in option_sets.iter() {
            let mut file = Vec::new();
            buffer.write_bmp(&mut file, options).unwrap();
            let image = BmpImage::read(file.as_slice()).unwrap();
            let pixels = image.pixels();
            assert_eq!(
                pixels.pixels().len(),
                pixels.rowstride() * height as usize
            );
            assert_eq!(pixels.rgba_at(width - 1, height - 1)[0], 17);
        }
    }
}

#[test]
fn core_header_with_three_byte_palette() {
    init_logging();
    let mut data = Vec::new();
    data.extend_from_slice(b"BM");
    data.write_u32::<LittleEndian>(40).unwrap();
    data.write_u32::<LittleEndian>(0).unwrap();
    data.write_u32::<LittleEndian>(32).unwrap();
    data.write_u32::<LittleEndian>(12).unwrap();
    data.write_u16::<LittleEndian>(3).unwrap();
    data.write_u16::<LittleEndian>(2).unwrap();
    data.write_u16::<LittleEndian>(1).unwrap();
    data.write_u16::<LittleEndian>(1).unwrap();
    // Palette: red, then blue (stored B, G, R).
    data.extend_from_slice(&[0, 0, 255, 255, 0, 0]);
    // Bottom row: 1, 0, 1.  Top row: 0, 1, 0.
    data.extend_from_slice(&[0b1010_0000, 0, 0, 0, 0b0100_0000, 0, 0, 0]);
    let image = BmpImage::read(data.as_slice()).unwrap();
    assert_eq!(image.header().style(), HeaderStyle::Core);
    assert_eq!(image.header().palette_len(), 2);
    assert_eq!(image.depth(), 1);
    let pixels = image.pixels();
    assert_eq!(pixels.row(0), &[255, 0, 0, 0, 0, 255, 255, 0, 0]);
    assert_eq!(pixels.row(1), &[0, 0, 255, 255, 0, 0, 0, 0, 255]);
}

#[test]
fn preamble_is_skipped_once() {
    init_logging();
    let original = gradient(2, 2, false);
    let mut bmp = Vec::new();
    original.write_bmp(&mut bmp, &BmpWriteOptions::default()).unwrap();
    let mut file = vec![0u8; 128];
    file.extend_from_slice(&bmp);
    let image = BmpImage::read(file.as_slice()).unwrap();
    assert_same_rgb(&original, image.pixels());

    let mut file = vec![0u8; 256];
    file.extend_from_slice(&bmp);
    let error = BmpImage::read(file.as_slice()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MalformedHeader);
}

#[test]
fn unsupported_header_size() {
    init_logging();
    let mut file = info_bmp(1, 1, 24, 0, &[], &[0; 4]);
    file[14] = 64;
    let error = BmpImage::read(file.as_slice()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnsupportedFormat);
}

#[test]
fn compression_and_depth_must_agree() {
    init_logging();
    let file = info_bmp(1, 1, 24, 1, &[], &[0; 4]);
    let error = BmpImage::read(file.as_slice()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnsupportedFormat);
    let file = info_bmp(1, 1, 24, 3, &[0; 12], &[0; 4]);
    let error = BmpImage::read(file.as_slice()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnsupportedFormat);
    let file = info_bmp(1, 1, 24, 7, &[], &[0; 4]);
    let error = BmpImage::read(file.as_slice()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnsupportedFormat);
}

#[test]
fn pixel_offset_inside_header_is_malformed() {
    init_logging();
    let mut file = info_bmp(1, 1, 24, 0, &[], &[0; 4]);
    file[10] = 40;
    let error = BmpImage::read(file.as_slice()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MalformedHeader);
}

#[test]
fn short_pixel_data_is_truncated() {
    init_logging();
    let original = gradient(4, 4, false);
    let mut file = Vec::new();
    original.write_bmp(&mut file, &BmpWriteOptions::default()).unwrap();
    file.truncate(file.len() - 5);
    let error = BmpImage::read(file.as_slice()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::TruncatedInput);
    let error = BmpImage::read(&file[..30]).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::TruncatedInput);
}

#[test]
fn negative_height_is_top_down() {
    init_logging();
    let pixels = [
        1, 2, 3, 0, // top row
        4, 5, 6, 0, // bottom row
    ];
    let file = info_bmp(1, -2, 24, 0, &[], &pixels);
    let image = BmpImage::read(file.as_slice()).unwrap();
    assert_eq!(image.pixels().rgba_at(0, 0), [3, 2, 1, 255]);
    assert_eq!(image.pixels().rgba_at(0, 1), [6, 5, 4, 255]);
}

#[test]
fn rgb565_bitfields_replicate_bits() {
    init_logging();
    let mut masks = Vec::new();
    masks.write_u32::<LittleEndian>(0xf800).unwrap();
    masks.write_u32::<LittleEndian>(0x07e0).unwrap();
    masks.write_u32::<LittleEndian>(0x001f).unwrap();
    // Full-scale red, then half-scale green.
    let pixels = [0x00, 0xf8, 0x00, 0x04];
    let file = info_bmp(2, 1, 16, 3, &masks, &pixels);
    let image = BmpImage::read(file.as_slice()).unwrap();
    assert_eq!(image.depth(), 24);
    assert!(!image.has_alpha());
    assert_eq!(image.pixels().rgba_at(0, 0), [0xff, 0, 0, 0xff]);
    assert_eq!(image.pixels().rgba_at(1, 0), [0, 130, 0, 0xff]);
}

#[test]
fn plain_16_bit_reads_as_555() {
    init_logging();
    let pixels = [0xff, 0x7f, 0x00, 0x00];
    let file = info_bmp(1, 1, 16, 0, &[], &pixels);
    let image = BmpImage::read(file.as_slice()).unwrap();
    assert_eq!(image.depth(), 24);
    assert_eq!(image.header().bits_per_pixel(), 16);
    assert_eq!(image.pixels().rgba_at(0, 0), [0xff, 0xff, 0xff, 0xff]);
}

#[test]
fn nonzero_fourth_byte_is_alpha_only_when_detected() {
    init_logging();
    let pixels = [10, 20, 30, 0, 40, 50, 60, 128];
    let file = info_bmp(2, 1, 32, 0, &[], &pixels);
    let image = BmpImage::read(file.as_slice()).unwrap();
    assert!(!image.has_alpha());
    assert_eq!(image.pixels().n_channels(), 3);
    let options = BmpReadOptions { detect_alpha: true };
    let image =
        BmpImage::read_with_options(file.as_slice(), &options).unwrap();
    assert!(image.has_alpha());
    assert_eq!(image.pixels().rgba_at(1, 0), [60, 50, 40, 128]);
}

//===========================================================================//

fn gray_palette() -> Vec<u8> {
    palette_bytes(&ColorTable::grayscale(256).unwrap())
}

#[test]
fn rle8_without_end_of_bitmap_reaching_height() {
    init_logging();
    let records = [2, 5, 0, 0, 0, 3, 7, 8, 9, 0];
    let file = info_bmp(3, 2, 8, 1, &gray_palette(), &records);
    let image = BmpImage::read(file.as_slice()).unwrap();
    let pixels = image.pixels();
    assert_eq!(pixels.row(0), &[7, 7, 7, 8, 8, 8, 9, 9, 9]);
    assert_eq!(pixels.row(1), &[5, 5, 5, 5, 5, 5, 0, 0, 0]);
}

#[test]
fn rle8_delta_and_end_of_line() {
    init_logging();
    let records = [1, 1, 0, 2, 2, 1, 1, 2, 0, 0, 0, 2, 1, 0, 1, 3, 0, 1];
    let file = info_bmp(4, 3, 8, 1, &gray_palette(), &records);
    let image = BmpImage::read(file.as_slice()).unwrap();
    let gray = |x: u32, y: u32| image.pixels().rgba_at(x, y)[0];
    let rows: Vec<Vec<u8>> =
        (0..3).map(|y| (0..4).map(|x| gray(x, y)).collect()).collect();
    assert_eq!(rows[0], vec![0, 3, 0, 0]);
    assert_eq!(rows[1], vec![0, 0, 0, 2]);
    assert_eq!(rows[2], vec![1, 0, 0, 0]);
}

#[test]
fn rle8_ending_before_last_row_is_truncated() {
    init_logging();
    let file = info_bmp(2, 2, 8, 1, &gray_palette(), &[2, 1]);
    let error = BmpImage::read(file.as_slice()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::TruncatedInput);
}

#[test]
fn rle4_absolute_at_odd_column_matches_encoded_runs() {
    init_logging();
    let palette = palette_bytes(&ColorTable::grayscale(16).unwrap());
    let absolute = [1, 0x00, 0, 3, 0x12, 0x30, 0, 1];
    let encoded = [1, 0x00, 2, 0x12, 1, 0x30, 0, 1];
    let file = info_bmp(4, 1, 4, 2, &palette, &absolute);
    let from_absolute = BmpImage::read(file.as_slice()).unwrap();
    let file = info_bmp(4, 1, 4, 2, &palette, &encoded);
    let from_encoded = BmpImage::read(file.as_slice()).unwrap();
    assert_eq!(from_absolute.depth(), 4);
    assert_eq!(from_absolute.pixels(), from_encoded.pixels());
    assert_eq!(from_absolute.pixels().rgba_at(1, 0)[0], 17);
    assert_eq!(from_absolute.pixels().rgba_at(3, 0)[0], 51);
}

#[test]
fn rle_header_claiming_huge_size_is_rejected() {
    init_logging();
    let max = i32::MAX;
    let file = info_bmp(max, max, 8, 1, &gray_palette(), &[0, 1]);
    let error = BmpImage::read(file.as_slice()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::DimensionError);
    let file = info_bmp(16385, -16384, 4, 2, &gray_palette()[..64], &[0, 1]);
    let error = BmpImage::read(file.as_slice()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::DimensionError);
}

#[test]
fn plain_header_claiming_huge_size_is_truncated() {
    init_logging();
    let file = info_bmp(i32::MAX, 2, 24, 0, &[], &[0; 12]);
    let error = BmpImage::read(file.as_slice()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::TruncatedInput);
}

//===========================================================================//
