//
// cycloblur - Reversible circulant blur for images
// Copyright (c) 2026 cycloblur developers
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! BMP file loading and saving.
//!

use super::{Image, Palette, PixelFormat};
use super::utils::{read_struct, write_struct};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};

#[derive(Debug)]
pub enum BmpError {
    Io(std::io::Error),
    MalformedFile(String),
    UnsupportedFormat(String)
}

impl From<std::io::Error> for BmpError {
    fn from(error: std::io::Error) -> BmpError { BmpError::Io(error) }
}

const BMP_MAGIC: u16 = 0x4D42; // "BM"

/// `biCompression` value of an uncompressed bitmap.
const BI_RGB: u32 = 0;

// Multi-byte header fields are little-endian in the file; reading and writing them via
// `read_struct`/`write_struct` assumes a little-endian machine.

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct BitmapFileHeader {
    ftype: u16,
    size: u32,
    reserved_1: u16,
    reserved_2: u16,
    off_bits: u32
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct BitmapInfoHeader {
    size: u32,
    width: i32,
    height: i32,
    planes: u16,
    bit_count: u16,
    compression: u32,
    size_image: u32,
    x_pels_per_meter: i32,
    y_pels_per_meter: i32,
    clr_used: u32,
    clr_important: u32
}

/// Loads an uncompressed 8-bit paletted (as `Pal8`) or 24-bit (as `RGB8`) BMP.
pub fn load_bmp(file_name: &str) -> Result<Image, BmpError> {
    let mut reader = BufReader::new(File::open(file_name)?);

    let file_hdr: BitmapFileHeader = read_struct(&mut reader)?;
    // copy the packed fields before use; references into them would be unaligned
    let ftype = file_hdr.ftype;
    let off_bits = file_hdr.off_bits;
    if ftype != BMP_MAGIC {
        return Err(BmpError::MalformedFile("not a BMP file".to_string()));
    }

    let info_hdr: BitmapInfoHeader = read_struct(&mut reader)?;
    let width = info_hdr.width;
    let height = info_hdr.height;
    let bit_count = info_hdr.bit_count;
    let compression = info_hdr.compression;
    let clr_used = info_hdr.clr_used;

    if compression != BI_RGB {
        return Err(BmpError::UnsupportedFormat(format!("compression type {}", compression)));
    }
    if width <= 0 || height == 0 {
        return Err(BmpError::MalformedFile(format!("image dimensions {}x{}", width, height)));
    }

    let width = width as u32;
    // negative height means a top-down row order
    let top_down = height < 0;
    let height = height.abs() as u32;

    match bit_count {
        8 => {
            let num_entries = if clr_used > 0 { clr_used as usize } else { Palette::NUM_ENTRIES };
            if num_entries > Palette::NUM_ENTRIES {
                return Err(BmpError::MalformedFile(format!("{} palette entries", num_entries)));
            }

            let mut palette = Palette::default();
            let mut entry = [0u8; 4]; // B, G, R, reserved
            for i in 0..num_entries {
                reader.read_exact(&mut entry)?;
                palette.pal[3 * i]     = entry[2];
                palette.pal[3 * i + 1] = entry[1];
                palette.pal[3 * i + 2] = entry[0];
            }

            let src_stride = upmult!(width as usize, 4);
            let mut row = vec![0u8; src_stride];
            let mut image = Image::new(width, height, None, PixelFormat::Pal8, Some(palette), false);

            reader.seek(SeekFrom::Start(off_bits as u64))?;
            for y in 0..height {
                reader.read_exact(&mut row)?;
                let dest_y = if top_down { y } else { height - 1 - y };
                image.line_raw_mut(dest_y).copy_from_slice(&row[..width as usize]);
            }

            Ok(image)
        },

        24 => {
            let src_stride = upmult!(3 * width as usize, 4);
            let mut row = vec![0u8; src_stride];
            let mut image = Image::new(width, height, None, PixelFormat::RGB8, None, false);

            reader.seek(SeekFrom::Start(off_bits as u64))?;
            for y in 0..height {
                reader.read_exact(&mut row)?;
                let dest_y = if top_down { y } else { height - 1 - y };
                let line = image.line_raw_mut(dest_y);
                for x in 0..width as usize {
                    line[3 * x]     = row[3 * x + 2];
                    line[3 * x + 1] = row[3 * x + 1];
                    line[3 * x + 2] = row[3 * x];
                }
            }

            Ok(image)
        },

        other => Err(BmpError::UnsupportedFormat(format!("{} bits per pixel", other)))
    }
}

/// Saves a `Pal8`, `Mono8` or `RGB8` image as an uncompressed BMP. `Mono8` images get a
/// grayscale palette.
pub fn save_bmp(image: &Image, file_name: &str) -> Result<(), BmpError> {
    let width = image.width() as usize;
    let height = image.height();

    let (bit_count, palette_bytes) = match image.pixel_format() {
        PixelFormat::Pal8 | PixelFormat::Mono8 => (8u16, 4 * Palette::NUM_ENTRIES),
        PixelFormat::RGB8 => (24u16, 0),
        fmt => return Err(BmpError::UnsupportedFormat(format!("{:?} as BMP contents", fmt)))
    };

    let bytes_per_pixel = bit_count as usize / 8;
    let dest_stride = upmult!(width * bytes_per_pixel, 4);
    let data_offset = std::mem::size_of::<BitmapFileHeader>()
        + std::mem::size_of::<BitmapInfoHeader>()
        + palette_bytes;

    let mut writer = BufWriter::new(File::create(file_name)?);

    let file_hdr = BitmapFileHeader{
        ftype: BMP_MAGIC,
        size: (data_offset + dest_stride * height as usize) as u32,
        reserved_1: 0,
        reserved_2: 0,
        off_bits: data_offset as u32
    };
    write_struct(&file_hdr, &mut writer)?;

    let info_hdr = BitmapInfoHeader{
        size: std::mem::size_of::<BitmapInfoHeader>() as u32,
        width: width as i32,
        height: height as i32,
        planes: 1,
        bit_count,
        compression: BI_RGB,
        size_image: 0,
        x_pels_per_meter: 0,
        y_pels_per_meter: 0,
        clr_used: if bit_count == 8 { Palette::NUM_ENTRIES as u32 } else { 0 },
        clr_important: 0
    };
    write_struct(&info_hdr, &mut writer)?;

    if bit_count == 8 {
        let mut entries = [0u8; 4 * Palette::NUM_ENTRIES];
        match image.palette() {
            Some(pal) => for i in 0..Palette::NUM_ENTRIES {
                entries[4 * i]     = pal.pal[3 * i + 2];
                entries[4 * i + 1] = pal.pal[3 * i + 1];
                entries[4 * i + 2] = pal.pal[3 * i];
            },
            // grayscale ramp
            None => for i in 0..Palette::NUM_ENTRIES {
                entries[4 * i]     = i as u8;
                entries[4 * i + 1] = i as u8;
                entries[4 * i + 2] = i as u8;
            }
        }
        writer.write_all(&entries)?;
    }

    let mut row = vec![0u8; dest_stride];
    for y in (0..height).rev() {
        let line = image.line_raw(y);
        if bit_count == 8 {
            row[..width].copy_from_slice(&line[..width]);
        } else {
            for x in 0..width {
                row[3 * x]     = line[3 * x + 2];
                row[3 * x + 1] = line[3 * x + 1];
                row[3 * x + 2] = line[3 * x];
            }
        }
        writer.write_all(&row)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> String {
        std::env::temp_dir().join(name).to_str().unwrap().to_string()
    }

    #[test]
    fn mono8_image_survives_save_and_load() {
        // odd width exercises row padding
        let mut image = Image::new(5, 3, None, PixelFormat::Mono8, None, true);
        for y in 0..3 {
            for (x, value) in image.line_mut::<u8>(y).iter_mut().enumerate() {
                *value = (10 * y as usize + x) as u8;
            }
        }

        let path = temp_path("cycloblur_test_mono8.bmp");
        save_bmp(&image, &path).unwrap();
        let loaded = load_bmp(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(PixelFormat::Pal8, loaded.pixel_format());
        assert_eq!(5, loaded.width());
        assert_eq!(3, loaded.height());

        // the grayscale ramp palette makes indices equal gray levels
        let palette = loaded.palette().as_ref().unwrap();
        assert_eq!(palette.pal[3 * 17], 17);

        for y in 0..3 {
            assert_eq!(image.line::<u8>(y), loaded.line::<u8>(y));
        }
    }

    #[test]
    fn rgb8_image_survives_save_and_load() {
        let mut image = Image::new(4, 2, None, PixelFormat::RGB8, None, true);
        for y in 0..2 {
            let line = image.line_mut::<u8>(y);
            for x in 0..4 {
                line[3 * x]     = (x + 1) as u8;
                line[3 * x + 1] = 100 + y as u8;
                line[3 * x + 2] = 200;
            }
        }

        let path = temp_path("cycloblur_test_rgb8.bmp");
        save_bmp(&image, &path).unwrap();
        let loaded = load_bmp(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(PixelFormat::RGB8, loaded.pixel_format());
        for y in 0..2 {
            assert_eq!(image.line::<u8>(y), loaded.line::<u8>(y));
        }
    }

    #[test]
    fn loading_a_non_bmp_file_fails() {
        let path = temp_path("cycloblur_test_not_a.bmp");
        std::fs::write(&path, b"PNG is not BMP").unwrap();
        let result = load_bmp(&path);
        std::fs::remove_file(&path).unwrap();

        match result {
            Err(BmpError::MalformedFile(_)) | Err(BmpError::Io(_)) => (),
            _ => panic!("Expected a load failure.")
        }
    }
}
