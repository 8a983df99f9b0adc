//
// cycloblur - Reversible circulant blur for images
// Copyright (c) 2026 cycloblur developers
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Image data structure, I/O and basic operations.
//!

#[macro_use]
mod utils; // must be first due to exported macros
mod bmp;

use std::any::Any;
use std::path::Path;
use std::slice;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FileType {
    /// Determined automatically from file name extension
    Auto,
    Bmp
}

fn file_type_from_ext(file_name: &str) -> FileType {
    match Path::new(file_name).extension() {
        Some(ext) => match ext.to_str().unwrap().to_lowercase().as_str() {
                         "bmp" => FileType::Bmp,
                         _ => panic!("Unrecognized file extension: {}", ext.to_str().unwrap())
                     },
        _ => panic!("No file extension in file name: {}", file_name)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PixelFormat {
    /// 8 bits per pixel, values from a 256-entry palette.
    Pal8,
    Mono8,
    /// LSB = R, MSB = B.
    RGB8,
    Mono32f
}

pub fn num_channels(pix_fmt: PixelFormat) -> usize {
    match pix_fmt {
        PixelFormat::Pal8    |
        PixelFormat::Mono8   |
        PixelFormat::Mono32f => 1,

        PixelFormat::RGB8 => 3
    }
}

pub fn bytes_per_pixel(pix_fmt: PixelFormat) -> usize {
    match pix_fmt {
        PixelFormat::Pal8 | PixelFormat::Mono8 => 1,
        PixelFormat::RGB8 => 3,
        PixelFormat::Mono32f => 4
    }
}

/// Asserts that `T` is the type of pixel values (in each channel) corresponding to `pix_fmt`.
fn verify_pix_type<T: Default + Any>(pix_fmt: PixelFormat) {
    let t = &T::default() as &dyn Any;
    match pix_fmt {
        PixelFormat::Pal8  |
        PixelFormat::Mono8 |
        PixelFormat::RGB8 => assert!(t.is::<u8>()),

        PixelFormat::Mono32f => assert!(t.is::<f32>())
    }
}

#[derive(Copy)]
pub struct Palette {
    pub pal: [u8; 3 * Palette::NUM_ENTRIES]
}

impl std::fmt::Debug for Palette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Palette [{}, {}, {}, ...]", self.pal[0], self.pal[1], self.pal[2])
    }
}

impl Palette {
    pub const NUM_ENTRIES: usize = 256;
}

impl Clone for Palette {
    fn clone(&self) -> Palette { *self }
}

impl Default for Palette {
    fn default() -> Palette { Palette{ pal: [0; 3 * Palette::NUM_ENTRIES] }}
}

#[derive(Clone)]
pub struct Image {
    width: u32,
    height: u32,
    pix_fmt: PixelFormat,
    palette: Option<Palette>,
    pixels: Vec<u8>,
    bytes_per_line: usize
}

#[derive(Debug)]
pub enum ImageError {
    BmpError(bmp::BmpError)
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Image {}x{}, {:?}, bytes_per_line = {}, pixels = {:?}...",
            self.width,
            self.height,
            self.pix_fmt,
            self.bytes_per_line,
            &self.pixels[..8.min(self.pixels.len())]
        )
    }
}

impl Image {
    /// Creates a new image using the specified storage.
    ///
    /// `pixels` must have enough space. `palette` is used only if `pix_fmt` equals `Pal8`.
    ///
    pub fn new_from_pixels(
        width: u32,
        height: u32,
        mut bytes_per_line: Option<usize>,
        pix_fmt: PixelFormat,
        pal: Option<Palette>,
        pixels: Vec<u8>
    ) -> Image {
        match bytes_per_line {
            Some(num) => {
                assert!(num as usize >= width as usize * bytes_per_pixel(pix_fmt));
            },
            None => bytes_per_line = Some(width as usize * bytes_per_pixel(pix_fmt))
        }

        assert!(pixels.len() >= height as usize * bytes_per_line.unwrap());

        Image{
            width,
            height,
            pix_fmt,
            palette: pal,
            pixels,
            bytes_per_line: bytes_per_line.unwrap()
        }
    }

    /// Creates a new image.
    ///
    /// `palette` is used only if `pix_fmt` equals `Pal8`.
    ///
    pub fn new(
        width: u32,
        height: u32,
        mut bytes_per_line: Option<usize>,
        pix_fmt: PixelFormat,
        palette: Option<Palette>,
        zero_fill: bool
    ) -> Image {
        match bytes_per_line {
            Some(num) => assert!(num as usize >= width as usize * bytes_per_pixel(pix_fmt)),
            None => bytes_per_line = Some(width as usize * bytes_per_pixel(pix_fmt))
        }

        let byte_count = height as usize * bytes_per_line.unwrap();
        let pixels: Vec<u8> = if zero_fill {
            vec![0; byte_count]
        } else {
            utils::alloc_uninitialized(byte_count)
        };

        Image::new_from_pixels(width, height, bytes_per_line, pix_fmt, palette, pixels)
    }

    pub fn load(file_name: &str, file_type: FileType) -> Result<Image, ImageError> {
        let ftype = if file_type == FileType::Auto { file_type_from_ext(file_name) } else { file_type };
        match ftype {
            FileType::Bmp => bmp::load_bmp(file_name).map_err(ImageError::BmpError),
            FileType::Auto => unreachable!()
        }
    }

    /// Overwrites existing file.
    pub fn save(&self, file_name: &str, file_type: FileType) -> Result<(), ImageError> {
        let ftype = if file_type == FileType::Auto { file_type_from_ext(file_name) } else { file_type };
        match ftype {
            FileType::Bmp => bmp::save_bmp(&self, file_name).map_err(ImageError::BmpError),
            FileType::Auto => unreachable!()
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pix_fmt
    }

    pub fn palette(&self) -> &Option<Palette> {
        &self.palette
    }

    pub fn bytes_per_line(&self) -> usize {
        self.bytes_per_line
    }

    /// Returns channel values per line (including padding, if any).
    ///
    /// `T` must correspond to the image's pixel format.
    ///
    pub fn values_per_line<T: Any + Default>(&self) -> usize {
        verify_pix_type::<T>(self.pix_fmt);
        self.bytes_per_line / std::mem::size_of::<T>()
    }

    /// Returns pixels (including row padding, if any).
    ///
    /// `T` must correspond to the image's pixel format.
    ///
    pub fn pixels<T: Any + Default>(&self) -> &[T] {
        verify_pix_type::<T>(self.pix_fmt);

        let ptr: *const u8 = self.pixels[..].as_ptr();
        unsafe {
            slice::from_raw_parts(
                ptr as *const T,
                self.bytes_per_line / std::mem::size_of::<T>() * self.height as usize
            )
        }
    }

    /// Returns mutable pixels (including row padding, if any).
    ///
    /// `T` must correspond to the image's pixel format.
    ///
    pub fn pixels_mut<T: Any + Default>(&mut self) -> &mut [T] {
        verify_pix_type::<T>(self.pix_fmt);

        let ptr: *mut u8 = self.pixels[..].as_mut_ptr();
        unsafe {
            slice::from_raw_parts_mut(
                ptr as *mut T,
                self.bytes_per_line / std::mem::size_of::<T>() * self.height as usize
            )
        }
    }

    /// Returns a line as raw bytes (regardless of pixel format).
    pub fn line_raw(&self, y: u32) -> &[u8] {
        &self.pixels[range!(y as usize * self.bytes_per_line, self.bytes_per_line)]
    }

    /// Returns a mutable line as raw bytes (regardless of pixel format).
    pub fn line_raw_mut(&mut self, y: u32) -> &mut [u8] {
        &mut self.pixels[range!(y as usize * self.bytes_per_line, self.bytes_per_line)]
    }

    /// Returns image line.
    ///
    /// `T` must correspond to the image's pixel format.
    ///
    pub fn line<T: Any + Default>(&self, y: u32) -> &[T] {
        assert!(y < self.height);
        let vals_per_line = self.values_per_line::<T>();

        &self.pixels::<T>()[range!(y as usize * vals_per_line, vals_per_line)]
    }

    /// Returns mutable image line.
    ///
    /// `T` must correspond to the image's pixel format.
    ///
    pub fn line_mut<T: Any + Default>(&mut self, y: u32) -> &mut [T] {
        assert!(y < self.height);
        let vals_per_line = self.values_per_line::<T>();

        &mut self.pixels_mut::<T>()[range!(y as usize * vals_per_line, vals_per_line)]
    }

    /// Returns the top-left `width`×`height` fragment.
    #[must_use]
    pub fn crop(&self, width: u32, height: u32) -> Image {
        assert!(width > 0 && width <= self.width);
        assert!(height > 0 && height <= self.height);

        let mut result = Image::new(width, height, None, self.pix_fmt, self.palette, false);
        let line_bytes = width as usize * bytes_per_pixel(self.pix_fmt);
        for y in 0..height {
            result.line_raw_mut(y).copy_from_slice(&self.line_raw(y)[..line_bytes]);
        }

        result
    }

    /// Returns the image converted to `dest_fmt`.
    ///
    /// Color and paletted contents are reduced to luminance with Rec. 601 weights;
    /// `Mono32f` values are clipped to [0, 255] when quantizing to `Mono8`.
    ///
    #[must_use]
    pub fn convert_pix_fmt(&self, dest_fmt: PixelFormat) -> Image {
        if self.pix_fmt == dest_fmt {
            return self.clone();
        }

        let mut result = Image::new(self.width, self.height, None, dest_fmt, None, false);

        match (self.pix_fmt, dest_fmt) {
            (PixelFormat::Mono8, PixelFormat::Mono32f) => {
                for y in 0..self.height {
                    let src = self.line::<u8>(y);
                    for (dest, value) in result.line_mut::<f32>(y).iter_mut().zip(src.iter()) {
                        *dest = *value as f32;
                    }
                }
            },

            (PixelFormat::Pal8, PixelFormat::Mono32f) => {
                let palette = self.palette.as_ref().expect("Pal8 image without a palette.");
                for y in 0..self.height {
                    let src = self.line::<u8>(y);
                    for (dest, value) in result.line_mut::<f32>(y).iter_mut().zip(src.iter()) {
                        *dest = luma(
                            palette.pal[3 * *value as usize],
                            palette.pal[3 * *value as usize + 1],
                            palette.pal[3 * *value as usize + 2]
                        );
                    }
                }
            },

            (PixelFormat::RGB8, PixelFormat::Mono32f) => {
                for y in 0..self.height {
                    let src = self.line::<u8>(y);
                    for (x, dest) in result.line_mut::<f32>(y).iter_mut().enumerate() {
                        *dest = luma(src[3 * x], src[3 * x + 1], src[3 * x + 2]);
                    }
                }
            },

            (PixelFormat::Mono32f, PixelFormat::Mono8) => {
                for y in 0..self.height {
                    let src = self.line::<f32>(y);
                    for (dest, value) in result.line_mut::<u8>(y).iter_mut().zip(src.iter()) {
                        *dest = value.max(0.0).min(255.0).round() as u8;
                    }
                }
            },

            (src_fmt, dest_fmt) => panic!("Conversion {:?} -> {:?} not supported.", src_fmt, dest_fmt)
        }

        result
    }
}

/// Rec. 601 luminance of an RGB triple.
fn luma(r: u8, g: u8, b: u8) -> f32 {
    (299 * r as u32 + 587 * g as u32 + 114 * b as u32) as f32 / 1000.0
}
