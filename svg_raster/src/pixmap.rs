// Copyright 2025 the svg_raster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A simple RGBA8 pixmap type.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use peniko::color::Rgba8;

/// A pixmap of straight-alpha RGBA8 values.
///
/// This is the raster result type of the whole crate: the rasterizer writes
/// into one, the cache stores them, and the shader post-processor maps one to
/// another. Pixels are stored in row-major order.
#[derive(Debug, Clone)]
pub struct Pixmap {
    width: u32,
    height: u32,
    buf: Vec<Rgba8>,
}

impl Pixmap {
    /// Create a new pixmap with the given width and height in pixels.
    ///
    /// All pixels are initialized to transparent black.
    pub fn new(width: u32, height: u32) -> Self {
        let buf = vec![TRANSPARENT; width as usize * height as usize];
        Self { width, height, buf }
    }

    /// Create a pixmap from existing RGBA8 data in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if `data` is not of length `width * height` exactly.
    pub fn from_parts(data: Vec<Rgba8>, width: u32, height: u32) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize,
            "expected `data` to have length of exactly `width * height`"
        );
        Self {
            width,
            height,
            buf: data,
        }
    }

    /// Return the width of the pixmap.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Return the height of the pixmap.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The size of the pixel buffer in bytes, as accounted by the raster cache.
    pub fn size_in_bytes(&self) -> usize {
        self.buf.len() * core::mem::size_of::<Rgba8>()
    }

    /// Returns a reference to the underlying pixels in row-major order.
    pub fn data(&self) -> &[Rgba8] {
        &self.buf
    }

    /// Returns a mutable reference to the underlying pixels in row-major order.
    pub fn data_mut(&mut self) -> &mut [Rgba8] {
        &mut self.buf
    }

    /// Returns the pixels as raw bytes in `[r, g, b, a]` order.
    pub fn data_as_u8_slice(&self) -> &[u8] {
        bytemuck::cast_slice(&self.buf)
    }

    /// Returns the pixels as mutable raw bytes in `[r, g, b, a]` order.
    pub fn data_as_u8_slice_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.buf)
    }

    /// Sample the pixel at the given coordinates.
    ///
    /// The origin is the top-left corner, `x` growing right and `y` growing
    /// down.
    #[inline]
    pub fn sample(&self, x: u32, y: u32) -> Rgba8 {
        let idx = self.width as usize * y as usize + x as usize;
        self.buf[idx]
    }

    /// Set the pixel at the given coordinates.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: Rgba8) {
        let idx = self.width as usize * y as usize + x as usize;
        self.buf[idx] = pixel;
    }

    /// Resample the pixmap to a new size with a Lanczos3 filter.
    ///
    /// This is the consumer-side counterpart of level-of-detail rendering:
    /// when the pipeline renders at a reduced effective size, the host calls
    /// this to stretch the result back onto the requested footprint.
    pub fn resample(&self, width: u32, height: u32) -> Self {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let src = RgbaImage::from_raw(self.width, self.height, self.data_as_u8_slice().to_vec())
            .expect("pixmap buffer length matches its dimensions");
        let scaled = imageops::resize(&src, width.max(1), height.max(1), FilterType::Lanczos3);
        let data = bytemuck::cast_vec(scaled.into_raw());
        Self::from_parts(data, width.max(1), height.max(1))
    }

    /// Encode the current content of the pixmap as a PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, png::EncodingError> {
        let mut data = Vec::new();
        let mut encoder = png::Encoder::new(&mut data, self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(self.data_as_u8_slice())?;
        writer.finish().map(|()| data)
    }

    /// Consume the pixmap, returning the underlying pixel vector.
    pub fn take(self) -> Vec<Rgba8> {
        self.buf
    }
}

const TRANSPARENT: Rgba8 = Rgba8 {
    r: 0,
    g: 0,
    b: 0,
    a: 0,
};
