use std::fmt;
use std::str::FromStr;

use image::{imageops, GrayImage, ImageBuffer, Rgb, RgbImage};

use crate::{Error, Result};

/// Pixel order the engine is told to expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    Grayscale,
    Rgb,
    Bgr,
}

impl ColorSpace {
    pub const ALL: [ColorSpace; 3] = [ColorSpace::Grayscale, ColorSpace::Rgb, ColorSpace::Bgr];

    /// The tag the native engine understands.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorSpace::Grayscale => "GRAYSCALE",
            ColorSpace::Rgb => "RGB",
            ColorSpace::Bgr => "BGR",
        }
    }

    pub fn planes(&self) -> u32 {
        match self {
            ColorSpace::Grayscale => 1,
            ColorSpace::Rgb | ColorSpace::Bgr => 3,
        }
    }
}

impl Default for ColorSpace {
    fn default() -> Self {
        ColorSpace::Grayscale
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorSpace {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self> {
        ColorSpace::ALL
            .iter()
            .copied()
            .find(|space| space.as_str() == tag)
            .ok_or_else(|| Error::InvalidArgument(format!("unsupported color space `{}`", tag)))
    }
}

/// A borrowed 8-bit image plus the strides the engine walks it with.
///
/// Offsets are in bytes: sample `(x, y, plane)` lives at
/// `y * line_feed + x * pixel_feed + plane * plane_feed`.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    planes: u32,
    pixel_feed: usize,
    line_feed: usize,
    plane_feed: usize,
}

impl<'a> Frame<'a> {
    /// Single-plane, densely packed rows.
    pub fn gray(data: &'a [u8], width: u32, height: u32) -> Result<Self> {
        Self::packed(data, width, height, 1)
    }

    /// Three interleaved planes, densely packed rows (RGB or BGR order).
    pub fn interleaved(data: &'a [u8], width: u32, height: u32) -> Result<Self> {
        Self::packed(data, width, height, 3)
    }

    fn packed(data: &'a [u8], width: u32, height: u32, planes: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::FrameLayout(format!("empty frame {}x{}", width, height)));
        }

        let pixel_feed = planes as usize;
        let line_feed = width as usize * pixel_feed;
        let needed = line_feed * height as usize;

        if data.len() < needed {
            return Err(Error::FrameLayout(format!(
                "{}x{} frame with {} plane(s) needs {} bytes, got {}",
                width,
                height,
                planes,
                needed,
                data.len()
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            planes,
            pixel_feed,
            line_feed,
            plane_feed: if planes > 1 { 1 } else { 0 },
        })
    }

    pub fn from_luma(image: &'a GrayImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::gray(image.as_raw(), width, height)
    }

    pub fn from_rgb(image: &'a RgbImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::interleaved(image.as_raw(), width, height)
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn planes(&self) -> u32 {
        self.planes
    }

    pub fn pixel_feed(&self) -> usize {
        self.pixel_feed
    }

    pub fn line_feed(&self) -> usize {
        self.line_feed
    }

    pub fn plane_feed(&self) -> usize {
        self.plane_feed
    }

    pub fn sample(&self, x: u32, y: u32, plane: u32) -> u8 {
        debug_assert!(x < self.width && y < self.height && plane < self.planes);
        self.data[y as usize * self.line_feed + x as usize * self.pixel_feed + plane as usize * self.plane_feed]
    }

    /// Rejects frames whose plane count does not suit `color_space`.
    pub fn check(&self, color_space: ColorSpace) -> Result<()> {
        if self.planes != color_space.planes() {
            return Err(Error::FrameLayout(format!(
                "{} expects {} plane(s), frame has {}",
                color_space,
                color_space.planes(),
                self.planes
            )));
        }
        Ok(())
    }

    /// Luma copy of the frame, reading channels in `color_space` order.
    pub fn to_luma(&self, color_space: ColorSpace) -> Result<GrayImage> {
        self.check(color_space)?;

        let pixels = &self.data[..self.line_feed * self.height as usize];
        let luma = match color_space {
            ColorSpace::Grayscale => GrayImage::from_raw(self.width, self.height, pixels.to_vec()),
            ColorSpace::Rgb => ImageBuffer::<Rgb<u8>, &[u8]>::from_raw(self.width, self.height, pixels)
                .map(|rgb| imageops::grayscale(&rgb)),
            ColorSpace::Bgr => {
                let mut swapped = pixels.to_vec();
                swapped.chunks_exact_mut(3).for_each(|pixel| pixel.swap(0, 2));
                RgbImage::from_raw(self.width, self.height, swapped).map(|rgb| imageops::grayscale(&rgb))
            }
        };

        luma.ok_or_else(|| {
            Error::FrameLayout(format!(
                "{}x{} {} frame is not densely packed",
                self.width, self.height, color_space
            ))
        })
    }
}
