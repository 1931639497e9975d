use std::fmt;
use std::str::FromStr;

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb, RgbImage};

use crate::error::ConfigError;

// Largest side accepted from the command line (16K video).
pub(crate) const MAX_SIDE: u32 = 16_384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Resolution {
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl Resolution {
    pub(crate) const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl FromStr for Resolution {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::Resolution(s.to_owned());
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if !(1..=MAX_SIDE).contains(&width) || !(1..=MAX_SIDE).contains(&height) {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    pub(crate) fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    pub(crate) fn from_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
    }

    #[cfg(test)]
    pub(crate) fn filled(resolution: Resolution, rgb: [u8; 3]) -> Self {
        Self::from_image(RgbImage::from_pixel(
            resolution.width,
            resolution.height,
            Rgb(rgb),
        ))
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub(crate) fn len(&self) -> usize {
        self.pixels.len()
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.pixels.len() == self.width as usize * self.height as usize * 3
    }

    pub(crate) fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = (y as usize * self.width as usize + x as usize) * 3;
        self.pixels.get(at..at + 3).map(|p| [p[0], p[1], p[2]])
    }

    /// Nearest-neighbour scale to `to`. Malformed frames and frames already
    /// at `to` are returned unchanged.
    pub(crate) fn resize(self, to: Resolution) -> Frame {
        if self.resolution() == to || !self.is_well_formed() || to.width == 0 || to.height == 0 {
            return self;
        }
        let scaled = ImageBuffer::<Rgb<u8>, &[u8]>::from_raw(self.width, self.height, self.pixels.as_slice())
            .map(|view| imageops::resize(&view, to.width, to.height, FilterType::Nearest));
        match scaled {
            Some(image) => Frame::from_image(image),
            None => self,
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}
