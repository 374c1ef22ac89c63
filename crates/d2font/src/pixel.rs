//! Pixels and row-major 2D buffers.
use std::ops::{Index, IndexMut};

use crate::error::{AssetError, Result};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel {
    pub const TRANSPARENT: Pixel = Pixel::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Opaque pixel from a packed `0xRRGGBB` value.
    pub const fn from_rgb(rgb: u32) -> Self {
        Self::opaque((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    pub const fn gray(level: u8) -> Self {
        Self::opaque(level, level, level)
    }

    /// Packed `0xRRGGBB`, alpha ignored.
    pub const fn rgb(self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    /// Squared euclidean distance over the color channels.
    pub fn distance2(self, other: Pixel) -> u32 {
        fn d2(a: u8, b: u8) -> u32 {
            let d = a as i32 - b as i32;
            (d * d) as u32
        }
        d2(self.r, other.r) + d2(self.g, other.g) + d2(self.b, other.b)
    }
}

/// How "no pixel here" is represented in a bitmap.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Transparency {
    /// A reserved `0xRRGGBB` value marks transparent pixels; drawing is a plain copy
    /// of every other pixel.
    ColorKey(u32),
    /// Zero alpha marks transparent pixels; drawing alpha-blends.
    Alpha,
}

impl Default for Transparency {
    fn default() -> Self {
        Transparency::ColorKey(0x000000)
    }
}

impl Transparency {
    /// The pixel a freshly allocated, empty bitmap is filled with.
    pub fn background(self) -> Pixel {
        match self {
            Transparency::ColorKey(key) => Pixel::from_rgb(key),
            Transparency::Alpha => Pixel::TRANSPARENT,
        }
    }

    pub fn is_transparent(self, pixel: Pixel) -> bool {
        match self {
            Transparency::ColorKey(key) => pixel.rgb() == key,
            Transparency::Alpha => pixel.a == 0,
        }
    }
}

/// Row-major grid of `width * height` elements.
///
/// Used for images (`PixelBuffer<Pixel>`, see [`Bitmap`]) as well as for the
/// direction x frame table of a sprite.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PixelBuffer<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

pub type Bitmap = PixelBuffer<Pixel>;

impl<T: Clone + Default> PixelBuffer<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![T::default(); width * height],
        }
    }

    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Like [`filled`](Self::filled), for dimensions that come from untrusted input.
    /// Fails instead of aborting when the buffer cannot be allocated.
    pub fn try_filled(width: usize, height: usize, value: T) -> Result<Self> {
        let too_large = || AssetError::Format(format!("buffer of {width}x{height} elements is too large"));
        let len = width
            .checked_mul(height)
            .filter(|n| n.checked_mul(std::mem::size_of::<T>()).is_some_and(|b| b <= isize::MAX as usize))
            .ok_or_else(too_large)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| too_large())?;
        data.resize(len, value);
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Reshapes the buffer. The allocation is kept when it is large enough;
    /// element contents are unspecified afterwards until the next [`fill`](Self::fill).
    pub fn resize(&mut self, width: usize, height: usize) {
        self.data.resize(width * height, T::default());
        self.width = width;
        self.height = height;
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl<T> PixelBuffer<T> {
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self> {
        if width * height != data.len() {
            return Err(AssetError::Format(format!(
                "{} elements do not make a {width}x{height} buffer",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row(&self, y: usize) -> &[T] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        &mut self.data[y * self.width..(y + 1) * self.width]
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        (x < self.width && y < self.height).then(|| &self.data[y * self.width + x])
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        (x < self.width && y < self.height).then(|| &mut self.data[y * self.width + x])
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.data.iter_mut()
    }
}

impl<T> Index<(usize, usize)> for PixelBuffer<T> {
    type Output = T;

    fn index(&self, (x, y): (usize, usize)) -> &T {
        assert!(x < self.width && y < self.height, "({x},{y}) out of bounds");
        &self.data[y * self.width + x]
    }
}

impl<T> IndexMut<(usize, usize)> for PixelBuffer<T> {
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut T {
        assert!(x < self.width && y < self.height, "({x},{y}) out of bounds");
        &mut self.data[y * self.width + x]
    }
}

fn alpha_blend(src: Pixel, dst: Pixel) -> Pixel {
    let sx = src.a as u32 * 255;
    let dx = dst.a as u32 * (255 - src.a as u32);
    let ax = sx + dx;
    if ax == 0 {
        return Pixel::TRANSPARENT;
    }
    let mix = |s: u8, d: u8| ((sx * s as u32 + dx * d as u32) / ax) as u8;
    Pixel::new(
        mix(src.r, dst.r),
        mix(src.g, dst.g),
        mix(src.b, dst.b),
        (ax / 255) as u8,
    )
}

impl Bitmap {
    /// Draws `src` with its top-left corner at `(x, y)`, clipped to this bitmap.
    ///
    /// A placement that leaves nothing visible is skipped, a partially visible one
    /// is cropped; both are reported as warnings.
    pub fn draw(&mut self, src: &Bitmap, x: i32, y: i32, transparency: Transparency) {
        let (x, y) = (x as i64, y as i64);
        let (src_w, src_h) = (src.width as i64, src.height as i64);
        let dst_x = x.max(0);
        let dst_y = y.max(0);
        let src_x = (-x).max(0);
        let src_y = (-y).max(0);
        let w = (self.width as i64 - dst_x).min(src_w - src_x);
        let h = (self.height as i64 - dst_y).min(src_h - src_y);
        if w <= 0 || h <= 0 {
            log::warn!(
                "no bitmap is drawn at ({x},{y})->({},{}); canvas size is {}x{}",
                x + src_w,
                y + src_h,
                self.width,
                self.height
            );
            return;
        }
        if w != src_w || h != src_h {
            log::warn!("bitmap is cropped from {src_w}x{src_h} to {w}x{h}");
        }
        let (dst_x, dst_y, src_x, src_y) = (dst_x as usize, dst_y as usize, src_x as usize, src_y as usize);
        let (w, h) = (w as usize, h as usize);
        for row in 0..h {
            let from = &src.row(src_y + row)[src_x..src_x + w];
            let to = &mut self.row_mut(dst_y + row)[dst_x..dst_x + w];
            for (d, s) in to.iter_mut().zip(from) {
                match transparency {
                    Transparency::ColorKey(key) => {
                        if s.rgb() != key {
                            *d = *s;
                        }
                    }
                    Transparency::Alpha => *d = alpha_blend(*s, *d),
                }
            }
        }
    }

    #[cfg(feature = "png")]
    pub fn to_rgba_image(&self) -> Result<image::RgbaImage> {
        let (w, h) = self.image_size()?;
        Ok(image::RgbaImage::from_fn(w, h, |x, y| {
            let p = self[(x as usize, y as usize)];
            image::Rgba([p.r, p.g, p.b, p.a])
        }))
    }

    #[cfg(feature = "png")]
    pub fn to_rgb_image(&self) -> Result<image::RgbImage> {
        let (w, h) = self.image_size()?;
        Ok(image::RgbImage::from_fn(w, h, |x, y| {
            let p = self[(x as usize, y as usize)];
            image::Rgb([p.r, p.g, p.b])
        }))
    }

    /// Writes the bitmap as PNG: RGBA when `transparency` is alpha based, RGB otherwise.
    #[cfg(feature = "png")]
    pub fn save_png(&self, path: impl AsRef<std::path::Path>, transparency: Transparency) -> Result<()> {
        match transparency {
            Transparency::Alpha => self
                .to_rgba_image()?
                .save_with_format(path, image::ImageFormat::Png)?,
            Transparency::ColorKey(_) => self
                .to_rgb_image()?
                .save_with_format(path, image::ImageFormat::Png)?,
        }
        Ok(())
    }

    #[cfg(feature = "png")]
    fn image_size(&self) -> Result<(u32, u32)> {
        let w = crate::error::narrow(self.width, || format!("bitmap too wide ({})", self.width))?;
        let h = crate::error::narrow(self.height, || format!("bitmap too tall ({})", self.height))?;
        Ok((w, h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_keeps_len_invariant() {
        let mut bmp = Bitmap::new(4, 3);
        assert_eq!(bmp.len(), 12);
        bmp.resize(2, 2);
        assert_eq!(bmp.len(), 4);
        assert_eq!((bmp.width(), bmp.height()), (2, 2));
        bmp.resize(5, 5);
        assert_eq!(bmp.len(), 25);
        bmp.resize(0, 7);
        assert!(bmp.is_empty());
    }

    #[test]
    fn try_filled_rejects_impossible_sizes() {
        assert!(Bitmap::try_filled(usize::MAX, 2, Pixel::TRANSPARENT).is_err());
        assert!(Bitmap::try_filled(usize::MAX / 8, 2, Pixel::TRANSPARENT).is_err());
        let bmp = Bitmap::try_filled(3, 2, Pixel::gray(7)).unwrap();
        assert_eq!(bmp, Bitmap::filled(3, 2, Pixel::gray(7)));
    }

    #[test]
    fn draw_skips_color_key() {
        let key = Transparency::ColorKey(0x000000);
        let mut dst = Bitmap::filled(3, 1, Pixel::from_rgb(0x112233));
        let mut src = Bitmap::new(3, 1);
        src[(0, 0)] = Pixel::from_rgb(0xff0000);
        src[(1, 0)] = Pixel::from_rgb(0x000000);
        src[(2, 0)] = Pixel::from_rgb(0x00ff00);
        dst.draw(&src, 0, 0, key);
        assert_eq!(dst[(0, 0)].rgb(), 0xff0000);
        assert_eq!(dst[(1, 0)].rgb(), 0x112233);
        assert_eq!(dst[(2, 0)].rgb(), 0x00ff00);
    }

    #[test]
    fn draw_clips_negative_offsets() {
        let mut dst = Bitmap::filled(2, 2, Pixel::gray(0));
        let mut src = Bitmap::new(3, 3);
        for (i, p) in src.iter_mut().enumerate() {
            *p = Pixel::gray(i as u8 + 1);
        }
        dst.draw(&src, -1, -1, Transparency::ColorKey(0));
        assert_eq!(dst[(0, 0)], Pixel::gray(5));
        assert_eq!(dst[(1, 0)], Pixel::gray(6));
        assert_eq!(dst[(0, 1)], Pixel::gray(8));
        assert_eq!(dst[(1, 1)], Pixel::gray(9));
    }

    #[test]
    fn draw_without_overlap_is_noop() {
        let mut dst = Bitmap::filled(2, 2, Pixel::gray(7));
        let src = Bitmap::filled(2, 2, Pixel::gray(200));
        dst.draw(&src, 2, 0, Transparency::Alpha);
        dst.draw(&src, -2, 0, Transparency::Alpha);
        assert!(dst.iter().all(|p| *p == Pixel::gray(7)));
    }

    #[test]
    fn alpha_blend_rules() {
        assert_eq!(
            alpha_blend(Pixel::TRANSPARENT, Pixel::TRANSPARENT),
            Pixel::TRANSPARENT
        );
        let red = Pixel::opaque(255, 0, 0);
        assert_eq!(alpha_blend(red, Pixel::opaque(0, 0, 255)), red);
        let blue = Pixel::opaque(0, 0, 255);
        assert_eq!(alpha_blend(Pixel::new(9, 9, 9, 0), blue), blue);
        let half = alpha_blend(Pixel::new(255, 255, 255, 128), Pixel::opaque(0, 0, 0));
        assert_eq!(half.a, 255);
        assert_eq!(half.r, 128);
    }
}
