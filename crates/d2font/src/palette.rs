//! 256 color palettes and nearest color quantization.
use std::{collections::HashMap, fs, ops::Index, path::Path};

use once_cell::sync::Lazy;

use crate::{
    error::{AssetError, Result},
    pixel::Pixel,
};

/// Palette path that selects the built-in grayscale ramp instead of a file.
pub const GRAYSCALE_PATH: &str = "null";

/// Size of a palette `.dat` file: 256 B,G,R triplets.
pub const PALETTE_FILE_LEN: usize = 768;

static GRAYSCALE: Lazy<Palette> = Lazy::new(|| {
    let mut colors = [Pixel::TRANSPARENT; 256];
    for (i, c) in colors.iter_mut().enumerate() {
        *c = Pixel::gray(i as u8);
    }
    Palette { colors }
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: [Pixel; 256],
}

impl Palette {
    pub fn new(colors: [Pixel; 256]) -> Self {
        Self { colors }
    }

    /// Index `i` maps to gray level `i`.
    pub fn grayscale() -> Self {
        GRAYSCALE.clone()
    }

    /// Loads a palette file, or the grayscale ramp for [`GRAYSCALE_PATH`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str() == GRAYSCALE_PATH {
            return Ok(Self::grayscale());
        }
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PALETTE_FILE_LEN {
            return Err(AssetError::Format(format!(
                "incorrect palette size: expected {PALETTE_FILE_LEN} bytes, but {} bytes",
                bytes.len()
            )));
        }
        let mut colors = [Pixel::TRANSPARENT; 256];
        for (c, bgr) in colors.iter_mut().zip(bytes.chunks_exact(3)) {
            *c = Pixel::opaque(bgr[2], bgr[1], bgr[0]);
        }
        Ok(Self { colors })
    }

    pub fn colors(&self) -> &[Pixel; 256] {
        &self.colors
    }

    /// Index of the closest entry; the lowest index wins ties.
    pub fn nearest(&self, pixel: Pixel) -> u8 {
        let mut best = 0;
        let mut best_dist = u32::MAX;
        for (i, c) in self.colors.iter().enumerate() {
            let dist = pixel.distance2(*c);
            if dist < best_dist {
                best_dist = dist;
                best = i;
            }
        }
        best as u8
    }
}

impl Index<u8> for Palette {
    type Output = Pixel;

    fn index(&self, index: u8) -> &Pixel {
        &self.colors[index as usize]
    }
}

/// Memoizing front end for [`Palette::nearest`], scoped to one encoding pass.
pub struct PaletteEncoder<'a> {
    palette: &'a Palette,
    cache: HashMap<u32, u8>,
}

impl<'a> PaletteEncoder<'a> {
    pub fn new(palette: &'a Palette) -> Self {
        Self {
            palette,
            cache: HashMap::new(),
        }
    }

    pub fn encode(&mut self, pixel: Pixel) -> u8 {
        let palette = self.palette;
        *self
            .cache
            .entry(pixel.rgb())
            .or_insert_with(|| palette.nearest(pixel))
    }

    /// Number of distinct colors resolved so far (one palette search each).
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
