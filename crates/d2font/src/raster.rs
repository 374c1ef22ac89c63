//! Glyph rasterizer seam.
//!
//! The atlas builder only talks to these traits: a [`Rasterizer`] opens faces, a
//! [`RasterFace`] maps characters and renders them at the current pixel size.
//! Dropping a face or a rasterizer releases it.
use std::path::Path;

use crate::{
    error::Result,
    pixel::{Bitmap, Pixel, Transparency},
};

/// Coverage bitmap and metrics of one rendered glyph.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RasterGlyph {
    pub width: usize,
    pub height: usize,
    /// Row-major, `width * height` values; mono renders use only 0 and 255.
    pub coverage: Vec<u8>,
    /// Offset from the pen position to the left edge of the bitmap.
    pub bearing_x: i32,
    /// Offset from the baseline up to the top edge of the bitmap.
    pub bearing_y: i32,
    pub advance: u32,
}

impl RasterGlyph {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Gray pixels, opaque wherever there is any coverage.
    pub fn to_bitmap(&self, transparency: Transparency) -> Result<Bitmap> {
        let pixels = self
            .coverage
            .iter()
            .map(|&c| match c {
                0 => transparency.background(),
                c => Pixel::gray(c),
            })
            .collect();
        Bitmap::from_vec(self.width, self.height, pixels)
    }
}

pub trait RasterFace {
    fn set_pixel_size(&mut self, pixels: u32) -> Result<()>;

    /// Face specific glyph index, `None` if the face does not map `code`.
    fn glyph_index(&self, code: u16) -> Option<u32>;

    fn render(&mut self, index: u32, anti_alias: bool) -> Result<RasterGlyph>;
}

pub trait Rasterizer {
    type Face: RasterFace;

    fn open_face(&mut self, path: &Path) -> Result<Self::Face>;
}

impl<R: Rasterizer> Rasterizer for &mut R {
    type Face = R::Face;

    fn open_face(&mut self, path: &Path) -> Result<Self::Face> {
        (**self).open_face(path)
    }
}

#[cfg(feature = "rasterize")]
pub use self::outline::{AbGlyphFace, AbGlyphRasterizer};

#[cfg(feature = "rasterize")]
mod outline {
    use std::{fs, path::Path};

    use ab_glyph::{Font as _, FontVec, GlyphId, PxScale, ScaleFont as _};

    use super::{RasterFace, RasterGlyph, Rasterizer};
    use crate::error::{AssetError, Result};

    /// Coverage at or above this renders as set in mono mode.
    const MONO_THRESHOLD: f32 = 0.5;

    /// TrueType / OpenType rasterizer backed by `ab_glyph`.
    #[derive(Debug, Default)]
    pub struct AbGlyphRasterizer;

    impl Rasterizer for AbGlyphRasterizer {
        type Face = AbGlyphFace;

        fn open_face(&mut self, path: &Path) -> Result<AbGlyphFace> {
            let data = fs::read(path)?;
            let font = FontVec::try_from_vec(data).map_err(|e| {
                AssetError::Raster(format!("failed to load face {}: {e}", path.display()))
            })?;
            log::info!("opened face {}", path.display());
            Ok(AbGlyphFace {
                font,
                scale: PxScale::from(1.0),
            })
        }
    }

    pub struct AbGlyphFace {
        font: FontVec,
        scale: PxScale,
    }

    impl RasterFace for AbGlyphFace {
        /// Sets the em size in pixels.
        fn set_pixel_size(&mut self, pixels: u32) -> Result<()> {
            let units_per_em = self
                .font
                .units_per_em()
                .ok_or_else(|| AssetError::Raster("face has no units per em".into()))?;
            let height = self.font.height_unscaled();
            self.scale = PxScale::from(pixels as f32 * height / units_per_em);
            Ok(())
        }

        fn glyph_index(&self, code: u16) -> Option<u32> {
            let ch = char::from_u32(code as u32)?;
            let id = self.font.glyph_id(ch);
            (id.0 != 0).then_some(id.0 as u32)
        }

        fn render(&mut self, index: u32, anti_alias: bool) -> Result<RasterGlyph> {
            let id = GlyphId(index as u16);
            let scaled = self.font.as_scaled(self.scale);
            let advance = scaled.h_advance(id).max(0.0) as u32;
            let glyph = id.with_scale_and_position(self.scale, ab_glyph::point(0.0, 0.0));
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                return Ok(RasterGlyph {
                    advance,
                    ..Default::default()
                });
            };
            let bounds = outlined.px_bounds();
            let width = (bounds.max.x - bounds.min.x) as usize;
            let height = (bounds.max.y - bounds.min.y) as usize;
            let mut coverage = vec![0u8; width * height];
            outlined.draw(|x, y, c| {
                let (x, y) = (x as usize, y as usize);
                if x < width && y < height {
                    coverage[y * width + x] = if anti_alias {
                        (c.clamp(0.0, 1.0) * 255.0).round() as u8
                    } else if c >= MONO_THRESHOLD {
                        255
                    } else {
                        0
                    };
                }
            });
            Ok(RasterGlyph {
                width,
                height,
                coverage,
                bearing_x: bounds.min.x as i32,
                bearing_y: -bounds.min.y as i32,
                advance,
            })
        }
    }
}
