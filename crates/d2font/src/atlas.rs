//! Rasterizing requested glyphs and reconciling their metrics into one font.
use crate::{
    error::{AssetError, Result},
    font::Font,
    glyph::{BitmapState, Glyph},
    pixel::Bitmap,
    raster::{RasterFace, Rasterizer},
};

impl Font {
    /// Renders every glyph that has no bitmap yet and derives the line metrics.
    ///
    /// Glyphs are rasterized grouped by `(face, size)` so each face is opened once
    /// and each size set once per face. Afterwards every rendered glyph is
    /// letterboxed so that its left bearing is baked into the bitmap and all of them
    /// share the same space below the baseline (the descent padding).
    pub fn build_glyphs<R: Rasterizer>(&mut self, mut rasterizer: R) -> Result<()> {
        if self.metrics.height_constant <= 0 {
            return Err(AssetError::Config(format!(
                "the height constant should be positive instead of {}",
                self.metrics.height_constant
            )));
        }
        if let Some(padding) = self.metrics.descent_padding.filter(|p| *p < 0) {
            return Err(AssetError::Config(format!(
                "the descent padding should not be negative ({padding})"
            )));
        }
        let pending = self.pending_requests()?;
        if pending.is_empty() {
            return Ok(());
        }
        let transparency = self.transparency;

        let mut active: Option<R::Face> = None;
        let mut active_index = None;
        let mut active_size = 0;
        for &(face_index, size, code) in &pending {
            if active_index != Some(face_index) {
                // the previous face is released before the next one is opened
                drop(active.take());
                active = Some(rasterizer.open_face(&self.faces[face_index])?);
                active_index = Some(face_index);
                active_size = 0;
            }
            let Some(face) = active.as_mut() else {
                continue;
            };
            if size != active_size {
                face.set_pixel_size(size)?;
                active_size = size;
            }
            let Some(glyph) = self.glyphs.get_mut(&code) else {
                continue;
            };
            match face.glyph_index(code) {
                None => {
                    log::warn!("no glyph found for char ({code}), a dummy (1x1) bitmap will be generated");
                    glyph.make_placeholder(transparency);
                    glyph.advance = 1;
                }
                Some(index) => {
                    let raster = face.render(index, glyph.anti_alias)?;
                    if raster.is_empty() {
                        log::warn!(
                            "empty bitmap generated for char ({code}), a dummy (1x1) bitmap will be generated"
                        );
                        glyph.make_placeholder(transparency);
                    } else {
                        glyph.bitmap = raster.to_bitmap(transparency)?;
                        glyph.bearing_x = raster.bearing_x;
                        glyph.bearing_y = raster.bearing_y;
                        glyph.state = BitmapState::Rendered;
                    }
                    glyph.advance = raster.advance;
                }
            }
        }
        drop(active);
        drop(rasterizer);

        let max_descent = pending
            .iter()
            .filter_map(|(_, _, code)| self.glyphs.get(code))
            .filter(|g| g.state == BitmapState::Rendered)
            .map(Glyph::descent)
            .fold(0, i32::max);
        let padding = self.metrics.descent_padding.unwrap_or(max_descent);

        let mut max_height = 0usize;
        for (_, _, code) in &pending {
            let Some(glyph) = self.glyphs.get_mut(code) else {
                continue;
            };
            if glyph.state != BitmapState::Rendered {
                continue;
            }
            if glyph.bearing_x < 0 {
                log::warn!(
                    "bearing x is negative ({}) for char ({code}), set it to 0",
                    glyph.bearing_x
                );
                glyph.bearing_x = 0;
            }
            if glyph.bearing_x != 0 || glyph.descent() != padding {
                let width = glyph.bearing_x as i64 + glyph.bitmap.width() as i64;
                let height = glyph.bearing_y as i64 + padding as i64;
                if width <= 0 || height <= 0 {
                    log::warn!(
                        "the bitmap of char ({code}) is completely cropped out, a dummy (1x1) bitmap will be generated"
                    );
                    glyph.make_placeholder(transparency);
                    continue;
                }
                let mut boxed = Bitmap::filled(width as usize, height as usize, transparency.background());
                boxed.draw(&glyph.bitmap, glyph.bearing_x, 0, transparency);
                glyph.bitmap = boxed;
            }
            max_height = max_height.max(glyph.bitmap.height());
        }

        // derived metrics stick once set, later builds only add glyphs
        let height_constant = self.metrics.height_constant as i64;
        if let Some(spacing) = self.metrics.line_spacing {
            self.line_spacing = spacing;
        } else if self.line_spacing == 0 {
            let base = max_height as i64 - max_descent as i64 * 10 / height_constant;
            self.line_spacing = (base + self.metrics.line_spacing_offset as i64).max(0) as u32;
        }
        let actual_spacing = height_constant * self.line_spacing as i64 / 10;
        if actual_spacing < max_height as i64 {
            log::warn!(
                "the maximum height ({max_height}) of newly generated glyphs is larger than the actual spacing ({actual_spacing})"
            );
        }
        if let Some(cap) = self.metrics.cap_height {
            self.cap_height = cap;
        } else if self.cap_height == 0 {
            self.cap_height =
                ((self.metrics.size as i64 + self.metrics.cap_height_offset as i64) / 2).max(0) as u32;
        }
        Ok(())
    }

    /// Validated `(face, size, code)` of every glyph still missing its bitmap, in
    /// rasterization order.
    fn pending_requests(&self) -> Result<Vec<(usize, u32, u16)>> {
        let mut pending = Vec::new();
        for (&code, glyph) in &self.glyphs {
            if glyph.has_bitmap() {
                continue;
            }
            let face = glyph
                .face
                .ok_or_else(|| AssetError::Config(format!("no font face specified for char ({code})")))?;
            if face >= self.faces.len() {
                return Err(AssetError::Config(format!(
                    "face index for char ({code}) is too large: {face} >= {}",
                    self.faces.len()
                )));
            }
            if glyph.size == 0 {
                return Err(AssetError::Config(format!(
                    "the size of char ({code}) should not be 0"
                )));
            }
            pending.push((face, glyph.size, code));
        }
        pending.sort_unstable();
        Ok(pending)
    }
}
