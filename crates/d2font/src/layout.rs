//! Fixed advance text layout.
use crate::{
    error::{narrow, AssetError, Result},
    font::Font,
    glyph::Glyph,
    pixel::Bitmap,
};

const NEWLINE: u16 = b'\n' as u16;

impl Font {
    fn drawable(&self, code: u16) -> Result<&Glyph> {
        self.glyph(code)
            .filter(|g| g.has_bitmap())
            .ok_or(AssetError::UnknownChar(code))
    }

    /// Size `(width, height)` of the bitmap [`render`](Self::render) produces.
    ///
    /// Every line takes `line_spacing` rows; the height grows when a glyph bitmap
    /// reaches below its line's slot.
    pub fn measure(&self, text: &[u16]) -> Result<(usize, usize)> {
        let spacing = self.line_spacing as i64;
        let lines = text.iter().filter(|&&c| c == NEWLINE).count() as i64 + 1;
        let mut height = lines * spacing;
        let mut slot = height - spacing;
        let mut width = 0i64;
        let mut right = 0i64;
        let mut x = 0i64;
        for &code in text {
            if code == NEWLINE {
                width = width.max(right);
                right = 0;
                slot -= spacing;
                x = 0;
                continue;
            }
            let glyph = self.drawable(code)?;
            height = height.max(slot + glyph.bitmap.height() as i64);
            right = right.max(x + glyph.bearing_x as i64 + glyph.bitmap.width() as i64);
            x += glyph.advance as i64;
        }
        width = width.max(right);
        Ok((width.max(0) as usize, height.max(0) as usize))
    }

    pub fn measure_str(&self, text: &str) -> Result<(usize, usize)> {
        self.measure(&text.encode_utf16().collect::<Vec<_>>())
    }

    /// Draws `text` line by line, top line first. Each glyph is placed at
    /// `(x + bearing_x, baseline - bearing_y)` and moves the pen by its advance.
    pub fn render(&self, text: &[u16]) -> Result<Bitmap> {
        let (width, height) = self.measure(text)?;
        let spacing = self.line_spacing as i64;
        let breaks = text.iter().filter(|&&c| c == NEWLINE).count() as i64;
        let mut out = Bitmap::filled(width, height, self.transparency.background());
        let mut x = 0i64;
        let mut baseline = height as i64 - breaks * spacing;
        for &code in text {
            if code == NEWLINE {
                x = 0;
                baseline += spacing;
                continue;
            }
            let glyph = self.drawable(code)?;
            let left = x + glyph.bearing_x as i64;
            let top = baseline - glyph.bearing_y as i64;
            out.draw(
                &glyph.bitmap,
                narrow(left, || format!("glyph position {left} out of range"))?,
                narrow(top, || format!("glyph position {top} out of range"))?,
                self.transparency,
            );
            x += glyph.advance as i64;
        }
        Ok(out)
    }

    pub fn render_str(&self, text: &str) -> Result<Bitmap> {
        self.render(&text.encode_utf16().collect::<Vec<_>>())
    }
}
