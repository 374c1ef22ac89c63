use crate::pixel::{Bitmap, Transparency};

#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BitmapState {
    /// Requested but not rendered yet.
    #[default]
    Missing,
    /// 1x1 blank stand-in for a character the face could not produce.
    Placeholder,
    Rendered,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Glyph {
    pub code: u16,
    /// Index into [`Font::faces`](crate::Font::faces); `None` when the glyph
    /// did not come from a face.
    pub face: Option<usize>,
    /// Pixel size to rasterize at.
    pub size: u32,
    pub anti_alias: bool,
    /// Opaque per-character TBL flag.
    pub flag: u8,
    pub state: BitmapState,
    pub bearing_x: i32,
    pub bearing_y: i32,
    pub advance: u32,
    pub bitmap: Bitmap,
}

impl Glyph {
    pub fn new(code: u16) -> Self {
        Self {
            code,
            face: None,
            size: 0,
            anti_alias: true,
            flag: 1,
            state: BitmapState::Missing,
            bearing_x: 0,
            bearing_y: 0,
            advance: 0,
            bitmap: Bitmap::default(),
        }
    }

    /// A glyph to be rasterized from `face` at `size` pixels.
    pub fn request(code: u16, face: usize, size: u32, anti_alias: bool) -> Self {
        Self {
            face: Some(face),
            size,
            anti_alias,
            ..Self::new(code)
        }
    }

    /// Distance from the baseline down to the bottom of the bitmap.
    pub fn descent(&self) -> i32 {
        self.bitmap.height() as i32 - self.bearing_y
    }

    pub fn has_bitmap(&self) -> bool {
        self.state != BitmapState::Missing
    }

    /// Turns this glyph into the 1x1 blank stand-in, keeping its advance.
    pub(crate) fn make_placeholder(&mut self, transparency: Transparency) {
        self.state = BitmapState::Placeholder;
        self.bearing_x = 0;
        self.bearing_y = 0;
        self.bitmap = Bitmap::filled(1, 1, transparency.background());
    }
}
