use std::{collections::BTreeMap, path::PathBuf};

use crate::{
    dc6::Sprite,
    error::{narrow, AssetError, Result},
    glyph::{BitmapState, Glyph},
    pixel::Transparency,
    tbl::{FontTable, GlyphRecord, TableHeader, TBL_VERSION},
};

/// Line metrics configuration. `None` values are derived while building glyphs.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontMetrics {
    /// Nominal point size of the font.
    pub size: u32,
    pub line_spacing: Option<u32>,
    pub cap_height: Option<u32>,
    pub line_spacing_offset: i32,
    pub cap_height_offset: i32,
    /// Space kept below the baseline of every glyph; defaults to the largest descent.
    pub descent_padding: Option<i32>,
    /// Line height scale in tenths, used to derive the line spacing.
    pub height_constant: i32,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            size: 0,
            line_spacing: None,
            cap_height: None,
            line_spacing_offset: 2,
            cap_height_offset: 0,
            descent_padding: None,
            height_constant: 17,
        }
    }
}

impl FontMetrics {
    pub fn with_size(size: u32) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }
}

/// Glyphs keyed by UTF-16 code unit plus the line metrics shared by all of them.
#[derive(Clone, Debug, Default)]
pub struct Font {
    pub(crate) glyphs: BTreeMap<u16, Glyph>,
    pub faces: Vec<PathBuf>,
    pub metrics: FontMetrics,
    pub transparency: Transparency,
    /// Opaque TBL header field.
    pub unknown_header: u16,
    pub(crate) line_spacing: u32,
    pub(crate) cap_height: u32,
}

impl Font {
    pub fn new(metrics: FontMetrics) -> Self {
        Self {
            line_spacing: metrics.line_spacing.unwrap_or(0),
            cap_height: metrics.cap_height.unwrap_or(0),
            metrics,
            ..Default::default()
        }
    }

    pub fn with_transparency(mut self, transparency: Transparency) -> Self {
        self.transparency = transparency;
        self
    }

    /// Registers a face file and returns its index.
    pub fn add_face(&mut self, path: impl Into<PathBuf>) -> usize {
        self.faces.push(path.into());
        self.faces.len() - 1
    }

    /// Adds a glyph, replacing any glyph with the same code.
    pub fn insert(&mut self, glyph: Glyph) -> Option<Glyph> {
        self.glyphs.insert(glyph.code, glyph)
    }

    /// Requests every code in `codes` from `face` at the font's nominal size.
    pub fn request_range(&mut self, codes: std::ops::RangeInclusive<u16>, face: usize, anti_alias: bool) {
        for code in codes {
            self.insert(Glyph::request(code, face, self.metrics.size, anti_alias));
        }
    }

    pub fn glyph(&self, code: u16) -> Option<&Glyph> {
        self.glyphs.get(&code)
    }

    pub fn glyph_mut(&mut self, code: u16) -> Option<&mut Glyph> {
        self.glyphs.get_mut(&code)
    }

    /// Glyphs in code order.
    pub fn glyphs(&self) -> impl Iterator<Item = &Glyph> {
        self.glyphs.values()
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn line_spacing(&self) -> u32 {
        self.line_spacing
    }

    pub fn cap_height(&self) -> u32 {
        self.cap_height
    }

    /// Rebuilds a font from a single direction sprite and its table.
    ///
    /// Frame bitmaps are moved out of `sprite`.
    pub fn from_sprite_table(mut sprite: Sprite, table: &FontTable, transparency: Transparency) -> Result<Self> {
        if sprite.directions() != 1 {
            return Err(AssetError::Format(format!(
                "the number of directions should be 1 instead of {}",
                sprite.directions()
            )));
        }
        let frames = sprite.frames_per_direction();
        if table.glyphs.len() != frames {
            return Err(AssetError::Format(format!(
                "the number of images ({frames}) should be the same as the number of chars ({})",
                table.glyphs.len()
            )));
        }
        let line_spacing = table.header.line_spacing as u32;
        let mut font = Font::new(FontMetrics {
            size: line_spacing,
            line_spacing: Some(line_spacing),
            cap_height: Some(table.header.cap_height as u32),
            ..Default::default()
        })
        .with_transparency(transparency);
        font.unknown_header = table.header.unknown;

        for record in &table.glyphs {
            if font.glyphs.contains_key(&record.code) {
                return Err(AssetError::Format(format!(
                    "char ({}) appears more than once",
                    record.code
                )));
            }
            let bitmap = sprite
                .take_image(0, record.frame_index as usize)
                .ok_or_else(|| {
                    AssetError::Format(format!(
                        "dc6 index ({}) is too large for char ({}): should be less than {frames}",
                        record.frame_index, record.code
                    ))
                })?;
            font.insert(Glyph {
                size: line_spacing,
                flag: record.flag,
                state: BitmapState::Rendered,
                bearing_y: record.height as i32,
                advance: record.width as u32,
                bitmap,
                ..Glyph::new(record.code)
            });
        }
        Ok(font)
    }

    /// Splits the font into a one direction sprite (one frame per glyph, in code
    /// order) and the matching table. Consumes the font.
    pub fn dump(self) -> Result<(Sprite, FontTable)> {
        let count = self.glyphs.len();
        narrow::<u16, _>(count, || format!("too many chars ({count})"))?;
        let header = TableHeader {
            version: TBL_VERSION,
            unknown: self.unknown_header,
            line_spacing: narrow(self.line_spacing, || {
                format!("line spacing too large ({})", self.line_spacing)
            })?,
            cap_height: narrow(self.cap_height, || {
                format!("cap height too large ({})", self.cap_height)
            })?,
        };
        let mut sprite = Sprite::new(1, count);
        let mut glyphs = Vec::with_capacity(count);
        for (index, (code, glyph)) in self.glyphs.into_iter().enumerate() {
            if !glyph.has_bitmap() {
                return Err(AssetError::Config(format!("no bitmap for char ({code})")));
            }
            glyphs.push(GlyphRecord {
                code,
                unknown1: 0,
                width: narrow(glyph.advance, || {
                    format!("the advance of char ({code}) is too large ({})", glyph.advance)
                })?,
                height: narrow(glyph.bitmap.height(), || {
                    format!("the height of char ({code}) is too large ({})", glyph.bitmap.height())
                })?,
                flag: glyph.flag,
                unknown2: 0,
                frame_index: index as u16,
                pad1: 0,
                pad2: 0,
            });
            if let Some(frame) = sprite.frame_mut(0, index) {
                frame.image = glyph.bitmap;
            }
        }
        Ok((sprite, FontTable { header, glyphs }))
    }
}
