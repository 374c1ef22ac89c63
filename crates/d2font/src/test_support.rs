//! Test support utilities for d2font.
//!
//! This module provides helper types and functions that are useful for testing
//! atlas building and rendering, but are not part of the public API.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::{
    raster::{RasterFace, RasterGlyph, Rasterizer},
    AssetError, Result,
};

/// Calls seen by a [`ScriptedRasterizer`] and its faces.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RasterLog {
    pub opened: Vec<PathBuf>,
    pub closed: usize,
    pub sizes: Vec<u32>,
    pub rendered: Vec<u16>,
}

/// A rasterizer that serves canned glyphs keyed by character code.
///
/// Codes without a script are reported as unmapped.
#[derive(Default)]
pub struct ScriptedRasterizer {
    glyphs: HashMap<u16, RasterGlyph>,
    failing: HashSet<u16>,
    log: Rc<RefCell<RasterLog>>,
}

impl ScriptedRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_glyph(mut self, code: u16, glyph: RasterGlyph) -> Self {
        self.glyphs.insert(code, glyph);
        self
    }

    /// Maps `code` but fails to render it.
    pub fn fail_on(mut self, code: u16) -> Self {
        self.failing.insert(code);
        self
    }

    pub fn log(&self) -> RasterLog {
        self.log.borrow().clone()
    }
}

impl Rasterizer for ScriptedRasterizer {
    type Face = ScriptedFace;

    fn open_face(&mut self, path: &Path) -> Result<ScriptedFace> {
        self.log.borrow_mut().opened.push(path.to_path_buf());
        Ok(ScriptedFace {
            glyphs: self.glyphs.clone(),
            failing: self.failing.clone(),
            log: Rc::clone(&self.log),
        })
    }
}

pub struct ScriptedFace {
    glyphs: HashMap<u16, RasterGlyph>,
    failing: HashSet<u16>,
    log: Rc<RefCell<RasterLog>>,
}

impl RasterFace for ScriptedFace {
    fn set_pixel_size(&mut self, pixels: u32) -> Result<()> {
        self.log.borrow_mut().sizes.push(pixels);
        Ok(())
    }

    fn glyph_index(&self, code: u16) -> Option<u32> {
        (self.glyphs.contains_key(&code) || self.failing.contains(&code)).then_some(code as u32)
    }

    fn render(&mut self, index: u32, _anti_alias: bool) -> Result<RasterGlyph> {
        let code = index as u16;
        if self.failing.contains(&code) {
            return Err(AssetError::Raster(format!("scripted failure for char ({code})")));
        }
        self.log.borrow_mut().rendered.push(code);
        self.glyphs
            .get(&code)
            .cloned()
            .ok_or_else(|| AssetError::Raster(format!("no script for glyph {index}")))
    }
}

impl Drop for ScriptedFace {
    fn drop(&mut self) {
        self.log.borrow_mut().closed += 1;
    }
}

/// A fully covered `width x height` glyph.
pub fn solid_glyph(width: usize, height: usize, bearing_x: i32, bearing_y: i32, advance: u32) -> RasterGlyph {
    RasterGlyph {
        width,
        height,
        coverage: vec![255; width * height],
        bearing_x,
        bearing_y,
        advance,
    }
}
