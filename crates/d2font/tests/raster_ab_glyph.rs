#![cfg(feature = "rasterize")]

use std::path::{Path, PathBuf};

use d2font::{
    raster::{AbGlyphRasterizer, RasterFace, RasterGlyph, Rasterizer},
    AssetError, BitmapState, Font, FontMetrics,
};

const A: u16 = b'A' as u16;
const G: u16 = b'g' as u16;
// CJK ideograph, not covered by the fixture
const UNMAPPED: u16 = 0x4E00;

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/ttf/DejaVuSansMono.ttf")
}

fn render(code: u16, size: u32, anti_alias: bool) -> RasterGlyph {
    let mut face = AbGlyphRasterizer.open_face(&fixture()).unwrap();
    face.set_pixel_size(size).unwrap();
    let index = face.glyph_index(code).unwrap();
    face.render(index, anti_alias).unwrap()
}

#[test]
fn anti_aliased_capital_sits_on_the_baseline() {
    let a = render(A, 16, true);
    assert!(a.width > 0 && a.height > 0);
    assert_eq!(a.coverage.len(), a.width * a.height);
    assert!(a.coverage.iter().any(|&c| c > 0 && c < 255));
    assert!(a.bearing_y > 0);
    assert!((a.height as i32 - a.bearing_y).abs() <= 1);
    assert!(a.advance > 0);
    assert!(a.bearing_x >= 0);
}

#[test]
fn descender_reaches_below_the_baseline() {
    let g = render(G, 16, true);
    assert!(g.bearing_y > 0);
    assert!(g.height as i32 > g.bearing_y + 1);
}

#[test]
fn mono_render_is_binary() {
    let a = render(A, 16, false);
    assert!(a.coverage.iter().all(|&c| c == 0 || c == 255));
    assert!(a.coverage.contains(&255));
}

#[test]
fn pixel_size_scales_the_glyph() {
    let small = render(A, 16, true);
    let large = render(A, 32, true);
    assert!(large.height * 2 >= small.height * 3);
    assert!(large.advance * 2 >= small.advance * 3);
}

#[test]
fn unmapped_char_has_no_index() {
    let face = AbGlyphRasterizer.open_face(&fixture()).unwrap();
    assert!(face.glyph_index(A).is_some());
    assert_eq!(face.glyph_index(UNMAPPED), None);
    // lone surrogate
    assert_eq!(face.glyph_index(0xD800), None);
}

#[test]
fn broken_faces_are_errors() {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
    assert!(matches!(
        AbGlyphRasterizer.open_face(&manifest),
        Err(AssetError::Raster(_))
    ));
    assert!(matches!(
        AbGlyphRasterizer.open_face(Path::new("no-such-face.ttf")),
        Err(AssetError::Io(_))
    ));
}

#[test]
fn builds_a_font_from_the_fixture() {
    let mut font = Font::new(FontMetrics::with_size(16));
    let face = font.add_face(fixture());
    font.request_range(A..=b'C' as u16, face, true);
    font.request_range(UNMAPPED..=UNMAPPED, face, true);
    font.build_glyphs(AbGlyphRasterizer).unwrap();

    let a = font.glyph(A).unwrap();
    assert_eq!(a.state, BitmapState::Rendered);
    assert!(a.advance > 0);
    let missing = font.glyph(UNMAPPED).unwrap();
    assert_eq!(missing.state, BitmapState::Placeholder);
    assert_eq!(missing.advance, 1);
    assert!(font.line_spacing() > 0);
    assert_eq!(font.cap_height(), 8);

    let (sprite, table) = font.dump().unwrap();
    assert_eq!(sprite.frames_per_direction(), 4);
    assert_eq!(table.glyphs.len(), 4);
}
