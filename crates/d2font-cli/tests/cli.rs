use assert_cmd::Command;
use d2font::{
    listing, Bitmap, BitmapState, Font, FontMetrics, FontTable, Glyph, Palette, Pixel, Sprite,
    Transparency,
};
use predicates::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("d2font_cli_{name}_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_font(dir: &Path) -> (PathBuf, PathBuf) {
    let mut font = Font::new(FontMetrics {
        line_spacing: Some(10),
        cap_height: Some(5),
        ..FontMetrics::with_size(10)
    });
    for (code, width) in [(b'H', 4usize), (b'i', 2)] {
        font.insert(Glyph {
            state: BitmapState::Rendered,
            bearing_y: 8,
            advance: width as u32 + 1,
            bitmap: Bitmap::filled(width, 8, Pixel::gray(220)),
            ..Glyph::new(code as u16)
        });
    }
    let (sprite, table) = font.dump().unwrap();
    let dc6 = dir.join("font.dc6");
    let tbl = dir.join("font.tbl");
    sprite
        .save(&dc6, &Palette::grayscale(), Transparency::default())
        .unwrap();
    table.save(&tbl).unwrap();
    (dc6, tbl)
}

#[test]
fn tbl_listing_round_trip() {
    let dir = scratch_dir("listing");
    let (_, tbl) = write_font(&dir);
    Command::cargo_bin("d2font")
        .unwrap()
        .arg("tbl-to-txt")
        .arg(&tbl)
        .assert()
        .success();
    let txt = dir.join("font.txt");
    let text = listing::decode(&fs::read(&txt).unwrap()).unwrap();
    assert!(text.starts_with("Woo!\t0\t2\t10\t5\r\n"));

    let rebuilt = dir.join("rebuilt.tbl");
    Command::cargo_bin("d2font")
        .unwrap()
        .arg("txt-to-tbl")
        .arg(&txt)
        .arg(&rebuilt)
        .assert()
        .success();
    assert_eq!(
        FontTable::load(&rebuilt).unwrap(),
        FontTable::load(&tbl).unwrap()
    );
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn utf8_listing_is_accepted() {
    let dir = scratch_dir("utf8");
    let txt = dir.join("font.txt");
    fs::write(&txt, "Woo!\t0\t1\t12\t6\nA\t7\t9\t1\t0000\n").unwrap();
    Command::cargo_bin("d2font")
        .unwrap()
        .arg("txt-to-tbl")
        .arg(&txt)
        .assert()
        .success();
    let table = FontTable::load(dir.join("font.tbl")).unwrap();
    assert_eq!(table.header.line_spacing, 12);
    assert_eq!(table.glyph(b'A' as u16).map(|g| g.width), Some(7));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn dump_and_preview() {
    let dir = scratch_dir("preview");
    let (dc6, tbl) = write_font(&dir);
    let frames = dir.join("frames");
    Command::cargo_bin("d2font")
        .unwrap()
        .args(["dump-dc6"])
        .arg(&dc6)
        .arg("null")
        .arg(&frames)
        .assert()
        .success();
    assert!(frames.join("00-0000.png").exists());
    assert!(frames.join("00-0001.png").exists());

    let png = dir.join("hi.png");
    Command::cargo_bin("d2font")
        .unwrap()
        .arg("preview")
        .arg(&dc6)
        .arg(&tbl)
        .arg("null")
        .arg(&png)
        .write_stdin("Hi\n\n")
        .assert()
        .success();
    assert!(png.exists());
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn preview_rejects_unknown_chars() {
    let dir = scratch_dir("unknown");
    let (dc6, tbl) = write_font(&dir);
    Command::cargo_bin("d2font")
        .unwrap()
        .arg("preview")
        .arg(&dc6)
        .arg(&tbl)
        .arg("null")
        .arg(dir.join("out.png"))
        .args(["--text", "Hey"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no glyph for char (101)"));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn bad_color_key_is_rejected() {
    Command::cargo_bin("d2font")
        .unwrap()
        .args(["--color-key", "12345", "tbl-to-txt", "missing.tbl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("RRGGBB"));
}

#[test]
fn missing_palette_fails() {
    let dir = scratch_dir("palette");
    let (dc6, _) = write_font(&dir);
    Command::cargo_bin("d2font")
        .unwrap()
        .arg("dump-dc6")
        .arg(&dc6)
        .arg(dir.join("nope.dat"))
        .arg(dir.join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading palette"));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn make_font_from_truetype_face() {
    let dir = scratch_dir("make_font");
    let face = Path::new(env!("CARGO_MANIFEST_DIR")).join("../d2font/tests/ttf/DejaVuSansMono.ttf");
    let (dc6, tbl) = (dir.join("made.dc6"), dir.join("made.tbl"));
    Command::cargo_bin("d2font")
        .unwrap()
        .args(["make-font", "65", "70"])
        .arg(&face)
        .args(["16", "null"])
        .arg(&dc6)
        .arg(&tbl)
        .arg("--anti-alias")
        .assert()
        .success();
    let table = FontTable::load(&tbl).unwrap();
    assert_eq!(table.glyphs.len(), 6);
    assert_eq!(table.header.cap_height, 8);
    assert!(table.glyph(b'A' as u16).is_some_and(|g| g.width > 0));
    let sprite = Sprite::load(&dc6, &Palette::grayscale(), Transparency::default()).unwrap();
    assert_eq!(sprite.frames_per_direction(), 6);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn tbl_listing_keeps_record_order() {
    let dir = scratch_dir("raw_order");
    let mut bytes = Vec::new();
    bytes.extend(0x216F_6F57u32.to_le_bytes());
    bytes.extend([1, 0, 0, 0, 3, 0, 16, 8]);
    for (code, frame) in [(b'b', 0u8), (b'a', 1), (b'b', 2)] {
        bytes.extend([code, 0, 0, 5, 9, 1, 0, 0, frame, 0, 0, 0, 0, 0]);
    }
    let tbl = dir.join("dupes.tbl");
    fs::write(&tbl, &bytes).unwrap();
    Command::cargo_bin("d2font")
        .unwrap()
        .arg("tbl-to-txt")
        .arg(&tbl)
        .assert()
        .success();
    let text = listing::decode(&fs::read(dir.join("dupes.txt")).unwrap()).unwrap();
    assert_eq!(
        text,
        "Woo!\t0\t3\t16\t8\r\nb\t5\t9\t1\t0000\r\na\t5\t9\t1\t0001\r\nb\t5\t9\t1\t0002\r\n"
    );
    fs::remove_dir_all(&dir).unwrap();
}
