//! TBL font tables: a small header followed by one fixed size metrics record per character.
use std::{fs, path::Path};

use crate::error::{narrow, AssetError, Result};

/// `"Woo!"` read as a little endian u32.
pub const TBL_SIGNATURE: u32 = 0x216F_6F57;
pub const TBL_VERSION: u16 = 0x0001;
const HEADER_LEN: usize = 12;
const RECORD_LEN: usize = 14;

fn u16_at(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableHeader {
    /// Always 1 in shipped files.
    pub version: u16,
    /// Opaque, mostly 0.
    pub unknown: u16,
    pub line_spacing: u8,
    pub cap_height: u8,
}

impl Default for TableHeader {
    fn default() -> Self {
        Self {
            version: TBL_VERSION,
            unknown: 0,
            line_spacing: 0,
            cap_height: 0,
        }
    }
}

/// Metrics of one character. Fields named `unknown*` and `pad*` are opaque and
/// are carried through unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlyphRecord {
    pub code: u16,
    pub unknown1: u8,
    /// Horizontal advance.
    pub width: u8,
    pub height: u8,
    /// Mostly 1, seldom 0.
    pub flag: u8,
    pub unknown2: u16,
    /// Frame of the companion DC6 sprite holding the bitmap.
    pub frame_index: u16,
    pub pad1: u16,
    pub pad2: u16,
}

impl GlyphRecord {
    fn parse(b: &[u8]) -> Self {
        Self {
            code: u16_at(b, 0x00),
            unknown1: b[0x02],
            width: b[0x03],
            height: b[0x04],
            flag: b[0x05],
            unknown2: u16_at(b, 0x06),
            frame_index: u16_at(b, 0x08),
            pad1: u16_at(b, 0x0A),
            pad2: u16_at(b, 0x0C),
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend(self.code.to_le_bytes());
        out.extend([self.unknown1, self.width, self.height, self.flag]);
        out.extend(self.unknown2.to_le_bytes());
        out.extend(self.frame_index.to_le_bytes());
        out.extend(self.pad1.to_le_bytes());
        out.extend(self.pad2.to_le_bytes());
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontTable {
    pub header: TableHeader,
    pub glyphs: Vec<GlyphRecord>,
}

impl FontTable {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Loads the records exactly as stored, see [`from_bytes_raw`](Self::from_bytes_raw).
    pub fn load_raw(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes_raw(&bytes)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Parses a table and [`normalize`](Self::normalize)s it for lookups.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut table = Self::from_bytes_raw(bytes)?;
        table.normalize();
        Ok(table)
    }

    /// Parses a table keeping the stored record order, duplicates included.
    pub fn from_bytes_raw(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(AssetError::Format("tbl: file too short".into()));
        }
        let signature = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if signature != TBL_SIGNATURE {
            return Err(AssetError::Format(format!(
                "tbl: file should start with {TBL_SIGNATURE:08x} instead of {signature:08x}"
            )));
        }
        let header = TableHeader {
            version: u16_at(bytes, 0x04),
            unknown: u16_at(bytes, 0x06),
            line_spacing: bytes[0x0A],
            cap_height: bytes[0x0B],
        };
        let count = u16_at(bytes, 0x08) as usize;
        if count == 0 {
            return Err(AssetError::Format("tbl: file contains no characters".into()));
        }
        let records = bytes
            .get(HEADER_LEN..HEADER_LEN + count * RECORD_LEN)
            .ok_or_else(|| {
                AssetError::Format(format!(
                    "tbl: {count} records need {} bytes, file has {}",
                    HEADER_LEN + count * RECORD_LEN,
                    bytes.len()
                ))
            })?;
        Ok(FontTable {
            header,
            glyphs: records.chunks_exact(RECORD_LEN).map(GlyphRecord::parse).collect(),
        })
    }

    /// Header and records in their current order; the glyph count is the record count.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let count: u16 = narrow(self.glyphs.len(), || {
            format!("too many chars ({})", self.glyphs.len())
        })?;
        let mut out = Vec::with_capacity(HEADER_LEN + self.glyphs.len() * RECORD_LEN);
        out.extend(TBL_SIGNATURE.to_le_bytes());
        out.extend(self.header.version.to_le_bytes());
        out.extend(self.header.unknown.to_le_bytes());
        out.extend(count.to_le_bytes());
        out.push(self.header.line_spacing);
        out.push(self.header.cap_height);
        for g in &self.glyphs {
            g.write(&mut out);
        }
        Ok(out)
    }

    /// Brings the records into strictly increasing code order.
    ///
    /// Records are stably sorted by code and only the last record of each run of
    /// equal codes is kept. Returns whether anything had to change.
    pub fn normalize(&mut self) -> bool {
        let mut ordered = true;
        for (i, pair) in self.glyphs.windows(2).enumerate() {
            if pair[0].code >= pair[1].code {
                log::warn!(
                    "the {i}-th char ({}) is not less than the {}-th char ({})",
                    pair[0].code,
                    i + 1,
                    pair[1].code
                );
                ordered = false;
            }
        }
        if ordered {
            return false;
        }
        log::warn!("will sort the font table");
        self.glyphs.sort_by_key(|g| g.code);
        let before = self.glyphs.len();
        let mut kept = Vec::with_capacity(before);
        for run in self.glyphs.chunk_by(|a, b| a.code == b.code) {
            if run.len() > 1 {
                log::warn!(
                    "found {} occurrences of char ({}), only the last occurrence will be kept",
                    run.len(),
                    run[0].code
                );
            }
            kept.push(run[run.len() - 1]);
        }
        if kept.len() != before {
            log::warn!(
                "the number of chars is shrunk from {before} to {} due to duplicates",
                kept.len()
            );
        }
        self.glyphs = kept;
        true
    }

    pub fn glyph(&self, code: u16) -> Option<&GlyphRecord> {
        self.glyphs.iter().rev().find(|g| g.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: u16, width: u8) -> GlyphRecord {
        GlyphRecord {
            code,
            width,
            flag: 1,
            ..Default::default()
        }
    }

    #[test]
    fn normalize_keeps_sorted_tables() {
        let mut table = FontTable {
            header: TableHeader::default(),
            glyphs: vec![record(1, 1), record(2, 2)],
        };
        assert!(!table.normalize());
        assert_eq!(table.glyphs.len(), 2);
    }

    #[test]
    fn normalize_sorts_and_keeps_last_duplicate() {
        let mut table = FontTable {
            header: TableHeader::default(),
            glyphs: vec![record(5, 1), record(3, 2), record(5, 3)],
        };
        assert!(table.normalize());
        assert_eq!(table.glyphs, vec![record(3, 2), record(5, 3)]);
    }

    #[test]
    fn record_layout_is_fourteen_bytes() {
        let mut out = Vec::new();
        GlyphRecord {
            code: 0x0141,
            unknown1: 0xAA,
            width: 7,
            height: 12,
            flag: 1,
            unknown2: 0xBBCC,
            frame_index: 0x0102,
            pad1: 0,
            pad2: 0,
        }
        .write(&mut out);
        assert_eq!(
            out,
            [0x41, 0x01, 0xAA, 7, 12, 1, 0xCC, 0xBB, 0x02, 0x01, 0, 0, 0, 0]
        );
    }
}
