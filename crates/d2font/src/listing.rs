//! Editable text listing of a font table.
//!
//! ```text
//! Woo!	<unknown>	<count>	<line spacing>	<cap height>
//! <char>	<width>	<height>	<flag>	<frame index>
//! ```
//!
//! Fields are tab separated. `<char>` is the literal character, with `\t`, `\n`
//! and `\r` escaped; a lone `\` is a backslash. A numeric field written as
//! `#<char>` copies that field from the latest earlier entry of `<char>`.
use std::collections::HashMap;

use crate::{
    error::{AssetError, Result},
    tbl::{FontTable, GlyphRecord, TableHeader, TBL_VERSION},
};

const LISTING_SIGNATURE: &str = "Woo!";
const UTF16_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

fn escape(code: u16) -> Option<String> {
    let ch = char::from_u32(code as u32)?;
    Some(match ch {
        '\t' => "\\t".into(),
        '\n' => "\\n".into(),
        '\r' => "\\r".into(),
        c => c.to_string(),
    })
}

/// Renders `table` as a listing with CRLF line ends. Surrogate codes cannot be
/// written and are skipped with a warning.
pub fn to_text(table: &FontTable) -> String {
    let max_index = table.glyphs.iter().map(|g| g.frame_index).max().unwrap_or(0);
    let index_width = if max_index < 10000 { 4 } else { 5 };
    let mut out = String::new();
    let h = &table.header;
    out.push_str(&format!(
        "{LISTING_SIGNATURE}\t{}\t{}\t{}\t{}\r\n",
        h.unknown,
        table.glyphs.len(),
        h.line_spacing,
        h.cap_height
    ));
    for g in &table.glyphs {
        let Some(ch) = escape(g.code) else {
            log::warn!("found invalid codepoint ({}); it is in the surrogate area", g.code);
            continue;
        };
        out.push_str(&format!(
            "{ch}\t{}\t{}\t{}\t{:0>index_width$}\r\n",
            g.width, g.height, g.flag, g.frame_index
        ));
    }
    out
}

struct Parser {
    line: usize,
    // latest record index for every code seen so far
    latest: HashMap<u16, usize>,
    glyphs: Vec<GlyphRecord>,
}

impl Parser {
    fn error(&self, message: impl Into<String>) -> AssetError {
        AssetError::Listing {
            line: self.line,
            message: message.into(),
        }
    }

    fn char_field(&self, field: &str) -> Result<u16> {
        let ch = match field {
            "\\" | "\\\\" => '\\',
            "\\t" => '\t',
            "\\n" => '\n',
            "\\r" => '\r',
            f if f.starts_with('\\') && f.chars().count() > 1 => {
                return Err(self.error(format!("unknown escape sequence [{f}]")));
            }
            f => {
                let mut chars = f.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => return Err(self.error(format!("expected a single character, found [{f}]"))),
                }
            }
        };
        let mut units = [0u16; 2];
        match ch.encode_utf16(&mut units) {
            [unit] => Ok(*unit),
            _ => Err(self.error(format!("character [{ch}] is outside the basic plane"))),
        }
    }

    fn number<T>(&self, field: &str, name: &str, pick: impl Fn(&GlyphRecord) -> T) -> Result<T>
    where
        T: std::str::FromStr,
    {
        if let Some(reference) = field.strip_prefix('#') {
            let code = self.char_field(reference)?;
            return self
                .latest
                .get(&code)
                .map(|&i| pick(&self.glyphs[i]))
                .ok_or_else(|| self.error(format!("no [{reference}] found")));
        }
        field
            .parse()
            .map_err(|_| self.error(format!("failed to read {name} [{field}]")))
    }

    fn record(&mut self, line: &str) -> Result<()> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 5 {
            return Err(self.error(format!("expected 5 fields, found {}", fields.len())));
        }
        let code = self.char_field(fields[0])?;
        let record = GlyphRecord {
            code,
            unknown1: 0,
            width: self.number(fields[1], "width", |g| g.width)?,
            height: self.number(fields[2], "height", |g| g.height)?,
            flag: self.number(fields[3], "flag", |g| g.flag)?,
            unknown2: 0,
            frame_index: self.number(fields[4], "frame index", |g| g.frame_index)?,
            pad1: 0,
            pad2: 0,
        };
        if self.latest.contains_key(&code) {
            log::warn!(
                "found duplicated [{}], both of them will be kept and #references to it use the latter one",
                fields[0]
            );
        }
        self.latest.insert(code, self.glyphs.len());
        self.glyphs.push(record);
        Ok(())
    }
}

/// Parses a listing. Entries keep their order and duplicates; a glyph count in the
/// header that disagrees with the entries is only a warning.
pub fn from_text(text: &str) -> Result<FontTable> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .enumerate()
        .filter(|(_, l)| !l.is_empty());

    let (_, header_line) = lines.next().ok_or(AssetError::Listing {
        line: 1,
        message: "missing header".into(),
    })?;
    let mut parser = Parser {
        line: 1,
        latest: HashMap::new(),
        glyphs: Vec::new(),
    };
    let parts: Vec<&str> = header_line.split('\t').collect();
    if parts.len() != 5 || parts[0] != LISTING_SIGNATURE {
        return Err(parser.error("invalid listing header"));
    }
    let unknown: u16 = parser.number(parts[1], "unknown", |_| 0)?;
    let count: usize = parser.number(parts[2], "glyph count", |_| 0)?;
    let header = TableHeader {
        version: TBL_VERSION,
        unknown,
        line_spacing: parser.number(parts[3], "line spacing", |_| 0)?,
        cap_height: parser.number(parts[4], "cap height", |_| 0)?,
    };

    for (index, line) in lines {
        parser.line = index + 1;
        parser.record(line)?;
    }
    if parser.glyphs.len() != count {
        log::warn!(
            "glyph count in header ({count}) does not match the number of chars in the listing ({}), the latter is used",
            parser.glyphs.len()
        );
    }
    Ok(FontTable {
        header,
        glyphs: parser.glyphs,
    })
}

/// Decodes listing bytes: UTF-16LE when they start with its byte order mark,
/// UTF-8 otherwise.
pub fn decode(bytes: &[u8]) -> Result<String> {
    if let Some(rest) = bytes.strip_prefix(&UTF16_BOM) {
        if rest.len() % 2 != 0 {
            return Err(AssetError::Format("listing: odd utf-16 byte count".into()));
        }
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect();
        return String::from_utf16(&units)
            .map_err(|e| AssetError::Format(format!("listing: {e}")));
    }
    let bytes = bytes.strip_prefix(&UTF8_BOM).unwrap_or(bytes);
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| AssetError::Format(format!("listing: utf8 error: {e}")))
}

/// UTF-16LE with byte order mark.
pub fn encode(text: &str) -> Vec<u8> {
    let mut out = UTF16_BOM.to_vec();
    for unit in text.encode_utf16() {
        out.extend(unit.to_le_bytes());
    }
    out
}
