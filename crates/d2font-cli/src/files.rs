use std::{
    io::Read,
    path::{Path, PathBuf},
};

/// Parses `RRGGBB`, with an optional leading `#`.
pub fn parse_color_key(s: &str) -> Result<u32, String> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 {
        return Err(format!("expected RRGGBB, got {s}"));
    }
    u32::from_str_radix(hex, 16).map_err(|e| format!("invalid color {s}: {e}"))
}

/// `input` with its extension replaced.
pub fn default_output(input: &Path, extension: &str) -> PathBuf {
    input.with_extension(extension)
}

/// Whole stdin with trailing line breaks removed.
pub fn read_preview_text() -> anyhow::Result<String> {
    log::info!("reading text from stdin");
    let mut text = String::new();
    std::io::stdin().read_to_string(&mut text)?;
    let trimmed = text.trim_end_matches(['\n', '\r']).len();
    text.truncate(trimmed);
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_keys() {
        assert_eq!(parse_color_key("000000"), Ok(0));
        assert_eq!(parse_color_key("#FF00aa"), Ok(0xFF00AA));
        assert!(parse_color_key("fff").is_err());
        assert!(parse_color_key("zz0000").is_err());
    }

    #[test]
    fn output_swaps_extension() {
        assert_eq!(
            default_output(Path::new("data/font16.tbl"), "txt"),
            PathBuf::from("data/font16.txt")
        );
    }
}
