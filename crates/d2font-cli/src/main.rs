use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use d2font::{listing, Font, FontMetrics, FontTable, Palette, Sprite, Transparency};
use std::{fs, path::PathBuf};

use crate::files::{default_output, parse_color_key, read_preview_text};
mod files;

#[derive(Parser)]
#[command(name = "d2font", about = "Diablo II font toolkit CLI")]
struct Cli {
    /// Use the alpha channel for transparency instead of a color key
    #[arg(long, global = true)]
    alpha: bool,
    /// Transparent color as RRGGBB
    #[arg(long, global = true, value_parser = parse_color_key, default_value = "000000")]
    color_key: u32,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Extract every frame of a DC6 file as PNG
    DumpDc6 {
        input: PathBuf,
        /// Palette .dat file, or `null` for grayscale
        palette: PathBuf,
        out_dir: PathBuf,
    },
    /// Rasterize a character range of a TrueType face into DC6 + TBL
    MakeFont {
        first: u16,
        last: u16,
        face: PathBuf,
        size: u32,
        palette: PathBuf,
        out_dc6: PathBuf,
        out_tbl: PathBuf,
        #[arg(long)]
        anti_alias: bool,
        #[arg(long)]
        descent_padding: Option<i32>,
        #[arg(long)]
        line_spacing: Option<u32>,
        #[arg(long)]
        cap_height: Option<u32>,
    },
    /// Render text with a DC6 + TBL font
    Preview {
        dc6: PathBuf,
        tbl: PathBuf,
        palette: PathBuf,
        output: PathBuf,
        /// Text to render; read from stdin when absent
        #[arg(short, long)]
        text: Option<String>,
    },
    /// Convert a TBL file into an editable listing
    TblToTxt {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    /// Convert a listing back into a TBL file
    TxtToTbl {
        input: PathBuf,
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _logger = flexi_logger::Logger::try_with_env_or_str("info")?.start()?;
    let transparency = if cli.alpha {
        Transparency::Alpha
    } else {
        Transparency::ColorKey(cli.color_key)
    };
    match cli.command {
        Cmd::DumpDc6 {
            input,
            palette,
            out_dir,
        } => {
            let pal = Palette::load(&palette)
                .with_context(|| format!("reading palette {}", palette.display()))?;
            let sprite = Sprite::load(&input, &pal, transparency)
                .with_context(|| format!("reading {}", input.display()))?;
            fs::create_dir_all(&out_dir)?;
            for (dir, frame, f) in sprite.iter() {
                let path = out_dir.join(format!("{dir:02}-{frame:04}.png"));
                f.image.save_png(&path, transparency)?;
            }
            log::info!(
                "extracted {}x{} frames into {}",
                sprite.directions(),
                sprite.frames_per_direction(),
                out_dir.display()
            );
        }
        Cmd::MakeFont {
            first,
            last,
            face,
            size,
            palette,
            out_dc6,
            out_tbl,
            anti_alias,
            descent_padding,
            line_spacing,
            cap_height,
        } => {
            if first > last {
                bail!("empty character range {first}..={last}");
            }
            let pal = Palette::load(&palette)
                .with_context(|| format!("reading palette {}", palette.display()))?;
            let mut font = Font::new(FontMetrics {
                size,
                line_spacing,
                cap_height,
                descent_padding,
                ..Default::default()
            })
            .with_transparency(transparency);
            let face = font.add_face(face);
            font.request_range(first..=last, face, anti_alias);
            log::info!("rendering {} glyphs", font.len());
            font.build_glyphs(d2font::raster::AbGlyphRasterizer)?;
            log::info!(
                "line spacing {}, cap height {}",
                font.line_spacing(),
                font.cap_height()
            );
            let (sprite, table) = font.dump()?;
            sprite.save(&out_dc6, &pal, transparency)?;
            table.save(&out_tbl)?;
            log::info!("wrote {} and {}", out_dc6.display(), out_tbl.display());
        }
        Cmd::Preview {
            dc6,
            tbl,
            palette,
            output,
            text,
        } => {
            let pal = Palette::load(&palette)
                .with_context(|| format!("reading palette {}", palette.display()))?;
            let sprite = Sprite::load(&dc6, &pal, transparency)
                .with_context(|| format!("reading {}", dc6.display()))?;
            let table = FontTable::load(&tbl).with_context(|| format!("reading {}", tbl.display()))?;
            log::info!(
                "line spacing {}, cap height {}",
                table.header.line_spacing,
                table.header.cap_height
            );
            let font = Font::from_sprite_table(sprite, &table, transparency)?;
            let text = match text {
                Some(text) => text,
                None => read_preview_text()?,
            };
            let bmp = font.render_str(&text)?;
            bmp.save_png(&output, transparency)?;
        }
        Cmd::TblToTxt { input, output } => {
            let table = FontTable::load_raw(&input).with_context(|| format!("reading {}", input.display()))?;
            let output = output.unwrap_or_else(|| default_output(&input, "txt"));
            fs::write(&output, listing::encode(&listing::to_text(&table)))?;
            log::info!("wrote {} chars to {}", table.glyphs.len(), output.display());
        }
        Cmd::TxtToTbl { input, output } => {
            let bytes = fs::read(&input).with_context(|| format!("reading {}", input.display()))?;
            let table = listing::from_text(&listing::decode(&bytes)?)?;
            let output = output.unwrap_or_else(|| default_output(&input, "tbl"));
            table.save(&output)?;
            log::info!("wrote {} chars to {}", table.glyphs.len(), output.display());
        }
    }
    Ok(())
}
