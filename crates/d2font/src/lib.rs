//! d2font: Diablo II font asset toolkit.
//! Features: DC6 sprite codec, TBL font tables, palette quantization, glyph atlas
//! building from outline fonts and text rendering.

mod atlas;
pub mod dc6;
mod error;
mod font;
mod glyph;
mod layout;
pub mod listing;
pub mod palette;
pub mod pixel;
pub mod raster;
pub mod tbl;
pub use dc6::{Frame, Sprite};
pub use error::{AssetError, Result};
pub use font::{Font, FontMetrics};
pub use glyph::{BitmapState, Glyph};
pub use palette::{Palette, PaletteEncoder};
pub use pixel::{Bitmap, Pixel, PixelBuffer, Transparency};
pub use tbl::{FontTable, GlyphRecord, TableHeader};

// Test utilities
pub mod test_support;
