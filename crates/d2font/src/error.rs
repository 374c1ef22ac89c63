use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    /// Corrupt or foreign file contents: bad signature, wrong fixed size,
    /// truncated data, out of range offsets or indices.
    #[error("format error: {0}")]
    Format(String),
    /// Inconsistent glyph requests (missing face, zero size, ...).
    #[error("config error: {0}")]
    Config(String),
    /// A value does not fit into its on-disk field.
    #[error("overflow: {0}")]
    Overflow(String),
    #[error("no glyph for char ({0})")]
    UnknownChar(u16),
    #[error("listing line {line}: {message}")]
    Listing { line: usize, message: String },
    #[error("rasterizer error: {0}")]
    Raster(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "png")]
    #[error("png error: {0}")]
    Png(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, AssetError>;

/// Narrows `val` into `T`, failing with an [`AssetError::Overflow`] built from `what`.
pub(crate) fn narrow<T, U>(val: U, what: impl FnOnce() -> String) -> Result<T>
where
    T: TryFrom<U>,
{
    T::try_from(val).map_err(|_| AssetError::Overflow(what()))
}
