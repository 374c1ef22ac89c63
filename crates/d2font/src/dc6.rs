//! DC6 sprite container: directions x frames of palettized, run-length encoded images.
use std::{fs, path::Path};

use crate::{
    error::{narrow, AssetError, Result},
    palette::{Palette, PaletteEncoder},
    pixel::{Bitmap, PixelBuffer, Transparency},
};

const DC6_VERSION: u32 = 0x0000_0006;
const DC6_UNKNOWN1: u32 = 0x0000_0001;
const DC6_TERMINATOR: u32 = 0xEEEE_EEEE;
const FRAME_TERMINATOR: [u8; 3] = [0xEE, 0xEE, 0xEE];
const HEADER_LEN: usize = 24;
const FRAME_HEADER_LEN: usize = 32;

// RLE bytes
const END_OF_LINE: u8 = 0x80;
const TRANSPARENT_FLAG: u8 = 0x80;
const MAX_RUN: usize = 0x7F;

fn read_u32(bytes: &[u8], at: usize, what: &str) -> Result<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| AssetError::Format(format!("dc6: truncated {what} at {at}")))
}

fn read_i32(bytes: &[u8], at: usize, what: &str) -> Result<i32> {
    read_u32(bytes, at, what).map(|v| v as i32)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dc6Header {
    pub version: u32,
    pub unknown1: u32,
    pub unknown_zero: u32,
    pub terminator: u32,
    pub directions: u32,
    pub frames: u32,
}

impl Dc6Header {
    pub fn new(directions: u32, frames: u32) -> Self {
        Self {
            version: DC6_VERSION,
            unknown1: DC6_UNKNOWN1,
            unknown_zero: 0,
            terminator: DC6_TERMINATOR,
            directions,
            frames,
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let header = Self {
            version: read_u32(bytes, 0x00, "header")?,
            unknown1: read_u32(bytes, 0x04, "header")?,
            unknown_zero: read_u32(bytes, 0x08, "header")?,
            terminator: read_u32(bytes, 0x0C, "header")?,
            directions: read_u32(bytes, 0x10, "header")?,
            frames: read_u32(bytes, 0x14, "header")?,
        };
        if header.version != DC6_VERSION {
            return Err(AssetError::Format(format!(
                "dc6: file should start with {DC6_VERSION:08x} instead of {:08x}",
                header.version
            )));
        }
        Ok(header)
    }

    fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut out = [0; HEADER_LEN];
        let fields = [
            self.version,
            self.unknown1,
            self.unknown_zero,
            self.terminator,
            self.directions,
            self.frames,
        ];
        for (dst, v) in out.chunks_exact_mut(4).zip(fields) {
            dst.copy_from_slice(&v.to_le_bytes());
        }
        out
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameHeader {
    pub flip: u32,
    pub width: u32,
    pub height: u32,
    pub origin_x: i32,
    pub origin_y: i32,
    pub unknown: u32,
    /// Absolute offset right after this frame's terminator.
    pub next_block: u32,
    /// Payload length, terminator excluded.
    pub length: u32,
}

impl FrameHeader {
    pub fn parse(bytes: &[u8], at: usize) -> Result<Self> {
        Ok(Self {
            flip: read_u32(bytes, at, "frame header")?,
            width: read_u32(bytes, at + 0x04, "frame header")?,
            height: read_u32(bytes, at + 0x08, "frame header")?,
            origin_x: read_i32(bytes, at + 0x0C, "frame header")?,
            origin_y: read_i32(bytes, at + 0x10, "frame header")?,
            unknown: read_u32(bytes, at + 0x14, "frame header")?,
            next_block: read_u32(bytes, at + 0x18, "frame header")?,
            length: read_u32(bytes, at + 0x1C, "frame header")?,
        })
    }

    fn to_bytes(self) -> [u8; FRAME_HEADER_LEN] {
        let mut out = [0; FRAME_HEADER_LEN];
        let fields = [
            self.flip,
            self.width,
            self.height,
            self.origin_x as u32,
            self.origin_y as u32,
            self.unknown,
            self.next_block,
            self.length,
        ];
        for (dst, v) in out.chunks_exact_mut(4).zip(fields) {
            dst.copy_from_slice(&v.to_le_bytes());
        }
        out
    }
}

/// One image of a sprite plus the per-frame header fields that survive a round trip.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub image: Bitmap,
    pub flip: u32,
    pub origin_x: i32,
    pub origin_y: i32,
}

impl Frame {
    pub fn new(image: Bitmap) -> Self {
        Self {
            image,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sprite {
    // rows are directions, columns are frames
    frames: PixelBuffer<Frame>,
}

impl Sprite {
    pub fn new(directions: usize, frames: usize) -> Self {
        Self {
            frames: PixelBuffer::new(frames, directions),
        }
    }

    pub fn directions(&self) -> usize {
        self.frames.height()
    }

    pub fn frames_per_direction(&self) -> usize {
        self.frames.width()
    }

    pub fn frame(&self, direction: usize, frame: usize) -> Option<&Frame> {
        self.frames.get(frame, direction)
    }

    pub fn frame_mut(&mut self, direction: usize, frame: usize) -> Option<&mut Frame> {
        self.frames.get_mut(frame, direction)
    }

    /// Moves the image out of a frame, leaving an empty bitmap behind.
    pub fn take_image(&mut self, direction: usize, frame: usize) -> Option<Bitmap> {
        self.frame_mut(direction, frame)
            .map(|f| std::mem::take(&mut f.image))
    }

    /// Frames in file order (direction-major), with their `(direction, frame)` index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &Frame)> {
        let per_dir = self.frames_per_direction();
        self.frames
            .iter()
            .enumerate()
            .map(move |(i, f)| (i / per_dir, i % per_dir, f))
    }

    pub fn load(path: impl AsRef<Path>, palette: &Palette, transparency: Transparency) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes, palette, transparency)
    }

    pub fn save(&self, path: impl AsRef<Path>, palette: &Palette, transparency: Transparency) -> Result<()> {
        let bytes = self.to_bytes(palette, transparency)?;
        fs::write(path, bytes)?;
        Ok(())
    }

    pub fn from_bytes(bytes: &[u8], palette: &Palette, transparency: Transparency) -> Result<Self> {
        let header = Dc6Header::parse(bytes)?;
        let directions = header.directions as usize;
        let per_dir = header.frames as usize;
        let count = directions
            .checked_mul(per_dir)
            .filter(|n| n.checked_mul(4).is_some_and(|len| HEADER_LEN + len <= bytes.len()))
            .ok_or_else(|| {
                AssetError::Format(format!(
                    "dc6: offset table for {directions}x{per_dir} frames exceeds the file"
                ))
            })?;
        let mut sprite = Sprite::new(directions, per_dir);
        for i in 0..count {
            let offset = read_u32(bytes, HEADER_LEN + i * 4, "offset table")? as usize;
            let header = FrameHeader::parse(bytes, offset)?;
            let start = offset + FRAME_HEADER_LEN;
            let payload = bytes
                .get(start..start + header.length as usize)
                .ok_or_else(|| {
                    AssetError::Format(format!(
                        "dc6: payload of frame {i} ({} bytes at {start}) exceeds the file",
                        header.length
                    ))
                })?;
            let image = decode_frame(
                payload,
                header.width as usize,
                header.height as usize,
                palette,
                transparency,
            )?;
            sprite.frames[(i % per_dir, i / per_dir)] = Frame {
                image,
                flip: header.flip,
                origin_x: header.origin_x,
                origin_y: header.origin_y,
            };
        }
        Ok(sprite)
    }

    pub fn to_bytes(&self, palette: &Palette, transparency: Transparency) -> Result<Vec<u8>> {
        let directions = narrow(self.directions(), || {
            format!("too many directions ({})", self.directions())
        })?;
        let per_dir = narrow(self.frames_per_direction(), || {
            format!("too many frames ({})", self.frames_per_direction())
        })?;
        let mut out = Vec::new();
        out.extend(Dc6Header::new(directions, per_dir).to_bytes());
        let table_at = out.len();
        out.resize(table_at + self.frames.len() * 4, 0);

        let mut encoder = PaletteEncoder::new(palette);
        let mut offsets = Vec::with_capacity(self.frames.len());
        for frame in self.frames.iter() {
            let start = out.len();
            offsets.push(narrow::<u32, _>(start, || {
                format!("the resulting dc6 file is too large ({start} bytes)")
            })?);
            out.resize(start + FRAME_HEADER_LEN, 0);
            let payload_at = out.len();
            encode_frame(&frame.image, &mut encoder, transparency, &mut out);
            let end = out.len();
            let header = FrameHeader {
                flip: frame.flip,
                width: narrow(frame.image.width(), || {
                    format!("frame too wide ({})", frame.image.width())
                })?,
                height: narrow(frame.image.height(), || {
                    format!("frame too tall ({})", frame.image.height())
                })?,
                origin_x: frame.origin_x,
                origin_y: frame.origin_y,
                unknown: 0,
                next_block: narrow(end, || {
                    format!("the resulting dc6 file is too large ({end} bytes)")
                })?,
                length: narrow(end - payload_at - FRAME_TERMINATOR.len(), || {
                    "frame payload too large".to_string()
                })?,
            };
            out[start..payload_at].copy_from_slice(&header.to_bytes());
        }
        for (i, offset) in offsets.iter().enumerate() {
            let at = table_at + i * 4;
            out[at..at + 4].copy_from_slice(&offset.to_le_bytes());
        }
        Ok(out)
    }
}

/// Decodes one frame payload (terminator excluded). Rows are stored bottom-up.
pub fn decode_frame(
    payload: &[u8],
    width: usize,
    height: usize,
    palette: &Palette,
    transparency: Transparency,
) -> Result<Bitmap> {
    let mut image = Bitmap::try_filled(width, height, transparency.background())
        .map_err(|_| AssetError::Format(format!("dc6: frame size {width}x{height} is too large")))?;
    let mut x = 0usize;
    let mut y = height as isize - 1;
    let mut bytes = payload.iter().copied();
    while let Some(b) = bytes.next() {
        if b == END_OF_LINE {
            x = 0;
            y -= 1;
        } else if b & TRANSPARENT_FLAG != 0 {
            x += (b & !TRANSPARENT_FLAG) as usize;
        } else {
            for _ in 0..b {
                let index = bytes.next().ok_or_else(|| {
                    AssetError::Format("dc6: color run overruns the frame payload".into())
                })?;
                let pixel = usize::try_from(y)
                    .ok()
                    .and_then(|row| image.get_mut(x, row))
                    .ok_or_else(|| AssetError::Format(format!("dc6: invalid position ({x},{y})")))?;
                *pixel = palette[index];
                x += 1;
            }
        }
    }
    Ok(image)
}

/// Appends the RLE payload of `image` followed by the frame terminator.
pub fn encode_frame(
    image: &Bitmap,
    encoder: &mut PaletteEncoder<'_>,
    transparency: Transparency,
    out: &mut Vec<u8>,
) {
    if !image.is_empty() {
        let width = image.width();
        for y in (0..image.height()).rev() {
            let row = image.row(y);
            let mut x = 0;
            loop {
                let clear = row[x..]
                    .iter()
                    .take_while(|p| transparency.is_transparent(**p))
                    .count();
                if x + clear == width {
                    out.push(END_OF_LINE);
                    break;
                }
                let mut n = clear;
                while n > 0 {
                    let chunk = n.min(MAX_RUN);
                    out.push(chunk as u8 | TRANSPARENT_FLAG);
                    n -= chunk;
                }
                x += clear;

                let solid = row[x..]
                    .iter()
                    .take_while(|p| !transparency.is_transparent(**p))
                    .count();
                for chunk in row[x..x + solid].chunks(MAX_RUN) {
                    out.push(chunk.len() as u8);
                    out.extend(chunk.iter().map(|p| encoder.encode(*p)));
                }
                x += solid;
            }
        }
    }
    out.extend(FRAME_TERMINATOR);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::Pixel;

    #[test]
    fn decode_runs_bottom_up() {
        let pal = Palette::grayscale();
        // bottom row: skip 1, paint 1; top row: paint 2
        let payload = [0x81, 0x01, 9, END_OF_LINE, 0x02, 5, 6, END_OF_LINE];
        let bmp = decode_frame(&payload, 2, 2, &pal, Transparency::ColorKey(0)).unwrap();
        assert_eq!(bmp[(0, 1)], Pixel::gray(0));
        assert_eq!(bmp[(1, 1)], Pixel::gray(9));
        assert_eq!(bmp[(0, 0)], Pixel::gray(5));
        assert_eq!(bmp[(1, 0)], Pixel::gray(6));
    }

    #[test]
    fn decode_prefills_alpha_background() {
        let pal = Palette::grayscale();
        let bmp = decode_frame(&[END_OF_LINE], 2, 1, &pal, Transparency::Alpha).unwrap();
        assert!(bmp.iter().all(|p| *p == Pixel::TRANSPARENT));
    }

    #[test]
    fn decode_rejects_out_of_bounds() {
        let pal = Palette::grayscale();
        let wide = decode_frame(&[0x03, 1, 2, 3], 2, 1, &pal, Transparency::Alpha);
        assert!(matches!(wide, Err(AssetError::Format(_))));
        let tall = decode_frame(&[END_OF_LINE, 0x01, 1], 1, 1, &pal, Transparency::Alpha);
        assert!(matches!(tall, Err(AssetError::Format(_))));
        let short = decode_frame(&[0x02, 1], 2, 1, &pal, Transparency::Alpha);
        assert!(matches!(short, Err(AssetError::Format(_))));
    }

    #[test]
    fn encode_empty_frame_is_terminator_only() {
        let pal = Palette::grayscale();
        let mut enc = PaletteEncoder::new(&pal);
        let mut out = Vec::new();
        encode_frame(&Bitmap::new(0, 0), &mut enc, Transparency::Alpha, &mut out);
        assert_eq!(out, FRAME_TERMINATOR);
    }

    #[test]
    fn encode_splits_long_transparent_runs() {
        let pal = Palette::grayscale();
        let mut enc = PaletteEncoder::new(&pal);
        let mut bmp = Bitmap::new(200, 1);
        bmp[(199, 0)] = Pixel::gray(1);
        let mut out = Vec::new();
        encode_frame(&bmp, &mut enc, Transparency::ColorKey(0), &mut out);
        assert_eq!(out, [0xFF, 0x80 | 72, 0x01, 1, END_OF_LINE, 0xEE, 0xEE, 0xEE]);
    }
}
