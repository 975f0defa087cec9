//! PNG image container for pixel blocks
//!
//! A pixel block is copied verbatim into a larger canvas at a fixed offset.
//! The first three canvas pixels hold a metadata header that locates the
//! block without scanning:
//!
//! ```text
//! pixel 0: R,G,B = "LXC"
//! pixel 1: R = width >> 8, G = width & 0xFF, B = height >> 8
//! pixel 2: R = height & 0xFF, G = 0, B = 0
//! ```
//!
//! The height is split across pixels 1 and 2. That layout is kept
//! byte-for-byte for compatibility with existing exports.
//!
//! Everything outside the header and the block (background, border) is
//! decoration and carries no data. The block copy never blends, and the
//! canvas is written as 8-bit RGBA PNG so every byte survives the trip.

use crate::error::{ArchiveError, FormatError, Result};
use crate::frame::{PixelBlock, CHANNELS};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

/// Tag in pixel 0 identifying a lexicon container
pub const METADATA_TAG: [u8; 3] = *b"LXC";

/// Pixels occupied by the metadata header
pub const HEADER_PIXELS: usize = 3;

/// Left and top offset of the pixel block inside the canvas
pub const BLOCK_OFFSET: u32 = 16;

/// Canvas margin on every side of the block
pub const MARGIN: u32 = BLOCK_OFFSET;

/// Cosmetic frame around the data block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Decoration {
    /// Canvas fill colour
    pub background: [u8; 3],

    /// Outline colour
    pub border: [u8; 3],

    /// Outline thickness in pixels, must stay inside the margin
    pub border_width: u32,
}

impl Default for Decoration {
    fn default() -> Self {
        Decoration {
            background: [0xF4, 0xEF, 0xE1],
            border: [0x3B, 0x2F, 0x5C],
            border_width: 4,
        }
    }
}

impl Decoration {
    /// Check the border leaves the block and header untouched
    pub fn validate(&self) -> Result<()> {
        if self.border_width >= MARGIN {
            return Err(ArchiveError::Config(format!(
                "border width {} must be less than the {} pixel margin",
                self.border_width, MARGIN
            )));
        }
        Ok(())
    }
}

/// Metadata header stored in the first three canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub block_width: u16,
    pub block_height: u16,
}

impl ContainerHeader {
    /// Header for a block, failing if it cannot be described in 16 bits
    pub fn for_block(block: &PixelBlock) -> Result<Self> {
        let block_width = u16::try_from(block.width)
            .map_err(|_| FormatError::PayloadTooLarge(block.capacity()))?;
        let block_height = u16::try_from(block.height)
            .map_err(|_| FormatError::PayloadTooLarge(block.capacity()))?;

        Ok(ContainerHeader {
            block_width,
            block_height,
        })
    }

    /// Serialize to three opaque RGBA pixels
    pub fn to_pixels(&self) -> [u8; HEADER_PIXELS * CHANNELS] {
        let [w_hi, w_lo] = self.block_width.to_be_bytes();
        let [h_hi, h_lo] = self.block_height.to_be_bytes();

        [
            METADATA_TAG[0],
            METADATA_TAG[1],
            METADATA_TAG[2],
            0xFF,
            w_hi,
            w_lo,
            h_hi,
            0xFF,
            h_lo,
            0,
            0,
            0xFF,
        ]
    }

    /// Parse from the start of an RGBA buffer
    pub fn from_pixels(pixels: &[u8]) -> Result<Self> {
        let header = pixels
            .get(..HEADER_PIXELS * CHANNELS)
            .ok_or(FormatError::MissingMetadataMarker)?;

        if header[..3] != METADATA_TAG {
            return Err(FormatError::MissingMetadataMarker.into());
        }

        Ok(ContainerHeader {
            block_width: u16::from_be_bytes([header[4], header[5]]),
            block_height: u16::from_be_bytes([header[6], header[8]]),
        })
    }
}

/// Decoded RGBA canvas
#[derive(Debug, Clone)]
struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * CHANNELS);
        for _ in 0..width as usize * height as usize {
            pixels.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 0xFF]);
        }
        Canvas {
            width,
            height,
            pixels,
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    fn set(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let at = self.offset(x, y);
        self.pixels[at..at + CHANNELS].copy_from_slice(&[rgb[0], rgb[1], rgb[2], 0xFF]);
    }

    fn draw_border(&mut self, width: u32, rgb: [u8; 3]) {
        for y in 0..self.height {
            for x in 0..self.width {
                let edge = x < width
                    || y < width
                    || x >= self.width.saturating_sub(width)
                    || y >= self.height.saturating_sub(width);
                if edge {
                    self.set(x, y, rgb);
                }
            }
        }
    }

    /// Copy the block row by row; a straight byte copy, no compositing
    fn blit(&mut self, block: &PixelBlock, x: u32, y: u32) {
        let row_len = block.width as usize * CHANNELS;
        for row in 0..block.height {
            let src = row as usize * row_len;
            let dst = self.offset(x, y + row);
            self.pixels[dst..dst + row_len].copy_from_slice(&block.pixels[src..src + row_len]);
        }
    }

    fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> PixelBlock {
        let row_len = width as usize * CHANNELS;
        let mut pixels = Vec::with_capacity(row_len * height as usize);
        for row in 0..height {
            let src = self.offset(x, y + row);
            pixels.extend_from_slice(&self.pixels[src..src + row_len]);
        }
        PixelBlock {
            width,
            height,
            pixels,
        }
    }

    fn to_png(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder
                .write_header()
                .map_err(|e| ArchiveError::Image(format!("PNG header write failed: {}", e)))?;
            writer
                .write_image_data(&self.pixels)
                .map_err(|e| ArchiveError::Image(format!("PNG data write failed: {}", e)))?;
            writer
                .finish()
                .map_err(|e| ArchiveError::Image(format!("PNG finish failed: {}", e)))?;
        }
        Ok(out)
    }

    fn from_png(bytes: &[u8]) -> Result<Self> {
        let mut decoder = png::Decoder::new(Cursor::new(bytes));
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder
            .read_info()
            .map_err(|e| FormatError::NotPng(e.to_string()))?;

        let mut buf = vec![0u8; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut buf)
            .map_err(|e| FormatError::NotPng(e.to_string()))?;
        buf.truncate(info.buffer_size());

        if info.bit_depth != png::BitDepth::Eight {
            return Err(FormatError::UnsupportedPixelFormat(format!(
                "{:?} bit depth",
                info.bit_depth
            ))
            .into());
        }

        let pixels = match info.color_type {
            png::ColorType::Rgba => buf,
            png::ColorType::Rgb => {
                let mut rgba = Vec::with_capacity(buf.len() / 3 * CHANNELS);
                for rgb in buf.chunks_exact(3) {
                    rgba.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 0xFF]);
                }
                rgba
            }
            other => {
                return Err(FormatError::UnsupportedPixelFormat(format!("{:?}", other)).into())
            }
        };

        Ok(Canvas {
            width: info.width,
            height: info.height,
            pixels,
        })
    }
}

/// Embed a pixel block in a decorated canvas and encode it as PNG
pub fn embed(block: &PixelBlock, decoration: &Decoration) -> Result<Vec<u8>> {
    decoration.validate()?;
    let header = ContainerHeader::for_block(block)?;

    let mut canvas = Canvas::filled(
        block.width + 2 * MARGIN,
        block.height + 2 * MARGIN,
        decoration.background,
    );
    canvas.draw_border(decoration.border_width, decoration.border);
    canvas.blit(block, BLOCK_OFFSET, BLOCK_OFFSET);
    canvas.pixels[..HEADER_PIXELS * CHANNELS].copy_from_slice(&header.to_pixels());

    debug!(
        "Embedding {}x{} block in {}x{} canvas",
        block.width, block.height, canvas.width, canvas.height
    );

    canvas.to_png()
}

/// Decode a container image and copy out the embedded pixel block
pub fn extract(image: &[u8]) -> Result<PixelBlock> {
    let canvas = Canvas::from_png(image)?;
    let header = ContainerHeader::from_pixels(&canvas.pixels)?;

    let block_width = header.block_width as u32;
    let block_height = header.block_height as u32;
    if BLOCK_OFFSET + block_width > canvas.width || BLOCK_OFFSET + block_height > canvas.height {
        return Err(FormatError::DimensionsOutOfBounds {
            block_width,
            block_height,
            canvas_width: canvas.width,
            canvas_height: canvas.height,
        }
        .into());
    }

    debug!(
        "Extracting {}x{} block from {}x{} canvas",
        block_width, block_height, canvas.width, canvas.height
    );

    Ok(canvas.crop(BLOCK_OFFSET, BLOCK_OFFSET, block_width, block_height))
}
