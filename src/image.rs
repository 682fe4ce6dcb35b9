// Copyright 2025 Dustin McAfee
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Indexed-color image input.
//!
//! The pipeline consumes PNG images in indexed-color mode. Pixel values are
//! palette indices; index `4k` is transparent and `4k + n` (n in 1..=3)
//! selects color `n` of palette group `k`. The first 4 groups belong to the
//! background layer, the next 4 to sprites.

use crate::error::Result;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Full padded palette length: 256 RGB triples.
const PALETTE_BYTES: usize = 768;

/// An image whose pixels are 8-bit palette indices.
#[derive(Debug, Clone)]
pub struct IndexedImage {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
    palette: Vec<u8>,
}

impl IndexedImage {
    /// Builds an image from raw parts. The palette is zero-padded to 768
    /// bytes (256 RGB triples).
    ///
    /// # Panics
    ///
    /// Panics if `pixels.len() != width * height`.
    #[must_use]
    pub fn from_parts(width: usize, height: usize, pixels: Vec<u8>, mut palette: Vec<u8>) -> Self {
        assert_eq!(pixels.len(), width * height);
        palette.resize(PALETTE_BYTES, 0);
        IndexedImage {
            width,
            height,
            pixels,
            palette,
        }
    }

    /// Loads an indexed-color PNG.
    ///
    /// A non-indexed image is logged as an error and converted best-effort
    /// from the first channel of each pixel; the resulting artifacts may be
    /// incorrect.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the PNG stream is
    /// malformed.
    pub fn open(path: &Path) -> Result<Self> {
        let decoder = png::Decoder::new(BufReader::new(File::open(path)?));
        let mut reader = decoder.read_info()?;
        let mut buf = vec![0u8; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf)?;
        buf.truncate(info.buffer_size());

        let width = info.width as usize;
        let height = info.height as usize;
        let palette = reader
            .info()
            .palette
            .as_ref()
            .map(|p| p.to_vec())
            .unwrap_or_default();

        let pixels = match info.color_type {
            png::ColorType::Indexed => {
                unpack_indices(&buf, width, height, info.bit_depth, info.line_size)
            }
            other => {
                log::error!("image {} is not an indexed-color image.", path.display());
                match other {
                    png::ColorType::Grayscale => {
                        unpack_indices(&buf, width, height, info.bit_depth, info.line_size)
                    }
                    _ => first_channel(&buf, width, height, other, info.bit_depth, info.line_size),
                }
            }
        };

        Ok(IndexedImage::from_parts(width, height, pixels, palette))
    }

    /// Image width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Palette index at `(x, y)`.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }

    /// Image palette as 768 zero-padded RGB bytes.
    #[must_use]
    pub fn palette(&self) -> &[u8] {
        &self.palette
    }
}

/// Unpacks sub-byte palette indices to one byte per pixel. Packed rows are
/// MSB-first and padded to a whole byte.
fn unpack_indices(
    buf: &[u8],
    width: usize,
    height: usize,
    bit_depth: png::BitDepth,
    line_size: usize,
) -> Vec<u8> {
    let bits = match bit_depth {
        png::BitDepth::One => 1,
        png::BitDepth::Two => 2,
        png::BitDepth::Four => 4,
        _ => 8,
    };
    if bits == 8 {
        return buf.to_vec();
    }
    let mask = (1u16 << bits) as u8 - 1;
    let per_byte = 8 / bits;
    let mut pixels = Vec::with_capacity(width * height);
    for y in 0..height {
        let row = &buf[y * line_size..(y + 1) * line_size];
        for x in 0..width {
            let byte = row[x / per_byte];
            let shift = 8 - bits * (x % per_byte + 1);
            pixels.push((byte >> shift) & mask);
        }
    }
    pixels
}

/// Fallback for non-indexed inputs: takes the first channel byte of each
/// pixel as its index.
fn first_channel(
    buf: &[u8],
    width: usize,
    height: usize,
    color_type: png::ColorType,
    bit_depth: png::BitDepth,
    line_size: usize,
) -> Vec<u8> {
    let samples = match color_type {
        png::ColorType::Rgb => 3,
        png::ColorType::Rgba => 4,
        png::ColorType::GrayscaleAlpha => 2,
        _ => 1,
    };
    let sample_bytes = if bit_depth == png::BitDepth::Sixteen { 2 } else { 1 };
    let stride = samples * sample_bytes;
    let mut pixels = Vec::with_capacity(width * height);
    for y in 0..height {
        let row = &buf[y * line_size..];
        for x in 0..width {
            pixels.push(row[x * stride]);
        }
    }
    pixels
}
