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

//! PPU color mapping.
//!
//! Maps an image's RGB palette onto the 64-entry PPU master palette by
//! closest color (squared Euclidean distance) and parses directly
//! specified palettes given as hex bytes.

use crate::error::{PpuPackError, Result};

/// Number of entries in the PPU master palette.
pub const PPU_PALETTE_ENTRIES: usize = 64;

/// Size of a PPU master palette file: 64 RGB triples.
pub const PPU_PALETTE_FILE_BYTES: usize = 192;

/// Entries in one hardware palette (background or sprite).
pub const HARDWARE_PALETTE_ENTRIES: usize = 16;

/// PPU color `$0D` produces a "blacker than black" sync-level voltage
/// and must never be selected by the mapper.
const FORBIDDEN_PPU_COLOR: usize = 0x0D;

/// Returns the index of the PPU palette entry closest to `rgb`.
fn closest_ppu_entry(rgb: [i64; 3], ppu_rgb: &[[i64; 3]]) -> u8 {
    let mut best = 0usize;
    let mut best_dist = i64::MAX;
    for (i, entry) in ppu_rgb.iter().enumerate() {
        let dist: i64 = (0..3).map(|c| (rgb[c] - entry[c]).pow(2)).sum();
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best as u8
}

fn to_triplets(data: &[u8]) -> Vec<[i64; 3]> {
    data.chunks_exact(3)
        .map(|t| [i64::from(t[0]), i64::from(t[1]), i64::from(t[2])])
        .collect()
}

/// Maps the first 32 entries of an image palette to PPU color codes.
///
/// Returns the 16 background and 16 sprite PPU colors. The image palette
/// is expected zero-padded, so short palettes map their tail to the entry
/// closest to black.
#[must_use]
pub fn map_palette_to_ppu_colors(image_palette: &[u8], ppu_palette: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut ppu_rgb = to_triplets(&ppu_palette[..PPU_PALETTE_FILE_BYTES.min(ppu_palette.len())]);
    ppu_rgb.resize(PPU_PALETTE_ENTRIES, [0, 0, 0]);
    // Push $0D out of reach of any real color.
    ppu_rgb[FORBIDDEN_PPU_COLOR] = [1_000_000, 1_000_000, 1_000_000];

    let image_rgb = to_triplets(image_palette);
    let mapped: Vec<u8> = image_rgb
        .iter()
        .take(2 * HARDWARE_PALETTE_ENTRIES)
        .map(|&rgb| closest_ppu_entry(rgb, &ppu_rgb))
        .collect();

    let bg = mapped[..HARDWARE_PALETTE_ENTRIES.min(mapped.len())].to_vec();
    let spr = mapped[HARDWARE_PALETTE_ENTRIES.min(mapped.len())..].to_vec();
    (bg, spr)
}

/// Parses a directly specified palette: 16 hex byte values.
///
/// # Errors
///
/// Returns an error when the count is not 16 or a value does not parse as
/// a hex byte.
pub fn parse_hex_palette(values: &[String]) -> Result<Vec<u8>> {
    if values.len() != HARDWARE_PALETTE_ENTRIES {
        return Err(PpuPackError::InvalidPalette(format!(
            "expected {} hex values, got {}",
            HARDWARE_PALETTE_ENTRIES,
            values.len()
        )));
    }
    values
        .iter()
        .map(|v| {
            u8::from_str_radix(v.trim_start_matches('$'), 16)
                .map_err(|_| PpuPackError::InvalidPalette(format!("bad hex value {v:?}")))
        })
        .collect()
}
