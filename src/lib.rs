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


//! # ppupack
//!
//! An offline asset pipeline that converts indexed-color images into the
//! binary files the NES picture-processing unit consumes.
//!
//! From one 256x240 indexed PNG the pipeline produces:
//!
//! - **Pattern tables**: deduplicated 8x8 (or 8x16 sprite) tile bitmaps,
//!   with the background split into two CHR banks switched mid-frame when
//!   one bank does not suffice
//! - **Nametable**: the tile-index grid plus its packed attribute table
//! - **Compressed nametable**: a nibble-packed RLEI stream tuned for
//!   constant runs and linearly increasing tile indices
//! - **OAM**: the sprite table, raw and in a compact per-palette format
//! - **Palettes**: 32 PPU color bytes mapped by closest RGB distance
//!
//! ## Quick Start
//!
//! ```no_run
//! use ppupack::{IndexedImage, ScreenBuilder};
//! use std::path::Path;
//!
//! fn main() -> ppupack::Result<()> {
//!     let image = IndexedImage::open(Path::new("title.png"))?;
//!     let builder = ScreenBuilder::build(&image, true, true, 256);
//!     ppupack::output::write_screen_files(&builder, &[0x0F; 16], &[], 0, Path::new("out"))?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! IndexedImage ──► ScreenBuilder ──► output / encoding
//!                    │
//!                    ├─ background grid + tile tables (bank split)
//!                    ├─ sprite list + sprite tile table (merge pass)
//!                    └─ nametable / attribute serializers
//! ```
//!
//! The RLEI codec is pure: blocks thread their increment base explicitly,
//! so independently compressed segments decode correctly in sequence.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod image;
pub mod palette;
pub mod tiles;
pub mod screen;
pub mod encoding;
pub mod output;

// Re-exports
pub use error::{PpuPackError, Result};
pub use image::IndexedImage;
pub use screen::{ScreenBuilder, Sprite};
pub use tiles::{TileBitmap, TileTable};
