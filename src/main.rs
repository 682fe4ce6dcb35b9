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

//! Command-line driver for the ppupack image converter.

use clap::{Parser, ValueEnum};
use ppupack::output;
use ppupack::palette::{self, PPU_PALETTE_FILE_BYTES};
use ppupack::{IndexedImage, Result, ScreenBuilder};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SpriteSize {
    #[value(name = "8x8")]
    Size8x8,
    #[value(name = "8x16")]
    Size8x16,
}

/// Convert indexed-color images into NES PPU data files.
#[derive(Parser, Debug)]
#[command(name = "ppupack", version, about = "Convert indexed-color images into NES PPU data files")]
struct Args {
    /// Input images to convert
    #[arg(long = "input", required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Output directory
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Background palette directly specified as 16 hex values representing
    /// NES PPU colors
    #[arg(long = "bg_pal", num_args = 16)]
    bg_pal: Option<Vec<String>>,

    /// Sprite palette directly specified as 16 hex values representing
    /// NES PPU colors
    #[arg(long = "spr_pal", num_args = 16)]
    spr_pal: Option<Vec<String>>,

    /// Sprite size
    #[arg(long = "sprite_size", value_enum, default_value = "8x16")]
    sprite_size: SpriteSize,

    /// If 1, adds sprite + tile pixels to ensure a sprite#0 hit will
    /// happen when displaying the image
    #[arg(long, default_value_t = 1)]
    sprite0: u8,

    /// PRG bank assumed by generated code
    #[arg(long, default_value_t = 0)]
    prgbank: u8,

    /// Binary 192-byte file specifying a particular NES palette. PPU
    /// colors will be created by color mapping
    #[arg(long = "palette_file")]
    palette_file: Option<PathBuf>,

    /// Maximum number of background tiles per pattern table
    #[arg(long = "max_bg_slots", default_value_t = 256)]
    max_bg_slots: usize,

    /// Path to the Tokumaru CHR compressor executable
    #[arg(long)]
    tokumaru: Option<PathBuf>,

    /// Prefix directory path to prepend to files included in source. Must
    /// include the trailing separator. Needed with ASM6 to use the source
    /// directory instead of the CWD; redundant with CA65
    #[arg(long = "prefix_dir", default_value = "")]
    prefix_dir: String,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Resolves the master palette file, falling back to the default next to
/// the executable when unspecified or missing.
fn resolve_palette_file(requested: Option<&Path>) -> PathBuf {
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let fallback = exe_dir.join("nespalettes").join("default.pal");
    match requested {
        None => {
            log::warn!(
                "Palette file not specified - falling back to default palette file {}",
                fallback.display()
            );
            fallback
        }
        Some(path) if !path.exists() => {
            log::error!(
                "Palette file {} does not exist - falling back to default palette file {}",
                path.display(),
                fallback.display()
            );
            fallback
        }
        Some(path) => path.to_path_buf(),
    }
}

fn run(args: &Args) -> Result<()> {
    let sprites_8x16 = args.sprite_size == SpriteSize::Size8x16;
    let add_sprite0 = args.sprite0 != 0;
    let tokumaru = args
        .tokumaru
        .clone()
        .unwrap_or_else(output::default_tokumaru_path);

    // Directly specified palettes bypass the master palette mapping.
    let direct_palettes = match (&args.bg_pal, &args.spr_pal) {
        (Some(bg), Some(spr)) => Some((
            palette::parse_hex_palette(bg)?,
            palette::parse_hex_palette(spr)?,
        )),
        _ => None,
    };
    let master_palette = if direct_palettes.is_none() {
        let path = resolve_palette_file(args.palette_file.as_deref());
        let mut data = fs::read(&path)?;
        data.truncate(PPU_PALETTE_FILE_BYTES);
        Some(data)
    } else {
        None
    };

    let mut builders = Vec::with_capacity(args.input.len());
    for (i, input) in args.input.iter().enumerate() {
        let image = IndexedImage::open(input)?;
        log::info!("Converting image {}", input.display());

        let (bg_palette, spr_palette) = match (&direct_palettes, &master_palette) {
            (Some((bg, spr)), _) => (bg.clone(), spr.clone()),
            (None, Some(master)) => palette::map_palette_to_ppu_colors(image.palette(), master),
            (None, None) => (Vec::new(), Vec::new()),
        };

        let builder = ScreenBuilder::build(&image, sprites_8x16, add_sprite0, args.max_bg_slots);
        output::write_screen_files(&builder, &bg_palette, &spr_palette, i, &args.output)?;
        output::compress_chr_files(&builder, i, &args.output, &tokumaru)?;
        builders.push(builder);
    }

    output::write_constants(&args.output, builders.len(), sprites_8x16, args.prgbank)?;
    output::write_includes(&builders, &args.output, &args.prefix_dir)?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Error
    };
    env_logger::Builder::new().filter_level(level).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
