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

//! Artifact emission.
//!
//! Writes the per-image binary files, runs the external Tokumaru tile
//! compressor over the finished CHR blobs, and generates the assembly
//! include files that reference the produced binaries.

use crate::encoding;
use crate::error::Result;
use crate::palette::HARDWARE_PALETTE_ENTRIES;
use crate::screen::ScreenBuilder;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Prefix for generated assembly constants.
const PREFIX_CONSTANT: &str = "PPUPACK_";
/// Prefix for generated assembly data labels.
const PREFIX_DATA: &str = "PackData_";

/// Where the Tokumaru tile compressor can be obtained.
/// See: <https://wiki.nesdev.com/w/index.php/Tile_compression#Tokumaru>
const TOKUMARU_URL: &str = "http://membler-industries.com/tokumaru/tokumaru_tile_compression.7z";

/// Default location of the Tokumaru compressor, next to this executable.
#[must_use]
pub fn default_tokumaru_path() -> PathBuf {
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    exe_dir
        .join("tokumaru_tile_compression")
        .join("bin")
        .join("compress.exe")
}

/// Writes every binary artifact for one built image.
///
/// When `spr_palette` is empty it is filled with 16 copies of the first
/// background color.
///
/// # Errors
///
/// Returns an error when the output directory or a file cannot be
/// written.
pub fn write_screen_files(
    builder: &ScreenBuilder,
    bg_palette: &[u8],
    spr_palette: &[u8],
    index: usize,
    out_dir: &Path,
) -> Result<()> {
    fs::create_dir_all(out_dir)?;

    fs::write(out_dir.join(format!("bg_{index}.chr")), builder.chr_bg())?;
    fs::write(out_dir.join(format!("bg_top_{index}.chr")), builder.chr_bg_top())?;
    fs::write(
        out_dir.join(format!("bg_bottom_{index}.chr")),
        builder.chr_bg_bottom(),
    )?;
    fs::write(
        out_dir.join(format!("bg_bottom_nc_{index}.chr")),
        builder.chr_bg_bottom_no_common(),
    )?;
    fs::write(out_dir.join(format!("spr_{index}.chr")), builder.chr_spr())?;

    let nametable = builder.nametable();
    fs::write(out_dir.join(format!("nametable_{index}.nam")), &nametable)?;
    let compressed = encoding::compress_nametable(
        &nametable,
        builder.bottom_start_row(),
        builder.num_common_tiles(),
    );
    fs::write(
        out_dir.join(format!("nametable_compressed_{index}.bin")),
        compressed,
    )?;

    fs::write(
        out_dir.join(format!("oam_{index}.bin")),
        encoding::oam(builder.sprites()),
    )?;
    fs::write(
        out_dir.join(format!("oam_compressed_{index}.bin")),
        encoding::compress_oam(builder.sprites()),
    )?;

    let mut palettes = Vec::with_capacity(2 * HARDWARE_PALETTE_ENTRIES);
    palettes.extend_from_slice(bg_palette);
    if spr_palette.is_empty() {
        let fill = bg_palette.first().copied().unwrap_or(0);
        palettes.extend(std::iter::repeat(fill).take(HARDWARE_PALETTE_ENTRIES));
    } else {
        palettes.extend_from_slice(spr_palette);
    }
    fs::write(out_dir.join(format!("palettes_{index}.bin")), palettes)?;

    Ok(())
}

/// Runs the Tokumaru compressor over one CHR file.
///
/// A missing binary is logged and skipped; a zero-sized input skips the
/// subprocess and touches an empty output file for consistency. The exit
/// status is observed but not propagated.
fn tokumaru_compress(exe: &Path, input: &Path, output: &Path) -> Result<()> {
    if !exe.exists() {
        log::error!("{} is missing! - download from {}", exe.display(), TOKUMARU_URL);
        return Ok(());
    }
    if fs::metadata(input)?.len() == 0 {
        fs::write(output, [])?;
        return Ok(());
    }
    if let Err(e) = Command::new(exe).arg(input).arg(output).output() {
        log::error!("Tokumaru compression of {} failed: {e}", input.display());
    }
    Ok(())
}

/// Compresses the CHR files the runtime loads (top bank, bottom bank
/// without common tiles, sprites) and logs the space saving.
///
/// # Errors
///
/// Returns an error when an input CHR file cannot be inspected.
pub fn compress_chr_files(
    builder: &ScreenBuilder,
    index: usize,
    out_dir: &Path,
    tokumaru: &Path,
) -> Result<()> {
    for stem in ["bg_top", "bg_bottom_nc", "spr"] {
        tokumaru_compress(
            tokumaru,
            &out_dir.join(format!("{stem}_{index}.chr")),
            &out_dir.join(format!("{stem}_{index}.tc")),
        )?;
    }

    let size = |name: String| {
        fs::metadata(out_dir.join(name))
            .map(|m| m.len())
            .unwrap_or(0)
    };
    let has_bottom = !builder.tile_table_bg_bottom().is_empty();
    let uncompressed = size(format!("bg_top_{index}.chr"))
        + if has_bottom { size(format!("bg_bottom_nc_{index}.chr")) } else { 0 }
        + size(format!("spr_{index}.chr"));
    let compressed = size(format!("bg_top_{index}.tc"))
        + if has_bottom { size(format!("bg_bottom_nc_{index}.tc")) } else { 0 }
        + size(format!("spr_{index}.tc"));
    if uncompressed > 0 && compressed > 0 {
        let ratio = compressed as f64 / uncompressed as f64;
        log::info!("CHR size % of original: {:.2}%", 100.0 * ratio);
        log::info!("CHR space saving %: {:.2}%", 100.0 * (1.0 - ratio));
    }
    Ok(())
}

/// Assembly source for separate lo / hi pointer-byte tables.
fn hi_and_lo_bytes(name: &str, count: usize) -> String {
    let lo: Vec<String> = (0..count).map(|i| format!("<{name}_{i}")).collect();
    let hi: Vec<String> = (0..count).map(|i| format!(">{name}_{i}")).collect();
    format!(
        "{name}_lo: .byte {}\n{name}_hi: .byte {}",
        lo.join(","),
        hi.join(",")
    )
}

/// Assembly source for a byte table of one value per builder.
fn builder_bytes(name: &str, values: impl Iterator<Item = usize>) -> String {
    let values: Vec<String> = values.map(|v| v.to_string()).collect();
    format!("{name}: .byte {}", values.join(","))
}

/// Writes `constants.inc`.
///
/// # Errors
///
/// Returns an error when the file cannot be written.
pub fn write_constants(
    out_dir: &Path,
    num_pictures: usize,
    sprites_8x16: bool,
    prg_bank: u8,
) -> Result<()> {
    let ppu_ctrl_bitmask: u8 = if sprites_8x16 { 0x20 } else { 0x00 };
    let mut lines = Vec::new();
    lines.push(format!("{PREFIX_CONSTANT}NUM_PICTURES = {num_pictures}"));
    lines.push(format!(
        "{PREFIX_CONSTANT}8x16_PPUCTRL_BITMASK = ${ppu_ctrl_bitmask:02X}"
    ));
    lines.push(format!("{PREFIX_CONSTANT}CHR_BANK_TOP = 1"));
    lines.push(format!("{PREFIX_CONSTANT}CHR_BANK_BOTTOM = 2"));
    lines.push(format!("{PREFIX_CONSTANT}PRG_BANK = {prg_bank}"));
    lines.push(String::new());
    fs::write(out_dir.join("constants.inc"), lines.join("\n"))?;
    Ok(())
}

/// Writes `includes.inc`: `.incbin` lines for the per-image artifacts,
/// lo/hi pointer tables, and the per-image byte tables the runtime needs.
///
/// # Errors
///
/// Returns an error when the file cannot be written.
pub fn write_includes(
    builders: &[ScreenBuilder],
    out_dir: &Path,
    prefix_dir: &str,
) -> Result<()> {
    let n = builders.len();
    let mut lines = Vec::new();

    for i in 0..n {
        lines.push(format!(
            "{PREFIX_DATA}BackgroundCHR_top_{i}: .incbin \"{prefix_dir}bg_top_{i}.tc\""
        ));
        lines.push(format!(
            "{PREFIX_DATA}BackgroundCHR_bottom_{i}: .incbin \"{prefix_dir}bg_bottom_nc_{i}.tc\""
        ));
        lines.push(format!(
            "{PREFIX_DATA}SpriteCHR_{i}: .incbin \"{prefix_dir}spr_{i}.tc\""
        ));
        lines.push(format!(
            "{PREFIX_DATA}NameTable_compressed_{i}: .incbin \"{prefix_dir}nametable_compressed_{i}.bin\""
        ));
        lines.push(format!(
            "{PREFIX_DATA}OAM_compressed_{i}: .incbin \"{prefix_dir}oam_compressed_{i}.bin\""
        ));
        lines.push(format!(
            "{PREFIX_DATA}Palettes_{i}: .incbin \"{prefix_dir}palettes_{i}.bin\""
        ));
    }

    for name in [
        "BackgroundCHR_top",
        "BackgroundCHR_bottom",
        "SpriteCHR",
        "NameTable_compressed",
        "OAM_compressed",
        "Palettes",
    ] {
        lines.push(hi_and_lo_bytes(&format!("{PREFIX_DATA}{name}"), n));
    }

    lines.push(builder_bytes(
        &format!("{PREFIX_DATA}NumBackgroundTilesTop"),
        builders.iter().map(|b| b.tile_table_bg_top().len()),
    ));
    lines.push(builder_bytes(
        &format!("{PREFIX_DATA}NumBackgroundTilesBottom"),
        builders.iter().map(|b| b.tile_table_bg_bottom().len()),
    ));
    lines.push(builder_bytes(
        &format!("{PREFIX_DATA}NumBackgroundTilesCommon"),
        builders.iter().map(ScreenBuilder::num_common_tiles),
    ));
    lines.push(builder_bytes(
        &format!("{PREFIX_DATA}NumSpriteTiles"),
        builders.iter().map(|b| b.tile_table_spr().len()),
    ));
    lines.push(builder_bytes(
        &format!("{PREFIX_DATA}OamSize"),
        builders.iter().map(|b| 4 * b.sprites().len()),
    ));
    lines.push(builder_bytes(
        &format!("{PREFIX_DATA}NumSpriteTilePages"),
        builders.iter().map(|b| b.tile_table_spr().len().div_ceil(16)),
    ));
    lines.push(builder_bytes(
        &format!("{PREFIX_DATA}SpriteTilesStartIndex"),
        builders.iter().map(ScreenBuilder::sprite_tiles_start_index),
    ));
    lines.push(builder_bytes(
        &format!("{PREFIX_DATA}SpriteTilesStartPage"),
        builders.iter().map(ScreenBuilder::sprite_tiles_start_page),
    ));
    lines.push(builder_bytes(
        &format!("{PREFIX_DATA}NumCommonBackgroundTilePages"),
        builders.iter().map(|b| b.num_common_tiles().div_ceil(16)),
    ));
    lines.push(builder_bytes(
        &format!("{PREFIX_DATA}BottomStartScanlineMinus1"),
        builders
            .iter()
            .map(|b| b.bottom_start_row().map_or(239, |row| row * 8 - 1)),
    ));
    lines.push(builder_bytes(
        &format!("{PREFIX_DATA}NameTableEncodingBits"),
        builders
            .iter()
            .map(|b| b.bottom_start_row().unwrap_or(b.grid_height())),
    ));

    lines.push(format!(".include \"{prefix_dir}constants.inc\""));
    lines.push(String::new());
    fs::write(out_dir.join("includes.inc"), lines.join("\n"))?;
    Ok(())
}
