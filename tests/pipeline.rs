//! End-to-end tests: synthetic indexed images through the screen builder
//! and the emitted encodings.

mod common;

use common::decode_nametable_blocks;
use ppupack::encoding::{compress_nametable, compress_oam, oam};
use ppupack::{IndexedImage, ScreenBuilder};

/// 256x240 image colored per pixel by `f(x, y)`.
fn image_from(f: impl Fn(usize, usize) -> u8) -> IndexedImage {
    let (w, h) = (256, 240);
    let mut pixels = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            pixels[y * w + x] = f(x, y);
        }
    }
    IndexedImage::from_parts(w, h, pixels, Vec::new())
}

/// A busy picture: unique tiles in the upper rows force a bank split,
/// lower rows share a single solid tile.
fn split_image() -> IndexedImage {
    image_from(|x, y| {
        let (cx, cy) = (x / 8, y / 8);
        if cy < 12 && cx >= 1 {
            let id = cy * 31 + cx;
            let bit = (y % 8) * 8 + (x % 8);
            if bit < 9 && id & (1 << bit) != 0 {
                1
            } else {
                0
            }
        } else {
            1
        }
    })
}

#[test]
fn test_flat_image_single_bank() {
    let image = image_from(|_, _| 1);
    let builder = ScreenBuilder::build(&image, false, false, 256);

    assert_eq!(builder.grid_width(), 32);
    assert_eq!(builder.grid_height(), 30);
    assert_eq!(builder.bottom_start_row(), None);
    assert_eq!(builder.num_common_tiles(), 0);
    assert_eq!(builder.tile_table_bg_top().len(), 1);
    assert!(builder.tile_table_bg_bottom().is_empty());
    assert_eq!(builder.nametable().len(), 32 * 30 + 64);
    assert_eq!(builder.chr_bg().len(), 16);
    assert_eq!(builder.chr_bg(), builder.chr_bg_top());
}

#[test]
fn test_nametable_indices_stay_inside_their_bank() {
    let image = split_image();
    let builder = ScreenBuilder::build(&image, false, false, 256);
    let row = builder.bottom_start_row().expect("split expected");
    let nt = builder.nametable_without_attributes();

    for y in 0..30 {
        let bank_len = if y < row {
            builder.tile_table_bg_top().len()
        } else {
            builder.tile_table_bg_bottom().len()
        };
        for x in 0..32 {
            let index = nt[y * 32 + x] as usize;
            assert!(index < bank_len);
            let bank = if y < row {
                builder.tile_table_bg_top()
            } else {
                builder.tile_table_bg_bottom()
            };
            assert_eq!(bank.at(index), builder.cell_bitmap(x, y));
        }
    }
}

#[test]
fn test_combined_chr_skips_common_tiles() {
    let image = split_image();
    let builder = ScreenBuilder::build(&image, false, false, 256);
    let top = builder.tile_table_bg_top().len();
    let bottom = builder.tile_table_bg_bottom().len();
    let common = builder.num_common_tiles();
    assert_eq!(builder.chr_bg().len(), 16 * (top + bottom - common));
    assert_eq!(
        builder.chr_bg_bottom_no_common().len(),
        16 * (bottom - common)
    );
}

#[test]
fn test_compressed_nametable_roundtrips_without_split() {
    let image = image_from(|x, _| if x < 128 { 1 } else { 2 });
    let builder = ScreenBuilder::build(&image, false, false, 256);
    let nametable = builder.nametable();
    let stream = compress_nametable(
        &nametable,
        builder.bottom_start_row(),
        builder.num_common_tiles(),
    );
    assert_eq!(decode_nametable_blocks(&stream), &nametable[..]);
}

#[test]
fn test_compressed_nametable_roundtrips_with_split() {
    let image = split_image();
    let builder = ScreenBuilder::build(&image, false, false, 256);
    assert!(builder.bottom_start_row().is_some());
    let nametable = builder.nametable();
    let stream = compress_nametable(
        &nametable,
        builder.bottom_start_row(),
        builder.num_common_tiles(),
    );
    assert_eq!(decode_nametable_blocks(&stream), &nametable[..]);
}

#[test]
fn test_sprite_invariants_and_oam_sizes() {
    // A handful of sprite pixels across two palette groups.
    let image = image_from(|x, y| match (x, y) {
        (40, 40) => 17,
        (48, 40) => 18,
        (200, 100) => 21,
        (12, 222) => 29,
        _ => 1,
    });
    let builder = ScreenBuilder::build(&image, false, false, 256);
    let sprites = builder.sprites();

    assert!(sprites.len() <= 64);
    for (i, s) in sprites.iter().enumerate() {
        assert!((4..8).contains(&s.palette));
        assert_eq!(s.tile as usize, i);
        assert!(!s.hflip && !s.vflip);
    }

    assert_eq!(oam(sprites).len(), 4 * sprites.len());

    // Compact OAM: one header byte per non-empty group, two bytes per
    // sprite, one terminator.
    let compact = compress_oam(sprites);
    let groups: std::collections::BTreeSet<u8> = sprites.iter().map(|s| s.palette).collect();
    assert_eq!(compact.len(), groups.len() + 2 * sprites.len() + 1);
}

#[test]
fn test_tall_sprite_pipeline() {
    let image = image_from(|x, y| if x < 8 && (100..116).contains(&y) { 17 } else { 1 });
    let builder = ScreenBuilder::build(&image, true, false, 256);
    let sprites = builder.sprites();
    // The 16-pixel-tall blob spans two sprite rows.
    let real: Vec<_> = sprites.iter().filter(|s| s.y != 240).collect();
    assert_eq!(real.len(), 2);
    for (i, s) in sprites.iter().enumerate() {
        assert_eq!(s.tile as usize, 2 * i);
    }
    assert_eq!(builder.chr_spr().len() % 32, 0);
}
