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

//! Sprite layer construction.
//!
//! Scans the grid once per sprite palette group, merges horizontally
//! adjacent sprites whose shared padding covers a full sprite width, then
//! rebuilds the sprite tile table from the final positions.

use super::{
    ScreenBuilder, Sprite, MAX_SPRITES, NUM_PALETTE_GROUPS_BG, NUM_PALETTE_GROUPS_SPR,
    SPRITE_WIDTH, TILE_WIDTH,
};
use crate::image::IndexedImage;
use crate::tiles::TileBitmap;

/// Number of leading and trailing all-zero pixel columns of a bitmap.
fn paddings(bitmap: &[u8]) -> (usize, usize) {
    let mut union = 0u8;
    for &b in bitmap {
        union |= b;
    }
    let left = (0..SPRITE_WIDTH)
        .find(|&k| union & (0x80u8 >> k) != 0)
        .unwrap_or(SPRITE_WIDTH);
    let right = (0..SPRITE_WIDTH)
        .find(|&k| union & (1u8 << k) != 0)
        .unwrap_or(SPRITE_WIDTH);
    (left, right)
}

/// Merges maximal runs of horizontally adjacent same-row, same-palette
/// sprites. When the first sprite's left padding plus the last sprite's
/// right padding covers a sprite width, the whole run shifts right by the
/// left padding and the run's last sprite is dropped, freeing a slot.
fn merge_horizontally_adjacent_sprites(staged: Vec<(Sprite, TileBitmap)>) -> Vec<Sprite> {
    let mut merged = Vec::with_capacity(staged.len());
    let mut i = 0;
    while i < staged.len() {
        let mut j = i + 1;
        while j < staged.len()
            && u16::from(staged[j].0.x) == u16::from(staged[j - 1].0.x) + SPRITE_WIDTH as u16
            && staged[j].0.y == staged[j - 1].0.y
            && staged[j].0.palette == staged[j - 1].0.palette
        {
            j += 1;
        }
        let (left, _) = paddings(&staged[i].1);
        let (_, right) = paddings(&staged[j - 1].1);
        let mut run: Vec<Sprite> = staged[i..j].iter().map(|(s, _)| s.clone()).collect();
        if left + right >= SPRITE_WIDTH {
            for s in &mut run {
                s.x += left as u8;
            }
            run.pop();
        }
        merged.extend(run);
        i = j;
    }
    merged
}

impl ScreenBuilder {
    /// Creates the sprite layer.
    pub(crate) fn make_sprites(&mut self, image: &IndexedImage) {
        let sprite_height = self.tile_table_spr.height();
        let grid_w = self.grid_width;
        let rows = self.grid_height / (sprite_height / super::TILE_HEIGHT);

        // One pass per palette group; non-empty cells become sprites.
        let mut staged: Vec<(Sprite, TileBitmap)> = Vec::new();
        for p in 0..NUM_PALETTE_GROUPS_SPR {
            let palette = (p + NUM_PALETTE_GROUPS_BG) as u8;
            for y in 0..rows {
                for x in 0..grid_w {
                    let (data, _) = self.read_sprite_cell(
                        image,
                        x * TILE_WIDTH,
                        y * sprite_height,
                        Some(palette),
                    );
                    if let Some(data) = data {
                        let tile_index = self.tile_table_spr.add(data.clone());
                        let tile = (tile_index << usize::from(self.sprites_8x16)) as u8;
                        staged.push((
                            Sprite {
                                x: (x * TILE_WIDTH) as u8,
                                y: (y * sprite_height) as u8,
                                tile,
                                hflip: false,
                                vflip: false,
                                palette,
                            },
                            data,
                        ));
                    }
                }
            }
        }

        let merged = merge_horizontally_adjacent_sprites(staged);

        // Merging moved sprites off the tile grid; re-read their bitmaps
        // at the final positions and drop any that became empty.
        self.tile_table_spr.clear();
        let mut sprites = Vec::with_capacity(merged.len());
        for sprite in merged {
            let (data, _) = self.read_sprite_cell(
                image,
                sprite.x as usize,
                sprite.y as usize,
                Some(sprite.palette),
            );
            if let Some(data) = data {
                self.tile_table_spr.add(data);
                sprites.push(sprite);
            }
        }

        // TODO: remove the 3-sprite padding once the downstream tile
        // compressor accepts fewer than 3 tiles.
        while sprites.len() < 3 {
            let zero = vec![0u8; self.tile_table_spr.tile_size()];
            self.tile_table_spr.push_raw(zero);
            sprites.push(Sprite {
                x: 0,
                y: 240,
                tile: 0,
                hflip: false,
                vflip: false,
                palette: NUM_PALETTE_GROUPS_BG as u8,
            });
        }

        if sprites.len() > MAX_SPRITES {
            log::error!("Number-of-sprites overflow: {}", MAX_SPRITES);
        }

        // Renumber densely; merging leaves the staged ids dangling.
        for (i, sprite) in sprites.iter_mut().enumerate() {
            sprite.tile = (i << usize::from(self.sprites_8x16)) as u8;
        }
        self.sprites = sprites;
    }
}
