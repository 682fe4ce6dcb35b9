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

//! Screen builder.
//!
//! Converts one indexed-color image into the in-memory artifacts a PPU
//! screen consists of: background tile tables (split into two banks when
//! one does not suffice), the nametable cell grid with its attribute
//! table, the sprite tile table and the sprite list.

mod split;
mod sprites;

use crate::image::IndexedImage;
use crate::tiles::{TileBitmap, TileTable, NUM_TILE_PLANES};
use bytes::{BufMut, BytesMut};

/// Nametable width in tiles.
pub const NAMETABLE_WIDTH: usize = 32;
/// Nametable height in tiles.
pub const NAMETABLE_HEIGHT: usize = 30;
/// Attribute table width in entries.
pub const ATTRIBUTE_TABLE_WIDTH: usize = 8;
/// Attribute table height in entries.
pub const ATTRIBUTE_TABLE_HEIGHT: usize = 8;
/// Tile width in pixels.
pub const TILE_WIDTH: usize = 8;
/// Tile height in pixels.
pub const TILE_HEIGHT: usize = 8;
/// Sprite width in pixels.
pub const SPRITE_WIDTH: usize = 8;
/// Colors per palette group (color 0 is transparent).
pub const PALETTE_GROUP_SIZE: usize = 4;
/// Number of background palette groups.
pub const NUM_PALETTE_GROUPS_BG: usize = 4;
/// Number of sprite palette groups.
pub const NUM_PALETTE_GROUPS_SPR: usize = 4;
/// Hardware sprite limit.
pub const MAX_SPRITES: usize = 64;
/// Capacity of one background pattern table.
pub const MAX_TILES_BG: usize = 256;

/// One background grid cell.
#[derive(Debug, Clone)]
pub(crate) struct Cell {
    /// Two-plane tile bitmap as read from the image.
    pub data: TileBitmap,
    /// Index into whichever tile table owns this cell's row.
    pub index: usize,
    /// Palette group, 0-3.
    pub palette: u8,
}

/// One hardware sprite before OAM serialization.
///
/// `y` is the pre-hardware-offset position; OAM stores `y - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    /// Screen X position.
    pub x: u8,
    /// Screen Y position.
    pub y: u8,
    /// Tile index (doubled in 8x16 mode).
    pub tile: u8,
    /// Horizontal flip.
    pub hflip: bool,
    /// Vertical flip.
    pub vflip: bool,
    /// Palette group, 4-7.
    pub palette: u8,
}

/// Builds a PPU screen from an image.
///
/// A screen consists of background tiles, sprite tiles, a nametable with
/// attribute table, and sprite OAM.
#[derive(Debug)]
pub struct ScreenBuilder {
    sprites_8x16: bool,
    grid_width: usize,
    grid_height: usize,
    background: Vec<Cell>,
    tile_table_bg_top: TileTable,
    tile_table_bg_bottom: TileTable,
    tile_table_spr: TileTable,
    sprites: Vec<Sprite>,
    bottom_start_row: Option<usize>,
    num_common_tiles: usize,
}

impl ScreenBuilder {
    /// Converts `image` into screen data.
    ///
    /// `max_bg_slots` caps each background pattern table. When
    /// `add_sprite0` is set, one background slot is reserved for the
    /// sprite-0-hit patch tile.
    #[must_use]
    pub fn build(
        image: &IndexedImage,
        sprites_8x16: bool,
        add_sprite0: bool,
        max_bg_slots: usize,
    ) -> Self {
        let grid_width = image.width() / TILE_WIDTH;
        let grid_height = image.height() / TILE_HEIGHT;
        let reserved = usize::from(add_sprite0);
        let sprite_height = TILE_HEIGHT << usize::from(sprites_8x16);

        let mut builder = ScreenBuilder {
            sprites_8x16,
            grid_width,
            grid_height,
            background: Vec::new(),
            tile_table_bg_top: TileTable::new(TILE_HEIGHT),
            tile_table_bg_bottom: TileTable::new(TILE_HEIGHT),
            tile_table_spr: TileTable::new(sprite_height),
            sprites: Vec::new(),
            bottom_start_row: None,
            num_common_tiles: 0,
        };

        let mut bg_table = TileTable::new(TILE_HEIGHT);
        builder.make_background(image, &mut bg_table);
        if bg_table.len() > max_bg_slots.saturating_sub(reserved) {
            builder.split_background_tile_table(bg_table, max_bg_slots);
        } else {
            builder.tile_table_bg_top = bg_table;
        }
        builder.make_sprites(image);
        if add_sprite0 {
            builder.patch_sprite0();
        }
        builder
    }

    fn make_background(&mut self, image: &IndexedImage, table: &mut TileTable) {
        self.background = Vec::with_capacity(self.grid_width * self.grid_height);
        for y in 0..self.grid_height {
            for x in 0..self.grid_width {
                let (data, palette) = read_cell(
                    image,
                    x * TILE_WIDTH,
                    y * TILE_HEIGHT,
                    TILE_WIDTH,
                    TILE_HEIGHT,
                    false,
                    None,
                );
                let index = table.add(data.clone());
                self.background.push(Cell {
                    data,
                    index,
                    palette,
                });
            }
        }
    }

    fn read_sprite_cell(
        &self,
        image: &IndexedImage,
        x: usize,
        y: usize,
        palette_filter: Option<u8>,
    ) -> (Option<TileBitmap>, u8) {
        let h = self.tile_table_spr.height();
        let (data, palette) = read_cell(image, x, y, SPRITE_WIDTH, h, true, palette_filter);
        // All-zero sprite tiles don't need storing.
        if data.iter().all(|&b| b == 0) {
            (None, palette)
        } else {
            (Some(data), palette)
        }
    }

    /// Adds a single background pixel in the upper-right corner, along
    /// with a sprite tile, so that a sprite-0 hit always triggers.
    ///
    /// Sprite-0 hits cannot happen at x=255 and the first scanline renders
    /// no sprites, so the patch pixel sits at (6, 1) of the top-right
    /// background tile and the sprite tile carries its pixel at (6, 0).
    /// This keeps the patch functional when the leftmost column is
    /// blanked.
    fn patch_sprite0(&mut self) {
        let cell_pos = self.grid_width - 1;
        let old_index = self.background[cell_pos].index;
        let mut data = self.tile_table_bg_top.at(old_index).to_vec();
        data[1] |= 0x02;
        let new_index = self.tile_table_bg_top.add(data);
        self.background[cell_pos].index = new_index;

        let mut sprite_tile = vec![0u8; self.tile_table_spr.tile_size()];
        sprite_tile[0] = 0x02;
        self.tile_table_spr.add(sprite_tile);
    }

    pub(crate) fn cell(&self, x: usize, y: usize) -> &Cell {
        &self.background[y * self.grid_width + x]
    }

    /// Two-plane bitmap read from the image at grid cell `(x, y)`.
    #[must_use]
    pub fn cell_bitmap(&self, x: usize, y: usize) -> &[u8] {
        &self.cell(x, y).data
    }

    fn palette_group_at(&self, x: usize, y: usize) -> u8 {
        if x < self.grid_width && y < self.grid_height {
            self.cell(x, y).palette
        } else {
            0
        }
    }

    /// Nametable tile indices, row-major, without the attribute table.
    #[must_use]
    pub fn nametable_without_attributes(&self) -> BytesMut {
        let mut nt = BytesMut::with_capacity(self.background.len());
        for cell in &self.background {
            nt.put_u8(cell.index as u8);
        }
        nt
    }

    /// Attribute table: 64 bytes of four 2-bit palette selectors each.
    ///
    /// Each selector covers a 16x16-pixel area and is the bitwise OR of
    /// its four cells' palette groups; each byte packs a 32x32-pixel
    /// region in top-left, top-right, bottom-left, bottom-right order.
    #[must_use]
    pub fn attribute_table(&self) -> BytesMut {
        let w = NAMETABLE_WIDTH / 2;
        let h = NAMETABLE_HEIGHT / 2;
        let mut pt = [[0u8; 2 * ATTRIBUTE_TABLE_HEIGHT]; 2 * ATTRIBUTE_TABLE_WIDTH];
        for y in 0..h {
            for x in 0..w {
                pt[x][y] = self.palette_group_at(2 * x, 2 * y)
                    | self.palette_group_at(2 * x + 1, 2 * y)
                    | self.palette_group_at(2 * x, 2 * y + 1)
                    | self.palette_group_at(2 * x + 1, 2 * y + 1);
            }
        }
        let mut at = BytesMut::with_capacity(ATTRIBUTE_TABLE_WIDTH * ATTRIBUTE_TABLE_HEIGHT);
        for y in 0..ATTRIBUTE_TABLE_HEIGHT {
            for x in 0..ATTRIBUTE_TABLE_WIDTH {
                let top_left = pt[2 * x][2 * y];
                let top_right = pt[2 * x + 1][2 * y];
                let bottom_left = pt[2 * x][2 * y + 1];
                let bottom_right = pt[2 * x + 1][2 * y + 1];
                at.put_u8((bottom_right << 6) | (bottom_left << 4) | (top_right << 2) | top_left);
            }
        }
        at
    }

    /// Full nametable: tile indices followed by the attribute table.
    #[must_use]
    pub fn nametable(&self) -> BytesMut {
        let mut nt = self.nametable_without_attributes();
        nt.extend_from_slice(&self.attribute_table());
        nt
    }

    /// Combined background CHR: the top table followed by the bottom
    /// table's non-common tiles.
    #[must_use]
    pub fn chr_bg(&self) -> BytesMut {
        chr_concat(
            self.tile_table_bg_top
                .iter()
                .chain(self.tile_table_bg_bottom.tiles()[self.num_common_tiles..].iter()),
        )
    }

    /// Background CHR, top bank.
    #[must_use]
    pub fn chr_bg_top(&self) -> BytesMut {
        chr_concat(self.tile_table_bg_top.iter())
    }

    /// Background CHR, bottom bank.
    #[must_use]
    pub fn chr_bg_bottom(&self) -> BytesMut {
        chr_concat(self.tile_table_bg_bottom.iter())
    }

    /// Background CHR, bottom bank without the common tiles already
    /// present in the top bank.
    #[must_use]
    pub fn chr_bg_bottom_no_common(&self) -> BytesMut {
        chr_concat(self.tile_table_bg_bottom.tiles()[self.num_common_tiles..].iter())
    }

    /// Sprite CHR.
    #[must_use]
    pub fn chr_spr(&self) -> BytesMut {
        chr_concat(self.tile_table_spr.iter())
    }

    /// Final sprite list.
    #[must_use]
    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    /// Whether sprites are 8x16.
    #[must_use]
    pub fn sprites_8x16(&self) -> bool {
        self.sprites_8x16
    }

    /// Top background tile table.
    #[must_use]
    pub fn tile_table_bg_top(&self) -> &TileTable {
        &self.tile_table_bg_top
    }

    /// Bottom background tile table (empty when no split occurred).
    #[must_use]
    pub fn tile_table_bg_bottom(&self) -> &TileTable {
        &self.tile_table_bg_bottom
    }

    /// Sprite tile table.
    #[must_use]
    pub fn tile_table_spr(&self) -> &TileTable {
        &self.tile_table_spr
    }

    /// First grid row rendered from the bottom bank, if split.
    #[must_use]
    pub fn bottom_start_row(&self) -> Option<usize> {
        self.bottom_start_row
    }

    /// Number of tiles shared by both banks at identical leading indices.
    #[must_use]
    pub fn num_common_tiles(&self) -> usize {
        self.num_common_tiles
    }

    /// Grid width in cells.
    #[must_use]
    pub fn grid_width(&self) -> usize {
        self.grid_width
    }

    /// Grid height in cells.
    #[must_use]
    pub fn grid_height(&self) -> usize {
        self.grid_height
    }

    /// First 8x8 tile index sprite CHR is uploaded to. Sprite tiles sit at
    /// the end of the bank so users get predictable space for their own.
    #[must_use]
    pub fn sprite_tiles_start_index(&self) -> usize {
        let num_sprite_tiles = self.sprites.len() + 1;
        MAX_TILES_BG.saturating_sub(num_sprite_tiles << usize::from(self.sprites_8x16))
    }

    /// First 256-byte CHR page sprite tiles are uploaded to.
    #[must_use]
    pub fn sprite_tiles_start_page(&self) -> usize {
        let tile_size = TILE_HEIGHT * NUM_TILE_PLANES;
        (self.sprite_tiles_start_index() * tile_size) / 256
    }
}

fn chr_concat<'a>(tiles: impl Iterator<Item = &'a TileBitmap>) -> BytesMut {
    let mut chr = BytesMut::new();
    for tile in tiles {
        chr.extend_from_slice(tile);
    }
    chr
}

/// Reads a W x H block of indexed pixels into a two-plane bitmap.
///
/// Pixels whose color index is a multiple of [`PALETTE_GROUP_SIZE`] are
/// transparent. A kept pixel contributes bits 0 and 1 of its color to
/// planes 0 and 1; tall tiles place their lower half in a second
/// two-plane block. Returns the bitmap and the cell's palette group
/// (first kept pixel wins, 0 when the cell is empty); a cell mixing two
/// groups is logged and the last-seen group wins.
pub(crate) fn read_cell(
    image: &IndexedImage,
    start_x: usize,
    start_y: usize,
    w: usize,
    h: usize,
    sprite_cell: bool,
    palette_filter: Option<u8>,
) -> (TileBitmap, u8) {
    let mut tile_data = vec![0u8; NUM_TILE_PLANES * h];
    let mut tile_p: Option<u8> = None;
    for y in 0..h {
        for x in 0..w {
            let px = start_x + x;
            let py = start_y + y;
            let c = image.pixel(px, py);
            if c as usize % PALETTE_GROUP_SIZE == 0 {
                continue;
            }
            let p = c / PALETTE_GROUP_SIZE as u8;
            let background_match = !sprite_cell && (p as usize) < NUM_PALETTE_GROUPS_BG;
            let sprite_match = palette_filter == Some(p)
                || (palette_filter.is_none()
                    && sprite_cell
                    && (p as usize) >= NUM_PALETTE_GROUPS_BG);
            if !(background_match || sprite_match) {
                continue;
            }
            let offs = (y / TILE_HEIGHT) * TILE_HEIGHT * NUM_TILE_PLANES;
            tile_data[offs + y % TILE_HEIGHT] |= (c & 1) << (w - 1 - x);
            tile_data[offs + y % TILE_HEIGHT + TILE_HEIGHT] |= ((c >> 1) & 1) << (w - 1 - x);
            if let Some(seen) = tile_p {
                if seen != p {
                    let kind = if sprite_cell { "sprite" } else { "background" };
                    log::error!(
                        "Inconsistent {kind} palette. {p} at pixel ({px},{py}) differs from {seen}"
                    );
                }
            }
            tile_p = Some(p);
        }
    }
    (tile_data, tile_p.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 256x240 image where every 8x8 cell is filled with the color picked
    /// by `f(cell_x, cell_y)`.
    fn cell_image(f: impl Fn(usize, usize) -> u8) -> IndexedImage {
        let (w, h) = (256, 240);
        let mut pixels = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                pixels[y * w + x] = f(x / TILE_WIDTH, y / TILE_HEIGHT);
            }
        }
        IndexedImage::from_parts(w, h, pixels, Vec::new())
    }

    #[test]
    fn test_cell_reader_bit_planes() {
        let mut pixels = vec![0u8; 64];
        pixels[0] = 3; // color 3 of group 0: both planes set
        pixels[9] = 2; // (1, 1), color 2: plane 1 only
        let image = IndexedImage::from_parts(8, 8, pixels, Vec::new());
        let (data, palette) = read_cell(&image, 0, 0, 8, 8, false, None);
        assert_eq!(palette, 0);
        assert_eq!(data[0], 0x80);
        assert_eq!(data[8], 0x80);
        assert_eq!(data[1], 0x00);
        assert_eq!(data[9], 0x40);
    }

    #[test]
    fn test_cell_reader_tall_tile_offsets() {
        let mut pixels = vec![0u8; 8 * 16];
        pixels[12 * 8 + 2] = 1; // row 12 lands in the second two-plane block
        let image = IndexedImage::from_parts(8, 16, pixels, Vec::new());
        let (data, _) = read_cell(&image, 0, 0, 8, 16, true, None);
        assert_eq!(data.len(), 32);
        assert_eq!(data[16 + 4], 0x20);
        assert_eq!(data[16 + 8 + 4], 0x00);
    }

    #[test]
    fn test_background_dedup_single_tile() {
        let image = cell_image(|_, _| 1);
        let builder = ScreenBuilder::build(&image, false, false, MAX_TILES_BG);
        assert_eq!(builder.tile_table_bg_top().len(), 1);
        assert!(builder.tile_table_bg_bottom().is_empty());
        assert_eq!(builder.bottom_start_row(), None);
        assert!(builder.nametable_without_attributes().iter().all(|&i| i == 0));
    }

    #[test]
    fn test_nametable_length_includes_attributes() {
        let image = cell_image(|_, _| 1);
        let builder = ScreenBuilder::build(&image, false, false, MAX_TILES_BG);
        assert_eq!(builder.nametable().len(), 32 * 30 + 64);
    }

    #[test]
    fn test_attribute_pack_quadrants() {
        // 16x16-pixel areas with groups 1, 2, 3, 0 in the first 32x32
        // region; everything else group 0.
        let image = cell_image(|cx, cy| match (cx / 2, cy / 2) {
            (0, 0) => 5,  // group 1
            (1, 0) => 9,  // group 2
            (0, 1) => 13, // group 3
            _ => 1,       // group 0
        });
        let builder = ScreenBuilder::build(&image, false, false, MAX_TILES_BG);
        let at = builder.attribute_table();
        assert_eq!(at.len(), 64);
        assert_eq!(at[0], 0x39);
    }

    #[test]
    fn test_sprite0_patch() {
        // Color 2 keeps plane 0 clear so the patched pixel lands in an
        // otherwise empty byte.
        let image = cell_image(|_, _| 2);
        let builder = ScreenBuilder::build(&image, false, true, MAX_TILES_BG);
        let top_right = builder.cell(builder.grid_width() - 1, 0);
        let patched = builder.tile_table_bg_top().at(top_right.index);
        assert_eq!(patched[1] & 0x02, 0x02);
        // The patched tile is distinct from the untouched fill tile.
        assert_eq!(builder.tile_table_bg_top().len(), 2);
        // Sprite table ends with the single-pixel hit tile.
        let spr = builder.tile_table_spr();
        assert_eq!(spr.at(spr.len() - 1)[0], 0x02);
    }
}
