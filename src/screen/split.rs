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

//! Background bank splitting.
//!
//! When one pattern table cannot hold all background tiles, the grid is
//! split at a horizontal row and each half gets its own table, switched
//! mid-frame. Tiles referenced by both halves are appended first, at
//! identical indices in both tables, so a bank switch does not reload
//! them; the mostly linear index layout this produces is also what the
//! RLEI increment-run case compresses best.

use super::{ScreenBuilder, TILE_HEIGHT};
use crate::tiles::TileTable;
use std::collections::{BTreeSet, HashMap};

impl ScreenBuilder {
    /// Splits `table` into top and bottom tables and remaps the grid.
    ///
    /// On failure the single-table layout is kept and a capacity error is
    /// logged; downstream serialization continues.
    pub(crate) fn split_background_tile_table(&mut self, table: TileTable, max_bg_slots: usize) {
        let rows = self.unique_tile_indices_per_row();
        let Some(row) = find_best_split(&rows, max_bg_slots) else {
            self.tile_table_bg_top = table;
            return;
        };
        self.bottom_start_row = Some(row);

        let top_set: BTreeSet<usize> = rows[..row].iter().flatten().copied().collect();
        let bottom_set: BTreeSet<usize> = rows[row..].iter().flatten().copied().collect();
        let common: BTreeSet<usize> = top_set.intersection(&bottom_set).copied().collect();

        let mut top = TileTable::new(TILE_HEIGHT);
        let mut bottom = TileTable::new(TILE_HEIGHT);
        let mut remap_top: HashMap<usize, usize> = HashMap::new();
        let mut remap_bottom: HashMap<usize, usize> = HashMap::new();

        // Common tiles first, at matching indices in both tables.
        for &i in &common {
            remap_top.insert(i, top.push_raw(table.at(i).to_vec()));
            remap_bottom.insert(i, bottom.push_raw(table.at(i).to_vec()));
        }
        for &i in top_set.difference(&common) {
            remap_top.insert(i, top.push_raw(table.at(i).to_vec()));
        }
        for &i in bottom_set.difference(&common) {
            remap_bottom.insert(i, bottom.push_raw(table.at(i).to_vec()));
        }

        self.remap_background_indices(0, row, &remap_top);
        self.remap_background_indices(row, self.grid_height, &remap_bottom);
        self.num_common_tiles = common.len();
        self.tile_table_bg_top = top;
        self.tile_table_bg_bottom = bottom;
    }

    fn unique_tile_indices_per_row(&self) -> Vec<BTreeSet<usize>> {
        (0..self.grid_height)
            .map(|y| (0..self.grid_width).map(|x| self.cell(x, y).index).collect())
            .collect()
    }

    fn remap_background_indices(&mut self, start: usize, end: usize, remapping: &HashMap<usize, usize>) {
        for y in start..end {
            for x in 0..self.grid_width {
                let cell = &mut self.background[y * self.grid_width + x];
                cell.index = remapping[&cell.index];
            }
        }
    }
}

/// Finds the topmost split row whose bottom half fits one pattern table,
/// leaving the bottom as much CPU time as possible after the mid-frame
/// switch.
///
/// Walks rows bottom-up, growing the bottom tile set until adding the
/// next row would exceed `min(max_tiles, 255)`, and returns the row just
/// after that. Returns `None` (logged as an error) when not even the last
/// row alone fits.
fn find_best_split(rows: &[BTreeSet<usize>], max_tiles: usize) -> Option<usize> {
    let cap = max_tiles.min(255);
    let grid_height = rows.len();
    let mut bottom: BTreeSet<usize> = BTreeSet::new();
    for y in (0..grid_height).rev() {
        if bottom.union(&rows[y]).count() > cap {
            let row = y + 1;
            if row < grid_height {
                return Some(row);
            }
            log::error!("Could not fit background tiles in just two pattern tables.");
            return None;
        }
        bottom.extend(rows[y].iter().copied());
    }
    // Every row fits below any split; the smallest valid split row wins.
    Some(1)
}
