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

//! OAM serialization.
//!
//! Raw OAM matches the hardware layout: 4 bytes per sprite. The
//! compressed variant halves that by grouping sprites per palette and
//! omitting tile indices (the runtime decoder reconstructs them with a
//! running counter) as well as flip and priority bits.

use crate::screen::{Sprite, NUM_PALETTE_GROUPS_BG, NUM_PALETTE_GROUPS_SPR};
use bytes::{BufMut, BytesMut};

/// Raw OAM directly matching the hardware format:
/// `(y-1, tile, attributes, x)` per sprite.
#[must_use]
pub fn oam(sprites: &[Sprite]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(4 * sprites.len());
    for s in sprites {
        buf.put_u8(s.y.wrapping_sub(1));
        buf.put_u8(s.tile);
        buf.put_u8(
            (u8::from(s.vflip) << 7)
                | (u8::from(s.hflip) << 6)
                | (s.palette - NUM_PALETTE_GROUPS_BG as u8),
        );
        buf.put_u8(s.x);
    }
    buf
}

/// Compact OAM.
///
/// For each non-empty palette group: one byte of
/// `(count << 2) | palette-bits-reversed`, then `(x, y-1)` per sprite in
/// list order, and a single `0` terminator after all groups. Tile indices
/// are assumed sequential (doubled for 8x16 sprites) and flips unused.
#[must_use]
pub fn compress_oam(sprites: &[Sprite]) -> BytesMut {
    let mut buf = BytesMut::new();
    for g in 0..NUM_PALETTE_GROUPS_SPR {
        let palette = (g + NUM_PALETTE_GROUPS_BG) as u8;
        let group: Vec<&Sprite> = sprites.iter().filter(|s| s.palette == palette).collect();
        if group.is_empty() {
            continue;
        }
        let g = g as u8;
        buf.put_u8(((group.len() as u8) << 2) | ((g & 0x1) << 1) | ((g & 0x2) >> 1));
        for s in group {
            debug_assert!(!s.hflip && !s.vflip);
            buf.put_u8(s.x);
            buf.put_u8(s.y.wrapping_sub(1));
        }
    }
    buf.put_u8(0);
    buf
}
