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

//! Compressed nametable stream.
//!
//! The raw nametable (attribute table included) is cut into row-aligned
//! segments, each RLEI-compressed into a block of at most
//! [`MAX_BLOCK`](super::rlei::MAX_BLOCK) bytes. Every block is framed as
//! `[length_including_header mod 256, inc_base, data...]` and the stream
//! ends with a single `0` byte. The increment base threads through the
//! blocks so a decoder starting at any block boundary sees the correct
//! initial value.

use super::rlei::{self, MAX_BLOCK};
use crate::screen::NAMETABLE_WIDTH;
use bytes::{BufMut, BytesMut};

/// Compresses a raw nametable into the framed block stream.
///
/// `bottom_start_row` forces an initial split at the bank-switch row, and
/// `num_common` seeds each initial segment's increment base: right after a
/// bank switch, tile indices naturally start at the common-tile count.
#[must_use]
pub fn compress_nametable(
    nametable: &[u8],
    bottom_start_row: Option<usize>,
    num_common: usize,
) -> BytesMut {
    let base = num_common as u8;
    let mut segments: Vec<(u8, Vec<u8>)> = match bottom_start_row {
        Some(row) => {
            let at = NAMETABLE_WIDTH * row;
            vec![
                (base, nametable[..at].to_vec()),
                (base, nametable[at..].to_vec()),
            ]
        }
        None => vec![(base, nametable.to_vec())],
    };

    // Keep halving segments until every compressed block fits.
    loop {
        let oversized = segments
            .iter()
            .position(|(base, seg)| rlei::compress(seg, *base).0.len() > MAX_BLOCK);
        let Some(i) = oversized else { break };
        let (seg_base, seg) = segments.remove(i);
        let (top, bottom) = split_segment_in_half(&seg, seg_base);
        segments.insert(i, bottom);
        segments.insert(i, top);
    }

    let mut out = BytesMut::new();
    for (seg_base, seg) in &segments {
        let (block, _) = rlei::compress(seg, *seg_base);
        out.put_u8(((block.len() + 2) & 0xFF) as u8);
        out.put_u8(*seg_base);
        out.extend_from_slice(&block);
    }
    out.put_u8(0);
    out
}

/// Splits a segment around the row minimizing the larger of the two
/// halves' compressed sizes, found by steepest descent from the middle.
/// The top half inherits the parent's base; the bottom half starts from
/// the base the top half's compression ends with.
fn split_segment_in_half(seg: &[u8], base: u8) -> ((u8, Vec<u8>), (u8, Vec<u8>)) {
    let num_rows = seg.len() / NAMETABLE_WIDTH;
    let cost = |row: usize| {
        let (top, base_after) = rlei::compress(&seg[..NAMETABLE_WIDTH * row], base);
        let (bottom, _) = rlei::compress(&seg[NAMETABLE_WIDTH * row..], base_after);
        top.len().max(bottom.len())
    };

    let mut row = num_rows / 2;
    let mut best = cost(row);
    loop {
        let above = if row > 1 { cost(row - 1) } else { usize::MAX };
        let below = if row < num_rows - 1 { cost(row + 1) } else { usize::MAX };
        if above < best && above <= below {
            best = above;
            row -= 1;
        } else if below < best {
            best = below;
            row += 1;
        } else {
            break;
        }
    }

    let (_, base_after) = rlei::compress(&seg[..NAMETABLE_WIDTH * row], base);
    (
        (base, seg[..NAMETABLE_WIDTH * row].to_vec()),
        (base_after, seg[NAMETABLE_WIDTH * row..].to_vec()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_block_framing() {
        // A constant nametable compresses into one block.
        let nametable = vec![0u8; 1024];
        let out = compress_nametable(&nametable, None, 0);
        assert_eq!(out[0] as usize, out.len() - 1); // length includes the header
        assert_eq!(out[1], 0); // inc_base
        assert_eq!(out[out.len() - 1], 0); // terminator
    }

    #[test]
    fn test_bank_split_forces_two_blocks() {
        let nametable = vec![3u8; 1024];
        let out = compress_nametable(&nametable, Some(16), 7);
        // Two blocks, both seeded with the common-tile count.
        assert_eq!(out[1], 7);
        let first_len = out[0] as usize;
        assert_eq!(out[first_len + 1], 7);
        assert_eq!(out[out.len() - 1], 0);
    }

    #[test]
    fn test_every_block_fits() {
        // Incompressible data: every byte differs from its neighbors and
        // never matches the rolling base, forcing repeated splits.
        let nametable: Vec<u8> = (0..1024).map(|i| ((i * 89) % 251) as u8).collect();
        let out = compress_nametable(&nametable, None, 0);
        let mut pos = 0;
        while out[pos] != 0 {
            let len = out[pos] as usize;
            assert!(len <= MAX_BLOCK + 2);
            pos += len;
        }
        assert_eq!(pos, out.len() - 1);
    }
}
