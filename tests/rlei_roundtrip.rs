//! Round-trip and law tests for the RLEI codec against the reference
//! decoder in `common`.

mod common;

use common::{rlei_decompress, XorShift32};
use ppupack::encoding::rlei::compress;

fn roundtrip(input: &[u8], base: u8) {
    let (encoded, _) = compress(input, base);
    let decoded = rlei_decompress(&encoded, base);
    assert_eq!(decoded, input, "round-trip failed for base {base}");
}

#[test]
fn test_roundtrip_concrete_scenarios() {
    roundtrip(&[0x42, 0xFE], 0);
    roundtrip(&[0x00, 0x00, 0x00], 0);
    roundtrip(&[5, 6, 7, 8, 9, 10], 5);
    roundtrip(&(0..10).collect::<Vec<u8>>(), 0);
    roundtrip(&[0x10, 0x10, 0xAA, 0xAA, 0xAA], 0);
}

#[test]
fn test_roundtrip_empty() {
    roundtrip(&[], 0);
    roundtrip(&[], 200);
}

#[test]
fn test_roundtrip_all_header_kinds_interleaved() {
    // Literals, constant runs with value switches, increment runs with
    // and without extensions, in one stream.
    let mut input: Vec<u8> = Vec::new();
    input.extend([9, 9, 9, 9, 9, 9, 9, 9]); // constant, extended
    input.extend(10..30); // increment run from the rolled-up base
    input.extend([1, 200, 3]); // literals
    input.extend([42, 42]); // short constant run
    roundtrip(&input, 0);
}

#[test]
fn test_roundtrip_long_runs_and_boundaries() {
    for n in [1usize, 6, 7, 21, 22, 23, 44, 45] {
        let constant = vec![0x5Au8; n];
        roundtrip(&constant, 0);
        let increasing: Vec<u8> = (0..n as u8).collect();
        roundtrip(&increasing, 0);
    }
}

#[test]
fn test_roundtrip_random_inputs() {
    let mut rng = XorShift32(0x1234_5678);
    for len in [1usize, 2, 3, 17, 64, 256, 1024] {
        for _ in 0..8 {
            // Mix of raw noise and run-friendly low values.
            let input: Vec<u8> = (0..len)
                .map(|_| {
                    let b = rng.next_u8();
                    if b & 1 == 0 {
                        b >> 4
                    } else {
                        b
                    }
                })
                .collect();
            let base = rng.next_u8();
            roundtrip(&input, base);
        }
    }
}

#[test]
fn test_roundtrip_nametable_like_input() {
    // A remapped nametable: constant sky rows followed by rows of
    // linearly increasing indices starting at the common-tile count.
    let mut input = Vec::new();
    input.extend(vec![0u8; 320]);
    let num_common = 24u8;
    let mut tile = num_common;
    for _ in 0..10 {
        for _ in 0..32 {
            input.push(tile);
            tile = tile.saturating_add(1);
        }
    }
    let (encoded, _) = compress(&input, num_common);
    assert_eq!(rlei_decompress(&encoded, num_common), input);
    // The increasing half must compress far below literal cost.
    assert!(encoded.len() < input.len() / 4);
}

#[test]
fn test_determinism() {
    let mut rng = XorShift32(42);
    let input: Vec<u8> = (0..512).map(|_| rng.next_u8()).collect();
    assert_eq!(compress(&input, 11), compress(&input, 11));
}

#[test]
fn test_length_bound() {
    let mut rng = XorShift32(7);
    for _ in 0..16 {
        let input: Vec<u8> = (0..300).map(|_| rng.next_u8()).collect();
        let (encoded, _) = compress(&input, 0);
        assert!(encoded.len() <= input.len() * 3 / 2 + 2);
    }
}

#[test]
fn test_monotone_base() {
    let mut rng = XorShift32(99);
    for start in [0u8, 5, 128, 254] {
        let input: Vec<u8> = (0..64).map(|_| rng.next_u8() % 250).collect();
        let (_, base) = compress(&input, start);
        let max = input.iter().copied().max().unwrap();
        assert!(base >= start);
        assert!(base >= max + 1);
    }
}
