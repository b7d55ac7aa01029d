//! Zobrist hashing for Guard & Towers positions.
//!
//! Provides an incrementally-updatable 64-bit position hash used to index
//! the transposition table. The key table is generated once, with a fixed
//! seed so hashes are reproducible across runs (useful for tests and for
//! comparing node counts between identical searches).

use rand::prelude::*;

use crate::types::{Color, NUM_SQUARES, PieceKind};

/// Heights realistically never approach this on a 7x7 board; capping the
/// per-square height key count keeps the table small while remaining
/// collision-resistant for the heights that actually occur.
const MAX_HEIGHT_KEYS: usize = 16;

struct ZobristKeys {
    /// `guard_keys[color][square]`
    guard_keys: [[u64; NUM_SQUARES]; 2],
    /// `tower_keys[color][square][height.min(MAX_HEIGHT_KEYS - 1)]`
    tower_keys: [[[u64; MAX_HEIGHT_KEYS]; NUM_SQUARES]; 2],
    side_to_move_key: u64,
}

impl ZobristKeys {
    fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(0x6775_6172_645f_7477); // "guard_tw"
        let mut guard_keys = [[0u64; NUM_SQUARES]; 2];
        for color in guard_keys.iter_mut() {
            for key in color.iter_mut() {
                *key = rng.gen();
            }
        }

        let mut tower_keys = [[[0u64; MAX_HEIGHT_KEYS]; NUM_SQUARES]; 2];
        for color in tower_keys.iter_mut() {
            for square in color.iter_mut() {
                for key in square.iter_mut() {
                    *key = rng.gen();
                }
            }
        }

        let side_to_move_key = rng.gen();

        ZobristKeys {
            guard_keys,
            tower_keys,
            side_to_move_key,
        }
    }
}

static ZOBRIST: std::sync::LazyLock<ZobristKeys> = std::sync::LazyLock::new(ZobristKeys::new);

#[inline]
#[must_use]
pub fn guard_key(color: Color, square_idx: u8) -> u64 {
    ZOBRIST.guard_keys[color.index()][square_idx as usize]
}

#[inline]
#[must_use]
pub fn tower_key(color: Color, square_idx: u8, height: u8) -> u64 {
    let bucket = (height as usize).min(MAX_HEIGHT_KEYS - 1);
    ZOBRIST.tower_keys[color.index()][square_idx as usize][bucket]
}

#[inline]
#[must_use]
pub fn piece_key(color: Color, kind: PieceKind, square_idx: u8, height: u8) -> u64 {
    match kind {
        PieceKind::Guard => guard_key(color, square_idx),
        PieceKind::Tower => tower_key(color, square_idx, height),
    }
}

#[inline]
#[must_use]
pub fn side_to_move_key() -> u64 {
    ZOBRIST.side_to_move_key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_stable_across_calls() {
        assert_eq!(guard_key(Color::Red, 3), guard_key(Color::Red, 3));
        assert_eq!(tower_key(Color::Blue, 10, 4), tower_key(Color::Blue, 10, 4));
    }

    #[test]
    fn distinct_squares_get_distinct_keys() {
        assert_ne!(guard_key(Color::Red, 3), guard_key(Color::Red, 4));
        assert_ne!(guard_key(Color::Red, 3), guard_key(Color::Blue, 3));
    }

    #[test]
    fn tall_heights_share_a_bucket_without_panicking() {
        let a = tower_key(Color::Red, 20, 50);
        let b = tower_key(Color::Red, 20, MAX_HEIGHT_KEYS as u8 - 1);
        assert_eq!(a, b);
    }
}
