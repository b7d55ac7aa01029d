//! Perft cross-checks (spec.md §8 property 5 touches move generation;
//! these exercise `movegen::perft`/`perft_divide` consistency across
//! several starting positions rather than asserting specific node-count
//! constants, since no external engine is available here to derive known-
//! good reference counts for this 7x7 variant).

use gat_engine::board::GameState;
use gat_engine::movegen;

fn positions() -> Vec<GameState> {
    vec![
        GameState::new(),
        GameState::from_fen("7/7/7/3BG3/3RG3/7/7 r"),
        GameState::from_fen("7/7/7/3b33/7/3RG3/3BG3 r"),
    ]
}

#[test]
fn perft_zero_is_always_one_node() {
    for mut state in positions() {
        assert_eq!(movegen::perft(&mut state, 0), 1);
    }
}

#[test]
fn perft_one_matches_the_root_move_count() {
    for mut state in positions() {
        let expected = movegen::generate_all(&state).len() as u64;
        assert_eq!(movegen::perft(&mut state, 1), expected);
    }
}

#[test]
fn perft_divide_totals_agree_with_perft_at_every_depth() {
    for mut state in positions() {
        for depth in 1..=3u32 {
            let divide = movegen::perft_divide(&mut state, depth);
            let total: u64 = divide.iter().map(|(_, n)| n).sum();
            assert_eq!(total, movegen::perft(&mut state, depth));
        }
    }
}

#[test]
fn perft_leaves_the_position_unchanged() {
    for mut state in positions() {
        let before = state.clone();
        movegen::perft(&mut state, 3);
        assert_eq!(state, before);
    }
}

#[test]
fn perft_at_depth_two_is_at_least_one_per_root_move() {
    // Every root move contributes at least one leaf (its own subtree's
    // terminal-or-deeper count never drops to zero), so depth 2 can never
    // undercut the depth-1 root move count.
    let mut state = GameState::new();
    let root_moves = movegen::generate_all(&state).len() as u64;
    assert!(movegen::perft(&mut state, 2) >= root_moves);
}
