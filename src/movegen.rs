//! Legal move enumeration for the side to move.
//!
//! There is no check/pin concept in Guard & Towers (spec.md §4.1): a guard
//! move or tower slide that lands on the enemy guard captures it outright,
//! the same as landing on any other enemy piece. `generate_all` therefore
//! never needs to filter moves for "leaves my guard attacked" — the search
//! simply treats guard capture as a terminal evaluation one ply later.

use crate::bitboard::{self, BitIter};
use crate::board::{castle_square, GameState};
use crate::types::{Move, PieceKind, Square};

pub type MoveList = Vec<Move>;

/// All legal moves for the side to move.
#[must_use]
pub fn generate_all(state: &GameState) -> MoveList {
    let mut moves = Vec::with_capacity(32);
    generate_into(state, &mut moves);
    moves
}

/// Same as `generate_all` but reuses `out`'s allocation (hot-path variant
/// used by search, mirroring the teacher's `generate_moves_into`).
pub fn generate_into(state: &GameState, out: &mut MoveList) {
    out.clear();
    let color = state.current_color();

    if let Some(guard_sq) = state.guard_square(color) {
        generate_guard_moves(state, guard_sq, out);
    }

    for sq_idx in BitIter(state.tower_mask(color)) {
        let from = Square::new(sq_idx);
        let height = state.height_at(color, from);
        generate_tower_moves(state, from, height, out);
    }
}

fn generate_guard_moves(state: &GameState, from: Square, out: &mut MoveList) {
    let color = state.current_color();
    for dir_idx in 0..4 {
        let Some(next) = bitboard::ORTHOGONAL_STEPS[from.index()][dir_idx] else {
            continue;
        };
        let to = Square::new(next);
        match state.piece_at(to) {
            Some((occ_color, _, _)) if occ_color == color => continue,
            _ => out.push(Move::new(from, to, 1)),
        }
    }
}

fn generate_tower_moves(state: &GameState, from: Square, height: u8, out: &mut MoveList) {
    let color = state.current_color();
    for dir_idx in 0..4 {
        let mut cur = from;
        for step in 1..=height {
            let Some(next) = bitboard::ORTHOGONAL_STEPS[cur.index()][dir_idx] else {
                break;
            };
            cur = Square::new(next);
            match state.piece_at(cur) {
                None => {
                    out.push(Move::new(from, cur, step));
                }
                Some((occ_color, occ_kind, occ_height)) => {
                    let legal = if occ_color == color {
                        true // stacking onto a friendly tower
                    } else {
                        match occ_kind {
                            PieceKind::Guard => true,
                            PieceKind::Tower => step >= occ_height,
                        }
                    };
                    if legal {
                        out.push(Move::new(from, cur, step));
                    }
                    break; // path is blocked either way
                }
            }
        }
    }
}

/// Whether `m` captures a piece of either color.
#[must_use]
pub fn is_capture(state: &GameState, m: &Move) -> bool {
    state.piece_at(m.to).is_some_and(|(c, _, _)| c != state.current_color())
}

/// Whether `m` is a guard move landing on the enemy guard or on the
/// mover's own castle — an immediately winning move (spec.md §4.3, "winning
/// moves").
#[must_use]
pub fn is_winning_move(state: &GameState, m: &Move) -> bool {
    let color = state.current_color();
    let Some(guard_sq) = state.guard_square(color) else {
        return false;
    };
    if m.from != guard_sq {
        return false;
    }
    if m.to == castle_square(color) {
        return true;
    }
    matches!(
        state.piece_at(m.to),
        Some((c, PieceKind::Guard, _)) if c != color
    )
}

/// Tactical moves only, for quiescence search: captures, winning moves, and
/// moves that put the enemy guard in immediate danger (spec.md §4.5).
/// Large-amount tower moves are not included — spec.md marks that
/// extension as optional and it adds little on a 7x7 board.
#[must_use]
pub fn generate_tactical(state: &GameState) -> MoveList {
    let color = state.current_color();
    let enemy = color.opposite();
    let quiet_threatens_guard = |m: &Move| -> bool {
        let next = state.apply_move_copy(m);
        next.guard_in_danger(enemy)
    };

    generate_all(state)
        .into_iter()
        .filter(|m| is_capture(state, m) || is_winning_move(state, m) || quiet_threatens_guard(m))
        .collect()
}

/// Count leaf positions `depth` plies deep from `state`, make/unmake style.
/// Used by the `gat_perft` binary and by tests to cross-check that move
/// generation and apply/undo stay consistent across many positions.
#[must_use]
pub fn perft(state: &mut GameState, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    if state.is_terminal() {
        return 1;
    }
    let moves = generate_all(state);
    if depth == 1 {
        return moves.len() as u64;
    }
    let mut nodes = 0u64;
    for m in &moves {
        let undo = state.apply_move(m);
        nodes += perft(state, depth - 1);
        state.undo_move(&undo);
    }
    nodes
}

/// Per-root-move breakdown of `perft`, used by `gat_perft`'s divide mode.
#[must_use]
pub fn perft_divide(state: &mut GameState, depth: u32) -> Vec<(Move, u64)> {
    let moves = generate_all(state);
    let mut results = Vec::with_capacity(moves.len());
    for m in &moves {
        let undo = state.apply_move(m);
        let nodes = if depth == 0 { 1 } else { perft(state, depth - 1) };
        state.undo_move(&undo);
        results.push((*m, nodes));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Color;

    #[test]
    fn guard_cannot_step_onto_own_tower() {
        let state = GameState::new();
        let guard_sq = state.guard_square(Color::Red).unwrap();
        let moves = generate_all(&state);
        for m in &moves {
            if m.from == guard_sq {
                assert_ne!(
                    state.piece_at(m.to).map(|(c, _, _)| c),
                    Some(Color::Red)
                );
            }
        }
    }

    #[test]
    fn every_move_is_purely_orthogonal_with_no_rank_wrap() {
        let state = GameState::from_fen("7/7/7/7/7/7/r7RG4BG b");
        assert!(!generate_all(&state).is_empty());
        for m in generate_all(&state) {
            let same_rank = m.from.rank() == m.to.rank();
            let same_file = m.from.file() == m.to.file();
            // Exactly one of rank/file changes: no diagonal moves.
            assert_ne!(same_rank, same_file);
        }
    }

    #[test]
    fn tower_move_cannot_exceed_its_height() {
        let state = GameState::new();
        for m in generate_all(&state) {
            if let Some((_, PieceKind::Tower, height)) = state.piece_at(m.from) {
                assert!(m.amount <= height);
            }
        }
    }

    #[test]
    fn guard_capture_is_generated_in_e2() {
        let state = GameState::from_fen("7/7/7/3BG3/3RG3/7/7 r");
        let moves = generate_all(&state);
        assert!(moves
            .iter()
            .any(|m| is_winning_move(&state, m) && is_capture(&state, m)));
    }

    #[test]
    fn winning_castle_push_is_generated_in_e3() {
        // Blue guard one step from its own winning square with the square
        // itself empty: pushing onto it should be flagged as a win.
        let state = GameState::from_fen("RG6/7/7/7/7/3BG3/7 b");
        let moves = generate_all(&state);
        assert!(moves.iter().any(|m| is_winning_move(&state, m)));
    }

    #[test]
    fn tactical_moves_are_a_subset_of_all_moves() {
        let state = GameState::from_fen("7/7/7/3b33/7/3RG3/7 r");
        let all = generate_all(&state);
        for m in generate_tactical(&state) {
            assert!(all.contains(&m));
        }
    }

    #[test]
    fn perft_depth_one_matches_move_count() {
        let mut state = GameState::new();
        let moves = generate_all(&state);
        assert_eq!(perft(&mut state, 1), moves.len() as u64);
    }

    #[test]
    fn perft_divide_sums_to_the_same_total_as_perft() {
        let mut state = GameState::new();
        let divide = perft_divide(&mut state, 2);
        let total: u64 = divide.iter().map(|(_, n)| n).sum();
        assert_eq!(total, perft(&mut state, 2));
    }
}
