//! Static position evaluation.
//!
//! A single flat function parameterized by a plain-data `Weights` struct —
//! not an evaluator class hierarchy (spec.md §9 REDESIGN FLAGS). Score is
//! always returned from the perspective of the side to move, the
//! convention `search::negamax` expects at every ply (DESIGN.md's
//! resolution of spec.md's "evaluation sign convention" open question).

use crate::bitboard::{self, BitIter};
use crate::board::{castle_square, GameState};
use crate::movegen;
use crate::types::{Color, Square};

/// Score magnitude used for a detected win; shrunk by ply so the search
/// prefers the shortest forced win (spec.md §4.2, point 5).
pub const MATE_SCORE: i32 = 100_000;

/// Any score whose absolute value exceeds this threshold is a mate score,
/// not a material/positional one. Used by `search` and the UCI-like
/// `protocol` module to decide whether to report "mate in N".
pub const MATE_THRESHOLD: i32 = MATE_SCORE - 1000;

/// Plain-data evaluation weights. Every constant the spec allows ("there is
/// no learned model") lives here instead of scattered through the
/// function body, so tuning or testing a different weight set doesn't
/// require touching the evaluation logic itself.
#[derive(Clone, Copy, Debug)]
pub struct Weights {
    pub guard_value: i32,
    pub tower_unit_value: i32,
    pub mobility_bonus: i32,
    pub forward_bonus: i32,
    pub central_bonus: i32,
    pub guard_advance_bonus: i32,
    pub guard_danger_penalty: i32,
}

impl Default for Weights {
    fn default() -> Self {
        Weights {
            guard_value: 1000,
            tower_unit_value: 100,
            mobility_bonus: 4,
            forward_bonus: 2,
            central_bonus: 6,
            guard_advance_bonus: 10,
            guard_danger_penalty: 80,
        }
    }
}

/// Material value of a tower stack of the given height, used by move
/// ordering's MVV/LVA term (spec.md §4.3) as well as the evaluator.
#[inline]
#[must_use]
pub fn tower_value(weights: &Weights, height: u8) -> i32 {
    weights.tower_unit_value * height as i32
}

#[inline]
#[must_use]
pub fn guard_value(weights: &Weights) -> i32 {
    weights.guard_value
}

/// Static heuristic score of `state` from the perspective of the side to
/// move. Terminal positions return a mate magnitude shrunk by `ply`
/// (spec.md §4.2, point 5); `ply` should be the current search depth from
/// the root.
#[must_use]
pub fn evaluate(state: &GameState, weights: &Weights, ply: u32) -> i32 {
    if let Some(winner) = state.winner() {
        let mate_score = MATE_SCORE - ply as i32;
        return if winner == state.current_color() {
            mate_score
        } else {
            -mate_score
        };
    }

    let mover = state.current_color();
    let enemy = mover.opposite();
    material_and_position(state, weights, mover) - material_and_position(state, weights, enemy)
}

fn material_and_position(state: &GameState, weights: &Weights, color: Color) -> i32 {
    let mut score = 0i32;

    if let Some(guard_sq) = state.guard_square(color) {
        score += guard_value(weights);
        score += guard_advancement(weights, color, guard_sq);
        if bitboard::CENTRAL_MASK & guard_sq.bit() != 0 {
            score += weights.central_bonus;
        }
        if state.guard_in_danger(color) {
            score -= weights.guard_danger_penalty;
        }
    }

    for sq_idx in BitIter(state.tower_mask(color)) {
        let sq = Square::new(sq_idx);
        let height = state.height_at(color, sq);
        score += tower_value(weights, height);
        if bitboard::CENTRAL_MASK & sq.bit() != 0 {
            score += weights.central_bonus;
        }
        score += forward_bonus(weights, color, sq);
    }

    // Mobility / activity: a small bonus per legal move (spec.md §4.2,
    // point 2). Only counted for the mover's own turn to keep the cost of
    // this term to one `generate_all` call per `evaluate`; the opponent's
    // mobility is approximated by symmetry at the caller (`evaluate`
    // subtracts the two `material_and_position` calls, and this term only
    // ever runs for the side whose turn it actually is).
    if color == state.current_color() {
        score += weights.mobility_bonus * movegen::generate_all(state).len() as i32;
    }

    score
}

fn guard_advancement(weights: &Weights, color: Color, guard_sq: Square) -> i32 {
    let start_distance = Square::from_rank_file(if color == Color::Red { 0 } else { 6 }, 3)
        .manhattan(castle_square(color));
    let remaining = guard_sq.manhattan(castle_square(color));
    let progress = start_distance.saturating_sub(remaining) as i32;
    weights.guard_advance_bonus * progress
}

fn forward_bonus(weights: &Weights, color: Color, sq: Square) -> i32 {
    let rank = sq.rank() as i32;
    let progress = match color {
        Color::Red => rank,
        Color::Blue => 6 - rank,
    };
    weights.forward_bonus * progress
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_score_exceeds_any_material_score() {
        let mut state = GameState::from_fen("7/7/7/3BG3/3RG3/7/7 r");
        state.blue_guard = 0;
        let weights = Weights::default();
        let score = evaluate(&state, &weights, 0);
        assert!(score > MATE_THRESHOLD);
    }

    #[test]
    fn shorter_mate_scores_higher() {
        let mut state = GameState::from_fen("7/7/7/3BG3/3RG3/7/7 r");
        state.blue_guard = 0;
        let weights = Weights::default();
        let near = evaluate(&state, &weights, 1);
        let far = evaluate(&state, &weights, 5);
        assert!(near > far);
    }

    #[test]
    fn symmetric_position_scores_zero_mobility_aside() {
        let state = GameState::new();
        let weights = Weights {
            mobility_bonus: 0,
            ..Weights::default()
        };
        assert_eq!(evaluate(&state, &weights, 0), 0);
    }

    #[test]
    fn extra_material_improves_the_score() {
        let base = GameState::new();
        let mut heavier = base.clone();
        heavier.red_heights[Square::from_rank_file(1, 0).index()] = 3;
        let weights = Weights::default();
        assert!(evaluate(&heavier, &weights, 0) > evaluate(&base, &weights, 0));
    }
}
