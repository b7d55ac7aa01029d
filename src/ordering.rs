//! Move ordering heuristics: killer moves, history, and MVV/LVA.
//!
//! Good move ordering is what makes alpha-beta pruning effective; search.rs
//! probes these tables to sort moves before searching them, cutting off
//! branches earlier on a well-ordered tree.

use crate::board::GameState;
use crate::eval::{guard_value, tower_value, Weights};
use crate::movegen::is_capture;
use crate::types::{Color, Move, NUM_SQUARES};

const HISTORY_SIZE: usize = 2 * NUM_SQUARES * NUM_SQUARES;

/// History scores are halved once any entry would overflow this magnitude,
/// keeping the table's relative ordering information instead of letting it
/// saturate into a flat plateau (spec.md §4.3).
const HISTORY_CAP: i32 = 1 << 24;

/// Per-depth killer slots plus a from/to/side history table, threaded
/// through one iterative-deepening run.
pub struct OrderingContext {
    /// `killers[ply][slot]`
    killers: Vec<[Option<Move>; 2]>,
    /// indexed by `history_index(color, from, to)`
    history: Vec<i32>,
}

impl OrderingContext {
    #[must_use]
    pub fn new(max_ply: usize) -> Self {
        OrderingContext {
            killers: vec![[None, None]; max_ply + 1],
            history: vec![0; HISTORY_SIZE],
        }
    }

    /// Reset killer slots and halve history between searches from different
    /// root positions, the way a fresh game phase should not be biased by
    /// the previous position's heuristics.
    pub fn clear_killers(&mut self) {
        for slot in &mut self.killers {
            *slot = [None, None];
        }
    }

    pub fn record_killer(&mut self, ply: usize, m: Move) {
        let Some(slot) = self.killers.get_mut(ply) else {
            return;
        };
        if slot[0] == Some(m) {
            return;
        }
        slot[1] = slot[0];
        slot[0] = Some(m);
    }

    #[must_use]
    pub fn killers_at(&self, ply: usize) -> [Option<Move>; 2] {
        self.killers.get(ply).copied().unwrap_or([None, None])
    }

    pub fn record_history(&mut self, color: Color, m: &Move, delta: i32) {
        let idx = history_index(color, m);
        self.history[idx] = self.history[idx].saturating_add(delta);
        if self.history[idx].unsigned_abs() as i64 > HISTORY_CAP as i64 {
            for score in &mut self.history {
                *score /= 2;
            }
        }
    }

    #[must_use]
    pub fn history_score(&self, color: Color, m: &Move) -> i32 {
        self.history[history_index(color, m)]
    }
}

fn history_index(color: Color, m: &Move) -> usize {
    let side = color.index();
    let from = m.from.index();
    let to = m.to.index();
    (side * NUM_SQUARES + from) * NUM_SQUARES + to
}

/// Sort `moves` in place, best-guess-first: the transposition table's move,
/// then winning moves, then captures by MVV/LVA, then killers, then
/// history, with the remaining quiet moves left in their generated order.
pub fn order_moves(
    ctx: &OrderingContext,
    state: &GameState,
    weights: &Weights,
    moves: &mut [Move],
    ply: usize,
    tt_move: Option<Move>,
) {
    let killers = ctx.killers_at(ply);
    let color = state.current_color();

    moves.sort_by_key(|m| {
        if Some(*m) == tt_move {
            return i64::MIN;
        }
        let mut score = 0i64;
        if crate::movegen::is_winning_move(state, m) {
            score -= 900_000;
        }
        if is_capture(state, m) {
            score -= 500_000 + i64::from(mvv_lva_score(state, weights, m));
        }
        if killers[0] == Some(*m) {
            score -= 9_000;
        } else if killers[1] == Some(*m) {
            score -= 8_000;
        }
        score -= i64::from(ctx.history_score(color, m));
        score
    });
}

/// MVV/LVA score for a capturing move: favors taking a high-value victim
/// with a low-value attacker.
#[must_use]
pub fn mvv_lva_score(state: &GameState, weights: &Weights, m: &Move) -> i32 {
    let Some((_, victim_kind, victim_height)) = state.piece_at(m.to) else {
        return 0;
    };
    let victim_value = match victim_kind {
        crate::types::PieceKind::Guard => guard_value(weights),
        crate::types::PieceKind::Tower => tower_value(weights, victim_height),
    };
    let attacker_value = match state.piece_at(m.from) {
        Some((_, crate::types::PieceKind::Guard, _)) => guard_value(weights),
        Some((_, crate::types::PieceKind::Tower, h)) => tower_value(weights, h),
        None => 0,
    };
    victim_value * 10 - attacker_value
}
