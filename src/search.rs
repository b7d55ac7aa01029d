//! Alpha-beta search: principal variation search with the usual
//! enhancements (null-move pruning, late move reductions, futility
//! pruning, aspiration windows) plus quiescence search at the leaves.

use std::time::Instant;

use crate::board::GameState;
use crate::eval::{evaluate, Weights, MATE_SCORE, MATE_THRESHOLD};
use crate::movegen::{self, generate_tactical};
use crate::ordering::{order_moves, OrderingContext};
use crate::sync::StopFlag;
use crate::timectl::DeadlineTimer;
use crate::tt::{Bound, TranspositionTable};
use crate::types::Move;

/// Reverse (static null move) and per-move futility margins by remaining
/// depth, indexed `[depth]` for `depth <= 3` (spec.md §4.2).
const FUTILITY_MARGINS: [i32; 4] = [0, 150, 300, 450];

/// Mutable state threaded through one search call: move-ordering heuristics,
/// node counters, and the cooperative cancellation flag. Grouping these in
/// one struct (instead of a global static per counter) is the point of
/// spec.md §9's "single value instead of global statics" flag.
pub struct SearchContext {
    pub tt: TranspositionTable,
    pub ordering: OrderingContext,
    pub weights: Weights,
    pub stop: StopFlag,
    pub nodes: u64,
    pub qnodes: u64,
    pub tt_hits: u64,
    pub beta_cutoffs: u64,
}

impl SearchContext {
    #[must_use]
    pub fn new(tt: TranspositionTable, weights: Weights, stop: StopFlag) -> Self {
        SearchContext {
            tt,
            ordering: OrderingContext::new(128),
            weights,
            stop,
            nodes: 0,
            qnodes: 0,
            tt_hits: 0,
            beta_cutoffs: 0,
        }
    }

    fn should_stop(&self) -> bool {
        self.stop.is_stopped()
    }
}

/// One completed or partial search result: the best move found, its score
/// from the root side's perspective, and the depth that produced it.
#[derive(Clone, Debug)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    pub score: i32,
    pub depth: u32,
    pub nodes: u64,
}

/// What an iterative-deepening run produced. A plain `Option<Move>` return
/// can't distinguish "no legal moves" from "stopped before any depth
/// finished" from "stopped partway, but an earlier depth did finish" — this
/// tagged result makes the three cases explicit instead of relying on a
/// sentinel value (spec.md §9 REDESIGN FLAGS).
#[derive(Clone, Debug)]
pub enum SearchOutcome {
    /// At least one depth fully completed before the search ended.
    Completed(SearchResult),
    /// The position has no legal moves: the caller already lost or won.
    NoLegalMoves,
    /// Stopped before any depth completed.
    Aborted,
}

/// Run iterative deepening from `state`'s current position up to
/// `max_depth` plies (or until `deadline`/an external stop request fires,
/// whichever first), returning the deepest completed result.
///
/// `soft_deadline`, when given, is checked only *between* depths: once it
/// passes, the driver stops requesting another depth rather than starting
/// one it likely can't finish. `deadline` is the hard cutoff that flips the
/// stop flag mid-search; `soft_deadline` should be earlier than it (the
/// caller is expected to set it around 60% of the total budget).
pub fn iterative_deepening(
    state: &mut GameState,
    ctx: &mut SearchContext,
    max_depth: u32,
    deadline: Option<Instant>,
    soft_deadline: Option<Instant>,
) -> SearchOutcome {
    let root_moves = movegen::generate_all(state);
    if root_moves.is_empty() {
        return SearchOutcome::NoLegalMoves;
    }

    let _timer = DeadlineTimer::start_at(deadline, ctx.stop.clone());

    let mut best: Option<SearchResult> = None;
    let mut prev_score: Option<i32> = None;

    for depth in 1..=max_depth {
        if ctx.should_stop() {
            break;
        }
        ctx.tt.new_generation();

        let (score, mv) = match prev_score {
            Some(ps) if depth > 2 && ps.abs() < MATE_THRESHOLD => {
                aspiration_search(state, ctx, depth, ps)
            }
            _ => root_search(state, ctx, depth, -MATE_SCORE * 2, MATE_SCORE * 2),
        };

        // `root_search`/`aspiration_search` return `None` exactly when this
        // depth was cut short by cancellation partway through (root_moves is
        // non-empty, so a `None` here never means "no legal moves"). Such a
        // score can't be trusted, so it must never overwrite the best result
        // from the last depth that actually ran to completion.
        let Some(mv) = mv else {
            break;
        };

        best = Some(SearchResult {
            best_move: Some(mv),
            score,
            depth,
            nodes: ctx.nodes + ctx.qnodes,
        });
        prev_score = Some(score);

        if score.abs() > MATE_THRESHOLD {
            break;
        }
        if soft_deadline.is_some_and(|soft| Instant::now() >= soft) {
            break;
        }
    }

    match best {
        Some(result) => SearchOutcome::Completed(result),
        None => SearchOutcome::Aborted,
    }
}

fn aspiration_search(
    state: &mut GameState,
    ctx: &mut SearchContext,
    depth: u32,
    prev_score: i32,
) -> (i32, Option<Move>) {
    let mut margin = 25i32;
    loop {
        if ctx.should_stop() {
            return (prev_score, None);
        }
        let alpha = prev_score.saturating_sub(margin);
        let beta = prev_score.saturating_add(margin);
        let (score, mv) = root_search(state, ctx, depth, alpha, beta);
        if mv.is_some() && score > alpha && score < beta {
            return (score, mv);
        }
        if margin >= 800 {
            return root_search(state, ctx, depth, -MATE_SCORE * 2, MATE_SCORE * 2);
        }
        margin = margin.saturating_mul(4);
    }
}

fn root_search(
    state: &mut GameState,
    ctx: &mut SearchContext,
    depth: u32,
    mut alpha: i32,
    beta: i32,
) -> (i32, Option<Move>) {
    let mut moves = movegen::generate_all(state);
    if moves.is_empty() {
        return (evaluate(state, &ctx.weights, 0), None);
    }
    let tt_move = ctx.tt.probe(state.zobrist, depth, alpha, beta, 0).best_move;
    order_moves(&ctx.ordering, state, &ctx.weights, &mut moves, 0, tt_move);

    let mut best_score = -MATE_SCORE * 2;
    let mut best_move = None;
    let mut interrupted = false;

    for (i, m) in moves.iter().enumerate() {
        if ctx.should_stop() {
            interrupted = true;
            break;
        }
        let undo = state.apply_move(m);
        let score = if i == 0 {
            -negamax(state, ctx, depth - 1, 1, -beta, -alpha)
        } else {
            let scout = -negamax(state, ctx, depth - 1, 1, -alpha - 1, -alpha);
            if scout > alpha && scout < beta {
                -negamax(state, ctx, depth - 1, 1, -beta, -alpha)
            } else {
                scout
            }
        };
        state.undo_move(&undo);

        if ctx.should_stop() {
            // The subtree above may have been cut short partway through, so
            // this move's score can't be trusted. Discard it rather than
            // letting a fabricated score beat an earlier move's real one.
            interrupted = true;
            break;
        }

        if score > best_score {
            best_score = score;
            best_move = Some(*m);
        }
        alpha = alpha.max(best_score);
        if alpha >= beta {
            break;
        }
    }

    if interrupted {
        return (best_score, None);
    }

    if let Some(mv) = best_move {
        let bound = if best_score <= alpha && best_score < beta {
            Bound::Upper
        } else if best_score >= beta {
            Bound::Lower
        } else {
            Bound::Exact
        };
        ctx.tt.store(state.zobrist, depth, best_score, bound, Some(mv), 0);
    }

    (best_score, best_move)
}

fn negamax(
    state: &mut GameState,
    ctx: &mut SearchContext,
    depth: u32,
    ply: u32,
    mut alpha: i32,
    mut beta: i32,
) -> i32 {
    if ctx.should_stop() {
        return 0;
    }
    ctx.nodes += 1;

    if let Some(winner) = state.winner() {
        return if winner == state.current_color() {
            MATE_SCORE - ply as i32
        } else {
            -(MATE_SCORE - ply as i32)
        };
    }

    if depth == 0 {
        return quiescence(state, ctx, ply, alpha, beta);
    }

    let original_alpha = alpha;
    let key = state.zobrist;
    let probe = ctx.tt.probe(key, depth, alpha, beta, ply);
    if let Some(score) = probe.usable_score {
        ctx.tt_hits += 1;
        return score;
    }

    let color = state.current_color();
    let in_danger = state.guard_in_danger(color);
    let static_eval = evaluate(state, &ctx.weights, ply);

    // Reverse futility pruning: if the static eval already beats beta by a
    // comfortable margin at shallow depth, assume the side to move doesn't
    // need to search further to prove it (spec.md §4.2).
    if depth as usize <= 3 && !in_danger && static_eval.abs() < MATE_THRESHOLD {
        let margin = FUTILITY_MARGINS[depth as usize];
        if static_eval - margin >= beta {
            return static_eval - margin;
        }
    }

    // Null-move pruning: skip a turn and see if the opponent is still
    // losing even with a free move. Disabled when the mover's guard is
    // already threatened, since "passing" there can hide a real threat
    // (zugzwang analogue, spec.md §4.2).
    if depth >= 3 && !in_danger && static_eval.abs() < MATE_THRESHOLD {
        let reduction = if depth >= 6 { 3 } else { 2 };
        let null_undo = state.apply_null_move();
        let null_score = -negamax(state, ctx, depth - 1 - reduction, ply + 1, -beta, -beta + 1);
        state.undo_null_move(null_undo);
        if null_score >= beta {
            let verify = -negamax(state, ctx, depth - 1, ply + 1, -beta, -alpha);
            if verify >= beta {
                ctx.tt.store(key, depth, verify, Bound::Lower, None, ply);
                return verify;
            }
        }
    }

    let mut moves = movegen::generate_all(state);
    if moves.is_empty() {
        return if in_danger {
            -(MATE_SCORE - ply as i32)
        } else {
            0
        };
    }
    order_moves(&ctx.ordering, state, &ctx.weights, &mut moves, ply as usize, probe.best_move);

    let mut best_score = -MATE_SCORE * 2;
    let mut best_move = None;

    for (i, m) in moves.iter().enumerate() {
        if ctx.should_stop() {
            break;
        }
        let is_quiet = !movegen::is_capture(state, m) && !movegen::is_winning_move(state, m);

        if is_quiet && depth as usize <= 2 && !in_danger {
            let margin = FUTILITY_MARGINS[depth as usize].max(150);
            if static_eval + margin <= alpha {
                continue;
            }
        }

        let undo = state.apply_move(m);

        let mut score;
        if i == 0 {
            score = -negamax(state, ctx, depth - 1, ply + 1, -beta, -alpha);
        } else {
            let mut reduction = 0u32;
            if is_quiet && depth >= 3 && i >= 4 {
                reduction = (1 + i as u32 / 6).min(depth.saturating_sub(2));
            }
            let reduced_depth = depth - 1 - reduction;
            score = -negamax(state, ctx, reduced_depth, ply + 1, -alpha - 1, -alpha);
            if score > alpha && (reduction > 0 || score < beta) {
                score = -negamax(state, ctx, depth - 1, ply + 1, -beta, -alpha);
            }
        }

        state.undo_move(&undo);

        if score > best_score {
            best_score = score;
            best_move = Some(*m);
        }
        alpha = alpha.max(best_score);
        if alpha >= beta {
            ctx.beta_cutoffs += 1;
            if is_quiet {
                ctx.ordering.record_killer(ply as usize, *m);
                ctx.ordering.record_history(color, m, (depth * depth) as i32);
            }
            break;
        }
    }

    let bound = if best_score <= original_alpha {
        Bound::Upper
    } else if best_score >= beta {
        Bound::Lower
    } else {
        Bound::Exact
    };
    ctx.tt.store(key, depth, best_score, bound, best_move, ply);

    best_score
}

/// Search only tactical moves until the position is "quiet", avoiding the
/// horizon effect of stopping a full-depth search mid-capture-sequence.
fn quiescence(state: &mut GameState, ctx: &mut SearchContext, ply: u32, mut alpha: i32, beta: i32) -> i32 {
    ctx.qnodes += 1;
    if ctx.should_stop() {
        return 0;
    }

    let stand_pat = evaluate(state, &ctx.weights, ply);
    if stand_pat >= beta {
        return stand_pat;
    }
    alpha = alpha.max(stand_pat);

    let mut tactical = generate_tactical(state);
    // Delta pruning: a capture that can't possibly close the gap to alpha
    // even with a generous safety margin isn't worth searching.
    const DELTA_MARGIN: i32 = 200;
    let weights = ctx.weights;
    tactical.retain(|m| {
        if !movegen::is_capture(state, m) {
            return true;
        }
        let gain = crate::ordering::mvv_lva_score(state, &weights, m).max(0);
        stand_pat + gain + DELTA_MARGIN > alpha
    });
    order_moves(&ctx.ordering, state, &ctx.weights, &mut tactical, ply as usize, None);

    let mut best_score = stand_pat;
    for m in &tactical {
        if ctx.should_stop() {
            break;
        }
        let undo = state.apply_move(m);
        let score = -quiescence(state, ctx, ply + 1, -beta, -alpha);
        state.undo_move(&undo);

        if score > best_score {
            best_score = score;
        }
        alpha = alpha.max(best_score);
        if alpha >= beta {
            break;
        }
    }

    best_score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::GameState;

    fn fresh_ctx() -> SearchContext {
        SearchContext::new(TranspositionTable::new(1), Weights::default(), StopFlag::new())
    }

    #[test]
    fn finds_the_immediate_winning_castle_push() {
        let mut state = GameState::from_fen("RG6/7/7/7/7/3BG3/7 b");
        let mut ctx = fresh_ctx();
        match iterative_deepening(&mut state, &mut ctx, 3, None, None) {
            SearchOutcome::Completed(result) => {
                let mv = result.best_move.expect("a move should be found");
                assert!(movegen::is_winning_move(&state, &mv));
            }
            other => panic!("expected a completed search, got {other:?}"),
        }
    }

    #[test]
    fn finds_the_immediate_guard_capture() {
        let mut state = GameState::from_fen("7/7/7/3BG3/3RG3/7/7 r");
        let mut ctx = fresh_ctx();
        match iterative_deepening(&mut state, &mut ctx, 3, None, None) {
            SearchOutcome::Completed(result) => {
                assert!(result.score.abs() > MATE_THRESHOLD);
            }
            other => panic!("expected a completed search, got {other:?}"),
        }
    }

    #[test]
    fn reports_no_legal_moves_when_the_guard_is_already_gone() {
        let mut state = GameState::from_fen("7/7/7/3RG3/7/7/7 b");
        let mut ctx = fresh_ctx();
        match iterative_deepening(&mut state, &mut ctx, 2, None, None) {
            SearchOutcome::NoLegalMoves => (),
            other => panic!("expected NoLegalMoves, got {other:?}"),
        }
    }

    #[test]
    fn an_already_stopped_flag_aborts_before_completing_a_depth() {
        let mut state = GameState::new();
        let stop = StopFlag::stopped();
        let mut ctx = SearchContext::new(TranspositionTable::new(1), Weights::default(), stop);
        match iterative_deepening(&mut state, &mut ctx, 5, None, None) {
            SearchOutcome::Aborted => (),
            other => panic!("expected Aborted, got {other:?}"),
        }
    }
}
