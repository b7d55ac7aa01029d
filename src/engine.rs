//! Public engine facade.
//!
//! `Engine` owns the position, transposition table and search statistics
//! behind one value instead of the free functions and module-level
//! statics a UCI engine usually grows into (spec.md §9 REDESIGN FLAGS).
//! `protocol::run_loop` and the `gat_console`/`gat_perft` binaries are the
//! only things that touch this type from outside the crate.

use std::time::{Duration, Instant};

use crate::board::GameState;
use crate::error::EngineError;
use crate::eval::Weights;
use crate::search::{self, SearchContext, SearchOutcome};
use crate::sync::StopFlag;
use crate::tt::TranspositionTable;
use crate::types::Move;

/// An opening book: a cheap lookup consulted before falling back to search.
/// Guard & Towers has no published opening theory, so `NullBook` is the
/// only implementation shipped, but the seam lets an embedder plug one in
/// without touching `Engine`.
pub trait OpeningBook: Send {
    fn lookup(&self, state: &GameState) -> Option<Move>;
}

/// The default book: always defers to search.
#[derive(Default)]
pub struct NullBook;

impl OpeningBook for NullBook {
    fn lookup(&self, _state: &GameState) -> Option<Move> {
        None
    }
}

/// How a `find_best*` call should decide when to stop searching.
#[derive(Clone, Copy, Debug)]
pub enum SearchBudget {
    Depth(u32),
    Time(Duration),
}

/// Between iterations, the driver stops requesting another depth once this
/// fraction of a time budget is spent, rather than starting a depth it is
/// unlikely to finish before the hard deadline cuts it off mid-search.
const SOFT_BUDGET_FRACTION: f64 = 0.6;

/// Snapshot of the last completed search, exposed for `protocol`'s `stats`
/// command and for callers instrumenting engine performance.
#[derive(Clone, Copy, Debug, Default)]
pub struct Stats {
    pub nodes: u64,
    pub qnodes: u64,
    pub tt_hits: u64,
    pub beta_cutoffs: u64,
    pub last_depth: u32,
    pub last_score: i32,
}

pub struct Engine {
    state: GameState,
    tt: TranspositionTable,
    weights: Weights,
    stop: StopFlag,
    book: Box<dyn OpeningBook>,
    stats: Stats,
}

impl Engine {
    /// A fresh engine on the default starting position, a 64 MiB
    /// transposition table, and no opening book.
    #[must_use]
    pub fn new() -> Self {
        Engine {
            state: GameState::new(),
            tt: TranspositionTable::new(64),
            weights: Weights::default(),
            stop: StopFlag::new(),
            book: Box::new(NullBook),
            stats: Stats::default(),
        }
    }

    #[must_use]
    pub fn with_book(book: Box<dyn OpeningBook>) -> Self {
        let mut engine = Self::new();
        engine.book = book;
        engine
    }

    pub fn set_position(&mut self, fen: &str) -> Result<(), EngineError> {
        self.state = GameState::try_from_fen(fen)?;
        log::debug!("position set: {}", self.state.to_fen());
        Ok(())
    }

    #[must_use]
    pub fn position_fen(&self) -> String {
        self.state.to_fen()
    }

    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Apply `m` on the current position, accepting it only if
    /// `movegen::generate_all` actually produces it.
    pub fn make_move(&mut self, m: Move) -> Result<(), EngineError> {
        let legal = crate::movegen::generate_all(&self.state);
        if !legal.contains(&m) {
            return Err(EngineError::InvalidMove(format!(
                "{m} is not legal in {}",
                self.state.to_fen()
            )));
        }
        self.state.apply_move(&m);
        Ok(())
    }

    /// Reset to the default starting position, clearing the transposition
    /// table and search statistics (but not the opening book).
    pub fn reset(&mut self) {
        self.state = GameState::new();
        self.tt.clear();
        self.stop.reset();
        self.stats = Stats::default();
    }

    /// Request an in-progress search stop at the next safe point.
    pub fn stop(&self) {
        self.stop.stop();
    }

    #[must_use]
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Search the current position under `budget`, returning the engine's
    /// best move if one was found. Consults the opening book first.
    pub fn find_best(&mut self, budget: SearchBudget) -> Result<SearchOutcome, EngineError> {
        if let Some(mv) = self.book.lookup(&self.state) {
            log::debug!("opening book hit: {mv}");
            return Ok(SearchOutcome::Completed(search::SearchResult {
                best_move: Some(mv),
                score: 0,
                depth: 0,
                nodes: 0,
            }));
        }

        self.stop.reset();
        let (max_depth, deadline, soft_deadline) = match budget {
            SearchBudget::Depth(d) => (d, None, None),
            SearchBudget::Time(duration) => {
                let now = Instant::now();
                (
                    u32::MAX,
                    Some(now + duration),
                    Some(now + duration.mul_f64(SOFT_BUDGET_FRACTION)),
                )
            }
        };

        let mut ctx = SearchContext::new(
            std::mem::replace(&mut self.tt, TranspositionTable::new(1)),
            self.weights,
            self.stop.clone(),
        );

        log::debug!(
            "searching {} (budget={:?})",
            self.state.to_fen(),
            budget
        );
        let outcome =
            search::iterative_deepening(&mut self.state, &mut ctx, max_depth, deadline, soft_deadline);

        self.stats = Stats {
            nodes: ctx.nodes,
            qnodes: ctx.qnodes,
            tt_hits: ctx.tt_hits,
            beta_cutoffs: ctx.beta_cutoffs,
            last_depth: match &outcome {
                SearchOutcome::Completed(r) => r.depth,
                _ => 0,
            },
            last_score: match &outcome {
                SearchOutcome::Completed(r) => r.score,
                _ => 0,
            },
        };
        self.tt = ctx.tt;

        log::debug!(
            "search finished: depth={} score={} nodes={}",
            self.stats.last_depth,
            self.stats.last_score,
            self.stats.nodes + self.stats.qnodes
        );

        Ok(outcome)
    }

    pub fn find_best_depth(&mut self, depth: u32) -> Result<SearchOutcome, EngineError> {
        self.find_best(SearchBudget::Depth(depth))
    }

    pub fn find_best_time(&mut self, time: Duration) -> Result<SearchOutcome, EngineError> {
        self.find_best(SearchBudget::Time(time))
    }

    /// Search for `budget_ms` milliseconds and return a move directly
    /// instead of the `SearchOutcome` the rest of this type works in terms
    /// of: `Some` whenever the position has at least one legal move, `None`
    /// only when it has none. An aborted search (the hard deadline fired
    /// before any depth completed) falls back to the first legal move
    /// rather than surfacing `None` for a position that isn't actually lost.
    pub fn find_best_move(&mut self, budget_ms: u64) -> Option<Move> {
        match self
            .find_best(SearchBudget::Time(Duration::from_millis(budget_ms)))
            .expect("find_best never fails for a time budget")
        {
            SearchOutcome::Completed(result) => result.best_move,
            SearchOutcome::NoLegalMoves => None,
            SearchOutcome::Aborted => {
                crate::movegen::generate_all(&self.state).into_iter().next()
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
