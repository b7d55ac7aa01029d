//! Engine error taxonomy.
//!
//! A single tagged enum instead of panics or `Box<dyn Error>` strings
//! scattered at call sites (spec.md §9 REDESIGN FLAGS): callers that hand
//! the engine untrusted input (a FEN string, a move string, a malformed
//! search request) get a typed result back.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A FEN string failed to parse, or parsed into a structurally invalid
    /// position (duplicate guards, overlapping pieces, wrong segment
    /// count).
    InvalidPosition(String),
    /// A move string failed to parse, or named a move not present in
    /// `movegen::generate_all` for the current position.
    InvalidMove(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidPosition(s) => write!(f, "invalid position: {s}"),
            EngineError::InvalidMove(s) => write!(f, "invalid move: {s}"),
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_the_detail_string() {
        let err = EngineError::InvalidPosition("bad segment count".to_string());
        assert!(err.to_string().contains("bad segment count"));
    }
}
