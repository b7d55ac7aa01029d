//! Line-oriented text protocol for driving `Engine` from a terminal or a
//! parent process over stdio. Not UCI — Guard & Towers has no existing
//! wire protocol to be compatible with — but laid out the way the
//! teacher's `uci` module structures its command loop: one line in, one
//! or more response lines out, an `Info` record for search progress.
//!
//! Commands:
//!   position <fen> | position startpos
//!   go depth <n>
//!   go movetime <ms>
//!   move <from>-<to>-<amount>
//!   stats
//!   reset
//!   quit

use std::io::{BufRead, Write};
use std::time::Duration;

use crate::engine::Engine;
use crate::types;

/// One progress update emitted per completed iterative-deepening depth.
#[derive(Clone, Debug)]
pub struct Info {
    pub depth: u32,
    pub nodes: u64,
    pub score_cp: Option<i32>,
    pub score_mate: Option<i32>,
    pub best_move: Option<String>,
}

impl Info {
    #[must_use]
    pub fn to_line(&self) -> String {
        let mut parts = vec![format!("depth {}", self.depth), format!("nodes {}", self.nodes)];
        if let Some(cp) = self.score_cp {
            parts.push(format!("score cp {cp}"));
        }
        if let Some(mate) = self.score_mate {
            parts.push(format!("score mate {mate}"));
        }
        if let Some(ref mv) = self.best_move {
            parts.push(format!("pv {mv}"));
        }
        format!("info {}", parts.join(" "))
    }
}

/// Run the command loop against `engine`, reading from `input` and writing
/// to `output` until `quit` or end of input.
pub fn run_loop<R: BufRead, W: Write>(engine: &mut Engine, input: R, mut output: W) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = parts.first() else {
            continue;
        };

        match command {
            "quit" => break,
            "reset" => {
                engine.reset();
                let _ = writeln!(output, "ok");
            }
            "position" => handle_position(engine, &parts, &mut output),
            "move" => handle_move(engine, &parts, &mut output),
            "go" => handle_go(engine, &parts, &mut output),
            "stats" => handle_stats(engine, &mut output),
            other => {
                let _ = writeln!(output, "error: unknown command '{other}'");
            }
        }
    }
}

fn handle_position<W: Write>(engine: &mut Engine, parts: &[&str], output: &mut W) {
    if parts.get(1) == Some(&"startpos") {
        engine.reset();
        let _ = writeln!(output, "ok");
        return;
    }
    let fen = parts[1..].join(" ");
    match engine.set_position(&fen) {
        Ok(()) => {
            let _ = writeln!(output, "ok");
        }
        Err(e) => {
            log::warn!("rejected position command: {e}");
            let _ = writeln!(output, "error: {e}");
        }
    }
}

fn handle_move<W: Write>(engine: &mut Engine, parts: &[&str], output: &mut W) {
    let Some(move_str) = parts.get(1) else {
        let _ = writeln!(output, "error: move requires an argument");
        return;
    };
    let Some(mv) = types::parse_move(move_str) else {
        let _ = writeln!(output, "error: could not parse move '{move_str}'");
        return;
    };
    match engine.make_move(mv) {
        Ok(()) => {
            let _ = writeln!(output, "ok");
        }
        Err(e) => {
            let _ = writeln!(output, "error: {e}");
        }
    }
}

fn handle_go<W: Write>(engine: &mut Engine, parts: &[&str], output: &mut W) {
    let outcome = if parts.get(1) == Some(&"depth") {
        let depth: u32 = parts.get(2).and_then(|s| s.parse().ok()).unwrap_or(4);
        engine.find_best_depth(depth)
    } else if parts.get(1) == Some(&"movetime") {
        let ms: u64 = parts.get(2).and_then(|s| s.parse().ok()).unwrap_or(1000);
        engine.find_best_time(Duration::from_millis(ms))
    } else {
        let _ = writeln!(output, "error: go requires 'depth <n>' or 'movetime <ms>'");
        return;
    };

    match outcome {
        Ok(crate::search::SearchOutcome::Completed(result)) => {
            let best = result.best_move.map(|m| m.to_string());
            let (score_cp, score_mate) = if result.score.abs() > crate::eval::MATE_THRESHOLD {
                let mate_in = (crate::eval::MATE_SCORE - result.score.abs() + 1) / 2;
                (None, Some(if result.score > 0 { mate_in } else { -mate_in }))
            } else {
                (Some(result.score), None)
            };
            let info = Info {
                depth: result.depth,
                nodes: result.nodes,
                score_cp,
                score_mate,
                best_move: best.clone(),
            };
            let _ = writeln!(output, "{}", info.to_line());
            let _ = writeln!(output, "bestmove {}", best.unwrap_or_else(|| "none".to_string()));
        }
        Ok(crate::search::SearchOutcome::NoLegalMoves) => {
            let _ = writeln!(output, "bestmove none");
        }
        Ok(crate::search::SearchOutcome::Aborted) => {
            let _ = writeln!(output, "bestmove none");
        }
        Err(e) => {
            let _ = writeln!(output, "error: {e}");
        }
    }
}

fn handle_stats<W: Write>(engine: &Engine, output: &mut W) {
    let stats = engine.stats();
    let _ = writeln!(
        output,
        "nodes {} qnodes {} tt_hits {} cutoffs {} depth {} score {}",
        stats.nodes, stats.qnodes, stats.tt_hits, stats.beta_cutoffs, stats.last_depth, stats.last_score
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(commands: &str) -> String {
        let mut engine = Engine::new();
        let mut out = Vec::new();
        run_loop(&mut engine, Cursor::new(commands.as_bytes()), &mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn position_startpos_then_stats_reports_zero_nodes() {
        let output = run("position startpos\nstats\nquit\n");
        assert!(output.contains("ok"));
        assert!(output.contains("nodes 0"));
    }

    #[test]
    fn go_depth_reports_a_bestmove_line() {
        let output = run("position startpos\ngo depth 2\nquit\n");
        assert!(output.contains("bestmove"));
    }

    #[test]
    fn rejects_a_malformed_position_command() {
        let output = run("position nonsense\nquit\n");
        assert!(output.contains("error"));
    }

    #[test]
    fn unknown_command_reports_an_error() {
        let output = run("frobnicate\nquit\n");
        assert!(output.contains("error: unknown command"));
    }
}
