//! `GameState`: bitboard position representation, apply/undo, FEN codec and
//! terminal detection for Guard & Towers.

use crate::types::{
    Capture, Color, Move, NullUndo, PieceKind, Square, UndoInfo, BOARD_SIZE, NUM_SQUARES,
};
use crate::zobrist;

/// A Guard & Towers position. Two 49-bit guard masks (popcount 0 or 1
/// each), two 49-bit tower masks, and per-square heights for the towers.
#[derive(Clone, Debug)]
pub struct GameState {
    pub red_guard: u64,
    pub blue_guard: u64,
    pub red_towers: u64,
    pub blue_towers: u64,
    pub red_heights: [u8; NUM_SQUARES],
    pub blue_heights: [u8; NUM_SQUARES],
    pub red_to_move: bool,
    pub zobrist: u64,
}

/// The two goal squares, each a d-file endpoint (spec.md's Open Question:
/// which end belongs to which color is not specified — see DESIGN.md for
/// the convention fixed here).
#[inline]
#[must_use]
pub fn castle_square(color: Color) -> Square {
    match color {
        Color::Red => Square::from_rank_file(6, 3),
        Color::Blue => Square::from_rank_file(0, 3),
    }
}

impl GameState {
    /// A small, internally consistent starting position: each guard on its
    /// own castle square, flanked by a rank of height-1 towers. The spec
    /// leaves the starting layout unspecified (FEN is the sole on-wire
    /// contract); this is only the default used by `Engine`/tests/CLI.
    #[must_use]
    pub fn new() -> Self {
        let mut state = GameState {
            red_guard: Square::from_rank_file(0, 3).bit(),
            blue_guard: Square::from_rank_file(6, 3).bit(),
            red_towers: 0,
            blue_towers: 0,
            red_heights: [0; NUM_SQUARES],
            blue_heights: [0; NUM_SQUARES],
            red_to_move: true,
            zobrist: 0,
        };
        for file in 0..BOARD_SIZE as u8 {
            let red_sq = Square::from_rank_file(1, file);
            state.red_towers |= red_sq.bit();
            state.red_heights[red_sq.index()] = 1;

            let blue_sq = Square::from_rank_file(5, file);
            state.blue_towers |= blue_sq.bit();
            state.blue_heights[blue_sq.index()] = 1;
        }
        state.zobrist = state.compute_hash();
        state
    }

    #[must_use]
    pub fn current_color(&self) -> Color {
        if self.red_to_move {
            Color::Red
        } else {
            Color::Blue
        }
    }

    #[inline]
    #[must_use]
    pub fn guard_mask(&self, color: Color) -> u64 {
        match color {
            Color::Red => self.red_guard,
            Color::Blue => self.blue_guard,
        }
    }

    #[inline]
    #[must_use]
    pub fn tower_mask(&self, color: Color) -> u64 {
        match color {
            Color::Red => self.red_towers,
            Color::Blue => self.blue_towers,
        }
    }

    #[inline]
    #[must_use]
    pub fn heights(&self, color: Color) -> &[u8; NUM_SQUARES] {
        match color {
            Color::Red => &self.red_heights,
            Color::Blue => &self.blue_heights,
        }
    }

    #[inline]
    #[must_use]
    pub fn height_at(&self, color: Color, sq: Square) -> u8 {
        self.heights(color)[sq.index()]
    }

    #[inline]
    #[must_use]
    pub fn occ(&self, color: Color) -> u64 {
        self.guard_mask(color) | self.tower_mask(color)
    }

    #[inline]
    #[must_use]
    pub fn occ_all(&self) -> u64 {
        self.occ(Color::Red) | self.occ(Color::Blue)
    }

    /// Piece occupying `sq`, if any: its color, kind, and (for towers) its
    /// stack height.
    #[must_use]
    pub fn piece_at(&self, sq: Square) -> Option<(Color, PieceKind, u8)> {
        let bit = sq.bit();
        if self.red_guard & bit != 0 {
            return Some((Color::Red, PieceKind::Guard, 1));
        }
        if self.blue_guard & bit != 0 {
            return Some((Color::Blue, PieceKind::Guard, 1));
        }
        if self.red_towers & bit != 0 {
            return Some((Color::Red, PieceKind::Tower, self.red_heights[sq.index()]));
        }
        if self.blue_towers & bit != 0 {
            return Some((
                Color::Blue,
                PieceKind::Tower,
                self.blue_heights[sq.index()],
            ));
        }
        None
    }

    /// The guard's square for `color`, if that guard is still on the
    /// board.
    #[must_use]
    pub fn guard_square(&self, color: Color) -> Option<Square> {
        let mask = self.guard_mask(color);
        if mask == 0 {
            None
        } else {
            Some(Square::new(mask.trailing_zeros() as u8))
        }
    }

    /// `Some(winner)` iff the position is terminal: a guard has been
    /// captured, or the surviving guard sits on the opponent's castle.
    #[must_use]
    pub fn winner(&self) -> Option<Color> {
        if self.red_guard == 0 {
            return Some(Color::Blue);
        }
        if self.blue_guard == 0 {
            return Some(Color::Red);
        }
        if self.red_guard == castle_square(Color::Red).bit() {
            return Some(Color::Red);
        }
        if self.blue_guard == castle_square(Color::Blue).bit() {
            return Some(Color::Blue);
        }
        None
    }

    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.winner().is_some()
    }

    /// Whether an enemy tower can reach `color`'s guard in exactly its
    /// height in orthogonal steps with a clear path — the closest G&T
    /// analogue to "in check" (there is no pin/check concept; spec.md
    /// §4.1). Used to gate null-move pruning and to score the evaluator's
    /// guard-safety term.
    #[must_use]
    pub fn guard_in_danger(&self, color: Color) -> bool {
        let Some(guard_sq) = self.guard_square(color) else {
            return true;
        };
        let enemy = color.opposite();
        self.attackers_of(guard_sq, enemy) != 0
    }

    /// Mask of `attacker`'s towers that can legally slide onto `target`
    /// this move (clear path, exact height match to a capturing slide).
    #[must_use]
    pub fn attackers_of(&self, target: Square, attacker: Color) -> u64 {
        let mut attackers = 0u64;
        let occ_all = self.occ_all();
        let heights = self.heights(attacker);
        for dir_idx in 0..4 {
            let mut cur = target;
            let mut steps = 0u8;
            loop {
                let Some(next) = crate::bitboard::ORTHOGONAL_STEPS[cur.index()][dir_idx] else {
                    break;
                };
                cur = Square::new(next);
                steps += 1;
                let bit = cur.bit();
                if bit & occ_all != 0 {
                    // First occupied square along this ray: can only be an
                    // attacker if it is an enemy tower whose height exactly
                    // reaches `target`.
                    if bit & self.tower_mask(attacker) != 0 && heights[cur.index()] == steps {
                        attackers |= bit;
                    }
                    break;
                }
                if steps as usize >= BOARD_SIZE {
                    break;
                }
            }
        }
        attackers
    }

    /// Infallible, destructive apply of a move produced by
    /// `movegen::generate_all` (or a hand-built move known to be legal).
    /// Any other input is a programmer error (spec.md §9 REDESIGN FLAGS).
    pub fn apply_move(&mut self, m: &Move) -> UndoInfo {
        let color = self.current_color();
        let (mover_kind, from_height) = self
            .piece_at(m.from)
            .map(|(c, k, h)| {
                debug_assert_eq!(c, color, "apply_move: moving piece must belong to side to move");
                (k, h)
            })
            .unwrap_or_else(|| panic!("apply_move: no piece on {}", m.from));

        let previous_hash = self.zobrist;
        let previous_red_to_move = self.red_to_move;
        let from_height_before = from_height;
        let to_height_before = self.height_at(color, m.to);

        let captured = self.piece_at(m.to).and_then(|(vc, vk, vh)| {
            if vc == color {
                // Landing on a friendly tower stacks rather than captures.
                None
            } else {
                Some(Capture {
                    color: vc,
                    kind: vk,
                    height: vh,
                })
            }
        });

        // Remove any captured enemy piece first.
        if let Some(cap) = captured {
            self.remove_piece(cap.color, cap.kind, m.to, cap.height);
        }

        match mover_kind {
            PieceKind::Guard => {
                self.remove_piece(color, PieceKind::Guard, m.from, 1);
                self.place_piece(color, PieceKind::Guard, m.to, 1);
            }
            PieceKind::Tower => {
                self.remove_piece(color, PieceKind::Tower, m.from, from_height);
                let remaining = from_height - m.amount;
                if remaining > 0 {
                    self.place_piece(color, PieceKind::Tower, m.from, remaining);
                }
                // Stacking onto a friendly tower (not a capture) adds on
                // top of whatever height remains there post-capture-removal.
                let settled_height = m.amount + self.height_at(color, m.to);
                if self.height_at(color, m.to) > 0 {
                    self.remove_piece(color, PieceKind::Tower, m.to, self.height_at(color, m.to));
                }
                self.place_piece(color, PieceKind::Tower, m.to, settled_height);
            }
        }

        self.red_to_move = !self.red_to_move;
        self.zobrist ^= zobrist::side_to_move_key();

        UndoInfo {
            mover_color: color,
            from: m.from,
            to: m.to,
            amount: m.amount,
            from_height_before,
            to_height_before,
            moved_guard: mover_kind == PieceKind::Guard,
            captured,
            previous_hash,
            previous_red_to_move,
        }
    }

    /// Reverse a move previously applied by `apply_move`.
    pub fn undo_move(&mut self, info: &UndoInfo) {
        let color = info.mover_color;
        if info.moved_guard {
            self.remove_piece(color, PieceKind::Guard, info.to, 1);
            self.place_piece(color, PieceKind::Guard, info.from, 1);
        } else {
            let current_to_height = self.height_at(color, info.to);
            if current_to_height > 0 {
                self.remove_piece(color, PieceKind::Tower, info.to, current_to_height);
            }
            if info.to_height_before > 0 {
                self.place_piece(color, PieceKind::Tower, info.to, info.to_height_before);
            }
            let current_from_height = self.height_at(color, info.from);
            if current_from_height > 0 {
                self.remove_piece(color, PieceKind::Tower, info.from, current_from_height);
            }
            self.place_piece(color, PieceKind::Tower, info.from, info.from_height_before);
        }

        if let Some(cap) = info.captured {
            self.place_piece(cap.color, cap.kind, info.to, cap.height);
        }

        self.red_to_move = info.previous_red_to_move;
        self.zobrist = info.previous_hash;
    }

    /// Flip the side to move with no other change, used by null-move
    /// pruning. Callers must not call this on a position where the side to
    /// move's guard is already in danger (checked by the caller per
    /// spec.md §4.5).
    pub fn apply_null_move(&mut self) -> NullUndo {
        let previous_hash = self.zobrist;
        self.red_to_move = !self.red_to_move;
        self.zobrist ^= zobrist::side_to_move_key();
        NullUndo { previous_hash }
    }

    pub fn undo_null_move(&mut self, info: NullUndo) {
        self.red_to_move = !self.red_to_move;
        self.zobrist = info.previous_hash;
    }

    /// Non-destructive apply: returns a new state, leaving `self` untouched.
    #[must_use]
    pub fn apply_move_copy(&self, m: &Move) -> GameState {
        let mut next = self.clone();
        next.apply_move(m);
        next
    }

    fn place_piece(&mut self, color: Color, kind: PieceKind, sq: Square, height: u8) {
        let bit = sq.bit();
        match (color, kind) {
            (Color::Red, PieceKind::Guard) => self.red_guard |= bit,
            (Color::Blue, PieceKind::Guard) => self.blue_guard |= bit,
            (Color::Red, PieceKind::Tower) => {
                self.red_towers |= bit;
                self.red_heights[sq.index()] = height;
            }
            (Color::Blue, PieceKind::Tower) => {
                self.blue_towers |= bit;
                self.blue_heights[sq.index()] = height;
            }
        }
        self.zobrist ^= zobrist::piece_key(color, kind, sq.0, height);
    }

    fn remove_piece(&mut self, color: Color, kind: PieceKind, sq: Square, height: u8) {
        let bit = !sq.bit();
        match (color, kind) {
            (Color::Red, PieceKind::Guard) => self.red_guard &= bit,
            (Color::Blue, PieceKind::Guard) => self.blue_guard &= bit,
            (Color::Red, PieceKind::Tower) => {
                self.red_towers &= bit;
                self.red_heights[sq.index()] = 0;
            }
            (Color::Blue, PieceKind::Tower) => {
                self.blue_towers &= bit;
                self.blue_heights[sq.index()] = 0;
            }
        }
        self.zobrist ^= zobrist::piece_key(color, kind, sq.0, height);
    }

    /// Recompute the Zobrist hash from scratch. Used to validate the
    /// incremental hash maintained by `apply_move`/`undo_move`
    /// (spec.md §8, property 4).
    #[must_use]
    pub fn compute_hash(&self) -> u64 {
        let mut hash = 0u64;
        for sq_idx in 0..NUM_SQUARES as u8 {
            let sq = Square::new(sq_idx);
            if let Some((color, kind, height)) = self.piece_at(sq) {
                hash ^= zobrist::piece_key(color, kind, sq_idx, height);
            }
        }
        if !self.red_to_move {
            hash ^= zobrist::side_to_move_key();
        }
        hash
    }

    /// Validate the structural invariants of spec.md §3. Intended for
    /// debug assertions and tests, not hot-path use.
    #[must_use]
    pub fn check_invariants(&self) -> bool {
        if self.red_guard.count_ones() > 1 || self.blue_guard.count_ones() > 1 {
            return false;
        }
        if self.red_guard & self.blue_guard != 0 {
            return false;
        }
        if self.red_towers & self.red_guard != 0 || self.blue_towers & self.blue_guard != 0 {
            return false;
        }
        if self.red_towers & self.blue_towers != 0 {
            return false;
        }
        for idx in 0..NUM_SQUARES {
            let bit = 1u64 << idx;
            let red_has = self.red_towers & bit != 0;
            if red_has != (self.red_heights[idx] > 0) {
                return false;
            }
            let blue_has = self.blue_towers & bit != 0;
            if blue_has != (self.blue_heights[idx] > 0) {
                return false;
            }
        }
        self.zobrist == self.compute_hash()
    }

    fn symbol_at(&self, sq: Square) -> Option<String> {
        // Height is encoded as a single base-36 digit (0-9 then a-z),
        // keeping every token exactly two characters wide so a tower
        // token can never swallow a following empty-run digit.
        let height_char = |h: u8| char::from_digit(h as u32, 36).expect("height must fit base-36");
        match self.piece_at(sq) {
            Some((Color::Red, PieceKind::Guard, _)) => Some("RG".to_string()),
            Some((Color::Blue, PieceKind::Guard, _)) => Some("BG".to_string()),
            Some((Color::Red, PieceKind::Tower, h)) => Some(format!("r{}", height_char(h))),
            Some((Color::Blue, PieceKind::Tower, h)) => Some(format!("b{}", height_char(h))),
            None => None,
        }
    }

    /// Serialize to FEN: 7 rank segments (top = rank 6 down to rank 0),
    /// slash-separated, digits for empty runs, `RG`/`BG` for guards,
    /// `r<k>`/`b<k>` for towers, a trailing side-to-move letter.
    #[must_use]
    pub fn to_fen(&self) -> String {
        let mut ranks = Vec::with_capacity(BOARD_SIZE);
        for rank in (0..BOARD_SIZE as u8).rev() {
            let mut segment = String::new();
            let mut empty_run = 0u32;
            for file in 0..BOARD_SIZE as u8 {
                let sq = Square::from_rank_file(rank, file);
                match self.symbol_at(sq) {
                    Some(sym) => {
                        if empty_run > 0 {
                            segment.push_str(&empty_run.to_string());
                            empty_run = 0;
                        }
                        segment.push_str(&sym);
                    }
                    None => empty_run += 1,
                }
            }
            if empty_run > 0 {
                segment.push_str(&empty_run.to_string());
            }
            ranks.push(segment);
        }
        let side = if self.red_to_move { "r" } else { "b" };
        format!("{} {}", ranks.join("/"), side)
    }

    /// Parse a FEN produced by `to_fen`. Panics on malformed input — callers
    /// that accept untrusted FEN strings should validate with
    /// `GameState::try_from_fen` instead (see `error::EngineError`).
    #[must_use]
    pub fn from_fen(fen: &str) -> GameState {
        Self::try_from_fen(fen).unwrap_or_else(|e| panic!("invalid FEN: {e}"))
    }

    /// Fallible FEN parse, surfacing `EngineError::InvalidPosition` for
    /// malformed input (spec.md §7).
    pub fn try_from_fen(fen: &str) -> Result<GameState, crate::error::EngineError> {
        use crate::error::EngineError;

        let mut parts = fen.split_whitespace();
        let board_part = parts
            .next()
            .ok_or_else(|| EngineError::InvalidPosition("empty FEN".to_string()))?;
        let side_part = parts
            .next()
            .ok_or_else(|| EngineError::InvalidPosition("missing side to move".to_string()))?;
        if parts.next().is_some() {
            return Err(EngineError::InvalidPosition(
                "trailing data after side to move".to_string(),
            ));
        }

        let segments: Vec<&str> = board_part.split('/').collect();
        if segments.len() != BOARD_SIZE {
            return Err(EngineError::InvalidPosition(format!(
                "expected {BOARD_SIZE} rank segments, found {}",
                segments.len()
            )));
        }

        let mut state = GameState {
            red_guard: 0,
            blue_guard: 0,
            red_towers: 0,
            blue_towers: 0,
            red_heights: [0; NUM_SQUARES],
            blue_heights: [0; NUM_SQUARES],
            red_to_move: true,
            zobrist: 0,
        };

        for (seg_idx, segment) in segments.iter().enumerate() {
            let rank = BOARD_SIZE as u8 - 1 - seg_idx as u8;
            let mut file = 0u8;
            let chars: Vec<char> = segment.chars().collect();
            let mut i = 0usize;
            while i < chars.len() {
                let c = chars[i];
                if c.is_ascii_digit() {
                    let n = c.to_digit(10).unwrap() as u8;
                    file += n;
                    i += 1;
                } else if c == 'R' || c == 'B' {
                    if i + 1 >= chars.len() || chars[i + 1] != 'G' {
                        return Err(EngineError::InvalidPosition(format!(
                            "expected 'G' after '{c}' in segment '{segment}'"
                        )));
                    }
                    if file as usize >= BOARD_SIZE {
                        return Err(EngineError::InvalidPosition(format!(
                            "rank segment '{segment}' overflows the board"
                        )));
                    }
                    let sq = Square::from_rank_file(rank, file);
                    match c {
                        'R' => state.red_guard |= sq.bit(),
                        'B' => state.blue_guard |= sq.bit(),
                        _ => unreachable!(),
                    }
                    file += 1;
                    i += 2;
                } else if c == 'r' || c == 'b' {
                    // The height digit is exactly one base-36 char (0-9,
                    // a-z), so a tower token can never swallow a following
                    // empty-run digit — see DESIGN.md.
                    let height_char = *chars.get(i + 1).ok_or_else(|| {
                        EngineError::InvalidPosition(format!(
                            "expected a height digit after '{c}' in segment '{segment}'"
                        ))
                    })?;
                    let height = height_char.to_digit(36).ok_or_else(|| {
                        EngineError::InvalidPosition(format!(
                            "bad tower height '{height_char}' in segment '{segment}'"
                        ))
                    })? as u8;
                    if height == 0 || file as usize >= BOARD_SIZE {
                        return Err(EngineError::InvalidPosition(format!(
                            "invalid tower in segment '{segment}'"
                        )));
                    }
                    let sq = Square::from_rank_file(rank, file);
                    match c {
                        'r' => {
                            state.red_towers |= sq.bit();
                            state.red_heights[sq.index()] = height;
                        }
                        'b' => {
                            state.blue_towers |= sq.bit();
                            state.blue_heights[sq.index()] = height;
                        }
                        _ => unreachable!(),
                    }
                    file += 1;
                    i += 2;
                } else {
                    return Err(EngineError::InvalidPosition(format!(
                        "unexpected character '{c}' in segment '{segment}'"
                    )));
                }
            }
            if file as usize != BOARD_SIZE {
                return Err(EngineError::InvalidPosition(format!(
                    "rank segment '{segment}' does not cover exactly {BOARD_SIZE} files"
                )));
            }
        }

        state.red_to_move = match side_part {
            "r" | "R" => true,
            "b" | "B" => false,
            other => {
                return Err(EngineError::InvalidPosition(format!(
                    "side to move must be 'r' or 'b', got '{other}'"
                )))
            }
        };

        if state.red_guard.count_ones() > 1 || state.blue_guard.count_ones() > 1 {
            return Err(EngineError::InvalidPosition(
                "a side cannot have more than one guard".to_string(),
            ));
        }
        let red_occ = state.red_guard | state.red_towers;
        let blue_occ = state.blue_guard | state.blue_towers;
        if red_occ & blue_occ != 0 {
            return Err(EngineError::InvalidPosition(
                "overlapping pieces on the same square".to_string(),
            ));
        }

        state.zobrist = state.compute_hash();
        Ok(state)
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for GameState {
    fn eq(&self, other: &Self) -> bool {
        self.red_guard == other.red_guard
            && self.blue_guard == other.blue_guard
            && self.red_towers == other.red_towers
            && self.blue_towers == other.blue_towers
            && self.red_heights == other.red_heights
            && self.blue_heights == other.blue_heights
            && self.red_to_move == other.red_to_move
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_position_is_internally_consistent() {
        let state = GameState::new();
        assert!(state.check_invariants());
        assert!(!state.is_terminal());
    }

    #[test]
    fn fen_round_trip_default_position() {
        let state = GameState::new();
        let fen = state.to_fen();
        let parsed = GameState::from_fen(&fen);
        assert_eq!(state, parsed);
        assert_eq!(fen, parsed.to_fen());
    }

    #[test]
    fn fen_round_trip_e1() {
        let fen = "7/7/7/3BG3/3RG3/7/7 r";
        let state = GameState::from_fen(fen);
        assert_eq!(state.to_fen(), fen);
    }

    #[test]
    fn guards_adjacent_in_e1() {
        let state = GameState::from_fen("7/7/7/3BG3/3RG3/7/7 r");
        let red_sq = state.guard_square(Color::Red).unwrap();
        let blue_sq = state.guard_square(Color::Blue).unwrap();
        assert_eq!(red_sq.manhattan(blue_sq), 1);
    }

    #[test]
    fn e3_blue_guard_one_step_from_red_castle() {
        let state = GameState::from_fen("7/3BG3/7/7/7/7/3RG3 b");
        let blue_sq = state.guard_square(Color::Blue).unwrap();
        assert_eq!(blue_sq.manhattan(castle_square(Color::Red)), 1);
    }

    #[test]
    fn apply_and_undo_tower_move_restores_state() {
        let mut state = GameState::new();
        let before = state.clone();
        let from = Square::from_rank_file(1, 0);
        let to = Square::from_rank_file(2, 0);
        let m = Move::new(from, to, 1);
        let info = state.apply_move(&m);
        assert!(state.check_invariants());
        state.undo_move(&info);
        assert_eq!(state, before);
        assert_eq!(state.zobrist, before.zobrist);
    }

    #[test]
    fn incremental_hash_matches_full_recompute() {
        let mut state = GameState::new();
        let m = Move::new(
            Square::from_rank_file(1, 3),
            Square::from_rank_file(2, 3),
            1,
        );
        state.apply_move(&m);
        assert_eq!(state.zobrist, state.compute_hash());
    }

    #[test]
    fn winner_detects_missing_guard() {
        let mut state = GameState::from_fen("7/7/7/3BG3/3RG3/7/7 r");
        state.blue_guard = 0;
        assert_eq!(state.winner(), Some(Color::Red));
    }

    #[test]
    fn winner_detects_guard_on_enemy_castle() {
        let state = GameState::from_fen("7/7/7/RG6/7/7/3BG3 b");
        assert_eq!(state.winner(), Some(Color::Blue));
    }
}
