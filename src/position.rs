use crate::attacks::AttackTables;
use crate::bitboard::Bitboard;
use crate::eval::{self, Score};
use crate::moves::{Move, CASTLE, ENPASSANT, NO_MOVE, PAWN_START};
use crate::types::{
    k, make_piece, piece_color, piece_type, square_file, square_name, BLACK, BOTH,
    CASTLE_PERMISSION_UPDATES, KING, MAX_GAME_PLIES, NO_PIECE, NO_SQUARE, PAWN, PIECE_CHARS,
    WHITE,
};
use crate::zobrist;
use std::fmt;
use thiserror::Error;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("missing FEN field: {0}")]
    MissingField(&'static str),
    #[error("malformed placement field: {0}")]
    BadPlacement(String),
    #[error("bad side to move: {0}")]
    BadSideToMove(String),
    #[error("bad castling field: {0}")]
    BadCastling(String),
    #[error("bad en passant square: {0}")]
    BadEnPassant(String),
    #[error("bad move counter: {0}")]
    BadCounter(String),
    #[error("expected exactly one king per side")]
    KingCount,
}

// One frame per applied ply. Pushed by do_move, popped by undo_move; the
// last frame always describes the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryInfo {
    pub next_move: Move,
    pub castling_rights: u8,
    pub fifty_moves: u16,
    pub full_moves: u16,
    pub en_passant: u8,
    pub key: u64,
}

impl HistoryInfo {
    fn empty() -> Self {
        Self {
            next_move: NO_MOVE,
            castling_rights: 0,
            fifty_moves: 0,
            full_moves: 1,
            en_passant: NO_SQUARE,
            key: 0,
        }
    }
}

// Board state held in three synchronized views: per-piece bitboards,
// per-color occupancies and a mailbox. All mutation goes through
// add_piece / remove_piece / move_piece so the views can never disagree.
#[derive(Clone)]
pub struct Position {
    piece_bbs: [Bitboard; 12],
    occupancies: [Bitboard; 3],
    board: [u8; 64],
    side_to_move: usize,
    material: [Score; 2],
    history: Vec<HistoryInfo>,
}

impl Position {
    fn empty() -> Self {
        let mut history = Vec::with_capacity(MAX_GAME_PLIES);
        history.push(HistoryInfo::empty());
        Self {
            piece_bbs: [Bitboard::EMPTY; 12],
            occupancies: [Bitboard::EMPTY; 3],
            board: [NO_PIECE as u8; 64],
            side_to_move: WHITE,
            material: [0; 2],
            history,
        }
    }

    pub fn startpos() -> Self {
        Self::from_fen(START_FEN).expect("start position FEN is well formed")
    }

    // --- ACCESSORS ---

    #[inline(always)]
    fn frame(&self) -> &HistoryInfo {
        &self.history[self.history.len() - 1]
    }
    #[inline(always)]
    fn frame_mut(&mut self) -> &mut HistoryInfo {
        let top = self.history.len() - 1;
        &mut self.history[top]
    }

    #[inline(always)]
    pub fn side_to_move(&self) -> usize {
        self.side_to_move
    }
    #[inline(always)]
    pub fn ply(&self) -> usize {
        self.history.len() - 1
    }
    #[inline(always)]
    pub fn castling_rights(&self) -> u8 {
        self.frame().castling_rights
    }
    #[inline(always)]
    pub fn en_passant_square(&self) -> u8 {
        self.frame().en_passant
    }
    #[inline(always)]
    pub fn fifty_moves(&self) -> u16 {
        self.frame().fifty_moves
    }
    #[inline(always)]
    pub fn full_moves(&self) -> u16 {
        self.frame().full_moves
    }
    #[inline(always)]
    pub fn key(&self) -> u64 {
        self.frame().key
    }
    #[inline(always)]
    pub fn piece_on(&self, square: u8) -> usize {
        self.board[square as usize] as usize
    }
    #[inline(always)]
    pub fn piece_bitboard(&self, color: usize, piece_type: usize) -> Bitboard {
        self.piece_bbs[make_piece(color, piece_type)]
    }
    #[inline(always)]
    pub fn occupied(&self, color: usize) -> Bitboard {
        self.occupancies[color]
    }
    #[inline(always)]
    pub fn occupied_all(&self) -> Bitboard {
        self.occupancies[BOTH]
    }
    #[inline(always)]
    pub fn material(&self, color: usize) -> Score {
        self.material[color]
    }
    #[inline(always)]
    pub fn king_square(&self, color: usize) -> u8 {
        self.piece_bbs[make_piece(color, KING)].get_lsb_index() as u8
    }

    // --- FEN ---

    pub fn from_fen(fen: &str) -> Result<Position, FenError> {
        let mut position = Position::empty();
        let mut fields = fen.split_whitespace();

        let placement = fields.next().ok_or(FenError::MissingField("placement"))?;
        let mut rank: i32 = 7;
        let mut file: i32 = 0;
        for token in placement.chars() {
            match token {
                '/' => {
                    if file != 8 || rank == 0 {
                        return Err(FenError::BadPlacement(placement.to_string()));
                    }
                    rank -= 1;
                    file = 0;
                }
                '1'..='8' => {
                    file += token as i32 - '0' as i32;
                    if file > 8 {
                        return Err(FenError::BadPlacement(placement.to_string()));
                    }
                }
                _ => {
                    let piece = crate::types::piece_from_char(token)
                        .ok_or_else(|| FenError::BadPlacement(placement.to_string()))?;
                    if file > 7 {
                        return Err(FenError::BadPlacement(placement.to_string()));
                    }
                    position.add_piece((rank * 8 + file) as u8, piece);
                    file += 1;
                }
            }
        }
        if rank != 0 || file != 8 {
            return Err(FenError::BadPlacement(placement.to_string()));
        }

        let side = fields.next().ok_or(FenError::MissingField("side to move"))?;
        position.side_to_move = match side {
            "w" => WHITE,
            "b" => BLACK,
            _ => return Err(FenError::BadSideToMove(side.to_string())),
        };

        let castling = fields.next().ok_or(FenError::MissingField("castling"))?;
        let mut rights = 0u8;
        if castling != "-" {
            for c in castling.chars() {
                rights |= match c {
                    'K' => crate::types::WKCA,
                    'Q' => crate::types::WQCA,
                    'k' => crate::types::BKCA,
                    'q' => crate::types::BQCA,
                    _ => return Err(FenError::BadCastling(castling.to_string())),
                };
            }
        }

        let en_passant = fields.next().ok_or(FenError::MissingField("en passant"))?;
        let ep_square = if en_passant == "-" {
            NO_SQUARE
        } else {
            let bytes = en_passant.as_bytes();
            if bytes.len() != 2
                || !(b'a'..=b'h').contains(&bytes[0])
                || !(bytes[1] == b'3' || bytes[1] == b'6')
            {
                return Err(FenError::BadEnPassant(en_passant.to_string()));
            }
            (bytes[1] - b'1') * 8 + (bytes[0] - b'a')
        };

        let fifty_field = fields.next().ok_or(FenError::MissingField("halfmove clock"))?;
        let fifty: u16 = fifty_field
            .parse()
            .map_err(|_| FenError::BadCounter(fifty_field.to_string()))?;

        let moves_field = fields.next().ok_or(FenError::MissingField("fullmove number"))?;
        let full: u16 = moves_field
            .parse()
            .map_err(|_| FenError::BadCounter(moves_field.to_string()))?;
        if full == 0 {
            return Err(FenError::BadCounter(moves_field.to_string()));
        }

        if position.piece_bbs[crate::types::K].count_bits() != 1
            || position.piece_bbs[k].count_bits() != 1
        {
            return Err(FenError::KingCount);
        }

        {
            let frame = position.frame_mut();
            frame.castling_rights = rights;
            frame.fifty_moves = fifty;
            frame.full_moves = full;
            frame.en_passant = ep_square;
        }
        position.calc_key();
        Ok(position)
    }

    pub fn set_from_fen(&mut self, fen: &str) -> Result<(), FenError> {
        *self = Position::from_fen(fen)?;
        Ok(())
    }

    pub fn to_fen(&self) -> String {
        let mut out = String::new();
        for rank in (0..8).rev() {
            let mut empty_run = 0;
            for file in 0..8 {
                let piece = self.piece_on(rank * 8 + file);
                if piece == NO_PIECE {
                    empty_run += 1;
                } else {
                    if empty_run > 0 {
                        out.push((b'0' + empty_run) as char);
                        empty_run = 0;
                    }
                    out.push(PIECE_CHARS[piece]);
                }
            }
            if empty_run > 0 {
                out.push((b'0' + empty_run) as char);
            }
            if rank > 0 {
                out.push('/');
            }
        }

        out.push(' ');
        out.push(if self.side_to_move == WHITE { 'w' } else { 'b' });

        out.push(' ');
        let rights = self.castling_rights();
        if rights == 0 {
            out.push('-');
        } else {
            if rights & crate::types::WKCA != 0 {
                out.push('K');
            }
            if rights & crate::types::WQCA != 0 {
                out.push('Q');
            }
            if rights & crate::types::BKCA != 0 {
                out.push('k');
            }
            if rights & crate::types::BQCA != 0 {
                out.push('q');
            }
        }

        out.push(' ');
        if self.en_passant_square() == NO_SQUARE {
            out.push('-');
        } else {
            out.push_str(&square_name(self.en_passant_square()));
        }

        out.push_str(&format!(" {} {}", self.fifty_moves(), self.full_moves()));
        out
    }

    // Piece keys are accumulated by add_piece while parsing; this folds the
    // non-placement terms in. Only used at load, everything else is
    // maintained incrementally.
    fn calc_key(&mut self) {
        let keys = zobrist::keys();
        let side = self.side_to_move;
        let frame = self.frame_mut();
        frame.key ^= keys.castling[frame.castling_rights as usize];
        if frame.en_passant != NO_SQUARE {
            frame.key ^= keys.en_passant_file[square_file(frame.en_passant) as usize];
        }
        if side == BLACK {
            frame.key ^= keys.black_to_move;
        }
    }

    // --- VIEW MUTATION ---

    fn add_piece(&mut self, square: u8, piece: usize) {
        debug_assert_eq!(self.piece_on(square), NO_PIECE);
        let color = piece_color(piece);
        self.piece_bbs[piece].set_bit(square);
        self.occupancies[color].set_bit(square);
        self.occupancies[BOTH].set_bit(square);
        self.board[square as usize] = piece as u8;
        self.material[color] += eval::piece_square_value(piece, square);
        self.frame_mut().key ^= zobrist::keys().piece_square[piece][square as usize];
    }

    fn remove_piece(&mut self, square: u8) {
        let piece = self.piece_on(square);
        debug_assert_ne!(piece, NO_PIECE);
        let color = piece_color(piece);
        self.piece_bbs[piece].pop_bit(square);
        self.occupancies[color].pop_bit(square);
        self.occupancies[BOTH].pop_bit(square);
        self.board[square as usize] = NO_PIECE as u8;
        self.material[color] -= eval::piece_square_value(piece, square);
        self.frame_mut().key ^= zobrist::keys().piece_square[piece][square as usize];
    }

    fn move_piece(&mut self, from: u8, to: u8) {
        let piece = self.piece_on(from);
        debug_assert_ne!(piece, NO_PIECE);
        debug_assert_eq!(self.piece_on(to), NO_PIECE);
        let color = piece_color(piece);
        self.piece_bbs[piece].move_bit(from, to);
        self.occupancies[color].move_bit(from, to);
        self.occupancies[BOTH].move_bit(from, to);
        self.board[from as usize] = NO_PIECE as u8;
        self.board[to as usize] = piece as u8;
        self.material[color] -= eval::piece_square_value(piece, from);
        self.material[color] += eval::piece_square_value(piece, to);
        let keys = zobrist::keys();
        self.frame_mut().key ^=
            keys.piece_square[piece][from as usize] ^ keys.piece_square[piece][to as usize];
    }

    // --- MOVE APPLICATION ---

    // Applies a pseudo-legal move. Returns false (with full rollback) when
    // the mover's own king would be left attacked; legality is necessarily
    // post-hoc: make, test, possibly unmake.
    pub fn do_move(&mut self, tables: &AttackTables, mv: Move) -> bool {
        debug_assert!(self.history.len() < MAX_GAME_PLIES);
        let from = mv.source();
        let to = mv.target();
        let special = mv.special();
        let side = self.side_to_move;
        let keys = zobrist::keys();

        let prev = *self.frame();
        self.frame_mut().next_move = mv;

        let mut next = HistoryInfo {
            next_move: NO_MOVE,
            castling_rights: prev.castling_rights,
            fifty_moves: prev.fifty_moves + 1,
            full_moves: prev.full_moves + if side == BLACK { 1 } else { 0 },
            en_passant: NO_SQUARE,
            key: prev.key,
        };
        // the previous en-passant file expires whatever this move is
        if prev.en_passant != NO_SQUARE {
            next.key ^= keys.en_passant_file[square_file(prev.en_passant) as usize];
        }
        self.history.push(next);

        if special == ENPASSANT {
            let captured_square = if side == WHITE { to - 8 } else { to + 8 };
            self.remove_piece(captured_square);
        } else if special == CASTLE {
            match to {
                2 => self.move_piece(0, 3),
                6 => self.move_piece(7, 5),
                58 => self.move_piece(56, 59),
                62 => self.move_piece(63, 61),
                _ => debug_assert!(false, "bad castle target {}", to),
            }
        }

        {
            let rights = prev.castling_rights
                & CASTLE_PERMISSION_UPDATES[from as usize]
                & CASTLE_PERMISSION_UPDATES[to as usize];
            let frame = self.frame_mut();
            frame.key ^= keys.castling[prev.castling_rights as usize];
            frame.key ^= keys.castling[rights as usize];
            frame.castling_rights = rights;
        }

        let moving_piece = self.piece_on(from);
        if mv.is_capture() || piece_type(moving_piece) == PAWN {
            self.frame_mut().fifty_moves = 0;
        }
        if mv.captured_piece() != NO_PIECE {
            self.remove_piece(to);
        }

        if special == PAWN_START {
            let ep = if side == WHITE { from + 8 } else { from - 8 };
            let frame = self.frame_mut();
            frame.en_passant = ep;
            frame.key ^= keys.en_passant_file[square_file(ep) as usize];
        }

        self.move_piece(from, to);

        if mv.is_promotion() {
            self.remove_piece(to);
            self.add_piece(to, make_piece(side, mv.promoted_type()));
        }

        self.side_to_move ^= 1;
        self.frame_mut().key ^= keys.black_to_move;

        let king_square = self.king_square(side);
        if self.square_is_attacked(tables, king_square, side ^ 1) {
            self.undo_move();
            return false;
        }
        true
    }

    // Exactly reverses the latest do_move, including captured pieces by
    // original identity and promotions back to the source pawn.
    pub fn undo_move(&mut self) {
        debug_assert!(self.history.len() >= 2);
        let mv = self.history[self.history.len() - 2].next_move;
        let from = mv.source();
        let to = mv.target();
        let special = mv.special();

        self.side_to_move ^= 1;
        let side = self.side_to_move;

        if special == ENPASSANT {
            let captured_square = if side == WHITE { to - 8 } else { to + 8 };
            self.add_piece(captured_square, make_piece(side ^ 1, PAWN));
        } else if special == CASTLE {
            match to {
                2 => self.move_piece(3, 0),
                6 => self.move_piece(5, 7),
                58 => self.move_piece(59, 56),
                62 => self.move_piece(61, 63),
                _ => debug_assert!(false, "bad castle target {}", to),
            }
        }

        self.move_piece(to, from);

        let captured = mv.captured_piece();
        if captured != NO_PIECE {
            self.add_piece(to, captured);
        }

        if mv.is_promotion() {
            self.remove_piece(from);
            self.add_piece(from, make_piece(side, PAWN));
        }

        // the restored frame's key and counters were never touched
        self.history.pop();
        self.frame_mut().next_move = NO_MOVE;
    }

    // --- QUERIES ---

    pub fn square_is_attacked(&self, tables: &AttackTables, square: u8, by_side: usize) -> bool {
        // reverse pawn offsets: "a pawn of by_side attacks square" is the
        // same set as "a pawn of the other color on square attacks"
        if !(tables.pawn_attacks(by_side ^ 1, square)
            & self.piece_bbs[make_piece(by_side, PAWN)])
            .is_empty()
        {
            return true;
        }
        if !(tables.knight_attacks(square) & self.piece_bbs[make_piece(by_side, crate::types::KNIGHT)])
            .is_empty()
        {
            return true;
        }
        if !(tables.king_attacks(square) & self.piece_bbs[make_piece(by_side, KING)]).is_empty() {
            return true;
        }
        let occupancy = self.occupancies[BOTH];
        let rooks = self.piece_bbs[make_piece(by_side, crate::types::ROOK)]
            | self.piece_bbs[make_piece(by_side, crate::types::QUEEN)];
        if !(tables.rook_attacks(square, occupancy) & rooks).is_empty() {
            return true;
        }
        let bishops = self.piece_bbs[make_piece(by_side, crate::types::BISHOP)]
            | self.piece_bbs[make_piece(by_side, crate::types::QUEEN)];
        if !(tables.bishop_attacks(square, occupancy) & bishops).is_empty() {
            return true;
        }
        false
    }

    #[inline(always)]
    pub fn in_check(&self, tables: &AttackTables) -> bool {
        self.square_is_attacked(
            tables,
            self.king_square(self.side_to_move),
            self.side_to_move ^ 1,
        )
    }

    // Third occurrence of the current key counts as a repetition draw.
    // Only frames inside the fifty-move window can repeat.
    pub fn is_threefold_repetition(&self) -> bool {
        let top = self.history.len() - 1;
        let current = self.history[top].key;
        let window = self.history[top].fifty_moves as usize;
        let start = top.saturating_sub(window);
        let mut seen = 0;
        for frame in &self.history[start..top] {
            if frame.key == current {
                seen += 1;
            }
        }
        seen >= 2
    }

    // Debug invariant: every view must agree on every square.
    pub fn is_consistent(&self) -> bool {
        let mut white = Bitboard::EMPTY;
        let mut black = Bitboard::EMPTY;
        for piece in 0..6 {
            white = white | self.piece_bbs[piece];
        }
        for piece in 6..12 {
            black = black | self.piece_bbs[piece];
        }
        if white != self.occupancies[WHITE]
            || black != self.occupancies[BLACK]
            || (white | black) != self.occupancies[BOTH]
        {
            return false;
        }
        for square in 0..64u8 {
            let piece = self.piece_on(square);
            if piece == NO_PIECE {
                if self.occupancies[BOTH].get_bit(square) {
                    return false;
                }
            } else if !self.piece_bbs[piece].get_bit(square) {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+---+---+---+---+---+---+---+---+")?;
        for rank in (0..8).rev() {
            write!(f, "| ")?;
            for file in 0..8 {
                let piece = self.piece_on(rank * 8 + file);
                let c = if piece == NO_PIECE {
                    ' '
                } else {
                    PIECE_CHARS[piece]
                };
                write!(f, "{} | ", c)?;
            }
            writeln!(f, "{}", rank + 1)?;
            writeln!(f, "+---+---+---+---+---+---+---+---+")?;
        }
        writeln!(f, "  a   b   c   d   e   f   g   h")?;
        writeln!(f, "Fen: {}", self.to_fen())?;
        writeln!(f, "Key: {:016x}", self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::{NO_SPECIAL, PROMOTION_QUEEN};
    use crate::types::{n, p, P, Q, R};

    const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    #[test]
    fn test_fen_round_trip() {
        let fens = [
            START_FEN,
            KIWIPETE,
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "4k3/8/8/8/8/8/8/4K3 b - - 37 104",
            "r3k2r/8/8/8/8/8/8/R3K2R w Kq - 5 40",
        ];
        for fen in fens {
            let position = Position::from_fen(fen).unwrap();
            assert_eq!(position.to_fen(), fen);
        }
    }

    #[test]
    fn test_malformed_fen_is_rejected() {
        let bad = [
            "",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR",          // missing fields
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1",      // short placement
            "rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KXkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e9 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - x 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 0",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNN w KQkq - 0 1", // no white king
        ];
        for fen in bad {
            assert!(Position::from_fen(fen).is_err(), "accepted bad FEN: {}", fen);
        }
    }

    #[test]
    fn test_do_undo_restores_key_and_fen() {
        let tables = AttackTables::new();
        let mut position = Position::startpos();
        let fen_before = position.to_fen();
        let key_before = position.key();

        let e2e4 = Move::quiet(12, 28, PAWN_START, P);
        assert!(position.do_move(&tables, e2e4));
        assert_ne!(position.key(), key_before);
        assert_eq!(position.ply(), 1);
        position.undo_move();
        assert_eq!(position.to_fen(), fen_before);
        assert_eq!(position.key(), key_before);
        assert_eq!(position.ply(), 0);
        assert!(position.is_consistent());
    }

    #[test]
    fn test_rejected_move_rolls_back() {
        let tables = AttackTables::new();
        // White king on e1 is pinned against a black rook on e8: moving the
        // e-file blocker exposes the king.
        let mut position = Position::from_fen("4r1k1/8/8/8/8/8/4R3/4K3 w - - 0 1").unwrap();
        let fen_before = position.to_fen();
        let key_before = position.key();

        // Re2a2 leaves the king attacked and must be rejected with rollback.
        let illegal = Move::quiet(12, 8, NO_SPECIAL, R);
        assert!(!position.do_move(&tables, illegal));
        assert_eq!(position.to_fen(), fen_before);
        assert_eq!(position.key(), key_before);
        assert_eq!(position.ply(), 0);
        assert!(position.is_consistent());
    }

    #[test]
    fn test_en_passant_capture_and_undo() {
        let tables = AttackTables::new();
        // White pawn on e5, black answers d7d5; exd6 en passant.
        let mut position =
            Position::from_fen("rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3")
                .unwrap();
        let fen_before = position.to_fen();
        let pawns_before = position.piece_bitboard(BLACK, PAWN).count_bits();

        let exd6 = Move::quiet(36, 43, ENPASSANT, P);
        assert!(position.do_move(&tables, exd6));
        assert_eq!(
            position.piece_bitboard(BLACK, PAWN).count_bits(),
            pawns_before - 1
        );
        assert_eq!(position.piece_on(35), NO_PIECE); // d5 pawn gone
        position.undo_move();
        assert_eq!(position.to_fen(), fen_before);
        assert!(position.is_consistent());
    }

    #[test]
    fn test_promotion_and_undo() {
        let tables = AttackTables::new();
        let mut position = Position::from_fen("8/4P1k1/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let fen_before = position.to_fen();

        let e8q = Move::new(52, 60, PROMOTION_QUEEN, P, NO_PIECE);
        assert!(position.do_move(&tables, e8q));
        assert_eq!(position.piece_on(60), Q);
        assert!(position.piece_bitboard(WHITE, PAWN).is_empty());
        position.undo_move();
        assert_eq!(position.to_fen(), fen_before);
        assert_eq!(position.piece_on(52), P);
    }

    #[test]
    fn test_castling_moves_rook_and_undo() {
        let tables = AttackTables::new();
        let mut position = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let fen_before = position.to_fen();

        let white_oo = Move::quiet(4, 6, CASTLE, crate::types::K);
        assert!(position.do_move(&tables, white_oo));
        assert_eq!(position.piece_on(6), crate::types::K);
        assert_eq!(position.piece_on(5), R);
        assert_eq!(position.piece_on(7), NO_PIECE);
        assert_eq!(position.castling_rights() & (crate::types::WKCA | crate::types::WQCA), 0);
        position.undo_move();
        assert_eq!(position.to_fen(), fen_before);
    }

    #[test]
    fn test_capturing_rook_on_home_square_revokes_rights() {
        let tables = AttackTables::new();
        // Black knight can capture the h1 rook.
        let mut position =
            Position::from_fen("r3k2r/8/8/8/8/6n1/8/R3K2R b KQkq - 0 1").unwrap();
        let nxh1 = Move::new(22, 7, NO_SPECIAL, n, R);
        assert!(position.do_move(&tables, nxh1));
        assert_eq!(position.castling_rights() & crate::types::WKCA, 0);
        assert_ne!(position.castling_rights() & crate::types::WQCA, 0);
        position.undo_move();
        assert_ne!(position.castling_rights() & crate::types::WKCA, 0);
    }

    #[test]
    fn test_key_is_pure_function_of_state() {
        let tables = AttackTables::new();
        // Reach the same position by moves and by FEN; keys must agree even
        // though an en-passant file appeared and expired along the way.
        let mut position = Position::startpos();
        assert!(position.do_move(&tables, Move::quiet(12, 28, PAWN_START, P))); // e4
        assert!(position.do_move(&tables, Move::quiet(50, 34, PAWN_START, p))); // c5
        assert!(position.do_move(&tables, Move::quiet(6, 21, NO_SPECIAL, crate::types::N))); // Nf3

        let reference = Position::from_fen(
            "rnbqkbnr/pp1ppppp/8/2p5/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2",
        )
        .unwrap();
        assert_eq!(position.to_fen(), reference.to_fen());
        assert_eq!(position.key(), reference.key());
    }

    #[test]
    fn test_threefold_repetition() {
        let tables = AttackTables::new();
        let mut position =
            Position::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
        assert!(!position.is_threefold_repetition());

        // Shuffle both kings back and forth twice: the start position
        // recurs for the third time on the last move.
        let moves = [
            Move::quiet(4, 12, NO_SPECIAL, crate::types::K), // Ke2
            Move::quiet(60, 52, NO_SPECIAL, k),              // ..Ke7
            Move::quiet(12, 4, NO_SPECIAL, crate::types::K), // Ke1
            Move::quiet(52, 60, NO_SPECIAL, k),              // ..Ke8 (2nd time)
            Move::quiet(4, 12, NO_SPECIAL, crate::types::K),
            Move::quiet(60, 52, NO_SPECIAL, k),
            Move::quiet(12, 4, NO_SPECIAL, crate::types::K),
            Move::quiet(52, 60, NO_SPECIAL, k), // 3rd time
        ];
        for (index, mv) in moves.iter().enumerate() {
            assert!(position.do_move(&tables, *mv));
            if index < moves.len() - 1 {
                assert!(!position.is_threefold_repetition(), "early at move {}", index);
            }
        }
        assert!(position.is_threefold_repetition());
    }

    #[test]
    fn test_fifty_move_counter_bookkeeping() {
        let tables = AttackTables::new();
        let mut position = Position::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 10 20").unwrap();
        assert!(position.do_move(&tables, Move::quiet(0, 8, NO_SPECIAL, R)));
        assert_eq!(position.fifty_moves(), 11);
        assert_eq!(position.full_moves(), 20);
        assert!(position.do_move(&tables, Move::quiet(60, 52, NO_SPECIAL, k)));
        assert_eq!(position.full_moves(), 21);
    }
}
