use crate::position::Position;
use crate::types::{BISHOP, BLACK, KNIGHT, PAWN, QUEEN, ROOK, WHITE};

pub type Score = i32;

pub const DRAW_SCORE: Score = 0;

// Material values per piece type. The king carries no material weight since
// both kings are always on the board.
pub const MATERIAL: [Score; 6] = [82, 337, 365, 477, 1025, 0];

// Piece-square tables laid out from a8 (index 0) to h1 (index 63). White
// lookups flip the square vertically, black reads directly.
#[rustfmt::skip]
const PAWN_TABLE: [Score; 64] = [
      0,   0,   0,   0,   0,   0,   0,   0,
     98, 134,  61,  95,  68, 126,  34, -11,
     -6,   7,  26,  31,  65,  56,  25, -20,
    -14,  13,   6,  21,  23,  12,  17, -23,
    -27,  -2,  -5,  12,  17,   6,  10, -25,
    -26,  -4,  -4, -10,   3,   3,  33, -12,
    -35,  -1, -20, -23, -15,  24,  38, -22,
      0,   0,   0,   0,   0,   0,   0,   0,
];
#[rustfmt::skip]
const KNIGHT_TABLE: [Score; 64] = [
   -167, -89, -34, -49,  61, -97, -15, -107,
    -73, -41,  72,  36,  23,  62,   7,  -17,
    -47,  60,  37,  65,  84, 129,  73,   44,
     -9,  17,  19,  53,  37,  69,  18,   22,
    -13,   4,  16,  13,  28,  19,  21,   -8,
    -23,  -9,  12,  10,  19,  17,  25,  -16,
    -29, -53, -12,  -3,  -1,  18, -14,  -19,
   -105, -21, -58, -33, -17, -28, -19,  -23,
];
#[rustfmt::skip]
const BISHOP_TABLE: [Score; 64] = [
    -29,   4, -82, -37, -25, -42,   7,  -8,
    -26,  16, -18, -13,  30,  59,  18, -47,
    -16,  37,  43,  40,  35,  50,  37,  -2,
     -4,   5,  19,  50,  37,  37,   7,  -2,
     -6,  13,  13,  26,  34,  12,  10,   4,
      0,  15,  15,  15,  14,  27,  18,  10,
      4,  15,  16,   0,   7,  21,  33,   1,
    -33,  -3, -14, -21, -13, -12, -39, -21,
];
#[rustfmt::skip]
const ROOK_TABLE: [Score; 64] = [
     32,  42,  32,  51,  63,   9,  31,  43,
     27,  32,  58,  62,  80,  67,  26,  44,
     -5,  19,  26,  36,  17,  45,  61,  16,
    -24, -11,   7,  26,  24,  35,  -8, -20,
    -36, -26, -12,  -1,   9,  -7,   6, -23,
    -45, -25, -16, -17,   3,   0,  -5, -33,
    -44, -16, -20,  -9,  -1,  11,  -6, -71,
    -19, -13,   1,  17,  16,   7, -37, -26,
];
#[rustfmt::skip]
const QUEEN_TABLE: [Score; 64] = [
    -28,   0,  29,  12,  59,  44,  43,  45,
    -24, -39,  -5,   1, -16,  57,  28,  54,
    -13, -17,   7,   8,  29,  56,  47,  57,
    -27, -27, -16, -16,  -1,  17,  -2,   1,
     -9, -26,  -9, -10,  -2,  -4,   3,  -3,
    -14,   2, -11,  -2,  -5,   2,  14,   5,
    -35,  -8,  11,   2,   8,  15,  -3,   1,
     -1, -18,  -9,  10, -15, -25, -31, -50,
];
#[rustfmt::skip]
const KING_TABLE: [Score; 64] = [
    -65,  23,  16, -15, -56, -34,   2,  13,
     29,  -1, -20,  -7,  -8,  -4, -38, -29,
     -9,  24,   2, -16, -20,   6,  22, -22,
    -17, -20, -12, -27, -30, -25, -14, -36,
    -49,  -1, -27, -39, -46, -44, -33, -51,
    -14, -14, -22, -46, -44, -30, -15, -27,
      1,   7,  -8, -64, -43, -16,   9,   8,
    -15,  36,  12, -54,   8, -28,  24,  14,
];

const TABLES: [&[Score; 64]; 6] = [
    &PAWN_TABLE,
    &KNIGHT_TABLE,
    &BISHOP_TABLE,
    &ROOK_TABLE,
    &QUEEN_TABLE,
    &KING_TABLE,
];

// Material + placement value of a piece on a square; the position keeps the
// per-side sums of this incrementally.
#[inline(always)]
pub fn piece_square_value(piece: usize, square: u8) -> Score {
    let kind = crate::types::piece_type(piece);
    let index = if crate::types::piece_color(piece) == WHITE {
        (square ^ 56) as usize
    } else {
        square as usize
    };
    MATERIAL[kind] + TABLES[kind][index]
}

// Side-to-move relative score from the incrementally maintained sums.
#[inline(always)]
pub fn evaluate(position: &Position) -> Score {
    let score = position.material(WHITE) - position.material(BLACK);
    if position.side_to_move() == WHITE {
        score
    } else {
        -score
    }
}

const DARK_SQUARES: u64 = 0xAA55AA55AA55AA55;

// Theoretical material draws: neither side can force mate no matter the
// moves. Any pawn, rook or queen on the board rules it out immediately.
pub fn material_draw(position: &Position) -> bool {
    let wp = position.piece_bitboard(WHITE, PAWN);
    let bp = position.piece_bitboard(BLACK, PAWN);
    if !wp.is_empty() || !bp.is_empty() {
        return false;
    }

    let wq = position.piece_bitboard(WHITE, QUEEN);
    let bq = position.piece_bitboard(BLACK, QUEEN);
    let wr = position.piece_bitboard(WHITE, ROOK);
    let br = position.piece_bitboard(BLACK, ROOK);
    if !wq.is_empty() || !bq.is_empty() || !wr.is_empty() || !br.is_empty() {
        return false;
    }

    let wb = position.piece_bitboard(WHITE, BISHOP);
    let bb = position.piece_bitboard(BLACK, BISHOP);
    let wn = position.piece_bitboard(WHITE, KNIGHT);
    let bn = position.piece_bitboard(BLACK, KNIGHT);

    if wb.is_empty() && bb.is_empty() {
        // Knights only. K+N and K+NN vs K cannot force mate; three knights
        // can in theory, and knight vs knight can be mated into a corner.
        let white_knights = wn.count_bits();
        let black_knights = bn.count_bits();
        return (white_knights < 3 && black_knights == 0)
            || (black_knights < 3 && white_knights == 0);
    }

    if wn.is_empty() && bn.is_empty() {
        // Bishops only.
        let white_bishops = wb.count_bits();
        let black_bishops = bb.count_bits();
        let total = white_bishops + black_bishops;
        if total == 1 {
            return true;
        }
        if total == 2 && white_bishops == 1 && black_bishops == 1 {
            // Drawn only when both bishops live on the same color complex.
            let w_dark = (wb.0 & DARK_SQUARES) != 0;
            let b_dark = (bb.0 & DARK_SQUARES) != 0;
            return w_dark == b_dark;
        }
        return false;
    }

    // Mixed minors (e.g. KBN vs K) can mate.
    false
}
