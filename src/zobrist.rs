use crate::bitboard::Random;
use std::sync::OnceLock;

// Hash key families: [piece][square], castling-rights index, en-passant
// file, black to move. Fixed seed so keys reproduce between runs.
pub struct ZobristKeys {
    pub piece_square: [[u64; 64]; 12],
    pub castling: [u64; 16],
    pub en_passant_file: [u64; 8],
    pub black_to_move: u64,
}

static KEYS: OnceLock<ZobristKeys> = OnceLock::new();

pub fn keys() -> &'static ZobristKeys {
    KEYS.get_or_init(|| {
        let mut rng = Random::new(1070372);
        let mut piece_square = [[0u64; 64]; 12];
        for piece in 0..12 {
            for square in 0..64 {
                piece_square[piece][square] = rng.get_u64();
            }
        }
        let mut castling = [0u64; 16];
        for entry in castling.iter_mut() {
            *entry = rng.get_u64();
        }
        let mut en_passant_file = [0u64; 8];
        for entry in en_passant_file.iter_mut() {
            *entry = rng.get_u64();
        }
        ZobristKeys {
            piece_square,
            castling,
            en_passant_file,
            black_to_move: rng.get_u64(),
        }
    })
}
