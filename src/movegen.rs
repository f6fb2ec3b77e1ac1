use crate::attacks::AttackTables;
use crate::moves::{Move, MoveList, CASTLE, ENPASSANT, NO_SPECIAL, PAWN_START, PROMOTION_BISHOP,
    PROMOTION_KNIGHT, PROMOTION_QUEEN, PROMOTION_ROOK};
use crate::position::Position;
use crate::types::{
    make_piece, square_rank, BISHOP, BKCA, BLACK, BQCA, KING, KNIGHT, NO_SQUARE, PAWN, QUEEN,
    ROOK, WHITE, WKCA, WQCA,
};

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum GenType {
    All,
    // Captures, en-passant and promotions: the quiescence move set.
    Captures,
}

pub fn generate_pseudo_moves(position: &Position, tables: &AttackTables, list: &mut MoveList) {
    generate(position, tables, list, GenType::All);
}

pub fn generate_pseudo_captures(position: &Position, tables: &AttackTables, list: &mut MoveList) {
    generate(position, tables, list, GenType::Captures);
}

pub fn generate(position: &Position, tables: &AttackTables, list: &mut MoveList, gen: GenType) {
    let side = position.side_to_move();
    pawn_moves(position, tables, list, gen);
    for piece_type in [KNIGHT, BISHOP, ROOK, QUEEN, KING] {
        piece_moves(position, tables, list, gen, piece_type);
    }
    if gen == GenType::All {
        if side == WHITE {
            white_castling_moves(position, tables, list);
        } else {
            black_castling_moves(position, tables, list);
        }
    }
}

fn push_promotions(list: &mut MoveList, from: u8, to: u8, attacker: usize, captured: usize) {
    for special in [PROMOTION_QUEEN, PROMOTION_ROOK, PROMOTION_BISHOP, PROMOTION_KNIGHT] {
        list.push(Move::new(from, to, special, attacker, captured));
    }
}

fn pawn_moves(position: &Position, tables: &AttackTables, list: &mut MoveList, gen: GenType) {
    let side = position.side_to_move();
    let enemy = side ^ 1;
    let occupied = position.occupied_all();
    let enemy_occupied = position.occupied(enemy);
    let pawn = make_piece(side, PAWN);
    let (start_rank, promotion_rank, up): (u8, u8, i8) =
        if side == WHITE { (1, 7, 8) } else { (6, 0, -8) };

    let mut pawns = position.piece_bitboard(side, PAWN);
    while !pawns.is_empty() {
        let from = pawns.pop_lsb();
        let to = (from as i8 + up) as u8;

        // pushes: blocked by any occupancy; double only from the start rank
        // through an empty intermediate square
        if !occupied.get_bit(to) {
            if square_rank(to) == promotion_rank {
                push_promotions(list, from, to, pawn, crate::types::NO_PIECE);
            } else if gen == GenType::All {
                list.push(Move::quiet(from, to, NO_SPECIAL, pawn));
                if square_rank(from) == start_rank {
                    let double = (from as i8 + 2 * up) as u8;
                    if !occupied.get_bit(double) {
                        list.push(Move::quiet(from, double, PAWN_START, pawn));
                    }
                }
            }
        }

        let mut captures = tables.pawn_attacks(side, from) & enemy_occupied;
        while !captures.is_empty() {
            let to = captures.pop_lsb();
            let captured = position.piece_on(to);
            if square_rank(to) == promotion_rank {
                push_promotions(list, from, to, pawn, captured);
            } else {
                list.push(Move::new(from, to, NO_SPECIAL, pawn, captured));
            }
        }

        // en passant only to the recorded target square
        let ep = position.en_passant_square();
        if ep != NO_SQUARE && tables.pawn_attacks(side, from).get_bit(ep) {
            list.push(Move::quiet(from, ep, ENPASSANT, pawn));
        }
    }
}

fn piece_moves(
    position: &Position,
    tables: &AttackTables,
    list: &mut MoveList,
    gen: GenType,
    piece_type: usize,
) {
    let side = position.side_to_move();
    let enemy = side ^ 1;
    let occupied = position.occupied_all();
    let own = position.occupied(side);
    let enemy_occupied = position.occupied(enemy);
    let piece = make_piece(side, piece_type);

    let mut from_squares = position.piece_bitboard(side, piece_type);
    while !from_squares.is_empty() {
        let from = from_squares.pop_lsb();
        let attacks = match piece_type {
            KNIGHT => tables.knight_attacks(from),
            BISHOP => tables.bishop_attacks(from, occupied),
            ROOK => tables.rook_attacks(from, occupied),
            QUEEN => tables.queen_attacks(from, occupied),
            KING => tables.king_attacks(from),
            _ => unreachable!(),
        } & !own;

        let mut captures = attacks & enemy_occupied;
        while !captures.is_empty() {
            let to = captures.pop_lsb();
            list.push(Move::new(from, to, NO_SPECIAL, piece, position.piece_on(to)));
        }

        if gen == GenType::All {
            let mut quiets = attacks & !enemy_occupied;
            while !quiets.is_empty() {
                let to = quiets.pop_lsb();
                list.push(Move::quiet(from, to, NO_SPECIAL, piece));
            }
        }
    }
}

// Castling: right still held, intervening squares empty, and the king's
// current, transit and destination squares all unattacked.
fn white_castling_moves(position: &Position, tables: &AttackTables, list: &mut MoveList) {
    let rights = position.castling_rights();
    let occupied = position.occupied_all();
    let king = make_piece(WHITE, KING);

    if rights & WKCA != 0
        && !occupied.get_bit(5)
        && !occupied.get_bit(6)
        && !position.square_is_attacked(tables, 4, BLACK)
        && !position.square_is_attacked(tables, 5, BLACK)
        && !position.square_is_attacked(tables, 6, BLACK)
    {
        list.push(Move::quiet(4, 6, CASTLE, king));
    }
    if rights & WQCA != 0
        && !occupied.get_bit(1)
        && !occupied.get_bit(2)
        && !occupied.get_bit(3)
        && !position.square_is_attacked(tables, 4, BLACK)
        && !position.square_is_attacked(tables, 3, BLACK)
        && !position.square_is_attacked(tables, 2, BLACK)
    {
        list.push(Move::quiet(4, 2, CASTLE, king));
    }
}

fn black_castling_moves(position: &Position, tables: &AttackTables, list: &mut MoveList) {
    let rights = position.castling_rights();
    let occupied = position.occupied_all();
    let king = make_piece(BLACK, KING);

    if rights & BKCA != 0
        && !occupied.get_bit(61)
        && !occupied.get_bit(62)
        && !position.square_is_attacked(tables, 60, WHITE)
        && !position.square_is_attacked(tables, 61, WHITE)
        && !position.square_is_attacked(tables, 62, WHITE)
    {
        list.push(Move::quiet(60, 62, CASTLE, king));
    }
    if rights & BQCA != 0
        && !occupied.get_bit(57)
        && !occupied.get_bit(58)
        && !occupied.get_bit(59)
        && !position.square_is_attacked(tables, 60, WHITE)
        && !position.square_is_attacked(tables, 59, WHITE)
        && !position.square_is_attacked(tables, 58, WHITE)
    {
        list.push(Move::quiet(60, 58, CASTLE, king));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::NO_MOVE;
    use crate::position::START_FEN;

    fn moves_for(fen: &str) -> (Position, AttackTables, MoveList) {
        let tables = AttackTables::new();
        let position = Position::from_fen(fen).unwrap();
        let mut list = MoveList::new();
        generate_pseudo_moves(&position, &tables, &mut list);
        (position, tables, list)
    }

    #[test]
    fn test_startpos_has_twenty_moves() {
        let (_, _, list) = moves_for(START_FEN);
        assert_eq!(list.count, 20);
    }

    #[test]
    fn test_kiwipete_has_fortyeight_moves() {
        let (position, tables, list) =
            moves_for("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        // every Kiwipete move happens to be legal as well
        let mut position = position;
        let mut legal = 0;
        for i in 0..list.count {
            if position.do_move(&tables, list.moves[i]) {
                position.undo_move();
                legal += 1;
            }
        }
        assert_eq!(list.count, 48);
        assert_eq!(legal, 48);
    }

    #[test]
    fn test_no_duplicate_or_null_moves() {
        let (_, _, list) = moves_for("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        for i in 0..list.count {
            assert_ne!(list.moves[i], NO_MOVE);
            for j in (i + 1)..list.count {
                assert_ne!(list.moves[i], list.moves[j]);
            }
        }
    }

    #[test]
    fn test_captures_are_subset_with_expected_kinds() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let tables = AttackTables::new();
        let position = Position::from_fen(fen).unwrap();
        let mut all = MoveList::new();
        let mut captures = MoveList::new();
        generate_pseudo_moves(&position, &tables, &mut all);
        generate_pseudo_captures(&position, &tables, &mut captures);

        assert!(captures.count > 0 && captures.count < all.count);
        for mv in captures.iter() {
            assert!(mv.is_capture() || mv.is_promotion());
            assert!(all.contains(*mv));
        }
        // nothing tactical was left out
        for mv in all.iter() {
            if mv.is_capture() || mv.is_promotion() {
                assert!(captures.contains(*mv));
            }
        }
    }

    #[test]
    fn test_double_push_needs_empty_intermediate() {
        // Knight on e3 blocks both e2e3 and e2e4.
        let (_, _, list) = moves_for("4k3/8/8/8/8/4n3/4P3/4K3 w - - 0 1");
        for mv in list.iter() {
            assert_ne!(mv.target(), 20, "push onto blocker generated");
            assert_ne!(
                (mv.source(), mv.target()),
                (12, 28),
                "double push through blocker generated"
            );
        }
    }

    #[test]
    fn test_en_passant_only_to_recorded_target() {
        let with_target =
            "rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3";
        let (_, _, list) = moves_for(with_target);
        assert!(list.iter().any(|m| m.special() == ENPASSANT && m.target() == 43));

        let without_target =
            "rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq - 0 3";
        let (_, _, list) = moves_for(without_target);
        assert!(list.iter().all(|m| m.special() != ENPASSANT));
    }

    #[test]
    fn test_castling_blocked_by_attacked_transit_square() {
        // Black rook on f8 covers f1: white may not castle kingside, but
        // queenside stays available.
        let (_, _, list) = moves_for("5rk1/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        assert!(list.iter().all(|m| !(m.special() == CASTLE && m.target() == 6)));
        assert!(list.iter().any(|m| m.special() == CASTLE && m.target() == 2));
    }

    #[test]
    fn test_castling_requires_empty_path() {
        let (_, _, list) = moves_for("4k3/8/8/8/8/8/8/R2QK2R w KQ - 0 1");
        // queen on d1 blocks queenside castling only
        assert!(list.iter().any(|m| m.special() == CASTLE && m.target() == 6));
        assert!(list.iter().all(|m| !(m.special() == CASTLE && m.target() == 2)));
    }

    #[test]
    fn test_promotion_fan_out() {
        let (_, _, list) = moves_for("8/4P1k1/8/8/8/8/8/4K3 w - - 0 1");
        let promotions: Vec<_> = list.iter().filter(|m| m.is_promotion()).collect();
        assert_eq!(promotions.len(), 4);
        let types: Vec<usize> = promotions.iter().map(|m| m.promoted_type()).collect();
        assert!(types.contains(&QUEEN) && types.contains(&ROOK));
        assert!(types.contains(&BISHOP) && types.contains(&KNIGHT));
    }
}
