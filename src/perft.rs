use crate::attacks::AttackTables;
use crate::movegen;
use crate::moves::MoveList;
use crate::position::Position;
use std::time::Instant;

// Leaf-node count at fixed depth with no evaluation: the move generator's
// correctness and performance yardstick.
pub fn perft(position: &mut Position, tables: &AttackTables, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }

    let mut list = MoveList::new();
    movegen::generate_pseudo_moves(position, tables, &mut list);

    let mut nodes = 0;
    for index in 0..list.count {
        let mv = list.moves[index];
        if !position.do_move(tables, mv) {
            continue;
        }
        nodes += perft(position, tables, depth - 1);
        position.undo_move();
    }
    nodes
}

// Root breakdown: per-move subtree counts plus the total.
pub fn perft_divide(position: &mut Position, tables: &AttackTables, depth: u8) -> u64 {
    let mut list = MoveList::new();
    movegen::generate_pseudo_moves(position, tables, &mut list);

    let mut total = 0;
    for index in 0..list.count {
        let mv = list.moves[index];
        if !position.do_move(tables, mv) {
            continue;
        }
        let nodes = if depth > 0 {
            perft(position, tables, depth - 1)
        } else {
            1
        };
        position.undo_move();
        println!("{}: {}", mv.algebraic(), nodes);
        total += nodes;
    }
    println!("\ntotal nodes: {}", total);
    total
}

pub fn run_perft_suite() {
    println!("--- Basalt Perft Suite ---");

    let positions: [(&str, &str, [u64; 5]); 5] = [
        (
            "Start Position",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            [20, 400, 8902, 197281, 4865609],
        ),
        (
            "Kiwipete",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            [48, 2039, 97862, 4085603, 193690690],
        ),
        (
            "Position 3",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            [14, 191, 2812, 43238, 674624],
        ),
        (
            "Position 4",
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            [6, 264, 9467, 422333, 15833292],
        ),
        (
            "Position 5",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            [44, 1486, 62379, 2103487, 89941194],
        ),
    ];

    let tables = AttackTables::new();
    let mut total_nodes = 0u64;
    let mut total_ms = 0u128;
    let mut failures = 0;

    for (name, fen, expected) in positions.iter() {
        println!("\nTesting: {}", name);
        let mut position = match Position::from_fen(fen) {
            Ok(position) => position,
            Err(err) => {
                println!("RESULT: FAIL (bad FEN: {})", err);
                failures += 1;
                continue;
            }
        };

        let depth = 4;
        let start = Instant::now();
        let nodes = perft(&mut position, &tables, depth);
        let elapsed = start.elapsed().as_millis();

        total_nodes += nodes;
        total_ms += elapsed;

        println!("Depth {}: nodes {} time {}ms", depth, nodes, elapsed);
        if nodes == expected[depth as usize - 1] {
            println!("RESULT: PASS");
        } else {
            println!("RESULT: FAIL (expected {})", expected[depth as usize - 1]);
            perft_divide(&mut position, &tables, depth);
            failures += 1;
        }
    }

    println!("\n--- SUITE COMPLETE ({} failures) ---", failures);
    println!("Total nodes: {}", total_nodes);
    println!("Total time:  {}ms", total_ms);
    if total_ms > 0 {
        println!("NPS:         {}", (total_nodes as u128 * 1000) / total_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::START_FEN;

    #[test]
    fn test_perft_start_position() {
        let tables = AttackTables::new();
        let mut position = Position::from_fen(START_FEN).unwrap();
        assert_eq!(perft(&mut position, &tables, 1), 20);
        assert_eq!(perft(&mut position, &tables, 2), 400);
        assert_eq!(perft(&mut position, &tables, 3), 8902);
    }

    #[test]
    fn test_perft_kiwipete() {
        let tables = AttackTables::new();
        let mut position = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&mut position, &tables, 1), 48);
        assert_eq!(perft(&mut position, &tables, 2), 2039);
    }

    #[test]
    fn test_perft_en_passant_and_promotion_position() {
        let tables = AttackTables::new();
        let mut position = Position::from_fen(
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&mut position, &tables, 1), 6);
        assert_eq!(perft(&mut position, &tables, 2), 264);
        assert_eq!(perft(&mut position, &tables, 3), 9467);
    }

    #[test]
    fn test_perft_restores_position() {
        let tables = AttackTables::new();
        let mut position = Position::from_fen(START_FEN).unwrap();
        let key = position.key();
        perft(&mut position, &tables, 3);
        assert_eq!(position.to_fen(), START_FEN);
        assert_eq!(position.key(), key);
    }

    #[test]
    fn test_perft_divide_sums_to_total() {
        let tables = AttackTables::new();
        let mut position = Position::from_fen(START_FEN).unwrap();
        let total = perft_divide(&mut position, &tables, 2);
        assert_eq!(total, 400);
    }
}
