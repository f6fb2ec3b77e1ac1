use crate::attacks::AttackTables;
use crate::movegen;
use crate::moves::{Move, MoveList};
use crate::perft;
use crate::position::Position;
use crate::search::{self, SearchInfo};
use crate::time::{BudgetParams, TimeManager};
use crate::tt::{TranspositionTable, DEFAULT_TT_MB, MAX_TT_MB, MIN_TT_MB};
use crate::types::{KNIGHT, MAX_DEPTH, QUEEN, ROOK};
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub fn uci_loop() {
    let tables = AttackTables::new();
    let mut tt = TranspositionTable::new(DEFAULT_TT_MB);
    let mut position = Position::startpos();
    let stop = Arc::new(AtomicBool::new(false));
    let mut move_overhead: u64 = 5;

    let stdin = io::stdin();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        match stdin.lock().read_line(&mut buffer) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(err) => {
                log::error!("error reading stdin: {}", err);
                break;
            }
        }

        let line = buffer.trim();
        if line.is_empty() {
            continue;
        }
        log::debug!("UCI input: {}", line);

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "uci" => {
                println!("id name Basalt 0.1.0");
                println!("id author Basalt authors");
                println!(
                    "option name Hash type spin default {} min {} max {}",
                    DEFAULT_TT_MB, MIN_TT_MB, MAX_TT_MB
                );
                println!("option name Move Overhead type spin default 5 min 0 max 5000");
                println!("uciok");
            }
            "isready" => println!("readyok"),
            "ucinewgame" => {
                tt.clear();
                position = Position::startpos();
            }
            "position" => handle_position(&mut position, &tables, &parts),
            "go" => handle_go(&mut position, &tables, &mut tt, &stop, move_overhead, &parts),
            "setoption" => {
                handle_setoption(&mut tt, &mut move_overhead, &parts);
            }
            "d" => print!("{}", position),
            // search runs synchronously, so nothing is in flight here; the
            // flag still serves an embedding that searches on another thread
            "stop" => stop.store(true, Ordering::Relaxed),
            "quit" => break,
            other => println!("Unknown command: {}", other),
        }
    }
}

fn handle_position(position: &mut Position, tables: &AttackTables, parts: &[&str]) {
    if parts.len() < 2 {
        return;
    }

    let mut move_index = parts.len();
    if parts[1] == "startpos" {
        *position = Position::startpos();
        if parts.len() > 2 && parts[2] == "moves" {
            move_index = 3;
        }
    } else if parts[1] == "fen" {
        let mut fen = String::new();
        let mut index = 2;
        while index < parts.len() && parts[index] != "moves" {
            fen.push_str(parts[index]);
            fen.push(' ');
            index += 1;
        }
        if let Err(err) = position.set_from_fen(&fen) {
            log::warn!("rejected FEN {:?}: {}", fen, err);
            return;
        }
        if index < parts.len() && parts[index] == "moves" {
            move_index = index + 1;
        }
    } else {
        return;
    }

    for text in &parts[move_index.min(parts.len())..] {
        let applied = match resolve_move(position, tables, text) {
            Some(mv) => position.do_move(tables, mv),
            None => false,
        };
        if !applied {
            log::warn!("rejected move {:?}", text);
            break;
        }
    }
}

// Resolves a 4-5 character coordinate move against the current position,
// inferring the special-move tag (double push, en passant, castle,
// promotion) from board state via the generator.
pub fn resolve_move(position: &Position, tables: &AttackTables, text: &str) -> Option<Move> {
    if !text.is_ascii() || text.len() < 4 || text.len() > 5 {
        return None;
    }
    let from = square_from_str(&text[0..2])?;
    let to = square_from_str(&text[2..4])?;
    let promotion = match text.as_bytes().get(4).copied() {
        None => None,
        Some(b'n') => Some(KNIGHT),
        Some(b'b') => Some(crate::types::BISHOP),
        Some(b'r') => Some(ROOK),
        Some(b'q') => Some(QUEEN),
        Some(_) => return None,
    };

    let mut list = MoveList::new();
    movegen::generate_pseudo_moves(position, tables, &mut list);
    for mv in list.iter() {
        if mv.source() != from || mv.target() != to {
            continue;
        }
        let generated_promotion = if mv.is_promotion() {
            Some(mv.promoted_type())
        } else {
            None
        };
        if generated_promotion == promotion {
            return Some(*mv);
        }
    }
    None
}

fn square_from_str(text: &str) -> Option<u8> {
    let bytes = text.as_bytes();
    if bytes.len() != 2 || !(b'a'..=b'h').contains(&bytes[0]) || !(b'1'..=b'8').contains(&bytes[1])
    {
        return None;
    }
    Some((bytes[1] - b'1') * 8 + (bytes[0] - b'a'))
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct GoParams {
    pub depth: Option<u8>,
    pub move_time: Option<u64>,
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub moves_to_go: Option<u32>,
    pub infinite: bool,
    pub perft: Option<u8>,
}

pub fn parse_go(parts: &[&str]) -> GoParams {
    let mut params = GoParams::default();
    let mut index = 1;
    while index < parts.len() {
        let value = parts.get(index + 1).copied();
        match parts[index] {
            "depth" => {
                params.depth = value.and_then(|v| v.parse().ok());
                index += 1;
            }
            "movetime" => {
                params.move_time = value.and_then(|v| v.parse().ok());
                index += 1;
            }
            "wtime" => {
                params.wtime = value.and_then(|v| v.parse().ok());
                index += 1;
            }
            "btime" => {
                params.btime = value.and_then(|v| v.parse().ok());
                index += 1;
            }
            "winc" => {
                params.winc = value.and_then(|v| v.parse().ok());
                index += 1;
            }
            "binc" => {
                params.binc = value.and_then(|v| v.parse().ok());
                index += 1;
            }
            "movestogo" => {
                params.moves_to_go = value.and_then(|v| v.parse().ok());
                index += 1;
            }
            "perft" => {
                params.perft = value.and_then(|v| v.parse().ok());
                index += 1;
            }
            "infinite" => params.infinite = true,
            _ => {}
        }
        index += 1;
    }
    params
}

fn handle_go(
    position: &mut Position,
    tables: &AttackTables,
    tt: &mut TranspositionTable,
    stop: &Arc<AtomicBool>,
    move_overhead: u64,
    parts: &[&str],
) {
    let params = parse_go(parts);

    if let Some(depth) = params.perft {
        let start = Instant::now();
        let total = perft::perft_divide(position, tables, depth);
        log::info!(
            "perft {} = {} in {}ms",
            depth,
            total,
            start.elapsed().as_millis()
        );
        return;
    }

    let side = position.side_to_move();
    let (color_time, inc) = if side == crate::types::WHITE {
        (params.wtime, params.winc)
    } else {
        (params.btime, params.binc)
    };

    let mut time_manager = TimeManager::new();
    time_manager.mark_start();
    if !params.infinite {
        time_manager.allocate_budget(&BudgetParams {
            move_time_ms: params.move_time,
            color_time_ms: color_time,
            inc_ms: inc,
            moves_to_go: params.moves_to_go,
            ply: Some(position.ply() as u32),
            overhead_ms: move_overhead,
        });
    }

    let depth = params.depth.unwrap_or(MAX_DEPTH as u8);
    stop.store(false, Ordering::Relaxed);
    let mut info = SearchInfo::new(depth, time_manager, Arc::clone(stop));

    let (_, best_move) = search::search(position, tables, tt, &mut info);
    match best_move {
        Some(mv) => println!("bestmove {}", mv.algebraic()),
        None => println!("bestmove (none)"),
    }
}

fn handle_setoption(tt: &mut TranspositionTable, move_overhead: &mut u64, parts: &[&str]) {
    // setoption name <tokens...> value <v>
    let value_index = match parts.iter().position(|&part| part == "value") {
        Some(index) => index,
        None => return,
    };
    if parts.len() < 3 || parts[1] != "name" || value_index + 1 >= parts.len() {
        return;
    }
    let name = parts[2..value_index].join(" ");
    let value = parts[value_index + 1];

    if name.eq_ignore_ascii_case("Hash") {
        if let Ok(megabytes) = value.parse::<usize>() {
            tt.resize(megabytes);
            log::info!("hash resized to {} MB", tt.current_size_mb());
        }
    } else if name.eq_ignore_ascii_case("Move Overhead") {
        if let Ok(overhead) = value.parse::<u64>() {
            *move_overhead = overhead.min(5000);
        }
    }
}
