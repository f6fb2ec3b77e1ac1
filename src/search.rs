use crate::attacks::AttackTables;
use crate::eval::{self, Score, DRAW_SCORE};
use crate::movegen;
use crate::moves::{
    mvv_lva_score, Move, MoveList, MoveScore, ENPASSANT, KILLER_SCORE_0, KILLER_SCORE_1,
    MAX_KILLER_MOVES, NO_MOVE, PV_SCORE,
};
use crate::position::Position;
use crate::time::TimeManager;
use crate::tt::{Bound, TranspositionTable};
use crate::types::MAX_DEPTH;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const INFINITY: Score = 32_000;
pub const CHECKMATE_SCORE: Score = 31_000;
pub const MATE_THRESHOLD: Score = 30_000;

const STOP_CHECK_INTERVAL: u64 = 2048;

// Per-search state: limits, counters and the ordering heuristics. The stop
// flag is the only piece shared with the outside; everything else belongs
// to the single searching thread.
pub struct SearchInfo {
    pub depth: u8,
    pub time_manager: TimeManager,
    pub stop: Arc<AtomicBool>,
    pub nodes: u64,
    search_ply: usize,
    stopped: bool,
    killers: [[Move; MAX_KILLER_MOVES]; MAX_DEPTH],
    history: [[MoveScore; 64]; 12],
}

impl SearchInfo {
    pub fn new(depth: u8, time_manager: TimeManager, stop: Arc<AtomicBool>) -> Self {
        Self {
            depth,
            time_manager,
            stop,
            nodes: 0,
            search_ply: 0,
            stopped: false,
            killers: [[NO_MOVE; MAX_KILLER_MOVES]; MAX_DEPTH],
            history: [[0; 64]; 12],
        }
    }

    fn clean(&mut self) {
        self.nodes = 0;
        self.search_ply = 0;
        self.stopped = false;
        self.killers = [[NO_MOVE; MAX_KILLER_MOVES]; MAX_DEPTH];
        self.history = [[0; 64]; 12];
    }

    #[inline(always)]
    fn check_stop(&mut self) {
        if self.nodes % STOP_CHECK_INTERVAL == 0
            && (self.time_manager.out_of_time() || self.stop.load(Ordering::Relaxed))
        {
            self.stopped = true;
        }
    }
}

// Iterative deepening driver. Each fully completed depth promotes its PV
// move to the provisional answer, so an interrupted search still returns a
// legal move. Returns the final score and best move (None = no legal move).
pub fn search(
    position: &mut Position,
    tables: &AttackTables,
    tt: &mut TranspositionTable,
    info: &mut SearchInfo,
) -> (Score, Option<Move>) {
    info.clean();

    let mut best_move = match first_legal_move(position, tables) {
        Some(mv) => mv,
        None => {
            let score = if position.in_check(tables) {
                -CHECKMATE_SCORE
            } else {
                DRAW_SCORE
            };
            return (score, None);
        }
    };

    let mut best_score = -CHECKMATE_SCORE;
    let mut prev_total_nodes = 0u64;
    let mut last_iter_nodes = 0u64;
    let max_depth = info.depth.clamp(1, MAX_DEPTH as u8);

    for current_depth in 1..=max_depth {
        let iter_start_ms = info.time_manager.elapsed_ms();

        let score = alpha_beta(position, tables, tt, info, -INFINITY, INFINITY, current_depth);

        // a partially searched depth may not have a trustworthy PV
        if info.stopped || info.time_manager.out_of_time() || info.stop.load(Ordering::Relaxed) {
            break;
        }
        best_score = score;

        let pv = tt.pv_line(position, tables, current_depth as usize);
        if pv.depth > 0 {
            best_move = pv.moves[0];
        }

        print_iteration_info(current_depth, score, &pv, info);

        let iter_ms = info.time_manager.elapsed_ms() - iter_start_ms;
        let iter_nodes = info.nodes - prev_total_nodes;
        info.time_manager.on_iteration_finished(iter_nodes, last_iter_nodes);
        last_iter_nodes = iter_nodes;
        prev_total_nodes = info.nodes;

        if !info.time_manager.enough_time_for_next_iteration(iter_ms) {
            break;
        }
    }

    (best_score, Some(best_move))
}

fn print_iteration_info(depth: u8, score: Score, pv: &crate::tt::PVLine, info: &SearchInfo) {
    let score_str = if score > MATE_THRESHOLD {
        format!("mate {}", (CHECKMATE_SCORE - score + 1) / 2)
    } else if score < -MATE_THRESHOLD {
        format!("mate -{}", (CHECKMATE_SCORE + score + 1) / 2)
    } else {
        format!("cp {}", score)
    };

    print!(
        "info depth {} score {} nodes {} time {} pv",
        depth,
        score_str,
        info.nodes,
        info.time_manager.elapsed_ms()
    );
    for index in 0..pv.depth {
        print!(" {}", pv.moves[index].algebraic());
    }
    println!();
}

pub(crate) fn is_draw(position: &Position) -> bool {
    eval::material_draw(position)
        || position.fifty_moves() >= 100
        || position.is_threefold_repetition()
}

fn first_legal_move(position: &mut Position, tables: &AttackTables) -> Option<Move> {
    let mut list = MoveList::new();
    movegen::generate_pseudo_moves(position, tables, &mut list);
    for index in 0..list.count {
        let mv = list.moves[index];
        if position.do_move(tables, mv) {
            position.undo_move();
            return Some(mv);
        }
    }
    None
}

// Assigns ordering scores: PV move, then captures by victim/attacker, then
// the two killer quiets for this ply, then the history heuristic.
fn score_moves(list: &mut MoveList, info: &SearchInfo, pv_move: Move) {
    let ply = info.search_ply.min(MAX_DEPTH - 1);
    for index in 0..list.count {
        let mv = list.moves[index];
        let score = if !pv_move.is_none() && mv == pv_move {
            PV_SCORE
        } else if mv.special() == ENPASSANT {
            mvv_lva_score(mv.attacker_piece(), mv.attacker_piece())
        } else if mv.is_capture() {
            mvv_lva_score(mv.attacker_piece(), mv.captured_piece())
        } else if mv == info.killers[ply][0] {
            KILLER_SCORE_0
        } else if mv == info.killers[ply][1] {
            KILLER_SCORE_1
        } else {
            info.history[mv.attacker_piece()][mv.target() as usize].min(KILLER_SCORE_1 - 1)
        };
        list.moves[index] = mv.with_score(score);
    }
}

// Selection pass: swap the best remaining move to the front of the tail.
fn pick_move(list: &mut MoveList, start: usize) {
    let mut best_index = start;
    let mut best_score = list.moves[start].score();
    for index in (start + 1)..list.count {
        if list.moves[index].score() > best_score {
            best_score = list.moves[index].score();
            best_index = index;
        }
    }
    list.moves.swap(start, best_index);
}

fn alpha_beta(
    position: &mut Position,
    tables: &AttackTables,
    tt: &mut TranspositionTable,
    info: &mut SearchInfo,
    mut alpha: Score,
    beta: Score,
    mut depth: u8,
) -> Score {
    if info.search_ply > 0 && is_draw(position) {
        return DRAW_SCORE;
    }

    if depth == 0 {
        return quiescence(position, tables, tt, info, alpha, beta);
    }

    info.nodes += 1;
    info.check_stop();
    if info.stopped {
        return 0;
    }

    if info.search_ply >= MAX_DEPTH - 1 {
        return eval::evaluate(position);
    }

    let in_check = position.in_check(tables);
    if in_check {
        depth += 1;
    }

    // a sufficiently deep, correctly bounded cache entry ends the node
    let mut pv_move = NO_MOVE;
    if let Some(entry) = tt.probe(position.key()) {
        pv_move = entry.mv;
        if info.search_ply > 0 && entry.depth >= depth {
            match entry.bound {
                Bound::Exact => return entry.score,
                Bound::Lower => {
                    if entry.score >= beta {
                        return beta;
                    }
                }
                Bound::Upper => {
                    if entry.score <= alpha {
                        return alpha;
                    }
                }
                Bound::None => {}
            }
        }
    }

    let mut list = MoveList::new();
    movegen::generate_pseudo_moves(position, tables, &mut list);
    score_moves(&mut list, info, pv_move);

    let old_alpha = alpha;
    let mut best_move = NO_MOVE;
    let mut legal_moves = 0;

    for index in 0..list.count {
        pick_move(&mut list, index);
        let mv = list.moves[index];
        if !position.do_move(tables, mv) {
            continue;
        }
        info.search_ply += 1;
        legal_moves += 1;

        let score = -alpha_beta(position, tables, tt, info, -beta, -alpha, depth - 1);

        position.undo_move();
        info.search_ply -= 1;

        if info.stopped {
            return 0;
        }

        if score > alpha {
            if score >= beta {
                if !mv.is_capture() {
                    let ply = info.search_ply.min(MAX_DEPTH - 1);
                    if mv != info.killers[ply][0] {
                        info.killers[ply][1] = info.killers[ply][0];
                        info.killers[ply][0] = Move(mv.raw());
                    }
                }
                tt.store(position.key(), depth, beta, Bound::Lower, mv);
                return beta;
            }
            alpha = score;
            best_move = mv;
            if !mv.is_capture() {
                info.history[mv.attacker_piece()][mv.target() as usize] += depth as MoveScore;
            }
        }
    }

    if legal_moves == 0 {
        return if in_check {
            // prefer shorter mates
            -CHECKMATE_SCORE + info.search_ply as Score
        } else {
            DRAW_SCORE
        };
    }

    if alpha != old_alpha {
        tt.store(position.key(), depth, alpha, Bound::Exact, best_move);
    } else {
        tt.store(position.key(), depth, alpha, Bound::Upper, NO_MOVE);
    }

    alpha
}

// Capture/promotion-only extension of the leaf: the stand-pat score is the
// floor, and the ply cap bounds pathological exchange chains.
fn quiescence(
    position: &mut Position,
    tables: &AttackTables,
    tt: &mut TranspositionTable,
    info: &mut SearchInfo,
    mut alpha: Score,
    beta: Score,
) -> Score {
    info.nodes += 1;
    info.check_stop();
    if info.stopped {
        return 0;
    }

    if is_draw(position) {
        return DRAW_SCORE;
    }

    let stand_pat = eval::evaluate(position);
    if info.search_ply >= MAX_DEPTH - 1 {
        return stand_pat;
    }
    if stand_pat >= beta {
        return beta;
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }

    let mut list = MoveList::new();
    movegen::generate_pseudo_captures(position, tables, &mut list);
    score_moves(&mut list, info, NO_MOVE);

    let old_alpha = alpha;
    let mut best_move = NO_MOVE;

    for index in 0..list.count {
        pick_move(&mut list, index);
        let mv = list.moves[index];
        if !position.do_move(tables, mv) {
            continue;
        }
        info.search_ply += 1;

        let score = -quiescence(position, tables, tt, info, -beta, -alpha);

        position.undo_move();
        info.search_ply -= 1;

        if info.stopped {
            return 0;
        }

        if score > alpha {
            if score >= beta {
                return beta;
            }
            alpha = score;
            best_move = mv;
        }
    }

    if alpha != old_alpha {
        tt.store(position.key(), 0, alpha, Bound::Exact, best_move);
    }

    alpha
}
