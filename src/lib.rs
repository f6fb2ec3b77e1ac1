pub mod attacks;
pub mod bitboard;
pub mod eval;
pub mod logging;
pub mod movegen;
pub mod moves;
pub mod perft;
pub mod position;
pub mod search;
pub mod time;
pub mod tt;
pub mod types;
pub mod uci;
pub mod zobrist;

use std::env;

pub fn run_cli() {
    logging::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() > 1 && args[1] == "perft" {
        perft::run_perft_suite();
        return;
    }

    uci::uci_loop();
}
