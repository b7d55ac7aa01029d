use std::env;
use std::time::Instant;

use gat_engine::board::GameState;
use gat_engine::movegen;

fn main() {
    env_logger::init();
    let mut args = env::args().skip(1);
    let fen = args.next().unwrap_or_else(|| GameState::new().to_fen());
    let depth: u32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(4);
    let divide = args.next().as_deref() == Some("divide");

    let mut state = GameState::from_fen(&fen);
    println!("perft depth {depth} from {fen}");

    let start = Instant::now();
    if divide {
        let mut total = 0u64;
        for (m, nodes) in movegen::perft_divide(&mut state, depth.saturating_sub(1)) {
            println!("  {m}: {nodes}");
            total += nodes;
        }
        println!("total: {total} in {:?}", start.elapsed());
    } else {
        let nodes = movegen::perft(&mut state, depth);
        println!("nodes: {nodes} in {:?}", start.elapsed());
    }
}
