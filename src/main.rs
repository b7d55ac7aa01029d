use std::io::{self, BufRead};

use gat_engine::engine::Engine;
use gat_engine::protocol;

fn main() {
    env_logger::init();
    let mut engine = Engine::new();
    let stdin = io::stdin();
    protocol::run_loop(&mut engine, stdin.lock(), io::stdout());
}
