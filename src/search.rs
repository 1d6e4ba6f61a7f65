use std::fmt::Debug;
use std::time::Instant;

use colored::Colorize;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::eval::EvalTable;
use crate::games::catalogue::catalogue;
use crate::games::packed::{PackedState, WIN_UTILITY};
use crate::games::rules::RulesBoard;
use crate::general::move_list::Moves;

pub mod deepening;
pub mod maximax;
pub mod minimax;
pub mod pvs;
pub mod quiescence;
pub mod random_mover;

/// Hard cap on the iterative-deepening target; also sizes the per-ply
/// buffer fleets.
pub const MAX_PLY: usize = 12;
pub const INITIAL_PLY: usize = 2;

/// Extra plies of buffers beyond `MAX_PLY`, for the quiescence tails.
const PLY_MARGIN: usize = 8;

pub(crate) fn ply_buffers() -> Vec<Moves> {
    vec![Moves::default(); MAX_PLY + PLY_MARGIN]
}

/// A chosen root move (a catalogue id) and its backed-up utility from the
/// agent's perspective.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Decision {
    pub mov: u32,
    pub value: i32,
}

/// A fixed-ply search over the packed state. The agent is the color to move
/// in the root position. Strategies own their buffers and their random
/// source, so a seeded strategy reproduces its choices bit for bit.
pub trait Strategy: Debug + Send {
    fn pick_move(&mut self, root: &PackedState, table: &EvalTable, depth: usize)
        -> Option<Decision>;

    fn name(&self) -> &'static str;

    /// States expanded during the most recent `pick_move` call.
    fn nodes(&self) -> u64;
}

/// 50/50 replacement among equally good moves.
pub(crate) fn coin(rng: &mut StdRng) -> bool {
    rng.gen_bool(0.5)
}

/// Scans the root moves for one that captures a king for the agent right
/// away. Shared by the maximax root and the deepening controller's pre-loop.
pub fn instant_win(root: &PackedState, table: &EvalTable) -> Option<Decision> {
    if root.is_over() {
        return None;
    }
    let mut buf = Moves::default();
    root.available_moves_into(&mut buf, false);
    let agent = root.turn();
    for i in 0..buf.len() {
        let id = buf.get(i);
        let mut child = *root;
        child.apply(catalogue().mov(id), table);
        if let Some(finish) = child.finish() {
            if finish.winner == agent {
                return Some(Decision {
                    mov: id,
                    value: WIN_UTILITY,
                });
            }
        }
    }
    None
}

/// The packed starting position with fresh utilities, for tests and benches.
pub fn packed_from_startpos(table: &EvalTable) -> PackedState {
    let rules = RulesBoard::startpos(60_000);
    let mut state =
        PackedState::from_view(&rules).expect("internal error: startpos left the board manifold");
    state.refresh_utilities(table);
    state
}

/// A small suite of positions for node-count benching: the opening plus a few
/// scrambled middlegames reached by seeded random play.
pub fn bench_positions(table: &EvalTable) -> Vec<PackedState> {
    let mut positions = Vec::new();
    for (seed, plies) in [(0, 0), (17, 12), (42, 24), (99, 36)] {
        let mut rng = StdRng::seed_from_u64(seed);
        let rules = RulesBoard::startpos(60_000);
        let mut state = match PackedState::from_view(&rules) {
            Ok(state) => state,
            Err(_) => continue,
        };
        state.refresh_utilities(table);
        let mut buf = Moves::default();
        for _ in 0..plies {
            if state.is_over() {
                break;
            }
            state.available_moves_into(&mut buf, false);
            if buf.is_empty() {
                break;
            }
            let id = buf.get(rng.gen_range(0..buf.len()));
            state.apply(catalogue().mov(id), table);
        }
        if !state.is_over() {
            positions.push(state);
        }
    }
    positions
}

pub fn run_bench(strategy: &mut dyn Strategy, table: &EvalTable, depth: usize) -> String {
    let mut nodes = 0u64;
    let start = Instant::now();
    for position in bench_positions(table) {
        let _ = strategy.pick_move(&position, table, depth);
        nodes += strategy.nodes();
    }
    let time = start.elapsed();
    format!(
        "{0}: depth {depth}, nodes {nodes}, time {1}ms, nps {2}k",
        strategy.name(),
        time.as_millis(),
        ((nodes as f64 / time.as_micros().max(1) as f64 * 1000.0).round())
            .to_string()
            .red()
    )
}
