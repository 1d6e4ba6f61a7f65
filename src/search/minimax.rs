use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::eval::EvalTable;
use crate::games::catalogue::catalogue;
use crate::games::packed::PackedState;
use crate::games::Color;
use crate::general::move_list::Moves;
use crate::search::{coin, ply_buffers, Decision, Strategy};

/// True two-opponent minimax: the agent maximizes its own utility and both
/// opponents are assumed to minimize it. Pessimistic in a three-seat game,
/// but the cleanest baseline for the window-based searches.
#[derive(Debug)]
pub struct Minimax {
    rng: StdRng,
    bufs: Vec<Moves>,
    nodes: u64,
}

impl Minimax {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            bufs: ply_buffers(),
            nodes: 0,
        }
    }

    fn node(
        &mut self,
        state: &PackedState,
        table: &EvalTable,
        agent: Color,
        depth: usize,
        ply: usize,
    ) -> i32 {
        if state.is_over() || depth <= 1 {
            return state.utility(agent);
        }
        state.available_moves_into(&mut self.bufs[ply], false);
        let len = self.bufs[ply].len();
        if len == 0 {
            return state.utility(agent);
        }
        let maximise = state.turn() == agent;
        let mut best = if maximise { i32::MIN } else { i32::MAX };
        for i in 0..len {
            let id = self.bufs[ply].get(i);
            let mut child = *state;
            child.apply(catalogue().mov(id), table);
            self.nodes += 1;
            let value = self.node(&child, table, agent, depth - 1, ply + 1);
            best = if maximise {
                best.max(value)
            } else {
                best.min(value)
            };
        }
        best
    }
}

impl Strategy for Minimax {
    fn pick_move(
        &mut self,
        root: &PackedState,
        table: &EvalTable,
        depth: usize,
    ) -> Option<Decision> {
        self.nodes = 0;
        let agent = root.turn();
        root.available_moves_into(&mut self.bufs[0], false);
        let len = self.bufs[0].len();
        let mut best: Option<(u32, i32)> = None;
        for i in 0..len {
            let id = self.bufs[0].get(i);
            let mut child = *root;
            child.apply(catalogue().mov(id), table);
            self.nodes += 1;
            let value = self.node(&child, table, agent, depth - 1, 1);
            best = Some(match best {
                None => (id, value),
                Some(incumbent) => {
                    if value > incumbent.1 || (value == incumbent.1 && coin(&mut self.rng)) {
                        (id, value)
                    } else {
                        incumbent
                    }
                }
            });
        }
        best.map(|(mov, value)| Decision { mov, value })
    }

    fn name(&self) -> &'static str {
        "Minimax"
    }

    fn nodes(&self) -> u64 {
        self.nodes
    }
}
