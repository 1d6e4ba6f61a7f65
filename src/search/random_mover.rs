use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::eval::EvalTable;
use crate::games::packed::PackedState;
use crate::general::move_list::Moves;
use crate::search::{Decision, Strategy};

/// Picks a uniformly random playable move; the weakest baseline opponent.
#[derive(Debug)]
pub struct RandomMover {
    rng: StdRng,
    buf: Moves,
}

impl RandomMover {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            buf: Moves::default(),
        }
    }
}

impl Strategy for RandomMover {
    fn pick_move(
        &mut self,
        root: &PackedState,
        _table: &EvalTable,
        _depth: usize,
    ) -> Option<Decision> {
        root.available_moves_into(&mut self.buf, false);
        if self.buf.is_empty() {
            return None;
        }
        let id = self.buf.get(self.rng.gen_range(0..self.buf.len()));
        Some(Decision {
            mov: id,
            value: root.utility(root.turn()),
        })
    }

    fn name(&self) -> &'static str {
        "Random Mover"
    }

    fn nodes(&self) -> u64 {
        1
    }
}
