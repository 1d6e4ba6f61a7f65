use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::eval::params::CombinedParams;
use crate::eval::EvalTable;
use crate::games::catalogue::catalogue;
use crate::games::packed::PackedState;
use crate::games::rules::RulesBoard;
use crate::games::squares::Square;
use crate::games::BoardView;
use crate::search::deepening::DeepeningController;
use crate::search::maximax::Maximax;
use crate::search::minimax::Minimax;
use crate::search::pvs::Pvs;
use crate::search::quiescence::{Quiescence, RestrictedQuiescence};
use crate::search::random_mover::RandomMover;
use crate::search::Strategy;
use crate::Engine;

pub mod run_match;

/// The produced contract: given a snapshot of the externally managed board,
/// answer with a (from, to) pair. `clone_agent` duplicates parameters and
/// working memory so tournament workers can own independent copies.
pub trait Agent: Send {
    fn select(&mut self, view: &dyn BoardView) -> Result<(Square, Square), String>;

    fn clone_agent(&self) -> AnyAgent;

    fn name(&self) -> String;
}

pub type AnyAgent = Box<dyn Agent>;

pub fn build_agent(engine: Engine, params: &CombinedParams, seed: u64) -> Result<AnyAgent, String> {
    Ok(match engine {
        Engine::Random => Box::new(RandomAgent::new(seed)),
        Engine::Greedy => Box::new(GreedyAgent::new(seed)),
        _ => Box::new(SearchAgent::new(engine, params.clone(), seed)?),
    })
}

pub fn build_strategy(engine: Engine, seed: u64) -> Box<dyn Strategy> {
    match engine {
        Engine::Minimax => Box::new(Minimax::new(seed)),
        Engine::Maximax => Box::new(Maximax::new(seed)),
        Engine::Quiescence => Box::new(Quiescence::new(seed)),
        Engine::RestrictedQuiescence => Box::new(RestrictedQuiescence::new(seed)),
        Engine::Pvs => Box::new(Pvs::new()),
        Engine::Random | Engine::Greedy => Box::new(RandomMover::new(seed)),
    }
}

/// The real player: packs the board, refreshes the interpolated evaluation
/// once per turn and hands the position to the budgeted deepening controller.
pub struct SearchAgent {
    engine: Engine,
    seed: u64,
    params: CombinedParams,
    table: EvalTable,
    controller: DeepeningController,
    rng: StdRng,
}

impl SearchAgent {
    pub fn new(engine: Engine, params: CombinedParams, seed: u64) -> Result<Self, String> {
        let table = EvalTable::new(&params)?;
        Ok(Self {
            engine,
            seed,
            table,
            controller: DeepeningController::new(build_strategy(engine, seed)),
            params,
            rng: StdRng::seed_from_u64(seed),
        })
    }
}

impl Agent for SearchAgent {
    fn select(&mut self, view: &dyn BoardView) -> Result<(Square, Square), String> {
        let mut root = PackedState::from_view(view)?;
        let remaining_material = root.material(&self.params.start.type_values);
        self.table
            .update_interpolation(&self.params, remaining_material)?;
        root.refresh_utilities(&self.table);
        let remaining = Duration::from_millis(view.remaining_millis(view.turn()));
        if let Some(decision) = self.controller.choose(&root, &self.table, remaining) {
            let mov = catalogue().mov(decision.mov);
            return Ok((mov.from, mov.to));
        }
        // Having no playable move must still produce an answer; a random
        // catalogued candidate at least keeps the game going.
        root.random_catalogued_move(&mut self.rng)
            .ok_or_else(|| "no catalogued candidate for the side to move".to_string())
    }

    fn clone_agent(&self) -> AnyAgent {
        Box::new(
            SearchAgent::new(self.engine, self.params.clone(), self.seed.wrapping_add(1))
                .expect("parameters were already validated"),
        )
    }

    fn name(&self) -> String {
        self.controller.strategy_name().to_string()
    }
}

/// Baseline: a uniformly random legal move, chosen via the rules board.
pub struct RandomAgent {
    rng: StdRng,
    seed: u64,
}

impl RandomAgent {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }
}

impl Agent for RandomAgent {
    fn select(&mut self, view: &dyn BoardView) -> Result<(Square, Square), String> {
        let board = RulesBoard::from_view(view)?;
        let moves = board.legal_moves();
        if moves.is_empty() {
            let state = PackedState::from_view(view)?;
            return state
                .random_catalogued_move(&mut self.rng)
                .ok_or_else(|| "no catalogued candidate for the side to move".to_string());
        }
        Ok(moves[self.rng.gen_range(0..moves.len())])
    }

    fn clone_agent(&self) -> AnyAgent {
        Box::new(RandomAgent::new(self.seed.wrapping_add(1)))
    }

    fn name(&self) -> String {
        "Random".to_string()
    }
}

const GREEDY_VALUES: [i32; crate::games::NUM_PIECE_TYPES] = [1, 3, 3, 5, 9, 1000];

/// Baseline: grabs the most valuable piece in reach, moves randomly when
/// nothing hangs. A move the rules board rejects is simply not available.
pub struct GreedyAgent {
    rng: StdRng,
    seed: u64,
}

impl GreedyAgent {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }
}

impl Agent for GreedyAgent {
    fn select(&mut self, view: &dyn BoardView) -> Result<(Square, Square), String> {
        let board = RulesBoard::from_view(view)?;
        let moves = board.legal_moves();
        if moves.is_empty() {
            let state = PackedState::from_view(view)?;
            return state
                .random_catalogued_move(&mut self.rng)
                .ok_or_else(|| "no catalogued candidate for the side to move".to_string());
        }
        let mut best: Option<((Square, Square), i32)> = None;
        for pair in moves {
            let gain = board
                .piece_at(pair.1)
                .map_or(0, |(_, typ)| GREEDY_VALUES[typ.index()]);
            best = Some(match best {
                None => (pair, gain),
                Some(incumbent) => {
                    if gain > incumbent.1 || (gain == incumbent.1 && self.rng.gen_bool(0.5)) {
                        (pair, gain)
                    } else {
                        incumbent
                    }
                }
            });
        }
        best.map(|(pair, _)| pair)
            .ok_or_else(|| "no move available".to_string())
    }

    fn clone_agent(&self) -> AnyAgent {
        Box::new(GreedyAgent::new(self.seed.wrapping_add(1)))
    }

    fn name(&self) -> String {
        "Greedy".to_string()
    }
}
