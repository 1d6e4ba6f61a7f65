use std::time::{Duration, Instant};

use crate::eval::EvalTable;
use crate::games::packed::PackedState;
use crate::search::{instant_win, Decision, Strategy, INITIAL_PLY, MAX_PLY};

/// How many turns a whole game is budgeted for.
pub const EXPECTED_GAME_TURNS: u64 = 20;
/// A single turn may spend at most this fraction of the remaining clock.
pub const FUTURE_TURN_BUDGET: u64 = 12;
/// Safety margin on top of the measured growth between depths.
const PREDICTION_MARGIN: f64 = 4.0;

/// Runs fixed-depth searches of increasing ply inside a wall-clock budget.
/// A depth that has been started always runs to completion; the deadline is
/// only consulted between depths, and a depth is not started if its predicted
/// cost overshoots what is left of the budget. The move of the deepest
/// completed depth is returned.
#[derive(Debug)]
pub struct DeepeningController {
    strategy: Box<dyn Strategy>,
    longest_game_nanos: u64,
}

impl DeepeningController {
    pub fn new(strategy: Box<dyn Strategy>) -> Self {
        Self {
            strategy,
            longest_game_nanos: 0,
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn nodes(&self) -> u64 {
        self.strategy.nodes()
    }

    pub fn choose(
        &mut self,
        root: &PackedState,
        table: &EvalTable,
        remaining: Duration,
    ) -> Option<Decision> {
        if root.is_over() {
            return None;
        }
        let remaining_nanos = remaining.as_nanos() as u64;
        // The largest clock reading seen so far approximates the game length.
        self.longest_game_nanos = self.longest_game_nanos.max(remaining_nanos);
        let per_turn = self.longest_game_nanos / EXPECTED_GAME_TURNS;
        let throttled = remaining_nanos / FUTURE_TURN_BUDGET;
        let budget = per_turn.min(throttled);

        if let Some(win) = instant_win(root, table) {
            return Some(win);
        }

        let start = Instant::now();
        let mut chosen = None;
        let mut completed: Vec<(usize, u64)> = Vec::new();
        for depth in INITIAL_PLY..=MAX_PLY {
            let before = Instant::now();
            let Some(decision) = self.strategy.pick_move(root, table, depth) else {
                break;
            };
            chosen = Some(decision);
            completed.push((depth, before.elapsed().as_nanos().max(1) as u64));
            let spent = start.elapsed().as_nanos() as u64;
            if spent >= budget || spent + predict_next(&completed) > budget {
                break;
            }
        }
        chosen
    }
}

/// Estimated cost of the next depth: the duration of the last completed depth
/// scaled by the growth between the two most recent depths (dampened when
/// they are two plies apart), clamped to at least no shrinking, plus a
/// safety margin.
fn predict_next(completed: &[(usize, u64)]) -> u64 {
    let (last_depth, last_nanos) = completed[completed.len() - 1];
    let ratio = if completed.len() >= 2 {
        let (prev_depth, prev_nanos) = completed[completed.len() - 2];
        let ratio = last_nanos as f64 / prev_nanos.max(1) as f64;
        if last_depth - prev_depth == 2 {
            ratio.powf(0.4)
        } else {
            ratio
        }
    } else {
        1.0
    };
    let multiplier = ratio.max(1.0) + PREDICTION_MARGIN;
    (last_nanos as f64 * multiplier) as u64
}
