use crate::eval::EvalTable;
use crate::games::catalogue::catalogue;
use crate::games::packed::{PackedState, WIN_UTILITY};
use crate::games::Color;
use crate::general::move_list::Moves;
use crate::search::{ply_buffers, Decision, Strategy};

/// The whole window; utilities never leave (-WIN_UTILITY, WIN_UTILITY], so
/// twice that is safely outside.
const WINDOW: i32 = 2 * WIN_UTILITY;

/// Principal-variation search over the agent's utility. The agent maximizes;
/// every other seat is treated as a minimizer against the agent, so the value
/// frame only flips when the turn passes between the agent and a non-agent
/// seat, never between the two opponents. The agent's non-first children are
/// probed with a null window and re-searched only when the probe lands
/// strictly inside the full window.
#[derive(Debug)]
pub struct Pvs {
    bufs: Vec<Moves>,
    nodes: u64,
}

impl Pvs {
    pub fn new() -> Self {
        Self {
            bufs: ply_buffers(),
            nodes: 0,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn node(
        &mut self,
        state: &PackedState,
        table: &EvalTable,
        agent: Color,
        depth: usize,
        ply: usize,
        mut alpha: i32,
        beta: i32,
        mul: i32,
    ) -> i32 {
        debug_assert!(alpha < beta);
        if state.is_over() || depth <= 1 {
            return mul * state.utility(agent);
        }
        state.available_moves_into(&mut self.bufs[ply], false);
        let len = self.bufs[ply].len();
        if len == 0 {
            return mul * state.utility(agent);
        }
        let agent_node = state.turn() == agent;
        let mut best = -WINDOW;
        for i in 0..len {
            let id = self.bufs[ply].get(i);
            let mut child = *state;
            child.apply(catalogue().mov(id), table);
            self.nodes += 1;
            let keep = !agent_node && child.turn() != agent;
            let value = if i == 0 || !agent_node {
                self.child_value(&child, table, agent, depth - 1, ply + 1, alpha, beta, mul, keep)
            } else {
                let probe = self.child_value(
                    &child,
                    table,
                    agent,
                    depth - 1,
                    ply + 1,
                    alpha,
                    alpha + 1,
                    mul,
                    keep,
                );
                if probe > alpha && probe < beta {
                    self.child_value(
                        &child,
                        table,
                        agent,
                        depth - 1,
                        ply + 1,
                        alpha,
                        beta,
                        mul,
                        keep,
                    )
                } else {
                    probe
                }
            };
            best = best.max(value);
            alpha = alpha.max(value);
            if alpha >= beta {
                break;
            }
        }
        best
    }

    #[allow(clippy::too_many_arguments)]
    fn child_value(
        &mut self,
        child: &PackedState,
        table: &EvalTable,
        agent: Color,
        depth: usize,
        ply: usize,
        alpha: i32,
        beta: i32,
        mul: i32,
        keep_alpha_beta: bool,
    ) -> i32 {
        if keep_alpha_beta {
            self.node(child, table, agent, depth, ply, alpha, beta, mul)
        } else {
            -self.node(child, table, agent, depth, ply, -beta, -alpha, -mul)
        }
    }
}

impl Default for Pvs {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for Pvs {
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
        let mut alpha = -WINDOW;
        let beta = WINDOW;
        let mut best: Option<(u32, i32)> = None;
        for i in 0..len {
            let id = self.bufs[0].get(i);
            let mut child = *root;
            child.apply(catalogue().mov(id), table);
            self.nodes += 1;
            let keep = false; // the root always belongs to the agent
            let value = if i == 0 {
                self.child_value(&child, table, agent, depth - 1, 1, alpha, beta, 1, keep)
            } else {
                let probe =
                    self.child_value(&child, table, agent, depth - 1, 1, alpha, alpha + 1, 1, keep);
                if probe > alpha && probe < beta {
                    self.child_value(&child, table, agent, depth - 1, 1, alpha, beta, 1, keep)
                } else {
                    probe
                }
            };
            match best {
                Some(incumbent) if value <= incumbent.1 => {}
                _ => best = Some((id, value)),
            }
            alpha = alpha.max(value);
        }
        best.map(|(mov, value)| Decision { mov, value })
    }

    fn name(&self) -> &'static str {
        "Principal Variation"
    }

    fn nodes(&self) -> u64 {
        self.nodes
    }
}

#[cfg(test)]
mod tests {
    use crate::eval::params::CombinedParams;
    use crate::games::rules::RulesBoard;
    use crate::games::squares::Square;
    use crate::games::{Color as Seat, PieceType};
    use crate::search::minimax::Minimax;
    use crate::search::packed_from_startpos;

    use super::*;

    fn table() -> EvalTable {
        EvalTable::new(&CombinedParams::default()).unwrap()
    }

    fn sparse_position(table: &EvalTable) -> PackedState {
        let mut rules = RulesBoard::empty(1_000);
        rules.place(Square::from_parts(0, 0, 4), Seat::White, PieceType::King);
        rules.place(Square::from_parts(0, 2, 0), Seat::White, PieceType::Rook);
        rules.place(Square::from_parts(1, 0, 4), Seat::Black, PieceType::King);
        rules.place(Square::from_parts(1, 1, 3), Seat::Black, PieceType::Pawn);
        rules.place(Square::from_parts(2, 0, 4), Seat::Red, PieceType::King);
        let mut state = PackedState::from_view(&rules).unwrap();
        state.refresh_utilities(table);
        state
    }

    #[test]
    fn matches_minimax_value_on_startpos_test() {
        let table = table();
        let root = packed_from_startpos(&table);
        for depth in [1, 2, 3] {
            let mut pvs = Pvs::new();
            let mut minimax = Minimax::new(1);
            assert_eq!(
                pvs.pick_move(&root, &table, depth).unwrap().value,
                minimax.pick_move(&root, &table, depth).unwrap().value,
                "depth {depth}"
            );
        }
    }

    #[test]
    fn matches_minimax_value_in_sparse_position_test() {
        let table = table();
        let root = sparse_position(&table);
        for depth in [2, 3, 4] {
            let mut pvs = Pvs::new();
            let mut minimax = Minimax::new(7);
            assert_eq!(
                pvs.pick_move(&root, &table, depth).unwrap().value,
                minimax.pick_move(&root, &table, depth).unwrap().value,
                "depth {depth}"
            );
        }
    }

    #[test]
    fn prunes_against_minimax_test() {
        let table = table();
        let root = packed_from_startpos(&table);
        let mut pvs = Pvs::new();
        let mut minimax = Minimax::new(1);
        pvs.pick_move(&root, &table, 3);
        minimax.pick_move(&root, &table, 3);
        assert!(pvs.nodes() <= minimax.nodes());
    }
}
