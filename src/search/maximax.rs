use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::eval::EvalTable;
use crate::games::catalogue::catalogue;
use crate::games::packed::PackedState;
use crate::games::NUM_COLORS;
use crate::general::move_list::Moves;
use crate::search::{coin, instant_win, ply_buffers, Decision, Strategy};

/// Every seat is modeled as greedy for itself: at each node the side to move
/// picks the move maximizing its own utility, and the chosen line's full
/// utility vector is handed up. This matches how three opponents actually
/// behave far better than assuming they cooperate against us.
#[derive(Debug)]
pub struct Maximax {
    rng: StdRng,
    bufs: Vec<Moves>,
    nodes: u64,
}

impl Maximax {
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
        depth: usize,
        ply: usize,
    ) -> [i32; NUM_COLORS] {
        if state.is_over() || depth <= 1 {
            return state.utilities();
        }
        state.available_moves_into(&mut self.bufs[ply], false);
        let len = self.bufs[ply].len();
        if len == 0 {
            return state.utilities();
        }
        let turn = state.turn().index();
        let mut best: Option<[i32; NUM_COLORS]> = None;
        for i in 0..len {
            let id = self.bufs[ply].get(i);
            let mut child = *state;
            child.apply(catalogue().mov(id), table);
            self.nodes += 1;
            let value = self.node(&child, table, depth - 1, ply + 1);
            best = Some(match best {
                None => value,
                Some(incumbent) => {
                    if value[turn] > incumbent[turn]
                        || (value[turn] == incumbent[turn] && coin(&mut self.rng))
                    {
                        value
                    } else {
                        incumbent
                    }
                }
            });
        }
        best.unwrap_or_else(|| state.utilities())
    }
}

impl Strategy for Maximax {
    fn pick_move(
        &mut self,
        root: &PackedState,
        table: &EvalTable,
        depth: usize,
    ) -> Option<Decision> {
        self.nodes = 0;
        if let Some(win) = instant_win(root, table) {
            return Some(win);
        }
        root.available_moves_into(&mut self.bufs[0], false);
        let len = self.bufs[0].len();
        let agent = root.turn().index();
        let mut best: Option<(u32, [i32; NUM_COLORS])> = None;
        for i in 0..len {
            let id = self.bufs[0].get(i);
            let mut child = *root;
            child.apply(catalogue().mov(id), table);
            self.nodes += 1;
            let value = self.node(&child, table, depth - 1, 1);
            best = Some(match best {
                None => (id, value),
                Some(incumbent) => {
                    if value[agent] > incumbent.1[agent]
                        || (value[agent] == incumbent.1[agent] && coin(&mut self.rng))
                    {
                        (id, value)
                    } else {
                        incumbent
                    }
                }
            });
        }
        best.map(|(mov, value)| Decision {
            mov,
            value: value[agent],
        })
    }

    fn name(&self) -> &'static str {
        "Maximax"
    }

    fn nodes(&self) -> u64 {
        self.nodes
    }
}

#[cfg(test)]
mod tests {
    use crate::eval::params::CombinedParams;
    use crate::games::packed::WIN_UTILITY;
    use crate::games::rules::RulesBoard;
    use crate::games::squares::Square;
    use crate::games::{Color, PieceType};
    use crate::search::packed_from_startpos;

    use super::*;

    fn table() -> EvalTable {
        EvalTable::new(&CombinedParams::default()).unwrap()
    }

    #[test]
    fn one_ply_maximizes_own_utility_test() {
        let table = table();
        let root = packed_from_startpos(&table);
        let agent = root.turn();
        let mut strategy = Maximax::new(4);
        let decision = strategy.pick_move(&root, &table, 1).unwrap();

        let mut buf = Moves::default();
        root.available_moves_into(&mut buf, false);
        let best = buf
            .as_slice()
            .iter()
            .map(|id| {
                let mut child = root;
                child.apply(catalogue().mov(*id), &table);
                child.utility(agent)
            })
            .max()
            .unwrap();
        assert_eq!(decision.value, best);
        let mut chosen = root;
        chosen.apply(catalogue().mov(decision.mov), &table);
        assert_eq!(chosen.utility(agent), best);
    }

    #[test]
    fn seeded_ties_reproduce_test() {
        let table = table();
        let root = packed_from_startpos(&table);
        let mut first = Maximax::new(123);
        let mut second = Maximax::new(123);
        for depth in [1, 2] {
            assert_eq!(
                first.pick_move(&root, &table, depth),
                second.pick_move(&root, &table, depth)
            );
        }
    }

    #[test]
    fn king_capture_wins_at_any_depth_test() {
        let table = table();
        let mut rules = RulesBoard::empty(1_000);
        rules.place(Square::from_parts(0, 0, 0), Color::White, PieceType::Rook);
        rules.place(Square::from_parts(0, 0, 4), Color::White, PieceType::King);
        rules.place(Square::from_parts(0, 3, 0), Color::Black, PieceType::King);
        rules.place(Square::from_parts(2, 0, 4), Color::Red, PieceType::King);
        let mut root = PackedState::from_view(&rules).unwrap();
        root.refresh_utilities(&table);
        for depth in 1..=4 {
            let mut strategy = Maximax::new(0);
            let decision = strategy.pick_move(&root, &table, depth).unwrap();
            let mov = catalogue().mov(decision.mov);
            assert_eq!(mov.to, Square::from_parts(0, 3, 0), "depth {depth}");
            assert_eq!(decision.value, WIN_UTILITY);
        }
    }
}
