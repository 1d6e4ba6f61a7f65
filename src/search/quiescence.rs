use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::eval::EvalTable;
use crate::games::catalogue::catalogue;
use crate::games::packed::PackedState;
use crate::games::NUM_COLORS;
use crate::general::move_list::Moves;
use crate::search::{coin, instant_win, ply_buffers, Decision, Strategy};

pub const DEFAULT_QUIESCENCE_PLY: usize = 1;

/// Maximax with a selective tail: a leaf reached by a capture is extended by
/// up to `quiescence_ply` further plies in which only captures are
/// considered. If no capture is worth making, the leaf keeps its value.
#[derive(Debug)]
pub struct Quiescence {
    rng: StdRng,
    bufs: Vec<Moves>,
    nodes: u64,
    quiescence_ply: usize,
}

impl Quiescence {
    pub fn new(seed: u64) -> Self {
        Self::with_tail(seed, DEFAULT_QUIESCENCE_PLY)
    }

    pub fn with_tail(seed: u64, quiescence_ply: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            bufs: ply_buffers(),
            nodes: 0,
            quiescence_ply,
        }
    }

    fn node(
        &mut self,
        state: &PackedState,
        table: &EvalTable,
        depth: usize,
        ply: usize,
        after_capture: bool,
    ) -> [i32; NUM_COLORS] {
        if state.is_over() {
            return state.utilities();
        }
        if depth <= 1 {
            if after_capture && self.quiescence_ply > 0 {
                return self.quiet_node(state, table, self.quiescence_ply, ply);
            }
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
            let captured = child.apply(catalogue().mov(id), table);
            self.nodes += 1;
            let value = self.node(&child, table, depth - 1, ply + 1, captured != 0);
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

    /// The capture-only tail. Standing pat is the baseline; a capture
    /// replaces it at equal utility, so capturing lines are preferred.
    fn quiet_node(
        &mut self,
        state: &PackedState,
        table: &EvalTable,
        tail: usize,
        ply: usize,
    ) -> [i32; NUM_COLORS] {
        if state.is_over() || tail == 0 {
            return state.utilities();
        }
        state.available_moves_into(&mut self.bufs[ply], true);
        let len = self.bufs[ply].len();
        let turn = state.turn().index();
        let mut best = state.utilities();
        let mut best_is_capture = false;
        for i in 0..len {
            let id = self.bufs[ply].get(i);
            let mut child = *state;
            child.apply(catalogue().mov(id), table);
            self.nodes += 1;
            let value = self.quiet_node(&child, table, tail - 1, ply + 1);
            let replaces = value[turn] > best[turn]
                || (value[turn] == best[turn]
                    && (!best_is_capture || coin(&mut self.rng)));
            if replaces {
                best = value;
                best_is_capture = true;
            }
        }
        best
    }
}

impl Strategy for Quiescence {
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
            let captured = child.apply(catalogue().mov(id), table);
            self.nodes += 1;
            let value = self.node(&child, table, depth - 1, 1, captured != 0);
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
        "Quiescence"
    }

    fn nodes(&self) -> u64 {
        self.nodes
    }
}

/// Quiescence with a recency filter: the tail only considers captures that
/// were not already available three plies earlier. An opportunity the
/// opponents have been able to see for that long is no surprise, so chasing
/// it adds little; the filter keeps the tail from exploding on crowded
/// boards. Capture sets from the last three plies are threaded through the
/// recursion to decide what is recent.
#[derive(Debug)]
pub struct RestrictedQuiescence {
    rng: StdRng,
    bufs: Vec<Moves>,
    cap_sets: Vec<Moves>,
    nodes: u64,
    quiescence_ply: usize,
}

impl RestrictedQuiescence {
    pub fn new(seed: u64) -> Self {
        Self::with_tail(seed, DEFAULT_QUIESCENCE_PLY)
    }

    pub fn with_tail(seed: u64, quiescence_ply: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            bufs: ply_buffers(),
            cap_sets: ply_buffers(),
            nodes: 0,
            quiescence_ply,
        }
    }

    /// Remembers which of the moves just enumerated into `bufs[ply]` are
    /// captures, as this ply's window entry.
    fn record_captures(&mut self, state: &PackedState, ply: usize) {
        self.cap_sets[ply].clear();
        for i in 0..self.bufs[ply].len() {
            let id = self.bufs[ply].get(i);
            if catalogue().mov(id).captures(state.squares(), state.turn()) {
                self.cap_sets[ply].push(id);
            }
        }
    }

    fn node(
        &mut self,
        state: &PackedState,
        table: &EvalTable,
        depth: usize,
        ply: usize,
        after_capture: bool,
    ) -> [i32; NUM_COLORS] {
        if state.is_over() {
            return state.utilities();
        }
        if depth <= 1 {
            if after_capture && self.quiescence_ply > 0 {
                return self.quiet_node(state, table, self.quiescence_ply, ply);
            }
            return state.utilities();
        }
        state.available_moves_into(&mut self.bufs[ply], false);
        self.record_captures(state, ply);
        let len = self.bufs[ply].len();
        if len == 0 {
            return state.utilities();
        }
        let turn = state.turn().index();
        let mut best: Option<[i32; NUM_COLORS]> = None;
        for i in 0..len {
            let id = self.bufs[ply].get(i);
            let mut child = *state;
            let captured = child.apply(catalogue().mov(id), table);
            self.nodes += 1;
            let value = self.node(&child, table, depth - 1, ply + 1, captured != 0);
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

    fn quiet_node(
        &mut self,
        state: &PackedState,
        table: &EvalTable,
        tail: usize,
        ply: usize,
    ) -> [i32; NUM_COLORS] {
        if state.is_over() || tail == 0 {
            return state.utilities();
        }
        state.available_moves_into(&mut self.bufs[ply], true);
        self.record_captures(state, ply);
        let len = self.bufs[ply].len();
        let turn = state.turn().index();
        let mut best = state.utilities();
        let mut best_is_capture = false;
        for i in 0..len {
            let id = self.bufs[ply].get(i);
            // A capture the opponents have known about for three plies is no
            // quiescence surprise.
            if ply >= 3 && self.cap_sets[ply - 3].contains(id) {
                continue;
            }
            let mut child = *state;
            child.apply(catalogue().mov(id), table);
            self.nodes += 1;
            let value = self.quiet_node(&child, table, tail - 1, ply + 1);
            let replaces = value[turn] > best[turn]
                || (value[turn] == best[turn]
                    && (!best_is_capture || coin(&mut self.rng)));
            if replaces {
                best = value;
                best_is_capture = true;
            }
        }
        best
    }
}

impl Strategy for RestrictedQuiescence {
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
        self.record_captures(root, 0);
        let len = self.bufs[0].len();
        let agent = root.turn().index();
        let mut best: Option<(u32, [i32; NUM_COLORS])> = None;
        for i in 0..len {
            let id = self.bufs[0].get(i);
            let mut child = *root;
            let captured = child.apply(catalogue().mov(id), table);
            self.nodes += 1;
            let value = self.node(&child, table, depth - 1, 1, captured != 0);
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
        "Restricted Quiescence"
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
    use crate::games::{Color, PieceType};
    use crate::search::maximax::Maximax;
    use crate::search::packed_from_startpos;
    use crate::search::Strategy;

    use super::*;

    fn table() -> EvalTable {
        EvalTable::new(&CombinedParams::default()).unwrap()
    }

    #[test]
    fn zero_tail_equals_maximax_test() {
        // With an empty tail the quiescence search is exactly maximax, coin
        // flips included.
        let table = table();
        let root = packed_from_startpos(&table);
        for depth in [1, 2] {
            let mut quiescence = Quiescence::with_tail(5, 0);
            let mut maximax = Maximax::new(5);
            assert_eq!(
                quiescence.pick_move(&root, &table, depth),
                maximax.pick_move(&root, &table, depth),
                "depth {depth}"
            );
        }
    }

    /// White's rook can grab a knight, but the capture square is defended by
    /// a queen. A two-ply maximax falls for it; the capture-tail sees the
    /// recapture coming.
    fn poisoned_knight(table: &EvalTable) -> PackedState {
        let mut rules = RulesBoard::empty(1_000);
        rules.place(Square::from_parts(0, 0, 4), Color::White, PieceType::King);
        rules.place(Square::from_parts(1, 0, 4), Color::Black, PieceType::King);
        rules.place(Square::from_parts(2, 0, 4), Color::Red, PieceType::King);
        rules.place(Square::from_parts(0, 1, 0), Color::White, PieceType::Rook);
        rules.place(Square::from_parts(0, 1, 5), Color::Black, PieceType::Knight);
        rules.place(Square::from_parts(0, 1, 7), Color::Black, PieceType::Queen);
        let mut state = PackedState::from_view(&rules).unwrap();
        state.refresh_utilities(table);
        state
    }

    #[test]
    fn maximax_falls_for_poisoned_piece_test() {
        let table = table();
        let root = poisoned_knight(&table);
        let mut maximax = Maximax::new(2);
        let decision = maximax.pick_move(&root, &table, 2).unwrap();
        let mov = catalogue().mov(decision.mov);
        assert_eq!(mov.to, Square::from_parts(0, 1, 5));
    }

    #[test]
    fn capture_tail_avoids_poisoned_piece_test() {
        let table = table();
        let root = poisoned_knight(&table);
        let mut quiescence = Quiescence::new(2);
        let decision = quiescence.pick_move(&root, &table, 2).unwrap();
        let mov = catalogue().mov(decision.mov);
        assert_ne!(mov.to, Square::from_parts(0, 1, 5));
    }

    #[test]
    fn restriction_inactive_at_shallow_depth_test() {
        // The three-ply window can't look past the root before ply 3, so the
        // restricted variant is exactly quiescence at depth 2.
        let table = table();
        let root = poisoned_knight(&table);
        let mut restricted = RestrictedQuiescence::new(2);
        let mut quiescence = Quiescence::new(2);
        assert_eq!(
            restricted.pick_move(&root, &table, 2),
            quiescence.pick_move(&root, &table, 2)
        );
    }

    #[test]
    fn restriction_never_searches_more_test() {
        let table = table();
        let root = poisoned_knight(&table);
        let mut restricted = RestrictedQuiescence::new(3);
        let mut quiescence = Quiescence::new(3);
        quiescence.pick_move(&root, &table, 4);
        let full = quiescence.nodes();
        restricted.pick_move(&root, &table, 4);
        assert!(restricted.nodes() <= full);
    }

    #[test]
    fn stale_capture_is_skipped_test() {
        // In a depth-4 search the tail runs at ply 3, again on white's turn,
        // and is filtered by white's root capture set. The rook's capture on
        // Wa2 exists at the root (taking the knight) and again at ply 3
        // (taking the red pawn that recaptured there), under the same
        // catalogued move; the restricted tail treats it as stale and skips
        // it, so it expands strictly fewer nodes.
        let table = table();
        let mut rules = RulesBoard::empty(1_000);
        rules.place(Square::from_parts(0, 0, 4), Color::White, PieceType::King);
        rules.place(Square::from_parts(1, 0, 4), Color::Black, PieceType::King);
        rules.place(Square::from_parts(2, 0, 4), Color::Red, PieceType::King);
        rules.place(Square::from_parts(0, 1, 1), Color::White, PieceType::Rook);
        rules.place(Square::from_parts(0, 1, 0), Color::Black, PieceType::Knight);
        rules.place(Square::from_parts(0, 2, 1), Color::Red, PieceType::Pawn);
        let mut root = PackedState::from_view(&rules).unwrap();
        root.refresh_utilities(&table);
        let mut restricted = RestrictedQuiescence::new(9);
        let mut quiescence = Quiescence::new(9);
        quiescence.pick_move(&root, &table, 4);
        restricted.pick_move(&root, &table, 4);
        assert!(restricted.nodes() < quiescence.nodes());
    }
}
