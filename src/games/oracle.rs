use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::eval::EvalTable;
use crate::games::catalogue::catalogue;
use crate::games::packed::PackedState;
use crate::games::rules::RulesBoard;
use crate::games::squares::Square;
use crate::games::BoardView;
use crate::general::move_list::Moves;

/// Cross-checks between the packed engine board and the naive rules board.
/// Slow by design; meant for tests and debugging sessions, not for play.

/// The (from, to) pairs the packed state would play, in enumeration order.
pub fn move_pairs(state: &PackedState) -> Vec<(Square, Square)> {
    let mut buf = Moves::default();
    state.available_moves_into(&mut buf, false);
    buf.as_slice()
        .iter()
        .map(|id| {
            let mov = catalogue().mov(*id);
            (mov.from, mov.to)
        })
        .collect()
}

/// The stored utility vector must equal a full recomputation at all times.
pub fn check_utilities(state: &PackedState, table: &EvalTable) -> Result<(), String> {
    let recomputed = state.recompute_utilities(table);
    if state.utilities() != recomputed {
        return Err(format!(
            "incremental utilities {0:?} drifted from recomputation {recomputed:?}",
            state.utilities()
        ));
    }
    Ok(())
}

/// Packed enumeration must agree with the rules board, move for move.
pub fn check_move_sets(state: &PackedState, rules: &RulesBoard) -> Result<(), String> {
    let sort_key = |pair: &(Square, Square)| (pair.0.index(), pair.1.index());
    let packed = move_pairs(state).into_iter().sorted_by_key(sort_key).collect_vec();
    let reference = rules
        .legal_moves()
        .into_iter()
        .sorted_by_key(sort_key)
        .collect_vec();
    if packed != reference {
        let missing = reference.iter().filter(|m| !packed.contains(m)).collect_vec();
        let extra = packed.iter().filter(|m| !reference.contains(m)).collect_vec();
        return Err(format!(
            "move sets disagree; missing from packed: {missing:?}, extra in packed: {extra:?}"
        ));
    }
    Ok(())
}

/// The slider skip jumps must neither drop nor invent moves.
pub fn check_skip_jumps(state: &PackedState) -> Result<(), String> {
    let mut with_skips = Moves::default();
    let mut plain = Moves::default();
    for captures_only in [false, true] {
        state.available_moves_into(&mut with_skips, captures_only);
        state.available_moves_plain_into(&mut plain, captures_only);
        if with_skips.as_slice() != plain.as_slice() {
            return Err(format!(
                "skip-jump enumeration diverges (captures_only = {captures_only})"
            ));
        }
    }
    Ok(())
}

/// packed -> rules -> packed must reproduce the state byte for byte.
pub fn check_round_trip(state: &PackedState) -> Result<(), String> {
    let rules = RulesBoard::from_packed(state, 0);
    let back = PackedState::from_view(&rules)?;
    if back.squares() != state.squares()
        || back.turn() != state.turn()
        || back.finish() != state.finish()
    {
        return Err("round trip through the rules board changed the state".to_string());
    }
    Ok(())
}

pub fn check_all(state: &PackedState, rules: &RulesBoard, table: &EvalTable) -> Result<(), String> {
    check_utilities(state, table)?;
    check_skip_jumps(state)?;
    check_round_trip(state)?;
    check_move_sets(state, rules)
}

/// Plays out a pseudo-random game, running every cross-check after every
/// applied move. The table is held fixed during the playout, exactly as it is
/// during a single search.
pub fn check_playout(seed: u64, max_plies: usize, table: &EvalTable) -> Result<(), String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rules = RulesBoard::startpos(60_000);
    let mut state = PackedState::from_view(&rules)?;
    state.refresh_utilities(table);
    check_all(&state, &rules, table)?;
    let mut buf = Moves::default();
    for ply in 0..max_plies {
        if state.is_over() {
            break;
        }
        state.available_moves_into(&mut buf, false);
        if buf.is_empty() {
            break;
        }
        let id = buf.get(rng.gen_range(0..buf.len()));
        let mov = *catalogue().mov(id);
        state.apply(&mov, table);
        if !rules.try_move(mov.from, mov.to) {
            return Err(format!(
                "ply {ply}: the rules board rejected {mov}, which the engine enumerated"
            ));
        }
        check_all(&state, &rules, table)?;
        if rules.turn() != state.turn() || rules.finish() != state.finish() {
            return Err(format!("ply {ply}: turn or result drifted after {mov}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use crate::eval::params::CombinedParams;
    use crate::games::{Color, PieceType};

    use super::*;

    fn table() -> EvalTable {
        EvalTable::new(&CombinedParams::default()).unwrap()
    }

    #[test]
    fn startpos_enumeration_test() {
        let rules = RulesBoard::startpos(60_000);
        let mut state = PackedState::from_view(&rules).unwrap();
        state.refresh_utilities(&table());
        let pairs = move_pairs(&state);
        assert_eq!(pairs.len(), rules.legal_moves().len());
        assert_eq!(pairs.len(), 20);
        let mut singles = 0;
        let mut doubles = 0;
        let mut knights = 0;
        for (from, to) in &pairs {
            match catalogue_piece(&state, *from) {
                PieceType::Pawn => {
                    if to.row() == from.row() + 1 {
                        singles += 1;
                    } else {
                        doubles += 1;
                    }
                }
                PieceType::Knight => knights += 1,
                typ => panic!("{typ} should have no opening move"),
            }
        }
        assert_eq!(singles, 8);
        assert_eq!(doubles, 8);
        assert_eq!(knights, 4);
    }

    fn catalogue_piece(state: &PackedState, sq: Square) -> PieceType {
        crate::games::byte_type(state.piece(sq))
    }

    #[test]
    fn playout_invariants_test() {
        let table = table();
        for seed in 0..8 {
            check_playout(seed, 120, &table).unwrap();
        }
    }

    #[test]
    fn capture_and_promotion_invariants_test() {
        // A crafted position with captures, a promotion and a king capture in
        // reach, checked move by move.
        let table = table();
        let mut rules = RulesBoard::empty(1_000);
        rules.place(Square::from_parts(0, 0, 4), Color::White, PieceType::King);
        rules.place(Square::from_parts(1, 0, 4), Color::Black, PieceType::King);
        rules.place(Square::from_parts(2, 0, 4), Color::Red, PieceType::King);
        rules.place(Square::from_parts(1, 1, 1), Color::White, PieceType::Pawn);
        rules.place(Square::from_parts(1, 0, 0), Color::Black, PieceType::Rook);
        rules.place(Square::from_parts(0, 2, 3), Color::Red, PieceType::Queen);
        let mut state = PackedState::from_view(&rules).unwrap();
        state.refresh_utilities(&table);
        check_all(&state, &rules, &table).unwrap();

        // white promotes by capturing the rook on black's back rank
        let pairs = move_pairs(&state);
        let promo = (Square::from_parts(1, 1, 1), Square::from_parts(1, 0, 0));
        assert!(pairs.contains(&promo));
        let id = find_move(&state, promo);
        let mov = *catalogue().mov(id);
        state.apply(&mov, &table);
        assert!(rules.try_move(promo.0, promo.1));
        check_all(&state, &rules, &table).unwrap();
        assert_eq!(
            state.piece(promo.1),
            crate::games::pack_piece(Color::White, PieceType::Queen)
        );
    }

    fn find_move(state: &PackedState, pair: (Square, Square)) -> u32 {
        let mut buf = Moves::default();
        state.available_moves_into(&mut buf, false);
        *buf.as_slice()
            .iter()
            .find(|id| {
                let mov = catalogue().mov(**id);
                (mov.from, mov.to) == pair
            })
            .unwrap()
    }

    #[test]
    fn missing_king_round_trip_test() {
        // A position where a seat has already been eliminated survives the
        // round trip and keeps skipping that seat.
        let table = table();
        let mut rules = RulesBoard::empty(1_000);
        rules.place(Square::from_parts(0, 0, 4), Color::White, PieceType::King);
        rules.place(Square::from_parts(2, 0, 4), Color::Red, PieceType::King);
        rules.place(Square::from_parts(1, 1, 0), Color::Black, PieceType::Pawn);
        let mut state = PackedState::from_view(&rules).unwrap();
        state.refresh_utilities(&table);
        check_all(&state, &rules, &table).unwrap();
        let mut buf = Moves::default();
        state.available_moves_into(&mut buf, false);
        let id = buf.get(0);
        let mov = *catalogue().mov(id);
        state.apply(&mov, &table);
        assert_eq!(state.turn(), Color::Red);
        for color in Color::iter() {
            assert_eq!(state.alive(color), color != Color::Black);
        }
    }
}
