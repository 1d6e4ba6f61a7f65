use once_cell::sync::Lazy;
use strum::IntoEnumIterator;

use crate::games::moves::{MoveKind, PassedSquares, TriMove, MAX_SLIDER_REPS};
use crate::games::squares::Direction::*;
use crate::games::squares::{
    step, walk, Direction, Square, KINGSIDE_ROOK_COLUMN, KING_COLUMN, NUM_SQUARES,
    QUEENSIDE_ROOK_COLUMN,
};
use crate::games::{pack_piece, Color, PieceType, NUM_COLORS, NUM_PIECE_TYPES};

/// A directive word packs `(offset << 8) | length`, so a list may not hold
/// more than 255 moves. Trapped when the catalogue is built.
pub const MAX_LIST_LEN: usize = 255;

const ORTHOGONAL_PATTERNS: [&[Direction]; 4] = [&[Forward], &[Backward], &[Left], &[Right]];
const DIAGONAL_PATTERNS: [&[Direction]; 4] = [
    &[Forward, Left],
    &[Forward, Right],
    &[Backward, Left],
    &[Backward, Right],
];
const KNIGHT_PATTERNS: [&[Direction]; 8] = [
    &[Forward, Forward, Left],
    &[Forward, Forward, Right],
    &[Backward, Backward, Left],
    &[Backward, Backward, Right],
    &[Left, Left, Forward],
    &[Left, Left, Backward],
    &[Right, Right, Forward],
    &[Right, Right, Backward],
];

/// Index into the flat per-(color, square, piece-type) tables shared by the
/// directive table, the mean-move table and the derived utility table.
pub fn table_index(color: Color, sq: Square, typ: PieceType) -> usize {
    (color.index() * NUM_SQUARES + sq.index()) * NUM_PIECE_TYPES + typ.index()
}

pub const TABLE_LEN: usize = NUM_SQUARES * NUM_COLORS * NUM_PIECE_TYPES;

/// Every move any piece could geometrically make from any square, flattened
/// into one buffer. Catalogued moves are not necessarily playable in a given
/// state; playability is decided against the state when enumerating.
pub struct Catalogue {
    moves: Vec<TriMove>,
    directives: Vec<u32>,
    mean_moves: Vec<f64>,
}

static CATALOGUE: Lazy<Catalogue> = Lazy::new(Catalogue::build);

pub fn catalogue() -> &'static Catalogue {
    &CATALOGUE
}

impl Catalogue {
    /// The move list for a piece of `color` and type `typ` standing on `sq`,
    /// along with the global id of its first entry.
    pub fn list(&self, color: Color, sq: Square, typ: PieceType) -> (u32, &[TriMove]) {
        let directive = self.directives[table_index(color, sq, typ)];
        let offset = (directive >> 8) as usize;
        let len = (directive & 0xff) as usize;
        (offset as u32, &self.moves[offset..offset + len])
    }

    pub fn mov(&self, id: u32) -> &TriMove {
        &self.moves[id as usize]
    }

    pub fn num_moves(&self) -> usize {
        self.moves.len()
    }

    /// How many moves the piece could make from this square on an otherwise
    /// empty board; the mobility factor of the derived utility table.
    pub fn mean_moves(&self, color: Color, sq: Square, typ: PieceType) -> f64 {
        self.mean_moves[table_index(color, sq, typ)]
    }

    fn build() -> Self {
        let mut moves = Vec::new();
        let mut directives = vec![0u32; TABLE_LEN];
        let mut mean_moves = vec![0f64; TABLE_LEN];
        for color in Color::iter() {
            for idx in 0..NUM_SQUARES {
                for typ in PieceType::iter() {
                    let sq = Square::new(idx);
                    let list = moves_for(sq, color, typ);
                    assert!(
                        list.len() <= MAX_LIST_LEN,
                        "move list for {typ} of {color} on {sq} holds {0} moves",
                        list.len()
                    );
                    let offset = moves.len();
                    assert!(offset <= (u32::MAX >> 8) as usize);
                    let entry = table_index(color, sq, typ);
                    directives[entry] = ((offset as u32) << 8) | list.len() as u32;
                    mean_moves[entry] = list.len() as f64;
                    moves.extend(list);
                }
            }
        }
        Catalogue {
            moves,
            directives,
            mean_moves,
        }
    }
}

/// The orderings in which a multi-step pattern is applied: as given and fully
/// reversed. Near the center the two can reach different squares; equal
/// destinations are deduplicated later.
fn orderings(pattern: &[Direction]) -> Vec<Vec<Direction>> {
    let forward: Vec<Direction> = pattern.to_vec();
    let mut backward: Vec<Direction> = pattern.to_vec();
    backward.reverse();
    if backward == forward {
        vec![forward]
    } else {
        vec![forward, backward]
    }
}

fn moves_for(sq: Square, color: Color, typ: PieceType) -> Vec<TriMove> {
    // A piece outside its home segment has crossed the center once, so its
    // frame starts out reversed.
    let reversed = !sq.is_home_of(color);
    let mut list = Vec::new();
    let mut rays = Vec::new();
    match typ {
        PieceType::Pawn => pawn_moves(sq, color, reversed, &mut list),
        PieceType::Knight => leaper_moves(sq, &KNIGHT_PATTERNS, MoveKind::Knight, reversed, &mut list),
        PieceType::King => king_moves(sq, color, reversed, &mut list),
        PieceType::Bishop => slider_moves(sq, &DIAGONAL_PATTERNS, reversed, &mut list, &mut rays),
        PieceType::Rook => slider_moves(sq, &ORTHOGONAL_PATTERNS, reversed, &mut list, &mut rays),
        PieceType::Queen => {
            slider_moves(sq, &ORTHOGONAL_PATTERNS, reversed, &mut list, &mut rays);
            slider_moves(sq, &DIAGONAL_PATTERNS, reversed, &mut list, &mut rays);
        }
    }
    patch_skips(&mut list, &rays);
    list
}

fn push_unique(list: &mut Vec<TriMove>, mov: TriMove) -> bool {
    if list.iter().any(|m| m.to == mov.to) {
        return false;
    }
    list.push(mov);
    true
}

fn pawn_moves(sq: Square, color: Color, reversed: bool, list: &mut Vec<TriMove>) {
    if let Some((one, frame)) = step(sq, Forward, reversed) {
        list.push(TriMove {
            from: sq,
            to: one,
            kind: MoveKind::PawnOne {
                promotes: one.row() == 0,
            },
        });
        // The double step exists only on the start row of the home segment.
        if sq.is_home_of(color) && sq.row() == 1 {
            if let Some((two, _)) = step(one, Forward, frame) {
                list.push(TriMove {
                    from: sq,
                    to: two,
                    kind: MoveKind::PawnTwo {
                        hurdle: one.index() as u8,
                    },
                });
            }
        }
    }
    for pattern in [[Forward, Left], [Forward, Right]] {
        for ordering in orderings(&pattern) {
            if let Some((to, _)) = walk(sq, &ordering, reversed) {
                push_unique(
                    list,
                    TriMove {
                        from: sq,
                        to,
                        kind: MoveKind::PawnTake {
                            promotes: to.row() == 0,
                        },
                    },
                );
            }
        }
    }
}

fn leaper_moves(
    sq: Square,
    patterns: &[&[Direction]],
    kind: MoveKind,
    reversed: bool,
    list: &mut Vec<TriMove>,
) {
    for pattern in patterns {
        for ordering in orderings(pattern) {
            if let Some((to, _)) = walk(sq, &ordering, reversed) {
                push_unique(list, TriMove { from: sq, to, kind });
            }
        }
    }
}

fn king_moves(sq: Square, color: Color, reversed: bool, list: &mut Vec<TriMove>) {
    leaper_moves(sq, &ORTHOGONAL_PATTERNS, MoveKind::King, reversed, list);
    leaper_moves(sq, &DIAGONAL_PATTERNS, MoveKind::King, reversed, list);
    if sq != Square::from_parts(color.index(), 0, KING_COLUMN) {
        return;
    }
    let home = color.index();
    let rook_byte = pack_piece(color, PieceType::Rook);
    // Kingside: king e -> g, rook h -> f.
    let mut passed = PassedSquares::default();
    passed.push(Square::from_parts(home, 0, 5));
    passed.push(Square::from_parts(home, 0, 6));
    list.push(TriMove {
        from: sq,
        to: Square::from_parts(home, 0, 6),
        kind: MoveKind::Castle {
            rook_from: Square::from_parts(home, 0, KINGSIDE_ROOK_COLUMN).index() as u8,
            rook_to: Square::from_parts(home, 0, 5).index() as u8,
            rook_byte,
            passed,
        },
    });
    // Queenside: king e -> c, rook a -> d.
    let mut passed = PassedSquares::default();
    passed.push(Square::from_parts(home, 0, 1));
    passed.push(Square::from_parts(home, 0, 2));
    passed.push(Square::from_parts(home, 0, 3));
    list.push(TriMove {
        from: sq,
        to: Square::from_parts(home, 0, 2),
        kind: MoveKind::Castle {
            rook_from: Square::from_parts(home, 0, QUEENSIDE_ROOK_COLUMN).index() as u8,
            rook_to: Square::from_parts(home, 0, 3).index() as u8,
            rook_byte,
            passed,
        },
    });
}

fn slider_moves(
    sq: Square,
    patterns: &[&[Direction]],
    reversed: bool,
    list: &mut Vec<TriMove>,
    rays: &mut Vec<usize>,
) {
    for pattern in patterns {
        for ordering in orderings(pattern) {
            let ray = rays.last().map_or(0, |r| r + 1);
            let mut cur = sq;
            let mut frame = reversed;
            let mut passed = PassedSquares::default();
            for reps in 1..=MAX_SLIDER_REPS {
                let Some((next, next_frame)) = walk(cur, &ordering, frame) else {
                    break;
                };
                if push_unique(
                    list,
                    TriMove {
                        from: sq,
                        to: next,
                        kind: MoveKind::Slider {
                            passed,
                            reps: reps as u8,
                            skip: 0,
                        },
                    },
                ) {
                    rays.push(ray);
                }
                if reps < MAX_SLIDER_REPS {
                    passed.push(next);
                }
                cur = next;
                frame = next_frame;
            }
        }
    }
    debug_assert_eq!(list.len(), rays.len());
}

/// Every move after a slider and before its skip target extends the same ray,
/// so once the slider's destination holds a same-color piece, the enumeration
/// may leap directly to the skip target.
fn patch_skips(list: &mut [TriMove], rays: &[usize]) {
    for i in 0..rays.len() {
        let mut target = list.len();
        for j in i + 1..rays.len() {
            if rays[j] != rays[i] {
                target = j;
                break;
            }
        }
        if let MoveKind::Slider { skip, .. } = &mut list[i].kind {
            *skip = target as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn directive_bounds_test() {
        let cat = catalogue();
        assert!(cat.num_moves() > 10_000);
        for color in Color::iter() {
            for idx in 0..NUM_SQUARES {
                for typ in PieceType::iter() {
                    let sq = Square::new(idx);
                    let (offset, list) = cat.list(color, sq, typ);
                    assert!(list.len() <= MAX_LIST_LEN);
                    assert_eq!(
                        cat.mean_moves(color, sq, typ),
                        list.len() as f64
                    );
                    for (i, mov) in list.iter().enumerate() {
                        assert_eq!(mov.from, sq);
                        assert_eq!(cat.mov(offset + i as u32), mov);
                    }
                }
            }
        }
    }

    #[test]
    fn destinations_unique_per_list_test() {
        let cat = catalogue();
        for color in Color::iter() {
            for idx in 0..NUM_SQUARES {
                for typ in PieceType::iter() {
                    let (_, list) = cat.list(color, Square::new(idx), typ);
                    let dests = list.iter().map(|m| m.to.index()).collect_vec();
                    assert_eq!(dests.iter().unique().count(), dests.len());
                }
            }
        }
    }

    #[test]
    fn skip_targets_sound_test() {
        // Between a slider move and its skip target, every entry continues
        // the same ray and therefore passes over the earlier destination.
        let cat = catalogue();
        for color in Color::iter() {
            for idx in 0..NUM_SQUARES {
                for typ in [PieceType::Bishop, PieceType::Rook, PieceType::Queen] {
                    let (_, list) = cat.list(color, Square::new(idx), typ);
                    for (i, mov) in list.iter().enumerate() {
                        let MoveKind::Slider { skip, reps, .. } = mov.kind else {
                            panic!("non-slider in a slider list");
                        };
                        let skip = skip as usize;
                        assert!(skip > i && skip <= list.len());
                        for follower in &list[i + 1..skip] {
                            let MoveKind::Slider {
                                passed,
                                reps: follower_reps,
                                ..
                            } = follower.kind
                            else {
                                unreachable!()
                            };
                            assert!(follower_reps > reps);
                            assert!(passed.as_slice().contains(&(mov.to.index() as u8)));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn knight_list_test() {
        let (_, list) = catalogue().list(
            Color::White,
            Square::from_parts(0, 0, 1),
            PieceType::Knight,
        );
        let dests = list.iter().map(|m| m.to).sorted_by_key(|s| s.index()).collect_vec();
        assert_eq!(
            dests,
            vec![
                Square::from_parts(0, 1, 3),
                Square::from_parts(0, 2, 0),
                Square::from_parts(0, 2, 2),
            ]
        );
    }

    #[test]
    fn pawn_list_test() {
        let (_, list) = catalogue().list(
            Color::Black,
            Square::from_parts(1, 1, 4),
            PieceType::Pawn,
        );
        assert_eq!(list.len(), 4);
        assert!(list.iter().any(|m| matches!(m.kind, MoveKind::PawnTwo { .. })));
        // The same square is no double-step source for a foreign pawn.
        let (_, foreign) = catalogue().list(
            Color::White,
            Square::from_parts(1, 1, 4),
            PieceType::Pawn,
        );
        assert!(foreign
            .iter()
            .all(|m| !matches!(m.kind, MoveKind::PawnTwo { .. })));
        // A foreign pawn on row 1 promotes by pushing to the back rank.
        assert!(foreign
            .iter()
            .any(|m| matches!(m.kind, MoveKind::PawnOne { promotes: true })));
    }

    #[test]
    fn rook_corner_ray_test() {
        let (_, list) = catalogue().list(
            Color::White,
            Square::from_parts(0, 0, 0),
            PieceType::Rook,
        );
        // Two rays of seven squares each: forward across the center onto the
        // neighbor's back rank, and sideways along the own back rank.
        assert_eq!(list.len(), 14);
        assert!(list.iter().any(|m| m.to == Square::from_parts(1, 0, 7)));
        assert!(list.iter().any(|m| m.to == Square::from_parts(0, 0, 7)));
    }

    #[test]
    fn king_castle_entries_test() {
        let (_, list) = catalogue().list(
            Color::Red,
            Square::from_parts(2, 0, KING_COLUMN),
            PieceType::King,
        );
        let castles = list.iter().filter(|m| m.is_castle()).collect_vec();
        assert_eq!(castles.len(), 2);
        assert!(castles
            .iter()
            .any(|m| m.to == Square::from_parts(2, 0, 6)));
        assert!(castles
            .iter()
            .any(|m| m.to == Square::from_parts(2, 0, 2)));
        // No castle entries anywhere else.
        let (_, elsewhere) = catalogue().list(
            Color::Red,
            Square::from_parts(0, 0, KING_COLUMN),
            PieceType::King,
        );
        assert!(elsewhere.iter().all(|m| !m.is_castle()));
    }

    #[test]
    fn center_fork_test() {
        // A bishop's diagonal through the center forks depending on the step
        // order, attacking both neighboring segments.
        let (_, list) = catalogue().list(
            Color::White,
            Square::from_parts(0, 3, 3),
            PieceType::Bishop,
        );
        let segments = list.iter().map(|m| m.to.segment()).unique().collect_vec();
        assert!(segments.len() >= 2, "diagonals should leave the home segment");
    }
}
