use std::fmt::{Display, Formatter};

use colored::Colorize;
use strum::IntoEnumIterator;

use crate::games::packed::PackedState;
use crate::games::squares::Direction::*;
use crate::games::squares::{
    step, walk, Direction, Square, KINGSIDE_ROOK_COLUMN, KING_COLUMN, NUM_SQUARES,
    QUEENSIDE_ROOK_COLUMN, SEGMENT_COLUMNS, SEGMENT_ROWS,
};
use crate::games::{byte_color, byte_type, BoardView, Color, Finish, PieceType, NUM_COLORS};

/// The externally visible game: a plain mailbox board that recomputes
/// everything from first principles. It owns the clocks and the move counter
/// and adjudicates (from, to) pairs sent in by agents. Deliberately naive so
/// it can serve as the oracle the packed board is checked against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RulesBoard {
    squares: [Option<(Color, PieceType)>; NUM_SQUARES],
    turn: Color,
    finish: Option<Finish>,
    clocks: [u64; NUM_COLORS],
    move_count: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum RulesKind {
    Quiet,
    Castle { rook_from: Square, rook_to: Square },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct RulesMove {
    from: Square,
    to: Square,
    kind: RulesKind,
}

impl RulesBoard {
    pub fn empty(clock_millis: u64) -> Self {
        Self {
            squares: [None; NUM_SQUARES],
            turn: Color::White,
            finish: None,
            clocks: [clock_millis; NUM_COLORS],
            move_count: 0,
        }
    }

    pub fn startpos(clock_millis: u64) -> Self {
        let mut board = Self::empty(clock_millis);
        let back_rank = [
            PieceType::Rook,
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Queen,
            PieceType::King,
            PieceType::Bishop,
            PieceType::Knight,
            PieceType::Rook,
        ];
        for color in Color::iter() {
            let segment = color.index();
            for (file, typ) in back_rank.iter().enumerate() {
                board.place(Square::from_parts(segment, 0, file), color, *typ);
            }
            for file in 0..SEGMENT_COLUMNS {
                board.place(Square::from_parts(segment, 1, file), color, PieceType::Pawn);
            }
        }
        board
    }

    /// Rebuilds a rules board from an engine-side state, for round-trip
    /// checks. Clocks and the move counter start fresh.
    pub fn from_packed(state: &PackedState, clock_millis: u64) -> Self {
        let mut board = Self::empty(clock_millis);
        for idx in 0..NUM_SQUARES {
            let byte = state.squares()[idx];
            if byte != 0 {
                board.place(Square::new(idx), byte_color(byte), byte_type(byte));
            }
        }
        board.turn = state.turn();
        board.finish = state.finish();
        board
    }

    /// Reconstructs a board from any view implementor, for agents that want
    /// to reason with the rules machinery itself.
    pub fn from_view(view: &dyn BoardView) -> Result<Self, String> {
        let mut board = Self::empty(0);
        for idx in 0..NUM_SQUARES {
            let sq = Square::try_new(idx)?;
            if let Some((color, typ)) = view.piece_at(sq) {
                board.place(sq, color, typ);
            }
        }
        board.turn = view.turn();
        board.finish = view.finish();
        board.move_count = view.move_count();
        for color in Color::iter() {
            board.clocks[color.index()] = view.remaining_millis(color);
        }
        Ok(board)
    }

    pub fn place(&mut self, sq: Square, color: Color, typ: PieceType) {
        debug_assert!(self.squares[sq.index()].is_none());
        self.squares[sq.index()] = Some((color, typ));
    }

    pub fn set_turn(&mut self, color: Color) {
        self.turn = color;
    }

    pub fn has_king(&self, color: Color) -> bool {
        self.squares
            .iter()
            .any(|piece| *piece == Some((color, PieceType::King)))
    }

    /// Deducts thinking time; returns false once the flag has fallen.
    pub fn consume_time(&mut self, color: Color, millis: u64) -> bool {
        let clock = &mut self.clocks[color.index()];
        *clock = clock.saturating_sub(millis);
        *clock > 0
    }

    pub fn legal_moves(&self) -> Vec<(Square, Square)> {
        self.full_moves()
            .into_iter()
            .map(|mov| (mov.from, mov.to))
            .collect()
    }

    /// Adjudicates and plays the pair an agent answered with. Returns whether
    /// it was a legal move; an illegal pair leaves the board untouched.
    pub fn try_move(&mut self, from: Square, to: Square) -> bool {
        if self.finish.is_some() {
            return false;
        }
        let Some(mov) = self
            .full_moves()
            .into_iter()
            .find(|mov| mov.from == from && mov.to == to)
        else {
            return false;
        };
        self.play(mov);
        true
    }

    fn play(&mut self, mov: RulesMove) {
        let (color, typ) = self.squares[mov.from.index()].unwrap();
        debug_assert_eq!(color, self.turn);
        if let RulesKind::Castle { rook_from, rook_to } = mov.kind {
            debug_assert_eq!(self.squares[rook_from.index()], Some((color, PieceType::Rook)));
            self.squares[rook_from.index()] = None;
            self.squares[rook_to.index()] = Some((color, PieceType::Rook));
        }
        let captured = self.squares[mov.to.index()];
        self.squares[mov.from.index()] = None;
        let typ = if typ == PieceType::Pawn && mov.to.row() == 0 {
            PieceType::Queen
        } else {
            typ
        };
        self.squares[mov.to.index()] = Some((color, typ));
        self.move_count += 1;
        if let Some((loser, PieceType::King)) = captured {
            self.finish = Some(Finish {
                winner: color,
                loser,
            });
            return;
        }
        self.advance_turn();
    }

    /// Eliminated seats are skipped in the rotation.
    fn advance_turn(&mut self) {
        let mut next = self.turn.next();
        while !self.has_king(next) {
            next = next.next();
        }
        self.turn = next;
    }

    fn full_moves(&self) -> Vec<RulesMove> {
        let mut list = Vec::new();
        if self.finish.is_some() {
            return list;
        }
        for idx in (0..NUM_SQUARES).rev() {
            let Some((color, typ)) = self.squares[idx] else {
                continue;
            };
            if color != self.turn {
                continue;
            }
            self.piece_moves(Square::new(idx), typ, &mut list);
        }
        list
    }

    fn color_at(&self, sq: Square) -> Option<Color> {
        self.squares[sq.index()].map(|(color, _)| color)
    }

    fn is_empty_at(&self, sq: Square) -> bool {
        self.squares[sq.index()].is_none()
    }

    fn piece_moves(&self, sq: Square, typ: PieceType, list: &mut Vec<RulesMove>) {
        let color = self.turn;
        let reversed = !sq.is_home_of(color);
        match typ {
            PieceType::Pawn => self.pawn_moves(sq, color, reversed, list),
            PieceType::Knight => {
                self.leaper_moves(sq, color, &KNIGHT_SHAPES, reversed, list);
            }
            PieceType::King => {
                self.leaper_moves(sq, color, &SINGLE_SHAPES, reversed, list);
                self.castle_moves(sq, color, list);
            }
            PieceType::Bishop => self.slider_moves(sq, color, &DIAGONAL_SHAPES, reversed, list),
            PieceType::Rook => self.slider_moves(sq, color, &ORTHOGONAL_SHAPES, reversed, list),
            PieceType::Queen => {
                let mut seen = Vec::new();
                self.slider_rays(sq, color, &ORTHOGONAL_SHAPES, reversed, &mut seen, list);
                self.slider_rays(sq, color, &DIAGONAL_SHAPES, reversed, &mut seen, list);
            }
        }
    }

    fn pawn_moves(&self, sq: Square, color: Color, reversed: bool, list: &mut Vec<RulesMove>) {
        if let Some((one, frame)) = step(sq, Forward, reversed) {
            if self.is_empty_at(one) {
                list.push(RulesMove {
                    from: sq,
                    to: one,
                    kind: RulesKind::Quiet,
                });
                if sq.is_home_of(color) && sq.row() == 1 {
                    if let Some((two, _)) = step(one, Forward, frame) {
                        if self.is_empty_at(two) {
                            list.push(RulesMove {
                                from: sq,
                                to: two,
                                kind: RulesKind::Quiet,
                            });
                        }
                    }
                }
            }
        }
        let mut seen = Vec::new();
        for shape in [[Forward, Left], [Forward, Right]] {
            for ordering in shape_orderings(&shape) {
                let Some((to, _)) = walk(sq, &ordering, reversed) else {
                    continue;
                };
                if seen.contains(&to) {
                    continue;
                }
                seen.push(to);
                if matches!(self.color_at(to), Some(other) if other != color) {
                    list.push(RulesMove {
                        from: sq,
                        to,
                        kind: RulesKind::Quiet,
                    });
                }
            }
        }
    }

    fn leaper_moves(
        &self,
        sq: Square,
        color: Color,
        shapes: &[&[Direction]],
        reversed: bool,
        list: &mut Vec<RulesMove>,
    ) {
        let mut seen = Vec::new();
        for shape in shapes {
            for ordering in shape_orderings(shape) {
                let Some((to, _)) = walk(sq, &ordering, reversed) else {
                    continue;
                };
                if seen.contains(&to) {
                    continue;
                }
                seen.push(to);
                if self.color_at(to) != Some(color) {
                    list.push(RulesMove {
                        from: sq,
                        to,
                        kind: RulesKind::Quiet,
                    });
                }
            }
        }
    }

    fn castle_moves(&self, sq: Square, color: Color, list: &mut Vec<RulesMove>) {
        if sq != Square::from_parts(color.index(), 0, KING_COLUMN) {
            return;
        }
        let home = color.index();
        let sides = [
            (KINGSIDE_ROOK_COLUMN, 6, 5, vec![5, 6]),
            (QUEENSIDE_ROOK_COLUMN, 2, 3, vec![1, 2, 3]),
        ];
        for (rook_file, king_to, rook_to, between) in sides {
            let rook_from = Square::from_parts(home, 0, rook_file);
            if self.squares[rook_from.index()] != Some((color, PieceType::Rook)) {
                continue;
            }
            if !between
                .iter()
                .all(|file| self.is_empty_at(Square::from_parts(home, 0, *file)))
            {
                continue;
            }
            list.push(RulesMove {
                from: sq,
                to: Square::from_parts(home, 0, king_to),
                kind: RulesKind::Castle {
                    rook_from,
                    rook_to: Square::from_parts(home, 0, rook_to),
                },
            });
        }
    }

    fn slider_moves(
        &self,
        sq: Square,
        color: Color,
        shapes: &[&[Direction]],
        reversed: bool,
        list: &mut Vec<RulesMove>,
    ) {
        let mut seen = Vec::new();
        self.slider_rays(sq, color, shapes, reversed, &mut seen, list);
    }

    /// Walks each ray geometrically to its full length, keeping the first
    /// path to every destination, and emits the destinations whose kept path
    /// is clear. Matching the catalogued first-path semantics matters more
    /// here than short-circuiting on the first blocker.
    fn slider_rays(
        &self,
        sq: Square,
        color: Color,
        shapes: &[&[Direction]],
        reversed: bool,
        seen: &mut Vec<Square>,
        list: &mut Vec<RulesMove>,
    ) {
        for shape in shapes {
            for ordering in shape_orderings(shape) {
                let mut cur = sq;
                let mut frame = reversed;
                let mut blocked = false;
                for _ in 0..crate::games::moves::MAX_SLIDER_REPS {
                    let Some((next, next_frame)) = walk(cur, &ordering, frame) else {
                        break;
                    };
                    if !seen.contains(&next) {
                        seen.push(next);
                        if !blocked && self.color_at(next) != Some(color) {
                            list.push(RulesMove {
                                from: sq,
                                to: next,
                                kind: RulesKind::Quiet,
                            });
                        }
                    }
                    if !self.is_empty_at(next) {
                        blocked = true;
                    }
                    cur = next;
                    frame = next_frame;
                }
            }
        }
    }
}

const ORTHOGONAL_SHAPES: [&[Direction]; 4] = [&[Forward], &[Backward], &[Left], &[Right]];
const DIAGONAL_SHAPES: [&[Direction]; 4] = [
    &[Forward, Left],
    &[Forward, Right],
    &[Backward, Left],
    &[Backward, Right],
];
const SINGLE_SHAPES: [&[Direction]; 8] = [
    &[Forward],
    &[Backward],
    &[Left],
    &[Right],
    &[Forward, Left],
    &[Forward, Right],
    &[Backward, Left],
    &[Backward, Right],
];
const KNIGHT_SHAPES: [&[Direction]; 8] = [
    &[Forward, Forward, Left],
    &[Forward, Forward, Right],
    &[Backward, Backward, Left],
    &[Backward, Backward, Right],
    &[Left, Left, Forward],
    &[Left, Left, Backward],
    &[Right, Right, Forward],
    &[Right, Right, Backward],
];

fn shape_orderings(shape: &[Direction]) -> Vec<Vec<Direction>> {
    let forward: Vec<Direction> = shape.to_vec();
    let mut backward = forward.clone();
    backward.reverse();
    if backward == forward {
        vec![forward]
    } else {
        vec![forward, backward]
    }
}

impl BoardView for RulesBoard {
    fn turn(&self) -> Color {
        self.turn
    }

    fn piece_at(&self, sq: Square) -> Option<(Color, PieceType)> {
        self.squares[sq.index()]
    }

    fn finish(&self) -> Option<Finish> {
        self.finish
    }

    fn remaining_millis(&self, color: Color) -> u64 {
        self.clocks[color.index()]
    }

    fn move_count(&self) -> u32 {
        self.move_count
    }
}

fn colored_piece(color: Color, typ: PieceType) -> String {
    let letter = typ.to_ascii_char().to_string();
    match color {
        Color::White => letter.bold().to_string(),
        Color::Black => letter.blue().to_string(),
        Color::Red => letter.red().to_string(),
    }
}

impl Display for RulesBoard {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for seat in Color::iter() {
            let marker = if seat == self.turn && self.finish.is_none() {
                " (to move)"
            } else {
                ""
            };
            writeln!(f, "--- {seat}{marker} ---")?;
            for row in (0..SEGMENT_ROWS).rev() {
                write!(f, "{0} |", row + 1)?;
                for file in 0..SEGMENT_COLUMNS {
                    let sq = Square::from_parts(seat.index(), row, file);
                    match self.squares[sq.index()] {
                        Some((color, typ)) => write!(f, " {0}", colored_piece(color, typ))?,
                        None => write!(f, " .")?,
                    }
                }
                writeln!(f)?;
            }
            writeln!(f, "   a b c d e f g h")?;
        }
        if let Some(finish) = self.finish {
            writeln!(f, "{finish}")?;
        }
        Ok(())
    }
}
