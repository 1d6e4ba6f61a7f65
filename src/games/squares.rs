use std::fmt::{Display, Formatter};
use std::str::FromStr;

use static_assertions::const_assert_eq;
use strum_macros::EnumIter;

use crate::games::{Color, NUM_COLORS};
use crate::general::common::parse_int_from_str;

pub const NUM_SEGMENTS: usize = NUM_COLORS;
pub const SEGMENT_ROWS: usize = 4;
pub const SEGMENT_COLUMNS: usize = 8;
pub const SEGMENT_SQUARES: usize = SEGMENT_ROWS * SEGMENT_COLUMNS;
pub const NUM_SQUARES: usize = NUM_SEGMENTS * SEGMENT_SQUARES;

const_assert_eq!(NUM_SQUARES, 96);
const_assert_eq!(SEGMENT_SQUARES, 32);

pub const QUEEN_COLUMN: usize = 3;
pub const KING_COLUMN: usize = 4;
pub const QUEENSIDE_ROOK_COLUMN: usize = 0;
pub const KINGSIDE_ROOK_COLUMN: usize = 7;

/// One of the 96 squares. Segment `s` occupies indices `[32s, 32s + 32)`;
/// within a segment, row 0 is the back rank and row 3 abuts the center.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct Square {
    idx: u8,
}

impl Square {
    pub const fn new(idx: usize) -> Self {
        debug_assert!(idx < NUM_SQUARES);
        Self { idx: idx as u8 }
    }

    /// Checked construction for indices coming from outside the core.
    /// A position off the 96-square manifold means the caller and the core
    /// disagree about the board and the copy must be aborted.
    pub fn try_new(idx: usize) -> Result<Self, String> {
        if idx < NUM_SQUARES {
            Ok(Self { idx: idx as u8 })
        } else {
            Err(format!(
                "position index {idx} lies outside the {NUM_SQUARES}-square board"
            ))
        }
    }

    pub const fn from_parts(segment: usize, row: usize, column: usize) -> Self {
        debug_assert!(segment < NUM_SEGMENTS);
        debug_assert!(row < SEGMENT_ROWS);
        debug_assert!(column < SEGMENT_COLUMNS);
        Self::new(segment * SEGMENT_SQUARES + row * SEGMENT_COLUMNS + column)
    }

    pub fn index(self) -> usize {
        self.idx as usize
    }

    pub fn segment(self) -> usize {
        self.idx as usize / SEGMENT_SQUARES
    }

    /// Row within the segment; 0 is the segment's back rank.
    pub fn row(self) -> usize {
        (self.idx as usize % SEGMENT_SQUARES) / SEGMENT_COLUMNS
    }

    pub fn column(self) -> usize {
        self.idx as usize % SEGMENT_COLUMNS
    }

    /// The color whose home segment this square belongs to.
    pub fn home_color(self) -> Color {
        Color::from_repr(self.segment() as u8).unwrap()
    }

    pub fn is_home_of(self, color: Color) -> bool {
        self.segment() == color.index()
    }
}

impl Display for Square {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{0}{1}{2}",
            self.home_color().to_ascii_char(),
            (self.column() + 'a' as usize) as u8 as char,
            self.row() + 1 // output 1-indexed
        )
    }
}

impl FromStr for Square {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let segment = chars
            .next()
            .and_then(Color::from_ascii_char)
            .ok_or("square must start with a seat letter (W, B or R)")?
            .index();
        let column = chars
            .next()
            .and_then(|c| {
                if c.is_ascii_alphabetic() {
                    Some(c.to_ascii_lowercase() as usize - 'a' as usize)
                } else {
                    None
                }
            })
            .filter(|c| *c < SEGMENT_COLUMNS)
            .ok_or("file (column) must be a letter between 'a' and 'h'")?;
        let row: usize = parse_int_from_str(chars.as_str(), "rank (row)")?;
        if !(1..=SEGMENT_ROWS).contains(&row) {
            return Err(format!("rank must lie between 1 and {SEGMENT_ROWS}"));
        }
        Ok(Square::from_parts(segment, row - 1, column))
    }
}

/// A unit step, expressed in the frame of the moving piece's owner. Crossing
/// the center flips the frame: the remainder of the move sees left and right
/// as well as forward and backward swapped.
#[derive(Copy, Clone, Eq, PartialEq, Debug, EnumIter)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    fn offsets(self) -> (isize, isize) {
        match self {
            Direction::Forward => (1, 0),
            Direction::Backward => (-1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

/// Takes one unit step from `sq`. `reversed` says whether the frame has been
/// flipped, either by an earlier crossing during the same move or because the
/// piece started outside its home segment. Returns the reached square and the
/// frame for any further steps, or `None` for stepping off the board.
pub fn step(sq: Square, dir: Direction, reversed: bool) -> Option<(Square, bool)> {
    let (mut row_step, mut col_step) = dir.offsets();
    if reversed {
        row_step = -row_step;
        col_step = -col_step;
    }
    let column = sq.column() as isize + col_step;
    if !(0..SEGMENT_COLUMNS as isize).contains(&column) {
        return None;
    }
    let column = column as usize;
    let row = sq.row() as isize + row_step;
    match row {
        0..=3 => Some((Square::from_parts(sq.segment(), row as usize, column), reversed)),
        4 => {
            // Off the center edge: the left half meets one neighbor, the
            // right half the other, and the column mirrors.
            let segment = if column < SEGMENT_COLUMNS / 2 {
                (sq.segment() + 1) % NUM_SEGMENTS
            } else {
                (sq.segment() + 2) % NUM_SEGMENTS
            };
            let mirrored = SEGMENT_COLUMNS - 1 - column;
            Some((
                Square::from_parts(segment, SEGMENT_ROWS - 1, mirrored),
                !reversed,
            ))
        }
        _ => None,
    }
}

/// Applies a multi-step pattern, threading the frame through each step.
pub fn walk(
    sq: Square,
    pattern: &[Direction],
    reversed: bool,
) -> Option<(Square, bool)> {
    let mut cur = (sq, reversed);
    for dir in pattern {
        cur = step(cur.0, *dir, cur.1)?;
    }
    Some(cur)
}
