use rand::Rng;

use crate::eval::EvalTable;
use crate::games::catalogue::catalogue;
use crate::games::moves::{MoveKind, TriMove};
use crate::games::squares::{Square, NUM_SQUARES};
use crate::games::{
    byte_color, byte_is, byte_type, pack_piece, BoardView, Color, Finish, PieceType, NUM_COLORS,
};
use crate::general::move_list::Moves;

pub const WIN_UTILITY: i32 = 1_000_000;
pub const LOSS_UTILITY: i32 = -1_000_000;
pub const BYSTANDER_UTILITY: i32 = -500_000;

/// Weight of the other players' material within one seat's utility; the own
/// material weight comes from the evaluation parameters.
pub const OTHERS_WEIGHT: i32 = 10;

pub fn terminal_utilities(finish: Finish) -> [i32; NUM_COLORS] {
    let mut utilities = [BYSTANDER_UTILITY; NUM_COLORS];
    utilities[finish.winner.index()] = WIN_UTILITY;
    utilities[finish.loser.index()] = LOSS_UTILITY;
    utilities
}

fn encode_finish(finish: Finish) -> u16 {
    ((finish.winner as u16 + 1) << 4) | (finish.loser as u16 + 1)
}

fn decode_finish(word: u16) -> Option<Finish> {
    if word == 0 {
        return None;
    }
    Some(Finish {
        winner: Color::from_repr((word >> 4) as u8 - 1).unwrap(),
        loser: Color::from_repr((word & 0xf) as u8 - 1).unwrap(),
    })
}

/// The engine-side board: one byte per square plus incrementally maintained
/// per-seat utilities. Copied by value into the next ply's slot during search,
/// so applying a move never allocates.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct PackedState {
    squares: [u8; NUM_SQUARES],
    turn: Color,
    game_over: u16,
    utilities: [i32; NUM_COLORS],
    alive: [bool; NUM_COLORS],
}

impl PackedState {
    /// Copies turn, result and pieces out of an externally managed board.
    /// Utilities start out zeroed; call `refresh_utilities` once the derived
    /// table for this ply has been interpolated.
    pub fn from_view(view: &dyn BoardView) -> Result<Self, String> {
        let mut squares = [0u8; NUM_SQUARES];
        let mut alive = [false; NUM_COLORS];
        for idx in 0..NUM_SQUARES {
            let sq = Square::try_new(idx)?;
            if let Some((color, typ)) = view.piece_at(sq) {
                squares[idx] = pack_piece(color, typ);
                if typ == PieceType::King {
                    alive[color.index()] = true;
                }
            }
        }
        let turn = view.turn();
        let game_over = view.finish().map_or(0, encode_finish);
        if game_over == 0 && !alive[turn.index()] {
            return Err(format!(
                "{turn} is to move, but has no king on the board"
            ));
        }
        Ok(Self {
            squares,
            turn,
            game_over,
            utilities: [0; NUM_COLORS],
            alive,
        })
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn is_over(&self) -> bool {
        self.game_over != 0
    }

    pub fn finish(&self) -> Option<Finish> {
        decode_finish(self.game_over)
    }

    pub fn utilities(&self) -> [i32; NUM_COLORS] {
        self.utilities
    }

    pub fn utility(&self, color: Color) -> i32 {
        self.utilities[color.index()]
    }

    pub fn piece(&self, sq: Square) -> u8 {
        self.squares[sq.index()]
    }

    pub fn squares(&self) -> &[u8; NUM_SQUARES] {
        &self.squares
    }

    pub fn alive(&self, color: Color) -> bool {
        self.alive[color.index()]
    }

    /// Sum of the configured piece values still on the board, which drives
    /// the start/end parameter interpolation.
    pub fn material(&self, type_values: &[f64; crate::games::NUM_PIECE_TYPES]) -> f64 {
        self.squares
            .iter()
            .filter(|byte| **byte != 0)
            .map(|byte| type_values[byte_type(*byte).index()])
            .sum()
    }

    pub fn refresh_utilities(&mut self, table: &EvalTable) {
        self.utilities = self.recompute_utilities(table);
    }

    /// Full recomputation of the utility vector. `apply` keeps the stored
    /// vector equal to this at all times; the oracle checks exactly that.
    pub fn recompute_utilities(&self, table: &EvalTable) -> [i32; NUM_COLORS] {
        if let Some(finish) = self.finish() {
            return terminal_utilities(finish);
        }
        let mut utilities = [0; NUM_COLORS];
        for idx in 0..NUM_SQUARES {
            let byte = self.squares[idx];
            if byte == 0 {
                continue;
            }
            let color = byte_color(byte);
            let value = table.value(color, Square::new(idx), byte_type(byte));
            utilities[color.index()] += table.self_weight * value;
            for other in color.others() {
                utilities[other.index()] -= OTHERS_WEIGHT * value;
            }
        }
        utilities
    }

    /// Plays a catalogued move, updating utilities incrementally from the
    /// derived table. Returns the captured byte (zero for a quiet move).
    pub fn apply(&mut self, mov: &TriMove, table: &EvalTable) -> u8 {
        debug_assert!(!self.is_over());
        let from = mov.from.index();
        let to = mov.to.index();
        let mover = self.squares[from];
        debug_assert_ne!(mover, 0);
        let color = byte_color(mover);
        debug_assert_eq!(color, self.turn);
        let typ = byte_type(mover);

        if let MoveKind::Castle {
            rook_from,
            rook_to,
            rook_byte,
            ..
        } = mov.kind
        {
            debug_assert_eq!(self.squares[rook_from as usize], rook_byte);
            self.squares[rook_from as usize] = 0;
            self.squares[rook_to as usize] = rook_byte;
            let delta = table.value(color, Square::new(rook_to as usize), PieceType::Rook)
                - table.value(color, Square::new(rook_from as usize), PieceType::Rook);
            self.apply_delta(color, delta, table);
        }

        let captured = self.squares[to];
        self.squares[from] = 0;
        self.squares[to] = mover;
        let delta = table.value(color, mov.to, typ) - table.value(color, mov.from, typ);
        self.apply_delta(color, delta, table);

        if captured != 0 {
            let captured_color = byte_color(captured);
            debug_assert_ne!(captured_color, color);
            let captured_type = byte_type(captured);
            if captured_type == PieceType::King {
                let finish = Finish {
                    winner: color,
                    loser: captured_color,
                };
                self.alive[captured_color.index()] = false;
                self.game_over = encode_finish(finish);
                self.utilities = terminal_utilities(finish);
                return captured;
            }
            let value = table.value(captured_color, mov.to, captured_type);
            self.utilities[captured_color.index()] -= table.self_weight * value;
            for other in captured_color.others() {
                self.utilities[other.index()] += OTHERS_WEIGHT * value;
            }
        }

        if mov.promotes() {
            self.squares[to] = pack_piece(color, PieceType::Queen);
            let delta = table.value(color, mov.to, PieceType::Queen)
                - table.value(color, mov.to, PieceType::Pawn);
            self.apply_delta(color, delta, table);
        }

        self.advance_turn();
        captured
    }

    fn apply_delta(&mut self, color: Color, delta: i32, table: &EvalTable) {
        self.utilities[color.index()] += table.self_weight * delta;
        for other in color.others() {
            self.utilities[other.index()] -= OTHERS_WEIGHT * delta;
        }
    }

    /// Forward to the next seat, jumping over eliminated ones.
    fn advance_turn(&mut self) {
        let mut next = self.turn.next();
        while !self.alive[next.index()] {
            next = next.next();
        }
        self.turn = next;
    }

    /// Fills `out` with the ids of all currently playable moves for the side
    /// to move. Walks squares in descending order; a same-color destination
    /// lets sliders leap over the remainder of the blocked ray.
    pub fn available_moves_into(&self, out: &mut Moves, captures_only: bool) {
        out.clear();
        if self.is_over() {
            return;
        }
        let cat = catalogue();
        for idx in (0..NUM_SQUARES).rev() {
            let byte = self.squares[idx];
            if byte == 0 || !byte_is(byte, self.turn) {
                continue;
            }
            let (offset, list) = cat.list(self.turn, Square::new(idx), byte_type(byte));
            let mut i = 0;
            while i < list.len() {
                let mov = &list[i];
                let dest = self.squares[mov.to.index()];
                if dest != 0 && byte_is(dest, self.turn) {
                    i = match mov.kind {
                        MoveKind::Slider { skip, .. } => skip as usize,
                        _ => i + 1,
                    };
                    continue;
                }
                if captures_only && dest == 0 {
                    i += 1;
                    continue;
                }
                if mov.is_valid(&self.squares) {
                    out.push(offset + i as u32);
                }
                i += 1;
            }
        }
    }

    /// Reference enumeration without the skip jumps; slow, only for checking
    /// that the jumps never drop or invent a move.
    pub fn available_moves_plain_into(&self, out: &mut Moves, captures_only: bool) {
        out.clear();
        if self.is_over() {
            return;
        }
        let cat = catalogue();
        for idx in (0..NUM_SQUARES).rev() {
            let byte = self.squares[idx];
            if byte == 0 || !byte_is(byte, self.turn) {
                continue;
            }
            let (offset, list) = cat.list(self.turn, Square::new(idx), byte_type(byte));
            for (i, mov) in list.iter().enumerate() {
                let dest = self.squares[mov.to.index()];
                if dest != 0 && byte_is(dest, self.turn) {
                    continue;
                }
                if captures_only && dest == 0 {
                    continue;
                }
                if mov.is_valid(&self.squares) {
                    out.push(offset + i as u32);
                }
            }
        }
    }

    /// Defensive fallback: a uniformly random catalogued candidate for the
    /// side to move, playable or not. Used so an agent never answers
    /// "no move".
    pub fn random_catalogued_move<R: Rng>(&self, rng: &mut R) -> Option<(Square, Square)> {
        let cat = catalogue();
        let mut candidates = Vec::new();
        for idx in 0..NUM_SQUARES {
            let byte = self.squares[idx];
            if byte == 0 || !byte_is(byte, self.turn) {
                continue;
            }
            let (offset, list) = cat.list(self.turn, Square::new(idx), byte_type(byte));
            candidates.extend((0..list.len()).map(|i| offset + i as u32));
        }
        if candidates.is_empty() {
            return None;
        }
        let mov = cat.mov(candidates[rng.gen_range(0..candidates.len())]);
        Some((mov.from, mov.to))
    }
}
