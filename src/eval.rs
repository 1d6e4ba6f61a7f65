use strum::IntoEnumIterator;

use crate::eval::params::{CombinedParams, EvalParams};
use crate::games::catalogue::{catalogue, table_index, TABLE_LEN};
use crate::games::squares::{Square, NUM_SQUARES};
use crate::games::{Color, PieceType, NUM_COLORS};

pub mod params;

/// The derived per-(color, square, piece-type) utility table that `apply`
/// reads for its O(1) incremental updates. Rebuilt whenever the interpolated
/// parameters change, which happens at most once per ply decision; changing
/// it mid-search would desynchronize the incrementally kept utility vectors.
#[derive(Clone, Debug)]
pub struct EvalTable {
    values: Vec<i16>,
    pub self_weight: i32,
}

impl EvalTable {
    /// Builds the table for the starting position. Both parameter endpoints
    /// are materialized once here: a value that only overflows late in the
    /// game is still a configuration error and is trapped up front.
    pub fn new(params: &CombinedParams) -> Result<Self, String> {
        build_values(&params.interpolate(1.0))?;
        let start = params.interpolate(0.0);
        let values = build_values(&start)?;
        Ok(Self {
            values,
            self_weight: start.self_weight,
        })
    }

    /// Re-interpolates the parameters for the given amount of remaining
    /// material and rebuilds the derived table. Idempotent for equal inputs.
    pub fn update_interpolation(
        &mut self,
        params: &CombinedParams,
        remaining_material: f64,
    ) -> Result<(), String> {
        let active = params.interpolate(interpolation_factor(params, remaining_material));
        self.values = build_values(&active)?;
        self.self_weight = active.self_weight;
        Ok(())
    }

    pub fn value(&self, color: Color, sq: Square, typ: PieceType) -> i32 {
        self.values[table_index(color, sq, typ)] as i32
    }

    pub fn values(&self) -> &[i16] {
        &self.values
    }
}

/// Total piece value of the untouched three-seat starting position.
pub fn starting_material(params: &EvalParams) -> f64 {
    let v = &params.type_values;
    let per_seat = 8.0 * v[PieceType::Pawn.index()]
        + 2.0 * v[PieceType::Knight.index()]
        + 2.0 * v[PieceType::Bishop.index()]
        + 2.0 * v[PieceType::Rook.index()]
        + v[PieceType::Queen.index()]
        + v[PieceType::King.index()];
    per_seat * NUM_COLORS as f64
}

/// `r = 1 - remaining / starting`: 0 with everything on the board, rising
/// towards 1 as material comes off.
pub fn interpolation_factor(params: &CombinedParams, remaining_material: f64) -> f64 {
    let start_total = starting_material(&params.start);
    if start_total <= 0.0 {
        return 0.0;
    }
    (1.0 - remaining_material / start_total).clamp(0.0, 1.0)
}

/// Pawns gain per rank marched: ranks 1..4 towards the center at home, 5..8
/// descending towards the promotion rank abroad.
fn pawn_row_factor(sq: Square, color: Color) -> f64 {
    if sq.is_home_of(color) {
        (sq.row() + 1) as f64
    } else {
        (2 * crate::games::squares::SEGMENT_ROWS - sq.row()) as f64
    }
}

fn build_values(params: &EvalParams) -> Result<Vec<i16>, String> {
    let mut values = vec![0i16; TABLE_LEN];
    for color in Color::iter() {
        for idx in 0..NUM_SQUARES {
            let sq = Square::new(idx);
            for typ in PieceType::iter() {
                let mut value = params.type_values[typ.index()];
                if typ == PieceType::Pawn {
                    value += params.pawn_row_value * pawn_row_factor(sq, color);
                }
                value += params.move_count_value * catalogue().mean_moves(color, sq, typ);
                let rounded = value.round();
                if rounded < i16::MIN as f64 || rounded > i16::MAX as f64 {
                    return Err(format!(
                        "derived utility {rounded} for {typ} of {color} on {sq} does not fit a short"
                    ));
                }
                values[table_index(color, sq, typ)] = rounded as i16;
            }
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_build_test() {
        let params = CombinedParams::default();
        let table = EvalTable::new(&params).unwrap();
        assert_eq!(table.self_weight, 10);
        // a queen is worth more than a pawn everywhere
        for idx in 0..NUM_SQUARES {
            let sq = Square::new(idx);
            assert!(
                table.value(Color::White, sq, PieceType::Queen)
                    > table.value(Color::White, sq, PieceType::Pawn)
            );
        }
        // pawns about to promote outvalue freshly developed ones
        let fresh = table.value(Color::White, Square::from_parts(0, 1, 3), PieceType::Pawn);
        let about_to_promote =
            table.value(Color::White, Square::from_parts(1, 0, 3), PieceType::Pawn);
        assert!(about_to_promote > fresh);
    }

    #[test]
    fn update_is_idempotent_test() {
        let params = CombinedParams::default();
        let mut table = EvalTable::new(&params).unwrap();
        let remaining = starting_material(&params.start) * 0.7;
        table.update_interpolation(&params, remaining).unwrap();
        let first = table.values().to_vec();
        let first_weight = table.self_weight;
        table.update_interpolation(&params, remaining).unwrap();
        assert_eq!(table.values(), first.as_slice());
        assert_eq!(table.self_weight, first_weight);
    }

    #[test]
    fn half_material_hits_midpoint_test() {
        let params = CombinedParams::default();
        let r = interpolation_factor(&params, starting_material(&params.start) / 2.0);
        assert_eq!(r, 0.5);
        assert_eq!(params.interpolate(r), params.interpolate(0.5));
    }

    #[test]
    fn overflow_aborts_initialization_test() {
        let mut params = CombinedParams::default();
        params.end.type_values[PieceType::Queen.index()] = 1e9;
        assert!(EvalTable::new(&params).is_err());
        // an overflow only at the start endpoint is trapped as well
        let mut params = CombinedParams::default();
        params.start.type_values[PieceType::Rook.index()] = -1e9;
        assert!(EvalTable::new(&params).is_err());
    }

    #[test]
    fn no_material_left_uses_end_params_test() {
        let params = CombinedParams::default();
        assert_eq!(interpolation_factor(&params, 0.0), 1.0);
        assert_eq!(
            interpolation_factor(&params, starting_material(&params.start)),
            0.0
        );
    }
}
