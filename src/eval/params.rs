use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::games::NUM_PIECE_TYPES;

/// One parameter triple: the weight of own material in the own utility, a
/// value per piece type (pawn, knight, bishop, rook, queen, king), a bonus
/// per advanced pawn rank and a bonus per geometrically possible move.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvalParams {
    pub self_weight: i32,
    pub type_values: [f64; NUM_PIECE_TYPES],
    pub pawn_row_value: f64,
    pub move_count_value: f64,
}

/// Start-of-game and end-of-game parameters; the active set is interpolated
/// between the two by the share of material that has left the board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombinedParams {
    pub start: EvalParams,
    pub end: EvalParams,
}

impl Default for CombinedParams {
    fn default() -> Self {
        Self {
            start: EvalParams {
                self_weight: 10,
                type_values: [100.0, 320.0, 330.0, 500.0, 900.0, 0.0],
                pawn_row_value: 15.0,
                move_count_value: 4.0,
            },
            end: EvalParams {
                self_weight: 10,
                type_values: [140.0, 300.0, 320.0, 550.0, 950.0, 0.0],
                pawn_row_value: 40.0,
                move_count_value: 2.0,
            },
        }
    }
}

fn lerp(a: f64, b: f64, r: f64) -> f64 {
    a + (b - a) * r
}

impl CombinedParams {
    /// The active parameters at interpolation factor `r` in `[0, 1]`, where 0
    /// is the untouched starting position and 1 a board with no material left.
    pub fn interpolate(&self, r: f64) -> EvalParams {
        let r = r.clamp(0.0, 1.0);
        let mut type_values = [0.0; NUM_PIECE_TYPES];
        for (i, value) in type_values.iter_mut().enumerate() {
            *value = lerp(self.start.type_values[i], self.end.type_values[i], r);
        }
        EvalParams {
            self_weight: lerp(self.start.self_weight as f64, self.end.self_weight as f64, r)
                .round() as i32,
            type_values,
            pawn_row_value: lerp(self.start.pawn_row_value, self.end.pawn_row_value, r),
            move_count_value: lerp(self.start.move_count_value, self.end.move_count_value, r),
        }
    }

    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string(self).map_err(|err| format!("couldn't serialize parameters: {err}"))
    }

    pub fn from_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|err| format!("couldn't parse parameters: {err}"))
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path)
            .map_err(|err| format!("couldn't read {0}: {err}", path.display()))?;
        Self::from_toml(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        fs::write(path, self.to_toml()?)
            .map_err(|err| format!("couldn't write {0}: {err}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolation_endpoints_test() {
        let params = CombinedParams::default();
        assert_eq!(params.interpolate(0.0), params.start);
        assert_eq!(params.interpolate(1.0), params.end);
        // out-of-range factors clamp
        assert_eq!(params.interpolate(-0.5), params.start);
        assert_eq!(params.interpolate(2.0), params.end);
    }

    #[test]
    fn interpolation_midpoint_test() {
        let params = CombinedParams::default();
        let mid = params.interpolate(0.5);
        for i in 0..NUM_PIECE_TYPES {
            assert_eq!(
                mid.type_values[i],
                (params.start.type_values[i] + params.end.type_values[i]) / 2.0
            );
        }
        assert_eq!(
            mid.pawn_row_value,
            (params.start.pawn_row_value + params.end.pawn_row_value) / 2.0
        );
        assert_eq!(
            mid.move_count_value,
            (params.start.move_count_value + params.end.move_count_value) / 2.0
        );
        assert_eq!(mid.self_weight, 10);
    }

    #[test]
    fn toml_round_trip_test() {
        let mut params = CombinedParams::default();
        params.start.type_values[0] = 101.25;
        params.end.move_count_value = 2.125;
        let text = params.to_toml().unwrap();
        let back = CombinedParams::from_toml(&text).unwrap();
        assert_eq!(params, back);
    }
}
