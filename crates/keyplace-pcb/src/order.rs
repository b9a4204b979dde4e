use std::cmp::Ordering;

use keyplace_core::DecodedKey;
use serde::Deserialize;

/// Order in which keys are matched against reference names.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "mode")]
pub enum SortMode {
    /// Column-major: ascending `x * 1000 + y`.
    #[default]
    Position,
    /// Like `Position`, but keys below `threshold` (`y > threshold`) are moved to the end.
    BottomRowLast { threshold: f64 },
}

fn position_rank(key: &DecodedKey) -> f64 {
    key.center_x_units * 1000.0 + key.center_y_units
}

fn by_position(a: &DecodedKey, b: &DecodedKey) -> Ordering {
    position_rank(a).total_cmp(&position_rank(b))
}

/// Stable sort of `keys` for placement. The input slice is left untouched.
#[must_use]
pub fn order_keys(keys: &[DecodedKey], mode: SortMode) -> Vec<&DecodedKey> {
    let mut ordered: Vec<&DecodedKey> = keys.iter().collect();
    match mode {
        SortMode::Position => ordered.sort_by(|a, b| by_position(a, b)),
        SortMode::BottomRowLast { threshold } => ordered.sort_by(|a, b| {
            let a_low = a.center_y_units > threshold;
            let b_low = b.center_y_units > threshold;
            a_low.cmp(&b_low).then_with(|| by_position(a, b))
        }),
    }
    ordered
}
