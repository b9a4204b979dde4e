use serde::{Deserialize, Serialize};

use crate::point::{Point, rotate_point};

/// One physical key with absolute coordinates in layout units.
///
/// The center is the decoder's unrotated running cursor. Rotation angle and origin are carried as
/// metadata; [`DecodedKey::rotated_center`] applies them for consumers that want the rotated
/// position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecodedKey {
    pub raw_label: String,
    /// Last whitespace-separated token of `raw_label`.
    pub primary_label: String,
    pub all_label_tokens: Vec<String>,
    pub center_x_units: f64,
    pub center_y_units: f64,
    #[serde(default = "default_dimension")]
    pub width_units: f64,
    #[serde(default = "default_dimension")]
    pub height_units: f64,
    pub row_index: usize,
    pub index_in_row: usize,
    #[serde(default)]
    pub rotation_degrees: f64,
    #[serde(default)]
    pub rotation_center_x: f64,
    #[serde(default)]
    pub rotation_center_y: f64,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub legend_size: Option<f64>,
    #[serde(default)]
    pub raw_x_override: Option<f64>,
    #[serde(default)]
    pub raw_y_override: Option<f64>,
}

fn default_dimension() -> f64 {
    1.0
}

impl DecodedKey {
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.center_x_units, self.center_y_units)
    }

    #[must_use]
    pub fn rotation_center(&self) -> Point {
        Point::new(self.rotation_center_x, self.rotation_center_y)
    }

    /// Center offset by the rotation origin and rotated about it by the negated key angle.
    ///
    /// Never applied by the decoder itself.
    #[must_use]
    pub fn rotated_center(&self) -> Point {
        let [x, y] = rotate_point(
            [
                self.center_x_units + self.rotation_center_x,
                self.center_y_units + self.rotation_center_y,
            ],
            -self.rotation_degrees,
            [self.rotation_center_x, self.rotation_center_y],
        );
        Point::new(x, y)
    }
}
