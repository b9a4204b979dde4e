use serde::{Deserialize, Serialize};

/// A position in layout units (or millimetres, once scaled).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Rotate this point counter-clockwise by `angle_deg` around `origin`.
    pub fn rotate(&mut self, angle_deg: f64, origin: Point) -> &mut Self {
        let [x, y] = rotate_point([self.x, self.y], angle_deg, [origin.x, origin.y]);
        self.x = x;
        self.y = y;
        self
    }

    #[must_use]
    pub fn rotated(mut self, angle_deg: f64, origin: Point) -> Self {
        self.rotate(angle_deg, origin);
        self
    }

    /// Uniformly scale by `factor`, then translate by `offset`.
    #[must_use]
    pub fn scaled(self, factor: f64, offset: Point) -> Self {
        Self {
            x: offset.x + self.x * factor,
            y: offset.y + self.y * factor,
        }
    }
}

fn normalize_degrees(angle_deg: f64) -> f64 {
    let a = angle_deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if a >= 360.0 { a - 360.0 } else { a }
}

fn rotate_vec(v: [f64; 2], angle_deg: f64) -> [f64; 2] {
    let a = normalize_degrees(angle_deg);
    if a == 90.0 {
        return [-v[1], v[0]];
    }
    if a == 180.0 {
        return [-v[0], -v[1]];
    }
    if a == 270.0 {
        return [v[1], -v[0]];
    }
    let (s, c) = a.to_radians().sin_cos();
    [v[0] * c - v[1] * s, v[0] * s + v[1] * c]
}

/// Rotate `p` counter-clockwise by `angle_deg` about `origin`.
///
/// The angle is normalized into `[0, 360)` first. Right angles are computed exactly so that
/// axis-aligned rotations do not pick up trigonometric rounding noise.
#[must_use]
pub fn rotate_point(p: [f64; 2], angle_deg: f64, origin: [f64; 2]) -> [f64; 2] {
    let translated = [p[0] - origin[0], p[1] - origin[1]];
    let rotated = rotate_vec(translated, angle_deg);
    [rotated[0] + origin[0], rotated[1] + origin[1]]
}
