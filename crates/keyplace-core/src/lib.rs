//! Decoded key model and the planar geometry used by renderers and placement.

pub mod key;
pub mod point;

pub use key::DecodedKey;
pub use point::{Point, rotate_point};
