//! Output writers for decoded layouts.

pub mod svg;
