//! Parsing and decoding of keyboard-layout-editor (KLE) documents.

mod error;
pub mod kle;
mod value;

pub use error::Error;
pub use kle::{
    DecoderState, Layout, RawElement, RawLayout, RawRow, Style, StyleDelta, decode_layout,
    decode_rows, decode_rows_with_state, decode_str, parse_rows, split_label_tokens,
};
pub use value::Value;
