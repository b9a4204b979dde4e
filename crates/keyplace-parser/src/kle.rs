use std::collections::BTreeSet;

use indexmap::IndexMap;
use keyplace_core::DecodedKey;
use serde::Serialize;
use tracing::{debug, trace};

use crate::{Error, Value};

/// Style override keys the decoder interprets. Anything else is recorded and ignored.
pub const RECOGNIZED_FIELDS: [&str; 9] = ["x", "y", "w", "h", "r", "rx", "ry", "c", "f"];

/// Per-key overrides from a KLE property object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleDelta {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub w: Option<f64>,
    pub h: Option<f64>,
    pub r: Option<f64>,
    pub rx: Option<f64>,
    pub ry: Option<f64>,
    pub c: Option<String>,
    pub f: Option<f64>,
    /// Every key present in the source object, recognized or not, in source order.
    pub keys: Vec<String>,
}

impl StyleDelta {
    #[must_use]
    pub fn has_rotation_center(&self) -> bool {
        self.rx.is_some() || self.ry.is_some()
    }

    fn from_map(
        map: &IndexMap<String, Value>,
        row: usize,
        element: usize,
    ) -> Result<Self, Error> {
        let num = |key: &str| number_field(map, key, row, element);
        Ok(Self {
            x: num("x")?,
            y: num("y")?,
            w: num("w")?,
            h: num("h")?,
            r: num("r")?,
            rx: num("rx")?,
            ry: num("ry")?,
            c: string_field(map, "c", row, element)?,
            f: num("f")?,
            keys: map.keys().cloned().collect(),
        })
    }
}

fn number_field(
    map: &IndexMap<String, Value>,
    key: &str,
    row: usize,
    element: usize,
) -> Result<Option<f64>, Error> {
    let n = match map.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => *n,
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| {
            Error::at_element(row, element, format!("field \"{key}\" is not a number: {s:?}"))
        })?,
        Some(other) => {
            return Err(Error::at_element(
                row,
                element,
                format!("field \"{key}\" must be a number, found {}", other.kind()),
            ));
        }
    };
    if !n.is_finite() {
        return Err(Error::at_element(
            row,
            element,
            format!("field \"{key}\" must be finite, found {n}"),
        ));
    }
    Ok(Some(n))
}

fn string_field(
    map: &IndexMap<String, Value>,
    key: &str,
    row: usize,
    element: usize,
) -> Result<Option<String>, Error> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(Error::at_element(
            row,
            element,
            format!("field \"{key}\" must be a string, found {}", other.kind()),
        )),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawElement {
    Delta(StyleDelta),
    Label(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub elements: Vec<RawElement>,
}

/// How a row positions the vertical cursor before its first key.
#[derive(Debug, Clone, Copy)]
enum RowStart<'a> {
    /// Row opens with a label (or is empty). Not confirmed against the layout editor.
    Bare,
    /// Leading delta declares `rx`/`ry`: the cursor restarts at the rotation origin.
    RotationReset(&'a StyleDelta),
    /// Leading delta without a rotation origin: the cursor keeps accumulating.
    Offset(&'a StyleDelta),
}

impl RawRow {
    #[must_use]
    pub fn new(elements: Vec<RawElement>) -> Self {
        Self { elements }
    }

    fn start(&self) -> RowStart<'_> {
        match self.elements.first() {
            Some(RawElement::Delta(d)) if d.has_rotation_center() => RowStart::RotationReset(d),
            Some(RawElement::Delta(d)) => RowStart::Offset(d),
            Some(RawElement::Label(_)) | None => RowStart::Bare,
        }
    }
}

/// Rows of a KLE document with the header element stripped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawLayout {
    pub name: Option<String>,
    pub rows: Vec<RawRow>,
}

/// Sticky style fields. Each persists until a later delta overrides it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    pub color: Option<String>,
    pub rotation_degrees: f64,
    pub rotation_center_x: f64,
    pub rotation_center_y: f64,
}

impl Style {
    #[must_use]
    fn overridden(&self, delta: &StyleDelta) -> Self {
        Self {
            color: delta.c.clone().or_else(|| self.color.clone()),
            rotation_degrees: delta.r.unwrap_or(self.rotation_degrees),
            rotation_center_x: delta.rx.unwrap_or(self.rotation_center_x),
            rotation_center_y: delta.ry.unwrap_or(self.rotation_center_y),
        }
    }
}

/// Running cursor and last resolved style, threaded through one decode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecoderState {
    pub running_x: f64,
    pub running_y: f64,
    pub last_style: Style,
}

impl DecoderState {
    fn begin_row(&mut self, start: RowStart<'_>) {
        match start {
            RowStart::Bare => {
                self.running_x = -1.0;
                self.running_y += 1.0;
            }
            RowStart::RotationReset(d) => {
                self.running_x = d.rx.unwrap_or(0.0);
                self.running_y = 1.0 + d.y.unwrap_or(0.0);
            }
            RowStart::Offset(d) => {
                self.running_x = -1.0;
                self.running_y += 1.0 + d.y.unwrap_or(0.0);
            }
        }
    }

    fn advance_key(&mut self, delta: Option<&StyleDelta>) {
        self.running_x += 1.0 + delta.and_then(|d| d.x).unwrap_or(0.0);
        if let Some(d) = delta {
            self.last_style = self.last_style.overridden(d);
        }
    }
}

/// Decoded document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub name: Option<String>,
    pub keys: Vec<DecodedKey>,
    /// Every property name seen on any delta.
    pub fields_seen: BTreeSet<String>,
}

/// Split on runs of whitespace. Leading/trailing whitespace produces empty edge tokens and an
/// empty label produces a single empty token.
#[must_use]
pub fn split_label_tokens(label: &str) -> Vec<String> {
    let mut tokens = vec![String::new()];
    let mut in_space = false;
    for ch in label.chars() {
        if ch.is_whitespace() {
            if !in_space {
                tokens.push(String::new());
                in_space = true;
            }
        } else {
            in_space = false;
            if let Some(t) = tokens.last_mut() {
                t.push(ch);
            }
        }
    }
    tokens
}

/// Validate the outer envelope and convert it into typed rows.
///
/// The first element must be a single-key header object; it is dropped, keeping its value as the
/// layout name when that value is a string.
pub fn parse_rows(doc: &Value) -> Result<RawLayout, Error> {
    let Value::Seq(top) = doc else {
        return Err(Error::malformed(format!(
            "layout root must be an array, found {}",
            doc.kind()
        )));
    };
    let Some(header) = top.first() else {
        return Err(Error::malformed("layout is empty; expected a header object"));
    };
    let Value::Map(header) = header else {
        return Err(Error::malformed(format!(
            "first element must be a header object, found {}",
            header.kind()
        )));
    };
    if header.len() != 1 {
        return Err(Error::malformed(format!(
            "header object must have exactly one key, found {}",
            header.len()
        )));
    }
    let name = match header.values().next() {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    };

    let mut rows = Vec::with_capacity(top.len() - 1);
    for (row_index, row) in top[1..].iter().enumerate() {
        let Value::Seq(items) = row else {
            return Err(Error::at_row(
                row_index,
                format!("rows must be arrays, found {}", row.kind()),
            ));
        };
        let mut elements = Vec::with_capacity(items.len());
        for (element_index, item) in items.iter().enumerate() {
            let element = match item {
                Value::String(label) => RawElement::Label(label.clone()),
                Value::Map(props) => {
                    RawElement::Delta(StyleDelta::from_map(props, row_index, element_index)?)
                }
                other => {
                    return Err(Error::at_element(
                        row_index,
                        element_index,
                        format!("row items must be objects or strings, found {}", other.kind()),
                    ));
                }
            };
            elements.push(element);
        }
        rows.push(RawRow::new(elements));
    }

    Ok(RawLayout { name, rows })
}

pub fn decode_rows(rows: &[RawRow]) -> Result<Vec<DecodedKey>, Error> {
    decode_rows_with_state(DecoderState::default(), rows)
}

/// Decode `rows` starting from a caller-provided cursor and style.
///
/// Either every key is returned or the first structural error is.
pub fn decode_rows_with_state(
    mut state: DecoderState,
    rows: &[RawRow],
) -> Result<Vec<DecodedKey>, Error> {
    let mut keys = Vec::new();

    for (row_index, row) in rows.iter().enumerate() {
        state.begin_row(row.start());
        debug!(
            row = row_index,
            x = state.running_x,
            y = state.running_y,
            "begin row"
        );

        let mut pending: Option<(usize, &StyleDelta)> = None;
        let mut index_in_row = 0usize;

        for (element_index, element) in row.elements.iter().enumerate() {
            match element {
                RawElement::Delta(delta) => {
                    if let Some((prev, _)) = pending {
                        return Err(Error::at_element(
                            row_index,
                            prev,
                            "style delta must be followed by a label, found another delta",
                        ));
                    }
                    if index_in_row > 0 && delta.y.is_some() {
                        return Err(Error::at_element(
                            row_index,
                            element_index,
                            "\"y\" is only allowed before the first key of a row",
                        ));
                    }
                    pending = Some((element_index, delta));
                }
                RawElement::Label(label) => {
                    let delta = pending.take().map(|(_, d)| d);
                    state.advance_key(delta);
                    let key = build_key(&state, label, delta, row_index, index_in_row);
                    trace!(
                        row = row_index,
                        index = index_in_row,
                        label = %key.primary_label,
                        x = key.center_x_units,
                        y = key.center_y_units,
                        "decoded key"
                    );
                    keys.push(key);
                    index_in_row += 1;
                }
            }
        }

        if let Some((element_index, _)) = pending {
            return Err(Error::at_element(
                row_index,
                element_index,
                "row ends with a style delta that has no label",
            ));
        }
    }

    Ok(keys)
}

fn build_key(
    state: &DecoderState,
    label: &str,
    delta: Option<&StyleDelta>,
    row_index: usize,
    index_in_row: usize,
) -> DecodedKey {
    let tokens = split_label_tokens(label);
    let style = &state.last_style;
    DecodedKey {
        raw_label: label.to_string(),
        primary_label: tokens.last().cloned().unwrap_or_default(),
        all_label_tokens: tokens,
        center_x_units: state.running_x,
        center_y_units: state.running_y,
        width_units: delta.and_then(|d| d.w).unwrap_or(1.0),
        height_units: delta.and_then(|d| d.h).unwrap_or(1.0),
        row_index,
        index_in_row,
        rotation_degrees: style.rotation_degrees,
        rotation_center_x: style.rotation_center_x,
        rotation_center_y: style.rotation_center_y,
        color: style.color.clone(),
        legend_size: delta.and_then(|d| d.f),
        raw_x_override: delta.and_then(|d| d.x),
        raw_y_override: delta.and_then(|d| d.y),
    }
}

/// Parse, decode and summarize a KLE document tree.
pub fn decode_layout(doc: &Value) -> Result<Layout, Error> {
    let raw = parse_rows(doc)?;
    let keys = decode_rows(&raw.rows)?;

    let fields_seen: BTreeSet<String> = raw
        .rows
        .iter()
        .flat_map(|row| row.elements.iter())
        .filter_map(|el| match el {
            RawElement::Delta(d) => Some(d.keys.iter().cloned()),
            RawElement::Label(_) => None,
        })
        .flatten()
        .collect();

    let ignored: Vec<&str> = fields_seen
        .iter()
        .map(String::as_str)
        .filter(|f| !RECOGNIZED_FIELDS.contains(f))
        .collect();
    debug!(
        keys = keys.len(),
        rows = raw.rows.len(),
        fields = ?fields_seen,
        ignored = ?ignored,
        "decoded layout"
    );

    Ok(Layout {
        name: raw.name,
        keys,
        fields_seen,
    })
}

pub fn decode_str(json: &str) -> Result<Layout, Error> {
    decode_layout(&Value::try_from_json_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(s: &str) -> RawElement {
        RawElement::Label(s.to_string())
    }

    fn delta(f: impl FnOnce(&mut StyleDelta)) -> RawElement {
        let mut d = StyleDelta::default();
        f(&mut d);
        RawElement::Delta(d)
    }

    #[test]
    fn split_label_tokens_matches_whitespace_runs() {
        assert_eq!(split_label_tokens("A"), vec!["A"]);
        assert_eq!(split_label_tokens("! 1"), vec!["!", "1"]);
        assert_eq!(split_label_tokens("Shift\n\nCaps"), vec!["Shift", "Caps"]);
        assert_eq!(split_label_tokens(""), vec![""]);
        assert_eq!(split_label_tokens(" A"), vec!["", "A"]);
        assert_eq!(split_label_tokens("A \t"), vec!["A", ""]);
    }

    #[test]
    fn bare_row_resets_x_and_steps_y() {
        let mut state = DecoderState {
            running_x: 7.0,
            running_y: 2.5,
            ..DecoderState::default()
        };
        state.begin_row(RowStart::Bare);
        assert_eq!(state.running_x, -1.0);
        assert_eq!(state.running_y, 3.5);
    }

    #[test]
    fn rotation_reset_ignores_previous_cursor() {
        let d = StyleDelta {
            rx: Some(4.0),
            y: Some(-0.5),
            ..StyleDelta::default()
        };
        let mut state = DecoderState {
            running_x: 12.0,
            running_y: 9.0,
            ..DecoderState::default()
        };
        state.begin_row(RowStart::RotationReset(&d));
        assert_eq!(state.running_x, 4.0);
        assert_eq!(state.running_y, 0.5);
    }

    #[test]
    fn rotation_reset_with_only_ry_starts_at_zero() {
        let d = StyleDelta {
            ry: Some(3.0),
            ..StyleDelta::default()
        };
        let mut state = DecoderState {
            running_x: 5.0,
            running_y: 5.0,
            ..DecoderState::default()
        };
        state.begin_row(RowStart::RotationReset(&d));
        assert_eq!(state.running_x, 0.0);
        assert_eq!(state.running_y, 1.0);
    }

    #[test]
    fn seeded_state_continues_from_cursor_and_style() {
        let seed = DecoderState {
            running_x: 0.0,
            running_y: 10.0,
            last_style: Style {
                color: Some("#123456".to_string()),
                rotation_degrees: 15.0,
                ..Style::default()
            },
        };
        let rows = vec![RawRow::new(vec![label("A")])];
        let keys = decode_rows_with_state(seed, &rows).unwrap();
        assert_eq!(keys[0].center_x_units, 0.0);
        assert_eq!(keys[0].center_y_units, 11.0);
        assert_eq!(keys[0].color.as_deref(), Some("#123456"));
        assert_eq!(keys[0].rotation_degrees, 15.0);
    }

    #[test]
    fn non_sticky_fields_do_not_inherit() {
        let rows = vec![RawRow::new(vec![
            delta(|d| {
                d.w = Some(2.0);
                d.h = Some(1.5);
                d.f = Some(4.0);
                d.x = Some(0.25);
            }),
            label("Wide"),
            label("Next"),
        ])];
        let keys = decode_rows(&rows).unwrap();
        assert_eq!(keys[0].width_units, 2.0);
        assert_eq!(keys[0].height_units, 1.5);
        assert_eq!(keys[0].legend_size, Some(4.0));
        assert_eq!(keys[0].raw_x_override, Some(0.25));
        assert_eq!(keys[0].center_x_units, 0.25);
        assert_eq!(keys[1].width_units, 1.0);
        assert_eq!(keys[1].height_units, 1.0);
        assert_eq!(keys[1].legend_size, None);
        assert_eq!(keys[1].raw_x_override, None);
        assert_eq!(keys[1].center_x_units, 1.25);
    }

    #[test]
    fn doubled_delta_is_rejected() {
        let rows = vec![RawRow::new(vec![
            delta(|d| d.x = Some(1.0)),
            delta(|d| d.w = Some(2.0)),
            label("A"),
        ])];
        let err = decode_rows(&rows).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedInput {
                row: Some(0),
                element: Some(0),
                ..
            }
        ));
    }

    #[test]
    fn y_after_first_key_is_rejected_even_in_bare_rows() {
        let rows = vec![RawRow::new(vec![
            label("A"),
            delta(|d| d.y = Some(0.5)),
            label("B"),
        ])];
        let err = decode_rows(&rows).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedInput {
                row: Some(0),
                element: Some(1),
                ..
            }
        ));
    }

    #[test]
    fn empty_row_only_advances_y() {
        let rows = vec![
            RawRow::new(vec![label("A")]),
            RawRow::default(),
            RawRow::new(vec![label("B")]),
        ];
        let keys = decode_rows(&rows).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[1].center_y_units, 3.0);
        assert_eq!(keys[1].row_index, 2);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let doc = Value::try_from_json_str(r#"[{"name":"n"},[{"x":"0.5"},"A"]]"#).unwrap();
        let raw = parse_rows(&doc).unwrap();
        let RawElement::Delta(d) = &raw.rows[0].elements[0] else {
            panic!("expected delta");
        };
        assert_eq!(d.x, Some(0.5));
    }

    #[test]
    fn non_finite_numeric_strings_are_malformed() {
        for (json, element) in [
            r#"[{"name":"n"},[{"x":"NaN"},"A","B"]]"#,
            r#"[{"name":"n"},["A",{"w":"inf"},"C"]]"#,
            r#"[{"name":"n"},["A",{"h":"-infinity"},"C"]]"#,
            r#"[{"name":"n"},["A",{"r":"1e400"},"C"]]"#,
        ]
        .into_iter()
        .zip([0, 1, 1, 1])
        {
            let doc = Value::try_from_json_str(json).unwrap();
            let err = parse_rows(&doc).unwrap_err();
            assert!(
                matches!(
                    err,
                    Error::MalformedInput {
                        row: Some(0),
                        element: Some(e),
                        ..
                    } if e == element
                ),
                "{json}: {err}"
            );
        }
        assert!(decode_str(r#"[{"name":"n"},[{"x":"NaN"},"A","B"]]"#).is_err());
    }

    #[test]
    fn wrong_field_type_is_malformed() {
        let doc = Value::try_from_json_str(r#"[{"name":"n"},["A",{"w":true},"B"]]"#).unwrap();
        let err = parse_rows(&doc).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedInput {
                row: Some(0),
                element: Some(1),
                ..
            }
        ));
        let doc = Value::try_from_json_str(r#"[{"name":"n"},[{"c":3},"B"]]"#).unwrap();
        assert!(parse_rows(&doc).is_err());
    }
}
