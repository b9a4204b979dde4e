use std::path::PathBuf;

use approx::assert_abs_diff_eq;
use keyplace_core::DecodedKey;
use keyplace_parser::{Error, decode_str};

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

fn decode_body(rows: &str) -> Result<Vec<DecodedKey>, Error> {
    decode_str(&format!(r#"[{{"name":"test"}},{rows}]"#)).map(|l| l.keys)
}

fn centers(keys: &[DecodedKey]) -> Vec<(f64, f64)> {
    keys.iter()
        .map(|k| (k.center_x_units, k.center_y_units))
        .collect()
}

#[test]
fn first_row_y_offset() {
    let keys = decode_body(r#"[{"y":0.5},"A"]"#).unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].row_index, 0);
    assert_eq!(keys[0].center_x_units, 0.0);
    assert_eq!(keys[0].center_y_units, 1.5);
    assert_eq!(keys[0].raw_y_override, Some(0.5));
}

#[test]
fn plain_rows_step_one_unit() {
    let keys = decode_body(r#"["Q","W"],["A","S"]"#).unwrap();
    assert_eq!(
        centers(&keys),
        vec![(0.0, 1.0), (1.0, 1.0), (0.0, 2.0), (1.0, 2.0)]
    );
    let labels: Vec<&str> = keys.iter().map(|k| k.primary_label.as_str()).collect();
    assert_eq!(labels, ["Q", "W", "A", "S"]);
    let idx: Vec<(usize, usize)> = keys.iter().map(|k| (k.row_index, k.index_in_row)).collect();
    assert_eq!(idx, [(0, 0), (0, 1), (1, 0), (1, 1)]);
}

#[test]
fn color_is_sticky_across_bare_labels() {
    let keys = decode_body(r##"[{"c":"#ff0000"},"X","Y"]"##).unwrap();
    assert_eq!(keys[0].color.as_deref(), Some("#ff0000"));
    assert_eq!(keys[1].color.as_deref(), Some("#ff0000"));
}

#[test]
fn color_defaults_to_none() {
    let keys = decode_body(r#"["A"]"#).unwrap();
    assert_eq!(keys[0].color, None);
    assert_eq!(keys[0].rotation_degrees, 0.0);
    assert_eq!(keys[0].rotation_center_x, 0.0);
    assert_eq!(keys[0].rotation_center_y, 0.0);
}

#[test]
fn dangling_delta_is_malformed() {
    let err = decode_body(r#"[{"x":1}]"#).unwrap_err();
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
fn rotation_reset_row_restarts_cursor() {
    let keys = decode_body(r#"["A","B","C","D"],[{"rx":2,"y":1},"Fn"]"#).unwrap();
    let fn_key = &keys[4];
    assert_eq!(fn_key.primary_label, "Fn");
    assert_eq!((fn_key.center_x_units, fn_key.center_y_units), (3.0, 2.0));
    assert_eq!(fn_key.rotation_center_x, 2.0);
}

#[test]
fn rotation_reset_is_independent_of_previous_row_end() {
    let short = decode_body(r#"["A"],[{"rx":1,"ry":1},"R"]"#).unwrap();
    let long = decode_body(r#"[{"y":3},"A","B","C",{"x":4},"D"],[{"rx":1,"ry":1},"R"]"#).unwrap();
    let a = short.last().unwrap();
    let b = long.last().unwrap();
    assert_eq!((a.center_x_units, a.center_y_units), (2.0, 1.0));
    assert_eq!((b.center_x_units, b.center_y_units), (2.0, 1.0));
}

#[test]
fn row_starting_with_bare_label_after_offset_row() {
    let keys = decode_body(r#"[{"y":0.5},"A",{"x":2},"B"],["C","D"]"#).unwrap();
    assert_eq!(
        centers(&keys),
        vec![(0.0, 1.5), (3.0, 1.5), (0.0, 2.5), (1.0, 2.5)]
    );
}

#[test]
fn rotation_is_sticky_and_center_stays_unrotated() {
    let keys = decode_body(r#"[{"r":30,"rx":1,"ry":2},"A","B"],["C"]"#).unwrap();
    for k in &keys {
        assert_eq!(k.rotation_degrees, 30.0);
        assert_eq!(k.rotation_center_x, 1.0);
        assert_eq!(k.rotation_center_y, 2.0);
    }
    assert_eq!(centers(&keys), vec![(2.0, 1.0), (3.0, 1.0), (0.0, 2.0)]);

    let rotated = keys[0].rotated_center();
    assert!((rotated.x - keys[0].center_x_units).abs() > 1e-6);
}

#[test]
fn partial_rotation_overrides_keep_other_fields() {
    let keys = decode_body(
        r#"[{"r":15,"rx":2,"ry":3},"A",{"r":30},"B"],[{"rx":5},"C","D"],["E"]"#,
    )
    .unwrap();
    let rotation: Vec<(&str, f64, f64, f64)> = keys
        .iter()
        .map(|k| {
            (
                k.raw_label.as_str(),
                k.rotation_degrees,
                k.rotation_center_x,
                k.rotation_center_y,
            )
        })
        .collect();
    assert_eq!(
        rotation,
        vec![
            ("A", 15.0, 2.0, 3.0),
            ("B", 30.0, 2.0, 3.0),
            ("C", 30.0, 5.0, 3.0),
            ("D", 30.0, 5.0, 3.0),
            ("E", 30.0, 5.0, 3.0),
        ]
    );
    assert_eq!(
        centers(&keys),
        vec![(3.0, 1.0), (4.0, 1.0), (6.0, 1.0), (7.0, 1.0), (0.0, 2.0)]
    );
}

#[test]
fn misplaced_y_is_malformed() {
    let err = decode_body(r#"["A",{"y":1},"B"]"#).unwrap_err();
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
fn header_rules() {
    assert!(matches!(decode_str("[]"), Err(Error::MalformedInput { .. })));
    assert!(matches!(
        decode_str(r#"[["A"]]"#),
        Err(Error::MalformedInput { .. })
    ));
    assert!(matches!(
        decode_str(r#"[{"name":"a","author":"b"},["A"]]"#),
        Err(Error::MalformedInput { .. })
    ));
    assert!(matches!(
        decode_str(r#"{"name":"a"}"#),
        Err(Error::MalformedInput { .. })
    ));
    assert!(matches!(decode_str("[{"), Err(Error::Json(_))));

    let layout = decode_str(r#"[{"name":"Iris"}]"#).unwrap();
    assert_eq!(layout.name.as_deref(), Some("Iris"));
    assert!(layout.keys.is_empty());
}

#[test]
fn non_array_row_and_bad_items_are_malformed() {
    assert!(matches!(
        decode_body(r#"["A"],{"x":1}"#),
        Err(Error::MalformedInput {
            row: Some(1),
            element: None,
            ..
        })
    ));
    assert!(matches!(
        decode_body(r#"["A",3]"#),
        Err(Error::MalformedInput {
            row: Some(0),
            element: Some(1),
            ..
        })
    ));
}

#[test]
fn empty_label_is_a_key() {
    let keys = decode_body(r#"["", "B"]"#).unwrap();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0].primary_label, "");
    assert_eq!(keys[0].all_label_tokens, vec![String::new()]);
}

#[test]
fn decodes_split_thumbs_fixture() {
    let json =
        std::fs::read_to_string(workspace_root().join("fixtures/split_thumbs.json")).unwrap();
    let layout = decode_str(&json).unwrap();

    assert_eq!(layout.name.as_deref(), Some("split-thumbs"));
    assert_eq!(layout.keys.len(), 11);

    let labels: Vec<&str> = layout.keys.iter().map(|k| k.primary_label.as_str()).collect();
    assert_eq!(
        labels,
        ["Esc", "1", "2", "3", "Tab", "Q", "W", "Shift", "Z", "Space", "Fn"]
    );
    assert_eq!(layout.keys[1].all_label_tokens, vec!["!", "1"]);

    let expected = [
        (0.0, 1.0),
        (1.0, 1.0),
        (2.0, 1.0),
        (4.0, 1.0),
        (0.0, 2.25),
        (1.0, 2.25),
        (2.0, 2.25),
        (0.0, 3.25),
        (1.0, 3.25),
        (5.5, 0.5),
        (6.5, 0.5),
    ];
    for (k, (x, y)) in layout.keys.iter().zip(expected) {
        assert_abs_diff_eq!(k.center_x_units, x, epsilon = 1e-12);
        assert_abs_diff_eq!(k.center_y_units, y, epsilon = 1e-12);
    }

    let colors: Vec<Option<&str>> = layout.keys.iter().map(|k| k.color.as_deref()).collect();
    assert_eq!(&colors[..4], [Some("#cccccc"); 4]);
    assert_eq!(&colors[6..], [Some("#aaaaaa"); 5]);

    assert_eq!(layout.keys[0].legend_size, Some(3.0));
    assert_eq!(layout.keys[1].legend_size, None);
    assert_eq!(layout.keys[4].width_units, 1.5);
    assert_eq!(layout.keys[5].width_units, 1.0);

    let space = &layout.keys[9];
    assert_eq!(space.rotation_degrees, 15.0);
    assert_eq!((space.rotation_center_x, space.rotation_center_y), (4.0, 3.0));
    assert_eq!(space.raw_y_override, Some(-0.5));
    assert_eq!(layout.keys[10].rotation_degrees, 15.0);
    assert_eq!(layout.keys[8].rotation_degrees, 0.0);

    let fields: Vec<&str> = layout.fields_seen.iter().map(String::as_str).collect();
    assert_eq!(fields, ["a", "c", "f", "r", "rx", "ry", "w", "x", "y"]);
}

#[test]
fn dangling_delta_fixture_reports_row() {
    let json =
        std::fs::read_to_string(workspace_root().join("fixtures/dangling_delta.json")).unwrap();
    let err = decode_str(&json).unwrap_err();
    assert_eq!(
        err.to_string(),
        "malformed layout at row 1, element 0: row ends with a style delta that has no label"
    );
}
