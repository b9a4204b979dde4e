use keyplace_core::{DecodedKey, rotate_point};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum SvgError {
    #[error("SVG export requires at least one key")]
    Empty,
    #[error("unit size must be a positive number (got {0})")]
    InvalidUnitSize(f64),
}

const DEFAULT_FILL: &str = "red";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SvgOptions {
    /// Pixels per layout unit.
    pub unit_size: f64,
    pub draw_labels: bool,
    pub draw_metadata: bool,
    pub draw_center_marker: bool,
    /// Rotate each key group by its angle around the key's own center.
    pub rotate_keys: bool,
    pub legend_font_size: f64,
    pub rect_opacity: f64,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            unit_size: 50.0,
            draw_labels: false,
            draw_metadata: false,
            draw_center_marker: true,
            rotate_keys: false,
            legend_font_size: 12.0,
            rect_opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl Bounds {
    fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    fn update_point(&mut self, p: [f64; 2]) {
        self.min_x = self.min_x.min(p[0]);
        self.max_x = self.max_x.max(p[0]);
        self.min_y = self.min_y.min(p[1]);
        self.max_y = self.max_y.max(p[1]);
    }
}

/// Pixel-space rectangle for one key.
#[derive(Debug, Clone, Copy)]
struct KeyRect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    rotation: f64,
}

impl KeyRect {
    fn center(&self) -> [f64; 2] {
        [self.x + self.width / 2.0, self.y + self.height / 2.0]
    }

    fn corners(&self) -> [[f64; 2]; 4] {
        let (x0, y0) = (self.x, self.y);
        let (x1, y1) = (self.x + self.width, self.y + self.height);
        let pts = [[x0, y0], [x1, y0], [x1, y1], [x0, y1]];
        if self.rotation == 0.0 {
            return pts;
        }
        // SVG's rotate() in a y-down frame uses the same matrix as a math-frame CCW rotation.
        let c = self.center();
        pts.map(|p| rotate_point(p, self.rotation, c))
    }
}

/// Render keys as an SVG diagram.
///
/// Positions are offset by the smallest key center so the diagram starts at the layout's top-left
/// bound. Each key's rect has its top-left corner at the offset center.
pub fn svg_from_keys(keys: &[DecodedKey], opts: &SvgOptions) -> Result<String, SvgError> {
    if keys.is_empty() {
        return Err(SvgError::Empty);
    }
    if !(opts.unit_size.is_finite() && opts.unit_size > 0.0) {
        return Err(SvgError::InvalidUnitSize(opts.unit_size));
    }

    let unit = opts.unit_size;
    let min_x = keys
        .iter()
        .map(|k| k.center_x_units)
        .fold(f64::INFINITY, f64::min);
    let min_y = keys
        .iter()
        .map(|k| k.center_y_units)
        .fold(f64::INFINITY, f64::min);

    let rects: Vec<KeyRect> = keys
        .iter()
        .map(|k| KeyRect {
            x: (k.center_x_units - min_x) * unit,
            y: (k.center_y_units - min_y) * unit,
            width: k.width_units * unit,
            height: k.height_units * unit,
            rotation: if opts.rotate_keys {
                k.rotation_degrees
            } else {
                0.0
            },
        })
        .collect();

    let mut bounds = Bounds::new();
    for r in &rects {
        for p in r.corners() {
            bounds.update_point(p);
        }
    }
    let width = bounds.max_x - bounds.min_x;
    let height = bounds.max_y - bounds.min_y;

    let mut body = String::new();
    for (key, rect) in keys.iter().zip(&rects) {
        body.push_str(&key_group(key, rect, opts));
        body.push('\n');
    }

    debug!(keys = keys.len(), width, height, "rendered svg");

    Ok(format!(
        "<svg width=\"{w}\" height=\"{h}\" viewBox=\"{x} {y} {w} {h}\" xmlns=\"http://www.w3.org/2000/svg\">\n{body}</svg>\n",
        x = fmt_num(bounds.min_x),
        y = fmt_num(bounds.min_y),
        w = fmt_num(width),
        h = fmt_num(height),
    ))
}

fn key_group(key: &DecodedKey, rect: &KeyRect, opts: &SvgOptions) -> String {
    let [cx, cy] = rect.center();
    let fill = key.color.as_deref().unwrap_or(DEFAULT_FILL);

    let mut g = if rect.rotation != 0.0 {
        format!(
            "<g transform=\"rotate({} {} {})\">",
            fmt_num(rect.rotation),
            fmt_num(cx),
            fmt_num(cy)
        )
    } else {
        "<g>".to_string()
    };

    g.push_str(&format!(
        "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" opacity=\"{}\" stroke=\"black\"/>",
        fmt_num(rect.x),
        fmt_num(rect.y),
        fmt_num(rect.width),
        fmt_num(rect.height),
        escape_xml(fill),
        fmt_num(opts.rect_opacity),
    ));

    if opts.draw_labels {
        g.push_str(&format!(
            "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"{}\" fill=\"black\">{}</text>",
            fmt_num(cx),
            fmt_num(cy),
            fmt_num(opts.legend_font_size),
            escape_xml(&key.primary_label),
        ));
    }

    if opts.draw_metadata {
        g.push_str(&format!(
            "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"8\" fill=\"black\">({:.2}, {:.2})</text>",
            fmt_num(cx),
            fmt_num(cy + 15.0),
            key.center_x_units,
            key.center_y_units,
        ));
    }

    if opts.draw_center_marker {
        g.push_str(&format!(
            "<circle cx=\"{}\" cy=\"{}\" r=\"{}\" fill=\"black\"/>",
            fmt_num(cx),
            fmt_num(cy),
            fmt_num(0.02 * opts.unit_size),
        ));
    }

    g.push_str("</g>");
    g
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn fmt_num(v: f64) -> String {
    let v = if v.abs() < 1e-9 { 0.0 } else { v };
    let mut buf = ryu::Buffer::new();
    let s = buf.format(v);
    s.strip_suffix(".0").unwrap_or(s).to_string()
}
