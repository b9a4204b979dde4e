//! File-backed [`Board`] over a `.kicad_pcb` document.
//!
//! Only the footprint-level `(at x y [rot])` node is ever rewritten; every other byte of the
//! source is preserved.

use std::ops::Range;
use std::path::Path;

use indexmap::IndexMap;
use keyplace_core::Point;
use tracing::{debug, warn};

use crate::{Board, PcbError};

#[derive(Debug, Clone)]
enum Sexp {
    Atom { text: String },
    List { items: Vec<Sexp>, span: Range<usize> },
}

impl Sexp {
    fn atom(&self) -> Option<&str> {
        match self {
            Sexp::Atom { text } => Some(text),
            Sexp::List { .. } => None,
        }
    }

    fn head(&self) -> Option<&str> {
        match self {
            Sexp::List { items, .. } => items.first().and_then(Sexp::atom),
            Sexp::Atom { .. } => None,
        }
    }

    fn items(&self) -> &[Sexp] {
        match self {
            Sexp::List { items, .. } => items,
            Sexp::Atom { .. } => &[],
        }
    }
}

fn push_node(stack: &mut [(usize, Vec<Sexp>)], top: &mut Vec<Sexp>, node: Sexp) {
    match stack.last_mut() {
        Some((_, items)) => items.push(node),
        None => top.push(node),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

fn parse_sexp(src: &str) -> Result<Vec<Sexp>, PcbError> {
    let bytes = src.as_bytes();
    let mut stack: Vec<(usize, Vec<Sexp>)> = Vec::new();
    let mut top: Vec<Sexp> = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'(' => {
                stack.push((i, Vec::new()));
                i += 1;
            }
            b')' => {
                let Some((start, items)) = stack.pop() else {
                    return Err(PcbError::Parse {
                        offset: i,
                        message: "unbalanced ')'".to_string(),
                    });
                };
                i += 1;
                push_node(&mut stack, &mut top, Sexp::List { items, span: start..i });
            }
            b'"' => {
                let start = i + 1;
                i = start;
                loop {
                    match bytes.get(i) {
                        None => {
                            return Err(PcbError::Parse {
                                offset: start - 1,
                                message: "unterminated string".to_string(),
                            });
                        }
                        Some(b'\\') => i += 2,
                        Some(b'"') => break,
                        Some(_) => i += 1,
                    }
                }
                let text = unescape(&src[start..i]);
                i += 1;
                push_node(&mut stack, &mut top, Sexp::Atom { text });
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < bytes.len()
                    && !bytes[i].is_ascii_whitespace()
                    && !matches!(bytes[i], b'(' | b')' | b'"')
                {
                    i += 1;
                }
                let text = src[start..i].to_string();
                push_node(&mut stack, &mut top, Sexp::Atom { text });
            }
        }
    }

    if let Some((start, _)) = stack.last() {
        return Err(PcbError::Parse {
            offset: *start,
            message: "unclosed '('".to_string(),
        });
    }
    Ok(top)
}

#[derive(Debug, Clone)]
struct FootprintSite {
    at_span: Range<usize>,
    position: Point,
    rotation: Option<String>,
}

fn footprint_reference(items: &[Sexp]) -> Option<String> {
    items.iter().find_map(|child| {
        let fields = child.items();
        let kind = fields.get(1).and_then(Sexp::atom);
        match (child.head()?, kind) {
            // KiCad 6+: (property "Reference" "K101" ...)
            // KiCad 5: (fp_text reference K101 ...)
            ("property", Some("Reference")) | ("fp_text", Some("reference")) => {
                fields.get(2)?.atom().map(str::to_string)
            }
            _ => None,
        }
    })
}

fn footprint_site(items: &[Sexp]) -> Option<FootprintSite> {
    let at = items.iter().find(|child| child.head() == Some("at"))?;
    let Sexp::List { items: at_items, span } = at else {
        return None;
    };
    let x = at_items.get(1)?.atom()?.parse::<f64>().ok()?;
    let y = at_items.get(2)?.atom()?.parse::<f64>().ok()?;
    let rotation = at_items.get(3).and_then(Sexp::atom).map(str::to_string);
    Some(FootprintSite {
        at_span: span.clone(),
        position: Point::new(x, y),
        rotation,
    })
}

fn collect_footprints(nodes: &[Sexp], out: &mut IndexMap<String, FootprintSite>) {
    for node in nodes {
        let Sexp::List { items, .. } = node else {
            continue;
        };
        match node.head() {
            Some("footprint" | "module") => {
                let (Some(reference), Some(site)) =
                    (footprint_reference(items), footprint_site(items))
                else {
                    debug!("skipping footprint without reference or position");
                    continue;
                };
                if out.contains_key(&reference) {
                    warn!(reference, "duplicate footprint reference; keeping the first");
                    continue;
                }
                out.insert(reference, site);
            }
            _ => collect_footprints(items, out),
        }
    }
}

fn fmt_mm(v: f64) -> String {
    let v = if v.abs() < 5e-7 { 0.0 } else { v };
    let s = format!("{v:.6}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

/// A KiCad board document with pending footprint moves.
#[derive(Debug, Clone)]
pub struct KicadBoard {
    source: String,
    footprints: IndexMap<String, FootprintSite>,
    moves: IndexMap<String, Point>,
}

impl KicadBoard {
    pub fn parse(source: impl Into<String>) -> Result<Self, PcbError> {
        let source = source.into();
        let nodes = parse_sexp(&source)?;
        let mut footprints = IndexMap::new();
        collect_footprints(&nodes, &mut footprints);
        debug!(footprints = footprints.len(), "parsed board");
        Ok(Self {
            source,
            footprints,
            moves: IndexMap::new(),
        })
    }

    pub fn open(path: &Path) -> Result<Self, PcbError> {
        let source = std::fs::read_to_string(path).map_err(|e| PcbError::read(path, e))?;
        Self::parse(source)
    }

    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.footprints.keys().map(String::as_str)
    }

    /// Current position of `reference` in millimetres, including pending moves.
    #[must_use]
    pub fn position(&self, reference: &str) -> Option<Point> {
        self.moves
            .get(reference)
            .copied()
            .or_else(|| self.footprints.get(reference).map(|site| site.position))
    }

    /// The document with every pending move applied.
    #[must_use]
    pub fn render(&self) -> String {
        let mut edits: Vec<(&Range<usize>, String)> = self
            .moves
            .iter()
            .filter_map(|(reference, p)| {
                let site = self.footprints.get(reference)?;
                let at = match &site.rotation {
                    Some(rot) => format!("(at {} {} {rot})", fmt_mm(p.x), fmt_mm(p.y)),
                    None => format!("(at {} {})", fmt_mm(p.x), fmt_mm(p.y)),
                };
                Some((&site.at_span, at))
            })
            .collect();
        edits.sort_by_key(|(span, _)| span.start);

        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0usize;
        for (span, text) in edits {
            out.push_str(&self.source[cursor..span.start]);
            out.push_str(&text);
            cursor = span.end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }

    /// Write the edited document, creating missing parent directories.
    pub fn save(&self, path: &Path) -> Result<(), PcbError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| PcbError::write(path, e))?;
        }
        std::fs::write(path, self.render()).map_err(|e| PcbError::write(path, e))
    }
}

impl Board for KicadBoard {
    fn set_position(&mut self, reference: &str, position: Point) -> Result<(), PcbError> {
        if !self.footprints.contains_key(reference) {
            return Err(PcbError::MissingFootprint {
                reference: reference.to_string(),
            });
        }
        self.moves.insert(reference.to_string(), position);
        Ok(())
    }
}
