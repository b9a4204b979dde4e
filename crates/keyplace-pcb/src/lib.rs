//! Footprint placement: pushes decoded key positions onto a board, one reference at a time.

pub mod kicad;
mod order;
mod refs;

use std::path::Path;
use std::time::Duration;

use keyplace_core::{DecodedKey, Point};
use serde::Serialize;
use tracing::{debug, info};

pub use kicad::KicadBoard;
pub use order::{SortMode, order_keys};
pub use refs::ReferenceScheme;

/// KiCad default key pitch in millimetres (one layout unit).
pub const DEFAULT_PITCH_MM: f64 = 19.05;

#[derive(Debug, thiserror::Error)]
pub enum PcbError {
    #[error("no footprint with reference \"{reference}\" on the board")]
    MissingFootprint { reference: String },
    #[error("layout has {keys} keys but only {references} reference names are available")]
    NotEnoughReferences { keys: usize, references: usize },
    #[error("failed to parse board at byte {offset}: {message}")]
    Parse { offset: usize, message: String },
    #[error("could not read board {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not write board {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl PcbError {
    pub(crate) fn read(path: &Path, source: std::io::Error) -> Self {
        Self::Read {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn write(path: &Path, source: std::io::Error) -> Self {
        Self::Write {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Host document that footprints are moved in.
pub trait Board {
    /// Move the footprint named `reference` to `position` (millimetres).
    ///
    /// Must fail with [`PcbError::MissingFootprint`] when the reference does not resolve.
    fn set_position(&mut self, reference: &str, position: Point) -> Result<(), PcbError>;

    /// Called after every move so interactive hosts can redraw.
    fn refresh(&mut self) -> Result<(), PcbError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PlacementOptions {
    pub sort: SortMode,
    pub references: ReferenceScheme,
    /// Millimetres per layout unit.
    pub pitch_mm: f64,
    /// Board position of layout point (0, 0).
    pub origin_mm: Point,
    /// Pause between consecutive moves.
    pub delay: Duration,
}

impl Default for PlacementOptions {
    fn default() -> Self {
        Self {
            sort: SortMode::default(),
            references: ReferenceScheme::default(),
            pitch_mm: DEFAULT_PITCH_MM,
            origin_mm: Point::default(),
            delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub reference: String,
    pub label: String,
    pub position: Point,
}

/// Sort `keys`, pair them with reference names and move each footprint in turn.
///
/// The reference count is checked before the first move. A reference that does not resolve on
/// the board stops placement with the error from [`Board::set_position`].
pub async fn place_keys<B: Board + ?Sized>(
    board: &mut B,
    keys: &[DecodedKey],
    opts: &PlacementOptions,
) -> Result<Vec<Placement>, PcbError> {
    let ordered = order_keys(keys, opts.sort);
    let references = opts.references.names();
    if ordered.len() > references.len() {
        return Err(PcbError::NotEnoughReferences {
            keys: ordered.len(),
            references: references.len(),
        });
    }
    debug!(keys = ordered.len(), sort = ?opts.sort, "placing keys");

    let mut placements = Vec::with_capacity(ordered.len());
    for (i, (key, reference)) in ordered.iter().zip(references).enumerate() {
        if i > 0 && !opts.delay.is_zero() {
            tokio::time::sleep(opts.delay).await;
        }
        let position = key.center().scaled(opts.pitch_mm, opts.origin_mm);
        info!(
            reference = %reference,
            label = %key.primary_label,
            x = position.x,
            y = position.y,
            "placing footprint"
        );
        board.set_position(&reference, position)?;
        board.refresh()?;
        placements.push(Placement {
            reference,
            label: key.primary_label.clone(),
            position,
        });
    }

    Ok(placements)
}
