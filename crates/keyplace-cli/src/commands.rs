use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use keyplace_export::svg::svg_from_keys;
use keyplace_parser::{Layout, decode_str};
use keyplace_pcb::{KicadBoard, SortMode, place_keys};
use tracing::info;

use crate::config::Settings;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Layout JSON downloaded from keyboard-layout-editor
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Where to write the decoded keys (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Layout JSON downloaded from keyboard-layout-editor
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// SVG file to write
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Pixels per layout unit
    #[arg(long, value_name = "PX")]
    pub unit_size: Option<f64>,

    /// Draw the primary legend of every key
    #[arg(long)]
    pub labels: bool,

    /// Draw each key's center coordinates
    #[arg(long)]
    pub metadata: bool,

    /// Omit the dot marking each key center
    #[arg(long)]
    pub no_center_marker: bool,

    /// Rotate keys by their layout angle
    #[arg(long)]
    pub rotate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Position,
    BottomRowLast,
}

#[derive(Debug, Args)]
pub struct PlaceArgs {
    /// Layout JSON downloaded from keyboard-layout-editor
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// KiCad board whose footprints are moved
    #[arg(long, value_name = "FILE")]
    pub board: PathBuf,

    /// Where to write the edited board (defaults to overwriting --board)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write the placement plan as JSON
    #[arg(long, value_name = "FILE")]
    pub plan: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub sort: Option<SortArg>,

    /// Keys with a center y above this go last (implies --sort bottom-row-last)
    #[arg(long, value_name = "Y")]
    pub bottom_row_threshold: Option<f64>,

    /// Millimetres per layout unit
    #[arg(long, value_name = "MM")]
    pub pitch: Option<f64>,

    /// Pause between footprint moves
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Reference designator prefix
    #[arg(long)]
    pub prefix: Option<String>,

    #[arg(long)]
    pub pages: Option<u32>,

    #[arg(long)]
    pub per_page: Option<u32>,
}

fn load_layout(input: &Path) -> Result<Layout, CliError> {
    let raw = std::fs::read_to_string(input).map_err(|e| CliError::read(input, &e))?;
    let layout = decode_str(&raw)?;
    info!(
        name = layout.name.as_deref().unwrap_or(""),
        keys = layout.keys.len(),
        "loaded layout"
    );
    Ok(layout)
}

fn report_layout(layout: &Layout) {
    let fields: Vec<&str> = layout.fields_seen.iter().map(String::as_str).collect();
    println!("Found the following fields: {}", fields.join(", "));
    println!("Found {} keys.", layout.keys.len());
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| CliError::write(path, &e))?;
    }
    std::fs::write(path, contents).map_err(|e| CliError::write(path, &e))
}

pub fn run_decode(args: DecodeArgs) -> Result<(), CliError> {
    let layout = load_layout(&args.input)?;
    let json = serde_json::to_string_pretty(&layout.keys)?;

    match args.output {
        Some(output) => {
            report_layout(&layout);
            write_file(&output, &json)?;
            println!("Wrote {}.", output.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub fn run_render(args: RenderArgs, settings: &Settings) -> Result<(), CliError> {
    let mut opts = settings.render;
    if let Some(unit_size) = args.unit_size {
        opts.unit_size = unit_size;
    }
    opts.draw_labels |= args.labels;
    opts.draw_metadata |= args.metadata;
    opts.rotate_keys |= args.rotate;
    if args.no_center_marker {
        opts.draw_center_marker = false;
    }

    println!("Decoding layout...");
    let layout = load_layout(&args.input)?;
    report_layout(&layout);

    println!("Rendering diagram...");
    let svg = svg_from_keys(&layout.keys, &opts)?;
    write_file(&args.output, &svg)?;

    println!("Done.");
    Ok(())
}

fn resolve_sort(args: &PlaceArgs, configured: SortMode) -> Result<SortMode, CliError> {
    let configured_threshold = match configured {
        SortMode::BottomRowLast { threshold } => Some(threshold),
        SortMode::Position => None,
    };
    match (args.sort, args.bottom_row_threshold) {
        (Some(SortArg::Position), Some(_)) => Err(CliError::usage(
            "--bottom-row-threshold cannot be combined with --sort position",
        )),
        (Some(SortArg::Position), None) => Ok(SortMode::Position),
        (Some(SortArg::BottomRowLast) | None, Some(threshold)) => {
            Ok(SortMode::BottomRowLast { threshold })
        }
        (Some(SortArg::BottomRowLast), None) => configured_threshold
            .map(|threshold| SortMode::BottomRowLast { threshold })
            .ok_or_else(|| {
                CliError::usage("--sort bottom-row-last requires --bottom-row-threshold")
            }),
        (None, None) => Ok(configured),
    }
}

pub async fn run_place(args: PlaceArgs, settings: &Settings) -> Result<(), CliError> {
    let mut opts = settings.placement.to_options();
    opts.sort = resolve_sort(&args, opts.sort)?;
    if let Some(pitch) = args.pitch {
        opts.pitch_mm = pitch;
    }
    if let Some(ms) = args.delay_ms {
        opts.delay = std::time::Duration::from_millis(ms);
    }
    if let Some(prefix) = &args.prefix {
        opts.references.prefix = prefix.clone();
    }
    if let Some(pages) = args.pages {
        opts.references.pages = pages;
    }
    if let Some(per_page) = args.per_page {
        opts.references.per_page = per_page;
    }

    println!("Decoding layout...");
    let layout = load_layout(&args.input)?;
    report_layout(&layout);

    println!("Loading board...");
    let mut board = KicadBoard::open(&args.board)?;

    let placements = place_keys(&mut board, &layout.keys, &opts).await?;
    for p in &placements {
        println!(
            "Placed {} ({}) at ({:.3}, {:.3})",
            p.reference, p.label, p.position.x, p.position.y
        );
    }

    let output = args.output.as_deref().unwrap_or(&args.board);
    board.save(output)?;

    if let Some(plan) = &args.plan {
        let json = serde_json::to_string_pretty(&placements)?;
        write_file(plan, &json)?;
    }

    println!("Done.");
    Ok(())
}
