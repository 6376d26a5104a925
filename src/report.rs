//! Artifacts written from a finished [`SweepReport`].
//!
//! Nothing here runs a model; every function consumes the report's plain data.
use crate::error::{PgdError, Result};
use crate::sweep::{AdversarialExample, SweepReport};
use crate::tensorshape::TensorShape;
use crate::PgdFloat;
use itertools::Itertools;
use log::debug;
use ndarray::s;
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const BAR_WIDTH: usize = 40;
/// Black columns between tiled examples
const TILE_GAP: usize = 2;

/// Shortest round-trip form with at least two exponent digits, `1e-05` rather than `1e-5`
fn float_repr(x: PgdFloat) -> String {
    let repr = format!("{:?}", x);
    match repr.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => repr,
    }
}

/// The records log entry: `"\nPGD:\n[acc0, acc1, ...]\n"`
pub fn format_records_entry(accuracies: &[PgdFloat]) -> String {
    format!(
        "\nPGD:\n[{}]\n",
        accuracies.iter().map(|&a| float_repr(a)).join(", ")
    )
}

/// Appends this sweep's accuracies to the records log, creating it if needed
///
/// # Errors
/// If the file cannot be opened or written
pub fn append_records<P: AsRef<Path>>(path: P, report: &SweepReport) -> Result<()> {
    let path = path.as_ref();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| PgdError::io(path, e))?;
    file.write_all(format_records_entry(&report.accuracies()).as_bytes())
        .map_err(|e| PgdError::io(path, e))?;
    debug!("Appended records to {}", path.display());
    Ok(())
}

/// Writes the whole report as pretty JSON
///
/// # Errors
/// If the file cannot be created or serialization fails
pub fn write_summary<P: AsRef<Path>>(path: P, report: &SweepReport) -> Result<()> {
    let path = path.as_ref();
    let file = fs::File::create(path).map_err(|e| PgdError::io(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .map_err(|e| PgdError::json(path, e))
}

/// Binary greyscale (`P5`) PGM of a `width` x `height` image with values in `[0, 1]`
pub fn encode_pgm(width: usize, height: usize, pixels: &[PgdFloat]) -> Vec<u8> {
    debug_assert_eq!(pixels.len(), width * height);
    let mut bytes = format!("P5\n{} {}\n255\n", width, height).into_bytes();
    bytes.extend(
        pixels
            .iter()
            .map(|&p| (num::clamp(p, 0., 1.) * 255.).round() as u8),
    );
    bytes
}

/// Lays the examples out left to right, averaging channels into grey.
///
/// Returns the grid's width, height and row-major pixels.
///
/// # Errors
/// If `shape` is not an image shape or an example has the wrong length
pub fn tile_examples(
    shape: &TensorShape,
    examples: &[AdversarialExample],
) -> Result<(usize, usize, Vec<PgdFloat>)> {
    let (height, width, channels) = shape.as_hwc().ok_or_else(|| {
        PgdError::invalid("image_shape", shape, "must be (height, width[, channels])")
    })?;
    let count = examples.len();
    let grid_width = (count * width + count.saturating_sub(1) * TILE_GAP).max(1);
    let mut grid = vec![0.; grid_width * height];
    for (tile, example) in examples.iter().enumerate() {
        if example.image.len() != shape.dims() {
            return Err(PgdError::ShapeMismatch {
                context: "example image",
                expected: shape.dims(),
                actual: example.image.len(),
            });
        }
        let left = tile * (width + TILE_GAP);
        for (row, col) in (0..height).cartesian_product(0..width) {
            let start = (row * width + col) * channels;
            let grey = example.image.slice(s![start..start + channels]).sum() / channels as PgdFloat;
            grid[row * grid_width + left + col] = grey;
        }
    }
    Ok((grid_width, height, grid))
}

/// One PGM per epsilon in `dir`, named `pgd_eps_{index}_{epsilon}.pgm`
///
/// # Errors
/// If the directory or any image cannot be written
pub fn write_example_grids<P: AsRef<Path>>(dir: P, report: &SweepReport) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| PgdError::io(dir, e))?;
    report
        .results
        .iter()
        .enumerate()
        .map(|(idx, result)| {
            let (width, height, pixels) = tile_examples(&report.image_shape, &result.examples)?;
            let path = dir.join(format!("pgd_eps_{}_{}.pgm", idx, result.epsilon));
            fs::write(&path, encode_pgm(width, height, &pixels))
                .map_err(|e| PgdError::io(&path, e))?;
            debug!(
                "Wrote {} examples for epsilon {} to {}",
                result.examples.len(),
                result.epsilon,
                path.display()
            );
            Ok(path)
        })
        .collect()
}

/// Accuracy against epsilon as a text chart, one row per budget.
///
/// Each row also lists the kept examples as `original -> adversarial`.
pub fn accuracy_table(report: &SweepReport) -> String {
    let mut out = String::from("Accuracy vs Epsilon\n");
    let _ = writeln!(out, "{:>8}  {:>8}  {:<w$}  examples", "epsilon", "accuracy", "", w = BAR_WIDTH);
    for result in &report.results {
        let filled = (num::clamp(result.accuracy, 0., 1.) * BAR_WIDTH as PgdFloat).round() as usize;
        let _ = writeln!(
            out,
            "{:>8.4}  {:>8.4}  {:<w$}  {}",
            result.epsilon,
            result.accuracy,
            "#".repeat(filled),
            result
                .examples
                .iter()
                .map(|e| format!("{}->{}", e.original_label, e.adversarial_label))
                .join(" "),
            w = BAR_WIDTH
        );
    }
    out
}
