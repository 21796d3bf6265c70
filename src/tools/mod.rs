#![allow(clippy::items_after_test_module)]

use crate::error::Result;
use crate::models::{BitMatrix, PixelRect, Point};
use crate::pipeline::{Decoder, FrameReport, decode_frame};
use crate::{BrailleReader, Frame, TextSink};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Luma at or above this is lit
pub const LIT_THRESHOLD: u8 = 128;

/// On-disk frame description
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameFile {
    /// Dot centers as `[x, y]`
    pub points: Vec<[f32; 2]>,
    /// Raster image, relative to the frame file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raster: Option<PathBuf>,
    /// Raster stores dots dark on light
    #[serde(default)]
    pub invert: bool,
    /// Known phrases
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
}

/// Load an image as a binary raster: luma >= 128 is lit, flipped by `invert`.
pub fn load_binary_raster<P: AsRef<Path>>(path: P, invert: bool) -> Result<BitMatrix> {
    let luma = image::open(path)?.to_luma8();
    let (width, height) = luma.dimensions();
    Ok(BitMatrix::from_luma(
        luma.as_raw(),
        width as usize,
        height as usize,
        LIT_THRESHOLD,
        invert,
    ))
}

/// Write a binary raster as an 8-bit PNG, lit pixels white
pub fn save_raster<P: AsRef<Path>>(path: P, raster: &BitMatrix) -> Result<()> {
    let img = image::GrayImage::from_fn(raster.width() as u32, raster.height() as u32, |x, y| {
        image::Luma([if raster.get(x as usize, y as usize) { 255 } else { 0 }])
    });
    img.save(path)?;
    Ok(())
}

/// Read a frame file, loading its raster if it names one
pub fn load_frame<P: AsRef<Path>>(path: P) -> Result<Frame> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let file: FrameFile = serde_json::from_str(&text)?;
    let raster = match &file.raster {
        Some(rel) => {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            Some(load_binary_raster(base.join(rel), file.invert)?)
        }
        None => None,
    };
    Ok(Frame {
        points: file.points.iter().copied().map(Point::from).collect(),
        raster,
        targets: file.targets,
    })
}

/// Write a frame file; the raster, if any, goes next to it as PNG
pub fn write_frame<P: AsRef<Path>>(path: P, frame: &Frame) -> Result<()> {
    let path = path.as_ref();
    let raster = match &frame.raster {
        Some(raster) => {
            let png = path.with_extension("png");
            save_raster(&png, raster)?;
            png.file_name().map(PathBuf::from)
        }
        None => None,
    };
    let file = FrameFile {
        points: frame.points.iter().map(|p| [p.x, p.y]).collect(),
        raster,
        invert: false,
        targets: frame.targets.clone(),
    };
    fs::write(path, serde_json::to_string_pretty(&file)?)?;
    Ok(())
}

/// Summary statistics for a binary raster.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RasterStats {
    /// Count of lit pixels.
    pub lit_pixels: usize,
    /// Total pixels in the raster.
    pub total_pixels: usize,
    /// Ratio of lit pixels to total pixels.
    pub lit_ratio: f64,
}

/// Compute lit pixel stats for a binary raster.
pub fn raster_stats(raster: &BitMatrix) -> RasterStats {
    let full = PixelRect {
        x0: 0,
        y0: 0,
        x1: raster.width(),
        y1: raster.height(),
    };
    let lit = raster.count_lit(full);
    let total = full.area();
    let ratio = if total == 0 {
        0.0
    } else {
        lit as f64 / total as f64
    };
    RasterStats {
        lit_pixels: lit,
        total_pixels: total,
        lit_ratio: ratio,
    }
}

/// Default dataset root from environment variables.
pub fn dataset_root_from_env() -> PathBuf {
    env::var("BRAILLE_DATASET_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("frames"))
}

/// Default frame limit from environment variables.
///
/// Returns `None` (full dataset) when `BRAILLE_LIMIT` is unset or set to `0`.
pub fn limit_from_env() -> Option<usize> {
    match env::var("BRAILLE_LIMIT") {
        Ok(value) => value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|v| if v == 0 { None } else { Some(v) }),
        Err(_) => None,
    }
}

/// Decode frame files in parallel. Results keep the input order.
pub fn decode_dataset(paths: &[PathBuf], decoder: &Decoder) -> Vec<Result<FrameReport>> {
    paths
        .par_iter()
        .map(|path| {
            let frame = load_frame(path)?;
            Ok(decode_frame(&frame.points, frame.raster.as_ref(), decoder))
        })
        .collect()
}

/// One frame of a replay
#[derive(Debug, Clone, Serialize)]
pub struct ReplayStep {
    /// Frame file
    pub path: PathBuf,
    /// Decoded line, or the load error
    pub line: std::result::Result<String, String>,
    /// Text emitted for this frame
    pub emitted: Option<String>,
}

/// Decode frames in parallel, then stabilize them in order through `reader`.
///
/// Frames that fail to load are reported and skipped.
pub fn replay<S: TextSink>(paths: &[PathBuf], reader: &mut BrailleReader<S>) -> Result<Vec<ReplayStep>> {
    let reports = decode_dataset(paths, reader.decoder());
    let mut steps = Vec::with_capacity(paths.len());
    for (path, report) in paths.iter().zip(reports) {
        let step = match report {
            Ok(report) => {
                let emitted = reader.accept_line(&report.line)?;
                ReplayStep {
                    path: path.clone(),
                    line: Ok(report.line),
                    emitted,
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping frame");
                ReplayStep {
                    path: path.clone(),
                    line: Err(e.to_string()),
                    emitted: None,
                }
            }
        };
        steps.push(step);
    }
    Ok(steps)
}


/// Smoke test flag from environment variables.
pub fn smoke_from_env() -> bool {
    matches!(
        env::var("BRAILLE_SMOKE").as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE") | Ok("yes") | Ok("YES")
    )
}

/// Iterate frame files (`*.json`) under `root` with optional smoke list and limit.
pub fn dataset_iter<P: AsRef<Path>>(
    root: P,
    limit: Option<usize>,
    smoke: bool,
) -> impl Iterator<Item = PathBuf> {
    let root = root.as_ref();
    let mut frames = if smoke {
        load_smoke_list(root).unwrap_or_else(|| collect_frames(root))
    } else {
        collect_frames(root)
    };

    frames.sort();
    if let Some(limit) = limit {
        frames.truncate(limit);
    }
    frames.into_iter()
}

fn load_smoke_list(root: &Path) -> Option<Vec<PathBuf>> {
    let smoke_path = root.join("_smoke.txt");
    let contents = fs::read_to_string(&smoke_path).ok()?;
    let mut paths = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let candidate = Path::new(line);
        let path = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            root.join(candidate)
        };
        if path.exists() {
            paths.push(path);
        }
    }
    if paths.is_empty() { None } else { Some(paths) }
}

fn collect_frames(root: &Path) -> Vec<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut frames = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            let is_frame = path
                .extension()
                .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("json"));
            if is_frame {
                frames.push(path);
            }
        }
    }

    frames
}
