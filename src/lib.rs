//! braille_reader - six-dot Braille decoding from noisy dot detections
//!
//! Turns a frame's candidate dot centers (and, when available, a binary
//! raster of the page) into text: points are grouped into rows and cells,
//! each cell's dot pattern is estimated several ways and settled by a
//! weighted vote, shift codes are applied, and the resulting line is
//! stabilized across frames against known phrases.

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

mod debug;

/// Cell decoding (estimators, voting, symbol table, text assembly)
pub mod decoder;
/// Dot grouping (row and cell clustering, connected components)
pub mod detector;
/// Crate-level errors
pub mod error;
/// Core data structures (Point, BitMatrix, CellMask, CellBBox)
pub mod models;
/// Per-frame decode pipeline and traces
pub mod pipeline;
/// Output sinks for emitted lines
pub mod sink;
/// Cross-frame stabilization
pub mod stabilizer;
/// Synthetic frames for tests and benchmarks
pub mod synth;
/// Frame files, rasters and dataset helpers for the CLI and benches
pub mod tools;
/// Raster helpers (morphology)
pub mod utils;

pub use decoder::config::DecoderConfig;
pub use error::{BrailleError, Result};
pub use models::{BitMatrix, CellMask, Point};
pub use pipeline::{Decoder, FrameReport, decode_frame};
pub use sink::{FileSink, MemorySink, NullSink, TextSink};
pub use stabilizer::SequenceStabilizer;

/// One camera frame as delivered by the imaging front end
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Candidate dot centers
    pub points: Vec<Point>,
    /// Binary raster in the same pixel space, `true` = dot
    pub raster: Option<BitMatrix>,
    /// Known phrases; replaces the reader's phrases when non-empty
    pub targets: Vec<String>,
}

impl Frame {
    /// Frame with points only
    pub fn from_points(points: Vec<Point>) -> Self {
        Self {
            points,
            ..Self::default()
        }
    }
}

/// Decode a set of dot centers with default settings
pub fn decode(points: &[Point]) -> String {
    decode_frame(points, None, &Decoder::default()).line
}

/// Frame-at-a-time reader: decodes, stabilizes and forwards changes to a sink
pub struct BrailleReader<S: TextSink> {
    decoder: Decoder,
    stabilizer: SequenceStabilizer,
    sink: S,
}

impl<S: TextSink> BrailleReader<S> {
    /// Create a reader with the standard table and estimators
    pub fn new(config: DecoderConfig, sink: S) -> Self {
        let stabilizer = SequenceStabilizer::new(&config.stabilizer);
        Self {
            decoder: Decoder::new(config),
            stabilizer,
            sink,
        }
    }

    /// Create a reader around a prepared decoder
    pub fn with_decoder(decoder: Decoder, sink: S) -> Self {
        let stabilizer = SequenceStabilizer::new(&decoder.config.stabilizer);
        Self {
            decoder,
            stabilizer,
            sink,
        }
    }

    /// Set the phrases lines are corrected towards
    pub fn set_targets<I, T>(&mut self, targets: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.stabilizer.set_targets(targets);
    }

    /// Decoder in use
    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Decode without touching cross-frame state
    pub fn decode(&self, frame: &Frame) -> FrameReport {
        decode_frame(&frame.points, frame.raster.as_ref(), &self.decoder)
    }

    /// Process one frame. Returns the emitted text when it changed.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<Option<String>> {
        if !frame.targets.is_empty() {
            self.stabilizer.set_targets(&frame.targets);
        }
        let report = self.decode(frame);
        self.accept_line(&report.line)
    }

    /// Stabilize an already decoded line and forward it to the sink on change
    pub fn accept_line(&mut self, line: &str) -> Result<Option<String>> {
        let Some(text) = self.stabilizer.push(line) else {
            return Ok(None);
        };
        self.sink.append(&text)?;
        Ok(Some(text))
    }

    /// Last emitted text
    pub fn last_emitted(&self) -> Option<&str> {
        self.stabilizer.last_emitted()
    }

    /// The sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the reader, returning the sink
    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::SynthLayout;

    #[test]
    fn test_decode_empty() {
        assert_eq!(decode(&[]), "");
    }

    #[test]
    fn test_reader_emits_on_change_only() {
        let mut reader = BrailleReader::new(DecoderConfig::default(), MemorySink::default());
        let layout = SynthLayout::default();
        let table = &reader.decoder().table;
        let hello = layout.frame(table, &["hello"]);
        let world = layout.frame(table, &["world"]);
        let hello = Frame::from_points(hello.points);
        let world = Frame::from_points(world.points);

        assert_eq!(reader.process_frame(&hello).unwrap().as_deref(), Some("hello"));
        assert_eq!(reader.process_frame(&hello).unwrap(), None);
        assert_eq!(reader.process_frame(&world).unwrap().as_deref(), Some("world"));
        assert_eq!(reader.process_frame(&Frame::default()).unwrap(), None);
        assert_eq!(reader.last_emitted(), Some("world"));
        assert_eq!(reader.into_sink().lines, ["hello", "world"]);
    }

    #[test]
    fn test_frame_targets_correct_the_line() {
        let mut reader = BrailleReader::new(DecoderConfig::default(), MemorySink::default());
        let synth = SynthLayout::default().frame(&reader.decoder().table, &["Pantorc 40 mg compresse"]);
        let frame = Frame {
            points: synth.points,
            raster: Some(synth.raster),
            targets: vec!["PANTORC #40 MG COMPRESSE".to_string()],
        };
        assert_eq!(
            reader.process_frame(&frame).unwrap().as_deref(),
            Some("PANTORC #40 MG COMPRESSE")
        );
        assert_eq!(reader.sink().lines.len(), 1);
    }
}
