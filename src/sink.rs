//! Consumers of [`Frame`]s.
//!
//! The library stops at frame data; drawing is left to whatever reads the
//! sink's output.

use crate::error::Result;
use crate::frames::Frame;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Suffix of frame files written by [`JsonLinesSink`].
pub const FRAMES_SUFFIX: &str = ".frames.jsonl";

/// Receives frames in order.
pub trait FrameSink {
    /// Accept the next frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be recorded.
    fn push(&mut self, frame: &Frame) -> Result<()>;

    /// Flush everything and return where the output went.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    fn finish(self) -> Result<PathBuf>
    where
        Self: Sized;
}

/// Writes one JSON object per frame to `<output_dir>/<repo_name>.frames.jsonl`.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    writer: BufWriter<File>,
    frames: usize,
}

impl JsonLinesSink {
    /// Create (or truncate) the frame file for `repo_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the output directory or file cannot be created.
    pub fn create(output_dir: &Path, repo_name: &str) -> Result<Self> {
        let path = Self::path_for(output_dir, repo_name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(&path)?);
        Ok(Self {
            path,
            writer,
            frames: 0,
        })
    }

    /// Where the frames of `repo_name` are written.
    #[must_use]
    pub fn path_for(output_dir: &Path, repo_name: &str) -> PathBuf {
        output_dir.join(format!("{repo_name}{FRAMES_SUFFIX}"))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames written so far.
    #[must_use]
    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl FrameSink for JsonLinesSink {
    fn push(&mut self, frame: &Frame) -> Result<()> {
        serde_json::to_writer(&mut self.writer, frame)?;
        self.writer.write_all(b"\n")?;
        self.frames += 1;
        Ok(())
    }

    fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush()?;
        tracing::info!(path = %self.path.display(), frames = self.frames, "frames written");
        Ok(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::Step;
    use crate::stats::{Correlation, ScatterSeries};
    use std::io::{BufRead, BufReader};
    use tempfile::tempdir;

    fn frame(step: u64, r: f64) -> Frame {
        Frame {
            step: Step(step),
            correlation: Correlation::Defined(r),
            layers: vec![ScatterSeries {
                layer: "gpt_neox.embed_in.weight".to_string(),
                color: "slateblue".to_string(),
                x: vec![0.5, 1.0],
                y: vec![0.25, 2.0],
            }],
        }
    }

    #[test]
    fn test_json_lines_one_frame_per_line() {
        let dir = tempdir().expect("tempdir");
        let mut sink = JsonLinesSink::create(dir.path(), "EleutherAI/pythia-70m-deduped")
            .expect("create");
        sink.push(&frame(0, 0.1)).expect("push");
        sink.push(&frame(1000, 1.0)).expect("push");
        assert_eq!(sink.frames(), 2);
        let path = sink.finish().expect("finish");
        assert_eq!(
            path,
            dir.path()
                .join("EleutherAI")
                .join("pythia-70m-deduped.frames.jsonl")
        );

        let lines: Vec<String> = BufReader::new(File::open(&path).expect("open"))
            .lines()
            .collect::<std::io::Result<_>>()
            .expect("read");
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(&lines[0]).expect("json");
        assert_eq!(first["step"], 0);
        assert_eq!(first["correlation"]["degenerate"], false);
        assert_eq!(first["layers"][0]["color"], "slateblue");
        assert_eq!(first["layers"][0]["x"][1], 1.0);
    }

    #[test]
    fn test_degenerate_frame_serializes_null() {
        let dir = tempdir().expect("tempdir");
        let mut sink = JsonLinesSink::create(dir.path(), "toy").expect("create");
        let mut f = frame(0, 0.0);
        f.correlation = Correlation::Degenerate {
            left_constant: true,
            right_constant: false,
        };
        sink.push(&f).expect("push");
        let path = sink.finish().expect("finish");
        let text = fs::read_to_string(path).expect("read");
        let value: serde_json::Value = serde_json::from_str(text.trim()).expect("json");
        assert!(value["correlation"]["value"].is_null());
        assert_eq!(value["correlation"]["degenerate"], true);
    }
}
