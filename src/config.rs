//! Run configuration.
//!
//! A [`TrajectoryConfig`] can be read from a JSON file and adjusted with
//! `with_*` setters; the CLI applies its flags on top of the file values.
//!
//! ```
//! use weight_trajectory::config::TrajectoryConfig;
//! use weight_trajectory::mask::SubsetSize;
//!
//! let config = TrajectoryConfig::new()
//!     .with_variants(["70m"])
//!     .with_subset(SubsetSize::Fraction(0.1))
//!     .with_seed(7);
//! let variants = config.selected_variants().unwrap();
//! assert_eq!(variants[0].id, "70m");
//! ```

use crate::error::{Result, TrajectoryError};
use crate::family::{ModelFamily, Variant};
use crate::frames::{CorrelationScope, FrameOptions};
use crate::mask::SubsetSize;
use crate::store::TrajectoryStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default directory for persisted weight vectors.
pub const DEFAULT_TRAJECTORY_DIR: &str = "trajectories";

/// Default directory for frame output.
pub const DEFAULT_OUTPUT_DIR: &str = "frames";

/// Settings shared by collection and visualization runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrajectoryConfig {
    /// Model family the variant ids refer to.
    pub family: ModelFamily,
    /// Variant ids to process; empty means every variant of the family.
    pub variants: Vec<String>,
    /// Where per-step weight vectors are stored.
    pub trajectory_dir: PathBuf,
    /// Where frame files are written.
    pub output_dir: PathBuf,
    /// Root of downloaded checkpoints, `<source_dir>/<repo>/step<N>/`.
    pub source_dir: Option<PathBuf>,
    pub subset: SubsetSize,
    /// Limit on the number of frames.
    pub num_steps: Option<usize>,
    /// Seed of the subset mask.
    pub seed: u64,
    pub scope: CorrelationScope,
    /// Also write the single-file trajectory after collecting.
    pub aggregate: bool,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            family: ModelFamily::pythia(),
            variants: Vec::new(),
            trajectory_dir: PathBuf::from(DEFAULT_TRAJECTORY_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            source_dir: None,
            subset: SubsetSize::All,
            num_steps: None,
            seed: 0,
            scope: CorrelationScope::Full,
            aggregate: false,
        }
    }
}

impl TrajectoryConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON config. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` on malformed JSON or unknown fields, and
    /// `InvalidInput` if the values are inconsistent.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns `MissingArtifact` if the file does not exist, or any error of
    /// [`TrajectoryConfig::from_json`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TrajectoryError::missing(None, path)
            } else {
                TrajectoryError::Io(e)
            }
        })?;
        Self::from_json(&text)
    }

    /// Pretty JSON form, loadable by [`TrajectoryConfig::from_json`].
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an out-of-range subset, a zero step limit or
    /// an unknown variant id.
    pub fn validate(&self) -> Result<()> {
        match self.subset {
            SubsetSize::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
                return Err(TrajectoryError::invalid_input(format!(
                    "subset fraction must be in (0, 1], got {f}"
                )));
            }
            SubsetSize::Count(0) => {
                return Err(TrajectoryError::invalid_input("subset count must be positive"));
            }
            _ => {}
        }
        if self.num_steps == Some(0) {
            return Err(TrajectoryError::invalid_input("num_steps must be positive"));
        }
        self.selected_variants().map(|_| ())
    }

    #[must_use]
    pub fn with_family(mut self, family: ModelFamily) -> Self {
        self.family = family;
        self
    }

    /// Restrict processing to these variant ids.
    #[must_use]
    pub fn with_variants<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variants = ids.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_trajectory_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.trajectory_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_subset(mut self, subset: SubsetSize) -> Self {
        self.subset = subset;
        self
    }

    #[must_use]
    pub fn with_num_steps(mut self, n: usize) -> Self {
        self.num_steps = Some(n);
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: CorrelationScope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn with_aggregate(mut self, aggregate: bool) -> Self {
        self.aggregate = aggregate;
        self
    }

    /// Variants named in the config, or the whole family if none are.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` on an unknown id.
    pub fn selected_variants(&self) -> Result<Vec<Variant>> {
        self.family.select(&self.variants)
    }

    /// Store rooted at `trajectory_dir`.
    #[must_use]
    pub fn store(&self) -> TrajectoryStore {
        TrajectoryStore::new(&self.trajectory_dir)
    }

    /// Frame options with the family's default palette.
    #[must_use]
    pub fn frame_options(&self) -> FrameOptions {
        FrameOptions {
            subset: self.subset,
            seed: self.seed,
            num_steps: self.num_steps,
            scope: self.scope,
            ..FrameOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{Step, StepSchedule};
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = TrajectoryConfig::default();
        assert!(config.variants.is_empty());
        assert_eq!(config.subset, SubsetSize::All);
        assert_eq!(config.scope, CorrelationScope::Full);
        assert!(!config.aggregate);
        assert_eq!(config.selected_variants().expect("all").len(), 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = TrajectoryConfig::from_json(
            r#"{"variants": ["160m", "14m"], "subset": {"fraction": 0.25}, "seed": 42}"#,
        )
        .expect("parse");
        assert_eq!(config.seed, 42);
        assert_eq!(config.subset, SubsetSize::Fraction(0.25));
        assert_eq!(config.trajectory_dir, PathBuf::from(DEFAULT_TRAJECTORY_DIR));
        let ids: Vec<String> = config
            .selected_variants()
            .expect("known")
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(ids, vec!["160m", "14m"]);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(TrajectoryConfig::from_json(r#"{"variants": ["3m"]}"#).is_err());
        assert!(TrajectoryConfig::from_json(r#"{"subset": {"fraction": 1.5}}"#).is_err());
        assert!(TrajectoryConfig::from_json(r#"{"subset": {"count": 0}}"#).is_err());
        assert!(TrajectoryConfig::from_json(r#"{"num_steps": 0}"#).is_err());
        let err = TrajectoryConfig::from_json(r#"{"colour": "red"}"#).expect_err("unknown field");
        assert!(matches!(err, TrajectoryError::Serialization(_)));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("run.json");
        let family = ModelFamily::pythia().with_schedule(StepSchedule::new(vec![Step(0), Step(1)]));
        let config = TrajectoryConfig::new()
            .with_family(family)
            .with_variants(["70m"])
            .with_trajectory_dir(dir.path().join("traj"))
            .with_source_dir(dir.path().join("hub"))
            .with_num_steps(3)
            .with_scope(CorrelationScope::Masked)
            .with_aggregate(true);
        fs::write(&path, config.to_json().expect("json")).expect("write");

        let loaded = TrajectoryConfig::from_json_file(&path).expect("load");
        assert_eq!(loaded, config);
        assert_eq!(loaded.family.schedule.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = TrajectoryConfig::from_json_file("/nonexistent/run.json").expect_err("missing");
        assert!(err.is_missing_artifact());
    }

    #[test]
    fn test_frame_options_and_store() {
        let config = TrajectoryConfig::new()
            .with_subset(SubsetSize::Count(100))
            .with_seed(9)
            .with_trajectory_dir("/tmp/t");
        let options = config.frame_options();
        assert_eq!(options.subset, SubsetSize::Count(100));
        assert_eq!(options.seed, 9);
        assert_eq!(config.store().root(), Path::new("/tmp/t"));
    }
}
