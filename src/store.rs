//! Persisted checkpoint vectors.
//!
//! Layout on disk:
//!
//! ```text
//! <root>/<org>/<family>-<variant>[-deduped]/<step>.safetensors      one file per step
//! <root>/<org>/<family>-<variant>[-deduped].trajectory.safetensors  aggregate (optional)
//! ```
//!
//! A per-step file holds one 1-D F32 tensor `weights` and, in `__metadata__`,
//! the `layer_sizes` table that gives those weights meaning. The two are always
//! written and read together.

use crate::checkpoint::{sort_checkpoint_files, Step};
use crate::error::{Result, TrajectoryError};
use crate::layout::LayerSizeTable;
use crate::serialization::{
    save_safetensors, MappedSafeTensors, TensorMetadata, TensorView, UserMetadata,
};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Extension of persisted checkpoint files.
pub const EXTENSION: &str = "safetensors";

/// Suffix of aggregate trajectory files.
pub const AGGREGATE_SUFFIX: &str = ".trajectory.safetensors";

/// Version written to `format_version`.
pub const FORMAT_VERSION: &str = "1";

const WEIGHTS_TENSOR: &str = "weights";
const KEY_LAYER_SIZES: &str = "layer_sizes";
const KEY_STEP: &str = "step";
const KEY_VARIANT: &str = "variant";
const KEY_FORMAT_VERSION: &str = "format_version";

/// One vectorized checkpoint: the weight vector and the table describing it.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointRecord {
    pub step: Step,
    pub weights: Vec<f32>,
    pub table: LayerSizeTable,
}

impl CheckpointRecord {
    /// # Errors
    ///
    /// Returns `InvalidInput` if the table does not describe `weights`.
    pub fn new(step: Step, weights: Vec<f32>, table: LayerSizeTable) -> Result<Self> {
        if weights.len() != table.total_len() {
            return Err(TrajectoryError::invalid_input(format!(
                "step {step}: {} weights but layer table describes {}",
                weights.len(),
                table.total_len()
            )));
        }
        Ok(Self {
            step,
            weights,
            table,
        })
    }
}

fn table_from_metadata(meta: &UserMetadata, key: &str, path: &Path) -> Result<LayerSizeTable> {
    let raw = meta.get(key).ok_or_else(|| {
        TrajectoryError::format(format!("{}: missing '{key}' metadata", path.display()))
    })?;
    let pairs: Vec<(String, i64)> = serde_json::from_str(raw)?;
    LayerSizeTable::from_raw(pairs)
}

/// Write one record to `path`, atomically replacing any existing file.
///
/// # Errors
///
/// Returns an error if serialization or any file operation fails.
pub fn write_record(path: &Path, record: &CheckpointRecord, variant: &str) -> Result<()> {
    let shape = [record.weights.len()];
    let mut tensors = BTreeMap::new();
    tensors.insert(
        WEIGHTS_TENSOR.to_string(),
        TensorView {
            shape: &shape,
            data: &record.weights,
        },
    );

    let mut meta = UserMetadata::new();
    meta.insert(
        KEY_LAYER_SIZES.to_string(),
        serde_json::to_string(&record.table)?,
    );
    meta.insert(KEY_STEP.to_string(), record.step.to_string());
    meta.insert(KEY_VARIANT.to_string(), variant.to_string());
    meta.insert(KEY_FORMAT_VERSION.to_string(), FORMAT_VERSION.to_string());

    atomic_write(path, |tmp| save_safetensors(tmp, &tensors, &meta))
}

/// Read a record written by [`write_record`].
///
/// # Errors
///
/// - `MissingArtifact` if `path` does not exist
/// - `FormatError` if the container lacks the weights or the layer table
/// - `InvalidInput` if the table is inconsistent (negative counts, wrong total)
pub fn read_record(path: &Path) -> Result<CheckpointRecord> {
    let file = MappedSafeTensors::open(path).map_err(|e| match e {
        TrajectoryError::MissingArtifact { .. } => {
            TrajectoryError::missing(Step::from_path(path).map(Step::get), path)
        }
        other => other,
    })?;
    let meta = file.user_metadata();
    let table = table_from_metadata(meta, KEY_LAYER_SIZES, path)?;
    let step = match meta.get(KEY_STEP) {
        Some(raw) => raw.parse()?,
        None => Step::from_path(path).ok_or_else(|| {
            TrajectoryError::format(format!("{}: cannot determine step", path.display()))
        })?,
    };
    let weights = file.get_tensor(WEIGHTS_TENSOR)?;
    CheckpointRecord::new(step, weights, table)
}

fn atomic_write<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| TrajectoryError::invalid_input(format!("bad output path {}", path.display())))?;
    let tmp = path.with_file_name(format!(".tmp-{file_name}"));
    if let Err(e) = write(&tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Directory tree of persisted trajectories.
#[derive(Debug, Clone)]
pub struct TrajectoryStore {
    root: PathBuf,
}

impl TrajectoryStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the per-step files of `repo_name`.
    #[must_use]
    pub fn variant_dir(&self, repo_name: &str) -> PathBuf {
        self.root.join(repo_name)
    }

    /// Path of one step's file.
    #[must_use]
    pub fn step_path(&self, repo_name: &str, step: Step) -> PathBuf {
        self.variant_dir(repo_name).join(step.file_name(EXTENSION))
    }

    /// Path of the aggregate trajectory file.
    #[must_use]
    pub fn aggregate_path(&self, repo_name: &str) -> PathBuf {
        self.root.join(format!("{repo_name}{AGGREGATE_SUFFIX}"))
    }

    #[must_use]
    pub fn contains(&self, repo_name: &str, step: Step) -> bool {
        self.step_path(repo_name, step).is_file()
    }

    /// Persist one record, creating the variant directory as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the write fails.
    pub fn save(&self, repo_name: &str, record: &CheckpointRecord) -> Result<PathBuf> {
        fs::create_dir_all(self.variant_dir(repo_name))?;
        let path = self.step_path(repo_name, record.step);
        write_record(&path, record, repo_name)?;
        Ok(path)
    }

    /// Load one step.
    ///
    /// # Errors
    ///
    /// Returns `MissingArtifact` if the step was never saved.
    pub fn load(&self, repo_name: &str, step: Step) -> Result<CheckpointRecord> {
        let path = self.step_path(repo_name, step);
        if !path.is_file() {
            return Err(TrajectoryError::missing(Some(step.get()), path));
        }
        read_record(&path)
    }

    /// Persisted steps of `repo_name`, ordered numerically.
    ///
    /// # Errors
    ///
    /// Returns `MissingArtifact` if the variant directory does not exist.
    pub fn list(&self, repo_name: &str) -> Result<Vec<(Step, PathBuf)>> {
        let dir = self.variant_dir(repo_name);
        if !dir.is_dir() {
            return Err(TrajectoryError::missing(None, dir));
        }
        let mut paths = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let is_checkpoint = path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(EXTENSION);
            if is_checkpoint {
                paths.push(path);
            }
        }
        Ok(sort_checkpoint_files(paths))
    }

    /// Highest persisted step.
    ///
    /// # Errors
    ///
    /// Same as [`TrajectoryStore::list`].
    pub fn latest(&self, repo_name: &str) -> Result<Option<Step>> {
        Ok(self.list(repo_name)?.last().map(|(step, _)| *step))
    }

    /// Fold every per-step file of `repo_name` into the aggregate file.
    ///
    /// Only one checkpoint's weights are held in memory at a time.
    ///
    /// # Errors
    ///
    /// Returns an error if listing, reading or writing fails.
    pub fn write_aggregate(&self, repo_name: &str) -> Result<PathBuf> {
        let files = self.list(repo_name)?;
        if files.is_empty() {
            return Err(TrajectoryError::missing(None, self.variant_dir(repo_name)));
        }
        let out = self.aggregate_path(repo_name);
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        atomic_write(&out, |tmp| write_aggregate_file(tmp, &files, repo_name))?;
        Ok(out)
    }
}

fn aggregate_tensor_name(step: Step) -> String {
    format!("step_{step}")
}

fn aggregate_table_key(step: Step) -> String {
    format!("{KEY_LAYER_SIZES}.{step}")
}

fn write_aggregate_file(path: &Path, files: &[(Step, PathBuf)], variant: &str) -> Result<()> {
    // First pass: headers only.
    let mut header = serde_json::Map::new();
    let mut meta = serde_json::Map::new();
    let mut offset = 0;
    for (step, file) in files {
        let mapped = MappedSafeTensors::open(file)?;
        let table = table_from_metadata(mapped.user_metadata(), KEY_LAYER_SIZES, file)?;
        let len = table.total_len();
        let tensor = TensorMetadata {
            dtype: "F32".to_string(),
            shape: vec![len],
            data_offsets: [offset, offset + len * 4],
        };
        offset += len * 4;
        header.insert(aggregate_tensor_name(*step), serde_json::to_value(tensor)?);
        meta.insert(
            aggregate_table_key(*step),
            serde_json::Value::String(serde_json::to_string(&table)?),
        );
    }
    meta.insert(
        KEY_VARIANT.to_string(),
        serde_json::Value::String(variant.to_string()),
    );
    meta.insert(
        KEY_FORMAT_VERSION.to_string(),
        serde_json::Value::String(FORMAT_VERSION.to_string()),
    );
    header.insert("__metadata__".to_string(), serde_json::Value::Object(meta));

    let header_json = serde_json::to_string(&header)?;
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(&(header_json.len() as u64).to_le_bytes())?;
    out.write_all(header_json.as_bytes())?;

    // Second pass: stream the data, one checkpoint at a time.
    for (_, file) in files {
        let record = read_record(file)?;
        for value in &record.weights {
            out.write_all(&value.to_le_bytes())?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Read access to an aggregate trajectory file.
#[derive(Debug)]
pub struct AggregateTrajectory {
    file: MappedSafeTensors,
    steps: Vec<Step>,
}

impl AggregateTrajectory {
    /// # Errors
    ///
    /// Returns `MissingArtifact` if the file does not exist or `FormatError`
    /// if it is not an aggregate trajectory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = MappedSafeTensors::open(path)?;
        let mut steps: Vec<Step> = file
            .tensor_names()
            .iter()
            .filter_map(|name| name.strip_prefix("step_")?.parse().ok())
            .collect();
        steps.sort_unstable();
        Ok(Self { file, steps })
    }

    /// Steps contained, ordered numerically.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Load one step.
    ///
    /// # Errors
    ///
    /// Returns `MissingArtifact` if the step is not part of the file.
    pub fn get(&self, step: Step) -> Result<CheckpointRecord> {
        if self.steps.binary_search(&step).is_err() {
            return Err(TrajectoryError::missing(Some(step.get()), self.file.path()));
        }
        let path = Path::new(self.file.path());
        let table = table_from_metadata(self.file.user_metadata(), &aggregate_table_key(step), path)?;
        let weights = self.file.get_tensor(&aggregate_tensor_name(step))?;
        CheckpointRecord::new(step, weights, table)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
