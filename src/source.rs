//! Where checkpoint parameters come from.
//!
//! The core only needs named tensors for a `(variant, step)` pair. How they
//! were downloaded or cached is the source's business.

use crate::checkpoint::Step;
use crate::error::{Result, TrajectoryError};
use crate::family::{ModelFamily, Variant};
use crate::serialization::{MappedSafeTensors, SafeTensorsDType};
use crate::tensor::{ParameterSet, Tensor};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Supplies the parameter set of one checkpoint.
pub trait ParameterSource {
    /// Load the parameters of `variant` at `step`.
    ///
    /// # Errors
    ///
    /// Returns `MissingArtifact` if the checkpoint is not available.
    fn load(&self, variant: &Variant, step: Step) -> Result<ParameterSet>;
}

/// Reads checkpoints laid out as `<root>/<repo_name>/step<N>/*.safetensors`.
///
/// Sharded checkpoints are merged. Float tensors (F32, F16, BF16) are loaded;
/// tensors of other dtypes (integer or boolean buffers) are skipped, the same
/// way for every step, so the vector layout stays stable along the trajectory.
#[derive(Debug, Clone)]
pub struct SafeTensorsDirSource {
    root: PathBuf,
    family: ModelFamily,
}

impl SafeTensorsDirSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, family: ModelFamily) -> Self {
        Self {
            root: root.into(),
            family,
        }
    }

    /// Directory holding the shards of one checkpoint.
    #[must_use]
    pub fn checkpoint_dir(&self, variant: &Variant, step: Step) -> PathBuf {
        self.root
            .join(self.family.repo_name(variant))
            .join(step.revision())
    }
}

fn shard_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut shards = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("safetensors") {
            shards.push(path);
        }
    }
    shards.sort();
    Ok(shards)
}

/// Merge the float tensors of several shard files into one parameter set.
///
/// # Errors
///
/// Returns `InvalidInput` if two shards define the same tensor, or any error
/// from reading a shard.
pub fn load_shards(shards: &[PathBuf]) -> Result<ParameterSet> {
    let mut params = ParameterSet::new();
    for shard in shards {
        let file = MappedSafeTensors::open(shard)?;
        for name in file.tensor_names() {
            let Some(meta) = file.get_metadata(name) else {
                continue;
            };
            if SafeTensorsDType::parse(&meta.dtype).is_none() {
                tracing::debug!(tensor = name, dtype = %meta.dtype, "skipping non-float tensor");
                continue;
            }
            if params.contains(name) {
                return Err(TrajectoryError::invalid_input(format!(
                    "tensor '{name}' appears in more than one shard"
                )));
            }
            let tensor = Tensor::new(meta.shape.clone(), file.get_tensor(name)?)?;
            params.insert(name, tensor);
        }
    }
    Ok(params)
}

impl ParameterSource for SafeTensorsDirSource {
    fn load(&self, variant: &Variant, step: Step) -> Result<ParameterSet> {
        let dir = self.checkpoint_dir(variant, step);
        if !dir.is_dir() {
            return Err(TrajectoryError::missing(Some(step.get()), dir));
        }
        let shards = shard_paths(&dir)?;
        if shards.is_empty() {
            return Err(TrajectoryError::missing(Some(step.get()), dir));
        }
        tracing::debug!(dir = %dir.display(), shards = shards.len(), "loading checkpoint");
        load_shards(&shards)
    }
}

/// Parameter sets held in memory, keyed by variant id and step.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    checkpoints: HashMap<(String, Step), ParameterSet>,
}

impl InMemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, variant: &str, step: Step, params: ParameterSet) {
        self.checkpoints.insert((variant.to_string(), step), params);
    }

    #[must_use]
    pub fn with(mut self, variant: &str, step: Step, params: ParameterSet) -> Self {
        self.insert(variant, step, params);
        self
    }
}

impl ParameterSource for InMemorySource {
    fn load(&self, variant: &Variant, step: Step) -> Result<ParameterSet> {
        self.checkpoints
            .get(&(variant.id.clone(), step))
            .cloned()
            .ok_or_else(|| {
                TrajectoryError::missing(Some(step.get()), format!("memory://{}/{step}", variant.id))
            })
    }
}

impl<S: ParameterSource + ?Sized> ParameterSource for &S {
    fn load(&self, variant: &Variant, step: Step) -> Result<ParameterSet> {
        (**self).load(variant, step)
    }
}
