//! `SafeTensors` reading and writing.
//!
//! Writing always produces F32 tensors. Reading accepts F32, F16 and BF16,
//! widening half-precision values to `f32`.

use super::mmap::MappedFile;
use crate::error::{Result, TrajectoryError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Element type of a stored tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafeTensorsDType {
    /// 32-bit float
    F32,
    /// 16-bit float (IEEE 754 half-precision)
    F16,
    /// Brain float 16
    BF16,
}

impl SafeTensorsDType {
    /// Parse the header's dtype string.
    #[must_use]
    pub fn parse(dtype: &str) -> Option<Self> {
        match dtype {
            "F32" => Some(Self::F32),
            "F16" => Some(Self::F16),
            "BF16" => Some(Self::BF16),
            _ => None,
        }
    }

    /// Bytes per element
    #[must_use]
    pub fn bytes_per_element(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F16 | Self::BF16 => 2,
        }
    }
}

/// Metadata for a single tensor in `SafeTensors` format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorMetadata {
    /// Data type of the tensor (e.g., "F32").
    pub dtype: String,
    /// Shape of the tensor.
    pub shape: Vec<usize>,
    /// Data offsets `[start, end]` in the raw data section.
    pub data_offsets: [usize; 2],
}

/// Tensor metadata by name; `BTreeMap` keeps the JSON header deterministic.
pub type SafeTensorsMetadata = BTreeMap<String, TensorMetadata>;

/// String → string metadata stored under the header's `__metadata__` key.
pub type UserMetadata = BTreeMap<String, String>;

/// Borrowed tensor to be written.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
    pub shape: &'a [usize],
    pub data: &'a [f32],
}

/// Saves F32 tensors and user metadata to a `SafeTensors` file.
///
/// Tensor data is streamed to disk; nothing is copied into an intermediate
/// buffer, which matters for multi-gigabyte weight vectors.
///
/// # Errors
///
/// Returns an error if a tensor's data disagrees with its shape, or if JSON
/// serialization or file writing fails.
pub fn save_safetensors<P: AsRef<Path>>(
    path: P,
    tensors: &BTreeMap<String, TensorView<'_>>,
    user_metadata: &UserMetadata,
) -> Result<()> {
    let mut header = serde_json::Map::new();

    if !user_metadata.is_empty() {
        let meta_obj: serde_json::Map<String, serde_json::Value> = user_metadata
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        header.insert(
            "__metadata__".to_string(),
            serde_json::Value::Object(meta_obj),
        );
    }

    let mut current_offset = 0;
    for (name, view) in tensors {
        let numel: usize = view.shape.iter().product();
        if numel != view.data.len() {
            return Err(TrajectoryError::invalid_input(format!(
                "tensor '{name}' has shape {:?} but {} values",
                view.shape,
                view.data.len()
            )));
        }
        let start_offset = current_offset;
        let end_offset = current_offset + view.data.len() * 4;

        let tensor_meta = TensorMetadata {
            dtype: "F32".to_string(),
            shape: view.shape.to_vec(),
            data_offsets: [start_offset, end_offset],
        };
        header.insert(name.clone(), serde_json::to_value(tensor_meta)?);
        current_offset = end_offset;
    }

    let metadata_json = serde_json::to_string(&header)?;
    let metadata_bytes = metadata_json.as_bytes();
    let metadata_len = metadata_bytes.len() as u64;

    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(&metadata_len.to_le_bytes())?;
    out.write_all(metadata_bytes)?;
    for view in tensors.values() {
        for &value in view.data {
            out.write_all(&value.to_le_bytes())?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Memory-mapped `SafeTensors` file.
#[derive(Debug)]
pub struct MappedSafeTensors {
    mmap: MappedFile,
    metadata: SafeTensorsMetadata,
    user_metadata: UserMetadata,
    /// Offset where tensor data begins (after header + metadata JSON)
    data_offset: usize,
}

impl MappedSafeTensors {
    /// Open a `SafeTensors` file with memory mapping.
    ///
    /// # Errors
    ///
    /// Returns `MissingArtifact` if the file does not exist and
    /// `FormatError` if the header is invalid.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mmap = MappedFile::open(path)?;
        let bytes = mmap.as_slice();

        let metadata_len = validate_and_read_header(bytes)?;
        let (metadata, user_metadata) = parse_metadata(bytes, metadata_len)?;
        let data_offset = 8 + metadata_len;

        Ok(Self {
            mmap,
            metadata,
            user_metadata,
            data_offset,
        })
    }

    /// Get tensor metadata by name.
    #[must_use]
    pub fn get_metadata(&self, name: &str) -> Option<&TensorMetadata> {
        self.metadata.get(name)
    }

    /// All tensor names, sorted.
    #[must_use]
    pub fn tensor_names(&self) -> Vec<&str> {
        self.metadata.keys().map(String::as_str).collect()
    }

    /// Extract tensor data as f32 values (BF16/F16 are converted to F32).
    ///
    /// # Errors
    ///
    /// Returns `FormatError` if the tensor is missing, out of bounds, or of
    /// an unsupported dtype.
    pub fn get_tensor(&self, name: &str) -> Result<Vec<f32>> {
        let meta = self
            .metadata
            .get(name)
            .ok_or_else(|| TrajectoryError::format(format!("tensor '{name}' not found")))?;

        let [start, end] = meta.data_offsets;
        let abs_start = self.data_offset + start;
        let abs_end = self.data_offset + end;

        let tensor_bytes = self.mmap.slice(abs_start, abs_end).ok_or_else(|| {
            TrajectoryError::format(format!(
                "tensor '{name}' data out of bounds: {abs_start}..{abs_end} > {}",
                self.mmap.len()
            ))
        })?;

        let dtype = SafeTensorsDType::parse(&meta.dtype).ok_or_else(|| {
            TrajectoryError::format(format!(
                "unsupported dtype for '{name}': {} (supported: F32, F16, BF16)",
                meta.dtype
            ))
        })?;

        let values = decode(tensor_bytes, dtype)?;
        let numel: usize = meta.shape.iter().product();
        if values.len() != numel {
            return Err(TrajectoryError::format(format!(
                "tensor '{name}' has shape {:?} but {} values",
                meta.shape,
                values.len()
            )));
        }
        Ok(values)
    }

    /// Number of tensors in the file.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    /// Check if file has no tensors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Metadata from the `__metadata__` header section.
    #[must_use]
    pub fn user_metadata(&self) -> &UserMetadata {
        &self.user_metadata
    }

    /// Path the file was opened from.
    #[must_use]
    pub fn path(&self) -> &str {
        self.mmap.path()
    }
}

#[path = "safetensors_reader.rs"]
mod safetensors_reader;
use safetensors_reader::{decode, parse_metadata, validate_and_read_header};

#[cfg(test)]
#[path = "safetensors_tests.rs"]
mod safetensors_tests;
