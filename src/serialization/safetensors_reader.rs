use super::{SafeTensorsDType, SafeTensorsMetadata, TensorMetadata, UserMetadata};
use crate::error::{Result, TrajectoryError};

pub(super) fn validate_and_read_header(bytes: &[u8]) -> Result<usize> {
    if bytes.len() < 8 {
        return Err(TrajectoryError::format(format!(
            "file is {} bytes, need at least 8 bytes for header",
            bytes.len()
        )));
    }

    let header_bytes: [u8; 8] = bytes[0..8]
        .try_into()
        .map_err(|_| TrajectoryError::format("failed to read header bytes"))?;
    let metadata_len = usize::try_from(u64::from_le_bytes(header_bytes))
        .map_err(|_| TrajectoryError::format("metadata length does not fit in memory"))?;

    if metadata_len == 0 {
        return Err(TrajectoryError::format("metadata length is 0"));
    }

    if metadata_len > bytes.len() - 8 {
        return Err(TrajectoryError::format(format!(
            "metadata length {metadata_len} exceeds file size"
        )));
    }

    Ok(metadata_len)
}

pub(super) fn parse_metadata(
    bytes: &[u8],
    metadata_len: usize,
) -> Result<(SafeTensorsMetadata, UserMetadata)> {
    let metadata_json = &bytes[8..8 + metadata_len];
    let metadata_str = std::str::from_utf8(metadata_json)
        .map_err(|e| TrajectoryError::format(format!("metadata is not valid UTF-8: {e}")))?;

    let raw_metadata: serde_json::Value = serde_json::from_str(metadata_str)
        .map_err(|e| TrajectoryError::format(format!("JSON parsing failed: {e}")))?;

    let serde_json::Value::Object(map) = raw_metadata else {
        return Err(TrajectoryError::format("metadata header is not a JSON object"));
    };

    let mut metadata = SafeTensorsMetadata::new();
    let mut user_metadata = UserMetadata::new();

    for (key, value) in map {
        if key == "__metadata__" {
            extract_user_metadata(value, &mut user_metadata);
            continue;
        }
        if key.starts_with("__") {
            continue;
        }
        let tensor_meta = serde_json::from_value::<TensorMetadata>(value).map_err(|e| {
            TrajectoryError::format(format!("invalid metadata for tensor '{key}': {e}"))
        })?;
        metadata.insert(key, tensor_meta);
    }

    Ok((metadata, user_metadata))
}

fn extract_user_metadata(value: serde_json::Value, user_metadata: &mut UserMetadata) {
    let serde_json::Value::Object(meta_map) = value else {
        return;
    };
    for (mk, mv) in meta_map {
        if let serde_json::Value::String(s) = mv {
            user_metadata.insert(mk, s);
        }
    }
}

/// Decode little-endian tensor bytes of `dtype` into `f32` values.
pub(super) fn decode(tensor_bytes: &[u8], dtype: SafeTensorsDType) -> Result<Vec<f32>> {
    let width = dtype.bytes_per_element();
    if tensor_bytes.len() % width != 0 {
        return Err(TrajectoryError::format(format!(
            "{dtype:?} tensor data size {} is not a multiple of {width} bytes",
            tensor_bytes.len()
        )));
    }

    let values = match dtype {
        SafeTensorsDType::F32 => tensor_bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        SafeTensorsDType::F16 => tensor_bytes
            .chunks_exact(2)
            .map(|c| half::f16::from_le_bytes([c[0], c[1]]).to_f32())
            .collect(),
        SafeTensorsDType::BF16 => tensor_bytes
            .chunks_exact(2)
            .map(|c| half::bf16::from_le_bytes([c[0], c[1]]).to_f32())
            .collect(),
    };
    Ok(values)
}
