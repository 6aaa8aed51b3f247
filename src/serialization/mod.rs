//! Checkpoint container serialization.
//!
//! Persisted checkpoints use the `SafeTensors` layout:
//! ```text
//! [8-byte header: u64 metadata length (little-endian)]
//! [JSON metadata: tensor names, dtypes, shapes, data_offsets, __metadata__]
//! [Raw tensor data]
//! ```
//!
//! The same reader loads Hugging Face model shards (F32, F16 and BF16) for
//! the model-loading side.

mod mmap;
pub mod safetensors;

pub use mmap::MappedFile;
pub use safetensors::{
    save_safetensors, MappedSafeTensors, SafeTensorsDType, SafeTensorsMetadata, TensorMetadata,
    TensorView, UserMetadata,
};
