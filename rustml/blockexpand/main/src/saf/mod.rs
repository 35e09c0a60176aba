// SAF (Simple API Facade) — re-exports for convenient access

// API traits and types
pub use crate::api::config::{BlockExpandConfig, LayerConfig};
pub use crate::api::error::{BlockExpandError, BlockExpandResult};
pub use crate::api::layer::{Layer, UpdateCallback};
pub use crate::api::tape;
pub use crate::api::tensor::{Tensor, TensorId};
pub use crate::api::types::{SequenceBatch, SequenceBoundaries};

// Transform
pub use crate::core::block_expand::{build_layer, BlockExpand};
pub use crate::core::geometry::{output_size, Geometry};

// Runtime
pub use crate::core::runtime::RuntimeConfig;
