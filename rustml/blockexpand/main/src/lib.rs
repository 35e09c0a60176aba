//! # RustML Block Expand
//!
//! Turns a convolutional feature map into a sequence of flattened blocks.
//!
//! Every `block_h x block_w` window (taken with the configured stride and zero
//! padding) becomes one row of a 2-D matrix, so a recurrent or attention stage
//! can read the spatial grid as a time sequence. The backward pass adds each
//! row's gradient back onto the window it came from.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rustml_blockexpand::{BlockExpand, BlockExpandConfig, Layer, Tensor};
//!
//! let config = BlockExpandConfig::new(1, 2, 2).with_stride(2, 2);
//! let mut layer = BlockExpand::new(config)?;
//! let input = Tensor::from_vec((1..=16).map(|v| v as f32).collect(), vec![1, 1, 4, 4])?;
//! let out = layer.forward(&input)?;
//! assert_eq!(out.value.shape(), &[4, 4]);
//! assert_eq!(out.boundaries.starts(), &[0, 4]);
//! ```

pub mod api;
pub mod core;
mod saf;

pub use saf::*;
