pub mod block_expand;
pub mod expand;
pub mod geometry;
pub mod runtime;
pub mod sequence;
pub mod shrink;
