pub mod config;
pub mod error;
pub mod layer;
pub mod tape;
pub mod tensor;
pub mod types;
