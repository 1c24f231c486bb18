//! Core NDVI processing modules

pub mod band_ops;
pub mod ndvi;

// Re-export main types
pub use band_ops::{merge_bands, split_bands};
pub use ndvi::{compute_ndvi, NdviProcessor};
