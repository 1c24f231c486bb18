//! verdine: A Fast, Modular NDVI Processor for Multispectral Imagery
//!
//! This library computes the Normalized Difference Vegetation Index from
//! satellite rasters, either from multispectral products or from separate
//! red/near-infrared band files, with optional cloud masking and a
//! configurable output range and pixel encoding. Raster decoding, tiling and
//! caching are delegated to GDAL; this crate builds lazy pixel expressions
//! and orchestrates their evaluation.

pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    NdviInput, NdviParams, PixelEncoding, PixelRange, VerdError, VerdResult,
};

pub use crate::core::{compute_ndvi, merge_bands, split_bands, NdviProcessor};
pub use crate::io::{search_files, RasterExpr, RasterImage, SearchFilter, TuningHints};
