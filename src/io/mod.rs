//! Raster I/O: opened handles, lazy expressions, product discovery, tuning

pub mod raster;
pub mod search;
pub mod tuning;

// Re-export main types
pub use raster::{write_multiband, RasterExpr, RasterImage};
pub use search::{search_files, SearchFilter};
pub use tuning::TuningHints;
