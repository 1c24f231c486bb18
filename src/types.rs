use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Storage type for output raster pixels.
///
/// The engine computes in f64 and converts on write. Integer encodings
/// saturate at their bounds and store 0 for non-finite values; `Float32`
/// keeps IEEE NaN/infinity as produced by the expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelEncoding {
    /// Unsigned 8-bit (visualization products, e.g. range (0, 255))
    Uint8,
    /// Signed 16-bit (scaled integer storage, e.g. range (-1000, 1000))
    Int16,
    /// 32-bit floating point (physical NDVI, range (-1, 1))
    Float32,
}

impl std::fmt::Display for PixelEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelEncoding::Uint8 => write!(f, "uint8"),
            PixelEncoding::Int16 => write!(f, "int16"),
            PixelEncoding::Float32 => write!(f, "float"),
        }
    }
}

impl FromStr for PixelEncoding {
    type Err = VerdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uint8" | "u8" | "byte" => Ok(PixelEncoding::Uint8),
            "int16" | "i16" => Ok(PixelEncoding::Int16),
            "float" | "float32" | "f32" => Ok(PixelEncoding::Float32),
            _ => Err(VerdError::InvalidArgument(format!(
                "Unknown pixel encoding: {}",
                s
            ))),
        }
    }
}

/// Target value range for the NDVI output.
///
/// The raw ratio (NIR-Red)/(NIR+Red) lives in [-1, 1]; the engine remaps it
/// affinely onto [low, high] in the same fused expression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRange {
    low: f64,
    high: f64,
}

impl PixelRange {
    /// Create a range, rejecting high <= low.
    pub fn new(low: f64, high: f64) -> VerdResult<Self> {
        if high <= low {
            return Err(VerdError::InvalidArgument(format!(
                "Pixel range high ({}) must be greater than low ({})",
                high, low
            )));
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    /// Half of the span, the `a` coefficient of the fused rescale.
    pub fn half_span(&self) -> f64 {
        (self.high - self.low) / 2.0
    }

    /// Lower bound, the `b` coefficient of the fused rescale.
    pub fn offset(&self) -> f64 {
        self.low
    }
}

impl Default for PixelRange {
    fn default() -> Self {
        // Physical NDVI range
        Self {
            low: -1.0,
            high: 1.0,
        }
    }
}

/// Input shape for one NDVI invocation.
///
/// Replaces a stringly-typed mode switch: each variant carries exactly the
/// path structure it needs, so a nested list can never reach the multi
/// branch and the red/nir roles in the bands branch are fixed by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NdviInput {
    /// One or more multispectral images; red/nir are 0-based band indices
    /// within each image.
    Multi {
        images: Vec<PathBuf>,
        red_band: usize,
        nir_band: usize,
    },
    /// Two parallel lists of single-band images, paired by position.
    Bands {
        red_images: Vec<PathBuf>,
        nir_images: Vec<PathBuf>,
    },
}

impl NdviInput {
    /// Number of output products this input will produce.
    pub fn image_count(&self) -> usize {
        match self {
            NdviInput::Multi { images, .. } => images.len(),
            NdviInput::Bands { red_images, .. } => red_images.len(),
        }
    }
}

/// Per-invocation NDVI policy: output range, encoding, masking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NdviParams {
    /// Desired output value range
    pub pixel_range: PixelRange,
    /// Output storage type
    pub pixel_encoding: PixelEncoding,
    /// Value substituted wherever a mask flags a pixel
    pub nodata_value: f64,
    /// Optional mask rasters, paired positionally with the processed images
    /// (mask[i] applies to image i); None disables masking.
    pub masks: Option<Vec<PathBuf>>,
}

impl Default for NdviParams {
    fn default() -> Self {
        Self {
            pixel_range: PixelRange::default(),
            pixel_encoding: PixelEncoding::Float32,
            nodata_value: 0.0,
            masks: None,
        }
    }
}

/// Error types for raster processing
#[derive(Debug, thiserror::Error)]
pub enum VerdError {
    #[error("Not a directory: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Band count mismatch: band list has {expected}, image has {actual}")]
    BandCountMismatch { expected: usize, actual: usize },

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

/// Result type for raster operations
pub type VerdResult<T> = Result<T, VerdError>;
