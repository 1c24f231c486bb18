use crate::io::raster::{RasterExpr, RasterImage};
use crate::types::{NdviInput, NdviParams, VerdError, VerdResult};
use std::path::{Path, PathBuf};

/// NDVI computation engine.
///
/// Builds the normalized-difference expression for each input image, folds
/// in the optional mask, and writes one output raster per image into the
/// target directory. Images are processed strictly in sequence; pixel-level
/// parallelism belongs to the raster engine underneath.
pub struct NdviProcessor {
    params: NdviParams,
}

impl NdviProcessor {
    /// Create a processor with the given policy.
    pub fn new(params: NdviParams) -> Self {
        Self { params }
    }

    /// Create a processor with default parameters (float output in (-1, 1),
    /// nodata 0, no masking).
    pub fn with_defaults() -> Self {
        Self {
            params: NdviParams::default(),
        }
    }

    pub fn params(&self) -> &NdviParams {
        &self.params
    }

    /// Compute NDVI for every image of `input`, writing the products into
    /// `out_directory` and returning their paths in input order.
    ///
    /// Validation happens up front: the directory must exist, the bands
    /// variant's two lists must pair up, and a configured mask list must
    /// match the image count. Only after that is any raster opened.
    /// Re-running with identical inputs overwrites the same output names.
    pub fn compute<P: AsRef<Path>>(
        &self,
        input: &NdviInput,
        out_directory: P,
    ) -> VerdResult<Vec<PathBuf>> {
        let out_directory = out_directory.as_ref();
        if !out_directory.is_dir() {
            return Err(VerdError::DirectoryNotFound(out_directory.to_path_buf()));
        }
        self.validate(input)?;

        log::info!(
            "Computing NDVI for {} image(s) into {} (range ({}, {}), {})",
            input.image_count(),
            out_directory.display(),
            self.params.pixel_range.low(),
            self.params.pixel_range.high(),
            self.params.pixel_encoding
        );

        match input {
            NdviInput::Multi {
                images,
                red_band,
                nir_band,
            } => self.compute_multi(images, *red_band, *nir_band, out_directory),
            NdviInput::Bands {
                red_images,
                nir_images,
            } => self.compute_bands(red_images, nir_images, out_directory),
        }
    }

    fn validate(&self, input: &NdviInput) -> VerdResult<()> {
        if let NdviInput::Bands {
            red_images,
            nir_images,
        } = input
        {
            if red_images.len() != nir_images.len() {
                return Err(VerdError::InvalidArgument(format!(
                    "Red and nir image lists must have the same length ({} vs {})",
                    red_images.len(),
                    nir_images.len()
                )));
            }
        }
        if let Some(masks) = &self.params.masks {
            if masks.len() != input.image_count() {
                return Err(VerdError::InvalidArgument(format!(
                    "Mask list length {} does not match image count {}",
                    masks.len(),
                    input.image_count()
                )));
            }
        }
        Ok(())
    }

    fn compute_multi(
        &self,
        images: &[PathBuf],
        red_band: usize,
        nir_band: usize,
        out_directory: &Path,
    ) -> VerdResult<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(images.len());
        for (index, image_path) in images.iter().enumerate() {
            let image = RasterImage::open(image_path)?;
            let band_count = image.band_count();
            if red_band >= band_count || nir_band >= band_count {
                return Err(VerdError::InvalidArgument(format!(
                    "Band indices red={}, nir={} exceed the {} band(s) of {}",
                    red_band,
                    nir_band,
                    band_count,
                    image_path.display()
                )));
            }
            let ndvi = self.ndvi_expression(image.band(red_band), image.band(nir_band));
            written.push(self.write_product(ndvi, index, image_path, out_directory)?);
        }
        Ok(written)
    }

    fn compute_bands(
        &self,
        red_images: &[PathBuf],
        nir_images: &[PathBuf],
        out_directory: &Path,
    ) -> VerdResult<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(red_images.len());
        for (index, (red_path, nir_path)) in red_images.iter().zip(nir_images).enumerate() {
            let red = RasterImage::open(red_path)?;
            let nir = RasterImage::open(nir_path)?;
            let ndvi = self.ndvi_expression(red.band(0), nir.band(0));
            // The red image lends its stem to the output name
            written.push(self.write_product(ndvi, index, red_path, out_directory)?);
        }
        Ok(written)
    }

    /// The NDVI ratio (N-R)/(N+R) remapped onto [low, high] in one fused
    /// expression: with a = (high-low)/2 and b = low,
    /// ((2a+b)*N + b*R) / (N+R). A single pass over the pixels covers both
    /// the ratio and the rescale.
    fn ndvi_expression(&self, red: RasterExpr, nir: RasterExpr) -> RasterExpr {
        let a = self.params.pixel_range.half_span();
        let b = self.params.pixel_range.offset();
        ((2.0 * a + b) * nir.clone() + b * red.clone()) / (nir + red)
    }

    fn write_product(
        &self,
        ndvi: RasterExpr,
        index: usize,
        source: &Path,
        out_directory: &Path,
    ) -> VerdResult<PathBuf> {
        let out_path = out_directory.join(derive_output_name(source));
        log::info!("{} -> {}", source.display(), out_path.display());

        match &self.params.masks {
            Some(masks) => {
                let mask = RasterImage::open(&masks[index])?;
                // Flagged pixels (mask > 0) become nodata in the product
                let masked = mask
                    .band(0)
                    .gt(0.0)
                    .select(self.params.nodata_value, ndvi);
                masked.write_with_nodata(
                    &out_path,
                    self.params.pixel_encoding,
                    Some(self.params.nodata_value),
                )?;
            }
            None => ndvi.write(&out_path, self.params.pixel_encoding)?,
        }
        Ok(out_path)
    }
}

/// Compute NDVI in one call; see [`NdviProcessor::compute`].
pub fn compute_ndvi<P: AsRef<Path>>(
    input: &NdviInput,
    params: NdviParams,
    out_directory: P,
) -> VerdResult<Vec<PathBuf>> {
    NdviProcessor::new(params).compute(input, out_directory)
}

/// Output naming contract: `<stem>_NDVI.<ext>`, keeping the source's
/// container extension ("tif" when it has none).
fn derive_output_name(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("output");
    let extension = source
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("tif");
    PathBuf::from(format!("{}_NDVI.{}", stem, extension))
}
