use crate::io::raster::{write_multiband, RasterImage};
use crate::types::{PixelEncoding, VerdError, VerdResult};
use std::path::{Path, PathBuf};

/// Split a multispectral image into one single-band file per band.
///
/// `band_names` labels the bands in file order (e.g. `["B2", "B3", "B4",
/// "B8"]`) and must match the image's actual band count; each output is
/// named `<stem>_<band_name>.tif` in `out_directory`.
pub fn split_bands<P: AsRef<Path>, Q: AsRef<Path>>(
    multi: P,
    band_names: &[&str],
    pixel_encoding: PixelEncoding,
    out_directory: Q,
) -> VerdResult<Vec<PathBuf>> {
    let out_directory = out_directory.as_ref();
    if !out_directory.is_dir() {
        return Err(VerdError::DirectoryNotFound(out_directory.to_path_buf()));
    }

    let multi = multi.as_ref();
    let image = RasterImage::open(multi)?;
    let band_count = image.band_count();
    if band_count != band_names.len() {
        return Err(VerdError::BandCountMismatch {
            expected: band_names.len(),
            actual: band_count,
        });
    }

    let stem = file_stem(multi);
    log::info!(
        "Splitting {} into {} band file(s)",
        multi.display(),
        band_count
    );

    let mut written = Vec::with_capacity(band_names.len());
    for (index, name) in band_names.iter().enumerate() {
        let out_path = out_directory.join(format!("{}_{}.tif", stem, name));
        image.band(index).write(&out_path, pixel_encoding)?;
        written.push(out_path);
    }
    Ok(written)
}

/// Merge several single-band images into one multispectral image.
///
/// The first band of each input becomes one band of the output, in input
/// order; all inputs must share raster dimensions. The output name is the
/// first input's stem with the trailing underscore token of every further
/// stem appended (`X_B4.tif` + `X_B8.tif` -> `X_B4B8.tif`).
pub fn merge_bands<P: AsRef<Path>, Q: AsRef<Path>>(
    band_paths: &[P],
    pixel_encoding: PixelEncoding,
    out_directory: Q,
) -> VerdResult<PathBuf> {
    let out_directory = out_directory.as_ref();
    if !out_directory.is_dir() {
        return Err(VerdError::DirectoryNotFound(out_directory.to_path_buf()));
    }
    if band_paths.is_empty() {
        return Err(VerdError::InvalidArgument(
            "No input bands to merge".to_string(),
        ));
    }

    let mut expressions = Vec::with_capacity(band_paths.len());
    for path in band_paths {
        expressions.push(RasterImage::open(path.as_ref())?.band(0));
    }

    let paths: Vec<&Path> = band_paths.iter().map(|path| path.as_ref()).collect();
    let out_path = out_directory.join(merged_name(&paths));
    log::info!(
        "Merging {} band file(s) -> {}",
        band_paths.len(),
        out_path.display()
    );

    write_multiband(&expressions, &out_path, pixel_encoding)?;
    Ok(out_path)
}

fn file_stem(path: &Path) -> &str {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("output")
}

fn merged_name(paths: &[&Path]) -> String {
    let mut name = file_stem(paths[0]).to_string();
    for path in &paths[1..] {
        let stem = file_stem(path);
        name.push_str(stem.rsplit('_').next().unwrap_or(stem));
    }
    format!("{}.tif", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merged_name_appends_band_tokens() {
        let red = Path::new("/data/SENTINEL2A_T31TCJ_FRE_B4.tif");
        let nir = Path::new("/data/SENTINEL2A_T31TCJ_FRE_B8.tif");
        assert_eq!(
            merged_name(&[red, nir]),
            "SENTINEL2A_T31TCJ_FRE_B4B8.tif"
        );
    }

    #[test]
    fn test_merged_name_without_underscores() {
        let a = Path::new("red.tif");
        let b = Path::new("nir.tif");
        assert_eq!(merged_name(&[a, b]), "rednir.tif");
    }
}
