use gdal::raster::Buffer;
use gdal::DriverManager;
use std::path::Path;
use tempfile::TempDir;
use verdine::{merge_bands, split_bands, PixelEncoding, RasterImage, VerdError};

fn create_raster(path: &Path, width: usize, height: usize, bands: &[Vec<f64>]) {
    let driver = DriverManager::get_driver_by_name("GTiff").expect("GTiff driver available");
    let mut dataset = driver
        .create_with_band_type::<f32, _>(
            path,
            width as isize,
            height as isize,
            bands.len() as isize,
        )
        .expect("Failed to create fixture raster");
    for (index, values) in bands.iter().enumerate() {
        let data: Vec<f32> = values.iter().map(|&value| value as f32).collect();
        let buffer = Buffer::new((width, height), data);
        let mut band = dataset
            .rasterband((index + 1) as isize)
            .expect("Fixture band");
        band.write((0, 0), (width, height), &buffer)
            .expect("Failed to write fixture band");
    }
}

#[test]
fn test_split_writes_one_file_per_band() {
    let workdir = TempDir::new().expect("temp dir");
    let out_dir = TempDir::new().expect("temp out dir");

    let multi_path = workdir.path().join("SENTINEL2A_T31TCJ_FRE_BGRPIR.tif");
    let bands = [
        vec![1.0, 2.0, 3.0, 4.0],
        vec![5.0, 6.0, 7.0, 8.0],
        vec![9.0, 10.0, 11.0, 12.0],
    ];
    create_raster(&multi_path, 2, 2, &bands);

    let written = split_bands(
        &multi_path,
        &["B2", "B3", "B4"],
        PixelEncoding::Int16,
        out_dir.path(),
    )
    .expect("split failed");

    assert_eq!(
        written,
        vec![
            out_dir.path().join("SENTINEL2A_T31TCJ_FRE_BGRPIR_B2.tif"),
            out_dir.path().join("SENTINEL2A_T31TCJ_FRE_BGRPIR_B3.tif"),
            out_dir.path().join("SENTINEL2A_T31TCJ_FRE_BGRPIR_B4.tif"),
        ]
    );
    for (path, expected) in written.iter().zip(&bands) {
        let image = RasterImage::open(path).expect("open split band");
        assert_eq!(image.band_count(), 1);
        let values = image.read_band(0).expect("read split band");
        assert_eq!(values.into_raw_vec(), *expected);
    }
}

#[test]
fn test_split_rejects_wrong_band_list() {
    let workdir = TempDir::new().expect("temp dir");
    let out_dir = TempDir::new().expect("temp out dir");

    let multi_path = workdir.path().join("stack.tif");
    create_raster(
        &multi_path,
        2,
        1,
        &[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
    );

    let result = split_bands(
        &multi_path,
        &["B4", "B8"],
        PixelEncoding::Float32,
        out_dir.path(),
    );
    assert!(matches!(
        result,
        Err(VerdError::BandCountMismatch {
            expected: 2,
            actual: 3
        })
    ));
    assert_eq!(std::fs::read_dir(out_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_split_missing_directory() {
    let workdir = TempDir::new().expect("temp dir");
    let multi_path = workdir.path().join("stack.tif");
    create_raster(&multi_path, 2, 1, &[vec![1.0, 2.0]]);

    let result = split_bands(
        &multi_path,
        &["B2"],
        PixelEncoding::Float32,
        "/no/such/directory",
    );
    assert!(matches!(result, Err(VerdError::DirectoryNotFound(_))));
}

#[test]
fn test_merge_concatenates_bands() {
    let workdir = TempDir::new().expect("temp dir");
    let out_dir = TempDir::new().expect("temp out dir");

    let red_path = workdir.path().join("SENTINEL2A_T31TCJ_FRE_B4.tif");
    let nir_path = workdir.path().join("SENTINEL2A_T31TCJ_FRE_B8.tif");
    let red = vec![10.0, 20.0, 30.0, 40.0];
    let nir = vec![50.0, 60.0, 70.0, 80.0];
    create_raster(&red_path, 2, 2, &[red.clone()]);
    create_raster(&nir_path, 2, 2, &[nir.clone()]);

    let merged = merge_bands(
        &[&red_path, &nir_path],
        PixelEncoding::Int16,
        out_dir.path(),
    )
    .expect("merge failed");

    assert_eq!(
        merged,
        out_dir.path().join("SENTINEL2A_T31TCJ_FRE_B4B8.tif")
    );
    let image = RasterImage::open(&merged).expect("open merged image");
    assert_eq!(image.band_count(), 2);
    assert_eq!(image.read_band(0).expect("band 0").into_raw_vec(), red);
    assert_eq!(image.read_band(1).expect("band 1").into_raw_vec(), nir);
}

#[test]
fn test_merge_rejects_empty_input() {
    let out_dir = TempDir::new().expect("temp out dir");
    let empty: [&Path; 0] = [];
    let result = merge_bands(&empty, PixelEncoding::Float32, out_dir.path());
    assert!(matches!(result, Err(VerdError::InvalidArgument(_))));
}

#[test]
fn test_merge_rejects_size_mismatch() {
    let workdir = TempDir::new().expect("temp dir");
    let out_dir = TempDir::new().expect("temp out dir");

    let small = workdir.path().join("small_B4.tif");
    let large = workdir.path().join("large_B8.tif");
    create_raster(&small, 2, 1, &[vec![1.0, 2.0]]);
    create_raster(&large, 3, 1, &[vec![1.0, 2.0, 3.0]]);

    let result = merge_bands(&[&small, &large], PixelEncoding::Float32, out_dir.path());
    assert!(matches!(result, Err(VerdError::Processing(_))));
}
