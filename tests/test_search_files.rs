use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use verdine::{search_files, SearchFilter, VerdError};

const B4: &str = "SENTINEL2A_20231012-105856-398_L2A_T31TCJ_C_V3-1_FRE_B4.tif";
const B8: &str = "SENTINEL2A_20231012-105856-398_L2A_T31TCJ_C_V3-1_FRE_B8.tif";
const CONCAT: &str = "SENTINEL2A_20231012-105856-398_L2A_T31TCJ_C_V3-1_FRE_ConcatenateImageBGRPIR.tif";
const CLOUD_MASK: &str = "SENTINEL2A_20231012-105856-398_L2A_T31TCJ_C_V3-1_CLM_R1.tif";

fn touch(path: &Path) {
    std::fs::File::create(path).expect("Failed to create fixture file");
}

/// Sentinel-2 style product tree: three rasters at the top level, the cloud
/// mask in a nested MASKS folder, plus one metadata file.
fn product_tree() -> TempDir {
    let root = TempDir::new().expect("temp dir");
    touch(&root.path().join(B4));
    touch(&root.path().join(B8));
    touch(&root.path().join(CONCAT));
    std::fs::create_dir(root.path().join("MASKS")).expect("MASKS dir");
    touch(&root.path().join("MASKS").join(CLOUD_MASK));
    touch(&root.path().join("metadata.xml"));
    root
}

#[test]
fn test_band_filter_selects_single_product() {
    let root = product_tree();
    // trailing dot pins the band tag so B4 does not also match B40-style names
    let filter = SearchFilter::new()
        .extension("tif")
        .resolution("SENTINEL2")
        .band("FRE_B4.");
    let matches = search_files(root.path(), &filter).expect("search failed");
    assert_eq!(matches, vec![root.path().join(B4)]);
}

#[test]
fn test_search_descends_into_nested_folders() {
    let root = product_tree();
    let filter = SearchFilter::new()
        .extension("tif")
        .resolution("SENTINEL2")
        .band("CLM_R1");
    let matches = search_files(root.path(), &filter).expect("search failed");
    assert_eq!(matches, vec![root.path().join("MASKS").join(CLOUD_MASK)]);
}

#[test]
fn test_extension_only_filter() {
    let root = product_tree();
    let filter = SearchFilter::new().extension("xml");
    let matches = search_files(root.path(), &filter).expect("search failed");
    assert_eq!(matches, vec![root.path().join("metadata.xml")]);
}

#[test]
fn test_suffix_only_filter() {
    let root = product_tree();
    let filter = SearchFilter::new().suffix("_FRE_ConcatenateImageBGRPIR.tif");
    let matches = search_files(root.path(), &filter).expect("search failed");
    assert_eq!(matches, vec![root.path().join(CONCAT)]);
}

#[test]
fn test_tag_and_suffix_intersection() {
    let root = product_tree();
    // the tag pattern alone matches B4, B8 and the concatenated product;
    // the suffix narrows the result to B8
    let filter = SearchFilter::new()
        .extension("tif")
        .band("FRE")
        .suffix("B8.tif");
    let matches = search_files(root.path(), &filter).expect("search failed");
    assert_eq!(matches, vec![root.path().join(B8)]);
}

#[test]
fn test_no_filters_returns_every_file() {
    let root = product_tree();
    let matches = search_files(root.path(), &SearchFilter::new()).expect("search failed");
    let found: HashSet<PathBuf> = matches.into_iter().collect();
    let expected: HashSet<PathBuf> = [
        root.path().join(B4),
        root.path().join(B8),
        root.path().join(CONCAT),
        root.path().join("MASKS").join(CLOUD_MASK),
        root.path().join("metadata.xml"),
    ]
    .into_iter()
    .collect();
    assert_eq!(found, expected);
}

#[test]
fn test_missing_directory() {
    let result = search_files("/random/folder", &SearchFilter::new());
    assert!(matches!(result, Err(VerdError::DirectoryNotFound(_))));
}
