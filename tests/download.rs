mod common;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use serde_json::{Map, json};

use common::{MockImages, image_url};
use gbif_image_harvester::download::ImageDownloader;
use gbif_image_harvester::error::HarvestError;
use gbif_image_harvester::table::{ImageRow, ResultTable};

fn row(species: &str, identifier: Option<String>) -> ImageRow {
    let mut descriptor = Map::new();
    descriptor.insert("license".to_string(), json!("CC0_1_0"));
    if let Some(identifier) = identifier {
        descriptor.insert("identifier".to_string(), json!(identifier));
    }
    ImageRow {
        descriptor,
        species: Some(species.to_string()),
        sex: None,
        taxon_key: Some(5219243),
        basis_of_record: None,
        api_url: "https://api.gbif.org/v1/occurrence/search?taxon_key=5219243".to_string(),
        image_file_size_mb: Some(0.5),
        image_dimensions: None,
        local_img_path: None,
    }
}

#[test]
fn writes_one_file_per_row() {
    let temp = tempfile::tempdir().unwrap();
    let save_dir = Utf8PathBuf::from_path_buf(temp.path().join("nested/images")).unwrap();
    let images = MockImages::new();
    let table = ResultTable::from_rows(vec![
        row("Vulpes vulpes", Some(image_url("1"))),
        row("Vulpes vulpes", Some(image_url("1"))),
        row("Meles meles", Some(image_url("2"))),
    ]);

    let table = ImageDownloader::new(&images, &save_dir)
        .save_all(table)
        .unwrap();

    let entries = std::fs::read_dir(save_dir.as_std_path()).unwrap().count();
    assert_eq!(entries, 3);
    for row in &table {
        let path = row.local_img_path.as_ref().unwrap();
        let name = path.file_name().unwrap();
        assert!(name.starts_with(row.species.as_deref().unwrap()));
        assert!(name.ends_with("-original.jpg"));
        let bytes = std::fs::read(path.as_std_path()).unwrap();
        assert_eq!(bytes, row.identifier().unwrap().as_bytes());
    }
    assert_eq!(images.fetches.lock().unwrap().len(), 3);
}

#[test]
fn row_without_identifier_fails() {
    let temp = tempfile::tempdir().unwrap();
    let save_dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let images = MockImages::new();
    let table = ResultTable::from_rows(vec![row("Vulpes vulpes", None)]);

    let err = ImageDownloader::new(&images, &save_dir)
        .save_all(table)
        .unwrap_err();

    assert_matches!(err, HarvestError::MissingImageUrl(species) if species == "Vulpes vulpes");
}
