use assert_matches::assert_matches;

use gbif_image_harvester::config::ConfigLoader;
use gbif_image_harvester::domain::{RecordType, ResultLimit};
use gbif_image_harvester::error::HarvestError;

#[test]
fn load_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("gbif-images.json");
    std::fs::write(
        &path,
        r#"{
            "species": ["Vulpes vulpes", "Meles  meles"],
            "limit": 50,
            "get_image_info": false,
            "record_type": "MATERIAL_SAMPLE",
            "save_dir": "data/images",
            "img_num_per_record": 2,
            "api_base": "http://localhost:8080/v1/"
        }"#,
    )
    .unwrap();

    let config = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(config.species.len(), 2);
    assert_eq!(config.species[1].as_str(), "Meles meles");
    assert_eq!(config.limit, ResultLimit::AtMost(50));
    assert!(!config.get_image_info);
    assert_eq!(config.record_type, Some(RecordType::MaterialSample));
    assert_eq!(config.save_dir.as_deref().map(|dir| dir.as_str()), Some("data/images"));
    assert_eq!(config.img_num_per_record, 2);
    assert_eq!(config.api_base, "http://localhost:8080/v1");
}

#[test]
fn unreadable_config_path() {
    let err = ConfigLoader::resolve(Some("/definitely/not/here/gbif-images.json")).unwrap_err();
    assert_matches!(err, HarvestError::ConfigRead(_));
}

#[test]
fn malformed_config() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("gbif-images.json");
    std::fs::write(&path, r#"{"limit": 5}"#).unwrap();

    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, HarvestError::ConfigParse(_));
}
