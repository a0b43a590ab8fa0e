use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{RecordType, ResultLimit, SpeciesName};
use crate::error::HarvestError;

pub const DEFAULT_CONFIG_FILE: &str = "gbif-images.json";
pub const DEFAULT_API_BASE: &str = "https://api.gbif.org/v1";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub species: SpeciesEntry,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub get_image_info: Option<bool>,
    #[serde(default)]
    pub record_type: Option<String>,
    #[serde(default)]
    pub save_dir: Option<String>,
    #[serde(default)]
    pub img_num_per_record: Option<usize>,
    #[serde(default)]
    pub api_base: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SpeciesEntry {
    Single(String),
    List(Vec<String>),
}

/// Settings shared by every species of one harvest.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub species: Vec<SpeciesName>,
    pub limit: ResultLimit,
    pub get_image_info: bool,
    pub record_type: Option<RecordType>,
    pub save_dir: Option<Utf8PathBuf>,
    pub img_num_per_record: usize,
    pub api_base: String,
}

impl HarvestConfig {
    pub fn new(species: Vec<SpeciesName>) -> Self {
        Self {
            species,
            limit: ResultLimit::Unlimited,
            get_image_info: true,
            record_type: None,
            save_dir: None,
            img_num_per_record: 1,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), HarvestError> {
        if self.species.is_empty() {
            return Err(HarvestError::InvalidConfig(
                "at least one species is required".to_string(),
            ));
        }
        if self.img_num_per_record == 0 {
            return Err(HarvestError::InvalidConfig(
                "img_num_per_record must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<HarvestConfig, HarvestError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(HarvestError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| HarvestError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| HarvestError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<HarvestConfig, HarvestError> {
        let names = match config.species {
            SpeciesEntry::Single(value) => vec![value],
            SpeciesEntry::List(values) => values,
        };
        let species = names
            .iter()
            .map(|value| value.parse())
            .collect::<Result<Vec<SpeciesName>, HarvestError>>()?;

        let resolved = HarvestConfig {
            species,
            limit: ResultLimit::from_option(config.limit),
            get_image_info: config.get_image_info.unwrap_or(true),
            record_type: config
                .record_type
                .as_deref()
                .and_then(RecordType::parse_lenient),
            save_dir: config.save_dir.map(Utf8PathBuf::from),
            img_num_per_record: config.img_num_per_record.unwrap_or(1),
            api_base: config
                .api_base
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        };
        resolved.validate()?;
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_config_single_species() {
        let config: Config = serde_json::from_str(r#"{"species": "Vulpes vulpes"}"#).unwrap();
        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.species.len(), 1);
        assert_eq!(resolved.limit, ResultLimit::Unlimited);
        assert!(resolved.get_image_info);
        assert_eq!(resolved.img_num_per_record, 1);
        assert_eq!(resolved.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn unknown_record_type_means_no_filter() {
        let config: Config = serde_json::from_str(
            r#"{"species": ["Vulpes vulpes"], "record_type": "FOSSIL_SPECIMEN"}"#,
        )
        .unwrap();
        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.record_type, None);
    }

    #[test]
    fn zero_images_per_record_is_rejected() {
        let config: Config =
            serde_json::from_str(r#"{"species": "Vulpes vulpes", "img_num_per_record": 0}"#)
                .unwrap();
        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert_matches!(err, HarvestError::InvalidConfig(_));
    }
}
