#![allow(dead_code)]

use std::sync::Mutex;

use serde_json::{Value, json};

use gbif_image_harvester::domain::{Dimensions, SpeciesName, TaxonKey};
use gbif_image_harvester::error::HarvestError;
use gbif_image_harvester::gbif::GbifClient;
use gbif_image_harvester::images::ImageClient;
use gbif_image_harvester::probe::ProbeResult;

pub const MULTIMEDIA: &str = "http://rs.gbif.org/terms/1.0/Multimedia";

pub fn descriptor(id: &str, license: Option<&str>) -> Value {
    json!({
        "http://purl.org/dc/terms/type": "StillImage",
        "http://purl.org/dc/terms/format": "image/jpeg",
        "http://purl.org/dc/terms/identifier": format!("https://img.example.org/{id}/original.jpg"),
        "http://purl.org/dc/terms/license": license,
    })
}

pub fn occurrence(species: Option<&str>, descriptors: Vec<Value>) -> Value {
    let mut record = json!({
        "key": 1,
        "taxonKey": 5219243,
        "basisOfRecord": "HUMAN_OBSERVATION",
        "extensions": { MULTIMEDIA: descriptors },
    });
    if let Some(species) = species {
        record["species"] = json!(species);
    }
    record
}

pub fn response(results: Vec<Value>) -> Value {
    json!({
        "offset": 0,
        "limit": 20,
        "endOfRecords": true,
        "count": results.len(),
        "results": results,
    })
}

pub fn image_url(id: &str) -> String {
    format!("https://img.example.org/{id}/original.jpg")
}

pub struct MockImages {
    pub result: ProbeResult,
    pub probes: Mutex<Vec<String>>,
    pub fetches: Mutex<Vec<String>>,
}

impl MockImages {
    pub fn new() -> Self {
        Self {
            result: ProbeResult {
                size_bytes: Some(2_048_000),
                dimensions: Some(Dimensions {
                    width: 1024,
                    height: 768,
                }),
            },
            probes: Mutex::new(Vec::new()),
            fetches: Mutex::new(Vec::new()),
        }
    }

    pub fn probed(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }
}

impl ImageClient for MockImages {
    fn probe(&self, url: &str) -> Result<ProbeResult, HarvestError> {
        self.probes.lock().unwrap().push(url.to_string());
        Ok(self.result)
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, HarvestError> {
        self.fetches.lock().unwrap().push(url.to_string());
        Ok(url.as_bytes().to_vec())
    }
}

/// Serves canned match and search payloads keyed by species and taxon key.
pub struct MockGbif {
    pub taxa: Vec<(String, u64, Value)>,
    pub searches: Mutex<Vec<String>>,
}

impl MockGbif {
    pub fn new(taxa: Vec<(&str, u64, Value)>) -> Self {
        Self {
            taxa: taxa
                .into_iter()
                .map(|(name, key, payload)| (name.to_string(), key, payload))
                .collect(),
            searches: Mutex::new(Vec::new()),
        }
    }
}

impl GbifClient for MockGbif {
    fn match_taxon(&self, species: &SpeciesName) -> Result<TaxonKey, HarvestError> {
        self.taxa
            .iter()
            .find(|(name, _, _)| name == species.as_str())
            .map(|(_, key, _)| TaxonKey::new(*key))
            .ok_or_else(|| HarvestError::TaxonNotFound(species.to_string()))
    }

    fn search_occurrences(&self, url: &str) -> Result<Value, HarvestError> {
        self.searches.lock().unwrap().push(url.to_string());
        self.taxa
            .iter()
            .find(|(_, key, _)| url.contains(&format!("taxon_key={key}")))
            .map(|(_, _, payload)| payload.clone())
            .ok_or_else(|| HarvestError::GbifStatus {
                status: 404,
                message: url.to_string(),
            })
    }
}
