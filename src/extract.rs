//! Flattening of occurrence search responses into image rows.
//!
//! Each occurrence contributes rows only through its multimedia extension.
//! When an occurrence carries more images than `img_num_per_record`, a
//! uniform sample without replacement is kept; when it carries fewer, all of
//! them are kept. Only the first selected image is probed and its size and
//! dimensions are copied to every row of the same occurrence. Rows without a
//! license or a species name are dropped at the end, and a response that ends
//! up with no rows at all is an error.

use rand::Rng;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::HarvestError;
use crate::images::ImageClient;
use crate::probe::ProbeResult;
use crate::table::{ImageRow, PARENT_FIELDS, ResultTable};

const MULTIMEDIA_EXTENSION: &str = "Multimedia";

#[derive(Debug, Deserialize)]
pub struct OccurrenceSearchResponse {
    pub results: Vec<OccurrenceRecord>,
    #[serde(default)]
    pub count: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct OccurrenceRecord {
    #[serde(default)]
    pub key: Option<u64>,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default, rename = "taxonKey")]
    pub taxon_key: Option<u64>,
    #[serde(default, rename = "basisOfRecord")]
    pub basis_of_record: Option<String>,
    #[serde(default)]
    pub extensions: Option<Map<String, Value>>,
}

impl OccurrenceRecord {
    fn multimedia_blocks(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.extensions
            .iter()
            .flat_map(|extensions| extensions.iter())
            .filter(|(name, _)| is_multimedia_extension(name))
    }
}

pub fn is_multimedia_extension(name: &str) -> bool {
    name.contains(MULTIMEDIA_EXTENSION)
}

/// Last segment of a namespaced key, e.g. `http://purl.org/dc/terms/license` -> `license`.
pub fn normalize_key(key: &str) -> &str {
    match key.rsplit(['/', '#', ':']).next() {
        Some(segment) if !segment.is_empty() => segment,
        _ => key,
    }
}

/// Keeps `amount` candidates drawn without replacement, or all of them when
/// there are not more than `amount`.
pub fn sample_rows<T, R: Rng + ?Sized>(candidates: Vec<T>, amount: usize, rng: &mut R) -> Vec<T> {
    if candidates.len() <= amount {
        return candidates;
    }
    let picked = rand::seq::index::sample(rng, candidates.len(), amount);
    let mut slots = candidates.into_iter().map(Some).collect::<Vec<_>>();
    picked
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect()
}

pub struct RecordExtractor<'a, I: ImageClient + ?Sized> {
    images: &'a I,
    img_num_per_record: usize,
}

impl<'a, I: ImageClient + ?Sized> RecordExtractor<'a, I> {
    pub fn new(images: &'a I, img_num_per_record: usize) -> Self {
        Self {
            images,
            img_num_per_record,
        }
    }

    pub fn extract<R: Rng + ?Sized>(
        &self,
        payload: &Value,
        api_url: &str,
        rng: &mut R,
    ) -> Result<ResultTable, HarvestError> {
        let response = OccurrenceSearchResponse::deserialize(payload)
            .map_err(|err| HarvestError::GbifPayload(err.to_string()))?;

        if response.results.is_empty() {
            tracing::info!(%api_url, "found no records");
            return Ok(ResultTable::new());
        }
        tracing::info!(
            records = response.results.len(),
            total = ?response.count,
            "found occurrence records"
        );

        let mut rows = Vec::new();
        for record in &response.results {
            for (name, block) in record.multimedia_blocks() {
                let Some(descriptors) = block.as_array() else {
                    tracing::debug!(extension = %name, occurrence = ?record.key, "skipping non-list extension");
                    continue;
                };
                let candidates = descriptors
                    .iter()
                    .filter_map(|descriptor| descriptor.as_object())
                    .map(|descriptor| build_row(descriptor, record, api_url))
                    .collect::<Vec<_>>();
                if candidates.is_empty() {
                    continue;
                }

                let mut selected = sample_rows(candidates, self.img_num_per_record, rng);
                let probe = self.probe_first(&selected)?;
                for row in &mut selected {
                    row.image_file_size_mb = probe.size_mb();
                    row.image_dimensions = probe.dimensions;
                }
                rows.extend(selected);
            }
        }

        rows.retain(|row| row.field("license").is_some() && row.species.is_some());
        if rows.is_empty() {
            return Err(HarvestError::NoImageRecords {
                api_url: api_url.to_string(),
            });
        }
        Ok(ResultTable::from_rows(rows))
    }

    // Images of one occurrence are assumed to share size and dimensions.
    fn probe_first(&self, rows: &[ImageRow]) -> Result<ProbeResult, HarvestError> {
        match rows.iter().find_map(|row| row.identifier()) {
            Some(url) => self.images.probe(url),
            None => Ok(ProbeResult::default()),
        }
    }
}

fn build_row(descriptor: &Map<String, Value>, record: &OccurrenceRecord, api_url: &str) -> ImageRow {
    let mut normalized = Map::with_capacity(descriptor.len());
    for (key, value) in descriptor {
        let key = normalize_key(key);
        if PARENT_FIELDS.contains(&key) {
            continue;
        }
        normalized.insert(key.to_string(), value.clone());
    }
    ImageRow {
        descriptor: normalized,
        species: record.species.clone(),
        sex: record.sex.clone(),
        taxon_key: record.taxon_key,
        basis_of_record: record.basis_of_record.clone(),
        api_url: api_url.to_string(),
        image_file_size_mb: None,
        image_dimensions: None,
        local_img_path: None,
    }
}
