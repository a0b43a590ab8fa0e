use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

use crate::domain::{RecordType, ResultLimit, SpeciesName, TaxonKey};
use crate::error::HarvestError;

/// Filtered occurrence search for one taxon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceQuery {
    pub taxon_key: TaxonKey,
    pub limit: ResultLimit,
    pub image_only: bool,
    pub record_type: Option<RecordType>,
}

impl OccurrenceQuery {
    pub fn new(taxon_key: TaxonKey) -> Self {
        Self {
            taxon_key,
            limit: ResultLimit::Unlimited,
            image_only: true,
            record_type: None,
        }
    }

    pub fn to_url(&self, api_base: &str) -> String {
        let mut params = Vec::with_capacity(4);
        if self.image_only {
            params.push("media_type=StillImage".to_string());
        }
        params.push(format!("taxon_key={}", self.taxon_key));
        if let Some(limit) = self.limit.get() {
            params.push(format!("limit={limit}"));
        }
        if let Some(record_type) = self.record_type {
            params.push(format!("basisOfRecord={record_type}"));
        }
        format!("{api_base}/occurrence/search?{}", params.join("&"))
    }
}

pub fn species_match_url(api_base: &str, species: &SpeciesName) -> String {
    format!("{api_base}/species/match?name={}", species.url_encoded())
}

pub trait GbifClient: Send + Sync {
    fn match_taxon(&self, species: &SpeciesName) -> Result<TaxonKey, HarvestError>;
    fn search_occurrences(&self, url: &str) -> Result<Value, HarvestError>;
}

#[derive(Clone)]
pub struct GbifHttpClient {
    client: Client,
    api_base: String,
}

impl GbifHttpClient {
    pub fn new(api_base: &str) -> Result<Self, HarvestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("gbif-images/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| HarvestError::GbifHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| HarvestError::GbifHttp(err.to_string()))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn get_json(&self, url: &str) -> Result<Value, HarvestError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| HarvestError::GbifHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "GBIF request failed".to_string());
            return Err(HarvestError::GbifStatus { status, message });
        }
        response
            .json()
            .map_err(|err| HarvestError::GbifPayload(err.to_string()))
    }
}

impl GbifClient for GbifHttpClient {
    fn match_taxon(&self, species: &SpeciesName) -> Result<TaxonKey, HarvestError> {
        let url = species_match_url(&self.api_base, species);
        tracing::debug!(%url, "resolving taxon key");
        let payload = self.get_json(&url)?;
        taxon_key_from_match(&payload)
            .ok_or_else(|| HarvestError::TaxonNotFound(species.to_string()))
    }

    fn search_occurrences(&self, url: &str) -> Result<Value, HarvestError> {
        self.get_json(url)
    }
}

/// Reads `usageKey` from a species-match payload; absent when GBIF found no match.
pub fn taxon_key_from_match(payload: &Value) -> Option<TaxonKey> {
    payload
        .get("usageKey")
        .and_then(|value| value.as_u64())
        .map(TaxonKey::new)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const BASE: &str = "https://api.gbif.org/v1";

    #[test]
    fn default_query_filters_images() {
        let query = OccurrenceQuery::new(TaxonKey::new(5219243));
        assert_eq!(
            query.to_url(BASE),
            "https://api.gbif.org/v1/occurrence/search?media_type=StillImage&taxon_key=5219243"
        );
    }

    #[test]
    fn full_query_carries_every_filter() {
        let query = OccurrenceQuery {
            taxon_key: TaxonKey::new(5219243),
            limit: ResultLimit::AtMost(50),
            image_only: true,
            record_type: Some(RecordType::HumanObservation),
        };
        assert_eq!(
            query.to_url(BASE),
            "https://api.gbif.org/v1/occurrence/search?media_type=StillImage&taxon_key=5219243&limit=50&basisOfRecord=HUMAN_OBSERVATION"
        );
    }

    #[test]
    fn query_without_image_filter() {
        let query = OccurrenceQuery {
            image_only: false,
            ..OccurrenceQuery::new(TaxonKey::new(1))
        };
        assert_eq!(query.to_url(BASE), format!("{BASE}/occurrence/search?taxon_key=1"));
    }

    #[test]
    fn match_url_encodes_spaces() {
        let species: SpeciesName = "Vulpes vulpes".parse().unwrap();
        assert_eq!(
            species_match_url(BASE, &species),
            "https://api.gbif.org/v1/species/match?name=Vulpes%20vulpes"
        );
    }

    #[test]
    fn usage_key_extraction() {
        let found = json!({"usageKey": 5219243, "matchType": "EXACT"});
        assert_eq!(taxon_key_from_match(&found), Some(TaxonKey::new(5219243)));

        let missing = json!({"matchType": "NONE", "confidence": 100});
        assert_eq!(taxon_key_from_match(&missing), None);
    }
}
