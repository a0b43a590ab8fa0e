use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HarvestError {
    #[error("invalid species name: {0:?}")]
    InvalidSpecies(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("missing config file gbif-images.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("no taxon key found for species {0}")]
    #[diagnostic(help("check the spelling of the scientific name"))]
    TaxonNotFound(String),

    #[error("GBIF request failed: {0}")]
    GbifHttp(String),

    #[error("GBIF returned status {status}: {message}")]
    GbifStatus { status: u16, message: String },

    #[error("malformed GBIF response: {0}")]
    GbifPayload(String),

    #[error("image request failed: {0}")]
    ImageHttp(String),

    #[error("image request to {url} returned status {status}")]
    ImageStatus { status: u16, url: String },

    #[error("no licensed image records with a species name for query {api_url}")]
    NoImageRecords { api_url: String },

    #[error("row for species {0} has no image identifier to download")]
    MissingImageUrl(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
