use camino::Utf8PathBuf;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::Dimensions;

/// Column names owned by the occurrence record rather than the image descriptor.
pub const PARENT_FIELDS: [&str; 5] = ["species", "sex", "taxonKey", "basisOfRecord", "api_url"];

/// One selected image, merged with the fields of the occurrence it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRow {
    /// Multimedia descriptor with namespace prefixes stripped from its keys.
    #[serde(flatten)]
    pub descriptor: Map<String, Value>,
    pub species: Option<String>,
    pub sex: Option<String>,
    #[serde(rename = "taxonKey")]
    pub taxon_key: Option<u64>,
    #[serde(rename = "basisOfRecord")]
    pub basis_of_record: Option<String>,
    pub api_url: String,
    #[serde(rename = "image_file_size_MB")]
    pub image_file_size_mb: Option<f64>,
    #[serde(rename = "image_dimensions_WxH")]
    pub image_dimensions: Option<Dimensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_img_path: Option<Utf8PathBuf>,
}

impl ImageRow {
    pub fn license(&self) -> Option<&str> {
        self.text_field("license")
    }

    /// Source URL of the image.
    pub fn identifier(&self) -> Option<&str> {
        self.text_field("identifier")
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.descriptor.get(key).filter(|value| !value.is_null())
    }

    fn text_field(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(|value| value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultTable {
    rows: Vec<ImageRow>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<ImageRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[ImageRow] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [ImageRow] {
        &mut self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageRow> {
        self.rows.iter()
    }

    /// Appends `other` after the existing rows, keeping both orders.
    pub fn append(&mut self, other: ResultTable) {
        self.rows.extend(other.rows);
    }

    /// Sum of the known file sizes; rows without a size are skipped.
    pub fn total_size_mb(&self) -> f64 {
        self.rows
            .iter()
            .filter_map(|row| row.image_file_size_mb)
            .sum()
    }

    pub fn into_rows(self) -> Vec<ImageRow> {
        self.rows
    }
}

impl IntoIterator for ResultTable {
    type Item = ImageRow;
    type IntoIter = std::vec::IntoIter<ImageRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultTable {
    type Item = &'a ImageRow;
    type IntoIter = std::slice::Iter<'a, ImageRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
