use std::fs;
use std::io::Write;

use camino::Utf8Path;
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::error::HarvestError;
use crate::images::ImageClient;
use crate::table::ResultTable;

/// `{species}-{uuid}-{basename}`; the uuid keeps names unique across runs.
pub fn image_filename(species: &str, url: &str) -> String {
    let species = species.replace(['/', '\\'], "_");
    format!("{species}-{}-{}", Uuid::new_v4(), url_basename(url))
}

/// Final path segment of `url`, without query string or fragment.
pub fn url_basename(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name,
        _ => "image",
    }
}

pub struct ImageDownloader<'a, I: ImageClient + ?Sized> {
    images: &'a I,
    save_dir: &'a Utf8Path,
}

impl<'a, I: ImageClient + ?Sized> ImageDownloader<'a, I> {
    pub fn new(images: &'a I, save_dir: &'a Utf8Path) -> Self {
        Self { images, save_dir }
    }

    /// Downloads every row's image and records where it was written.
    pub fn save_all(&self, mut table: ResultTable) -> Result<ResultTable, HarvestError> {
        fs::create_dir_all(self.save_dir.as_std_path())
            .map_err(|err| HarvestError::Filesystem(format!("create {}: {err}", self.save_dir)))?;

        for row in table.rows_mut() {
            let species = row.species.clone().unwrap_or_default();
            let url = row
                .identifier()
                .ok_or_else(|| HarvestError::MissingImageUrl(species.clone()))?
                .to_string();
            let filename = image_filename(&species, &url);
            let path = self.save_dir.join(&filename);

            let bytes = self.images.fetch(&url)?;
            tracing::info!(%filename, bytes = bytes.len(), "saving image");
            write_atomic(self.save_dir, &path, &bytes)?;
            row.local_img_path = Some(path);
        }
        Ok(table)
    }
}

fn write_atomic(dir: &Utf8Path, path: &Utf8Path, bytes: &[u8]) -> Result<(), HarvestError> {
    let mut temp = NamedTempFile::new_in(dir.as_std_path())
        .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
    temp.write_all(bytes)
        .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| HarvestError::Filesystem(format!("write {path}: {}", err.error)))?;
    Ok(())
}
