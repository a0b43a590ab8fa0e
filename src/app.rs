use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::config::HarvestConfig;
use crate::domain::SpeciesName;
use crate::download::ImageDownloader;
use crate::error::HarvestError;
use crate::extract::RecordExtractor;
use crate::gbif::{GbifClient, OccurrenceQuery};
use crate::images::ImageClient;
use crate::table::ResultTable;

#[derive(Debug, Clone, Serialize)]
pub struct HarvestReport {
    pub table: ResultTable,
    pub image_count: usize,
    pub total_size_mb: f64,
    pub total_size_gb: f64,
    pub save_dir: Option<Utf8PathBuf>,
    pub finished_at: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Forwards progress to the `tracing` subscriber.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => tracing::info!(
                elapsed_ms = elapsed.as_millis() as u64,
                "{}",
                event.message
            ),
            None => tracing::info!("{}", event.message),
        }
    }
}

pub struct App<G: GbifClient, I: ImageClient> {
    config: HarvestConfig,
    gbif: G,
    images: I,
    rng: StdRng,
}

impl<G: GbifClient, I: ImageClient> App<G, I> {
    pub fn new(config: HarvestConfig, gbif: G, images: I) -> Result<Self, HarvestError> {
        config.validate()?;
        Ok(Self {
            config,
            gbif,
            images,
            rng: StdRng::from_os_rng(),
        })
    }

    /// Replaces the sampling source, e.g. with a seeded generator.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Image metadata for every configured species, concatenated in input order.
    /// The first failing species aborts the whole batch.
    pub fn get_occurrence_info(
        &mut self,
        sink: &dyn ProgressSink,
    ) -> Result<ResultTable, HarvestError> {
        let species = self.config.species.clone();
        let mut table = ResultTable::new();
        for name in &species {
            table.append(self.fetch_species(name, sink)?);
        }
        sink.event(ProgressEvent {
            message: format!(
                "phase=Extract; {} image rows for {} species",
                table.len(),
                species.len()
            ),
            elapsed: None,
        });
        Ok(table)
    }

    pub fn fetch_species(
        &mut self,
        species: &SpeciesName,
        sink: &dyn ProgressSink,
    ) -> Result<ResultTable, HarvestError> {
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; species {species}"),
            elapsed: None,
        });
        let taxon_key = self.gbif.match_taxon(species)?;

        let query = OccurrenceQuery {
            taxon_key,
            limit: self.config.limit,
            image_only: self.config.get_image_info,
            record_type: self.config.record_type,
        };
        let api_url = query.to_url(&self.config.api_base);
        tracing::info!(%api_url, %taxon_key, "built occurrence query");

        let start = Instant::now();
        let payload = self.gbif.search_occurrences(&api_url)?;
        sink.event(ProgressEvent {
            message: format!("gbif.response taxon_key={taxon_key}"),
            elapsed: Some(start.elapsed()),
        });

        let extractor = RecordExtractor::new(&self.images, self.config.img_num_per_record);
        let table = extractor.extract(&payload, &api_url, &mut self.rng)?;
        sink.event(ProgressEvent {
            message: format!("phase=Extract; {species}: {} image rows", table.len()),
            elapsed: Some(start.elapsed()),
        });
        Ok(table)
    }

    /// Downloads the images of `table` into the configured `save_dir`.
    pub fn save_images(
        &self,
        table: ResultTable,
        sink: &dyn ProgressSink,
    ) -> Result<ResultTable, HarvestError> {
        let save_dir = self.config.save_dir.as_deref().ok_or_else(|| {
            HarvestError::InvalidConfig("save_dir is required to save images".to_string())
        })?;
        self.save_images_to(table, save_dir, sink)
    }

    pub fn save_images_to(
        &self,
        table: ResultTable,
        save_dir: &Utf8Path,
        sink: &dyn ProgressSink,
    ) -> Result<ResultTable, HarvestError> {
        sink.event(ProgressEvent {
            message: format!("phase=Store; saving {} images to {save_dir}", table.len()),
            elapsed: None,
        });
        let start = Instant::now();
        let table = ImageDownloader::new(&self.images, save_dir).save_all(table)?;
        sink.event(ProgressEvent {
            message: format!("phase=Store; saved {} images", table.len()),
            elapsed: Some(start.elapsed()),
        });
        Ok(table)
    }

    /// Metadata for every species, then the images when `save_dir` is set.
    pub fn download_images(
        &mut self,
        sink: &dyn ProgressSink,
    ) -> Result<HarvestReport, HarvestError> {
        let mut table = self.get_occurrence_info(sink)?;
        if self.config.save_dir.is_some() {
            table = self.save_images(table, sink)?;
        }

        let total_size_mb = table.total_size_mb();
        let total_size_gb = total_size_mb / 1e3;
        sink.event(ProgressEvent {
            message: format!("Total size of images in this dataset: {total_size_gb} GB"),
            elapsed: None,
        });

        Ok(HarvestReport {
            image_count: table.len(),
            total_size_mb,
            total_size_gb,
            save_dir: self.config.save_dir.clone(),
            finished_at: chrono::Utc::now().to_rfc3339(),
            table,
        })
    }
}
