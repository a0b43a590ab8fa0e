use std::io::{self, Write};

use camino::Utf8Path;
use serde::Serialize;

use crate::app::{HarvestReport, ProgressEvent, ProgressSink};
use crate::error::HarvestError;
use crate::table::ResultTable;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_table(table: &ResultTable) -> io::Result<()> {
        Self::print_json(table)
    }

    pub fn print_report(report: &HarvestReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn write_to_file<T: Serialize>(value: &T, path: &Utf8Path) -> Result<(), HarvestError> {
        let json = serde_json::to_vec_pretty(value)
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            std::fs::create_dir_all(parent.as_std_path())
                .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        }
        std::fs::write(path.as_std_path(), json)
            .map_err(|err| HarvestError::Filesystem(format!("write {path}: {err}")))
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}
