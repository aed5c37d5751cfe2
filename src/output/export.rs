//! JSON export of a run's records

use crate::harvest::{Business, HarvestReport};
use crate::HarvestError;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Shape of an export file
#[derive(Debug, Serialize)]
pub struct ExportDocument<'a> {
    pub query: &'a str,
    pub location: &'a str,
    pub requested: usize,
    pub achieved: usize,
    pub complete: bool,
    pub exported_at: String,
    pub records: &'a [Business],
}

impl<'a> ExportDocument<'a> {
    pub fn from_report(report: &'a HarvestReport) -> Self {
        Self {
            query: &report.query,
            location: &report.location,
            requested: report.requested,
            achieved: report.achieved(),
            complete: report.is_complete(),
            exported_at: chrono::Utc::now().to_rfc3339(),
            records: &report.records,
        }
    }
}

/// Writes the records of a run to `path` as pretty-printed JSON
pub fn export_json(report: &HarvestReport, path: &Path) -> Result<(), HarvestError> {
    let document = ExportDocument::from_report(report);

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &document)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    tracing::info!("Exported {} records to {}", document.achieved, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::{HarvestStatus, ReconcileSummary, RunStats, StopReason};
    use std::time::Duration;
    use tempfile::TempDir;

    fn report(records: Vec<Business>, requested: usize) -> HarvestReport {
        HarvestReport {
            query: "dentists".to_string(),
            location: "Austin, TX".to_string(),
            requested,
            status: HarvestStatus::from_counts(records.len(), requested),
            records,
            start_cursor: 0,
            cursor: 4,
            stop_reason: StopReason::TargetMet,
            stats: RunStats::default(),
            reconciliation: ReconcileSummary::default(),
            session_id: Some(1),
            elapsed: Duration::from_secs(3),
        }
    }

    #[test]
    fn test_export_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let business = Business {
            identifier: "https://www.google.com/maps/place/a".to_string(),
            name: "Acme Dental".to_string(),
            address: "1 Main St".to_string(),
            phone: "+15125550100".to_string(),
            rating: Some(4.5),
            ..Default::default()
        };

        export_json(&report(vec![business.clone()], 2), &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["query"], "dentists");
        assert_eq!(value["requested"], 2);
        assert_eq!(value["achieved"], 1);
        assert_eq!(value["complete"], false);

        let records: Vec<Business> = serde_json::from_value(value["records"].clone()).unwrap();
        assert_eq!(records, vec![business]);
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.json");

        assert!(matches!(
            export_json(&report(vec![], 0), &path),
            Err(HarvestError::Io(_))
        ));
    }
}
