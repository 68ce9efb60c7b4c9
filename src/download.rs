//! Label image download into a local cache directory.
//!
//! The transport is left to a [`LabelFetcher`] so callers can plug in any
//! HTTP client. Images are stored as `<bid>.<ext>` and never fetched twice.

use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::error::{LabelError, Result};
use crate::progress::Progress;
use crate::records::{BeerRecord, BeerRecords};

/// Placeholder served for beers without a label of their own.
pub const DEFAULT_LABEL_URL: &str =
    "https://d1c8v1qci5en44.cloudfront.net/site/assets/images/temp/badge-beer-default.png";

pub trait LabelFetcher {
    /// Fetch the raw bytes at `url`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub fetched: usize,
    /// No label, placeholder label, or already on disk
    pub skipped: usize,
    pub failed: Vec<String>,
}

/// Cache file name for a beer's label, or `None` when it has no real label.
pub fn label_file_name(record: &BeerRecord) -> Option<String> {
    let url = record.label.trim();
    if url.is_empty() || url == DEFAULT_LABEL_URL {
        return None;
    }
    let last_segment = url.rsplit('/').next().unwrap_or(url);
    let extension = last_segment.rsplit('.').next().unwrap_or(last_segment);
    Some(format!("{}.{}", record.bid, extension))
}

/// Download every missing label of `records` into `dir`.
///
/// Failed fetches are logged and listed in the summary, never retried.
pub fn download_labels(
    records: &BeerRecords,
    dir: &Path,
    fetcher: &impl LabelFetcher,
) -> Result<DownloadSummary> {
    fs::create_dir_all(dir).map_err(|e| LabelError::io(dir, e))?;

    let mut summary = DownloadSummary::default();
    let mut progress = Progress::new(records.len(), "Downloading images...");

    for record in records.iter() {
        progress.tick();
        let Some(file_name) = label_file_name(record) else {
            summary.skipped += 1;
            continue;
        };
        let path = dir.join(&file_name);
        if path.exists() {
            summary.skipped += 1;
            continue;
        }

        match fetcher.fetch(&record.label) {
            Ok(bytes) => {
                fs::write(&path, bytes).map_err(|e| LabelError::io(&path, e))?;
                summary.fetched += 1;
            }
            Err(err) => {
                warn!("Label of beer {} not downloaded: {err}", record.bid);
                summary.failed.push(record.bid.clone());
            }
        }
    }

    info!(
        "Downloaded {} labels, skipped {}, failed {}",
        summary.fetched,
        summary.skipped,
        summary.failed.len()
    );
    Ok(summary)
}
