//! Remote package metadata: license names published for `groupId:artifactId` identifiers.
//!
//! Identifiers are sent in batches of at most [`MAX_BATCH_SIZE`]. Oversized or
//! malformed batches are rejected before anything is sent, and a failing batch
//! only loses its own identifiers.

pub mod maven;

use std::collections::{BTreeSet, HashMap};

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::error::MetadataError;
use crate::license::detection::DetectionManager;
use crate::models::{PackageDependency, RemoteInfo};

pub const MAX_BATCH_SIZE: usize = 25;

static COORDINATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_.\-]+:[A-Za-z0-9_.\-]+$").expect("valid coordinate regex")
});

/// Published license names of one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteLicenseRecord {
    pub identifier: String,
    pub main_license: Option<String>,
    pub other_licenses: Vec<String>,
}

impl RemoteLicenseRecord {
    /// First name is the main license, the rest are others.
    pub fn from_names(identifier: &str, mut names: Vec<String>) -> Self {
        let main_license = if names.is_empty() {
            None
        } else {
            Some(names.remove(0))
        };
        Self {
            identifier: identifier.to_string(),
            main_license,
            other_licenses: names,
        }
    }
}

pub trait MetadataClient: Send + Sync {
    fn fetch_batch<'a>(
        &'a self,
        identifiers: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<RemoteLicenseRecord>, MetadataError>>;
}

pub fn validate_batch(identifiers: &[String]) -> Result<(), MetadataError> {
    if identifiers.len() > MAX_BATCH_SIZE {
        return Err(MetadataError::BatchTooLarge {
            size: identifiers.len(),
            max: MAX_BATCH_SIZE,
        });
    }
    match identifiers.iter().find(|id| !COORDINATE.is_match(id)) {
        Some(bad) => Err(MetadataError::MalformedCoordinate(bad.clone())),
        None => Ok(()),
    }
}

/// Fetch records for `identifiers`, keyed by lowercased identifier.
///
/// Duplicates are dropped, the rest is chunked by the configured batch size and
/// the chunks run concurrently. Invalid or failing chunks are logged and skipped.
pub async fn fetch_remote_info(
    client: &dyn MetadataClient,
    identifiers: &[String],
    config: &RemoteConfig,
    progress: Option<&ProgressBar>,
) -> HashMap<String, RemoteLicenseRecord> {
    let unique: Vec<String> = identifiers
        .iter()
        .map(|id| id.trim().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let batches: Vec<Vec<String>> = unique
        .chunks(config.effective_batch_size())
        .map(<[String]>::to_vec)
        .filter(|batch| match validate_batch(batch) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, size = batch.len(), "skipping metadata batch");
                if let Some(pb) = progress {
                    pb.inc(batch.len() as u64);
                }
                false
            }
        })
        .collect();

    let results: Vec<_> = stream::iter(
        batches
            .iter()
            .map(|batch| async move { (batch.len(), client.fetch_batch(batch).await) })
            .collect::<Vec<_>>(),
    )
        .buffer_unordered(config.max_concurrent_batches.max(1))
        .collect()
        .await;

    let mut records = HashMap::new();
    for (size, result) in results {
        if let Some(pb) = progress {
            pb.inc(size as u64);
        }
        match result {
            Ok(batch) => {
                for record in batch {
                    records.insert(record.identifier.to_lowercase(), record);
                }
            }
            Err(e) => warn!(error = %e, size, "metadata batch failed"),
        }
    }
    debug!(requested = unique.len(), received = records.len(), "fetched remote metadata");
    records
}

/// Attach fetched records to the matching dependencies, resolving each name.
pub fn apply_remote_info(
    dependencies: &mut [PackageDependency],
    records: &HashMap<String, RemoteLicenseRecord>,
    detection: &DetectionManager,
) {
    for dependency in dependencies {
        let Some(record) = records.get(&dependency.identifier()) else {
            continue;
        };
        dependency.remote_info = Some(RemoteInfo {
            main_license: record
                .main_license
                .as_deref()
                .map(|name| detection.detect_by_name_or_spdx(name))
                .filter(|l| !l.is_no_license()),
            other_licenses: record
                .other_licenses
                .iter()
                .map(|name| detection.detect_by_name_or_spdx(name))
                .filter(|l| !l.is_no_license())
                .collect(),
        });
    }
}
