//! Single-step processing pipeline
//!
//! One [`StepRunner`] invocation performs one linear run: resolve the source
//! records, stage their files locally, hand off to the executor, harvest its
//! results, and publish a derived record linked back to its sources. There is
//! no partial-success state: either the derived record is fully uploaded or
//! nothing is published.

use crate::client::TransferClient;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::extract::extract_archive;
use crate::records::{FileRef, MetadataRecord};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Orchestrator of one processing-step run
pub struct StepRunner<'a, E: Executor> {
    client: &'a mut TransferClient,
    executor: E,
}

impl<'a, E: Executor> StepRunner<'a, E> {
    /// Create a runner around a transfer client and an executor
    pub fn new(client: &'a mut TransferClient, executor: E) -> Self {
        Self { client, executor }
    }

    /// Execute one processing step over the given source records
    ///
    /// The search must resolve exactly the requested records; a count
    /// mismatch aborts the run before anything is staged. The transient
    /// working area is deleted on every exit path, success or failure.
    /// Returns the published derived record.
    pub async fn run(&mut self, source_ids: &[String]) -> Result<MetadataRecord> {
        if source_ids.is_empty() {
            return Err(Error::Validation(
                "at least one source record id is required".to_string(),
            ));
        }

        // Working area lives for exactly one run; dropping the guard removes
        // it even when an early stage fails.
        let workdir = tempfile::tempdir()?;
        let in_dir = workdir.path().join("in");
        let out_dir = workdir.path().join("out");
        tokio::fs::create_dir(&in_dir).await?;
        tokio::fs::create_dir(&out_dir).await?;

        // Resolve
        let white_list = source_ids.join(",");
        let search = self
            .client
            .search_metadata(&[("white_list", white_list.as_str())])
            .await?;
        if search.count != source_ids.len() {
            return Err(Error::Runtime(format!(
                "expected {} source records, search returned {}",
                source_ids.len(),
                search.count
            )));
        }
        info!(records = search.count, "source records resolved");

        // Every file name the sources reference becomes part of the derived
        // record's provenance, sorted and deduplicated.
        let source_files: Vec<String> = search
            .data
            .iter()
            .flat_map(|record| record.files.iter())
            .map(|file| file.file_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        // Stage
        let archive_path = in_dir.join("raw.zip");
        self.client
            .download_metadata(&[("white_list", white_list.as_str())], &archive_path)
            .await?;
        extract_archive(&archive_path, &in_dir)?;
        tokio::fs::remove_file(&archive_path).await?;
        debug!(in_dir = %in_dir.display(), "sources staged");

        // Execute
        self.executor.run(&in_dir, &out_dir).await?;

        // Harvest
        let result_paths = collect_regular_files(&out_dir)?;
        if result_paths.is_empty() {
            return Err(Error::Runtime(
                "at least one result file is expected, got 0".to_string(),
            ));
        }
        let mut files = Vec::with_capacity(result_paths.len());
        for path in &result_paths {
            files.push(FileRef::compute(path, result_file_name(path)?).await?);
        }
        info!(results = files.len(), "executor results harvested");

        // Derive: identity fields come from the first source record verbatim
        let source = search.data.first().ok_or_else(|| {
            Error::Runtime("search returned a matching count but no records".to_string())
        })?;
        let derived = MetadataRecord {
            device_id: source.device_id,
            serial_number: source.serial_number.clone(),
            timestamp: source.timestamp.clone(),
            location: source.location.clone(),
            files,
            source_files,
        };

        // Publish
        let mut handles = Vec::with_capacity(result_paths.len());
        for path in &result_paths {
            handles.push(tokio::fs::File::open(path).await?);
        }
        self.client.upload_metadata(&derived, handles).await?;
        info!(
            files = derived.files.len(),
            sources = derived.source_files.len(),
            "derived record published"
        );

        Ok(derived)
    }
}

fn result_file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::Runtime(format!("result file has no usable name: {}", path.display())))
}

/// Recursively enumerate regular files under a directory, sorted by path
fn collect_regular_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}
