//! Raw capture ingestion
//!
//! Uploads locally captured sensor files as raw metadata records. Captures
//! are grouped by file stem: a sensor that produces `20240612083000.bag` and
//! `20240612083000.mkv` made both in one capture, so they share a record.
//! The stem doubles as the capture timestamp.

use crate::client::TransferClient;
use crate::config::SensorConfig;
use crate::error::{Error, Result};
use crate::records::{FileRef, Location, MetadataRecord, TimestampRange};
use crate::utils::{make_api_filename, parse_capture_timestamp};
use chrono::FixedOffset;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Upload raw capture files, one record per capture
///
/// Files sharing a stem are grouped into a single record whose timestamp is
/// parsed from the stem in the sensor's UTC offset. Identity and location
/// come from `sensor`; `source_files` is empty since raw records are not
/// derived from anything. Returns the uploaded records in capture order.
pub async fn upload_raw_files(
    client: &mut TransferClient,
    sensor: &SensorConfig,
    filename_prefix: &str,
    paths: &[PathBuf],
) -> Result<Vec<MetadataRecord>> {
    if paths.is_empty() {
        return Err(Error::Validation(
            "at least one capture file is required".to_string(),
        ));
    }

    let offset = sensor_offset(sensor)?;
    let captures = group_by_capture(paths)?;
    let mut uploaded = Vec::with_capacity(captures.len());

    for (capture_id, group) in captures {
        let time = parse_capture_timestamp(&capture_id, offset)?;

        let mut files = Vec::with_capacity(group.len());
        for path in &group {
            let api_name = make_api_filename(filename_prefix, path)?;
            files.push(FileRef::compute(path, api_name).await?);
        }

        let record = MetadataRecord {
            device_id: sensor.device_id,
            serial_number: sensor.serial_number.clone(),
            timestamp: TimestampRange {
                start: time,
                stop: time,
            },
            location: Location::point(sensor.latitude, sensor.longitude),
            files,
            source_files: Vec::new(),
        };

        let mut handles = Vec::with_capacity(group.len());
        for path in &group {
            handles.push(tokio::fs::File::open(path).await?);
        }
        client.upload_metadata(&record, handles).await?;
        info!(capture = %capture_id, files = group.len(), "raw capture uploaded");
        uploaded.push(record);
    }

    Ok(uploaded)
}

fn sensor_offset(sensor: &SensorConfig) -> Result<FixedOffset> {
    sensor
        .utc_offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            Error::config(
                format!(
                    "UTC offset out of range: {} minutes",
                    sensor.utc_offset_minutes
                ),
                Some("utc_offset_minutes"),
            )
        })
}

/// Group capture files by stem, keeping each group in input order
fn group_by_capture(paths: &[PathBuf]) -> Result<BTreeMap<String, Vec<PathBuf>>> {
    let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in paths {
        let stem = capture_id(path)?;
        groups.entry(stem).or_default().push(path.clone());
    }
    Ok(groups)
}

fn capture_id(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::Validation(format!("path has no usable file stem: {}", path.display())))
}
