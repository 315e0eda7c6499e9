//! Metadata record model for the remote service
//!
//! Records are validated at the boundary: a record that fails [`MetadataRecord::validate`]
//! is rejected before any multipart construction or network access.

use crate::error::{Error, Result};
use crate::utils::{file_size_mb, md5_checksum};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Reference to a file stored alongside a metadata record
///
/// Immutable once computed; only recomputed when the underlying file content
/// is regenerated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    /// Service-side file name, prefixed to avoid cross-deployment collisions
    #[serde(rename = "fileName")]
    pub file_name: String,

    /// File size in megabytes (byte size x 1e-6)
    #[serde(rename = "fileSize")]
    pub size_mb: f64,

    /// MD5 checksum of the file content as 32 lowercase hex characters
    #[serde(rename = "md5Checksum")]
    pub md5_checksum: String,
}

impl FileRef {
    /// Compute a file reference for a local file
    ///
    /// Streams the file through the checksum; the content is never held in
    /// memory as a whole.
    pub async fn compute(path: &Path, file_name: String) -> Result<Self> {
        let size = tokio::fs::metadata(path).await?.len();
        let checksum = md5_checksum(path).await?;
        Ok(Self {
            file_name,
            size_mb: file_size_mb(size),
            md5_checksum: checksum,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.file_name.is_empty() {
            return Err(Error::Validation("file name must not be empty".to_string()));
        }
        if self.md5_checksum.len() != 32
            || !self
                .md5_checksum
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(Error::Validation(format!(
                "checksum for {} must be 32 lowercase hex characters",
                self.file_name
            )));
        }
        if !self.size_mb.is_finite() || self.size_mb < 0.0 {
            return Err(Error::Validation(format!(
                "size for {} must be a non-negative number",
                self.file_name
            )));
        }
        Ok(())
    }
}

/// Time span covered by a record
///
/// Point captures use the same instant for both ends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimestampRange {
    /// First covered instant
    pub start: DateTime<FixedOffset>,
    /// Last covered instant
    pub stop: DateTime<FixedOffset>,
}

/// GeoJSON-style geometry of a record's location
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Geometry kind (e.g., "Point")
    #[serde(rename = "type")]
    pub kind: String,
    /// Coordinates in longitude, latitude order
    pub coordinates: [f64; 2],
}

/// Geographic location of the record's source sensor
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// GeoJSON geometry of the position
    pub geometry: Geometry,
}

impl Location {
    /// Build a point location from a latitude/longitude pair
    #[must_use]
    pub fn point(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            geometry: Geometry {
                kind: "Point".to_string(),
                coordinates: [longitude, latitude],
            },
        }
    }
}

/// A metadata record as stored by the remote service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Numeric device identifier assigned by the service
    #[serde(rename = "deviceID")]
    pub device_id: u32,

    /// Serial number of the source sensor
    #[serde(rename = "serialNumber")]
    pub serial_number: String,

    /// Time span covered by the record
    pub timestamp: TimestampRange,

    /// Geographic location of the source sensor
    pub location: Location,

    /// Files stored with the record, in upload order (at least one)
    pub files: Vec<FileRef>,

    /// Names of the files this record was derived from (empty for raw uploads)
    #[serde(rename = "sourceFiles", default)]
    pub source_files: Vec<String>,
}

impl MetadataRecord {
    /// Check the record's shape before it crosses the wire
    ///
    /// A record must reference at least one file, and every file reference
    /// must carry a usable name, checksum, and size.
    pub fn validate(&self) -> Result<()> {
        if self.files.is_empty() {
            return Err(Error::Validation(
                "metadata.files must contain at least one entry".to_string(),
            ));
        }
        for file in &self.files {
            file.validate()?;
        }
        Ok(())
    }
}

/// Response of the metadata search endpoint
#[derive(Clone, Debug, Deserialize)]
pub struct SearchResponse {
    /// Total number of matching records
    pub count: usize,
    /// The matching records
    pub data: Vec<MetadataRecord>,
}

/// Response of the asynchronous export endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct ExportTicket {
    /// One-time download URL for the export
    pub(crate) url: String,
}
