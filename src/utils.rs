//! Utility functions for checksums, file naming, and capture timestamps

use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use std::path::Path;
use tokio::io::AsyncReadExt;
use url::Url;

/// Block size used when streaming files through the checksum
const CHECKSUM_BLOCK_SIZE: usize = 64 * 1024;

/// Format of capture timestamps embedded in raw file names
const CAPTURE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Compute the MD5 checksum of a file as 32 lowercase hex characters
///
/// The file is streamed through the hasher in fixed-size blocks; it is never
/// loaded into memory as a whole.
pub async fn md5_checksum(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut context = md5::Context::new();
    let mut block = vec![0u8; CHECKSUM_BLOCK_SIZE];
    loop {
        let n = file.read(&mut block).await?;
        if n == 0 {
            break;
        }
        context.consume(&block[..n]);
    }
    Ok(format!("{:x}", context.compute()))
}

/// Convert a byte count to megabytes as reported in file metadata
#[must_use]
pub fn file_size_mb(bytes: u64) -> f64 {
    bytes as f64 * 1e-6
}

/// Build the service-side file name for a local path
///
/// Prepends the configured deployment prefix so names from different
/// deployments cannot collide. The result depends only on the input: the
/// same path always yields the same name, and an already-prefixed name
/// passes through unchanged.
pub fn make_api_filename(prefix: &str, path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Validation(format!("path has no usable file name: {}", path.display())))?;
    if prefix.is_empty() || name.starts_with(prefix) {
        Ok(name.to_string())
    } else {
        Ok(format!("{prefix}{name}"))
    }
}

/// Parse a capture timestamp from a raw file stem
///
/// Raw sensor captures are named `YYYYMMDDHHMMSS.<ext>` in the sensor's
/// local time; `offset` fixes the zone interpretation.
pub fn parse_capture_timestamp(stem: &str, offset: FixedOffset) -> Result<DateTime<FixedOffset>> {
    let naive = NaiveDateTime::parse_from_str(stem, CAPTURE_TIMESTAMP_FORMAT)
        .map_err(|e| Error::Validation(format!("unrecognized capture timestamp {stem:?}: {e}")))?;
    naive
        .and_local_timezone(offset)
        .single()
        .ok_or_else(|| Error::Validation(format!("ambiguous capture timestamp {stem:?}")))
}

/// Join an endpoint path onto the API base URL
///
/// Plain string concatenation rather than `Url::join`, which would drop the
/// final path segment of a base URL without a trailing slash.
pub(crate) fn endpoint(base: &Url, path: &str) -> String {
    format!("{}/{}", base.as_str().trim_end_matches('/'), path)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_checksum_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.bag");
        tokio::fs::write(&path, b"sensor payload bytes").await.unwrap();

        let first = md5_checksum(&path).await.unwrap();
        let second = md5_checksum(&path).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_checksum_known_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        tokio::fs::write(&path, b"abc").await.unwrap();

        // Well-known MD5 of "abc"
        let digest = md5_checksum(&path).await.unwrap();
        assert_eq!(digest, "900150983cd24fb0d6963f7d28e17f72");
    }

    #[tokio::test]
    async fn test_checksum_streams_multiple_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("large.bin");
        // Larger than one checksum block to exercise the streaming loop
        let content = vec![0xABu8; CHECKSUM_BLOCK_SIZE * 2 + 17];
        tokio::fs::write(&path, &content).await.unwrap();

        let streamed = md5_checksum(&path).await.unwrap();
        let whole = format!("{:x}", md5::compute(&content));
        assert_eq!(streamed, whole);
    }

    #[test]
    fn test_file_size_mb() {
        assert_eq!(file_size_mb(0), 0.0);
        assert_eq!(file_size_mb(1_000_000), 1.0);
        assert_eq!(file_size_mb(2_500_000), 2.5);
    }

    #[test]
    fn test_make_api_filename_is_idempotent() {
        let path = PathBuf::from("/data/raw/20240612083000.bag");
        let first = make_api_filename("Station-7-", &path).unwrap();
        let second = make_api_filename("Station-7-", &path).unwrap();
        assert_eq!(first, "Station-7-20240612083000.bag");
        assert_eq!(first, second);

        // Already-prefixed names are not prefixed again
        let prefixed = PathBuf::from("Station-7-20240612083000.bag");
        assert_eq!(
            make_api_filename("Station-7-", &prefixed).unwrap(),
            "Station-7-20240612083000.bag"
        );
    }

    #[test]
    fn test_make_api_filename_without_prefix() {
        let path = PathBuf::from("/data/raw/20240612083000.mkv");
        assert_eq!(make_api_filename("", &path).unwrap(), "20240612083000.mkv");
    }

    #[test]
    fn test_parse_capture_timestamp() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let ts = parse_capture_timestamp("20240612083000", offset).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-06-12T08:30:00+02:00");
    }

    #[test]
    fn test_parse_capture_timestamp_rejects_garbage() {
        let offset = FixedOffset::east_opt(0).unwrap();
        assert!(matches!(
            parse_capture_timestamp("notatimestamp", offset),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_endpoint_preserves_base_path() {
        let base = Url::parse("https://metadata.example.org/api/v1").unwrap();
        assert_eq!(
            endpoint(&base, "token/refresh"),
            "https://metadata.example.org/api/v1/token/refresh"
        );

        let with_slash = Url::parse("https://metadata.example.org/api/v1/").unwrap();
        assert_eq!(
            endpoint(&with_slash, "metadata"),
            "https://metadata.example.org/api/v1/metadata"
        );
    }
}
