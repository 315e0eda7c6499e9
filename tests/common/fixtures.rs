//! Fixtures shared by the integration tests

use async_trait::async_trait;
use sensor_relay::{Config, Executor, PollConfig, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Token expiry far enough in the future that no refresh is ever due
pub const FAR_FUTURE_EXPIRY: &str = "2030-01-01T00:00:00Z";

/// Access token written by [`write_credentials`]
pub const TEST_ACCESS_TOKEN: &str = "access-0";

/// Write a valid credential file with a far-future expiry
pub async fn write_credentials(dir: &Path) -> PathBuf {
    let path = dir.join("api_config.json");
    let json = serde_json::json!({
        "current_access_token": TEST_ACCESS_TOKEN,
        "current_refresh_token": "refresh-0",
        "current_token_expiry": FAR_FUTURE_EXPIRY,
    });
    tokio::fs::write(&path, serde_json::to_vec_pretty(&json).unwrap())
        .await
        .unwrap();
    path
}

/// Build a config pointed at a mock server, with fast polling for tests
pub fn test_config(base_url: &str, credentials_path: PathBuf) -> Config {
    Config {
        credentials_path,
        poll: PollConfig {
            interval: Duration::from_millis(25),
            max_wait: Duration::from_millis(500),
        },
        ..Config::new(Url::parse(base_url).unwrap())
    }
}

/// JSON for a source metadata record referencing the given file names
pub fn source_record_json(files: &[&str]) -> serde_json::Value {
    let file_refs: Vec<serde_json::Value> = files
        .iter()
        .map(|name| {
            serde_json::json!({
                "fileName": name,
                "fileSize": 1.5,
                "md5Checksum": "900150983cd24fb0d6963f7d28e17f72",
            })
        })
        .collect();
    serde_json::json!({
        "deviceID": 8220,
        "serialNumber": "d49a6930-7ab7-450f-afad-c38cff2f8109",
        "timestamp": {
            "start": "2024-06-12T08:30:00+02:00",
            "stop": "2024-06-12T08:35:00+02:00",
        },
        "location": {
            "latitude": 50.9295304,
            "longitude": 6.8947454,
            "geometry": {
                "type": "Point",
                "coordinates": [6.8947454, 50.9295304],
            },
        },
        "files": file_refs,
        "sourceFiles": [],
    })
}

/// Build an in-memory ZIP archive from name/content pairs
pub fn build_zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        for (name, content) in entries {
            writer
                .start_file(*name, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

/// Executor stub that writes fixed result files into the output directory
pub struct WriteFilesExecutor {
    /// Relative path and content of each result file to write
    pub results: Vec<(String, Vec<u8>)>,
}

#[async_trait]
impl Executor for WriteFilesExecutor {
    async fn run(&self, _input_dir: &Path, output_dir: &Path) -> Result<()> {
        for (name, content) in &self.results {
            let path = output_dir.join(name);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, content).await?;
        }
        Ok(())
    }
}

/// Executor stub that always fails
pub struct FailingExecutor;

#[async_trait]
impl Executor for FailingExecutor {
    async fn run(&self, _input_dir: &Path, _output_dir: &Path) -> Result<()> {
        Err(sensor_relay::Error::Runtime(
            "executor exited with Some(1): boom".to_string(),
        ))
    }
}
