//! # sensor-relay
//!
//! Client library for a remote sensor-metadata service.
//!
//! The library covers three tightly coupled responsibilities:
//! - **Credential lifecycle** — load the persisted token triple, refresh it
//!   when due, and persist every replacement atomically
//!   ([`CredentialStore`])
//! - **Transfer protocol** — metadata search, multipart upload, and
//!   asynchronous-export download with bounded polling ([`TransferClient`])
//! - **Step orchestration** — resolve source records, stage their files,
//!   hand off to an external executor, harvest its results, and publish a
//!   derived record linked to its sources ([`StepRunner`])
//!
//! ## Quick Start
//!
//! ```no_run
//! use sensor_relay::{CommandExecutor, Config, StepRunner, TransferClient};
//! use std::path::PathBuf;
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         credentials_path: PathBuf::from("api_config.json"),
//!         ..Config::new(Url::parse("https://metadata.example.org/api/v1")?)
//!     };
//!
//!     let mut client = TransferClient::new(&config).await?;
//!     let executor = CommandExecutor::new(PathBuf::from("steps/denoise/run"));
//!
//!     let record = StepRunner::new(&mut client, executor)
//!         .run(&["id-1".to_string(), "id-2".to_string()])
//!         .await?;
//!     println!("published {} result files", record.files.len());
//!     Ok(())
//! }
//! ```
//!
//! Each run is single-threaded and linear; the only suspension points are
//! network I/O and the fixed-interval sleep while waiting for an export.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Transfer protocol against the remote service
pub mod client;
/// Configuration types
pub mod config;
/// Credential lifecycle management
pub mod credentials;
/// Error types
pub mod error;
/// Executor abstraction for processing steps
pub mod executor;
/// Export archive extraction
pub mod extract;
/// Raw capture ingestion
pub mod ingest;
/// Metadata record model
pub mod records;
/// Step-orchestration pipeline
pub mod step;
/// Checksum, naming, and timestamp helpers
pub mod utils;

// Re-export commonly used types
pub use client::TransferClient;
pub use config::{Config, PollConfig, SensorConfig};
pub use credentials::{Credential, CredentialStore};
pub use error::{Error, Result};
pub use executor::{CommandExecutor, Executor};
pub use ingest::upload_raw_files;
pub use records::{FileRef, Geometry, Location, MetadataRecord, SearchResponse, TimestampRange};
pub use step::StepRunner;
