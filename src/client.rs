//! Transfer protocol against the remote metadata service
//!
//! [`TransferClient`] implements the three wire operations: metadata search,
//! multipart upload, and asynchronous-export download with bounded polling.
//! Credentials are refreshed transparently before every network call.

use crate::config::{Config, PollConfig};
use crate::credentials::{ACCESS_TOKEN_HEADER, CredentialStore};
use crate::error::{Error, Result};
use crate::records::{ExportTicket, MetadataRecord, SearchResponse};
use crate::utils::endpoint;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Client for the remote metadata service
///
/// Owns the HTTP connection pool and the [`CredentialStore`]; a base URL
/// override in the credential file takes precedence over the configured one.
pub struct TransferClient {
    http: reqwest::Client,
    base_url: Url,
    user_agent: String,
    poll: PollConfig,
    store: CredentialStore,
    cancel: CancellationToken,
}

impl TransferClient {
    /// Create a client, loading credentials from the configured path
    pub async fn new(config: &Config) -> Result<Self> {
        let store = CredentialStore::load(&config.credentials_path).await?;
        let base_url = store
            .base_url()
            .cloned()
            .unwrap_or_else(|| config.base_url.clone());
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self {
            http,
            base_url,
            user_agent: config.user_agent.clone(),
            poll: config.poll.clone(),
            store,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that aborts an in-flight download poll when cancelled
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The credential store backing this client
    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.store
    }

    /// Effective API base URL
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn ensure_fresh(&mut self) -> Result<()> {
        self.store
            .ensure_fresh(&self.http, &self.base_url, &self.user_agent)
            .await
    }

    /// Search metadata records
    ///
    /// `params` are passed through as query parameters (e.g.
    /// `white_list=id1,id2`).
    pub async fn search_metadata(&mut self, params: &[(&str, &str)]) -> Result<SearchResponse> {
        self.ensure_fresh().await?;
        let url = endpoint(&self.base_url, "search/metadata");
        let response = self
            .http
            .get(&url)
            .query(params)
            .header(ACCESS_TOKEN_HEADER, self.store.access_token())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http { status, url });
        }
        let body: SearchResponse = response.json().await?;
        debug!(count = body.count, "metadata search");
        Ok(body)
    }

    /// Upload a metadata record together with its files
    ///
    /// The multipart body carries the serialized record as its first part and
    /// the file streams in `metadata.files` order after it, each named by the
    /// matching [`FileRef::file_name`](crate::FileRef). Files are streamed;
    /// the body is never buffered in memory as a whole. All handles are
    /// released once the upload completes or fails.
    ///
    /// Rejected with a validation error before any network access when
    /// `files` is empty, its length differs from `metadata.files`, or the
    /// record itself is malformed.
    pub async fn upload_metadata(
        &mut self,
        metadata: &MetadataRecord,
        files: Vec<tokio::fs::File>,
    ) -> Result<()> {
        if files.is_empty() {
            return Err(Error::Validation(
                "at least one file is required".to_string(),
            ));
        }
        if files.len() != metadata.files.len() {
            return Err(Error::Validation(format!(
                "metadata.files has {} entries but {} files were provided",
                metadata.files.len(),
                files.len()
            )));
        }
        metadata.validate()?;

        self.ensure_fresh().await?;

        let document = serde_json::to_string(metadata)?;
        let mut form = Form::new().part(
            "file1",
            Part::text(document)
                .file_name("metadata.json")
                .mime_str("application/json")?,
        );
        for (index, (file_ref, file)) in metadata.files.iter().zip(files).enumerate() {
            let part = Part::stream(reqwest::Body::wrap_stream(ReaderStream::new(file)))
                .file_name(file_ref.file_name.clone());
            form = form.part(format!("file{}", index + 2), part);
        }

        let url = endpoint(&self.base_url, "metadata");
        let response = self
            .http
            .post(&url)
            .header(ACCESS_TOKEN_HEADER, self.store.access_token())
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http { status, url });
        }
        info!(files = metadata.files.len(), "metadata record uploaded");
        Ok(())
    }

    /// Download an export of the matching records to `target`
    ///
    /// Requests an asynchronous export and polls its one-time URL: 202 means
    /// the export is not ready yet, so the client sleeps for the configured
    /// interval and retries until the maximum wait elapses (timeout error) or
    /// the cancellation token fires. A success response is streamed to disk
    /// in bounded-size chunks.
    pub async fn download_metadata(&mut self, params: &[(&str, &str)], target: &Path) -> Result<()> {
        self.ensure_fresh().await?;
        let url = endpoint(&self.base_url, "download/metadata");
        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("wait", "false")])
            .header(ACCESS_TOKEN_HEADER, self.store.access_token())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http { status, url });
        }
        let ticket: ExportTicket = response.json().await?;
        debug!(url = %ticket.url, "export requested");

        let started = tokio::time::Instant::now();
        loop {
            let response = self.http.get(&ticket.url).send().await?;
            let status = response.status();

            if status == StatusCode::ACCEPTED {
                let waited = started.elapsed();
                if waited >= self.poll.max_wait {
                    warn!(?waited, "export still not ready, giving up");
                    return Err(Error::Timeout {
                        url: ticket.url,
                        waited,
                    });
                }
                debug!(?waited, interval = ?self.poll.interval, "export not ready yet");
                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(self.poll.interval) => {}
                }
                continue;
            }
            if !status.is_success() {
                return Err(Error::Http {
                    status,
                    url: ticket.url,
                });
            }

            let mut file = tokio::fs::File::create(target).await?;
            let mut response = response;
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            info!(target = %target.display(), "export downloaded");
            return Ok(());
        }
    }
}
