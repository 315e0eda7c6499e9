//! Credential lifecycle: load, conditional refresh, persist
//!
//! The service issues a short-lived access token together with a longer-lived
//! refresh token and an expiry. [`CredentialStore`] owns that triple and its
//! on-disk copy; the triple is only ever replaced as a unit, and every
//! replacement is persisted immediately.
//!
//! The persisted file is shared mutable state with a single-writer
//! assumption: concurrent processes sharing one credential path may race on
//! refresh-and-persist, so each credential file must have a single active
//! client.

use crate::error::{Error, Result};
use crate::utils::endpoint;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// Wire format of token expiry timestamps
const EXPIRY_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Header carrying the access or refresh token
pub(crate) const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// The token triple issued by the service
#[derive(Clone, Debug, PartialEq)]
pub struct Credential {
    /// Short-lived token presented on every authenticated request
    pub access_token: String,
    /// Longer-lived token used solely to obtain a new access token
    pub refresh_token: String,
    /// Stated expiry of the access token
    pub expiry: DateTime<Utc>,
}

/// On-disk layout of the credential file
#[derive(Serialize, Deserialize)]
struct PersistedCredentials {
    current_access_token: String,
    current_refresh_token: String,
    current_token_expiry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<Url>,
}

/// Body of a successful `/token/refresh` response
#[derive(Deserialize)]
struct RefreshResponse {
    token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
    expiry: String,
}

/// Owner of the persisted token triple
///
/// Loaded once from the credential file; mutated only by a successful
/// refresh, and persisted atomically after every mutation.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    credential: Credential,
    base_url: Option<Url>,
}

impl CredentialStore {
    /// Load credentials from the given file
    ///
    /// Fails with a configuration error when the file is missing, unreadable,
    /// or lacks any of the required fields.
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::config(
                format!("cannot read credential file {}: {}", path.display(), e),
                None,
            )
        })?;
        let persisted: PersistedCredentials = serde_json::from_str(&raw).map_err(|e| {
            Error::config(
                format!("invalid credential file {}: {}", path.display(), e),
                None,
            )
        })?;
        let expiry = parse_expiry(&persisted.current_token_expiry).map_err(|e| {
            Error::config(
                format!("invalid credential file {}: {}", path.display(), e),
                Some("current_token_expiry"),
            )
        })?;

        debug!(path = %path.display(), %expiry, "loaded credentials");
        Ok(Self {
            path: path.to_path_buf(),
            credential: Credential {
                access_token: persisted.current_access_token,
                refresh_token: persisted.current_refresh_token,
                expiry,
            },
            base_url: persisted.base_url,
        })
    }

    /// The current access token
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.credential.access_token
    }

    /// The current token triple
    #[must_use]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Base URL override carried in the credential file, if any
    #[must_use]
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Persist the current triple as a single atomic write
    ///
    /// Writes to a sibling temp file and renames it over the target, so a
    /// crash mid-write never leaves a corrupt credential file behind.
    pub async fn save(&self) -> Result<()> {
        let persisted = PersistedCredentials {
            current_access_token: self.credential.access_token.clone(),
            current_refresh_token: self.credential.refresh_token.clone(),
            current_token_expiry: self.credential.expiry.format(EXPIRY_FORMAT).to_string(),
            base_url: self.base_url.clone(),
        };
        let json = serde_json::to_string_pretty(&persisted)?;

        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);
        tokio::fs::write(&tmp_path, json.as_bytes()).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        debug!(path = %self.path.display(), "persisted credentials");
        Ok(())
    }

    /// Whether a refresh is due at the given instant
    ///
    /// The service keeps honoring access tokens for a one-hour grace window
    /// past their stated expiry; a token only becomes refreshable once that
    /// window has elapsed.
    #[must_use]
    pub fn refresh_due(&self, now: DateTime<Utc>) -> bool {
        self.credential.expiry <= now - ChronoDuration::hours(1)
    }

    /// Refresh the token triple if it is due, persisting the replacement
    ///
    /// On a non-success response the stored triple is left untouched and an
    /// authentication error is returned. The triple is never partially
    /// updated: access token, refresh token, and expiry are replaced
    /// together or not at all.
    pub async fn ensure_fresh(
        &mut self,
        http: &reqwest::Client,
        base_url: &Url,
        user_agent: &str,
    ) -> Result<()> {
        if !self.refresh_due(Utc::now()) {
            return Ok(());
        }

        let url = endpoint(base_url, "token/refresh");
        debug!(%url, "refreshing access token");
        let response = http
            .get(&url)
            .header(ACCESS_TOKEN_HEADER, &self.credential.refresh_token)
            .header(reqwest::header::USER_AGENT, user_agent)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Auth(format!("token refresh returned {status}")));
        }

        let body: RefreshResponse = response.json().await?;
        let expiry = parse_expiry(&body.expiry)
            .map_err(|e| Error::Auth(format!("refresh response: {e}")))?;
        self.credential = Credential {
            access_token: body.token,
            refresh_token: body.refresh_token,
            expiry,
        };
        self.save().await?;
        info!(%expiry, "access token refreshed");
        Ok(())
    }
}

fn parse_expiry(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    NaiveDateTime::parse_from_str(raw, EXPIRY_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("unparseable token expiry {raw:?}: {e}"))
}
