//! PostgREST client for the Supabase report table.

use std::time::Duration;

use psq_config::SupabaseConfig;
use reqwest::header::HeaderValue;

use crate::error::PersistenceError;
use crate::record::{ReportRecord, SavedReport};
use crate::RecordSink;

/// Columns listed by [`SupabaseStore::fetch_recent`].
const SUMMARY_COLUMNS: &str = "batch_number,sample_number,custom_formatted_id,sample_name,created_at";

/// Map a non-success response to [`PersistenceError::Rejected`].
///
/// # Errors
///
/// Returns [`PersistenceError::Rejected`] with the response body for any
/// status outside 2xx.
pub async fn check_response(
    resp: reqwest::Response,
) -> Result<reqwest::Response, PersistenceError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(PersistenceError::Rejected {
            status: status.as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

/// Inserts report records through the Supabase REST API.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    http: reqwest::Client,
    endpoint: String,
    anon_key: String,
}

impl SupabaseStore {
    /// # Errors
    ///
    /// Returns [`PersistenceError::Config`] if the URL or key is missing, or
    /// if the key cannot be sent as a header.
    pub fn new(config: &SupabaseConfig) -> Result<Self, PersistenceError> {
        if !config.is_configured() {
            return Err(PersistenceError::Config(
                "set supabase.url and supabase.anon_key".to_string(),
            ));
        }
        if HeaderValue::from_str(&config.anon_key).is_err() {
            return Err(PersistenceError::Config(
                "supabase.anon_key contains characters not allowed in a header".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.table_endpoint(),
            anon_key: config.anon_key.clone(),
        })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    /// The insert request for one record.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Request`] if the request cannot be built.
    pub fn insert_request(&self, record: &ReportRecord) -> Result<reqwest::Request, PersistenceError> {
        Ok(self
            .authorized(self.http.post(&self.endpoint))
            .header("Prefer", "return=minimal")
            .json(record)
            .build()?)
    }

    /// The listing request for the most recent reports.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Request`] if the request cannot be built.
    pub fn recent_request(&self, limit: usize) -> Result<reqwest::Request, PersistenceError> {
        let limit = limit.to_string();
        Ok(self
            .authorized(self.http.get(&self.endpoint))
            .query(&[
                ("select", SUMMARY_COLUMNS),
                ("order", "created_at.desc"),
                ("limit", limit.as_str()),
            ])
            .build()?)
    }

    /// Most recently saved reports, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the request fails, is rejected, or the
    /// body is not a list of report rows.
    pub async fn fetch_recent(&self, limit: usize) -> Result<Vec<SavedReport>, PersistenceError> {
        let request = self.recent_request(limit)?;
        let resp = check_response(self.http.execute(request).await?).await?;
        Ok(resp.json().await?)
    }
}

impl RecordSink for SupabaseStore {
    async fn insert(&self, record: &ReportRecord) -> Result<(), PersistenceError> {
        let request = self.insert_request(record)?;
        check_response(self.http.execute(request).await?).await?;
        tracing::debug!(sample = %record.sample_number, "report row inserted");
        Ok(())
    }
}
