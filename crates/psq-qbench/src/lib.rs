//! # psq-qbench
//!
//! Client for the QBench LIMS REST API.
//!
//! [`QBenchClient`] authenticates with a JWT-bearer grant, caches the access
//! token across concurrent requests, retries transient failures with bounded
//! backoff, and resolves a batch to the metadata of every sample it contains.
//!
//! ```no_run
//! # async fn run() -> Result<(), psq_qbench::QBenchError> {
//! let config = psq_config::PsqConfig::load_with_dotenv()?;
//! let client = psq_qbench::QBenchClient::new(&config.qbench)?;
//! for sample in client.get_batch_samples("B-1001").await? {
//!     println!("{} {:?}", sample.qbench_id, sample.sample_name);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
pub mod http;
mod payload;
mod retry;
mod token;

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt, stream};
use psq_config::QBenchConfig;
use psq_core::SampleMetadata;
use serde_json::Value;

pub use error::QBenchError;
pub use http::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
pub use payload::{SampleRecord, batch_sample_ids, sample_records};
pub use retry::RetryPolicy;
pub use token::AccessToken;

use crate::http::{Disposition, classify, excerpt};
use crate::retry::Attempt;
use crate::token::TokenManager;

/// Default page size for [`QBenchClient::search_samples_by_batch`].
pub const DEFAULT_SEARCH_PAGE_SIZE: usize = 200;

/// QBench API client. Cheap to share behind an `Arc`.
pub struct QBenchClient<T = ReqwestTransport> {
    transport: T,
    api_base: String,
    tokens: TokenManager,
    retry: RetryPolicy,
    operation_timeout: Duration,
    sample_limit: usize,
    detail_concurrency: usize,
}

impl QBenchClient<ReqwestTransport> {
    /// Build a client from the `qbench` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`QBenchError::Config`] if a required setting is missing or
    /// invalid, or [`QBenchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &QBenchConfig) -> Result<Self, QBenchError> {
        config.validate()?;
        let transport = ReqwestTransport::new(Duration::from_secs(config.request_timeout_secs))?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> QBenchClient<T> {
    /// Build a client over a custom transport.
    ///
    /// # Errors
    ///
    /// Returns [`QBenchError::Config`] if a required setting is missing or invalid.
    pub fn with_transport(config: &QBenchConfig, transport: T) -> Result<Self, QBenchError> {
        config.validate()?;
        Ok(Self {
            transport,
            api_base: format!("{}/qbench/api/v1", config.base()),
            tokens: TokenManager::new(config),
            retry: RetryPolicy::from(config),
            operation_timeout: Duration::from_secs(config.operation_timeout_secs),
            sample_limit: config.sample_limit,
            detail_concurrency: config.detail_concurrency.max(1),
        })
    }

    /// The underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Obtain a fresh access token and cache it.
    ///
    /// Requests normally authenticate on demand; call this to fail fast on bad
    /// credentials before starting a run.
    ///
    /// # Errors
    ///
    /// Returns [`QBenchError::Authentication`] if the credentials are rejected,
    /// or [`QBenchError::Transient`] if the token endpoint stays unavailable.
    pub async fn authenticate(&self) -> Result<DateTime<Utc>, QBenchError> {
        let op = self.tokens.force_refresh(&self.transport, &self.retry);
        let token = self.bounded("authenticate", op).await?;
        Ok(token.expires_at)
    }

    /// GET a path under `/qbench/api/v1/` and return the decoded JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`QBenchError::NotFound`] for 404, [`QBenchError::Request`] for
    /// other client errors, [`QBenchError::Transient`] once the retry budget or
    /// the operation timeout is exhausted, and [`QBenchError::Schema`] if the
    /// body is not JSON.
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, QBenchError> {
        let path = path.trim_start_matches('/');
        self.bounded(path, self.get_with_retry(path, query)).await
    }

    /// Metadata for every sample in a batch, in batch order.
    ///
    /// Samples the batch references but QBench no longer has are skipped with
    /// a warning. At most `sample_limit` samples are fetched. The operation
    /// timeout covers the whole call, not each request in it.
    ///
    /// # Errors
    ///
    /// Returns [`QBenchError::NotFound`] if the batch does not exist,
    /// [`QBenchError::Schema`] if the batch or a sample payload has an
    /// unrecognized shape, and the errors of [`Self::get`] otherwise.
    pub async fn get_batch_samples(
        &self,
        batch_id: &str,
    ) -> Result<Vec<SampleMetadata>, QBenchError> {
        let batch_id = batch_id.trim();
        if batch_id.is_empty() {
            return Ok(Vec::new());
        }
        let operation = format!("batch {batch_id}");
        self.bounded(&operation, self.batch_samples(batch_id)).await
    }

    async fn batch_samples(&self, batch_id: &str) -> Result<Vec<SampleMetadata>, QBenchError> {
        let path = format!("batch/{}", urlencoding::encode(batch_id));
        let payload = self.get(&path, &[("include", "samples")]).await?;
        let mut ids = batch_sample_ids(batch_id, &payload)?;
        if ids.len() > self.sample_limit {
            tracing::warn!(
                batch = batch_id,
                referenced = ids.len(),
                limit = self.sample_limit,
                "batch references more samples than the configured limit, truncating",
            );
            ids.truncate(self.sample_limit);
        }
        if ids.is_empty() {
            tracing::info!(batch = batch_id, "batch references no samples");
            return Ok(Vec::new());
        }

        let fetched: Vec<Vec<SampleMetadata>> = stream::iter(ids)
            .map(|id| self.sample_detail(batch_id, id))
            .buffered(self.detail_concurrency)
            .try_collect()
            .await?;
        let samples: Vec<SampleMetadata> = fetched.into_iter().flatten().collect();

        tracing::debug!(batch = batch_id, samples = samples.len(), "fetched batch samples");
        Ok(samples)
    }

    /// Scan recent samples for ones whose batch, custom id, or name mentions
    /// `batch`. Fallback for tenants whose batch endpoint lists nothing.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`], plus [`QBenchError::Schema`] for an unrecognized
    /// listing payload.
    pub async fn search_samples_by_batch(
        &self,
        batch: &str,
        page_size: usize,
    ) -> Result<Vec<SampleMetadata>, QBenchError> {
        let needle = batch.trim();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let page_size = page_size.max(1).to_string();
        let payload = self
            .get(
                "sample",
                &[
                    ("page_size", page_size.as_str()),
                    ("page_num", "1"),
                    ("sort_by", "date_created"),
                    ("sort_order", "desc"),
                ],
            )
            .await?;
        let records = sample_records("sample listing", &payload)?;
        let scanned = records.len();
        let matches: Vec<SampleMetadata> = records
            .into_iter()
            .filter(|record| record.search_text().contains(needle))
            .filter_map(|record| record.into_metadata(needle))
            .collect();

        tracing::debug!(batch = needle, scanned, matched = matches.len(), "searched samples");
        Ok(matches)
    }

    async fn sample_detail(
        &self,
        batch_id: &str,
        sample_id: String,
    ) -> Result<Vec<SampleMetadata>, QBenchError> {
        let path = format!("sample/{}", urlencoding::encode(&sample_id));
        let payload = match self.get(&path, &[]).await {
            Ok(payload) => payload,
            Err(QBenchError::NotFound { .. }) => {
                tracing::warn!(batch = batch_id, sample = %sample_id, "sample listed in batch was not found");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        let records = sample_records(&format!("sample {sample_id}"), &payload)?;
        Ok(records
            .into_iter()
            .filter_map(|record| record.into_metadata(batch_id))
            .collect())
    }

    async fn get_with_retry(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, QBenchError> {
        let url = format!("{}/{path}", self.api_base);
        self.retry
            .run(path, |_| {
                let url = url.as_str();
                async move {
                    let bearer = match self.tokens.bearer(&self.transport, &self.retry).await {
                        Ok(bearer) => bearer,
                        Err(e) => return Attempt::Fatal(e),
                    };
                    let request = HttpRequest::get(url).query(query).bearer(bearer.clone());
                    let resp = match self.transport.send(request).await {
                        Ok(resp) => resp,
                        Err(e) if e.is_transient() => return Attempt::retry(e.to_string()),
                        Err(e) => return Attempt::Fatal(QBenchError::Http(e.to_string())),
                    };

                    match classify(resp.status) {
                        Disposition::Success => match serde_json::from_str(&resp.body) {
                            Ok(value) => Attempt::Done(value),
                            Err(e) => Attempt::Fatal(QBenchError::Schema {
                                context: path.to_string(),
                                message: format!("response is not JSON: {e}"),
                            }),
                        },
                        Disposition::Unauthorized => {
                            self.tokens.invalidate(&bearer).await;
                            Attempt::Retry {
                                reason: "access token rejected (401)".into(),
                                hint: None,
                                unauthorized: true,
                            }
                        }
                        Disposition::NotFound => Attempt::Fatal(QBenchError::NotFound {
                            resource: path.to_string(),
                        }),
                        Disposition::Retryable => Attempt::Retry {
                            reason: format!("HTTP {}", resp.status),
                            hint: resp.retry_after_secs.map(Duration::from_secs),
                            unauthorized: false,
                        },
                        Disposition::Rejected => Attempt::Fatal(QBenchError::Request {
                            status: resp.status,
                            message: excerpt(&resp.body),
                        }),
                    }
                }
            })
            .await
    }

    /// Apply the overall operation timeout to `op`.
    async fn bounded<R>(
        &self,
        operation: &str,
        op: impl Future<Output = Result<R, QBenchError>>,
    ) -> Result<R, QBenchError> {
        tokio::time::timeout(self.operation_timeout, op)
            .await
            .unwrap_or_else(|_| {
                Err(QBenchError::Transient(format!(
                    "{operation} did not complete within {}s",
                    self.operation_timeout.as_secs()
                )))
            })
    }
}
