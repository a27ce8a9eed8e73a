//! QBench API client configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_operation_timeout_secs() -> u64 {
    120
}

const fn default_max_attempts() -> u32 {
    4
}

const fn default_base_delay_ms() -> u64 {
    1_000
}

const fn default_max_delay_ms() -> u64 {
    30_000
}

const fn default_sample_limit() -> usize {
    100
}

const fn default_detail_concurrency() -> usize {
    4
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QBenchConfig {
    /// Tenant base URL (e.g., `https://mylab.qbench.net`).
    #[serde(default)]
    pub base_url: String,

    /// OAuth client id, used as the JWT assertion subject.
    #[serde(default)]
    pub client_id: String,

    /// OAuth client secret, used to sign the JWT assertion.
    #[serde(default)]
    pub client_secret: String,

    /// Requested token lifetime in seconds.
    #[serde(default)]
    pub jwt_ttl_secs: Option<u64>,

    /// Refresh the token this many seconds before it expires.
    #[serde(default)]
    pub jwt_leeway_secs: Option<u64>,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Upper bound for one logical operation including all retries.
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,

    /// Attempts per request, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubled on each subsequent one.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Cap for any single retry delay, including throttle hints.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Maximum number of samples fetched per batch.
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,

    /// Sample detail requests in flight at once.
    #[serde(default = "default_detail_concurrency")]
    pub detail_concurrency: usize,
}

impl Default for QBenchConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            jwt_ttl_secs: None,
            jwt_leeway_secs: None,
            request_timeout_secs: default_request_timeout_secs(),
            operation_timeout_secs: default_operation_timeout_secs(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            sample_limit: default_sample_limit(),
            detail_concurrency: default_detail_concurrency(),
        }
    }
}

impl QBenchConfig {
    /// Check if every required field is present.
    pub fn is_configured(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Names of required fields that are absent.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.base_url.trim().is_empty() {
            missing.push("base_url");
        }
        if self.client_id.trim().is_empty() {
            missing.push("client_id");
        }
        if self.client_secret.is_empty() {
            missing.push("client_secret");
        }
        if self.jwt_ttl_secs.is_none() {
            missing.push("jwt_ttl_secs");
        }
        if self.jwt_leeway_secs.is_none() {
            missing.push("jwt_leeway_secs");
        }
        missing
    }

    /// Validate the section before constructing a client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] naming every absent required field, or
    /// [`ConfigError::InvalidValue`] for values the client cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(ConfigError::Missing {
                section: "qbench".into(),
                fields: missing.into_iter().map(String::from).collect(),
            });
        }

        if let (Some(ttl), Some(leeway)) = (self.jwt_ttl_secs, self.jwt_leeway_secs)
            && leeway >= ttl
        {
            return Err(ConfigError::InvalidValue {
                field: "qbench.jwt_leeway_secs".into(),
                reason: format!("leeway ({leeway}s) must be shorter than the token TTL ({ttl}s)"),
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "qbench.max_attempts".into(),
                reason: "at least one attempt is required".into(),
            });
        }
        if self.detail_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "qbench.detail_concurrency".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }
}
