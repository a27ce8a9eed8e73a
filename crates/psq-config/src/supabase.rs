//! Supabase (PostgREST) report store configuration.

use serde::{Deserialize, Serialize};

fn default_table() -> String {
    "ps_reports".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SupabaseConfig {
    /// Project URL (e.g., `https://abcd.supabase.co`).
    #[serde(default)]
    pub url: String,

    /// Anonymous API key sent as `apikey` and bearer token.
    #[serde(default)]
    pub anon_key: String,

    /// Table processed reports are inserted into.
    #[serde(default = "default_table")]
    pub table: String,

    /// Per-request HTTP timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            table: default_table(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SupabaseConfig {
    /// Check if the store has the minimum required fields.
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.anon_key.is_empty()
    }

    /// REST endpoint for the report table.
    pub fn table_endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.url.trim().trim_end_matches('/'), self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_not_configured() {
        let config = SupabaseConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.table, "ps_reports");
    }

    #[test]
    fn table_endpoint_strips_trailing_slash() {
        let config = SupabaseConfig {
            url: "https://abcd.supabase.co/".into(),
            anon_key: "anon".into(),
            ..Default::default()
        };
        assert!(config.is_configured());
        assert_eq!(
            config.table_endpoint(),
            "https://abcd.supabase.co/rest/v1/ps_reports"
        );
    }
}
