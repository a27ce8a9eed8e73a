//! # psq-config
//!
//! Layered configuration loading for psq using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. `PSQ_*` environment variables (`__` as separator)
//! 2. Flat `QBENCH_*` / `SUPABASE_*` environment variables
//! 3. Project-level `.psq/config.toml`
//! 4. User-level `~/.config/psq/config.toml`
//! 5. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `PSQ_QBENCH__BASE_URL` -> `qbench.base_url`,
//! `PSQ_SUPABASE__ANON_KEY` -> `supabase.anon_key`, and so on. The flat form
//! kept by existing lab `.env` files maps `QBENCH_CLIENT_ID` -> `qbench.client_id`
//! and `QBENCH_JWT_TTL_S` -> `qbench.jwt_ttl_secs`.
//!
//! # Usage
//!
//! ```no_run
//! use psq_config::PsqConfig;
//!
//! let config = PsqConfig::load_with_dotenv().expect("config");
//! config.qbench.validate().expect("qbench section");
//! println!("QBench tenant: {}", config.qbench.base());
//! ```

mod error;
mod qbench;
mod report;
mod supabase;

pub use error::ConfigError;
pub use qbench::QBenchConfig;
pub use report::ReportConfig;
pub use supabase::SupabaseConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PsqConfig {
    #[serde(default)]
    pub qbench: QBenchConfig,
    #[serde(default)]
    pub supabase: SupabaseConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl PsqConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT read `.env` -- use [`Self::load_with_dotenv`] for that.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] if a source cannot be parsed or a value
    /// has the wrong type.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load configuration after reading `.env` from the current directory.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment or layer providers on top.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".psq/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: flat env names
        figment = figment
            .merge(
                Env::prefixed("QBENCH_")
                    .map(|key| format!("qbench.{}", flat_qbench_key(key.as_str())).into()),
            )
            .merge(Env::prefixed("SUPABASE_").map(|key| format!("supabase.{key}").into()));

        // Layer 4: PSQ_ env vars (highest priority)
        figment.merge(Env::prefixed("PSQ_").split("__"))
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("psq").join("config.toml"))
    }
}

/// Flat `QBENCH_*` names use `_s` for seconds where the section uses `_secs`.
fn flat_qbench_key(key: &str) -> String {
    match key {
        "jwt_ttl_s" => "jwt_ttl_secs".to_string(),
        "jwt_leeway_s" => "jwt_leeway_secs".to_string(),
        other => other.to_string(),
    }
}
