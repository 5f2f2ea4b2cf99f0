//! Deployment configuration
//!
//! Configuration is layered with Figment: compiled defaults, then an
//! optional TOML file, then `WELLNESS_*` environment variables. The
//! deployment secret has no default; [`crate::WellnessAnalytics::init`]
//! refuses to start without one.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::burnout::InsufficientDataPolicy;
use crate::error::AnalyticsError;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "WELLNESS_";

/// Default attestation validity window in hours
pub const DEFAULT_VALIDITY_HOURS: u32 = 24 * 30;

/// Default hourly base rate used when a session omits one
pub const DEFAULT_BASE_RATE: f64 = 50.0;

/// Top-level configuration
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WellnessConfig {
    /// Deployment-wide secret for identity hashing and receipt signatures.
    /// Must stay stable for the lifetime of the deployment.
    #[serde(default)]
    pub deployment_secret: Option<String>,

    /// SQLite database path (CLI only; library callers pass their own store)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub attestation: AttestationConfig,

    #[serde(default)]
    pub labor: LaborConfig,

    /// What `get_burnout_risk` returns with fewer than three weeks of history
    #[serde(default)]
    pub insufficient_data: InsufficientDataPolicy,
}

impl fmt::Debug for WellnessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WellnessConfig")
            .field(
                "deployment_secret",
                &self.deployment_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("database_path", &self.database_path)
            .field("attestation", &self.attestation)
            .field("labor", &self.labor)
            .field("insufficient_data", &self.insufficient_data)
            .finish()
    }
}

/// Attestation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttestationConfig {
    /// Validity window applied when a caller does not specify one
    #[serde(default = "default_validity_hours")]
    pub default_validity_hours: u32,
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            default_validity_hours: DEFAULT_VALIDITY_HOURS,
        }
    }
}

fn default_validity_hours() -> u32 {
    DEFAULT_VALIDITY_HOURS
}

/// Emotional labor compensation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaborConfig {
    /// Hourly base rate when a session record carries none
    #[serde(default = "default_base_rate")]
    pub default_base_rate: f64,
}

impl Default for LaborConfig {
    fn default() -> Self {
        Self {
            default_base_rate: DEFAULT_BASE_RATE,
        }
    }
}

fn default_base_rate() -> f64 {
    DEFAULT_BASE_RATE
}

impl WellnessConfig {
    /// Config with only the secret set; everything else defaulted
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            deployment_secret: Some(secret.into()),
            ..Self::default()
        }
    }

    /// Load from `./wellness.toml` (if present) with env overrides
    pub fn load() -> Result<Self, AnalyticsError> {
        Self::load_from_path(Path::new("wellness.toml"))
    }

    /// Load from a specific TOML file with env overrides
    pub fn load_from_path(path: &Path) -> Result<Self, AnalyticsError> {
        let config = Figment::new()
            .merge(Serialized::defaults(WellnessConfig::default()))
            .merge(Toml::file(path))
            .merge(env_provider())
            .extract()?;
        Ok(config)
    }

    /// Load from a TOML string only (no env, no files)
    pub fn load_from_str(toml_content: &str) -> Result<Self, AnalyticsError> {
        let config = Figment::new()
            .merge(Serialized::defaults(WellnessConfig::default()))
            .merge(Toml::string(toml_content))
            .extract()?;
        Ok(config)
    }

    /// Reject values that would corrupt downstream calculations
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        let rate = self.labor.default_base_rate;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(AnalyticsError::Configuration(format!(
                "labor.default_base_rate must be a positive number, got {rate}"
            )));
        }
        Ok(())
    }
}

/// Map `WELLNESS_ATTESTATION_DEFAULT_VALIDITY_HOURS` to
/// `attestation.default_validity_hours` and so on.
fn env_provider() -> Env {
    // WELLNESS_LOG belongs to the CLI's log filter, not to this struct
    Env::prefixed(ENV_PREFIX).ignore(&["log"]).map(|key| {
        let mapped = key
            .as_str()
            .replacen("attestation_", "attestation.", 1)
            .replacen("labor_", "labor.", 1);
        mapped.into()
    })
}
