//! Wellness Core - privacy-preserving wellness analytics for interpreters
//!
//! The core turns raw self-report submissions into de-identified metrics
//! through a synchronous pipeline: identity hashing → anonymization →
//! weekly aggregation → pattern detection. Burnout risk is computed on the
//! read path; emotional labor quantification and attestations sit beside it.
//!
//! ## Modules
//!
//! - **Ingest**: [`identity`], [`anonymizer`], [`submission`], [`aggregator`], [`patterns`]
//! - **Scoring**: [`burnout`], [`emotional_labor`]
//! - **Attestation**: [`attestation`]
//! - **Service**: [`WellnessAnalytics`] over a [`store::WellnessStore`]

pub mod aggregator;
pub mod anonymizer;
pub mod attestation;
pub mod burnout;
pub mod config;
pub mod emotional_labor;
pub mod error;
pub mod identity;
pub mod patterns;
pub mod service;
pub mod store;
pub mod submission;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::WellnessConfig;
pub use error::AnalyticsError;
pub use identity::{IdentityHash, IdentityHasher};
pub use service::{SubmissionAck, WellnessAnalytics, WellnessInsights};
pub use store::{MemoryStore, SqliteStore, WellnessStore};

// Scoring exports
pub use burnout::{
    BurnoutRiskAssessment, BurnoutRiskOutcome, BurnoutRiskPredictor, InsufficientDataPolicy,
    InterventionPlan, RiskLevel, TeamRiskAssessment, TeamRiskRollup, Trend,
};
pub use emotional_labor::{
    EmotionalLaborAnalysis, EmotionalLaborQuantifier, EmotionalLaborSession, LaborAnalytics,
};

// Attestation exports
pub use attestation::{
    AttestationReceipt, AttestationType, Comparison, ThresholdCriterion, VerificationReason,
    VerificationResult,
};

/// Crate version, reported by the CLI and FFI
pub const WELLNESS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name recorded in diagnostics
pub const PRODUCER_NAME: &str = "wellness-core";
