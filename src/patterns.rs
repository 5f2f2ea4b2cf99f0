//! Pattern detection over weekly buckets
//!
//! Classification is priority ordered: a high burnout score overrides any
//! stress-based code. Missing values never trigger a branch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregator::MetricsAggregator;
use crate::anonymizer::METRIC_MAX;
use crate::error::AnalyticsError;
use crate::store::WellnessStore;
use crate::types::{PatternCode, PatternInsight, WellnessMetricBucket};

/// Burnout score above which BURNOUT_RISK is reported
pub const BURNOUT_RISK_THRESHOLD: f64 = 7.0;

/// Stress level above which STRESS_RISING is reported
pub const STRESS_RISING_THRESHOLD: f64 = 7.0;

/// Stress level below which STRESS_DECLINING is reported
pub const STRESS_DECLINING_THRESHOLD: f64 = 3.0;

/// Pattern code with its fixed confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternClassification {
    pub code: PatternCode,
    pub confidence: f64,
}

/// Minimal bucket values the classifier reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternInput {
    pub stress_level: Option<f64>,
    pub burnout_score: Option<f64>,
}

impl From<&WellnessMetricBucket> for PatternInput {
    fn from(bucket: &WellnessMetricBucket) -> Self {
        Self {
            stress_level: bucket.stress_level,
            burnout_score: bucket.burnout_score,
        }
    }
}

/// Stateless pattern detector
pub struct PatternDetector;

impl PatternDetector {
    /// Classify a bucket's latest values
    pub fn classify(input: &PatternInput) -> Result<PatternClassification, AnalyticsError> {
        let stress = validate("stress_level", input.stress_level)?;
        let burnout = validate("burnout_score", input.burnout_score)?;

        let (code, confidence) = match (burnout, stress) {
            (Some(b), _) if b > BURNOUT_RISK_THRESHOLD => (PatternCode::BurnoutRisk, 0.95),
            (_, Some(s)) if s > STRESS_RISING_THRESHOLD => (PatternCode::StressRising, 0.9),
            (_, Some(s)) if s < STRESS_DECLINING_THRESHOLD => (PatternCode::StressDeclining, 0.85),
            _ => (PatternCode::StressStable, 0.7),
        };

        Ok(PatternClassification { code, confidence })
    }

    /// Classify `bucket` and append the result to the insight log
    pub fn detect<S: WellnessStore + ?Sized>(
        store: &S,
        bucket: &WellnessMetricBucket,
        now: DateTime<Utc>,
    ) -> Result<PatternInsight, AnalyticsError> {
        let classification = Self::classify(&PatternInput::from(bucket))?;

        let insight = PatternInsight {
            identity_hash: bucket.identity_hash.clone(),
            pattern_code: classification.code,
            confidence: classification.confidence,
            month_start: MetricsAggregator::month_start(now),
            detected_at: now,
        };
        store.append_pattern_insight(&insight)?;

        tracing::debug!(
            identity = %insight.identity_hash,
            pattern = insight.pattern_code.as_str(),
            "Pattern insight recorded"
        );
        Ok(insight)
    }
}

fn validate(field: &str, value: Option<f64>) -> Result<Option<f64>, AnalyticsError> {
    match value {
        Some(v) if !v.is_finite() || !(0.0..=METRIC_MAX).contains(&v) => {
            tracing::warn!(field, "Rejected out-of-range pattern input");
            Err(AnalyticsError::out_of_range(field, v, 0.0, METRIC_MAX))
        }
        other => Ok(other),
    }
}
