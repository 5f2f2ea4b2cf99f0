//! Persistence for de-identified analytics data
//!
//! [`WellnessStore`] is the seam between the analytics stages and whatever
//! holds the logical tables. Every table is keyed by [`IdentityHash`],
//! never by a raw account identifier.
//!
//! Two backends ship with the crate:
//! - [`MemoryStore`] for tests and embedded single-process use
//! - [`SqliteStore`] for durable storage
//!
//! The bucket upsert and the verification counter must be atomic in the
//! backend itself; callers hold no locks.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use chrono::{DateTime, NaiveDate, Utc};

use crate::attestation::StoredReceipt;
use crate::emotional_labor::EmotionalLaborEntry;
use crate::error::AnalyticsError;
use crate::identity::IdentityHash;
use crate::types::{
    AnonymizedReflection, CoreMetrics, PatternInsight, TimeRange, WeeklyReading,
    WellnessMetricBucket,
};

/// Threshold above which a week is flagged as high stress
pub const HIGH_STRESS_THRESHOLD: f64 = 7.0;

/// Threshold below which a week is flagged as needing recovery
pub const LOW_ENERGY_THRESHOLD: f64 = 4.0;

/// Storage backend for the analytics tables
pub trait WellnessStore: Send + Sync {
    /// Number of reflections for an identity created at or after `since`
    fn count_reflections_since(
        &self,
        identity: &IdentityHash,
        since: DateTime<Utc>,
    ) -> Result<u32, AnalyticsError>;

    /// Atomically merge one reading into the `(identity, week_start)` bucket
    /// and append it to the week's readings log. Returns the merged bucket.
    fn upsert_weekly_metrics(
        &self,
        identity: &IdentityHash,
        week_start: NaiveDate,
        metrics: &CoreMetrics,
        recorded_at: DateTime<Utc>,
    ) -> Result<WellnessMetricBucket, AnalyticsError>;

    /// Append an anonymized reflection (immutable once written) together
    /// with its weekly reading, if any.
    ///
    /// Both writes are kept or neither is. Returns the merged bucket when a
    /// reading was given.
    fn record_reflection(
        &self,
        reflection: &AnonymizedReflection,
        reading: Option<(NaiveDate, &CoreMetrics)>,
    ) -> Result<Option<WellnessMetricBucket>, AnalyticsError>;

    /// Most recent `limit` buckets, oldest first
    fn recent_buckets(
        &self,
        identity: &IdentityHash,
        limit: usize,
    ) -> Result<Vec<WellnessMetricBucket>, AnalyticsError>;

    /// Readings logged for one week, oldest first
    fn weekly_readings(
        &self,
        identity: &IdentityHash,
        week_start: NaiveDate,
    ) -> Result<Vec<WeeklyReading>, AnalyticsError>;

    fn append_pattern_insight(&self, insight: &PatternInsight) -> Result<(), AnalyticsError>;

    /// Most recent `limit` insights, newest first
    fn pattern_insights(
        &self,
        identity: &IdentityHash,
        limit: usize,
    ) -> Result<Vec<PatternInsight>, AnalyticsError>;

    fn append_labor_entry(&self, entry: &EmotionalLaborEntry) -> Result<(), AnalyticsError>;

    /// Labor entries recorded within `range`, oldest first
    fn labor_entries(
        &self,
        identity: &IdentityHash,
        range: &TimeRange,
    ) -> Result<Vec<EmotionalLaborEntry>, AnalyticsError>;

    fn insert_receipt(&self, receipt: &StoredReceipt) -> Result<(), AnalyticsError>;

    /// Atomically increment the verification counter and return the
    /// updated receipt, or `None` if no receipt has this id.
    fn record_verification(
        &self,
        receipt_id: &str,
        verifier: Option<&IdentityHash>,
        at: DateTime<Utc>,
    ) -> Result<Option<StoredReceipt>, AnalyticsError>;
}

/// Per-field last-write-wins merge, shared by backends that merge in Rust
pub(crate) fn merge_bucket(
    existing: Option<&WellnessMetricBucket>,
    identity: &IdentityHash,
    week_start: NaiveDate,
    metrics: &CoreMetrics,
    recorded_at: DateTime<Utc>,
) -> WellnessMetricBucket {
    let prior = |f: fn(&WellnessMetricBucket) -> Option<f64>| existing.and_then(f);

    let stress_level = metrics.stress_level.or(prior(|b| b.stress_level));
    let energy_level = metrics.energy_level.or(prior(|b| b.energy_level));
    let confidence_score = metrics.confidence_score.or(prior(|b| b.confidence_score));
    let burnout_score = metrics.burnout_score.or(prior(|b| b.burnout_score));

    WellnessMetricBucket {
        identity_hash: identity.clone(),
        week_start,
        stress_level,
        energy_level,
        confidence_score,
        burnout_score,
        high_stress_pattern: stress_level.is_some_and(|s| s > HIGH_STRESS_THRESHOLD),
        recovery_needed: energy_level.is_some_and(|e| e < LOW_ENERGY_THRESHOLD),
        check_in_count: existing.map_or(0, |b| b.check_in_count) + 1,
        updated_at: recorded_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_merge_keeps_unreported_fields() {
        let identity = IdentityHash::from_hex("cd".repeat(32));
        let week = NaiveDate::from_ymd_opt(2024, 5, 13).unwrap();
        let t0 = Utc.with_ymd_and_hms(2024, 5, 13, 8, 0, 0).unwrap();

        let first = merge_bucket(
            None,
            &identity,
            week,
            &CoreMetrics {
                stress_level: Some(8.0),
                energy_level: Some(3.0),
                ..Default::default()
            },
            t0,
        );
        assert!(first.high_stress_pattern);
        assert!(first.recovery_needed);

        let second = merge_bucket(
            Some(&first),
            &identity,
            week,
            &CoreMetrics {
                stress_level: Some(5.0),
                ..Default::default()
            },
            t0 + chrono::Duration::hours(1),
        );
        assert_eq!(second.stress_level, Some(5.0));
        assert_eq!(second.energy_level, Some(3.0));
        assert!(!second.high_stress_pattern);
        assert!(second.recovery_needed);
        assert_eq!(second.check_in_count, 2);
    }
}
