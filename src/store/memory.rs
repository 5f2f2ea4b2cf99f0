//! In-process store backed by mutex-guarded tables

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{merge_bucket, WellnessStore};
use crate::attestation::StoredReceipt;
use crate::emotional_labor::EmotionalLaborEntry;
use crate::error::AnalyticsError;
use crate::identity::IdentityHash;
use crate::types::{
    AnonymizedReflection, CoreMetrics, PatternInsight, TimeRange, WeeklyReading,
    WellnessMetricBucket,
};

#[derive(Debug, Default)]
struct Tables {
    reflections: Vec<AnonymizedReflection>,
    buckets: BTreeMap<(IdentityHash, NaiveDate), WellnessMetricBucket>,
    readings: Vec<WeeklyReading>,
    insights: Vec<PatternInsight>,
    labor: Vec<EmotionalLaborEntry>,
    receipts: BTreeMap<String, StoredReceipt>,
}

impl Tables {
    fn upsert_bucket(
        &mut self,
        identity: &IdentityHash,
        week_start: NaiveDate,
        metrics: &CoreMetrics,
        recorded_at: DateTime<Utc>,
    ) -> WellnessMetricBucket {
        let key = (identity.clone(), week_start);

        let merged = merge_bucket(self.buckets.get(&key), identity, week_start, metrics, recorded_at);
        self.buckets.insert(key, merged.clone());
        self.readings.push(WeeklyReading {
            identity_hash: identity.clone(),
            week_start,
            metrics: *metrics,
            recorded_at,
        });
        merged
    }
}

/// Store that keeps every table in memory.
///
/// A single mutex guards all tables, which makes every trait operation
/// (including the bucket upsert) atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AnalyticsError> {
        self.tables
            .lock()
            .map_err(|_| AnalyticsError::Storage("memory store lock poisoned".to_string()))
    }

    /// Number of stored reflections (all identities)
    pub fn reflection_count(&self) -> Result<usize, AnalyticsError> {
        Ok(self.lock()?.reflections.len())
    }

    /// Snapshot of all stored reflections, for audits and tests
    pub fn reflections(&self) -> Result<Vec<AnonymizedReflection>, AnalyticsError> {
        Ok(self.lock()?.reflections.clone())
    }
}

impl WellnessStore for MemoryStore {
    fn count_reflections_since(
        &self,
        identity: &IdentityHash,
        since: DateTime<Utc>,
    ) -> Result<u32, AnalyticsError> {
        let tables = self.lock()?;
        let count = tables
            .reflections
            .iter()
            .filter(|r| &r.identity_hash == identity && r.created_at >= since)
            .count();
        Ok(count as u32)
    }

    fn upsert_weekly_metrics(
        &self,
        identity: &IdentityHash,
        week_start: NaiveDate,
        metrics: &CoreMetrics,
        recorded_at: DateTime<Utc>,
    ) -> Result<WellnessMetricBucket, AnalyticsError> {
        Ok(self
            .lock()?
            .upsert_bucket(identity, week_start, metrics, recorded_at))
    }

    fn record_reflection(
        &self,
        reflection: &AnonymizedReflection,
        reading: Option<(NaiveDate, &CoreMetrics)>,
    ) -> Result<Option<WellnessMetricBucket>, AnalyticsError> {
        let mut tables = self.lock()?;
        tables.reflections.push(reflection.clone());
        Ok(reading.map(|(week_start, metrics)| {
            tables.upsert_bucket(
                &reflection.identity_hash,
                week_start,
                metrics,
                reflection.created_at,
            )
        }))
    }

    fn recent_buckets(
        &self,
        identity: &IdentityHash,
        limit: usize,
    ) -> Result<Vec<WellnessMetricBucket>, AnalyticsError> {
        let tables = self.lock()?;
        let mut buckets: Vec<WellnessMetricBucket> = tables
            .buckets
            .values()
            .filter(|b| &b.identity_hash == identity)
            .cloned()
            .collect();

        // BTreeMap iteration is already week-ordered per identity
        let skip = buckets.len().saturating_sub(limit);
        Ok(buckets.split_off(skip))
    }

    fn weekly_readings(
        &self,
        identity: &IdentityHash,
        week_start: NaiveDate,
    ) -> Result<Vec<WeeklyReading>, AnalyticsError> {
        let tables = self.lock()?;
        Ok(tables
            .readings
            .iter()
            .filter(|r| &r.identity_hash == identity && r.week_start == week_start)
            .cloned()
            .collect())
    }

    fn append_pattern_insight(&self, insight: &PatternInsight) -> Result<(), AnalyticsError> {
        self.lock()?.insights.push(insight.clone());
        Ok(())
    }

    fn pattern_insights(
        &self,
        identity: &IdentityHash,
        limit: usize,
    ) -> Result<Vec<PatternInsight>, AnalyticsError> {
        let tables = self.lock()?;
        Ok(tables
            .insights
            .iter()
            .rev()
            .filter(|i| &i.identity_hash == identity)
            .take(limit)
            .cloned()
            .collect())
    }

    fn append_labor_entry(&self, entry: &EmotionalLaborEntry) -> Result<(), AnalyticsError> {
        self.lock()?.labor.push(entry.clone());
        Ok(())
    }

    fn labor_entries(
        &self,
        identity: &IdentityHash,
        range: &TimeRange,
    ) -> Result<Vec<EmotionalLaborEntry>, AnalyticsError> {
        let tables = self.lock()?;
        let mut entries: Vec<EmotionalLaborEntry> = tables
            .labor
            .iter()
            .filter(|e| &e.identity_hash == identity && range.contains(e.recorded_at))
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.recorded_at);
        Ok(entries)
    }

    fn insert_receipt(&self, receipt: &StoredReceipt) -> Result<(), AnalyticsError> {
        let mut tables = self.lock()?;
        let id = receipt.receipt.receipt_id.clone();
        if tables.receipts.contains_key(&id) {
            return Err(AnalyticsError::Storage(format!("duplicate receipt id {id}")));
        }
        tables.receipts.insert(id, receipt.clone());
        Ok(())
    }

    fn record_verification(
        &self,
        receipt_id: &str,
        verifier: Option<&IdentityHash>,
        at: DateTime<Utc>,
    ) -> Result<Option<StoredReceipt>, AnalyticsError> {
        let mut tables = self.lock()?;
        let Some(stored) = tables.receipts.get_mut(receipt_id) else {
            return Ok(None);
        };

        stored.receipt.verification_count += 1;
        stored.last_verified_at = Some(at);
        if let Some(verifier) = verifier {
            stored.last_verifier_hash = Some(verifier.clone());
        }
        Ok(Some(stored.clone()))
    }
}
