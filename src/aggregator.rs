//! Weekly metric aggregation
//!
//! Readings are bucketed by the Monday (UTC) of their ISO week. The bucket
//! itself keeps the most recent value per field; every reading is also kept
//! in the week's log so that summaries can be derived on read.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;

use crate::error::AnalyticsError;
use crate::identity::IdentityHash;
use crate::store::WellnessStore;
use crate::types::{
    AnonymizedReflection, CoreMetrics, MetricName, MetricSummary, WeekSummary,
    WellnessMetricBucket,
};

/// Aggregator for per-week wellness buckets
pub struct MetricsAggregator;

impl MetricsAggregator {
    /// Monday of the ISO week containing `ts` (UTC)
    pub fn week_start(ts: DateTime<Utc>) -> NaiveDate {
        let date = ts.date_naive();
        date - Duration::days(date.weekday().num_days_from_monday() as i64)
    }

    /// First day of the month containing `ts` (UTC)
    pub fn month_start(ts: DateTime<Utc>) -> NaiveDate {
        let date = ts.date_naive();
        date.with_day(1).unwrap_or(date)
    }

    /// Store a reflection and merge its core metrics into its week's bucket
    /// in one store call.
    ///
    /// Returns `None` when the reflection carries no core metric; such
    /// reflections are still stored but do not count as a check-in.
    pub fn record<S: WellnessStore + ?Sized>(
        store: &S,
        reflection: &AnonymizedReflection,
    ) -> Result<Option<WellnessMetricBucket>, AnalyticsError> {
        let metrics = CoreMetrics::from_reflection(reflection);
        let reading = (!metrics.is_empty())
            .then(|| (Self::week_start(reflection.created_at), &metrics));

        let bucket = store.record_reflection(reflection, reading)?;

        match &bucket {
            Some(bucket) => tracing::debug!(
                identity = %bucket.identity_hash,
                week_start = %bucket.week_start,
                check_ins = bucket.check_in_count,
                "Weekly bucket updated"
            ),
            None => tracing::debug!(
                identity = %reflection.identity_hash,
                category = reflection.category.as_str(),
                "No core metrics; bucket unchanged"
            ),
        }
        Ok(bucket)
    }

    /// Most recent `weeks` buckets, oldest first
    pub fn history<S: WellnessStore + ?Sized>(
        store: &S,
        identity: &IdentityHash,
        weeks: usize,
    ) -> Result<Vec<WellnessMetricBucket>, AnalyticsError> {
        store.recent_buckets(identity, weeks)
    }

    /// Per-metric aggregates over one week's readings log
    pub fn week_summary<S: WellnessStore + ?Sized>(
        store: &S,
        identity: &IdentityHash,
        week_start: NaiveDate,
    ) -> Result<WeekSummary, AnalyticsError> {
        let readings = store.weekly_readings(identity, week_start)?;

        let mut values: BTreeMap<MetricName, Vec<f64>> = BTreeMap::new();
        for reading in &readings {
            for name in MetricName::ALL.into_iter().filter(MetricName::is_core) {
                if let Some(value) = reading.metrics.get(name) {
                    values.entry(name).or_default().push(value);
                }
            }
        }

        let metrics = values
            .into_iter()
            .filter_map(|(name, series)| summarize(&series).map(|s| (name, s)))
            .collect();

        Ok(WeekSummary {
            week_start,
            readings: readings.len() as u32,
            metrics,
        })
    }
}

fn summarize(series: &[f64]) -> Option<MetricSummary> {
    let latest = *series.last()?;
    let min = series.iter().copied().fold(f64::INFINITY, f64::min);
    let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = series.iter().sum::<f64>() / series.len() as f64;

    Some(MetricSummary {
        count: series.len() as u32,
        mean: (mean * 100.0).round() / 100.0,
        min,
        max,
        latest,
    })
}
