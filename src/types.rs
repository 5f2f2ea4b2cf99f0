//! Core types for the wellness analytics core
//!
//! This module defines the de-identified records that flow between stages:
//! anonymized reflections, weekly metric buckets, readings, and pattern
//! insights. None of these types carries a free-text field; every string
//! is either an enum label or an [`IdentityHash`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::identity::IdentityHash;

/// Allow-listed numeric metric keys. Anything else in a submission is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    StressLevel,
    EnergyLevel,
    ConfidenceScore,
    BurnoutScore,
    PreparationLevel,
    EmotionalIntensity,
    SessionSatisfaction,
    TeamCohesion,
    MoodScore,
}

impl MetricName {
    pub const ALL: [MetricName; 9] = [
        MetricName::StressLevel,
        MetricName::EnergyLevel,
        MetricName::ConfidenceScore,
        MetricName::BurnoutScore,
        MetricName::PreparationLevel,
        MetricName::EmotionalIntensity,
        MetricName::SessionSatisfaction,
        MetricName::TeamCohesion,
        MetricName::MoodScore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::StressLevel => "stress_level",
            MetricName::EnergyLevel => "energy_level",
            MetricName::ConfidenceScore => "confidence_score",
            MetricName::BurnoutScore => "burnout_score",
            MetricName::PreparationLevel => "preparation_level",
            MetricName::EmotionalIntensity => "emotional_intensity",
            MetricName::SessionSatisfaction => "session_satisfaction",
            MetricName::TeamCohesion => "team_cohesion",
            MetricName::MoodScore => "mood_score",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == key)
    }

    /// Whether this metric feeds the weekly bucket
    pub fn is_core(&self) -> bool {
        matches!(
            self,
            MetricName::StressLevel
                | MetricName::EnergyLevel
                | MetricName::ConfidenceScore
                | MetricName::BurnoutScore
        )
    }
}

/// Coarse reflection category inferred from the host's form-type hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionCategory {
    PreSession,
    PostSession,
    StressManagement,
    TeamSync,
    BurnoutCheck,
    WellnessCheck,
    MoodLog,
    General,
}

impl ReflectionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReflectionCategory::PreSession => "pre_session",
            ReflectionCategory::PostSession => "post_session",
            ReflectionCategory::StressManagement => "stress_management",
            ReflectionCategory::TeamSync => "team_sync",
            ReflectionCategory::BurnoutCheck => "burnout_check",
            ReflectionCategory::WellnessCheck => "wellness_check",
            ReflectionCategory::MoodLog => "mood_log",
            ReflectionCategory::General => "general",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        [
            ReflectionCategory::PreSession,
            ReflectionCategory::PostSession,
            ReflectionCategory::StressManagement,
            ReflectionCategory::TeamSync,
            ReflectionCategory::BurnoutCheck,
            ReflectionCategory::WellnessCheck,
            ReflectionCategory::MoodLog,
            ReflectionCategory::General,
        ]
        .into_iter()
        .find(|c| c.as_str() == label)
    }
}

/// Coarse interpreting setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    Medical,
    Legal,
    MentalHealth,
    Educational,
    Business,
    Community,
    Conference,
    General,
}

impl ContextType {
    pub const ALL: [ContextType; 8] = [
        ContextType::Medical,
        ContextType::Legal,
        ContextType::MentalHealth,
        ContextType::Educational,
        ContextType::Business,
        ContextType::Community,
        ContextType::Conference,
        ContextType::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContextType::Medical => "medical",
            ContextType::Legal => "legal",
            ContextType::MentalHealth => "mental_health",
            ContextType::Educational => "educational",
            ContextType::Business => "business",
            ContextType::Community => "community",
            ContextType::Conference => "conference",
            ContextType::General => "general",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == label)
    }
}

/// A self-report stripped to numeric metrics and enum labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymizedReflection {
    pub identity_hash: IdentityHash,
    /// Per-submission hash; not linkable across submissions
    pub session_hash: String,
    pub category: ReflectionCategory,
    /// Allow-listed metrics, each in [0, 10] with one decimal
    pub metrics: BTreeMap<MetricName, f64>,
    pub context_type: ContextType,
    pub created_at: DateTime<Utc>,
}

impl AnonymizedReflection {
    pub fn metric(&self, name: MetricName) -> Option<f64> {
        self.metrics.get(&name).copied()
    }
}

/// Core values carried into the weekly bucket by one reading.
/// `None` means the submission did not report that metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreMetrics {
    pub stress_level: Option<f64>,
    pub energy_level: Option<f64>,
    pub confidence_score: Option<f64>,
    pub burnout_score: Option<f64>,
}

impl CoreMetrics {
    pub fn from_reflection(reflection: &AnonymizedReflection) -> Self {
        Self {
            stress_level: reflection.metric(MetricName::StressLevel),
            energy_level: reflection.metric(MetricName::EnergyLevel),
            confidence_score: reflection.metric(MetricName::ConfidenceScore),
            burnout_score: reflection.metric(MetricName::BurnoutScore),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stress_level.is_none()
            && self.energy_level.is_none()
            && self.confidence_score.is_none()
            && self.burnout_score.is_none()
    }

    pub fn get(&self, name: MetricName) -> Option<f64> {
        match name {
            MetricName::StressLevel => self.stress_level,
            MetricName::EnergyLevel => self.energy_level,
            MetricName::ConfidenceScore => self.confidence_score,
            MetricName::BurnoutScore => self.burnout_score,
            _ => None,
        }
    }
}

/// Per-week aggregate for one pseudonymous identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessMetricBucket {
    pub identity_hash: IdentityHash,
    /// Monday of the ISO week (UTC)
    pub week_start: NaiveDate,
    pub stress_level: Option<f64>,
    pub energy_level: Option<f64>,
    pub confidence_score: Option<f64>,
    pub burnout_score: Option<f64>,
    /// stress_level > 7
    pub high_stress_pattern: bool,
    /// energy_level < 4
    pub recovery_needed: bool,
    /// Number of readings merged into this bucket
    pub check_in_count: u32,
    pub updated_at: DateTime<Utc>,
}

impl WellnessMetricBucket {
    /// Value for a core metric, `None` for non-core names
    pub fn metric(&self, name: MetricName) -> Option<f64> {
        match name {
            MetricName::StressLevel => self.stress_level,
            MetricName::EnergyLevel => self.energy_level,
            MetricName::ConfidenceScore => self.confidence_score,
            MetricName::BurnoutScore => self.burnout_score,
            _ => None,
        }
    }
}

/// One reading appended to the per-week log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReading {
    pub identity_hash: IdentityHash,
    pub week_start: NaiveDate,
    pub metrics: CoreMetrics,
    pub recorded_at: DateTime<Utc>,
}

/// Aggregate of one metric across a week's readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub count: u32,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Most recent reading, matching the bucket's last-write-wins value
    pub latest: f64,
}

/// Aggregates derived on read from a week's readings log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekSummary {
    pub week_start: NaiveDate,
    pub readings: u32,
    pub metrics: BTreeMap<MetricName, MetricSummary>,
}

/// Coarse trend classification for a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternCode {
    BurnoutRisk,
    StressRising,
    StressDeclining,
    StressStable,
}

impl PatternCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternCode::BurnoutRisk => "BURNOUT_RISK",
            PatternCode::StressRising => "STRESS_RISING",
            PatternCode::StressDeclining => "STRESS_DECLINING",
            PatternCode::StressStable => "STRESS_STABLE",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        [
            PatternCode::BurnoutRisk,
            PatternCode::StressRising,
            PatternCode::StressDeclining,
            PatternCode::StressStable,
        ]
        .into_iter()
        .find(|p| p.as_str() == label)
    }
}

/// Append-only pattern log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternInsight {
    pub identity_hash: IdentityHash,
    pub pattern_code: PatternCode,
    /// Classification confidence (0-1)
    pub confidence: f64,
    /// First day of the month the insight belongs to
    pub month_start: NaiveDate,
    pub detected_at: DateTime<Utc>,
}

/// Half-open time interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `days` days ending at `now`
    pub fn last_days(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: now - chrono::Duration::days(days),
            end: now,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_metric_name_round_trip() {
        for name in MetricName::ALL {
            assert_eq!(MetricName::parse(name.as_str()), Some(name));
        }
        assert_eq!(MetricName::parse("notes"), None);
    }

    #[test]
    fn test_metric_name_serializes_snake_case() {
        let json = serde_json::to_string(&MetricName::StressLevel).unwrap();
        assert_eq!(json, "\"stress_level\"");
    }

    #[test]
    fn test_pattern_code_labels() {
        let json = serde_json::to_string(&PatternCode::BurnoutRisk).unwrap();
        assert_eq!(json, "\"BURNOUT_RISK\"");
        assert_eq!(PatternCode::parse("STRESS_STABLE"), Some(PatternCode::StressStable));
    }

    #[test]
    fn test_time_range_is_half_open() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        let range = TimeRange::new(start, end);

        assert!(range.contains(start));
        assert!(!range.contains(end));
    }
}
