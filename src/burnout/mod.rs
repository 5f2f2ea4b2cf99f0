//! Burnout risk prediction
//!
//! The predictor combines at least [`MIN_HISTORY_WEEKS`] weekly buckets
//! into a bounded 0-10 score:
//! - Stress: current level and share of high-stress weeks
//! - Burnout: current and peak self-reported score
//! - Energy: recent level, low-energy share, stability and slope
//! - Engagement: check-ins per week over the recent window
//! - Flags: chronic stress and recovery needed
//!
//! A trend over composite weekly load is blended in at 20%, and the result
//! is scaled by how complete the history is. Every sub-score is monotone
//! non-decreasing in stress and burnout.

pub mod intervention;
pub mod team;

pub use intervention::{ActionCategory, InterventionAction, InterventionPlan, ResourceLink};
pub use team::{RiskDistribution, TeamRiskAssessment, TeamRiskRollup, TrendCounts};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::store::{HIGH_STRESS_THRESHOLD, LOW_ENERGY_THRESHOLD};
use crate::types::WellnessMetricBucket;

/// Minimum number of weekly buckets for a computed assessment
pub const MIN_HISTORY_WEEKS: usize = 3;

/// Number of weeks the service loads for an assessment
pub const ASSESSMENT_WINDOW_WEEKS: usize = 12;

/// Window used for engagement frequency
pub const ENGAGEMENT_WINDOW_WEEKS: i64 = 4;

/// History length at which confidence stops growing
const FULL_CONFIDENCE_WEEKS: f64 = 6.0;

/// Share of high-stress weeks that counts as chronic
const CHRONIC_STRESS_SHARE: f64 = 0.6;

/// Trend differences inside this band are reported as stable
const TREND_DEAD_BAND: f64 = 0.5;

/// Score at which the level becomes critical
const CRITICAL_SCORE: f64 = 8.0;

/// Projection horizon for `weeks_until_burnout`
const MAX_PROJECTION_WEEKS: u32 = 52;

/// Energy sub-score when no week reports energy
const NEUTRAL_ENERGY_SCORE: f64 = 5.0;

/// Risk level derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Minimal,
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 8.0 {
            RiskLevel::Critical
        } else if score >= 6.0 {
            RiskLevel::High
        } else if score >= 4.0 {
            RiskLevel::Moderate
        } else if score >= 2.0 {
            RiskLevel::Low
        } else {
            RiskLevel::Minimal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Minimal => "minimal",
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Direction of composite weekly load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Stable,
    /// Load is falling: risk is easing
    Declining,
    /// Load is rising
    Worsening,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Stable => "stable",
            Trend::Declining => "declining",
            Trend::Worsening => "worsening",
        }
    }
}

/// How soon someone should act on an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionUrgency {
    Monitoring,
    Recommended,
    Urgent,
    Immediate,
}

impl InterventionUrgency {
    pub fn from_level(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Critical => InterventionUrgency::Immediate,
            RiskLevel::High => InterventionUrgency::Urgent,
            RiskLevel::Moderate => InterventionUrgency::Recommended,
            RiskLevel::Low | RiskLevel::Minimal => InterventionUrgency::Monitoring,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InterventionUrgency::Monitoring => "monitoring",
            InterventionUrgency::Recommended => "recommended",
            InterventionUrgency::Urgent => "urgent",
            InterventionUrgency::Immediate => "immediate",
        }
    }
}

/// Inputs behind a score, reported alongside it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskFactors {
    pub weeks_analyzed: usize,
    /// Least-squares energy slope (points per week)
    pub energy_trend: f64,
    /// Variance of weekly energy
    pub energy_stability: f64,
    /// Share of weeks with energy < 4
    pub low_energy_frequency: f64,
    pub current_stress: Option<f64>,
    /// Share of weeks with stress > 7
    pub high_stress_frequency: f64,
    pub current_burnout: Option<f64>,
    pub peak_burnout: Option<f64>,
    pub chronic_stress_detected: bool,
    pub recovery_needed: bool,
    /// History length times field coverage (0-1)
    pub confidence_level: f64,
    /// Check-ins per week over the engagement window
    pub engagement_frequency: f64,
    pub low_engagement: bool,
    pub declining_energy: bool,
}

/// Whether an assessment was computed or is a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentBasis {
    Computed,
    ProvisionalDefault,
}

/// Composite burnout risk for one identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnoutRiskAssessment {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub trend: Trend,
    pub weeks_until_burnout: Option<u32>,
    pub intervention_urgency: InterventionUrgency,
    pub factors: RiskFactors,
    pub basis: AssessmentBasis,
    pub assessment_date: DateTime<Utc>,
}

/// Caller's choice for histories shorter than [`MIN_HISTORY_WEEKS`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsufficientDataPolicy {
    /// Return [`BurnoutRiskOutcome::InsufficientData`]
    #[default]
    Report,
    /// Return a moderate/monitoring placeholder marked as provisional
    ProvisionalDefault,
}

/// Result of a service-level risk request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BurnoutRiskOutcome {
    Assessed(BurnoutRiskAssessment),
    InsufficientData { available: usize, required: usize },
    Provisional(BurnoutRiskAssessment),
}

impl BurnoutRiskOutcome {
    /// The assessment, if one was produced (computed or provisional)
    pub fn assessment(&self) -> Option<&BurnoutRiskAssessment> {
        match self {
            BurnoutRiskOutcome::Assessed(a) | BurnoutRiskOutcome::Provisional(a) => Some(a),
            BurnoutRiskOutcome::InsufficientData { .. } => None,
        }
    }
}

/// Stateless burnout risk predictor
pub struct BurnoutRiskPredictor;

impl BurnoutRiskPredictor {
    /// Assess risk from weekly buckets (oldest first).
    ///
    /// `engagement_per_week` is the check-in rate over the recent window.
    pub fn assess(
        buckets: &[WellnessMetricBucket],
        engagement_per_week: f64,
        now: DateTime<Utc>,
    ) -> Result<BurnoutRiskAssessment, AnalyticsError> {
        if buckets.len() < MIN_HISTORY_WEEKS {
            return Err(AnalyticsError::InsufficientData {
                available: buckets.len(),
                required: MIN_HISTORY_WEEKS,
            });
        }
        if !engagement_per_week.is_finite() || engagement_per_week < 0.0 {
            return Err(AnalyticsError::Validation(format!(
                "engagement_per_week must be a non-negative number, got {engagement_per_week}"
            )));
        }

        let factors = compute_factors(buckets, engagement_per_week);
        let loads = weekly_loads(buckets);
        let diff = trend_difference(&loads);
        let trend = classify_trend(diff);

        let base = 0.30 * stress_score(&factors)
            + 0.30 * burnout_component(&factors)
            + 0.25 * energy_score(buckets, &factors)
            + 0.05 * engagement_score(&factors)
            + if factors.chronic_stress_detected { 1.0 } else { 0.0 }
            + if factors.recovery_needed { 0.5 } else { 0.0 };

        let trend_score = (5.0 + diff * 2.5).clamp(0.0, 10.0);
        let blended = 0.8 * base + 0.2 * trend_score;
        let risk_score = round2((blended * (0.85 + 0.15 * factors.confidence_level)).clamp(0.0, 10.0));

        let risk_level = RiskLevel::from_score(risk_score);
        let weeks_until_burnout = project_weeks(risk_score, risk_level, trend, &loads);

        tracing::debug!(
            score = risk_score,
            level = risk_level.as_str(),
            trend = trend.as_str(),
            weeks = factors.weeks_analyzed,
            "Burnout risk assessed"
        );

        Ok(BurnoutRiskAssessment {
            risk_score,
            risk_level,
            trend,
            weeks_until_burnout,
            intervention_urgency: InterventionUrgency::from_level(risk_level),
            factors,
            basis: AssessmentBasis::Computed,
            assessment_date: now,
        })
    }

    /// Placeholder assessment for callers that opted into one
    pub fn provisional_default(now: DateTime<Utc>) -> BurnoutRiskAssessment {
        BurnoutRiskAssessment {
            risk_score: 5.0,
            risk_level: RiskLevel::Moderate,
            trend: Trend::Stable,
            weeks_until_burnout: None,
            intervention_urgency: InterventionUrgency::Monitoring,
            factors: RiskFactors::default(),
            basis: AssessmentBasis::ProvisionalDefault,
            assessment_date: now,
        }
    }
}

fn compute_factors(buckets: &[WellnessMetricBucket], engagement_per_week: f64) -> RiskFactors {
    let n = buckets.len();
    let first_week = buckets[0].week_start;

    let stress: Vec<f64> = buckets.iter().filter_map(|b| b.stress_level).collect();
    let burnout: Vec<f64> = buckets.iter().filter_map(|b| b.burnout_score).collect();
    let energy: Vec<(f64, f64)> = buckets
        .iter()
        .filter_map(|b| {
            let week = (b.week_start - first_week).num_weeks() as f64;
            b.energy_level.map(|e| (week, e))
        })
        .collect();
    let energy_values: Vec<f64> = energy.iter().map(|(_, e)| *e).collect();

    let high_stress_weeks = stress.iter().filter(|s| **s > HIGH_STRESS_THRESHOLD).count();
    let high_stress_frequency = high_stress_weeks as f64 / n as f64;
    let low_energy_weeks = energy_values
        .iter()
        .filter(|e| **e < LOW_ENERGY_THRESHOLD)
        .count();

    let energy_trend = slope(&energy);

    let covered = buckets
        .iter()
        .map(|b| {
            [b.stress_level, b.energy_level, b.burnout_score]
                .iter()
                .filter(|v| v.is_some())
                .count()
        })
        .sum::<usize>();
    let coverage = covered as f64 / (3 * n) as f64;
    let history = (n as f64 / FULL_CONFIDENCE_WEEKS).min(1.0);

    RiskFactors {
        weeks_analyzed: n,
        energy_trend: round2(energy_trend),
        energy_stability: round2(variance(&energy_values)),
        low_energy_frequency: round2(low_energy_weeks as f64 / n as f64),
        current_stress: stress.last().copied(),
        high_stress_frequency: round2(high_stress_frequency),
        current_burnout: burnout.last().copied(),
        peak_burnout: burnout.iter().copied().reduce(f64::max),
        chronic_stress_detected: high_stress_frequency >= CHRONIC_STRESS_SHARE,
        recovery_needed: buckets[n - 1].recovery_needed,
        confidence_level: round2(history * coverage),
        engagement_frequency: round2(engagement_per_week),
        low_engagement: engagement_per_week < 1.0,
        declining_energy: energy_trend < -0.5,
    }
}

fn stress_score(f: &RiskFactors) -> f64 {
    0.6 * f.current_stress.unwrap_or(0.0) + 0.4 * f.high_stress_frequency * 10.0
}

fn burnout_component(f: &RiskFactors) -> f64 {
    0.6 * f.current_burnout.unwrap_or(0.0) + 0.4 * f.peak_burnout.unwrap_or(0.0)
}

fn energy_score(buckets: &[WellnessMetricBucket], f: &RiskFactors) -> f64 {
    let Some(recent) = buckets.iter().rev().find_map(|b| b.energy_level) else {
        return NEUTRAL_ENERGY_SCORE;
    };

    let score = 0.5 * (10.0 - recent)
        + 0.3 * f.low_energy_frequency * 10.0
        + 0.2 * (f.energy_stability.sqrt() * 3.0).min(10.0)
        + (-f.energy_trend).max(0.0);
    score.clamp(0.0, 10.0)
}

fn engagement_score(f: &RiskFactors) -> f64 {
    if f.engagement_frequency < 1.0 {
        10.0 * (1.0 - f.engagement_frequency)
    } else {
        0.0
    }
}

/// Composite weekly load: mean of the present values among stress,
/// burnout and inverted energy. Weeks with none of them are skipped.
fn weekly_loads(buckets: &[WellnessMetricBucket]) -> Vec<f64> {
    buckets
        .iter()
        .filter_map(|b| {
            let parts: Vec<f64> = [
                b.stress_level,
                b.burnout_score,
                b.energy_level.map(|e| 10.0 - e),
            ]
            .into_iter()
            .flatten()
            .collect();
            (!parts.is_empty()).then(|| parts.iter().sum::<f64>() / parts.len() as f64)
        })
        .collect()
}

/// Mean of the most recent k loads minus the mean of up to three loads
/// before them, where k = clamp(n / 2, 1, 3).
fn trend_difference(loads: &[f64]) -> f64 {
    let n = loads.len();
    if n < 2 {
        return 0.0;
    }
    let k = (n / 2).clamp(1, 3);
    let recent = &loads[n - k..];
    let prior_start = (n - k).saturating_sub(3);
    let prior = &loads[prior_start..n - k];

    mean(recent) - mean(prior)
}

fn classify_trend(diff: f64) -> Trend {
    if diff > TREND_DEAD_BAND {
        Trend::Worsening
    } else if diff < -TREND_DEAD_BAND {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

fn project_weeks(score: f64, level: RiskLevel, trend: Trend, loads: &[f64]) -> Option<u32> {
    if trend != Trend::Worsening {
        return None;
    }
    if level == RiskLevel::Critical {
        return Some(0);
    }

    let points: Vec<(f64, f64)> = loads
        .iter()
        .enumerate()
        .map(|(i, l)| (i as f64, *l))
        .collect();
    let rate = slope(&points);
    if rate <= 0.0 {
        return None;
    }

    let weeks = ((CRITICAL_SCORE - score) / rate).ceil();
    Some((weeks.max(1.0) as u32).min(MAX_PROJECTION_WEEKS))
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Least-squares slope of `(x, y)` points; 0 when undefined
fn slope(points: &[(f64, f64)]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (num, den) = points.iter().fold((0.0, 0.0), |(num, den), (x, y)| {
        (num + (x - mean_x) * (y - mean_y), den + (x - mean_x).powi(2))
    });
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
