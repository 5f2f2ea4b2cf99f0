//! Emotional labor roll-up over a time range
//!
//! Summarizes stored [`EmotionalLaborEntry`] records and compares each
//! context against a fixed industry benchmark.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{EmotionalLaborEntry, URGENT_RISK_FACTOR};
use crate::types::{ContextType, TimeRange};

/// Distance from the benchmark multiplier still reported as "within"
pub const BENCHMARK_TOLERANCE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkPosition {
    Above,
    Within,
    Below,
}

/// Typical (multiplier, surface acting) for a context
fn benchmark(context: ContextType) -> (f64, f64) {
    match context {
        ContextType::Medical => (1.6, 6.0),
        ContextType::Legal => (1.5, 5.5),
        ContextType::MentalHealth => (1.7, 6.5),
        ContextType::Educational => (1.2, 3.5),
        ContextType::Business => (1.1, 3.0),
        ContextType::Community => (1.35, 4.5),
        ContextType::Conference => (1.15, 3.0),
        ContextType::General => (1.25, 4.0),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextBreakdown {
    pub sessions: u32,
    pub total_minutes: f64,
    pub mean_multiplier: f64,
    pub mean_surface_acting: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub context: ContextType,
    pub sessions: u32,
    pub mean_multiplier: f64,
    pub benchmark_multiplier: f64,
    pub mean_surface_acting: f64,
    pub benchmark_surface_acting: f64,
    pub position: BenchmarkPosition,
}

/// Rolled-up labor statistics for one identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaborAnalytics {
    pub range: TimeRange,
    pub session_count: u32,
    pub total_minutes: f64,
    pub trauma_sessions: u32,
    /// Sessions whose burnout risk factor exceeded the urgent threshold
    pub high_risk_sessions: u32,
    pub mean_multiplier: f64,
    pub max_multiplier: f64,
    /// Hazard pay earned across the range (hourly hazard pay times hours)
    pub total_hazard_pay: f64,
    pub mean_burnout_risk_factor: f64,
    pub mean_surface_acting: f64,
    pub mean_dissonance: f64,
    pub by_context: BTreeMap<ContextType, ContextBreakdown>,
    pub benchmarks: Vec<BenchmarkComparison>,
}

impl LaborAnalytics {
    /// Summarize the entries that fall within `range`
    pub fn summarize(entries: &[EmotionalLaborEntry], range: TimeRange) -> Self {
        let entries: Vec<&EmotionalLaborEntry> = entries
            .iter()
            .filter(|e| range.contains(e.recorded_at))
            .collect();

        let mut grouped: BTreeMap<ContextType, Vec<&EmotionalLaborEntry>> = BTreeMap::new();
        for entry in &entries {
            grouped.entry(entry.context).or_default().push(entry);
        }

        let by_context: BTreeMap<ContextType, ContextBreakdown> = grouped
            .iter()
            .map(|(context, group)| {
                let breakdown = ContextBreakdown {
                    sessions: group.len() as u32,
                    total_minutes: round2(group.iter().map(|e| e.duration_minutes).sum()),
                    mean_multiplier: mean_of(group, |e| e.multiplier),
                    mean_surface_acting: mean_of(group, |e| e.assessment.surface_acting),
                };
                (*context, breakdown)
            })
            .collect();

        let benchmarks = by_context
            .iter()
            .map(|(context, breakdown)| {
                let (benchmark_multiplier, benchmark_surface_acting) = benchmark(*context);
                let delta = breakdown.mean_multiplier - benchmark_multiplier;
                let position = if delta > BENCHMARK_TOLERANCE {
                    BenchmarkPosition::Above
                } else if delta < -BENCHMARK_TOLERANCE {
                    BenchmarkPosition::Below
                } else {
                    BenchmarkPosition::Within
                };
                BenchmarkComparison {
                    context: *context,
                    sessions: breakdown.sessions,
                    mean_multiplier: breakdown.mean_multiplier,
                    benchmark_multiplier,
                    mean_surface_acting: breakdown.mean_surface_acting,
                    benchmark_surface_acting,
                    position,
                }
            })
            .collect();

        Self {
            range,
            session_count: entries.len() as u32,
            total_minutes: round2(entries.iter().map(|e| e.duration_minutes).sum()),
            trauma_sessions: entries.iter().filter(|e| e.trauma_exposure).count() as u32,
            high_risk_sessions: entries
                .iter()
                .filter(|e| e.burnout_risk_factor > URGENT_RISK_FACTOR)
                .count() as u32,
            mean_multiplier: mean_of(&entries, |e| e.multiplier),
            max_multiplier: entries.iter().map(|e| e.multiplier).fold(0.0, f64::max),
            total_hazard_pay: round2(
                entries
                    .iter()
                    .map(|e| e.hazard_pay * e.duration_minutes / 60.0)
                    .sum(),
            ),
            mean_burnout_risk_factor: mean_of(&entries, |e| e.burnout_risk_factor),
            mean_surface_acting: mean_of(&entries, |e| e.assessment.surface_acting),
            mean_dissonance: mean_of(&entries, |e| e.assessment.emotional_dissonance),
            by_context,
            benchmarks,
        }
    }
}

fn mean_of(entries: &[&EmotionalLaborEntry], f: impl Fn(&EmotionalLaborEntry) -> f64) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    round2(entries.iter().map(|e| f(e)).sum::<f64>() / entries.len() as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
