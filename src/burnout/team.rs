//! Team-level risk roll-up
//!
//! The team assessment consumes a precomputed roll-up (counts and an
//! average) and never recomputes individual risk.

use serde::{Deserialize, Serialize};

use super::{BurnoutRiskAssessment, InterventionUrgency, RiskLevel, Trend};
use crate::error::AnalyticsError;

/// Estimated cost of losing one interpreter to burnout (recruiting,
/// onboarding, lost assignments)
pub const REPLACEMENT_COST: f64 = 15_000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub minimal: u32,
    pub low: u32,
    pub moderate: u32,
    pub high: u32,
    pub critical: u32,
}

impl RiskDistribution {
    pub fn total(&self) -> u32 {
        self.minimal + self.low + self.moderate + self.high + self.critical
    }

    fn add(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Minimal => self.minimal += 1,
            RiskLevel::Low => self.low += 1,
            RiskLevel::Moderate => self.moderate += 1,
            RiskLevel::High => self.high += 1,
            RiskLevel::Critical => self.critical += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendCounts {
    pub stable: u32,
    pub declining: u32,
    pub worsening: u32,
}

/// Per-team aggregate handed in by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamRiskRollup {
    pub member_count: u32,
    pub distribution: RiskDistribution,
    pub average_score: f64,
    pub trend_counts: TrendCounts,
}

impl TeamRiskRollup {
    /// Build a roll-up from individual assessments
    pub fn from_assessments(assessments: &[BurnoutRiskAssessment]) -> Self {
        let mut distribution = RiskDistribution::default();
        let mut trend_counts = TrendCounts::default();

        for assessment in assessments {
            distribution.add(assessment.risk_level);
            match assessment.trend {
                Trend::Stable => trend_counts.stable += 1,
                Trend::Declining => trend_counts.declining += 1,
                Trend::Worsening => trend_counts.worsening += 1,
            }
        }

        let average_score = if assessments.is_empty() {
            0.0
        } else {
            assessments.iter().map(|a| a.risk_score).sum::<f64>() / assessments.len() as f64
        };

        Self {
            member_count: assessments.len() as u32,
            distribution,
            average_score,
            trend_counts,
        }
    }
}

/// Team-level view of burnout risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRiskAssessment {
    pub member_count: u32,
    pub team_risk_level: RiskLevel,
    /// Share of members at high or critical risk
    pub at_risk_share: f64,
    /// Share of members whose load is worsening
    pub worsening_share: f64,
    pub estimated_annual_cost_impact: f64,
    pub urgency: InterventionUrgency,
    pub recommendations: Vec<String>,
}

impl TeamRiskAssessment {
    pub fn assess(rollup: &TeamRiskRollup) -> Result<Self, AnalyticsError> {
        validate(rollup)?;

        let n = rollup.member_count as f64;
        let dist = &rollup.distribution;
        let at_risk_share = (dist.high + dist.critical) as f64 / n;
        let worsening_share = rollup.trend_counts.worsening as f64 / n;

        let mut team_risk_level = RiskLevel::from_score(rollup.average_score);
        if (dist.critical as f64 / n >= 0.2 || at_risk_share >= 0.5)
            && team_risk_level < RiskLevel::High
        {
            team_risk_level = RiskLevel::High;
        }

        let estimated_annual_cost_impact = (REPLACEMENT_COST
            * (0.5 * dist.critical as f64 + 0.25 * dist.high as f64 + 0.1 * dist.moderate as f64))
            .round();

        let mut recommendations = Vec::new();
        if at_risk_share >= 0.3 {
            recommendations
                .push("Redistribute high-intensity assignments across the team".to_string());
        }
        if dist.critical > 0 {
            recommendations
                .push("Arrange confidential professional support for members at critical risk".to_string());
        }
        if worsening_share >= 0.5 {
            recommendations.push("Review scheduling and team workload".to_string());
        }
        if team_risk_level >= RiskLevel::Moderate {
            recommendations.push("Hold regular team debriefs after difficult assignments".to_string());
        }
        if recommendations.is_empty() {
            recommendations.push("Maintain current practices and monthly check-ins".to_string());
        }

        Ok(Self {
            member_count: rollup.member_count,
            team_risk_level,
            at_risk_share: round2(at_risk_share),
            worsening_share: round2(worsening_share),
            estimated_annual_cost_impact,
            urgency: InterventionUrgency::from_level(team_risk_level),
            recommendations,
        })
    }
}

fn validate(rollup: &TeamRiskRollup) -> Result<(), AnalyticsError> {
    if rollup.member_count == 0 {
        return Err(AnalyticsError::Validation(
            "team roll-up has no members".to_string(),
        ));
    }
    if rollup.distribution.total() != rollup.member_count {
        return Err(AnalyticsError::Validation(format!(
            "risk distribution covers {} members, expected {}",
            rollup.distribution.total(),
            rollup.member_count
        )));
    }
    let trends = &rollup.trend_counts;
    if trends.stable + trends.declining + trends.worsening > rollup.member_count {
        return Err(AnalyticsError::Validation(
            "trend counts exceed member count".to_string(),
        ));
    }
    let avg = rollup.average_score;
    if !avg.is_finite() || !(0.0..=10.0).contains(&avg) {
        return Err(AnalyticsError::out_of_range("average_score", avg, 0.0, 10.0));
    }
    Ok(())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::burnout::BurnoutRiskPredictor;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn rollup(dist: RiskDistribution, avg: f64, worsening: u32) -> TeamRiskRollup {
        TeamRiskRollup {
            member_count: dist.total(),
            distribution: dist,
            average_score: avg,
            trend_counts: TrendCounts {
                stable: dist.total() - worsening,
                declining: 0,
                worsening,
            },
        }
    }

    #[test]
    fn test_concentrated_risk_escalates_team_level() {
        let dist = RiskDistribution {
            minimal: 2,
            low: 1,
            moderate: 0,
            high: 1,
            critical: 1,
        };
        let team = TeamRiskAssessment::assess(&rollup(dist, 3.5, 3)).unwrap();

        assert_eq!(team.team_risk_level, RiskLevel::High);
        assert_eq!(team.urgency, InterventionUrgency::Urgent);
        assert_eq!(team.at_risk_share, 0.4);
        assert_eq!(team.worsening_share, 0.6);
        assert_eq!(team.estimated_annual_cost_impact, 11_250.0);
        assert!(team.recommendations.len() >= 3);
    }

    #[test]
    fn test_healthy_team() {
        let dist = RiskDistribution {
            minimal: 3,
            low: 1,
            ..Default::default()
        };
        let team = TeamRiskAssessment::assess(&rollup(dist, 1.2, 0)).unwrap();

        assert_eq!(team.team_risk_level, RiskLevel::Minimal);
        assert_eq!(team.estimated_annual_cost_impact, 0.0);
        assert_eq!(team.recommendations.len(), 1);
    }

    #[test]
    fn test_inconsistent_rollup_rejected() {
        let mut bad = rollup(
            RiskDistribution {
                low: 2,
                ..Default::default()
            },
            2.0,
            0,
        );
        bad.member_count = 5;
        assert!(matches!(
            TeamRiskAssessment::assess(&bad),
            Err(AnalyticsError::Validation(_))
        ));
        assert!(TeamRiskAssessment::assess(&TeamRiskRollup::default()).is_err());
    }

    #[test]
    fn test_from_assessments() {
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let a = BurnoutRiskPredictor::provisional_default(now);
        let rollup = TeamRiskRollup::from_assessments(&[a.clone(), a]);

        assert_eq!(rollup.member_count, 2);
        assert_eq!(rollup.distribution.moderate, 2);
        assert_eq!(rollup.trend_counts.stable, 2);
        assert_eq!(rollup.average_score, 5.0);
        assert!(TeamRiskAssessment::assess(&rollup).is_ok());
    }
}
