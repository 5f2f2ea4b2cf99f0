//! Known submission shapes
//!
//! The host application sends an arbitrary string-keyed JSON object plus a
//! form-type hint. At the boundary that object is converted into a
//! [`Submission`]: one variant per reflection category, each carrying a
//! typed struct that names exactly the metric keys that shape may
//! contribute. Keys a shape does not name never leave this module.
//!
//! Conversion never fails. Non-numeric values, non-finite numbers, and
//! non-object payloads are treated as absent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{MetricName, ReflectionCategory};

/// Read one allow-listed key as a finite number
fn read_metric(fields: &Map<String, Value>, name: MetricName) -> Option<f64> {
    let value = match fields.get(name.as_str())? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Common behaviour of every submission shape
pub trait SubmissionShape {
    /// Allow-listed keys for this shape
    const KEYS: &'static [MetricName];

    /// Raw (unsanitized) readings keyed by metric name
    fn readings(&self) -> Vec<(MetricName, Option<f64>)>;
}

/// Readiness check before an assignment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreSessionMetrics {
    pub stress_level: Option<f64>,
    pub energy_level: Option<f64>,
    pub confidence_score: Option<f64>,
    pub preparation_level: Option<f64>,
}

impl SubmissionShape for PreSessionMetrics {
    const KEYS: &'static [MetricName] = &[
        MetricName::StressLevel,
        MetricName::EnergyLevel,
        MetricName::ConfidenceScore,
        MetricName::PreparationLevel,
    ];

    fn readings(&self) -> Vec<(MetricName, Option<f64>)> {
        vec![
            (MetricName::StressLevel, self.stress_level),
            (MetricName::EnergyLevel, self.energy_level),
            (MetricName::ConfidenceScore, self.confidence_score),
            (MetricName::PreparationLevel, self.preparation_level),
        ]
    }
}

/// Debrief after an assignment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostSessionMetrics {
    pub stress_level: Option<f64>,
    pub energy_level: Option<f64>,
    pub emotional_intensity: Option<f64>,
    pub session_satisfaction: Option<f64>,
    pub burnout_score: Option<f64>,
}

impl SubmissionShape for PostSessionMetrics {
    const KEYS: &'static [MetricName] = &[
        MetricName::StressLevel,
        MetricName::EnergyLevel,
        MetricName::EmotionalIntensity,
        MetricName::SessionSatisfaction,
        MetricName::BurnoutScore,
    ];

    fn readings(&self) -> Vec<(MetricName, Option<f64>)> {
        vec![
            (MetricName::StressLevel, self.stress_level),
            (MetricName::EnergyLevel, self.energy_level),
            (MetricName::EmotionalIntensity, self.emotional_intensity),
            (MetricName::SessionSatisfaction, self.session_satisfaction),
            (MetricName::BurnoutScore, self.burnout_score),
        ]
    }
}

/// Stress management exercise
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressMetrics {
    pub stress_level: Option<f64>,
    pub energy_level: Option<f64>,
    pub burnout_score: Option<f64>,
}

impl SubmissionShape for StressMetrics {
    const KEYS: &'static [MetricName] = &[
        MetricName::StressLevel,
        MetricName::EnergyLevel,
        MetricName::BurnoutScore,
    ];

    fn readings(&self) -> Vec<(MetricName, Option<f64>)> {
        vec![
            (MetricName::StressLevel, self.stress_level),
            (MetricName::EnergyLevel, self.energy_level),
            (MetricName::BurnoutScore, self.burnout_score),
        ]
    }
}

/// Team or booth-partner sync
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamSyncMetrics {
    pub stress_level: Option<f64>,
    pub energy_level: Option<f64>,
    pub confidence_score: Option<f64>,
    pub team_cohesion: Option<f64>,
}

impl SubmissionShape for TeamSyncMetrics {
    const KEYS: &'static [MetricName] = &[
        MetricName::StressLevel,
        MetricName::EnergyLevel,
        MetricName::ConfidenceScore,
        MetricName::TeamCohesion,
    ];

    fn readings(&self) -> Vec<(MetricName, Option<f64>)> {
        vec![
            (MetricName::StressLevel, self.stress_level),
            (MetricName::EnergyLevel, self.energy_level),
            (MetricName::ConfidenceScore, self.confidence_score),
            (MetricName::TeamCohesion, self.team_cohesion),
        ]
    }
}

/// Dedicated burnout self-assessment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurnoutCheckMetrics {
    pub burnout_score: Option<f64>,
    pub energy_level: Option<f64>,
    pub stress_level: Option<f64>,
}

impl SubmissionShape for BurnoutCheckMetrics {
    const KEYS: &'static [MetricName] = &[
        MetricName::BurnoutScore,
        MetricName::EnergyLevel,
        MetricName::StressLevel,
    ];

    fn readings(&self) -> Vec<(MetricName, Option<f64>)> {
        vec![
            (MetricName::BurnoutScore, self.burnout_score),
            (MetricName::EnergyLevel, self.energy_level),
            (MetricName::StressLevel, self.stress_level),
        ]
    }
}

/// Periodic wellness check-in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WellnessCheckMetrics {
    pub stress_level: Option<f64>,
    pub energy_level: Option<f64>,
    pub confidence_score: Option<f64>,
    pub burnout_score: Option<f64>,
    pub mood_score: Option<f64>,
}

impl SubmissionShape for WellnessCheckMetrics {
    const KEYS: &'static [MetricName] = &[
        MetricName::StressLevel,
        MetricName::EnergyLevel,
        MetricName::ConfidenceScore,
        MetricName::BurnoutScore,
        MetricName::MoodScore,
    ];

    fn readings(&self) -> Vec<(MetricName, Option<f64>)> {
        vec![
            (MetricName::StressLevel, self.stress_level),
            (MetricName::EnergyLevel, self.energy_level),
            (MetricName::ConfidenceScore, self.confidence_score),
            (MetricName::BurnoutScore, self.burnout_score),
            (MetricName::MoodScore, self.mood_score),
        ]
    }
}

/// Quick mood entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodMetrics {
    pub mood_score: Option<f64>,
    pub energy_level: Option<f64>,
    pub stress_level: Option<f64>,
}

impl SubmissionShape for MoodMetrics {
    const KEYS: &'static [MetricName] = &[
        MetricName::MoodScore,
        MetricName::EnergyLevel,
        MetricName::StressLevel,
    ];

    fn readings(&self) -> Vec<(MetricName, Option<f64>)> {
        vec![
            (MetricName::MoodScore, self.mood_score),
            (MetricName::EnergyLevel, self.energy_level),
            (MetricName::StressLevel, self.stress_level),
        ]
    }
}

/// Fallback shape for unrecognized forms: the four core metrics only
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreCheckIn {
    pub stress_level: Option<f64>,
    pub energy_level: Option<f64>,
    pub confidence_score: Option<f64>,
    pub burnout_score: Option<f64>,
}

impl SubmissionShape for CoreCheckIn {
    const KEYS: &'static [MetricName] = &[
        MetricName::StressLevel,
        MetricName::EnergyLevel,
        MetricName::ConfidenceScore,
        MetricName::BurnoutScore,
    ];

    fn readings(&self) -> Vec<(MetricName, Option<f64>)> {
        vec![
            (MetricName::StressLevel, self.stress_level),
            (MetricName::EnergyLevel, self.energy_level),
            (MetricName::ConfidenceScore, self.confidence_score),
            (MetricName::BurnoutScore, self.burnout_score),
        ]
    }
}

/// A submission validated into one of the known shapes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Submission {
    PreSession(PreSessionMetrics),
    PostSession(PostSessionMetrics),
    StressManagement(StressMetrics),
    TeamSync(TeamSyncMetrics),
    BurnoutCheck(BurnoutCheckMetrics),
    WellnessCheck(WellnessCheckMetrics),
    MoodLog(MoodMetrics),
    General(CoreCheckIn),
}

impl Submission {
    /// Build the shape for `category` from an untyped JSON payload
    pub fn from_raw(category: ReflectionCategory, fields: &Value) -> Self {
        let empty = Map::new();
        let fields = fields.as_object().unwrap_or(&empty);
        let m = |name| read_metric(fields, name);

        match category {
            ReflectionCategory::PreSession => Submission::PreSession(PreSessionMetrics {
                stress_level: m(MetricName::StressLevel),
                energy_level: m(MetricName::EnergyLevel),
                confidence_score: m(MetricName::ConfidenceScore),
                preparation_level: m(MetricName::PreparationLevel),
            }),
            ReflectionCategory::PostSession => Submission::PostSession(PostSessionMetrics {
                stress_level: m(MetricName::StressLevel),
                energy_level: m(MetricName::EnergyLevel),
                emotional_intensity: m(MetricName::EmotionalIntensity),
                session_satisfaction: m(MetricName::SessionSatisfaction),
                burnout_score: m(MetricName::BurnoutScore),
            }),
            ReflectionCategory::StressManagement => Submission::StressManagement(StressMetrics {
                stress_level: m(MetricName::StressLevel),
                energy_level: m(MetricName::EnergyLevel),
                burnout_score: m(MetricName::BurnoutScore),
            }),
            ReflectionCategory::TeamSync => Submission::TeamSync(TeamSyncMetrics {
                stress_level: m(MetricName::StressLevel),
                energy_level: m(MetricName::EnergyLevel),
                confidence_score: m(MetricName::ConfidenceScore),
                team_cohesion: m(MetricName::TeamCohesion),
            }),
            ReflectionCategory::BurnoutCheck => Submission::BurnoutCheck(BurnoutCheckMetrics {
                burnout_score: m(MetricName::BurnoutScore),
                energy_level: m(MetricName::EnergyLevel),
                stress_level: m(MetricName::StressLevel),
            }),
            ReflectionCategory::WellnessCheck => {
                Submission::WellnessCheck(WellnessCheckMetrics {
                    stress_level: m(MetricName::StressLevel),
                    energy_level: m(MetricName::EnergyLevel),
                    confidence_score: m(MetricName::ConfidenceScore),
                    burnout_score: m(MetricName::BurnoutScore),
                    mood_score: m(MetricName::MoodScore),
                })
            }
            ReflectionCategory::MoodLog => Submission::MoodLog(MoodMetrics {
                mood_score: m(MetricName::MoodScore),
                energy_level: m(MetricName::EnergyLevel),
                stress_level: m(MetricName::StressLevel),
            }),
            ReflectionCategory::General => Submission::General(CoreCheckIn {
                stress_level: m(MetricName::StressLevel),
                energy_level: m(MetricName::EnergyLevel),
                confidence_score: m(MetricName::ConfidenceScore),
                burnout_score: m(MetricName::BurnoutScore),
            }),
        }
    }

    pub fn category(&self) -> ReflectionCategory {
        match self {
            Submission::PreSession(_) => ReflectionCategory::PreSession,
            Submission::PostSession(_) => ReflectionCategory::PostSession,
            Submission::StressManagement(_) => ReflectionCategory::StressManagement,
            Submission::TeamSync(_) => ReflectionCategory::TeamSync,
            Submission::BurnoutCheck(_) => ReflectionCategory::BurnoutCheck,
            Submission::WellnessCheck(_) => ReflectionCategory::WellnessCheck,
            Submission::MoodLog(_) => ReflectionCategory::MoodLog,
            Submission::General(_) => ReflectionCategory::General,
        }
    }

    /// Allow-listed keys for this submission's shape
    pub fn allowed_keys(&self) -> &'static [MetricName] {
        match self {
            Submission::PreSession(_) => PreSessionMetrics::KEYS,
            Submission::PostSession(_) => PostSessionMetrics::KEYS,
            Submission::StressManagement(_) => StressMetrics::KEYS,
            Submission::TeamSync(_) => TeamSyncMetrics::KEYS,
            Submission::BurnoutCheck(_) => BurnoutCheckMetrics::KEYS,
            Submission::WellnessCheck(_) => WellnessCheckMetrics::KEYS,
            Submission::MoodLog(_) => MoodMetrics::KEYS,
            Submission::General(_) => CoreCheckIn::KEYS,
        }
    }

    /// Present readings only
    pub fn readings(&self) -> Vec<(MetricName, f64)> {
        let all = match self {
            Submission::PreSession(s) => s.readings(),
            Submission::PostSession(s) => s.readings(),
            Submission::StressManagement(s) => s.readings(),
            Submission::TeamSync(s) => s.readings(),
            Submission::BurnoutCheck(s) => s.readings(),
            Submission::WellnessCheck(s) => s.readings(),
            Submission::MoodLog(s) => s.readings(),
            Submission::General(s) => s.readings(),
        };
        all.into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_unknown_keys_ignored() {
        let raw = json!({
            "stress_level": 6,
            "notes": "long day with a difficult client",
            "client_name": "J. Doe",
            "preparation_level": 9
        });
        let submission = Submission::from_raw(ReflectionCategory::StressManagement, &raw);

        assert_eq!(submission.readings(), vec![(MetricName::StressLevel, 6.0)]);
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let raw = json!({ "energy_level": " 4.5 ", "stress_level": "high" });
        let submission = Submission::from_raw(ReflectionCategory::General, &raw);

        assert_eq!(submission.readings(), vec![(MetricName::EnergyLevel, 4.5)]);
    }

    #[test]
    fn test_non_object_payload_yields_empty_shape() {
        let submission = Submission::from_raw(ReflectionCategory::PostSession, &json!([1, 2, 3]));
        assert!(submission.readings().is_empty());
        assert_eq!(submission.category(), ReflectionCategory::PostSession);
    }

    #[test]
    fn test_non_numeric_types_dropped() {
        let raw = json!({
            "stress_level": true,
            "energy_level": null,
            "confidence_score": {"value": 3},
            "burnout_score": [7]
        });
        let submission = Submission::from_raw(ReflectionCategory::General, &raw);
        assert!(submission.readings().is_empty());
    }

    #[test]
    fn test_every_category_has_a_shape() {
        let raw = json!({});
        for label in [
            "pre_session",
            "post_session",
            "stress_management",
            "team_sync",
            "burnout_check",
            "wellness_check",
            "mood_log",
            "general",
        ] {
            let category = ReflectionCategory::parse(label).unwrap();
            let submission = Submission::from_raw(category, &raw);
            assert_eq!(submission.category(), category);
            assert!(!submission.allowed_keys().is_empty());
        }
    }

    #[test]
    fn test_typed_submission_deserializes() {
        let submission: Submission = serde_json::from_value(json!({
            "kind": "team_sync",
            "team_cohesion": 8.0,
            "stress_level": 3.0
        }))
        .unwrap();

        assert_eq!(submission.category(), ReflectionCategory::TeamSync);
        assert_eq!(
            submission.readings(),
            vec![
                (MetricName::StressLevel, 3.0),
                (MetricName::TeamCohesion, 8.0)
            ]
        );
    }
}
