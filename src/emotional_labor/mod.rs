//! Emotional labor quantification
//!
//! Turns one session's emotional-performance parameters into eleven 0-10
//! scores and a compensation recommendation. The quantifier is pure; the
//! service persists a de-identified [`EmotionalLaborEntry`] separately.
//!
//! Numeric inputs feed a pay figure, so anything non-finite or out of range
//! is rejected rather than clamped.

pub mod analytics;

pub use analytics::{BenchmarkComparison, BenchmarkPosition, ContextBreakdown, LaborAnalytics};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_BASE_RATE;
use crate::error::AnalyticsError;
use crate::identity::IdentityHash;
use crate::types::ContextType;

/// Upper bound on a single session's duration
pub const MAX_SESSION_MINUTES: f64 = 24.0 * 60.0;

/// Upper bound on an hourly base rate
pub const MAX_BASE_RATE: f64 = 10_000.0;

/// Multiplier bounds
pub const MIN_MULTIPLIER: f64 = 1.0;
pub const MAX_MULTIPLIER: f64 = 3.0;

/// Burnout risk factor above which a recommendation is urgent
pub const URGENT_RISK_FACTOR: f64 = 0.7;

/// Working hours per week and weeks per year behind the annual estimate
const ANNUAL_HOURS_PER_WEEK: f64 = 20.0;
const WEEKS_PER_YEAR: f64 = 52.0;

/// Named expectation about what the interpreter may show
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayRule {
    HideShock,
    ShowEmpathy,
    MaintainNeutrality,
    SuppressPersonalReaction,
    ConveyAuthority,
    MatchSpeakerAffect,
    #[serde(other)]
    Other,
}

impl DisplayRule {
    /// Extra complexity for rules that are costly to sustain
    fn complexity_bonus(&self) -> f64 {
        match self {
            DisplayRule::HideShock | DisplayRule::SuppressPersonalReaction => 2.0,
            DisplayRule::MatchSpeakerAffect => 1.5,
            DisplayRule::ShowEmpathy
            | DisplayRule::MaintainNeutrality
            | DisplayRule::ConveyAuthority => 1.0,
            DisplayRule::Other => 0.0,
        }
    }
}

/// Emotional state of the client during the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientEmotionalState {
    #[default]
    Calm,
    Anxious,
    Distressed,
    Hostile,
    Grieving,
    Traumatized,
}

impl ClientEmotionalState {
    fn intensity_bonus(&self) -> f64 {
        match self {
            ClientEmotionalState::Calm => 0.0,
            ClientEmotionalState::Anxious => 1.0,
            ClientEmotionalState::Distressed => 2.0,
            ClientEmotionalState::Hostile | ClientEmotionalState::Grieving => 2.5,
            ClientEmotionalState::Traumatized => 3.0,
        }
    }
}

/// Per-context lookup for the compensation model
#[derive(Debug, Clone, Copy, PartialEq)]
struct ContextProfile {
    base_multiplier: f64,
    high_stakes_bonus: f64,
    trauma_bonus: f64,
    /// Baseline frequency of emotional labor in this setting (0-10)
    frequency: f64,
}

fn context_profile(context: ContextType) -> ContextProfile {
    let (base_multiplier, high_stakes_bonus, trauma_bonus, frequency) = match context {
        ContextType::Medical => (1.25, 0.30, 0.35, 8.0),
        ContextType::Legal => (1.20, 0.35, 0.25, 7.0),
        ContextType::MentalHealth => (1.30, 0.25, 0.40, 9.0),
        ContextType::Educational => (1.05, 0.10, 0.15, 4.0),
        ContextType::Business => (1.00, 0.15, 0.05, 3.0),
        ContextType::Community => (1.10, 0.15, 0.25, 6.0),
        ContextType::Conference => (1.00, 0.20, 0.05, 2.0),
        ContextType::General => (1.00, 0.10, 0.15, 5.0),
    };
    ContextProfile {
        base_multiplier,
        high_stakes_bonus,
        trauma_bonus,
        frequency,
    }
}

/// One interpreting session as reported by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalLaborSession {
    pub context: ContextType,
    pub duration_minutes: f64,
    /// Emotional intensity the assignment demands (0-10)
    pub required_intensity: f64,
    #[serde(default)]
    pub trauma_exposure: bool,
    #[serde(default)]
    pub client_state: ClientEmotionalState,
    #[serde(default)]
    pub display_rules: Vec<DisplayRule>,
    /// What the interpreter actually felt (0-10)
    pub internal_state: f64,
    /// What the interpreter had to show (0-10)
    pub displayed_state: f64,
    /// Control over own expression (0-10)
    pub autonomy: f64,
    /// Cost of authentic expression (0-10)
    pub consequence_severity: f64,
    /// Hourly base rate; the configured default applies when absent
    #[serde(default)]
    pub base_rate: Option<f64>,
}

/// Eleven labor scores, each in [0, 10]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionalLaborAssessment {
    pub surface_acting: f64,
    pub deep_acting: f64,
    pub emotional_dissonance: f64,
    pub suppression: f64,
    pub amplification: f64,
    pub display_rule_complexity: f64,
    pub frequency: f64,
    pub duration: f64,
    pub intensity: f64,
    pub autonomy: f64,
    pub consequence_severity: f64,
}

/// One additive term of the multiplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplierComponent {
    pub factor: String,
    /// Input value the term is computed from
    pub value: f64,
    pub weight: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationRecommendation {
    pub base_rate: f64,
    /// Always within [1.0, 3.0]
    pub multiplier: f64,
    pub hazard_pay: f64,
    pub total_rate: f64,
    pub justification: Vec<MultiplierComponent>,
    pub annual_impact_estimate: f64,
    /// Always within [0, 1]
    pub burnout_risk_factor: f64,
    pub recommended_interventions: Vec<String>,
    pub urgent: bool,
}

/// Scores plus compensation for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalLaborAnalysis {
    pub assessment: EmotionalLaborAssessment,
    pub compensation: CompensationRecommendation,
}

/// Persisted, de-identified labor record. Display rule names and client
/// state are not kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalLaborEntry {
    pub identity_hash: IdentityHash,
    pub context: ContextType,
    pub trauma_exposure: bool,
    pub duration_minutes: f64,
    pub assessment: EmotionalLaborAssessment,
    pub base_rate: f64,
    pub multiplier: f64,
    pub hazard_pay: f64,
    pub burnout_risk_factor: f64,
    pub recorded_at: DateTime<Utc>,
}

impl EmotionalLaborEntry {
    pub fn new(
        identity_hash: IdentityHash,
        session: &EmotionalLaborSession,
        analysis: &EmotionalLaborAnalysis,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identity_hash,
            context: session.context,
            trauma_exposure: session.trauma_exposure,
            duration_minutes: session.duration_minutes,
            assessment: analysis.assessment,
            base_rate: analysis.compensation.base_rate,
            multiplier: analysis.compensation.multiplier,
            hazard_pay: analysis.compensation.hazard_pay,
            burnout_risk_factor: analysis.compensation.burnout_risk_factor,
            recorded_at,
        }
    }
}

/// Stateless emotional labor quantifier
pub struct EmotionalLaborQuantifier;

impl EmotionalLaborQuantifier {
    /// Quantify a session, using the built-in default base rate when the
    /// session carries none
    pub fn quantify(session: &EmotionalLaborSession) -> Result<EmotionalLaborAnalysis, AnalyticsError> {
        Self::quantify_with_default_rate(session, DEFAULT_BASE_RATE)
    }

    /// Quantify a session with an explicit fallback base rate
    pub fn quantify_with_default_rate(
        session: &EmotionalLaborSession,
        default_base_rate: f64,
    ) -> Result<EmotionalLaborAnalysis, AnalyticsError> {
        validate(session)?;
        let base_rate = session.base_rate.unwrap_or(default_base_rate);
        check_base_rate(base_rate)?;

        let profile = context_profile(session.context);
        let assessment = assess(session, &profile);
        let compensation = compensate(session, &assessment, &profile, base_rate);

        tracing::debug!(
            context = session.context.as_str(),
            multiplier = compensation.multiplier,
            urgent = compensation.urgent,
            "Emotional labor quantified"
        );

        Ok(EmotionalLaborAnalysis {
            assessment,
            compensation,
        })
    }
}

fn validate(session: &EmotionalLaborSession) -> Result<(), AnalyticsError> {
    let scales = [
        ("required_intensity", session.required_intensity),
        ("internal_state", session.internal_state),
        ("displayed_state", session.displayed_state),
        ("autonomy", session.autonomy),
        ("consequence_severity", session.consequence_severity),
    ];
    for (field, value) in scales {
        check_range(field, value, 0.0, 10.0)?;
    }
    check_range("duration_minutes", session.duration_minutes, 0.0, MAX_SESSION_MINUTES)
}

fn check_base_rate(rate: f64) -> Result<(), AnalyticsError> {
    if !rate.is_finite() || rate <= 0.0 || rate > MAX_BASE_RATE {
        return Err(AnalyticsError::out_of_range("base_rate", rate, 0.0, MAX_BASE_RATE));
    }
    Ok(())
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), AnalyticsError> {
    if !value.is_finite() || value < min || value > max {
        tracing::warn!(field, "Rejected emotional labor input");
        return Err(AnalyticsError::out_of_range(field, value, min, max));
    }
    Ok(())
}

fn assess(session: &EmotionalLaborSession, profile: &ContextProfile) -> EmotionalLaborAssessment {
    let mut rules = session.display_rules.clone();
    rules.sort();
    rules.dedup();
    let has = |rule: DisplayRule| rules.contains(&rule);

    let internal = session.internal_state;
    let displayed = session.displayed_state;
    let dissonance = (internal - displayed).abs();

    let rule_multiplier = if has(DisplayRule::HideShock) { 3.0 } else { 1.0 };
    let empathy_bonus = if has(DisplayRule::ShowEmpathy) { 3.0 } else { 0.0 };

    let intensity = (session.required_intensity + session.client_state.intensity_bonus()).min(10.0);
    let complexity_bonus: f64 = rules.iter().map(DisplayRule::complexity_bonus).sum();

    EmotionalLaborAssessment {
        surface_acting: round2((dissonance * rule_multiplier * 0.8).min(10.0)),
        deep_acting: round2(((empathy_bonus + intensity / 10.0) * 2.0).min(10.0)),
        emotional_dissonance: round2(dissonance),
        suppression: round2(((internal - displayed).max(0.0) * 1.2).min(10.0)),
        amplification: round2(((displayed - internal).max(0.0) * 1.2).min(10.0)),
        display_rule_complexity: round2((2.0 * rules.len() as f64 + complexity_bonus).min(10.0)),
        frequency: profile.frequency,
        duration: round2((session.duration_minutes / 12.0).min(10.0)),
        intensity: round2(intensity),
        autonomy: session.autonomy,
        consequence_severity: session.consequence_severity,
    }
}

fn compensate(
    session: &EmotionalLaborSession,
    a: &EmotionalLaborAssessment,
    profile: &ContextProfile,
    base_rate: f64,
) -> CompensationRecommendation {
    let term = |factor: &str, value: f64, weight: f64| MultiplierComponent {
        factor: factor.to_string(),
        value,
        weight,
        contribution: round3(value * weight),
    };

    let trauma = if session.trauma_exposure { 1.0 } else { 0.0 };
    let justification = vec![
        term(
            &format!("context_base:{}", session.context.as_str()),
            1.0,
            profile.base_multiplier,
        ),
        term("surface_acting", a.surface_acting, 0.05),
        term("deep_acting", a.deep_acting, 0.03),
        term("emotional_dissonance", a.emotional_dissonance, 0.06),
        term("display_rule_complexity", a.display_rule_complexity, 0.04),
        term("autonomy", a.autonomy, -0.02),
        term(
            "consequence_severity",
            a.consequence_severity,
            profile.high_stakes_bonus / 10.0,
        ),
        term("trauma_exposure", trauma, profile.trauma_bonus),
    ];

    let raw: f64 = justification.iter().map(|c| c.value * c.weight).sum();
    let multiplier = round2(raw.clamp(MIN_MULTIPLIER, MAX_MULTIPLIER));

    let hazard_pay = round2((multiplier - 1.0) * base_rate);
    let burnout_risk_factor = round3(
        ((0.4 * a.surface_acting + 0.3 * a.emotional_dissonance + 0.2 * a.frequency
            - 0.1 * a.autonomy)
            / 10.0)
            .clamp(0.0, 1.0),
    );
    let urgent = burnout_risk_factor > URGENT_RISK_FACTOR;

    CompensationRecommendation {
        base_rate,
        multiplier,
        hazard_pay,
        total_rate: round2(multiplier * base_rate),
        justification,
        annual_impact_estimate: round2(hazard_pay * ANNUAL_HOURS_PER_WEEK * WEEKS_PER_YEAR),
        burnout_risk_factor,
        recommended_interventions: interventions(session, a, urgent),
        urgent,
    }
}

fn interventions(session: &EmotionalLaborSession, a: &EmotionalLaborAssessment, urgent: bool) -> Vec<String> {
    let rules: [(bool, &str); 7] = [
        (
            urgent,
            "Prioritize recovery time before the next high-intensity assignment",
        ),
        (
            a.surface_acting >= 7.0,
            "Practice deep-acting techniques to reduce surface-acting strain",
        ),
        (
            a.emotional_dissonance >= 6.0,
            "Debrief after sessions with a large gap between felt and displayed emotion",
        ),
        (
            a.suppression >= 6.0,
            "Use a structured decompression routine to release suppressed reactions",
        ),
        (
            session.trauma_exposure,
            "Access vicarious trauma support after this assignment",
        ),
        (
            a.autonomy <= 3.0,
            "Negotiate more control over pacing and breaks for similar assignments",
        ),
        (
            a.duration >= 8.0 || a.display_rule_complexity >= 6.0,
            "Request a team interpreter or scheduled breaks for long or demanding sessions",
        ),
    ];

    rules
        .into_iter()
        .filter(|(applies, _)| *applies)
        .map(|(_, text)| text.to_string())
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;

    pub(crate) fn make_test_session(context: ContextType) -> EmotionalLaborSession {
        EmotionalLaborSession {
            context,
            duration_minutes: 90.0,
            required_intensity: 7.0,
            trauma_exposure: true,
            client_state: ClientEmotionalState::Distressed,
            display_rules: vec![DisplayRule::HideShock, DisplayRule::ShowEmpathy],
            internal_state: 8.0,
            displayed_state: 3.0,
            autonomy: 2.0,
            consequence_severity: 8.0,
            base_rate: Some(60.0),
        }
    }

    #[test]
    fn test_medical_trauma_session_scores() {
        let analysis =
            EmotionalLaborQuantifier::quantify(&make_test_session(ContextType::Medical)).unwrap();
        let a = analysis.assessment;

        assert_eq!(a.emotional_dissonance, 5.0);
        // 5 * 3 * 0.8 = 12, capped
        assert_eq!(a.surface_acting, 10.0);
        assert_eq!(a.intensity, 9.0);
        // (3 + 0.9) * 2
        assert_eq!(a.deep_acting, 7.8);
        assert_eq!(a.suppression, 6.0);
        assert_eq!(a.amplification, 0.0);
        // 2 rules * 2 + 2 (hide_shock) + 1 (show_empathy)
        assert_eq!(a.display_rule_complexity, 7.0);
        assert_eq!(a.frequency, 8.0);
        assert_eq!(a.duration, 7.5);

        let c = analysis.compensation;
        assert_eq!(c.multiplier, 3.0);
        assert_eq!(c.hazard_pay, 120.0);
        assert_eq!(c.total_rate, 180.0);
        assert_eq!(c.annual_impact_estimate, 124_800.0);
        // (4 + 1.5 + 1.6 - 0.2) / 10
        assert_eq!(c.burnout_risk_factor, 0.69);
        assert!(!c.urgent);
        assert_eq!(c.justification.len(), 8);
        assert!(c
            .recommended_interventions
            .iter()
            .any(|i| i.contains("vicarious trauma")));
    }

    #[test]
    fn test_calm_conference_session_floors_at_one() {
        let session = EmotionalLaborSession {
            context: ContextType::Conference,
            duration_minutes: 30.0,
            required_intensity: 1.0,
            trauma_exposure: false,
            client_state: ClientEmotionalState::Calm,
            display_rules: vec![],
            internal_state: 4.0,
            displayed_state: 4.0,
            autonomy: 10.0,
            consequence_severity: 0.0,
            base_rate: None,
        };
        let analysis = EmotionalLaborQuantifier::quantify(&session).unwrap();

        assert_eq!(analysis.compensation.multiplier, 1.0);
        assert_eq!(analysis.compensation.hazard_pay, 0.0);
        assert_eq!(analysis.compensation.base_rate, DEFAULT_BASE_RATE);
        assert_eq!(analysis.compensation.burnout_risk_factor, 0.0);
        assert!(analysis.compensation.recommended_interventions.is_empty());
    }

    #[test]
    fn test_urgent_when_risk_factor_high() {
        let mut session = make_test_session(ContextType::MentalHealth);
        session.autonomy = 0.0;
        session.internal_state = 10.0;
        session.displayed_state = 0.0;
        let analysis = EmotionalLaborQuantifier::quantify(&session).unwrap();

        // (4 + 3 + 1.8) / 10
        assert_eq!(analysis.compensation.burnout_risk_factor, 0.88);
        assert!(analysis.compensation.urgent);
        assert!(analysis.compensation.recommended_interventions[0].contains("Prioritize"));
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let mut session = make_test_session(ContextType::Legal);
        session.internal_state = 11.0;
        assert!(matches!(
            EmotionalLaborQuantifier::quantify(&session),
            Err(AnalyticsError::Validation(_))
        ));

        let mut session = make_test_session(ContextType::Legal);
        session.duration_minutes = f64::NAN;
        assert!(EmotionalLaborQuantifier::quantify(&session).is_err());

        let mut session = make_test_session(ContextType::Legal);
        session.base_rate = Some(-5.0);
        assert!(EmotionalLaborQuantifier::quantify(&session).is_err());
    }

    #[test]
    fn test_unknown_display_rule_deserializes_as_other() {
        let rules: Vec<DisplayRule> =
            serde_json::from_str(r#"["hide_shock", "smile_constantly"]"#).unwrap();
        assert_eq!(rules, vec![DisplayRule::HideShock, DisplayRule::Other]);
    }

    #[test]
    fn test_entry_drops_rules_and_client_state() {
        let session = make_test_session(ContextType::Medical);
        let analysis = EmotionalLaborQuantifier::quantify(&session).unwrap();
        let entry = EmotionalLaborEntry::new(
            IdentityHash::from_hex("aa".repeat(32)),
            &session,
            &analysis,
            Utc::now(),
        );

        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("hide_shock"));
        assert!(!json.contains("distressed"));
        assert_eq!(entry.multiplier, analysis.compensation.multiplier);
    }

    fn scale() -> impl Strategy<Value = f64> {
        prop_oneof![Just(0.0), Just(10.0), 0.0f64..=10.0]
    }

    fn rule() -> impl Strategy<Value = DisplayRule> {
        prop::sample::select(vec![
            DisplayRule::HideShock,
            DisplayRule::ShowEmpathy,
            DisplayRule::MaintainNeutrality,
            DisplayRule::SuppressPersonalReaction,
            DisplayRule::ConveyAuthority,
            DisplayRule::MatchSpeakerAffect,
            DisplayRule::Other,
        ])
    }

    proptest! {
        #[test]
        fn prop_multiplier_and_risk_factor_bounded(
            context in prop::sample::select(ContextType::ALL.to_vec()),
            minutes in 0.0f64..=MAX_SESSION_MINUTES,
            intensity in scale(),
            internal in scale(),
            displayed in scale(),
            autonomy in scale(),
            consequence in scale(),
            trauma in any::<bool>(),
            rules in prop::collection::vec(rule(), 0..6),
        ) {
            let session = EmotionalLaborSession {
                context,
                duration_minutes: minutes,
                required_intensity: intensity,
                trauma_exposure: trauma,
                client_state: ClientEmotionalState::Traumatized,
                display_rules: rules,
                internal_state: internal,
                displayed_state: displayed,
                autonomy,
                consequence_severity: consequence,
                base_rate: None,
            };
            let analysis = EmotionalLaborQuantifier::quantify(&session).unwrap();
            let c = &analysis.compensation;

            prop_assert!((MIN_MULTIPLIER..=MAX_MULTIPLIER).contains(&c.multiplier));
            prop_assert!((0.0..=1.0).contains(&c.burnout_risk_factor));
            prop_assert!(c.hazard_pay >= 0.0);

            let a = &analysis.assessment;
            for score in [
                a.surface_acting, a.deep_acting, a.emotional_dissonance, a.suppression,
                a.amplification, a.display_rule_complexity, a.frequency, a.duration,
                a.intensity, a.autonomy, a.consequence_severity,
            ] {
                prop_assert!((0.0..=10.0).contains(&score));
            }
        }
    }
}
