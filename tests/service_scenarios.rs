//! End-to-end scenarios through the public service API

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;

use wellness_core::attestation::{AttestationType, Comparison, ThresholdCriterion, VerificationReason};
use wellness_core::burnout::{AssessmentBasis, BurnoutRiskOutcome, InsufficientDataPolicy, RiskLevel};
use wellness_core::emotional_labor::EmotionalLaborSession;
use wellness_core::types::{ContextType, MetricName, PatternCode, ReflectionCategory, TimeRange};
use wellness_core::{
    AnalyticsError, MemoryStore, SqliteStore, WellnessAnalytics, WellnessConfig, WellnessStore,
};

const SECRET: &str = "scenario-deployment-secret-0042";

fn make_service() -> WellnessAnalytics<MemoryStore> {
    WellnessAnalytics::init(WellnessConfig::with_secret(SECRET), MemoryStore::new()).unwrap()
}

/// Noon on the Wednesday of the week starting at `monday`
fn midweek(monday: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&(monday + Duration::days(2)).and_hms_opt(12, 0, 0).unwrap())
}

fn monday(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
}

/// Three consecutive weeks (May 6, 13, 20 2024) of identical burnout checks
fn submit_three_weeks<S: WellnessStore>(
    service: &WellnessAnalytics<S>,
    account: &str,
    stress: f64,
    energy: f64,
    burnout: f64,
) {
    for day in [6, 13, 20] {
        service
            .submit_reflection_at(
                account,
                "weekly_burnout_check",
                &json!({
                    "stress_level": stress,
                    "energy_level": energy,
                    "burnout_score": burnout,
                }),
                midweek(monday(day)),
            )
            .unwrap();
    }
}

fn now() -> DateTime<Utc> {
    midweek(monday(20)) + Duration::hours(1)
}

#[test]
fn test_init_requires_secret() {
    let result = WellnessAnalytics::init(WellnessConfig::default(), MemoryStore::new());
    assert!(matches!(result, Err(AnalyticsError::Configuration(_))));
}

#[test]
fn test_submission_drops_identifying_text() {
    let service = make_service();
    let ack = service
        .submit_reflection_at(
            "interpreter-17",
            "pre_assignment_prep",
            &json!({
                "context": "Hospital oncology consult, patient Jane Roe",
                "stress_level": 12,
                "preparation_level": 6.25,
                "patient_name": "Jane Roe",
                "notes": "felt rushed",
            }),
            midweek(monday(6)),
        )
        .unwrap();

    assert_eq!(ack.category, ReflectionCategory::PreSession);
    assert_eq!(ack.context_type, ContextType::Medical);
    assert_eq!(
        ack.metrics_recorded,
        vec![MetricName::StressLevel, MetricName::PreparationLevel]
    );
    assert_eq!(ack.week_start, Some(monday(6)));
    assert_eq!(ack.pattern, Some(PatternCode::StressRising));

    let serialized = serde_json::to_string(&ack).unwrap();
    assert!(!serialized.contains("Jane"));
    assert!(!serialized.contains("patient"));
    assert!(!serialized.contains("interpreter-17"));

    let insights = service.get_wellness_insights("interpreter-17").unwrap();
    assert_eq!(insights.metrics.len(), 1);
    assert_eq!(insights.metrics[0].stress_level, Some(10.0));
}

#[test]
fn test_same_week_submissions_share_a_bucket() {
    let service = make_service();
    let week = monday(13);

    service
        .submit_reflection_at(
            "a",
            "stress_log",
            &json!({"stress_level": 8, "energy_level": 5}),
            midweek(week),
        )
        .unwrap();
    service
        .submit_reflection_at(
            "a",
            "stress_log",
            &json!({"stress_level": 4}),
            midweek(week) + Duration::days(1),
        )
        .unwrap();

    let insights = service.get_wellness_insights("a").unwrap();
    assert_eq!(insights.metrics.len(), 1);

    let bucket = &insights.metrics[0];
    assert_eq!(bucket.week_start, week);
    assert_eq!(bucket.stress_level, Some(4.0));
    assert_eq!(bucket.energy_level, Some(5.0));
    assert_eq!(bucket.check_in_count, 2);
    assert!(!bucket.high_stress_pattern);

    let summary = insights.week_summary.unwrap();
    assert_eq!(summary.readings, 2);
    assert_eq!(summary.metrics[&MetricName::StressLevel].mean, 6.0);

    assert_eq!(
        insights.pattern_codes,
        vec![PatternCode::StressStable, PatternCode::StressRising]
    );
}

#[test]
fn test_submission_without_core_metrics_touches_no_bucket() {
    let service = make_service();
    let ack = service
        .submit_reflection_at("a", "mood_log", &json!({"mood_score": 7}), midweek(monday(6)))
        .unwrap();

    assert_eq!(ack.category, ReflectionCategory::MoodLog);
    assert_eq!(ack.week_start, None);
    assert_eq!(ack.pattern, None);
    assert!(service.get_wellness_insights("a").unwrap().metrics.is_empty());
}

#[test]
fn test_burnout_risk_after_three_hard_weeks() {
    let service = make_service();
    submit_three_weeks(&service, "a", 9.0, 2.0, 9.0);

    let outcome = service.get_burnout_risk_at("a", None, now()).unwrap();
    let BurnoutRiskOutcome::Assessed(assessment) = outcome else {
        panic!("expected a computed assessment, got {outcome:?}");
    };
    assert_eq!(assessment.basis, AssessmentBasis::Computed);
    assert!(assessment.risk_level >= RiskLevel::High);
    assert_eq!(assessment.factors.weeks_analyzed, 3);
    assert!(assessment.factors.chronic_stress_detected);
    assert!(assessment.factors.recovery_needed);

    let plan = service.get_intervention_plan_at("a", now()).unwrap().unwrap();
    assert_eq!(plan.risk_level, assessment.risk_level);
    assert!(!plan.actions.is_empty());
}

#[test]
fn test_burnout_risk_with_short_history() {
    let service = make_service();
    service
        .submit_reflection_at(
            "a",
            "burnout_check",
            &json!({"burnout_score": 3}),
            midweek(monday(20)),
        )
        .unwrap();

    let reported = service.get_burnout_risk_at("a", None, now()).unwrap();
    assert_eq!(
        reported,
        BurnoutRiskOutcome::InsufficientData {
            available: 1,
            required: 3
        }
    );

    let provisional = service
        .get_burnout_risk_at("a", Some(InsufficientDataPolicy::ProvisionalDefault), now())
        .unwrap();
    let assessment = provisional.assessment().unwrap();
    assert_eq!(assessment.basis, AssessmentBasis::ProvisionalDefault);
    assert_eq!(assessment.risk_level, RiskLevel::Moderate);

    assert!(service.get_intervention_plan_at("a", now()).unwrap().is_none());
}

#[test]
fn test_configured_policy_applies_by_default() {
    let mut config = WellnessConfig::with_secret(SECRET);
    config.insufficient_data = InsufficientDataPolicy::ProvisionalDefault;
    let service = WellnessAnalytics::init(config, MemoryStore::new()).unwrap();

    let outcome = service.get_burnout_risk_at("nobody", None, now()).unwrap();
    assert!(matches!(outcome, BurnoutRiskOutcome::Provisional(_)));
}

#[test]
fn test_emotional_labor_is_recorded_and_summarized() {
    let service = make_service();
    let session: EmotionalLaborSession = serde_json::from_value(json!({
        "context": "medical",
        "duration_minutes": 90,
        "required_intensity": 6,
        "trauma_exposure": true,
        "client_state": "grieving",
        "display_rules": ["hide_shock", "show_empathy"],
        "internal_state": 7,
        "displayed_state": 3,
        "autonomy": 4,
        "consequence_severity": 7
    }))
    .unwrap();

    let analysis = service.record_emotional_labor_at("a", &session, now()).unwrap();
    assert_eq!(analysis.compensation.base_rate, 50.0);
    assert!((1.0..=3.0).contains(&analysis.compensation.multiplier));

    let range = TimeRange::new(now() - Duration::days(1), now() + Duration::days(1));
    let analytics = service.get_emotional_labor_analytics("a", range).unwrap();
    assert_eq!(analytics.session_count, 1);
    assert_eq!(analytics.trauma_sessions, 1);
    assert_eq!(analytics.total_minutes, 90.0);
    assert_eq!(analytics.mean_multiplier, analysis.compensation.multiplier);

    let other = service.get_emotional_labor_analytics("b", range).unwrap();
    assert_eq!(other.session_count, 0);
}

#[test]
fn test_inverted_time_range_is_rejected() {
    let service = make_service();
    let range = TimeRange::new(now(), now() - Duration::days(1));
    assert!(matches!(
        service.get_emotional_labor_analytics("a", range),
        Err(AnalyticsError::Validation(_))
    ));
}

#[test]
fn test_attestation_lifecycle() {
    let service = make_service();
    let receipt = service
        .issue_attestation_at("a", AttestationType::WellnessCommitment, Some(24), now())
        .unwrap();
    assert_eq!(receipt.verification_count, 0);
    assert_eq!(receipt.valid_until, Some(receipt.issued_at + Duration::hours(24)));

    let first = service
        .verify_attestation_at(&receipt.receipt_id, Some("employer-1"), now() + Duration::hours(1))
        .unwrap();
    assert!(first.valid);
    assert_eq!(first.reason, VerificationReason::Valid);
    assert_eq!(first.verification_count, 1);

    let second = service
        .verify_attestation_at(&receipt.receipt_id, None, now() + Duration::hours(2))
        .unwrap();
    assert_eq!(second.verification_count, 2);

    let late = service
        .verify_attestation_at(&receipt.receipt_id, None, now() + Duration::hours(25))
        .unwrap();
    assert!(!late.valid);
    assert_eq!(late.reason, VerificationReason::Expired);
    assert_eq!(late.verification_count, 3);

    let missing = service.verify_attestation_at("no-such-receipt", None, now()).unwrap();
    assert!(!missing.valid);
    assert_eq!(missing.reason, VerificationReason::NotFound);
}

#[test]
fn test_default_validity_comes_from_config() {
    let service = make_service();
    let receipt = service
        .issue_attestation_at("a", AttestationType::StressManagement, None, now())
        .unwrap();
    assert_eq!(receipt.valid_until, Some(receipt.issued_at + Duration::hours(720)));
}

#[test]
fn test_threshold_proof_requires_criterion() {
    let service = make_service();
    assert!(matches!(
        service.issue_attestation_at("a", AttestationType::ThresholdProof, None, now()),
        Err(AnalyticsError::Validation(_))
    ));
}

#[test]
fn test_threshold_attestation() {
    let service = make_service();
    submit_three_weeks(&service, "calm", 3.0, 7.0, 2.0);
    submit_three_weeks(&service, "stressed", 9.0, 3.0, 6.0);

    let criterion = ThresholdCriterion {
        metric: MetricName::StressLevel,
        comparison: Comparison::Below,
        threshold: 8.0,
        weeks: 3,
    };

    let receipt = service
        .issue_threshold_attestation_at("calm", &criterion, None, now())
        .unwrap();
    assert_eq!(receipt.attestation_type, AttestationType::ThresholdProof);
    assert_eq!(receipt.criteria.as_ref(), Some(&criterion));

    let result = service
        .verify_attestation_at(&receipt.receipt_id, None, now())
        .unwrap();
    assert!(result.valid);
    assert_eq!(result.criteria, Some(criterion.clone()));

    assert!(matches!(
        service.issue_threshold_attestation_at("stressed", &criterion, None, now()),
        Err(AnalyticsError::ThresholdNotMet(_))
    ));

    let longer = ThresholdCriterion { weeks: 4, ..criterion };
    assert!(matches!(
        service.issue_threshold_attestation_at("calm", &longer, None, now()),
        Err(AnalyticsError::ThresholdNotMet(_))
    ));
}

#[test]
fn test_sqlite_backed_service_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wellness.db");

    let receipt_id = {
        let store = SqliteStore::open(&path).unwrap();
        let service = WellnessAnalytics::init(WellnessConfig::with_secret(SECRET), store).unwrap();
        submit_three_weeks(&service, "a", 6.0, 5.0, 4.0);
        service
            .issue_attestation_at("a", AttestationType::ContinuousEngagement, Some(48), now())
            .unwrap()
            .receipt_id
    };

    let store = SqliteStore::open(&path).unwrap();
    let service = WellnessAnalytics::init(WellnessConfig::with_secret(SECRET), store).unwrap();

    let insights = service.get_wellness_insights("a").unwrap();
    assert_eq!(insights.metrics.len(), 3);
    assert_eq!(
        insights.metrics.iter().map(|b| b.week_start).collect::<Vec<_>>(),
        vec![monday(6), monday(13), monday(20)]
    );

    let outcome = service.get_burnout_risk_at("a", None, now()).unwrap();
    assert!(matches!(outcome, BurnoutRiskOutcome::Assessed(_)));

    let result = service
        .verify_attestation_at(&receipt_id, None, now() + Duration::hours(1))
        .unwrap();
    assert!(result.valid);
    assert_eq!(result.verification_count, 1);
}

#[test]
fn test_different_secret_cannot_verify() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wellness.db");

    let receipt_id = {
        let service = WellnessAnalytics::init(
            WellnessConfig::with_secret(SECRET),
            SqliteStore::open(&path).unwrap(),
        )
        .unwrap();
        service
            .issue_attestation_at("a", AttestationType::BurnoutPrevention, Some(48), now())
            .unwrap()
            .receipt_id
    };

    let service = WellnessAnalytics::init(
        WellnessConfig::with_secret("another-deployment-secret-99"),
        SqliteStore::open(&path).unwrap(),
    )
    .unwrap();
    let result = service.verify_attestation_at(&receipt_id, None, now()).unwrap();
    assert!(!result.valid);
    assert_eq!(result.reason, VerificationReason::Tampered);
}
