//! Service entry point
//!
//! [`WellnessAnalytics`] is constructed once with [`WellnessAnalytics::init`]
//! and owns the identity hasher and the store. Every public operation takes
//! a raw account id, hashes it immediately, and works on the hash from then
//! on. Methods ending in `_at` take an explicit clock for deterministic use.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregator::MetricsAggregator;
use crate::anonymizer::Anonymizer;
use crate::attestation::{
    AttestationReceipt, AttestationType, Attestor, StoredReceipt, ThresholdCriterion,
    VerificationResult,
};
use crate::burnout::{
    BurnoutRiskOutcome, BurnoutRiskPredictor, InsufficientDataPolicy, InterventionPlan,
    TeamRiskAssessment, TeamRiskRollup, ASSESSMENT_WINDOW_WEEKS, ENGAGEMENT_WINDOW_WEEKS,
};
use crate::config::WellnessConfig;
use crate::emotional_labor::{
    EmotionalLaborAnalysis, EmotionalLaborEntry, EmotionalLaborQuantifier, EmotionalLaborSession,
    LaborAnalytics,
};
use crate::error::AnalyticsError;
use crate::identity::{IdentityHash, IdentityHasher};
use crate::patterns::PatternDetector;
use crate::store::WellnessStore;
use crate::types::{
    ContextType, MetricName, PatternCode, ReflectionCategory, TimeRange, WeekSummary,
    WellnessMetricBucket,
};

/// Weeks of buckets returned with insights
pub const INSIGHT_WEEKS: usize = 4;

/// Pattern codes returned with insights
pub const INSIGHT_PATTERNS: usize = 10;

/// Acknowledgement for an accepted submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionAck {
    pub category: ReflectionCategory,
    pub context_type: ContextType,
    /// Allow-listed metric keys that survived anonymization
    pub metrics_recorded: Vec<MetricName>,
    /// Week bucket touched, if the submission carried a core metric
    pub week_start: Option<NaiveDate>,
    pub pattern: Option<PatternCode>,
    pub submitted_at: DateTime<Utc>,
}

/// Read model for a wellness dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessInsights {
    /// Most recent weekly buckets, oldest first
    pub metrics: Vec<WellnessMetricBucket>,
    /// Most recent pattern codes, newest first
    pub pattern_codes: Vec<PatternCode>,
    /// Aggregates over the latest week's readings
    pub week_summary: Option<WeekSummary>,
}

/// Wellness analytics service bound to one store
pub struct WellnessAnalytics<S: WellnessStore> {
    hasher: IdentityHasher,
    config: WellnessConfig,
    store: S,
}

impl<S: WellnessStore> WellnessAnalytics<S> {
    /// Validate configuration and build the service.
    ///
    /// Fails with a configuration error when the deployment secret is
    /// missing, a placeholder, or too short.
    pub fn init(config: WellnessConfig, store: S) -> Result<Self, AnalyticsError> {
        config.validate()?;
        let hasher = IdentityHasher::new(config.deployment_secret.as_deref())?;

        tracing::info!(
            insufficient_data = ?config.insufficient_data,
            default_validity_hours = config.attestation.default_validity_hours,
            "Wellness analytics initialized"
        );
        Ok(Self {
            hasher,
            config,
            store,
        })
    }

    pub fn config(&self) -> &WellnessConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Pseudonymous handle for an account id
    pub fn identity_hash(&self, account_id: &str) -> IdentityHash {
        self.hasher.hash(account_id)
    }

    pub fn submit_reflection(
        &self,
        account_id: &str,
        type_hint: &str,
        raw_fields: &Value,
    ) -> Result<SubmissionAck, AnalyticsError> {
        self.submit_reflection_at(account_id, type_hint, raw_fields, Utc::now())
    }

    /// Anonymize, store, aggregate, and classify one submission.
    ///
    /// The reflection and its weekly reading are written in one store call,
    /// so a failed bucket update leaves no orphan reflection behind.
    pub fn submit_reflection_at(
        &self,
        account_id: &str,
        type_hint: &str,
        raw_fields: &Value,
        now: DateTime<Utc>,
    ) -> Result<SubmissionAck, AnalyticsError> {
        let identity = self.hasher.hash(account_id);
        let reflection = Anonymizer::anonymize(&identity, type_hint, raw_fields, now);
        let bucket = MetricsAggregator::record(&self.store, &reflection)?;

        tracing::debug!(
            identity = %identity,
            category = reflection.category.as_str(),
            context = reflection.context_type.as_str(),
            metrics = reflection.metrics.len(),
            "Reflection stored"
        );

        let pattern = match &bucket {
            Some(bucket) => Some(PatternDetector::detect(&self.store, bucket, now)?.pattern_code),
            None => None,
        };

        Ok(SubmissionAck {
            category: reflection.category,
            context_type: reflection.context_type,
            metrics_recorded: reflection.metrics.keys().copied().collect(),
            week_start: bucket.map(|b| b.week_start),
            pattern,
            submitted_at: now,
        })
    }

    pub fn get_wellness_insights(&self, account_id: &str) -> Result<WellnessInsights, AnalyticsError> {
        let identity = self.hasher.hash(account_id);
        let metrics = MetricsAggregator::history(&self.store, &identity, INSIGHT_WEEKS)?;
        let pattern_codes = self
            .store
            .pattern_insights(&identity, INSIGHT_PATTERNS)?
            .into_iter()
            .map(|i| i.pattern_code)
            .collect();

        let week_summary = match metrics.last() {
            Some(latest) => Some(MetricsAggregator::week_summary(
                &self.store,
                &identity,
                latest.week_start,
            )?),
            None => None,
        };

        Ok(WellnessInsights {
            metrics,
            pattern_codes,
            week_summary,
        })
    }

    /// Burnout risk; `policy` overrides the configured insufficient-data policy
    pub fn get_burnout_risk(
        &self,
        account_id: &str,
        policy: Option<InsufficientDataPolicy>,
    ) -> Result<BurnoutRiskOutcome, AnalyticsError> {
        self.get_burnout_risk_at(account_id, policy, Utc::now())
    }

    pub fn get_burnout_risk_at(
        &self,
        account_id: &str,
        policy: Option<InsufficientDataPolicy>,
        now: DateTime<Utc>,
    ) -> Result<BurnoutRiskOutcome, AnalyticsError> {
        let identity = self.hasher.hash(account_id);
        let policy = policy.unwrap_or(self.config.insufficient_data);

        let history = MetricsAggregator::history(&self.store, &identity, ASSESSMENT_WINDOW_WEEKS)?;
        let since = now - Duration::weeks(ENGAGEMENT_WINDOW_WEEKS);
        let check_ins = self.store.count_reflections_since(&identity, since)?;
        let engagement = check_ins as f64 / ENGAGEMENT_WINDOW_WEEKS as f64;

        match BurnoutRiskPredictor::assess(&history, engagement, now) {
            Ok(assessment) => Ok(BurnoutRiskOutcome::Assessed(assessment)),
            Err(AnalyticsError::InsufficientData {
                available,
                required,
            }) => {
                tracing::debug!(
                    identity = %identity,
                    available,
                    required,
                    ?policy,
                    "Not enough history for a burnout assessment"
                );
                Ok(match policy {
                    InsufficientDataPolicy::Report => BurnoutRiskOutcome::InsufficientData {
                        available,
                        required,
                    },
                    InsufficientDataPolicy::ProvisionalDefault => {
                        BurnoutRiskOutcome::Provisional(BurnoutRiskPredictor::provisional_default(now))
                    }
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Plan for a computed assessment; `None` while history is too short
    pub fn get_intervention_plan(
        &self,
        account_id: &str,
    ) -> Result<Option<InterventionPlan>, AnalyticsError> {
        self.get_intervention_plan_at(account_id, Utc::now())
    }

    pub fn get_intervention_plan_at(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<InterventionPlan>, AnalyticsError> {
        let outcome =
            self.get_burnout_risk_at(account_id, Some(InsufficientDataPolicy::Report), now)?;
        Ok(outcome.assessment().map(InterventionPlan::build))
    }

    pub fn assess_team_risk(
        &self,
        rollup: &TeamRiskRollup,
    ) -> Result<TeamRiskAssessment, AnalyticsError> {
        TeamRiskAssessment::assess(rollup)
    }

    pub fn record_emotional_labor(
        &self,
        account_id: &str,
        session: &EmotionalLaborSession,
    ) -> Result<EmotionalLaborAnalysis, AnalyticsError> {
        self.record_emotional_labor_at(account_id, session, Utc::now())
    }

    /// Quantify a session and append the de-identified result
    pub fn record_emotional_labor_at(
        &self,
        account_id: &str,
        session: &EmotionalLaborSession,
        now: DateTime<Utc>,
    ) -> Result<EmotionalLaborAnalysis, AnalyticsError> {
        let analysis = EmotionalLaborQuantifier::quantify_with_default_rate(
            session,
            self.config.labor.default_base_rate,
        )?;

        let identity = self.hasher.hash(account_id);
        let entry = EmotionalLaborEntry::new(identity, session, &analysis, now);
        self.store.append_labor_entry(&entry)?;

        tracing::debug!(
            identity = %entry.identity_hash,
            context = entry.context.as_str(),
            multiplier = entry.multiplier,
            "Emotional labor entry stored"
        );
        Ok(analysis)
    }

    pub fn get_emotional_labor_analytics(
        &self,
        account_id: &str,
        range: TimeRange,
    ) -> Result<LaborAnalytics, AnalyticsError> {
        if range.end < range.start {
            return Err(AnalyticsError::Validation(
                "time range ends before it starts".to_string(),
            ));
        }
        let identity = self.hasher.hash(account_id);
        let entries = self.store.labor_entries(&identity, &range)?;
        Ok(LaborAnalytics::summarize(&entries, range))
    }

    /// Mint a receipt; `validity_hours` defaults to the configured window
    pub fn issue_attestation(
        &self,
        account_id: &str,
        attestation_type: AttestationType,
        validity_hours: Option<u32>,
    ) -> Result<AttestationReceipt, AnalyticsError> {
        self.issue_attestation_at(account_id, attestation_type, validity_hours, Utc::now())
    }

    pub fn issue_attestation_at(
        &self,
        account_id: &str,
        attestation_type: AttestationType,
        validity_hours: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<AttestationReceipt, AnalyticsError> {
        if attestation_type == AttestationType::ThresholdProof {
            return Err(AnalyticsError::Validation(
                "threshold proofs require a criterion".to_string(),
            ));
        }
        let identity = self.hasher.hash(account_id);
        let receipt = Attestor::generate(
            &self.hasher,
            &identity,
            attestation_type,
            self.validity(validity_hours),
            now,
        );
        self.persist_receipt(receipt)
    }

    pub fn issue_threshold_attestation(
        &self,
        account_id: &str,
        criterion: &ThresholdCriterion,
        validity_hours: Option<u32>,
    ) -> Result<AttestationReceipt, AnalyticsError> {
        self.issue_threshold_attestation_at(account_id, criterion, validity_hours, Utc::now())
    }

    /// Mint a threshold receipt once the weekly history confirms it
    pub fn issue_threshold_attestation_at(
        &self,
        account_id: &str,
        criterion: &ThresholdCriterion,
        validity_hours: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<AttestationReceipt, AnalyticsError> {
        criterion.validate()?;
        let identity = self.hasher.hash(account_id);
        let history = MetricsAggregator::history(&self.store, &identity, criterion.weeks as usize)?;

        let receipt = Attestor::generate_threshold(
            &self.hasher,
            &identity,
            criterion,
            &history,
            self.validity(validity_hours),
            now,
        )?;
        self.persist_receipt(receipt)
    }

    pub fn verify_attestation(
        &self,
        receipt_id: &str,
        verifier_id: Option<&str>,
    ) -> Result<VerificationResult, AnalyticsError> {
        self.verify_attestation_at(receipt_id, verifier_id, Utc::now())
    }

    /// Check a receipt and count the verification
    pub fn verify_attestation_at(
        &self,
        receipt_id: &str,
        verifier_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<VerificationResult, AnalyticsError> {
        let verifier = verifier_id.map(|id| self.hasher.hash(id));
        let stored = self
            .store
            .record_verification(receipt_id, verifier.as_ref(), now)?;
        let result = Attestor::evaluate(&self.hasher, receipt_id, stored.as_ref(), now);

        tracing::info!(
            receipt_id,
            valid = result.valid,
            reason = ?result.reason,
            count = result.verification_count,
            "Attestation verified"
        );
        Ok(result)
    }

    fn validity(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.config.attestation.default_validity_hours)
    }

    fn persist_receipt(&self, receipt: AttestationReceipt) -> Result<AttestationReceipt, AnalyticsError> {
        self.store.insert_receipt(&StoredReceipt::from(receipt.clone()))?;
        tracing::info!(
            receipt_id = %receipt.receipt_id,
            attestation_type = receipt.attestation_type.as_str(),
            expires = receipt.valid_until.is_some(),
            "Attestation issued"
        );
        Ok(receipt)
    }
}
