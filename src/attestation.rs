//! Attestation receipts
//!
//! A receipt certifies that something held for an identity without saying
//! what was measured. It carries a random id, a content hash, an HMAC
//! signature under the deployment secret, and an optional expiry. The
//! identity hash goes into the content hash but is not stored on the
//! receipt itself.
//!
//! Threshold receipts are only minted after the weekly history confirms the
//! criterion; the stored criterion is the definition, never the values.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

use crate::aggregator::MetricsAggregator;
use crate::error::AnalyticsError;
use crate::identity::{IdentityHash, IdentityHasher};
use crate::types::{MetricName, WellnessMetricBucket};

/// Longest threshold window that can be attested
pub const MAX_CRITERION_WEEKS: u32 = 52;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttestationType {
    WellnessCommitment,
    StressManagement,
    BurnoutPrevention,
    ContinuousEngagement,
    ThresholdProof,
}

impl AttestationType {
    pub const ALL: [AttestationType; 5] = [
        AttestationType::WellnessCommitment,
        AttestationType::StressManagement,
        AttestationType::BurnoutPrevention,
        AttestationType::ContinuousEngagement,
        AttestationType::ThresholdProof,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttestationType::WellnessCommitment => "wellness_commitment",
            AttestationType::StressManagement => "stress_management",
            AttestationType::BurnoutPrevention => "burnout_prevention",
            AttestationType::ContinuousEngagement => "continuous_engagement",
            AttestationType::ThresholdProof => "threshold_proof",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Below,
    Above,
}

/// Definition of a threshold claim, e.g. "stress_level below 8 for 4 weeks"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdCriterion {
    pub metric: MetricName,
    pub comparison: Comparison,
    pub threshold: f64,
    pub weeks: u32,
}

impl ThresholdCriterion {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if !self.metric.is_core() {
            return Err(AnalyticsError::Validation(format!(
                "{} is not tracked weekly",
                self.metric.as_str()
            )));
        }
        if !self.threshold.is_finite() || !(0.0..=10.0).contains(&self.threshold) {
            return Err(AnalyticsError::out_of_range("threshold", self.threshold, 0.0, 10.0));
        }
        if self.weeks == 0 || self.weeks > MAX_CRITERION_WEEKS {
            return Err(AnalyticsError::Validation(format!(
                "weeks must be between 1 and {MAX_CRITERION_WEEKS}, got {}",
                self.weeks
            )));
        }
        Ok(())
    }

    fn holds_for(&self, value: f64) -> bool {
        match self.comparison {
            Comparison::Below => value < self.threshold,
            Comparison::Above => value > self.threshold,
        }
    }
}

impl fmt::Display for ThresholdCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cmp = match self.comparison {
            Comparison::Below => "below",
            Comparison::Above => "above",
        };
        write!(
            f,
            "{} {} {} for {} weeks",
            self.metric.as_str(),
            cmp,
            self.threshold,
            self.weeks
        )
    }
}

/// Content-free signed token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttestationReceipt {
    pub receipt_id: String,
    pub receipt_hash: String,
    pub signature: String,
    pub attestation_type: AttestationType,
    pub issued_at: DateTime<Utc>,
    /// `None` means the receipt never expires
    pub valid_until: Option<DateTime<Utc>>,
    pub criteria: Option<ThresholdCriterion>,
    pub verification_count: u32,
}

impl AttestationReceipt {
    /// Bytes covered by the signature
    fn canonical_content(&self) -> Vec<u8> {
        let valid_until = self
            .valid_until
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        let criteria = self
            .criteria
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string());

        format!(
            "{}|{}|{}|{}|{}|{}",
            self.receipt_id,
            self.receipt_hash,
            self.attestation_type.as_str(),
            self.issued_at.to_rfc3339(),
            valid_until,
            criteria
        )
        .into_bytes()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|until| now >= until)
    }
}

/// Receipt plus verification bookkeeping, as held by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReceipt {
    pub receipt: AttestationReceipt,
    pub last_verifier_hash: Option<IdentityHash>,
    pub last_verified_at: Option<DateTime<Utc>>,
}

impl From<AttestationReceipt> for StoredReceipt {
    fn from(receipt: AttestationReceipt) -> Self {
        Self {
            receipt,
            last_verifier_hash: None,
            last_verified_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationReason {
    Valid,
    NotFound,
    Expired,
    Tampered,
}

/// Outcome of a verification request. Misses are results, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub receipt_id: String,
    pub valid: bool,
    pub reason: VerificationReason,
    pub attestation_type: Option<AttestationType>,
    pub issued_at: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub criteria: Option<ThresholdCriterion>,
    pub verification_count: u32,
}

impl VerificationResult {
    fn not_found(receipt_id: &str) -> Self {
        Self {
            receipt_id: receipt_id.to_string(),
            valid: false,
            reason: VerificationReason::NotFound,
            attestation_type: None,
            issued_at: None,
            valid_until: None,
            criteria: None,
            verification_count: 0,
        }
    }
}

/// Mints and checks receipts
pub struct Attestor;

impl Attestor {
    /// Mint a receipt. `validity_hours == 0` means no expiry.
    pub fn generate(
        hasher: &IdentityHasher,
        identity: &IdentityHash,
        attestation_type: AttestationType,
        validity_hours: u32,
        now: DateTime<Utc>,
    ) -> AttestationReceipt {
        Self::mint(hasher, identity, attestation_type, validity_hours, None, now)
    }

    /// Mint a threshold receipt after checking the criterion against the
    /// weekly history (oldest first)
    pub fn generate_threshold(
        hasher: &IdentityHasher,
        identity: &IdentityHash,
        criterion: &ThresholdCriterion,
        history: &[WellnessMetricBucket],
        validity_hours: u32,
        now: DateTime<Utc>,
    ) -> Result<AttestationReceipt, AnalyticsError> {
        Self::check_threshold(criterion, history, now)?;
        Ok(Self::mint(
            hasher,
            identity,
            AttestationType::ThresholdProof,
            validity_hours,
            Some(criterion.clone()),
            now,
        ))
    }

    /// Confirm the criterion held in each of the most recent consecutive
    /// weeks. The newest bucket must be from this week or the previous one.
    pub fn check_threshold(
        criterion: &ThresholdCriterion,
        history: &[WellnessMetricBucket],
        now: DateTime<Utc>,
    ) -> Result<(), AnalyticsError> {
        criterion.validate()?;
        let weeks = criterion.weeks as usize;

        let not_met = |why: &str| {
            tracing::warn!(criterion = %criterion, "Threshold attestation refused: {why}");
            AnalyticsError::ThresholdNotMet(format!("{criterion}: {why}"))
        };

        if history.len() < weeks {
            return Err(not_met("not enough weekly history"));
        }
        let window = &history[history.len() - weeks..];

        let current_week = MetricsAggregator::week_start(now);
        let newest = window[window.len() - 1].week_start;
        if newest < current_week - Duration::weeks(1) {
            return Err(not_met("no recent weekly data"));
        }

        let consecutive = window
            .windows(2)
            .all(|pair| pair[1].week_start - pair[0].week_start == Duration::weeks(1));
        if !consecutive {
            return Err(not_met("weeks are not consecutive"));
        }

        let held = window.iter().all(|bucket| {
            bucket
                .metric(criterion.metric)
                .is_some_and(|v| criterion.holds_for(v))
        });
        if !held {
            return Err(not_met("condition did not hold every week"));
        }
        Ok(())
    }

    /// Judge a receipt already fetched (and counted) by the store
    pub fn evaluate(
        hasher: &IdentityHasher,
        receipt_id: &str,
        stored: Option<&StoredReceipt>,
        now: DateTime<Utc>,
    ) -> VerificationResult {
        let Some(stored) = stored else {
            return VerificationResult::not_found(receipt_id);
        };
        let receipt = &stored.receipt;

        let reason = if !hasher.verify_signature(&receipt.canonical_content(), &receipt.signature) {
            VerificationReason::Tampered
        } else if receipt.is_expired(now) {
            VerificationReason::Expired
        } else {
            VerificationReason::Valid
        };

        VerificationResult {
            receipt_id: receipt.receipt_id.clone(),
            valid: reason == VerificationReason::Valid,
            reason,
            attestation_type: Some(receipt.attestation_type),
            issued_at: Some(receipt.issued_at),
            valid_until: receipt.valid_until,
            criteria: receipt.criteria.clone(),
            verification_count: receipt.verification_count,
        }
    }

    fn mint(
        hasher: &IdentityHasher,
        identity: &IdentityHash,
        attestation_type: AttestationType,
        validity_hours: u32,
        criteria: Option<ThresholdCriterion>,
        now: DateTime<Utc>,
    ) -> AttestationReceipt {
        let issued_at = now.trunc_subsecs(0);
        let valid_until =
            (validity_hours > 0).then(|| issued_at + Duration::hours(validity_hours as i64));
        let nonce = Uuid::new_v4();

        let mut digest = Sha256::new();
        digest.update(identity.as_str().as_bytes());
        digest.update(b"|");
        digest.update(attestation_type.as_str().as_bytes());
        digest.update(b"|");
        digest.update(issued_at.to_rfc3339().as_bytes());
        digest.update(b"|");
        digest.update(nonce.as_bytes());

        let mut receipt = AttestationReceipt {
            receipt_id: Uuid::new_v4().to_string(),
            receipt_hash: hex::encode(digest.finalize()),
            signature: String::new(),
            attestation_type,
            issued_at,
            valid_until,
            criteria,
            verification_count: 0,
        };
        receipt.signature = hasher.sign(&receipt.canonical_content());
        receipt
    }
}
