//! Submission anonymization
//!
//! This module is the privacy choke-point between the host application and
//! shared storage. It turns a free-form submission into an
//! [`AnonymizedReflection`]:
//! - Category inferred from the form-type hint by keyword match
//! - Only allow-listed numeric metrics kept, clamped to 0-10, one decimal
//! - Context reduced to a coarse label; the context text is discarded
//!
//! Anonymization never fails. Unknown fields are ignored and malformed
//! values are dropped so that a submission is never rejected outright.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::identity::IdentityHash;
use crate::submission::Submission;
use crate::types::{AnonymizedReflection, ContextType, MetricName, ReflectionCategory};

/// Upper bound of every self-report scale
pub const METRIC_MAX: f64 = 10.0;

/// Ordered hint keywords; first match wins
const CATEGORY_KEYWORDS: &[(&str, ReflectionCategory)] = &[
    ("burnout", ReflectionCategory::BurnoutCheck),
    ("stress", ReflectionCategory::StressManagement),
    ("team", ReflectionCategory::TeamSync),
    ("booth", ReflectionCategory::TeamSync),
    ("debrief", ReflectionCategory::PostSession),
    ("post", ReflectionCategory::PostSession),
    ("pre", ReflectionCategory::PreSession),
    ("prep", ReflectionCategory::PreSession),
    ("mood", ReflectionCategory::MoodLog),
    ("wellness", ReflectionCategory::WellnessCheck),
    ("check", ReflectionCategory::WellnessCheck),
];

/// Ordered context keywords; first match wins
const CONTEXT_KEYWORDS: &[(&str, ContextType)] = &[
    ("medical", ContextType::Medical),
    ("hospital", ContextType::Medical),
    ("clinic", ContextType::Medical),
    ("healthcare", ContextType::Medical),
    ("legal", ContextType::Legal),
    ("court", ContextType::Legal),
    ("deposition", ContextType::Legal),
    ("mental", ContextType::MentalHealth),
    ("therapy", ContextType::MentalHealth),
    ("psychiatr", ContextType::MentalHealth),
    ("educat", ContextType::Educational),
    ("school", ContextType::Educational),
    ("classroom", ContextType::Educational),
    ("business", ContextType::Business),
    ("corporate", ContextType::Business),
    ("community", ContextType::Community),
    ("social service", ContextType::Community),
    ("conference", ContextType::Conference),
    ("simultaneous", ContextType::Conference),
];

/// Field names the host may use for the free-text context description
const CONTEXT_FIELDS: &[&str] = &["context", "context_type", "setting"];

/// Anonymizer for converting raw submissions to de-identified reflections
pub struct Anonymizer;

impl Anonymizer {
    /// Anonymize a raw submission for an already hashed identity
    pub fn anonymize(
        identity_hash: &IdentityHash,
        type_hint: &str,
        raw_fields: &Value,
        now: DateTime<Utc>,
    ) -> AnonymizedReflection {
        let category = resolve_category(type_hint);
        let submission = Submission::from_raw(category, raw_fields);
        Self::anonymize_submission(identity_hash, &submission, resolve_context(raw_fields), now)
    }

    /// Anonymize an already typed submission
    pub fn anonymize_submission(
        identity_hash: &IdentityHash,
        submission: &Submission,
        context_type: ContextType,
        now: DateTime<Utc>,
    ) -> AnonymizedReflection {
        let metrics: BTreeMap<MetricName, f64> = submission
            .readings()
            .into_iter()
            .filter_map(|(name, value)| sanitize_metric(value).map(|v| (name, v)))
            .collect();

        let dropped = submission.readings().len() - metrics.len();
        if dropped > 0 {
            tracing::debug!(
                identity = %identity_hash,
                dropped,
                "Dropped non-finite metric values"
            );
        }

        AnonymizedReflection {
            identity_hash: identity_hash.clone(),
            session_hash: session_hash(identity_hash),
            category: submission.category(),
            metrics,
            context_type,
            created_at: now,
        }
    }
}

/// Keywords at least this long also match as a token prefix ("checkin",
/// "stressful"); shorter ones must equal a whole token.
const PREFIX_MATCH_MIN_LEN: usize = 5;

/// Resolve the reflection category from a form-type hint
///
/// The hint is split into alphanumeric tokens so that short keywords never
/// match inside unrelated words ("pre" in "interpreter").
pub fn resolve_category(type_hint: &str) -> ReflectionCategory {
    let hint = type_hint.to_ascii_lowercase();
    let tokens: Vec<&str> = hint
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect();

    CATEGORY_KEYWORDS
        .iter()
        .find(|(keyword, _)| tokens.iter().any(|token| keyword_matches(token, keyword)))
        .map(|(_, category)| *category)
        .unwrap_or(ReflectionCategory::General)
}

fn keyword_matches(token: &str, keyword: &str) -> bool {
    token == keyword || (keyword.len() >= PREFIX_MATCH_MIN_LEN && token.starts_with(keyword))
}

/// Resolve the context label from the optional context field(s)
pub fn resolve_context(raw_fields: &Value) -> ContextType {
    let Some(fields) = raw_fields.as_object() else {
        return ContextType::General;
    };

    CONTEXT_FIELDS
        .iter()
        .filter_map(|key| fields.get(*key).and_then(Value::as_str))
        .map(context_from_text)
        .find(|ctx| *ctx != ContextType::General)
        .unwrap_or(ContextType::General)
}

/// Map free text to a coarse context label
pub fn context_from_text(text: &str) -> ContextType {
    let text = text.to_ascii_lowercase();
    if let Some(exact) = ContextType::parse(text.trim()) {
        return exact;
    }
    CONTEXT_KEYWORDS
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map(|(_, ctx)| *ctx)
        .unwrap_or(ContextType::General)
}

/// Clamp to [0, 10] and round to one decimal; non-finite values are dropped
pub fn sanitize_metric(value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let clamped = value.clamp(0.0, METRIC_MAX);
    Some((clamped * 10.0).round() / 10.0)
}

/// Unlinkable per-submission hash
fn session_hash(identity_hash: &IdentityHash) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identity_hash.as_str().as_bytes());
    hasher.update(Uuid::new_v4().as_bytes());
    hex::encode(hasher.finalize())
}
