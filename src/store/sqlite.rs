//! SQLite-backed store
//!
//! [`SqliteStore`] owns a single `rusqlite::Connection` behind a mutex. The
//! weekly bucket merge is one `INSERT … ON CONFLICT DO UPDATE … RETURNING`
//! statement, so concurrent check-ins for the same identity and week are
//! serialized by SQLite rather than by the caller.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{WellnessStore, HIGH_STRESS_THRESHOLD, LOW_ENERGY_THRESHOLD};
use crate::attestation::{AttestationReceipt, AttestationType, StoredReceipt};
use crate::emotional_labor::EmotionalLaborEntry;
use crate::error::AnalyticsError;
use crate::identity::IdentityHash;
use crate::types::{
    AnonymizedReflection, ContextType, CoreMetrics, PatternCode, PatternInsight, TimeRange,
    WeeklyReading, WellnessMetricBucket,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS anonymized_reflections (
    session_hash    TEXT PRIMARY KEY,
    identity_hash   TEXT NOT NULL,
    category        TEXT NOT NULL,
    metrics_json    TEXT NOT NULL,
    context_type    TEXT NOT NULL,
    created_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_reflections_identity
    ON anonymized_reflections (identity_hash, created_at);

CREATE TABLE IF NOT EXISTS wellness_metrics (
    identity_hash       TEXT NOT NULL,
    week_start          TEXT NOT NULL,
    stress_level        REAL,
    energy_level        REAL,
    confidence_score    REAL,
    burnout_score       REAL,
    high_stress_pattern INTEGER NOT NULL DEFAULT 0,
    recovery_needed     INTEGER NOT NULL DEFAULT 0,
    check_in_count      INTEGER NOT NULL DEFAULT 0,
    updated_at          TEXT NOT NULL,
    PRIMARY KEY (identity_hash, week_start)
);

CREATE TABLE IF NOT EXISTS weekly_readings (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    identity_hash       TEXT NOT NULL,
    week_start          TEXT NOT NULL,
    stress_level        REAL,
    energy_level        REAL,
    confidence_score    REAL,
    burnout_score       REAL,
    recorded_at         TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_readings_week
    ON weekly_readings (identity_hash, week_start);

CREATE TABLE IF NOT EXISTS pattern_insights (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    identity_hash   TEXT NOT NULL,
    pattern_code    TEXT NOT NULL,
    confidence      REAL NOT NULL,
    month_start     TEXT NOT NULL,
    detected_at     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_insights_identity
    ON pattern_insights (identity_hash, month_start);

CREATE TABLE IF NOT EXISTS emotional_labor_entries (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    identity_hash       TEXT NOT NULL,
    context_type        TEXT NOT NULL,
    trauma_exposure     INTEGER NOT NULL,
    duration_minutes    REAL NOT NULL,
    assessment_json     TEXT NOT NULL,
    base_rate           REAL NOT NULL,
    multiplier          REAL NOT NULL,
    hazard_pay          REAL NOT NULL,
    burnout_risk_factor REAL NOT NULL,
    recorded_at         TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_labor_identity
    ON emotional_labor_entries (identity_hash, recorded_at);

CREATE TABLE IF NOT EXISTS attestation_receipts (
    receipt_id          TEXT PRIMARY KEY,
    receipt_hash        TEXT NOT NULL,
    signature           TEXT NOT NULL,
    attestation_type    TEXT NOT NULL,
    issued_at           TEXT NOT NULL,
    valid_until         TEXT,
    criteria_json       TEXT,
    verification_count  INTEGER NOT NULL DEFAULT 0,
    last_verifier_hash  TEXT,
    last_verified_at    TEXT
);
"#;

const BUCKET_COLUMNS: &str = "identity_hash, week_start, stress_level, energy_level, \
     confidence_score, burnout_score, high_stress_pattern, recovery_needed, \
     check_in_count, updated_at";

const RECEIPT_COLUMNS: &str = "receipt_id, receipt_hash, signature, attestation_type, \
     issued_at, valid_until, criteria_json, verification_count, last_verifier_hash, \
     last_verified_at";

/// SQLite-backed store for all analytics tables
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and apply the schema
    pub fn open(path: &Path) -> Result<Self, AnalyticsError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// In-memory database, mainly for tests
    pub fn open_in_memory() -> Result<Self, AnalyticsError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, AnalyticsError> {
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("SQLite schema applied");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AnalyticsError> {
        self.conn
            .lock()
            .map_err(|_| AnalyticsError::Storage("sqlite connection lock poisoned".to_string()))
    }
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn bucket_from_row(row: &Row<'_>) -> rusqlite::Result<WellnessMetricBucket> {
    Ok(WellnessMetricBucket {
        identity_hash: IdentityHash::from_hex(row.get::<_, String>(0)?),
        week_start: row.get(1)?,
        stress_level: row.get(2)?,
        energy_level: row.get(3)?,
        confidence_score: row.get(4)?,
        burnout_score: row.get(5)?,
        high_stress_pattern: row.get(6)?,
        recovery_needed: row.get(7)?,
        check_in_count: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn receipt_from_row(row: &Row<'_>) -> rusqlite::Result<StoredReceipt> {
    let type_label: String = row.get(3)?;
    let attestation_type = AttestationType::parse(&type_label)
        .ok_or_else(|| conversion_error(3, format!("unknown attestation type {type_label}")))?;

    let criteria = match row.get::<_, Option<String>>(6)? {
        Some(json) => Some(
            serde_json::from_str(&json).map_err(|e| conversion_error(6, e.to_string()))?,
        ),
        None => None,
    };

    Ok(StoredReceipt {
        receipt: AttestationReceipt {
            receipt_id: row.get(0)?,
            receipt_hash: row.get(1)?,
            signature: row.get(2)?,
            attestation_type,
            issued_at: row.get(4)?,
            valid_until: row.get(5)?,
            criteria,
            verification_count: row.get(7)?,
        },
        last_verifier_hash: row.get::<_, Option<String>>(8)?.map(IdentityHash::from_hex),
        last_verified_at: row.get(9)?,
    })
}

fn insert_reflection_row(
    conn: &Connection,
    reflection: &AnonymizedReflection,
) -> Result<(), AnalyticsError> {
    let metrics_json = serde_json::to_string(&reflection.metrics)?;
    conn.execute(
        "INSERT INTO anonymized_reflections \
         (session_hash, identity_hash, category, metrics_json, context_type, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            reflection.session_hash,
            reflection.identity_hash.as_str(),
            reflection.category.as_str(),
            metrics_json,
            reflection.context_type.as_str(),
            reflection.created_at,
        ],
    )?;
    Ok(())
}

/// Merge one reading into its bucket and log it. Callers own the transaction.
fn upsert_bucket_rows(
    conn: &Connection,
    identity: &IdentityHash,
    week_start: NaiveDate,
    metrics: &CoreMetrics,
    recorded_at: DateTime<Utc>,
) -> Result<WellnessMetricBucket, AnalyticsError> {
    let upsert = format!(
        "INSERT INTO wellness_metrics ({BUCKET_COLUMNS}) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, \
                 COALESCE(?3 > ?8, 0), COALESCE(?4 < ?9, 0), 1, ?7) \
         ON CONFLICT(identity_hash, week_start) DO UPDATE SET \
             stress_level = COALESCE(excluded.stress_level, wellness_metrics.stress_level), \
             energy_level = COALESCE(excluded.energy_level, wellness_metrics.energy_level), \
             confidence_score = COALESCE(excluded.confidence_score, wellness_metrics.confidence_score), \
             burnout_score = COALESCE(excluded.burnout_score, wellness_metrics.burnout_score), \
             high_stress_pattern = COALESCE(COALESCE(excluded.stress_level, wellness_metrics.stress_level) > ?8, 0), \
             recovery_needed = COALESCE(COALESCE(excluded.energy_level, wellness_metrics.energy_level) < ?9, 0), \
             check_in_count = wellness_metrics.check_in_count + 1, \
             updated_at = excluded.updated_at \
         RETURNING {BUCKET_COLUMNS}"
    );

    let bucket = conn.query_row(
        &upsert,
        params![
            identity.as_str(),
            week_start,
            metrics.stress_level,
            metrics.energy_level,
            metrics.confidence_score,
            metrics.burnout_score,
            recorded_at,
            HIGH_STRESS_THRESHOLD,
            LOW_ENERGY_THRESHOLD,
        ],
        bucket_from_row,
    )?;

    conn.execute(
        "INSERT INTO weekly_readings \
         (identity_hash, week_start, stress_level, energy_level, confidence_score, \
          burnout_score, recorded_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            identity.as_str(),
            week_start,
            metrics.stress_level,
            metrics.energy_level,
            metrics.confidence_score,
            metrics.burnout_score,
            recorded_at,
        ],
    )?;

    Ok(bucket)
}

impl WellnessStore for SqliteStore {
    fn count_reflections_since(
        &self,
        identity: &IdentityHash,
        since: DateTime<Utc>,
    ) -> Result<u32, AnalyticsError> {
        let count = self.lock()?.query_row(
            "SELECT COUNT(*) FROM anonymized_reflections \
             WHERE identity_hash = ?1 AND created_at >= ?2",
            params![identity.as_str(), since],
            |row| row.get::<_, u32>(0),
        )?;
        Ok(count)
    }

    fn upsert_weekly_metrics(
        &self,
        identity: &IdentityHash,
        week_start: NaiveDate,
        metrics: &CoreMetrics,
        recorded_at: DateTime<Utc>,
    ) -> Result<WellnessMetricBucket, AnalyticsError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let bucket = upsert_bucket_rows(&tx, identity, week_start, metrics, recorded_at)?;
        tx.commit()?;
        Ok(bucket)
    }

    fn record_reflection(
        &self,
        reflection: &AnonymizedReflection,
        reading: Option<(NaiveDate, &CoreMetrics)>,
    ) -> Result<Option<WellnessMetricBucket>, AnalyticsError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        insert_reflection_row(&tx, reflection)?;
        let bucket = reading
            .map(|(week_start, metrics)| {
                upsert_bucket_rows(
                    &tx,
                    &reflection.identity_hash,
                    week_start,
                    metrics,
                    reflection.created_at,
                )
            })
            .transpose()?;
        tx.commit()?;
        Ok(bucket)
    }

    fn recent_buckets(
        &self,
        identity: &IdentityHash,
        limit: usize,
    ) -> Result<Vec<WellnessMetricBucket>, AnalyticsError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {BUCKET_COLUMNS} FROM wellness_metrics \
             WHERE identity_hash = ?1 ORDER BY week_start DESC LIMIT ?2"
        ))?;
        let mut buckets = stmt
            .query_map(params![identity.as_str(), limit as i64], bucket_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        buckets.reverse();
        Ok(buckets)
    }

    fn weekly_readings(
        &self,
        identity: &IdentityHash,
        week_start: NaiveDate,
    ) -> Result<Vec<WeeklyReading>, AnalyticsError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT stress_level, energy_level, confidence_score, burnout_score, recorded_at \
             FROM weekly_readings WHERE identity_hash = ?1 AND week_start = ?2 ORDER BY id",
        )?;
        let readings = stmt
            .query_map(params![identity.as_str(), week_start], |row| {
                Ok(WeeklyReading {
                    identity_hash: identity.clone(),
                    week_start,
                    metrics: CoreMetrics {
                        stress_level: row.get(0)?,
                        energy_level: row.get(1)?,
                        confidence_score: row.get(2)?,
                        burnout_score: row.get(3)?,
                    },
                    recorded_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(readings)
    }

    fn append_pattern_insight(&self, insight: &PatternInsight) -> Result<(), AnalyticsError> {
        self.lock()?.execute(
            "INSERT INTO pattern_insights \
             (identity_hash, pattern_code, confidence, month_start, detected_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                insight.identity_hash.as_str(),
                insight.pattern_code.as_str(),
                insight.confidence,
                insight.month_start,
                insight.detected_at,
            ],
        )?;
        Ok(())
    }

    fn pattern_insights(
        &self,
        identity: &IdentityHash,
        limit: usize,
    ) -> Result<Vec<PatternInsight>, AnalyticsError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT pattern_code, confidence, month_start, detected_at FROM pattern_insights \
             WHERE identity_hash = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let insights = stmt
            .query_map(params![identity.as_str(), limit as i64], |row| {
                let code: String = row.get(0)?;
                Ok(PatternInsight {
                    identity_hash: identity.clone(),
                    pattern_code: PatternCode::parse(&code)
                        .ok_or_else(|| conversion_error(0, format!("unknown pattern {code}")))?,
                    confidence: row.get(1)?,
                    month_start: row.get(2)?,
                    detected_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(insights)
    }

    fn append_labor_entry(&self, entry: &EmotionalLaborEntry) -> Result<(), AnalyticsError> {
        let assessment_json = serde_json::to_string(&entry.assessment)?;
        self.lock()?.execute(
            "INSERT INTO emotional_labor_entries \
             (identity_hash, context_type, trauma_exposure, duration_minutes, assessment_json, \
              base_rate, multiplier, hazard_pay, burnout_risk_factor, recorded_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                entry.identity_hash.as_str(),
                entry.context.as_str(),
                entry.trauma_exposure,
                entry.duration_minutes,
                assessment_json,
                entry.base_rate,
                entry.multiplier,
                entry.hazard_pay,
                entry.burnout_risk_factor,
                entry.recorded_at,
            ],
        )?;
        Ok(())
    }

    fn labor_entries(
        &self,
        identity: &IdentityHash,
        range: &TimeRange,
    ) -> Result<Vec<EmotionalLaborEntry>, AnalyticsError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT context_type, trauma_exposure, duration_minutes, assessment_json, base_rate, \
                    multiplier, hazard_pay, burnout_risk_factor, recorded_at \
             FROM emotional_labor_entries \
             WHERE identity_hash = ?1 AND recorded_at >= ?2 AND recorded_at < ?3 \
             ORDER BY recorded_at",
        )?;
        let entries = stmt
            .query_map(params![identity.as_str(), range.start, range.end], |row| {
                let context_label: String = row.get(0)?;
                let assessment_json: String = row.get(3)?;
                Ok(EmotionalLaborEntry {
                    identity_hash: identity.clone(),
                    context: ContextType::parse(&context_label).ok_or_else(|| {
                        conversion_error(0, format!("unknown context {context_label}"))
                    })?,
                    trauma_exposure: row.get(1)?,
                    duration_minutes: row.get(2)?,
                    assessment: serde_json::from_str(&assessment_json)
                        .map_err(|e| conversion_error(3, e.to_string()))?,
                    base_rate: row.get(4)?,
                    multiplier: row.get(5)?,
                    hazard_pay: row.get(6)?,
                    burnout_risk_factor: row.get(7)?,
                    recorded_at: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn insert_receipt(&self, stored: &StoredReceipt) -> Result<(), AnalyticsError> {
        let receipt = &stored.receipt;
        let criteria_json = receipt
            .criteria
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.lock()?.execute(
            &format!(
                "INSERT INTO attestation_receipts ({RECEIPT_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                receipt.receipt_id,
                receipt.receipt_hash,
                receipt.signature,
                receipt.attestation_type.as_str(),
                receipt.issued_at,
                receipt.valid_until,
                criteria_json,
                receipt.verification_count,
                stored.last_verifier_hash.as_ref().map(|h| h.as_str().to_string()),
                stored.last_verified_at,
            ],
        )?;
        Ok(())
    }

    fn record_verification(
        &self,
        receipt_id: &str,
        verifier: Option<&IdentityHash>,
        at: DateTime<Utc>,
    ) -> Result<Option<StoredReceipt>, AnalyticsError> {
        let conn = self.lock()?;
        let stored = conn
            .query_row(
                &format!(
                    "UPDATE attestation_receipts SET \
                         verification_count = verification_count + 1, \
                         last_verified_at = ?2, \
                         last_verifier_hash = COALESCE(?3, last_verifier_hash) \
                     WHERE receipt_id = ?1 \
                     RETURNING {RECEIPT_COLUMNS}"
                ),
                params![receipt_id, at, verifier.map(|v| v.as_str().to_string())],
                receipt_from_row,
            )
            .optional()?;
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::anonymizer::Anonymizer;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    fn identity() -> IdentityHash {
        IdentityHash::from_hex("5a".repeat(32))
    }

    #[test]
    fn test_upsert_is_last_write_wins_per_field() {
        let store = SqliteStore::open_in_memory().unwrap();
        let week = NaiveDate::from_ymd_opt(2024, 5, 13).unwrap();
        let t0 = Utc.with_ymd_and_hms(2024, 5, 13, 9, 0, 0).unwrap();

        let first = store
            .upsert_weekly_metrics(
                &identity(),
                week,
                &CoreMetrics {
                    stress_level: Some(8.5),
                    energy_level: Some(3.0),
                    ..Default::default()
                },
                t0,
            )
            .unwrap();
        assert!(first.high_stress_pattern);
        assert!(first.recovery_needed);
        assert_eq!(first.check_in_count, 1);

        let second = store
            .upsert_weekly_metrics(
                &identity(),
                week,
                &CoreMetrics {
                    stress_level: Some(4.0),
                    burnout_score: Some(6.0),
                    ..Default::default()
                },
                t0 + chrono::Duration::hours(30),
            )
            .unwrap();

        assert_eq!(second.stress_level, Some(4.0));
        assert_eq!(second.energy_level, Some(3.0));
        assert_eq!(second.burnout_score, Some(6.0));
        assert!(!second.high_stress_pattern);
        assert!(second.recovery_needed);
        assert_eq!(second.check_in_count, 2);

        let readings = store.weekly_readings(&identity(), week).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].metrics.stress_level, Some(8.5));
    }

    #[test]
    fn test_missing_stress_does_not_flag() {
        let store = SqliteStore::open_in_memory().unwrap();
        let bucket = store
            .upsert_weekly_metrics(
                &identity(),
                NaiveDate::from_ymd_opt(2024, 5, 13).unwrap(),
                &CoreMetrics::default(),
                Utc::now(),
            )
            .unwrap();
        assert!(!bucket.high_stress_pattern);
        assert!(!bucket.recovery_needed);
    }

    #[test]
    fn test_recent_buckets_ordering() {
        let store = SqliteStore::open_in_memory().unwrap();
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for week in 0..4 {
            store
                .upsert_weekly_metrics(
                    &identity(),
                    base + chrono::Duration::weeks(week),
                    &CoreMetrics {
                        burnout_score: Some(week as f64),
                        ..Default::default()
                    },
                    Utc::now(),
                )
                .unwrap();
        }

        let buckets = store.recent_buckets(&identity(), 3).unwrap();
        let weeks: Vec<_> = buckets.iter().map(|b| b.burnout_score.unwrap()).collect();
        assert_eq!(weeks, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_unknown_receipt_verification_is_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = store
            .record_verification("missing", None, Utc::now())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wellness.db");
        let week = NaiveDate::from_ymd_opt(2024, 5, 13).unwrap();

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .upsert_weekly_metrics(
                    &identity(),
                    week,
                    &CoreMetrics {
                        energy_level: Some(6.0),
                        ..Default::default()
                    },
                    Utc::now(),
                )
                .unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        let buckets = reopened.recent_buckets(&identity(), 10).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].energy_level, Some(6.0));
    }

    #[test]
    fn test_concurrent_upserts_do_not_lose_check_ins() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::open(&dir.path().join("wellness.db")).unwrap());
        let week = NaiveDate::from_ymd_opt(2024, 5, 13).unwrap();
        let t = Utc.with_ymd_and_hms(2024, 5, 14, 0, 0, 0).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for j in 0..5 {
                        store
                            .upsert_weekly_metrics(
                                &identity(),
                                week,
                                &CoreMetrics {
                                    stress_level: Some(j as f64),
                                    energy_level: Some(i as f64),
                                    ..Default::default()
                                },
                                t,
                            )
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let buckets = store.recent_buckets(&identity(), 10).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].check_in_count, 40);
        assert_eq!(store.weekly_readings(&identity(), week).unwrap().len(), 40);
    }

    #[test]
    fn test_record_reflection_writes_reflection_and_bucket() {
        let store = SqliteStore::open_in_memory().unwrap();
        let t = Utc.with_ymd_and_hms(2024, 5, 14, 9, 0, 0).unwrap();
        let week = NaiveDate::from_ymd_opt(2024, 5, 13).unwrap();
        let reflection =
            Anonymizer::anonymize(&identity(), "stress", &json!({ "stress_level": 8 }), t);
        let metrics = CoreMetrics::from_reflection(&reflection);

        let bucket = store
            .record_reflection(&reflection, Some((week, &metrics)))
            .unwrap()
            .unwrap();
        assert_eq!(bucket.stress_level, Some(8.0));
        assert_eq!(bucket.check_in_count, 1);

        let mood = Anonymizer::anonymize(&identity(), "mood", &json!({ "mood_score": 6 }), t);
        assert!(store.record_reflection(&mood, None).unwrap().is_none());

        assert_eq!(store.count_reflections_since(&identity(), t).unwrap(), 2);
        assert_eq!(store.weekly_readings(&identity(), week).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_bucket_write_rolls_back_reflection() {
        let store = SqliteStore::open_in_memory().unwrap();
        let t = Utc.with_ymd_and_hms(2024, 5, 14, 9, 0, 0).unwrap();
        let week = NaiveDate::from_ymd_opt(2024, 5, 13).unwrap();
        let reflection =
            Anonymizer::anonymize(&identity(), "stress", &json!({ "stress_level": 8 }), t);
        let metrics = CoreMetrics::from_reflection(&reflection);

        store
            .lock()
            .unwrap()
            .execute_batch("DROP TABLE weekly_readings;")
            .unwrap();

        let result = store.record_reflection(&reflection, Some((week, &metrics)));
        assert!(matches!(result, Err(AnalyticsError::Storage(_))));
        assert_eq!(store.count_reflections_since(&identity(), t).unwrap(), 0);
        assert!(store.recent_buckets(&identity(), 10).unwrap().is_empty());
    }
}
