//! FFI bindings for Wellness Core
//!
//! This module exposes the pure scoring functions to other languages. Inputs
//! and outputs are JSON in null-terminated C strings; returned strings are
//! allocated here and must be freed with `wellness_free_string`.
//!
//! Nothing in this module touches storage or the deployment secret.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::burnout::{BurnoutRiskAssessment, BurnoutRiskPredictor, InterventionPlan, TeamRiskAssessment, TeamRiskRollup};
use crate::emotional_labor::{EmotionalLaborQuantifier, EmotionalLaborSession};
use crate::error::AnalyticsError;
use crate::patterns::{PatternDetector, PatternInput};
use crate::types::WellnessMetricBucket;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Parse JSON input, run `f`, and return its result as JSON.
/// Any failure sets the last error and returns NULL.
unsafe fn json_call<I, O>(
    input: *const c_char,
    f: impl FnOnce(I) -> Result<O, AnalyticsError>,
) -> *mut c_char
where
    I: DeserializeOwned,
    O: Serialize,
{
    clear_last_error();

    let json_str = match cstr_to_string(input) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let result = serde_json::from_str::<I>(&json_str)
        .map_err(AnalyticsError::from)
        .and_then(f)
        .and_then(|output| serde_json::to_string(&output).map_err(AnalyticsError::from));

    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Scoring API
// ============================================================================

/// Quantify one emotional labor session.
///
/// # Safety
/// - `session_json` must be a valid null-terminated C string holding an
///   `EmotionalLaborSession` object.
/// - Returns a newly allocated string that must be freed with `wellness_free_string`.
/// - Returns NULL on error; call `wellness_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn wellness_quantify_emotional_labor(
    session_json: *const c_char,
) -> *mut c_char {
    json_call(session_json, |session: EmotionalLaborSession| {
        EmotionalLaborQuantifier::quantify(&session)
    })
}

/// Classify a bucket's latest values into a pattern code.
///
/// # Safety
/// - `input_json` must be a valid null-terminated C string holding
///   `{"stress_level": number|null, "burnout_score": number|null}`.
/// - Returns a newly allocated string that must be freed with `wellness_free_string`.
/// - Returns NULL on error; call `wellness_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn wellness_classify_pattern(input_json: *const c_char) -> *mut c_char {
    json_call(input_json, |input: PatternInput| PatternDetector::classify(&input))
}

/// Assess burnout risk from a JSON array of weekly buckets (oldest first).
///
/// # Safety
/// - `buckets_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `wellness_free_string`.
/// - Returns NULL on error (including insufficient history); call
///   `wellness_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn wellness_assess_burnout_risk(
    buckets_json: *const c_char,
    engagement_per_week: f64,
) -> *mut c_char {
    json_call(buckets_json, |buckets: Vec<WellnessMetricBucket>| {
        BurnoutRiskPredictor::assess(&buckets, engagement_per_week, Utc::now())
    })
}

/// Build an intervention plan from a burnout risk assessment.
///
/// # Safety
/// - `assessment_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `wellness_free_string`.
/// - Returns NULL on error; call `wellness_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn wellness_intervention_plan(assessment_json: *const c_char) -> *mut c_char {
    json_call(assessment_json, |assessment: BurnoutRiskAssessment| {
        Ok(InterventionPlan::build(&assessment))
    })
}

/// Assess team risk from a precomputed roll-up.
///
/// # Safety
/// - `rollup_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `wellness_free_string`.
/// - Returns NULL on error; call `wellness_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn wellness_team_risk(rollup_json: *const c_char) -> *mut c_char {
    json_call(rollup_json, |rollup: TeamRiskRollup| {
        TeamRiskAssessment::assess(&rollup)
    })
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Wellness Core functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Wellness Core function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn wellness_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Wellness Core call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn wellness_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn wellness_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
