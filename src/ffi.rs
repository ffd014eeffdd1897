//! FFI bindings for churn-flux
//!
//! This module provides C-compatible functions so a form UI written in another
//! language can drive single-record prediction. All functions use C strings
//! (null-terminated) and return allocated memory that must be freed by the
//! caller using `churn_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::PathBuf;
use std::ptr;

use crate::config::ArtifactPaths;
use crate::pipeline::{ArtifactBundle, ChurnPredictor};

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

/// Read a required string argument, recording an error naming it if invalid
unsafe fn required_arg(ptr: *const c_char, name: &str) -> Option<String> {
    let value = cstr_to_string(ptr);
    if value.is_none() {
        set_last_error(&format!("Invalid {name} string pointer"));
    }
    value
}

unsafe fn load_predictor(
    model_path: *const c_char,
    scaler_path: *const c_char,
    schema_path: *const c_char,
) -> Option<ChurnPredictor> {
    let paths = ArtifactPaths {
        model: PathBuf::from(required_arg(model_path, "model path")?),
        scaling: PathBuf::from(required_arg(scaler_path, "scaler path")?),
        schema: PathBuf::from(required_arg(schema_path, "schema path")?),
    };
    match ArtifactBundle::load(&paths) {
        Ok(bundle) => Some(ChurnPredictor::new(bundle)),
        Err(e) => {
            set_last_error(&e.to_string());
            None
        }
    }
}

fn predict_to_cstr(predictor: &ChurnPredictor, record_json: &str) -> *mut c_char {
    match predictor.predict_json(record_json) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Load the artifacts, predict one JSON record and return a JSON report.
///
/// Artifacts are loaded on every call; use the predictor API to load once.
///
/// # Safety
/// - All arguments must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `churn_free_string`.
/// - Returns NULL on error; call `churn_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn churn_predict_json(
    model_path: *const c_char,
    scaler_path: *const c_char,
    schema_path: *const c_char,
    record_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(record) = required_arg(record_json, "record JSON") else {
        return ptr::null_mut();
    };
    match load_predictor(model_path, scaler_path, schema_path) {
        Some(predictor) => predict_to_cstr(&predictor, &record),
        None => ptr::null_mut(),
    }
}

// ============================================================================
// Predictor Handle API
// ============================================================================

/// Opaque handle to a loaded ChurnPredictor
pub struct ChurnPredictorHandle {
    predictor: ChurnPredictor,
}

/// Load artifacts into a reusable predictor.
///
/// # Safety
/// - All arguments must be valid null-terminated C strings.
/// - Must be freed with `churn_predictor_free`.
/// - Returns NULL on error; call `churn_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn churn_predictor_new(
    model_path: *const c_char,
    scaler_path: *const c_char,
    schema_path: *const c_char,
) -> *mut ChurnPredictorHandle {
    clear_last_error();

    match load_predictor(model_path, scaler_path, schema_path) {
        Some(predictor) => Box::into_raw(Box::new(ChurnPredictorHandle { predictor })),
        None => ptr::null_mut(),
    }
}

/// Free a predictor.
///
/// # Safety
/// - `predictor` must be a valid pointer returned by `churn_predictor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn churn_predictor_free(predictor: *mut ChurnPredictorHandle) {
    if !predictor.is_null() {
        drop(Box::from_raw(predictor));
    }
}

/// Predict one JSON record with a loaded predictor.
///
/// # Safety
/// - `predictor` must be a valid pointer returned by `churn_predictor_new`.
/// - `record_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `churn_free_string`.
/// - Returns NULL on error; call `churn_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn churn_predictor_predict(
    predictor: *const ChurnPredictorHandle,
    record_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if predictor.is_null() {
        set_last_error("Null predictor pointer");
        return ptr::null_mut();
    }
    let handle = &*predictor;

    match required_arg(record_json, "record JSON") {
        Some(record) => predict_to_cstr(&handle.predictor, &record),
        None => ptr::null_mut(),
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by churn functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a churn function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn churn_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next churn function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn churn_last_error() -> *const c_char {
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
pub unsafe extern "C" fn churn_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaler::{ColumnScale, ScalingParameters};
    use crate::schema::TrainingSchema;
    use tempfile::TempDir;

    struct Artifacts {
        _dir: TempDir,
        model: CString,
        scaler: CString,
        schema: CString,
    }

    fn write_artifacts() -> Artifacts {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.json");
        let scaler = dir.path().join("scaler.json");
        let schema = dir.path().join("feature_columns.json");

        std::fs::write(
            &model,
            r#"{"kind": "logistic_regression", "coefficients": [-1.5, 0.8, 0.0, -1.0], "intercept": 0.2}"#,
        )
        .unwrap();
        ScalingParameters::new(vec![
            ColumnScale { column: "tenure".into(), mean: 32.4, scale: 24.6 },
            ColumnScale { column: "MonthlyCharges".into(), mean: 64.8, scale: 30.1 },
            ColumnScale { column: "TotalCharges".into(), mean: 2279.7, scale: 2266.6 },
        ])
        .unwrap()
        .save(&scaler)
        .unwrap();
        TrainingSchema::new(
            ["tenure", "MonthlyCharges", "TotalCharges", "Contract_Two year"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .unwrap()
        .save(&schema)
        .unwrap();

        let cpath = |p: &std::path::Path| CString::new(p.to_str().unwrap()).unwrap();
        Artifacts {
            model: cpath(&model),
            scaler: cpath(&scaler),
            schema: cpath(&schema),
            _dir: dir,
        }
    }

    fn record() -> CString {
        CString::new(
            r#"{"tenure": 2, "MonthlyCharges": 95.5, "TotalCharges": "191", "Contract": "Month-to-month"}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_ffi_predict_json() {
        let artifacts = write_artifacts();
        let record = record();

        unsafe {
            let result = churn_predict_json(
                artifacts.model.as_ptr(),
                artifacts.scaler.as_ptr(),
                artifacts.schema.as_ptr(),
                record.as_ptr(),
            );
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            let value: serde_json::Value = serde_json::from_str(result_str).unwrap();
            assert_eq!(value["prediction"], "Churn");
            assert_eq!(value["risk_tier"], "high");

            churn_free_string(result);
        }
    }

    #[test]
    fn test_ffi_predictor_lifecycle() {
        let artifacts = write_artifacts();
        let record = record();

        unsafe {
            let predictor = churn_predictor_new(
                artifacts.model.as_ptr(),
                artifacts.scaler.as_ptr(),
                artifacts.schema.as_ptr(),
            );
            assert!(!predictor.is_null());

            let first = churn_predictor_predict(predictor, record.as_ptr());
            let second = churn_predictor_predict(predictor, record.as_ptr());
            assert!(!first.is_null() && !second.is_null());

            let a: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(first).to_str().unwrap()).unwrap();
            let b: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(second).to_str().unwrap()).unwrap();
            assert_eq!(a["churn_probability"], b["churn_probability"]);
            assert_eq!(a["producer"]["instance_id"], b["producer"]["instance_id"]);

            churn_free_string(first);
            churn_free_string(second);
            churn_predictor_free(predictor);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        let artifacts = write_artifacts();
        let missing = CString::new("/nonexistent/model.json").unwrap();
        let invalid_json = CString::new("not json").unwrap();

        unsafe {
            let predictor = churn_predictor_new(
                missing.as_ptr(),
                artifacts.scaler.as_ptr(),
                artifacts.schema.as_ptr(),
            );
            assert!(predictor.is_null());
            let error = CStr::from_ptr(churn_last_error()).to_str().unwrap();
            assert!(error.contains("model"));

            let predictor = churn_predictor_new(
                artifacts.model.as_ptr(),
                artifacts.scaler.as_ptr(),
                artifacts.schema.as_ptr(),
            );
            assert!(churn_last_error().is_null());

            let result = churn_predictor_predict(predictor, invalid_json.as_ptr());
            assert!(result.is_null());
            assert!(!churn_last_error().is_null());

            let result = churn_predictor_predict(predictor, ptr::null());
            assert!(result.is_null());

            assert!(churn_predictor_predict(ptr::null(), invalid_json.as_ptr()).is_null());

            churn_predictor_free(predictor);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = churn_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert_eq!(version_str, crate::CHURN_VERSION);
        }
    }
}
