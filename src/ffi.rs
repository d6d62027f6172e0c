//! FFI bindings for the awkwardness meter
//!
//! This module provides C-compatible functions for calling the meter from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `meter_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::MeterConfig;
use crate::error::ComputeError;
use crate::pipeline::AwkwardnessMeter;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

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

/// Build a meter from an optional JSON config pointer (NULL means defaults)
unsafe fn meter_from_config_ptr(config_json: *const c_char) -> Result<AwkwardnessMeter, String> {
    if config_json.is_null() {
        return Ok(AwkwardnessMeter::default());
    }
    let json = cstr_to_string(config_json).ok_or("Invalid config string pointer")?;
    MeterConfig::from_json(&json)
        .and_then(AwkwardnessMeter::new)
        .map_err(|e: ComputeError| e.to_string())
}

// ============================================================================
// Stateless API
// ============================================================================

/// Score a JSON array of utterances and return the encoded report.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a newly allocated string that must be freed with `meter_free_string`.
/// - Returns NULL on error; call `meter_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn meter_analyze_json(
    json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let meter = match meter_from_config_ptr(config_json) {
        Ok(meter) => meter,
        Err(msg) => {
            set_last_error(&msg);
            return ptr::null_mut();
        }
    };

    match meter.analyze_json(&json_str) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Default configuration as JSON.
///
/// # Safety
/// - Returns a newly allocated string that must be freed with `meter_free_string`.
#[no_mangle]
pub unsafe extern "C" fn meter_default_config() -> *mut c_char {
    clear_last_error();

    match MeterConfig::default().to_json() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Handle API
// ============================================================================

/// Opaque handle to a configured AwkwardnessMeter
pub struct MeterHandle {
    meter: AwkwardnessMeter,
}

/// Create a meter with the given JSON configuration.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a pointer that must be freed with `meter_free`.
/// - Returns NULL if the configuration is invalid; call `meter_last_error`.
#[no_mangle]
pub unsafe extern "C" fn meter_new(config_json: *const c_char) -> *mut MeterHandle {
    clear_last_error();

    match meter_from_config_ptr(config_json) {
        Ok(meter) => Box::into_raw(Box::new(MeterHandle { meter })),
        Err(msg) => {
            set_last_error(&msg);
            ptr::null_mut()
        }
    }
}

/// Free a meter.
///
/// # Safety
/// - `meter` must be a valid pointer returned by `meter_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn meter_free(meter: *mut MeterHandle) {
    if !meter.is_null() {
        drop(Box::from_raw(meter));
    }
}

/// Score a JSON array of utterances with a configured meter.
///
/// # Safety
/// - `meter` must be a valid pointer returned by `meter_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `meter_free_string`.
/// - Returns NULL on error; call `meter_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn meter_analyze(
    meter: *const MeterHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if meter.is_null() {
        set_last_error("Null meter pointer");
        return ptr::null_mut();
    }

    let handle = &*meter;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    match handle.meter.analyze_json(&json_str) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by meter functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a meter function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn meter_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next meter function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn meter_last_error() -> *const c_char {
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
pub unsafe extern "C" fn meter_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transcript() -> CString {
        CString::new(
            r#"[
                {"start": 0.0, "end": 5.0, "speaker": "X", "text": "Hello there friend?"},
                {"start": 7.0, "end": 8.0, "speaker": "Y", "text": "Oh, hi."}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_ffi_analyze_json() {
        let json = sample_transcript();

        unsafe {
            let result = meter_analyze_json(json.as_ptr(), ptr::null());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("Left Hanging"));
            assert!(result_str.contains("detailed_metrics"));

            meter_free_string(result);
        }
    }

    #[test]
    fn test_ffi_meter_lifecycle() {
        let config = CString::new(r#"{"scoring": {"interruption_penalty": 8.0}}"#).unwrap();
        let json = sample_transcript();

        unsafe {
            let meter = meter_new(config.as_ptr());
            assert!(!meter.is_null());

            let first = meter_analyze(meter, json.as_ptr());
            let second = meter_analyze(meter, json.as_ptr());
            assert!(!first.is_null());
            assert!(!second.is_null());

            meter_free_string(first);
            meter_free_string(second);
            meter_free(meter);
        }
    }

    #[test]
    fn test_ffi_invalid_config() {
        let config = CString::new(r#"{"scoring": {"ratio_reference": 0.0}}"#).unwrap();

        unsafe {
            let meter = meter_new(config.as_ptr());
            assert!(meter.is_null());

            let error = CStr::from_ptr(meter_last_error()).to_str().unwrap();
            assert!(error.contains("ratio_reference"));
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid_json = CString::new("not json").unwrap();
            let result = meter_analyze_json(invalid_json.as_ptr(), ptr::null());
            assert!(result.is_null());

            let error = meter_last_error();
            assert!(!error.is_null());
            assert!(!CStr::from_ptr(error).to_str().unwrap().is_empty());

            let null_meter = meter_analyze(ptr::null(), invalid_json.as_ptr());
            assert!(null_meter.is_null());
            let error = CStr::from_ptr(meter_last_error()).to_str().unwrap();
            assert_eq!(error, "Null meter pointer");
        }
    }

    #[test]
    fn test_ffi_default_config() {
        unsafe {
            let config = meter_default_config();
            assert!(!config.is_null());
            let parsed = MeterConfig::from_json(CStr::from_ptr(config).to_str().unwrap()).unwrap();
            assert_eq!(parsed, MeterConfig::default());
            meter_free_string(config);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = meter_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert_eq!(version_str, crate::METER_VERSION);
        }
    }
}
