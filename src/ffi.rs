//! C ABI for the mobile host
//!
//! Strings cross the boundary as NUL-terminated UTF-8. Every string handed
//! back is owned by the caller and released with `meno_free_string`. Failures
//! return NULL or -1 and leave a message for `meno_last_error` on the calling
//! thread.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::pipeline::{compute_insights, InsightsProcessor};
use crate::store::DEFAULT_STORE_WINDOW_DAYS;

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

/// Borrow a caller string, recording an error when it is NULL or not UTF-8
unsafe fn input_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        set_last_error("Null string pointer");
        return None;
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(s) => Some(s),
        Err(_) => {
            set_last_error("String is not valid UTF-8");
            None
        }
    }
}

/// Borrow the processor behind a handle, recording an error when it is NULL
unsafe fn processor<'a>(handle: *mut InsightsProcessorHandle) -> Option<&'a mut InsightsProcessor> {
    if handle.is_null() {
        set_last_error("Null processor pointer");
        return None;
    }
    Some(&mut (*handle).processor)
}

/// Hand a JSON result to the caller, or NULL with the error recorded
fn json_out<E: std::fmt::Display>(result: Result<String, E>) -> *mut c_char {
    match result {
        Ok(json) => match CString::new(json) {
            Ok(cstr) => cstr.into_raw(),
            Err(_) => {
                set_last_error("Result contains an interior NUL byte");
                ptr::null_mut()
            }
        },
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// 0 on success, -1 with the error recorded
fn status_out<E: std::fmt::Display>(result: Result<(), E>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Compute an insights report from a `/logs` JSON array.
///
/// # Safety
/// `json` must be NULL or a valid NUL-terminated string. The returned string
/// must be freed with `meno_free_string`.
#[no_mangle]
pub unsafe extern "C" fn meno_compute_insights(json: *const c_char) -> *mut c_char {
    clear_last_error();
    let Some(json) = input_str(json) else {
        return ptr::null_mut();
    };
    json_out(compute_insights(json.to_string()))
}

/// Opaque processor handle owned by the host
pub struct InsightsProcessorHandle {
    processor: InsightsProcessor,
}

/// Create a processor keeping `window_days` of history (<= 0 for the default
/// of 90, capped at ten years). Release it with `meno_processor_free`.
#[no_mangle]
pub extern "C" fn meno_processor_new(window_days: i32) -> *mut InsightsProcessorHandle {
    clear_last_error();
    let window_days = u32::try_from(window_days)
        .ok()
        .filter(|days| *days > 0)
        .unwrap_or(DEFAULT_STORE_WINDOW_DAYS);

    let processor = InsightsProcessor::with_store_window(window_days);
    Box::into_raw(Box::new(InsightsProcessorHandle { processor }))
}

/// Release a processor.
///
/// # Safety
/// `handle` must be NULL or a pointer from `meno_processor_new` that has not
/// been freed yet.
#[no_mangle]
pub unsafe extern "C" fn meno_processor_free(handle: *mut InsightsProcessorHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Fold a `/logs` JSON array into the processor's store. Returns the number
/// of stored entries, or -1.
///
/// # Safety
/// `handle` must come from `meno_processor_new`; `json` must be NULL or a
/// valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn meno_processor_ingest(
    handle: *mut InsightsProcessorHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();
    let (Some(processor), Some(json)) = (processor(handle), input_str(json)) else {
        return -1;
    };
    match processor.ingest_json(json) {
        Ok(_) => i32::try_from(processor.entry_count()).unwrap_or(i32::MAX),
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Replace the service-provided correlations merged into reports. Returns 0
/// or -1.
///
/// # Safety
/// `handle` must come from `meno_processor_new`; `json` must be NULL or a
/// valid NUL-terminated string holding a JSON array.
#[no_mangle]
pub unsafe extern "C" fn meno_processor_set_remote_correlations(
    handle: *mut InsightsProcessorHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();
    let (Some(processor), Some(json)) = (processor(handle), input_str(json)) else {
        return -1;
    };
    status_out(processor.set_remote_correlations(json))
}

/// Report over the processor's stored history.
///
/// # Safety
/// `handle` must come from `meno_processor_new`. The returned string must be
/// freed with `meno_free_string`.
#[no_mangle]
pub unsafe extern "C" fn meno_processor_report(
    handle: *mut InsightsProcessorHandle,
) -> *mut c_char {
    clear_last_error();
    match processor(handle) {
        Some(processor) => json_out(processor.report()),
        None => ptr::null_mut(),
    }
}

/// Serialize the processor's entry store.
///
/// # Safety
/// `handle` must come from `meno_processor_new`. The returned string must be
/// freed with `meno_free_string`.
#[no_mangle]
pub unsafe extern "C" fn meno_processor_save_store(
    handle: *mut InsightsProcessorHandle,
) -> *mut c_char {
    clear_last_error();
    match processor(handle) {
        Some(processor) => json_out(processor.save_store()),
        None => ptr::null_mut(),
    }
}

/// Replace the processor's entry store with a saved one. Returns 0 or -1.
///
/// # Safety
/// `handle` must come from `meno_processor_new`; `json` must be NULL or a
/// valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn meno_processor_load_store(
    handle: *mut InsightsProcessorHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();
    let (Some(processor), Some(json)) = (processor(handle), input_str(json)) else {
        return -1;
    };
    status_out(processor.load_store(json))
}

/// Release a string returned by a `meno_*` function.
///
/// # Safety
/// `ptr` must be NULL or a string returned by this library that has not been
/// freed yet.
#[no_mangle]
pub unsafe extern "C" fn meno_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Message for the last failure on this thread, or NULL.
///
/// The pointer stays valid until the next `meno_*` call on the same thread
/// and must not be freed.
#[no_mangle]
pub extern "C" fn meno_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Library version as a static string; do not free.
#[no_mangle]
pub extern "C" fn meno_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn sample_logs_json() -> CString {
        CString::new(
            r#"[
                {"id": 1, "date": "2024-01-08", "logType": "morning", "mood": 3,
                 "sleepHours": 7.5, "symptomsJson": {"hot_flash": 2}},
                {"id": 2, "date": "2024-01-07", "logType": "evening", "mood": 4,
                 "contextTags": ["yoga"]}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_ffi_compute_insights() {
        let json = sample_logs_json();

        unsafe {
            let result = meno_compute_insights(json.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("report_version"));
            assert!(result_str.contains("hot_flash"));

            meno_free_string(result);
        }
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        unsafe {
            let processor = meno_processor_new(30);
            assert!(!processor.is_null());

            let json = sample_logs_json();
            assert_eq!(meno_processor_ingest(processor, json.as_ptr()), 2);
            // same records again: still two entries
            assert_eq!(meno_processor_ingest(processor, json.as_ptr()), 2);

            let remote = CString::new("[]").unwrap();
            assert_eq!(meno_processor_set_remote_correlations(processor, remote.as_ptr()), 0);

            let report = meno_processor_report(processor);
            assert!(!report.is_null());
            let report_str = CStr::from_ptr(report).to_str().unwrap();
            assert!(report_str.contains("\"entry_count\": 2"));
            meno_free_string(report);

            let store = meno_processor_save_store(processor);
            assert!(!store.is_null());

            let processor2 = meno_processor_new(0);
            assert_eq!(meno_processor_load_store(processor2, store), 0);

            meno_free_string(store);
            meno_processor_free(processor);
            meno_processor_free(processor2);
        }
    }

    #[test]
    fn test_ffi_processor_huge_window() {
        unsafe {
            let processor = meno_processor_new(i32::MAX);
            let json = sample_logs_json();
            assert_eq!(meno_processor_ingest(processor, json.as_ptr()), 2);

            let report = meno_processor_report(processor);
            assert!(!report.is_null());
            meno_free_string(report);
            meno_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid_json = CString::new("not json").unwrap();
            let result = meno_compute_insights(invalid_json.as_ptr());
            assert!(result.is_null());

            let error = meno_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            assert!(meno_compute_insights(ptr::null()).is_null());
            assert_eq!(meno_processor_ingest(ptr::null_mut(), invalid_json.as_ptr()), -1);
            assert!(meno_processor_report(ptr::null_mut()).is_null());

            let processor = meno_processor_new(7);
            assert_eq!(meno_processor_load_store(processor, invalid_json.as_ptr()), -1);
            meno_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = meno_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert_eq!(version_str, crate::INSIGHTS_VERSION);
        }
    }
}
