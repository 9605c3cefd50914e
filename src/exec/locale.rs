//! Serialized access to the process-wide `LC_CTYPE` locale.
//!
//! `setlocale` mutates state shared by every thread in the process. All
//! swaps go through [`with_ctype_locale`], which holds a global mutex for the
//! whole swap → run → restore sequence so one thread's temporary locale can
//! never be observed by another thread's escape call.

use std::sync::Mutex;

static LOCALE_GATE: Mutex<()> = Mutex::new(());

/// Runs `f` with `LC_CTYPE` set to `locale`, restoring the previous value afterwards.
///
/// With `None`, or when the locale is already active, `f` runs unchanged (but
/// still serialized). A locale the C library rejects is logged and skipped.
pub fn with_ctype_locale<T>(locale: Option<&str>, f: impl FnOnce() -> T) -> T {
    // A poisoned gate only means another escape panicked; the locale was
    // restored by that thread's guard.
    let _gate = LOCALE_GATE.lock().unwrap_or_else(|e| e.into_inner());
    let _restore = locale.and_then(sys::swap_ctype);
    f()
}

/// Current `LC_CTYPE` locale name, if the platform exposes one.
pub fn current_ctype_locale() -> Option<String> {
    let _gate = LOCALE_GATE.lock().unwrap_or_else(|e| e.into_inner());
    sys::query_ctype()
}

/// Blocks every locale swap until the guard is dropped.
#[cfg(test)]
pub(crate) fn hold_gate() -> std::sync::MutexGuard<'static, ()> {
    LOCALE_GATE.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(unix)]
mod sys {
    use std::ffi::{CStr, CString};

    /// Restores the saved locale on drop.
    pub struct Restore(CString);

    impl Drop for Restore {
        fn drop(&mut self) {
            // SAFETY: called with the gate held; the argument is a valid C string.
            unsafe {
                libc::setlocale(libc::LC_CTYPE, self.0.as_ptr());
            }
        }
    }

    pub fn query_ctype() -> Option<String> {
        // SAFETY: a null locale queries without modifying; the returned
        // pointer is copied before any other setlocale call.
        unsafe {
            let ptr = libc::setlocale(libc::LC_CTYPE, std::ptr::null());
            (!ptr.is_null()).then(|| CStr::from_ptr(ptr).to_string_lossy().into_owned())
        }
    }

    pub fn swap_ctype(wanted: &str) -> Option<Restore> {
        let previous = query_ctype()?;
        if previous == wanted {
            return None;
        }
        let Ok(wanted_c) = CString::new(wanted) else {
            tracing::warn!(locale = wanted, "locale name contains a NUL byte; not switching");
            return None;
        };
        let previous_c = CString::new(previous).ok()?;
        // SAFETY: gate held by the caller; both strings are valid C strings.
        let switched = unsafe { libc::setlocale(libc::LC_CTYPE, wanted_c.as_ptr()) };
        if switched.is_null() {
            tracing::warn!(locale = wanted, "locale is not installed; escaping with current locale");
            return None;
        }
        Some(Restore(previous_c))
    }
}

#[cfg(not(unix))]
mod sys {
    pub struct Restore;

    pub fn query_ctype() -> Option<String> {
        None
    }

    pub fn swap_ctype(_wanted: &str) -> Option<Restore> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_closure_value() {
        assert_eq!(with_ctype_locale(None, || 42), 42);
    }

    #[cfg(unix)]
    #[test]
    fn restores_previous_locale() {
        let before = current_ctype_locale();
        let inside = with_ctype_locale(Some("C"), || sys::query_ctype());
        assert_eq!(inside.as_deref(), Some("C"));
        assert_eq!(current_ctype_locale(), before);
    }

    #[cfg(unix)]
    #[test]
    fn unknown_locale_is_skipped() {
        let before = current_ctype_locale();
        let ran = with_ctype_locale(Some("xx_NOT.A-LOCALE"), || true);
        assert!(ran);
        assert_eq!(current_ctype_locale(), before);
    }

    #[cfg(unix)]
    #[test]
    fn concurrent_swaps_never_leak() {
        let before = current_ctype_locale();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..50 {
                        let seen = with_ctype_locale(Some("C"), sys::query_ctype);
                        assert_eq!(seen.as_deref(), Some("C"));
                    }
                });
            }
        });
        assert_eq!(current_ctype_locale(), before);
    }
}
