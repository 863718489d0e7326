//! Process memory instrumentation.
//!
//! A process-wide enable flag (default off) guards an optionally
//! available query for current resident memory. On platforms where
//! the count cannot be obtained the query returns `-1`; callers must
//! branch on "unsupported" explicitly and never treat `-1` as zero.
//!
//! The interpreter takes an injectable [`MemoryMonitor`] handle rather
//! than consulting the flag implicitly, so tests control sampling
//! per-run. The flag itself is set once, typically at startup; reads
//! are safe from any thread.

use std::sync::atomic::{AtomicBool, Ordering};

static MEMINFO_ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable or disable memory instrumentation process-wide.
pub fn set_enabled(enabled: bool) {
    MEMINFO_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Whether memory instrumentation is enabled process-wide.
pub fn is_enabled() -> bool {
    MEMINFO_ENABLED.load(Ordering::Relaxed)
}

/// Current resident memory of this process in bytes, or `-1` when the
/// platform cannot report it.
pub fn current_usage_bytes() -> i64 {
    imp::resident_bytes()
}

#[cfg(target_os = "linux")]
mod imp {
    /// Parse the `VmRSS` line of `/proc/self/status`. The kernel
    /// reports kibibytes.
    pub fn resident_bytes() -> i64 {
        let status = match std::fs::read_to_string("/proc/self/status") {
            Ok(s) => s,
            Err(_) => return -1,
        };
        for line in status.lines() {
            if let Some(rest) = line.strip_prefix("VmRSS:") {
                let kib: i64 = match rest.trim().trim_end_matches("kB").trim().parse() {
                    Ok(v) => v,
                    Err(_) => return -1,
                };
                return kib * 1024;
            }
        }
        -1
    }
}

#[cfg(not(target_os = "linux"))]
mod imp {
    pub fn resident_bytes() -> i64 {
        -1
    }
}

/// Injectable sampling handle for the interpreter and tooling.
///
/// A disabled monitor never queries the platform at all; an enabled
/// one passes through [`current_usage_bytes`], including its `-1`
/// "unsupported" result.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryMonitor {
    enabled: bool,
}

impl MemoryMonitor {
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    /// A monitor following the process-wide flag at construction time.
    pub fn from_process_flag() -> Self {
        Self {
            enabled: is_enabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// `None` when disabled; otherwise `Some(bytes)` where `bytes` may
    /// be `-1` for "unsupported".
    pub fn sample(&self) -> Option<i64> {
        self.enabled.then(current_usage_bytes)
    }
}
