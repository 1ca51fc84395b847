//! Deduplicating sink for image load log lines.

use log::debug;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// Tracks which image paths have already been logged and suppresses repeats.
///
/// Setup enumerates the images that are already loaded and then registers
/// the add-image callback, so the same image can be reported by both passes;
/// the set makes the second report a no-op. Safe to share across the threads
/// dyld delivers callbacks on.
pub struct DedupLogSink {
    logged: Mutex<HashSet<String>>,
}

impl DedupLogSink {
    pub fn new() -> Self {
        Self {
            logged: Mutex::new(HashSet::new()),
        }
    }

    /// Logs an image path at debug severity unless it was already logged.
    ///
    /// Returns whether a line was emitted.
    pub fn log_once(&self, path: &str) -> bool {
        let mut logged = self.lock();
        if logged.contains(path) {
            return false;
        }
        logged.insert(path.to_string());
        debug!("Loaded: {}", path);
        true
    }

    /// Removes a path from the logged set so a future re-load logs again.
    ///
    /// Returns whether the path was present; unknown paths are a no-op.
    /// The removal itself is never logged.
    pub fn forget(&self, path: &str) -> bool {
        self.lock().remove(path)
    }

    // Recover the set from a poisoned lock; a panicking callback must not
    // stop diagnostics for the rest of the process.
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.logged
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for DedupLogSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== log_once() tests ====================

    #[test]
    fn test_first_log_emits() {
        let sink = DedupLogSink::new();
        assert!(sink.log_once("/usr/lib/libSystem.B.dylib"));
    }

    #[test]
    fn test_repeat_log_is_suppressed() {
        let sink = DedupLogSink::new();
        assert!(sink.log_once("/usr/lib/libSystem.B.dylib"));
        assert!(!sink.log_once("/usr/lib/libSystem.B.dylib"));
        assert!(!sink.log_once("/usr/lib/libSystem.B.dylib"));
    }

    #[test]
    fn test_distinct_paths_each_emit() {
        let sink = DedupLogSink::new();
        assert!(sink.log_once("/usr/lib/libz.1.dylib"));
        assert!(sink.log_once("/usr/lib/libc++.1.dylib"));
        assert!(sink.log_once("/System/Library/Frameworks/Foundation.framework/Foundation"));
    }

    // ==================== forget() tests ====================

    #[test]
    fn test_forget_rearms_logging() {
        let sink = DedupLogSink::new();
        assert!(sink.log_once("/usr/lib/libz.1.dylib"));
        assert!(sink.forget("/usr/lib/libz.1.dylib"));
        assert!(sink.log_once("/usr/lib/libz.1.dylib"));
    }

    #[test]
    fn test_forget_unknown_path_is_noop() {
        let sink = DedupLogSink::new();
        assert!(!sink.forget("/never/logged.dylib"));
        // Still logs normally afterwards
        assert!(sink.log_once("/never/logged.dylib"));
    }

    #[test]
    fn test_forget_does_not_affect_other_paths() {
        let sink = DedupLogSink::new();
        sink.log_once("/usr/lib/liba.dylib");
        sink.log_once("/usr/lib/libb.dylib");
        sink.forget("/usr/lib/liba.dylib");
        assert!(!sink.log_once("/usr/lib/libb.dylib"));
    }

    // ==================== concurrency tests ====================

    #[test]
    fn test_concurrent_log_once_emits_exactly_once() {
        let sink = DedupLogSink::new();

        let emissions: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| sink.log_once("/usr/lib/libz.1.dylib") as usize))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(emissions, 1, "contended path should be logged exactly once");
    }

    #[test]
    fn test_concurrent_distinct_paths_all_emit() {
        let sink = DedupLogSink::new();

        let sink = &sink;
        let emissions: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| scope.spawn(move || sink.log_once(&format!("/usr/lib/lib{}.dylib", i)) as usize))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(emissions, 8);
    }
}
