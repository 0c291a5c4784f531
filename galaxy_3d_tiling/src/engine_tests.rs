//! Unit tests for the Engine logging state
//!
//! LOGGER and MIN_SEVERITY are process-wide, so every test is #[serial].

use crate::galaxy3d::Engine;
use crate::galaxy3d::log::{LogEntry, LogSeverity, Logger};
use serial_test::serial;
use std::sync::{Arc, Mutex};

// ============================================================================
// TEST HELPERS
// ============================================================================

struct TestLogger {
    entries: Arc<Mutex<Vec<String>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        // Other tests may log concurrently from scenes
        if entry.source != "galaxy3d::test" {
            return;
        }
        let mut entries = self.entries.lock().unwrap();
        entries.push(format!("{:?}: {}", entry.severity, entry.message));
    }
}

// ============================================================================
// LOGGER TESTS
// ============================================================================

#[test]
#[serial]
fn test_set_logger_captures_entries() {
    let (logger, entries) = TestLogger::new();
    Engine::set_logger(logger);

    Engine::log(LogSeverity::Info, "galaxy3d::test", "first".to_string());
    crate::engine_warn!("galaxy3d::test", "second {}", 2);

    Engine::reset_logger();

    let captured = entries.lock().unwrap();
    assert_eq!(captured.as_slice(), ["Info: first", "Warn: second 2"]);
}

#[test]
#[serial]
fn test_reset_logger_detaches_custom_logger() {
    let (logger, entries) = TestLogger::new();
    Engine::set_logger(logger);
    Engine::reset_logger();

    Engine::log(LogSeverity::Info, "galaxy3d::test", "not captured".to_string());

    assert!(entries.lock().unwrap().is_empty());
}

#[test]
#[serial]
fn test_log_level_filters_less_severe_entries() {
    let (logger, entries) = TestLogger::new();
    Engine::set_logger(logger);
    Engine::set_log_level(LogSeverity::Warn);
    assert_eq!(Engine::log_level(), LogSeverity::Warn);

    crate::engine_trace!("galaxy3d::test", "dropped");
    crate::engine_info!("galaxy3d::test", "dropped");
    crate::engine_warn!("galaxy3d::test", "kept");
    crate::engine_error!("galaxy3d::test", "kept too");

    Engine::reset_logger();
    assert_eq!(Engine::log_level(), LogSeverity::Trace);

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 2);
    assert_eq!(captured[0], "Warn: kept");
    assert_eq!(captured[1], "Error: kept too");
}

#[test]
#[serial]
fn test_log_detailed_carries_location() {
    let located = Arc::new(Mutex::new(None));

    struct LocationLogger(Arc<Mutex<Option<(&'static str, u32)>>>);
    impl Logger for LocationLogger {
        fn log(&self, entry: &LogEntry) {
            if entry.source != "galaxy3d::test" {
                return;
            }
            if let (Some(file), Some(line)) = (entry.file, entry.line) {
                *self.0.lock().unwrap() = Some((file, line));
            }
        }
    }

    Engine::set_logger(LocationLogger(located.clone()));
    Engine::log_detailed(LogSeverity::Error, "galaxy3d::test", "boom".to_string(), "scene.rs", 12);
    Engine::reset_logger();

    assert_eq!(*located.lock().unwrap(), Some(("scene.rs", 12)));
}
