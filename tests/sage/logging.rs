use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use log::LevelFilter;
use sage::{log_disable, log_set_callback, log_set_level, LogCallback, LogRecord};

static LOG_MUTEX: Mutex<()> = Mutex::new(());
const TARGET: &str = "sage::logging_test";

fn counting_callback(counter: Arc<AtomicUsize>) -> LogCallback {
    Arc::new(move |record: &LogRecord<'_>| {
        if record.target == TARGET {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    })
}

#[test]
fn logging_callback_receives_records() {
    let _guard = LOG_MUTEX.lock().unwrap();
    log_disable();
    let counter = Arc::new(AtomicUsize::new(0));

    log_set_callback(Some(counting_callback(Arc::clone(&counter))), LevelFilter::Info).unwrap();
    log::info!(target: TARGET, "logging smoke test");
    log::debug!(target: TARGET, "debug should be filtered");

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    log_disable();
}

#[test]
fn logging_level_off_suppresses_records() {
    let _guard = LOG_MUTEX.lock().unwrap();
    log_disable();
    let counter = Arc::new(AtomicUsize::new(0));

    log_set_callback(Some(counting_callback(Arc::clone(&counter))), LevelFilter::Info).unwrap();
    log_set_level(LevelFilter::Off);
    log::info!(target: TARGET, "should not be logged");

    assert_eq!(counter.load(Ordering::SeqCst), 0);
    log_disable();
}

#[test]
fn callback_sees_missing_layer_root_warning() {
    let _guard = LOG_MUTEX.lock().unwrap();
    log_disable();
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&messages);
    let callback: LogCallback = Arc::new(move |record: &LogRecord<'_>| {
        if record.level == log::Level::Warn {
            sink.lock().unwrap().push(record.message.to_string());
        }
    });
    log_set_callback(Some(callback), LevelFilter::Warn).unwrap();

    let project = crate::support::Project::new();
    let _context = project.context();

    log_disable();
    let messages = messages.lock().unwrap();
    assert!(messages.iter().any(|m| m.contains("ext")));
}
