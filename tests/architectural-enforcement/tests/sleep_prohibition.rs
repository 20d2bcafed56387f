//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT call sleep methods. Crossfade
//! teardown and ended-fallback go through a timer queue; the headless clock
//! uses `tokio::time::interval_at`.
//! **Exceptions**: test code

use architectural_enforcement::scan;

fn is_sleep(code: &str) -> bool {
    code.contains("::sleep(") || code.contains(".sleep(")
}

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = scan(is_sleep);

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ Use instead:");
        eprintln!("  - tokio_util::time::DelayQueue for delayed work");
        eprintln!("  - tokio::time::interval() for periodic tasks");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

#[test]
fn test_sleep_detection() {
    assert!(is_sleep("    tokio::time::sleep(Duration::from_millis(10)).await;"));
    assert!(is_sleep("    std::thread::sleep(delay);"));
    assert!(!is_sleep("    ticker.tick().await;"));
}
