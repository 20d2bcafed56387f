//! Integration Test: Unwrap Prohibition
//!
//! **Policy**: Production code propagates errors with `?` or handles them.
//! `unwrap()` and `expect()` are allowed in test code only.
//! `unwrap_or`, `unwrap_or_else` and `unwrap_or_default` are fine.

use architectural_enforcement::scan;

fn is_unwrap(code: &str) -> bool {
    code.contains(".unwrap()") || code.contains(".expect(")
}

#[test]
fn test_no_unwrap_in_production_code() {
    let violations = scan(is_unwrap);

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: unwrap()/expect() found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        panic!(
            "\nFound {} unwrap violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

#[test]
fn test_unwrap_detection() {
    assert!(is_unwrap("let v = parse(s).unwrap();"));
    assert!(is_unwrap("let v = parse(s).expect(\"valid\");"));
    assert!(!is_unwrap("let v = parse(s).unwrap_or(0);"));
    assert!(!is_unwrap("let v = parse(s).unwrap_or_else(|_| 0);"));
}
