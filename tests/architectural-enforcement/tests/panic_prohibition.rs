//! Integration Test: Panic Prohibition
//!
//! **Policy**: Companion core production code MUST NOT call `unwrap()` or
//! `expect()`, or use `panic!`, `unreachable!`, `todo!` or `unimplemented!`.
//! Failures become a `RequestState::Error` or a log line.
//!
//! **Exceptions**: test modules (`#[cfg(test)]` and below).

use architectural_enforcement::{assert_none, core_src_dir, scan};

const PANICKING_MACROS: [&str; 4] = ["panic!(", "unreachable!(", "todo!(", "unimplemented!("];

fn is_panicking_call(code: &str) -> bool {
    code.contains(".unwrap()")
        || code.contains(".expect(")
        || PANICKING_MACROS.iter().any(|m| code.contains(m))
}

#[test]
fn test_no_panicking_calls_in_production_code() {
    let violations = scan(&core_src_dir(), |_, code| is_panicking_call(code));
    assert_none("Panicking calls found in production code", &violations);
}

#[test]
fn test_panicking_call_detection() {
    assert!(is_panicking_call("let x = value.unwrap();"));
    assert!(is_panicking_call("let x = value.expect(\"set\");"));
    assert!(!is_panicking_call("let x = value.unwrap_or_default();"));
    assert!(!is_panicking_call("let x = value.unwrap_or_else(|_| fallback());"));
    assert!(is_panicking_call("    panic!(\"bad state\");"));
    assert!(is_panicking_call("    _ => unreachable!(),"));
    assert!(is_panicking_call("    todo!()"));
    assert!(is_panicking_call("    unimplemented!(\"later\")"));
    assert!(!is_panicking_call("    let message = panic_message(payload.as_ref());"));
}
