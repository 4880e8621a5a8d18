//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Companion core production code MUST NOT call sleep methods.
//! The worker waits on its job channel, callers wait on state channels, and
//! teardown waits on a join. There is no polling to pace.

use architectural_enforcement::{assert_none, core_src_dir, scan};

fn is_sleep(code: &str) -> bool {
    code.contains("::sleep(") || code.contains(".sleep(") || code.contains("park_timeout(")
}

#[test]
fn test_no_sleep_in_production_code() {
    let violations = scan(&core_src_dir(), |_, code| is_sleep(code));
    assert_none("Sleep calls found in production code", &violations);
}

#[test]
fn test_sleep_detection() {
    assert!(is_sleep("    std::thread::sleep(Duration::from_millis(10));"));
    assert!(is_sleep("    tokio::time::sleep(delay).await;"));
    assert!(!is_sleep("    let sleepy = pet.energy < 20;"));
}
