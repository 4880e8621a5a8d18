//! Integration Test: Model Handle Confinement
//!
//! **Policy**: Only `session.rs` may call `generate`/`close` on a model
//! handle or `load` on a loader. The session lives on the inference worker,
//! so this keeps every model call on that one thread.

use std::path::Path;

use architectural_enforcement::{assert_none, core_src_dir, scan};

fn drives_handle(code: &str) -> bool {
    code.contains(".generate(") || code.contains("handle.close(") || code.contains("loader.load(")
}

fn is_session(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some("session.rs")
}

#[test]
fn test_handle_only_driven_by_session() {
    let violations = scan(&core_src_dir(), |path, code| {
        !is_session(path) && drives_handle(code)
    });
    assert_none("Model handle driven outside the session", &violations);
}

#[test]
fn test_session_does_drive_handle() {
    let session = core_src_dir().join("session.rs");
    let violations = scan(&core_src_dir(), |path, code| {
        path == session && drives_handle(code)
    });
    // Sanity check that the rule is looking at real code
    assert!(!violations.is_empty());
}
