mod test_support;

use serde_json::json;
use test_support::{
    request_err, request_ok, seed_workspace, spawn_sidecar, ADMIN_PASSCODE, VIEWER_PASSCODE,
};

#[test]
fn login_requires_a_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "auth.login",
        json!({ "passcode": VIEWER_PASSCODE }),
    );
    assert_eq!(code, "no_workspace");
}

#[test]
fn passcode_login_session_and_logout() {
    let workspace = seed_workspace("learndesk-auth");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected.get("passcodes").and_then(|v| v.as_u64()), Some(3));

    let (code, message) = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "auth.login",
        json!({ "passcode": "   " }),
    );
    assert_eq!(code, "auth_failed");
    assert_eq!(message, "Please enter a passcode");

    let (code, message) = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "auth.login",
        json!({ "passcode": "not-a-real-code" }),
    );
    assert_eq!(code, "auth_failed");
    assert_eq!(message, "Invalid passcode. Please try again.");

    let none = request_ok(&mut stdin, &mut reader, "4", "auth.session", json!({}));
    assert!(none.get("session").map(|v| v.is_null()).unwrap_or(false));

    // Trimmed and case-insensitive.
    let login = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "auth.login",
        json!({ "passcode": "  SUNRISE-2025 " }),
    );
    let session = login.get("session").expect("session");
    assert_eq!(session.get("batchKey").and_then(|v| v.as_str()), Some("batch-morning"));
    assert_eq!(session.get("batchLabel").and_then(|v| v.as_str()), Some("Morning Batch"));
    assert_eq!(session.get("isAdmin").and_then(|v| v.as_bool()), Some(false));
    let expires_at = session.get("expiresAt").and_then(|v| v.as_i64()).expect("expiresAt");
    let now = chrono::Utc::now().timestamp_millis();
    let eight_hours = 8 * 60 * 60 * 1000;
    assert!(expires_at > now + eight_hours - 60_000 && expires_at <= now + eight_hours);

    let again = request_ok(&mut stdin, &mut reader, "6", "auth.session", json!({}));
    assert_eq!(again.get("session"), login.get("session"));

    let health = request_ok(&mut stdin, &mut reader, "7", "health", json!({}));
    assert_eq!(
        health.pointer("/session/batchKey").and_then(|v| v.as_str()),
        Some("batch-morning")
    );

    let _ = request_ok(&mut stdin, &mut reader, "8", "auth.logout", json!({}));
    let gone = request_ok(&mut stdin, &mut reader, "9", "auth.session", json!({}));
    assert!(gone.get("session").map(|v| v.is_null()).unwrap_or(false));

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "10",
        "content.batch.courses",
        json!({}),
    );
    assert_eq!(code, "not_authenticated");
}

#[test]
fn session_survives_a_restart() {
    let workspace = seed_workspace("learndesk-auth-restart");
    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "auth.login",
            json!({ "passcode": ADMIN_PASSCODE }),
        );
        drop(stdin);
        let _ = child.wait();
    }

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let restored = request_ok(&mut stdin, &mut reader, "2", "auth.session", json!({}));
    assert_eq!(
        restored.pointer("/session/isAdmin").and_then(|v| v.as_bool()),
        Some(true)
    );
}

#[test]
fn editor_requires_admin_session() {
    let workspace = seed_workspace("learndesk-auth-gate");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let (code, _) = request_err(&mut stdin, &mut reader, "2", "editor.open", json!({}));
    assert_eq!(code, "not_authenticated");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "auth.login",
        json!({ "passcode": VIEWER_PASSCODE }),
    );
    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "editor.courses.delete",
        json!({ "courseId": "course-physics" }),
    );
    assert_eq!(code, "forbidden");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "auth.login",
        json!({ "passcode": ADMIN_PASSCODE }),
    );
    let status = request_ok(&mut stdin, &mut reader, "6", "editor.open", json!({}));
    assert_eq!(status.get("hasDraft").and_then(|v| v.as_bool()), Some(false));
}

#[test]
fn missing_passcode_list_rejects_every_login() {
    let workspace = seed_workspace("learndesk-auth-nolist");
    std::fs::remove_file(workspace.join("passcodes.json")).expect("remove passcodes");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let (code, message) = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "auth.login",
        json!({ "passcode": ADMIN_PASSCODE }),
    );
    assert_eq!(code, "auth_failed");
    assert_eq!(message, "Invalid passcode. Please try again.");
}
