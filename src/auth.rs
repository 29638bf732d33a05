use crate::db::KvStore;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

pub const MSG_BLANK_PASSCODE: &str = "Please enter a passcode";
pub const MSG_INVALID_PASSCODE: &str = "Invalid passcode. Please try again.";

const HOUR_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasscodeEntry {
    pub hash: String,
    pub batch_key: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct PasscodeFile {
    #[serde(default)]
    passcodes: Vec<PasscodeEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub batch_key: String,
    pub batch_label: String,
    /// Epoch milliseconds.
    pub expires_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

impl SessionData {
    pub fn admin(&self) -> bool {
        self.is_admin.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Granted(SessionData),
    /// User-facing reason; no session was written.
    Denied(&'static str),
}

/// Lowercase hex SHA-256 of the trimmed, lowercased passcode.
pub fn hash_passcode(passcode: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(passcode.trim().to_lowercase().as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn validate_passcode<'a>(passcode: &str, entries: &'a [PasscodeEntry]) -> Option<&'a PasscodeEntry> {
    let hash = hash_passcode(passcode);
    entries.iter().find(|e| e.hash.eq_ignore_ascii_case(&hash))
}

/// Reads `{ "passcodes": [...] }`.
pub fn load_passcodes(path: &Path) -> anyhow::Result<Vec<PasscodeEntry>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
    let file: PasscodeFile = serde_json::from_str(&raw)
        .with_context(|| format!("{} is invalid", path.to_string_lossy()))?;
    Ok(file.passcodes)
}

/// Session persistence under a fixed storage key.
#[derive(Debug, Clone)]
pub struct SessionStore {
    key: String,
    expiry_hours: i64,
}

impl SessionStore {
    pub fn new(key: impl Into<String>, expiry_hours: i64) -> Self {
        Self {
            key: key.into(),
            expiry_hours,
        }
    }

    pub fn login(
        &self,
        kv: &dyn KvStore,
        entries: &[PasscodeEntry],
        passcode: &str,
        now_ms: i64,
    ) -> anyhow::Result<LoginOutcome> {
        if passcode.trim().is_empty() {
            return Ok(LoginOutcome::Denied(MSG_BLANK_PASSCODE));
        }
        let Some(entry) = validate_passcode(passcode, entries) else {
            tracing::info!("login rejected");
            return Ok(LoginOutcome::Denied(MSG_INVALID_PASSCODE));
        };
        let session = self.create(kv, entry, now_ms)?;
        tracing::info!(batch = %session.batch_key, admin = session.admin(), "login granted");
        Ok(LoginOutcome::Granted(session))
    }

    pub fn create(
        &self,
        kv: &dyn KvStore,
        entry: &PasscodeEntry,
        now_ms: i64,
    ) -> anyhow::Result<SessionData> {
        let session = SessionData {
            batch_key: entry.batch_key.clone(),
            batch_label: entry.label.clone(),
            expires_at: now_ms + self.expiry_hours * HOUR_MS,
            is_admin: entry.is_admin,
        };
        let raw = serde_json::to_string(&session).context("failed to serialize session")?;
        kv.set(&self.key, &raw)?;
        Ok(session)
    }

    /// The stored session, if present and unexpired. Expired or unreadable
    /// records are removed.
    pub fn get(&self, kv: &dyn KvStore, now_ms: i64) -> Option<SessionData> {
        let raw = kv.get(&self.key).ok().flatten()?;
        let session = match serde_json::from_str::<SessionData>(&raw) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable session");
                let _ = self.clear(kv);
                return None;
            }
        };
        if now_ms > session.expires_at {
            tracing::info!(batch = %session.batch_key, "session expired");
            let _ = self.clear(kv);
            return None;
        }
        Some(session)
    }

    pub fn clear(&self, kv: &dyn KvStore) -> anyhow::Result<()> {
        kv.remove(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryKv;

    fn entries() -> Vec<PasscodeEntry> {
        vec![
            PasscodeEntry {
                hash: hash_passcode("sunrise-2025"),
                batch_key: "batch-1".into(),
                label: "Morning Batch".into(),
                is_admin: None,
            },
            PasscodeEntry {
                hash: hash_passcode("staff-only"),
                batch_key: "admin".into(),
                label: "Staff".into(),
                is_admin: Some(true),
            },
        ]
    }

    #[test]
    fn hash_is_trimmed_lowercased_sha256_hex() {
        assert_eq!(
            hash_passcode("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash_passcode("  ABC \n"), hash_passcode("abc"));
    }

    #[test]
    fn wrong_passcode_is_denied_without_session() {
        let kv = MemoryKv::default();
        let store = SessionStore::new("session", 8);
        let outcome = store.login(&kv, &entries(), "wrong", 0).expect("login");
        match outcome {
            LoginOutcome::Denied(msg) => assert!(!msg.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
        assert!(store.get(&kv, 0).is_none());
        assert_eq!(kv.get("session").expect("get"), None);
    }

    #[test]
    fn blank_passcode_is_denied() {
        let kv = MemoryKv::default();
        let store = SessionStore::new("session", 8);
        assert_eq!(
            store.login(&kv, &entries(), "   ", 0).expect("login"),
            LoginOutcome::Denied(MSG_BLANK_PASSCODE)
        );
    }

    #[test]
    fn login_creates_session_with_expiry_and_admin_flag() {
        let kv = MemoryKv::default();
        let store = SessionStore::new("session", 8);
        let LoginOutcome::Granted(session) =
            store.login(&kv, &entries(), " Staff-Only ", 1_000).expect("login")
        else {
            panic!("expected a session");
        };
        assert_eq!(session.batch_key, "admin");
        assert_eq!(session.batch_label, "Staff");
        assert_eq!(session.expires_at, 1_000 + 8 * HOUR_MS);
        assert!(session.admin());
        assert_eq!(store.get(&kv, 2_000), Some(session));
    }

    #[test]
    fn expired_session_is_cleared() {
        let kv = MemoryKv::default();
        let store = SessionStore::new("session", 1);
        let session = store.create(&kv, &entries()[0], 0).expect("create");
        assert!(!session.admin());
        assert!(store.get(&kv, HOUR_MS + 1).is_none());
        assert_eq!(kv.get("session").expect("get"), None);
    }

    #[test]
    fn unreadable_session_is_cleared() {
        let kv = MemoryKv::default();
        let store = SessionStore::new("session", 1);
        kv.set("session", "[]").expect("set");
        assert!(store.get(&kv, 0).is_none());
        assert_eq!(kv.get("session").expect("get"), None);
    }

    #[test]
    fn passcode_file_decodes() {
        let dir = std::env::temp_dir().join(format!(
            "learndesk-passcodes-{}",
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::create_dir_all(&dir).expect("dir");
        let path = dir.join("passcodes.json");
        std::fs::write(
            &path,
            serde_json::json!({ "passcodes": entries() }).to_string(),
        )
        .expect("write");
        let loaded = load_passcodes(&path).expect("load");
        assert_eq!(loaded, entries());
        assert!(validate_passcode("SUNRISE-2025", &loaded).is_some());
    }
}
