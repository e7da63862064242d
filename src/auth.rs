//! Passphrase gate. A convenience lock for a shared machine, not access
//! control: the accepted passphrase is remembered as a SHA-256 digest in a
//! session file and compared against the configured one on every command.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::{KakeiboError, Result};
use crate::settings::{config_dir, Settings};

pub fn session_path() -> PathBuf {
    config_dir().join("session")
}

pub fn digest(passphrase: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(passphrase.as_bytes());
    hex::encode(hasher.finalize())
}

/// Open when no passphrase is configured, or when the stored digest matches.
pub fn is_unlocked_at(session: &Path, configured: Option<&str>) -> bool {
    let Some(expected) = configured else {
        return true;
    };
    match std::fs::read_to_string(session) {
        Ok(stored) => stored.trim() == digest(expected),
        Err(_) => false,
    }
}

pub fn ensure_unlocked(settings: &Settings) -> Result<()> {
    if is_unlocked_at(&session_path(), settings.configured_passphrase().as_deref()) {
        Ok(())
    } else {
        Err(KakeiboError::Locked)
    }
}

/// Check `entered` and remember it on success. The entered secret is wiped
/// either way.
pub fn login_at(session: &Path, configured: Option<&str>, entered: &mut String) -> Result<bool> {
    let accepted = match configured {
        None => true,
        Some(expected) => entered.as_str() == expected,
    };
    if accepted {
        if let Some(parent) = session.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(session, format!("{}\n", digest(entered)))?;
    }
    entered.zeroize();
    Ok(accepted)
}

pub fn logout_at(session: &Path) -> Result<bool> {
    if session.exists() {
        std::fs::remove_file(session)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_stable_hex() {
        let d = digest("open sesame");
        assert_eq!(d.len(), 64);
        assert_eq!(d, digest("open sesame"));
        assert_ne!(d, digest("open sesame "));
    }

    #[test]
    fn test_gate_open_without_configured_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        assert!(is_unlocked_at(&dir.path().join("session"), None));
    }

    #[test]
    fn test_login_then_unlocked() {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join("nested").join("session");
        assert!(!is_unlocked_at(&session, Some("hunter2")));

        let mut entered = "hunter2".to_string();
        assert!(login_at(&session, Some("hunter2"), &mut entered).unwrap());
        assert!(entered.is_empty());
        assert!(is_unlocked_at(&session, Some("hunter2")));

        let stored = std::fs::read_to_string(&session).unwrap();
        assert!(!stored.contains("hunter2"));
    }

    #[test]
    fn test_wrong_passphrase_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join("session");
        let mut entered = "guess".to_string();
        assert!(!login_at(&session, Some("hunter2"), &mut entered).unwrap());
        assert!(!session.exists());
    }

    #[test]
    fn test_changed_passphrase_locks_again() {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join("session");
        let mut entered = "old".to_string();
        login_at(&session, Some("old"), &mut entered).unwrap();
        assert!(!is_unlocked_at(&session, Some("new")));
    }

    #[test]
    fn test_logout_removes_session() {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join("session");
        let mut entered = "pw".to_string();
        login_at(&session, Some("pw"), &mut entered).unwrap();
        assert!(logout_at(&session).unwrap());
        assert!(!logout_at(&session).unwrap());
        assert!(!is_unlocked_at(&session, Some("pw")));
    }
}
