//! Durable token + user id, written by `wonderbook session set` and read by
//! every authenticated request. Issuing tokens is the auth service's job.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;
use wonderbook_core::{AuthState, UserId};

use crate::error::{ApiError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
}

impl Session {
    pub fn new(token: impl Into<String>, user_id: UserId) -> Result<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(ApiError::Session("token cannot be empty".to_string()));
        }
        Ok(Self { token, user_id })
    }

    /// Reads a stored session. A missing or unreadable file means signed out.
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        match serde_json::from_str(&contents) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt session file");
                Ok(None)
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ApiError::Session(e.to_string()))?;
        std::fs::write(path, json)?;
        restrict_permissions(path)?;
        Ok(())
    }

    /// Deletes the stored session. Returns whether one existed.
    pub fn clear(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        Ok(true)
    }

    pub fn auth_state(session: Option<&Self>) -> AuthState {
        session.map_or_else(AuthState::anonymous, |s| AuthState::signed_in(s.user_id))
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn save_load_clear() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");

        assert_eq!(Session::load_from(&path).unwrap(), None);

        let session = Session::new(" tok-123 ", 42).unwrap();
        session.save_to(&path).unwrap();
        let loaded = Session::load_from(&path).unwrap().unwrap();
        assert_eq!(loaded.token, "tok-123");
        assert_eq!(Session::auth_state(Some(&loaded)), AuthState::signed_in(42));

        assert!(Session::clear(&path).unwrap());
        assert!(!Session::clear(&path).unwrap());
        assert_eq!(Session::auth_state(None), AuthState::anonymous());
    }

    #[test]
    fn corrupt_file_reads_as_signed_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(Session::load_from(&path).unwrap(), None);
    }

    #[test]
    fn empty_token_rejected() {
        assert!(Session::new("  ", 1).is_err());
    }
}
