//! The password gate in front of the notebook.
//!
//! This is a plaintext comparison against a locally stored value, not a
//! security mechanism. The first password ever submitted becomes the secret.
//!
//! [`SessionRegistry`] holds the bearer tokens handed out by the HTTP layer
//! after a successful login, so access is tied to an explicit session rather
//! than a process-wide flag.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, Storage, PASSWORD_KEY};

/// Whether a secret has been stored yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    NeedsSetup,
    Locked,
}

impl GateStatus {
    /// Label for the submit action.
    pub fn action_label(&self) -> &'static str {
        match self {
            Self::NeedsSetup => "Set Password",
            Self::Locked => "Login",
        }
    }
}

/// Result of submitting a password.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthOutcome {
    /// No secret existed; the submission was stored and the gate opened.
    Enrolled,
    /// Matched the stored secret.
    Accepted,
    /// Did not match. Nothing was changed.
    Rejected,
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

#[derive(Clone)]
pub struct AuthGate {
    storage: Arc<dyn Storage>,
}

impl AuthGate {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    async fn stored_secret(&self) -> Result<Option<String>> {
        let secret: Option<String> = db::load_json(self.storage.clone(), PASSWORD_KEY).await?;
        // An empty stored secret counts as none.
        Ok(secret.filter(|s| !s.is_empty()))
    }

    pub async fn status(&self) -> Result<GateStatus> {
        Ok(match self.stored_secret().await? {
            Some(_) => GateStatus::Locked,
            None => GateStatus::NeedsSetup,
        })
    }

    pub async fn submit(&self, password: &str) -> Result<AuthOutcome> {
        match self.stored_secret().await? {
            None => {
                db::save_json(self.storage.clone(), PASSWORD_KEY, password).await?;
                tracing::info!("Password set");
                Ok(AuthOutcome::Enrolled)
            }
            Some(secret) if secret == password => Ok(AuthOutcome::Accepted),
            Some(_) => {
                tracing::warn!("Incorrect password submitted");
                Ok(AuthOutcome::Rejected)
            }
        }
    }
}

/// How long a session token stays valid after login.
pub const SESSION_TTL: TimeDelta = TimeDelta::hours(12);

/// Bearer tokens for authenticated sessions, keyed to their issue time.
#[derive(Clone, Debug)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<Uuid, DateTime<Utc>>>>,
    ttl: TimeDelta,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_ttl(SESSION_TTL)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: TimeDelta) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Open a session and return its token. Expired sessions are dropped.
    pub fn issue(&self) -> Uuid {
        let token = Uuid::new_v4();
        let now = Utc::now();
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        sessions.retain(|_, issued| now - *issued < self.ttl);
        sessions.insert(token, now);
        token
    }

    /// Whether `token` was issued and has not expired. Expired tokens are removed.
    pub fn is_valid(&self, token: &Uuid) -> bool {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        match sessions.get(token) {
            Some(issued) if Utc::now() - *issued < self.ttl => true,
            Some(_) => {
                sessions.remove(token);
                false
            }
            None => false,
        }
    }

    /// Close a session. Returns whether it existed.
    pub fn revoke(&self, token: &Uuid) -> bool {
        self.sessions
            .lock()
            .expect("session lock poisoned")
            .remove(token)
            .is_some()
    }

    pub fn active(&self) -> usize {
        self.sessions.lock().expect("session lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStorage;

    fn gate() -> AuthGate {
        AuthGate::new(Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn first_submission_becomes_the_secret() {
        let gate = gate();
        assert_eq!(gate.status().await.unwrap(), GateStatus::NeedsSetup);

        assert_eq!(gate.submit("hunter2").await.unwrap(), AuthOutcome::Enrolled);

        assert_eq!(gate.status().await.unwrap(), GateStatus::Locked);
        assert_eq!(gate.submit("hunter2").await.unwrap(), AuthOutcome::Accepted);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected_without_changes() {
        let gate = gate();
        gate.submit("hunter2").await.unwrap();

        assert_eq!(gate.submit("hunter3").await.unwrap(), AuthOutcome::Rejected);
        assert_eq!(gate.submit("hunter2").await.unwrap(), AuthOutcome::Accepted);
    }

    #[tokio::test]
    async fn comparison_is_exact() {
        let gate = gate();
        gate.submit("Secret").await.unwrap();

        assert_eq!(gate.submit("secret").await.unwrap(), AuthOutcome::Rejected);
        assert_eq!(gate.submit("Secret ").await.unwrap(), AuthOutcome::Rejected);
    }

    #[test]
    fn action_label_follows_status() {
        assert_eq!(GateStatus::NeedsSetup.action_label(), "Set Password");
        assert_eq!(GateStatus::Locked.action_label(), "Login");
    }

    #[test]
    fn sessions_can_be_revoked() {
        let sessions = SessionRegistry::new();
        let token = sessions.issue();
        assert!(sessions.is_valid(&token));
        assert_eq!(sessions.active(), 1);

        assert!(sessions.revoke(&token));
        assert!(!sessions.is_valid(&token));
        assert!(!sessions.revoke(&token));
    }

    #[test]
    fn sessions_expire() {
        let sessions = SessionRegistry::with_ttl(TimeDelta::zero());
        let token = sessions.issue();

        assert!(!sessions.is_valid(&token));
        assert_eq!(sessions.active(), 0);
    }

    #[test]
    fn issuing_drops_expired_sessions() {
        let sessions = SessionRegistry::with_ttl(TimeDelta::zero());
        sessions.issue();
        sessions.issue();

        assert_eq!(sessions.active(), 1);
    }

    #[test]
    fn fresh_sessions_outlive_a_login() {
        let sessions = SessionRegistry::new();
        let first = sessions.issue();
        let second = sessions.issue();

        assert!(sessions.is_valid(&first));
        assert!(sessions.is_valid(&second));
        assert_eq!(sessions.active(), 2);
    }
}
