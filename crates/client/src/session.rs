//! Session evidence and identity-provider events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dormgate_core::SubjectId;

/// Evidence that the actor is authenticated.
///
/// Opaque to the core beyond presence: it is replaced wholesale on every
/// identity event and never edited field by field.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub subject: SubjectId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, subject: SubjectId) -> Self {
        Self {
            access_token: access_token.into(),
            subject,
            email: None,
            expires_at: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

// The access token must never end up in logs.
impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("subject", &self.subject)
            .field("email", &self.email)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Identity transition reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    /// Result of the startup session check; `None` means no one is signed in.
    InitialSessionCheck(Option<Session>),
    /// An explicit login completed.
    SignedIn(Session),
    SignedOut,
    /// The provider rotated the access token for the current subject.
    TokenRefreshed(Session),
}

impl IdentityEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            IdentityEvent::InitialSessionCheck(_) => "initial_session_check",
            IdentityEvent::SignedIn(_) => "signed_in",
            IdentityEvent::SignedOut => "signed_out",
            IdentityEvent::TokenRefreshed(_) => "token_refreshed",
        }
    }
}
