//! Authenticated session shared by the HTTP and messaging paths

use std::sync::RwLock;

/// Credentials for the current user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Bearer token, also the legacy socket credential
    pub token: Option<String>,
    /// Raw `Cookie` header value carrying the session cookie
    pub cookie: Option<String>,
    /// CSRF token attached to non-GET requests
    pub csrf_token: Option<String>,
}

impl Session {
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_cookie(cookie: impl Into<String>) -> Self {
        Self {
            cookie: Some(cookie.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn csrf(mut self, csrf_token: impl Into<String>) -> Self {
        self.csrf_token = Some(csrf_token.into());
        self
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() || self.cookie.is_some()
    }
}

/// Holder for the current session, if any
#[derive(Debug, Default)]
pub struct SessionStore {
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_session(session: Session) -> Self {
        Self {
            current: RwLock::new(Some(session)),
        }
    }

    pub fn set(&self, session: Session) {
        *self.current.write().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(session);
    }

    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }

    /// The current session when it carries credentials
    #[must_use]
    pub fn authenticated(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_ref()
            .filter(|session| session.is_authenticated())
            .cloned()
    }

    #[must_use]
    pub fn get(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}
