//! Bearer credential seam.

use std::sync::RwLock;

/// Where the sync engine gets the current bearer token from.
pub trait CredentialSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Token for the signed-in session, replaced on login and cleared on logout.
#[derive(Debug, Default)]
pub struct SessionCredentials {
    token: RwLock<Option<String>>,
}

impl SessionCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.is_empty())),
        }
    }

    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        *self.token.write().unwrap_or_else(|e| e.into_inner()) =
            (!token.is_empty()).then_some(token);
    }

    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl CredentialSource for SessionCredentials {
    fn bearer_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
