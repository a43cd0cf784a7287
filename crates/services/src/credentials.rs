use std::env;
use std::sync::RwLock;

use crate::config::ENV_API_TOKEN;

/// Source of the bearer token attached to backend requests.
///
/// Injected into HTTP clients at construction instead of being read from
/// ambient storage inside request hooks.
pub trait CredentialProvider: Send + Sync {
    /// Current token, if the user is signed in.
    fn bearer_token(&self) -> Option<String>;

    /// Drop the current token. Called when the backend answers 401.
    fn invalidate(&self);
}

/// Token held in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct StaticCredentials {
    token: RwLock<Option<String>>,
}

impl StaticCredentials {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.trim().is_empty())),
        }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(None)
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::new(env::var(ENV_API_TOKEN).ok())
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.bearer_token().is_some()
    }
}

impl CredentialProvider for StaticCredentials {
    fn bearer_token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn invalidate(&self) {
        let mut guard = match self.token.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.take().is_some() {
            tracing::warn!("credentials invalidated after unauthorized response");
        }
    }
}
