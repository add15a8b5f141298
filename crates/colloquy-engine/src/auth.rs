use std::sync::{PoisonError, RwLock};

/// User id used for persistence when nobody is signed in
pub const DEFAULT_USER_ID: &str = "default-user";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
}

/// Source of the signed-in identity
pub trait CredentialProvider: Send + Sync {
    fn is_authenticated(&self) -> bool;

    fn current_user(&self) -> Option<User>;
}

/// Process-local session, signed in by user id
#[derive(Debug, Default)]
pub struct LocalSession {
    user: RwLock<Option<User>>,
}

impl LocalSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user: RwLock::new(Some(User { id: user_id.into() })),
        }
    }

    pub fn login(&self, user_id: impl Into<String>) {
        let mut user = self.user.write().unwrap_or_else(PoisonError::into_inner);
        *user = Some(User { id: user_id.into() });
    }

    pub fn logout(&self) {
        let mut user = self.user.write().unwrap_or_else(PoisonError::into_inner);
        *user = None;
    }
}

impl CredentialProvider for LocalSession {
    fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    fn current_user(&self) -> Option<User> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Id to scope persistence calls by, falling back to [`DEFAULT_USER_ID`]
pub fn resolve_user_id(provider: &dyn CredentialProvider) -> String {
    provider
        .current_user()
        .map(|u| u.id)
        .unwrap_or_else(|| DEFAULT_USER_ID.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_falls_back_to_default_user() {
        let session = LocalSession::new();
        assert!(!session.is_authenticated());
        assert_eq!(resolve_user_id(&session), "default-user");
    }

    #[test]
    fn test_login_logout() {
        let session = LocalSession::new();
        session.login("alice");
        assert!(session.is_authenticated());
        assert_eq!(resolve_user_id(&session), "alice");

        session.logout();
        assert_eq!(resolve_user_id(&session), DEFAULT_USER_ID);
    }
}
