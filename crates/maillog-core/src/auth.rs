//! Authorization boundary.
//!
//! The runner only executes migrations for an [`AuthorizedRequest`], and the
//! only intended way to obtain one is from an [`AuthorizationGate`] that has
//! verified the operator's token.  Which scheme the gate uses (keyed nonces,
//! session cookies, ...) is invisible to the runner.

/// Proof that an operator explicitly asked for `action` in `session`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedRequest {
    action: String,
    session: String,
}

impl AuthorizedRequest {
    /// Build a request after a successful verification.
    ///
    /// Gate implementations call this; nothing else should.
    pub fn new(action: impl Into<String>, session: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            session: session.into(),
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    /// Whether this request was authorized for `action`.
    pub fn is_for(&self, action: &str) -> bool {
        self.action == action
    }
}

/// Issues and verifies tokens bound to an action and an operator session.
pub trait AuthorizationGate {
    /// Create a token the operator can present later to perform `action`.
    fn issue(&self, action: &str, session: &str) -> String;

    /// Verify `token` for `action` in `session`.
    ///
    /// Returns `None` when the token is invalid, expired, bound to something
    /// else, or already used.
    fn authorize(&self, action: &str, session: &str, token: &str) -> Option<AuthorizedRequest>;
}
