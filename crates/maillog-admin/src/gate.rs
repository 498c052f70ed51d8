//! Upgrade-link nonces.
//!
//! A nonce is a BLAKE3 keyed hash of `action|session|tick`, truncated to 20
//! hex chars.  The tick advances every half lifetime, and verification
//! accepts the current and the previous tick, so a link stays valid for
//! between half a lifetime and a full lifetime.  Tokens accepted once are
//! remembered and refused afterwards.

use std::cell::RefCell;
use std::collections::HashSet;

use chrono::Utc;
use maillog_core::{AuthorizationGate, AuthorizedRequest};
use maillog_store::Database;
use rand::RngCore;
use subtle::ConstantTimeEq;
use tracing::{debug, info};

use crate::config::parse_hex_secret;
use crate::error::AdminError;

/// Option under which the generated nonce secret is persisted.
pub const NONCE_SECRET_OPTION: &str = "maillog_nonce_secret";

/// Length of a nonce in hex characters.
const TOKEN_LEN: usize = 20;

/// Keyed, time-limited, single-use tokens for admin actions.
pub struct NonceGate {
    secret: [u8; 32],
    lifetime_secs: i64,
    /// Tokens already accepted in this process.
    consumed: RefCell<HashSet<String>>,
}

impl NonceGate {
    pub fn new(secret: [u8; 32], lifetime_secs: i64) -> Self {
        Self {
            secret,
            lifetime_secs: lifetime_secs.max(2),
            consumed: RefCell::new(HashSet::new()),
        }
    }

    fn tick(&self, now: i64) -> i64 {
        let half = self.lifetime_secs / 2;
        (now + half - 1).div_euclid(half)
    }

    fn token_for(&self, action: &str, session: &str, tick: i64) -> String {
        let mut hasher = blake3::Hasher::new_keyed(&self.secret);
        hasher.update(action.as_bytes());
        hasher.update(b"|");
        hasher.update(session.as_bytes());
        hasher.update(b"|");
        hasher.update(tick.to_string().as_bytes());
        let hash = hasher.finalize();
        hex::encode(&hash.as_bytes()[..TOKEN_LEN / 2])
    }

    pub fn issue_at(&self, action: &str, session: &str, now: i64) -> String {
        self.token_for(action, session, self.tick(now))
    }

    pub fn authorize_at(
        &self,
        action: &str,
        session: &str,
        token: &str,
        now: i64,
    ) -> Option<AuthorizedRequest> {
        if token.len() != TOKEN_LEN {
            debug!(action, session, "nonce has the wrong length");
            return None;
        }

        if self.consumed.borrow().contains(token) {
            debug!(action, session, "nonce already used");
            return None;
        }

        let tick = self.tick(now);
        let valid = [tick, tick - 1].into_iter().any(|t| {
            let expected = self.token_for(action, session, t);
            bool::from(expected.as_bytes().ct_eq(token.as_bytes()))
        });

        if !valid {
            debug!(action, session, "nonce rejected");
            return None;
        }

        self.consumed.borrow_mut().insert(token.to_string());
        Some(AuthorizedRequest::new(action, session))
    }
}

impl AuthorizationGate for NonceGate {
    fn issue(&self, action: &str, session: &str) -> String {
        self.issue_at(action, session, Utc::now().timestamp())
    }

    fn authorize(&self, action: &str, session: &str, token: &str) -> Option<AuthorizedRequest> {
        self.authorize_at(action, session, token, Utc::now().timestamp())
    }
}

/// Read the persisted nonce secret, generating and storing one on first use.
pub fn load_or_create_secret(db: &Database) -> Result<[u8; 32], AdminError> {
    if let Some(stored) = db.get_option(NONCE_SECRET_OPTION)? {
        return parse_hex_secret(&stored);
    }

    let mut secret = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut secret);
    db.update_option(NONCE_SECRET_OPTION, &hex::encode(secret), true)?;

    info!("generated a new nonce secret");
    Ok(secret)
}
