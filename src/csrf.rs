//! Time-limited, action-bound form tokens ("nonces").
//!
//! A nonce is a truncated HMAC-SHA256 of `action|tick`, where a tick is half
//! of the token lifetime. A nonce issued during tick `t` verifies during `t`
//! and `t + 1`, so it lives between 12 and 24 hours.

use hmac::digest::InvalidLength;
use hmac::Hmac;
use hmac::Mac;
use secrecy::ExposeSecret;
use secrecy::Secret;
use sha2::Sha256;

const NONCE_LIFETIME_SECS: i64 = 24 * 60 * 60;
const TAG_BYTES: usize = 16;

/// What a nonce authorises. A nonce for one action is useless for another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NonceAction {
    /// Visitor submitting a subscription form
    Subscribe,
    /// Admin saving settings or refreshing lists
    Admin,
}

impl NonceAction {
    fn as_str(&self) -> &'static str {
        match self {
            NonceAction::Subscribe => "pk-subscribe",
            NonceAction::Admin => "pk-admin",
        }
    }
}

#[derive(Clone)]
pub struct NonceIssuer {
    mac: Hmac<Sha256>,
}

fn tick(unix_secs: i64) -> i64 { unix_secs / (NONCE_LIFETIME_SECS / 2) }

impl NonceIssuer {
    pub fn new(secret: &Secret<String>) -> Result<Self, InvalidLength> {
        let mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())?;
        Ok(Self { mac })
    }

    fn tag(
        &self,
        action: NonceAction,
        tick: i64,
    ) -> Hmac<Sha256> {
        let mut mac = self.mac.clone();
        mac.update(format!("{}|{tick}", action.as_str()).as_bytes());
        mac
    }

    pub fn create(
        &self,
        action: NonceAction,
    ) -> String {
        self.create_at(action, chrono::Utc::now().timestamp())
    }

    pub fn verify(
        &self,
        action: NonceAction,
        token: &str,
    ) -> bool {
        self.verify_at(action, token, chrono::Utc::now().timestamp())
    }

    fn create_at(
        &self,
        action: NonceAction,
        unix_secs: i64,
    ) -> String {
        let tag = self.tag(action, tick(unix_secs)).finalize().into_bytes();
        hex::encode(&tag[..TAG_BYTES])
    }

    fn verify_at(
        &self,
        action: NonceAction,
        token: &str,
        unix_secs: i64,
    ) -> bool {
        let Ok(tag) = hex::decode(token.trim()) else {
            return false;
        };
        if tag.len() != TAG_BYTES {
            return false;
        }
        let now = tick(unix_secs);
        [now, now - 1].into_iter().any(|t| {
            self.tag(action, t)
                .verify_truncated_left(&tag)
                .is_ok()
        })
    }
}
