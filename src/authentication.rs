// the admin endpoints are called by the site operator's browser (or scripts),
// so HTTP Basic auth against a single configured account is enough; there are
// no sessions to manage

use actix_web::http::header::HeaderMap;
use anyhow::Context;
use argon2::Argon2;
use argon2::PasswordHash;
use argon2::PasswordVerifier;
use base64::engine::general_purpose;
use base64::Engine;
use secrecy::ExposeSecret;
use secrecy::Secret;
use tokio::task::JoinHandle;

use crate::configuration::AdminSettings;

mod middleware;

pub use middleware::reject_unauthorized_admins;

/// Verified against when the username is unknown; matches no password anyone
/// knows
const DUMMY_PASSWORD_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1\
    $gZiV/M1gPc22ElAH/Jh1Hw\
    $CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno";

#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: Secret<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials(#[source] anyhow::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

/// Extract credentials from an `Authorization: Basic ...` header (RFC 7617)
pub fn basic_authentication(headers: &HeaderMap) -> Result<Credentials, anyhow::Error> {
    let encoded = headers
        .get("Authorization")
        .context("No Authorization header")?
        .to_str()
        .context("Invalid str")?
        .strip_prefix("Basic ")
        .context("Authorization scheme was not 'Basic'")?;

    let decoded = general_purpose::STANDARD
        .decode(encoded)
        .context("Failed to decode base64")?;
    let decoded = String::from_utf8(decoded).context("Invalid str")?;

    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("No password"))?;

    Ok(Credentials {
        username: username.to_string(),
        password: Secret::new(password.to_string()),
    })
}

/// Note that verification is a CPU-bound operation that is fairly slow (by
/// design)
fn verify_password(
    supplied_password: Secret<String>,
    stored_password: Secret<String>,
) -> Result<(), AuthError> {
    let stored_password = &PasswordHash::new(stored_password.expose_secret())
        .context("Failed to read stored PHC string")
        .map_err(AuthError::UnexpectedError)?;
    Argon2::default()
        .verify_password(
            supplied_password.expose_secret().as_bytes(),
            stored_password,
        )
        .context("Invalid password")
        .map_err(AuthError::InvalidCredentials)?;
    Ok(())
}

/// Wrapper for `spawn_blocking` with `tracing`
pub fn spawn_blocking_with_tracing<F, R>(f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(f))
}

/// Validate supplied credentials against the configured admin account.
#[tracing::instrument(name = "Validating admin credentials", skip(creds, admin))]
pub async fn validate_credentials(
    creds: Credentials,
    admin: &AdminSettings,
) -> Result<(), AuthError> {
    let known_user = creds.username == admin.username;
    let hash_is_set = PasswordHash::new(admin.password_hash.expose_secret()).is_ok();
    if known_user && !hash_is_set {
        tracing::error!(
            "admin.password_hash is not an argon2 PHC string, set APP_ADMIN__PASSWORD_HASH"
        );
    }

    // an unknown username still pays for a full hash verification, otherwise
    // response times would reveal which usernames are valid
    let stored_password = match known_user && hash_is_set {
        true => admin.password_hash.clone(),
        false => Secret::new(DUMMY_PASSWORD_HASH.to_string()),
    };

    spawn_blocking_with_tracing(move || verify_password(creds.password, stored_password))
        .await
        .context("Failed to spawn blocking thread")
        .map_err(AuthError::UnexpectedError)??;

    match (known_user, hash_is_set) {
        (true, true) => Ok(()),
        (true, false) => Err(AuthError::InvalidCredentials(anyhow::anyhow!(
            "No admin password hash configured"
        ))),
        (false, _) => Err(AuthError::InvalidCredentials(anyhow::anyhow!(
            "Unknown username"
        ))),
    }
}
