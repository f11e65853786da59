use std::fmt::Debug;

use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpResponse;
use actix_web::ResponseError;
use serde::Deserialize;
use serde::Serialize;

use crate::csrf::NonceAction;
use crate::csrf::NonceIssuer;
use crate::domain::SERVER_ERROR;
use crate::routes::error_chain_fmt;
use crate::routes::JsonEnvelope;
use crate::settings::SettingsError;
use crate::settings::SettingsStore;
use crate::settings::SettingsUpdate;
use crate::settings::StoredSettings;
use crate::utils::error_500;

#[derive(Serialize)]
struct SettingsPage {
    settings: StoredSettings,
    /// Required by `POST /admin/settings` and `POST /admin/refresh/...`
    nonce: String,
}

/// `GET /admin/settings`
pub async fn admin_settings(
    settings: web::Data<SettingsStore>,
    nonces: web::Data<NonceIssuer>,
) -> Result<HttpResponse, actix_web::Error> {
    let stored = settings.stored().await.map_err(error_500)?;
    Ok(HttpResponse::Ok().json(JsonEnvelope::ok(SettingsPage {
        settings: stored,
        nonce: nonces.create(NonceAction::Admin),
    })))
}

#[derive(Deserialize)]
pub struct SettingsForm {
    #[serde(rename = "_nonce")]
    nonce: Option<String>,
    #[serde(flatten)]
    update: SettingsUpdate,
}

#[derive(thiserror::Error)]
pub enum SaveSettingsError {
    #[error("Invalid security token")]
    InvalidNonce,
    #[error(transparent)]
    Rejected(#[from] SettingsError),
}

impl Debug for SaveSettingsError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SaveSettingsError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidNonce => StatusCode::FORBIDDEN,
            Self::Rejected(SettingsError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Rejected(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            Self::Rejected(SettingsError::Store(_)) => SERVER_ERROR.to_string(),
            e => e.to_string(),
        };
        HttpResponse::build(self.status_code()).json(JsonEnvelope::err(message))
    }
}

/// `POST /admin/settings`
///
/// Form fields are the option names (`subscription_service`,
/// `mailchimp_token`, ...). Fields left out keep their stored value.
#[tracing::instrument(name = "Saving admin settings", skip_all)]
pub async fn save_settings(
    form: web::Form<SettingsForm>,
    settings: web::Data<SettingsStore>,
    nonces: web::Data<NonceIssuer>,
) -> Result<HttpResponse, SaveSettingsError> {
    let SettingsForm { nonce, update } = form.into_inner();
    if !nonce
        .as_deref()
        .is_some_and(|n| nonces.verify(NonceAction::Admin, n))
    {
        return Err(SaveSettingsError::InvalidNonce);
    }
    settings.apply(update).await?;
    Ok(HttpResponse::Ok().json(JsonEnvelope::ok("Settings saved.")))
}
