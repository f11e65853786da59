use std::fmt::Debug;

use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpResponse;
use actix_web::ResponseError;
use secrecy::Secret;
use serde::Deserialize;

use crate::csrf::NonceAction;
use crate::csrf::NonceIssuer;
use crate::domain::Provider;
use crate::domain::SERVER_ERROR;
use crate::providers::ProviderClients;
use crate::providers::ProviderError;
use crate::routes::error_chain_fmt;
use crate::routes::JsonEnvelope;
use crate::settings::ListRefreshError;
use crate::settings::SettingsStore;

#[derive(Deserialize)]
pub struct RefreshForm {
    api_key: Option<String>,
    #[serde(rename = "_nonce")]
    nonce: Option<String>,
}

#[derive(thiserror::Error)]
pub enum RefreshError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
    #[error("Invalid security token")]
    InvalidNonce,
    #[error("API key is required")]
    MissingKey,
    #[error(transparent)]
    Listing(#[from] ListRefreshError),
}

impl Debug for RefreshError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for RefreshError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::UnknownProvider(_) => StatusCode::NOT_FOUND,
            Self::InvalidNonce => StatusCode::FORBIDDEN,
            Self::MissingKey => StatusCode::BAD_REQUEST,
            Self::Listing(ListRefreshError::Provider(ProviderError::Credential(_))) => {
                StatusCode::BAD_REQUEST
            }
            Self::Listing(ListRefreshError::Provider(_)) => StatusCode::BAD_GATEWAY,
            Self::Listing(ListRefreshError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            Self::Listing(ListRefreshError::Store(_)) => SERVER_ERROR.to_string(),
            e => e.to_string(),
        };
        HttpResponse::build(self.status_code()).json(JsonEnvelope::err(message))
    }
}

/// `POST /admin/refresh/{provider}`
///
/// List the audiences (MailChimp), forms (Kit) or groups (MailerLite) that
/// `api_key` can see, so the operator can pick a default before saving the
/// key. The stored key is not changed.
#[tracing::instrument(name = "Refreshing lists", skip(form, settings, clients, nonces))]
pub async fn refresh_lists(
    provider: web::Path<String>,
    form: web::Form<RefreshForm>,
    settings: web::Data<SettingsStore>,
    clients: web::Data<ProviderClients>,
    nonces: web::Data<NonceIssuer>,
) -> Result<HttpResponse, RefreshError> {
    let provider = provider.into_inner();
    let client = Provider::parse(&provider)
        .and_then(|p| clients.get(p))
        .ok_or(RefreshError::UnknownProvider(provider))?;

    let RefreshForm { api_key, nonce } = form.into_inner();
    if !nonce
        .as_deref()
        .is_some_and(|n| nonces.verify(NonceAction::Admin, n))
    {
        return Err(RefreshError::InvalidNonce);
    }
    let api_key = api_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or(RefreshError::MissingKey)?;

    let lists = settings
        .refresh_list(client.as_ref(), Secret::new(api_key))
        .await?;
    Ok(HttpResponse::Ok().json(JsonEnvelope::ok(lists)))
}
