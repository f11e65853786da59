use std::fmt::Debug;

use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpResponse;
use actix_web::ResponseError;
use serde::Deserialize;

use super::error_chain_fmt;
use crate::csrf::NonceAction;
use crate::csrf::NonceIssuer;
use crate::dispatcher::SubscriptionDispatcher;
use crate::domain::OutcomeEnvelope;
use crate::domain::Submission;
use crate::domain::SubscriptionOutcome;
use crate::domain::SubscriptionRequest;
use crate::domain::ValidationError;

/// Fields posted by a hosted form. Field names match the markup.
#[derive(Deserialize)]
pub struct SubscribeForm {
    service: Option<String>,
    list_id: Option<String>,
    #[serde(rename = "USER")]
    user: Option<String>,
    #[serde(rename = "EMAIL")]
    email: Option<String>,
    #[serde(rename = "_nonce")]
    nonce: Option<String>,
}

impl From<SubscribeForm> for Submission {
    fn from(value: SubscribeForm) -> Self {
        Self {
            service: value.service,
            list_id: value.list_id,
            name: value.user,
            email: value.email,
        }
    }
}

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("Invalid security token")]
    InvalidNonce,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Debug for SubscribeError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidNonce => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(OutcomeEnvelope::from(
            SubscriptionOutcome::error(self.to_string()),
        ))
    }
}

/// `POST /subscriptions`
///
/// Forward a visitor to the provider named in the form. Whatever the provider
/// answers (including "already subscribed" and provider-side errors) is a 200
/// with the outcome in the body; only a bad nonce (403) or invalid input
/// (400) fail the request.
///
/// # Request example
///
/// ```sh
///     curl --data 'service=kit&list_id=123&EMAIL=john@foo.com&USER=John&_nonce=...' \
///         http://127.0.0.1:8000/subscriptions
/// ```
#[tracing::instrument(
    name = "Handling subscription",
    skip(form, dispatcher, nonces),
    fields(
        service = ?form.service,
        list_id = ?form.list_id,
    )
)]
pub async fn subscribe(
    form: web::Form<SubscribeForm>,
    dispatcher: web::Data<SubscriptionDispatcher>,
    nonces: web::Data<NonceIssuer>,
) -> Result<HttpResponse, SubscribeError> {
    let form = form.into_inner();
    let nonce_ok = form
        .nonce
        .as_deref()
        .is_some_and(|n| nonces.verify(NonceAction::Subscribe, n));
    if !nonce_ok {
        return Err(SubscribeError::InvalidNonce);
    }

    let request = SubscriptionRequest::try_from(Submission::from(form))?;
    let outcome = dispatcher.dispatch(request).await;
    Ok(HttpResponse::Ok().json(OutcomeEnvelope::from(outcome)))
}
