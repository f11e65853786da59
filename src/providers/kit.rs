use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use secrecy::Secret;
use serde::Serialize;
use serde_json::Value;

use super::endpoint;
use super::parse_entries;
use super::read_json;
use super::ListEntry;
use super::ProviderClient;
use super::ProviderError;
use super::RawResponse;
use super::SubmitRequest;
use crate::domain::Provider;
use crate::domain::SubscriptionOutcome;

/// Kit.com (formerly ConvertKit) API v3 client. The API key travels in the
/// body or query string, not in a header.
pub struct KitClient {
    http_client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct SubscribeBody<'a> {
    api_key: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
}

impl KitClient {
    pub fn new(
        http_client: Client,
        base_url: String,
    ) -> Self {
        Self {
            http_client,
            base_url,
        }
    }
}

#[async_trait]
impl ProviderClient for KitClient {
    fn provider(&self) -> Provider { Provider::Kit }

    #[tracing::instrument(
        name = "Subscribing to Kit form",
        skip_all,
        fields(form = %request.list)
    )]
    async fn submit(
        &self,
        api_key: &Secret<String>,
        request: SubmitRequest<'_>,
    ) -> Result<RawResponse, ProviderError> {
        let url = endpoint(
            &self.base_url,
            &format!("forms/{}/subscribe", urlencoding::encode(request.list.as_ref())),
        );
        let body = SubscribeBody {
            api_key: api_key.expose_secret(),
            email: request.email.as_ref(),
            first_name: request.name.map(|n| n.as_ref()),
        };
        let response = self
            .http_client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                provider: Provider::Kit,
                source,
            })?;
        read_json(Provider::Kit, response).await
    }

    #[tracing::instrument(name = "Listing Kit forms", skip_all)]
    async fn list(
        &self,
        api_key: &Secret<String>,
    ) -> Result<Vec<ListEntry>, ProviderError> {
        let response = self
            .http_client
            .get(endpoint(&self.base_url, "forms"))
            .query(&[("api_key", api_key.expose_secret())])
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                provider: Provider::Kit,
                source,
            })?;
        let raw = read_json(Provider::Kit, response).await?;

        if (200..300).contains(&raw.status) {
            if let Some(forms) = raw.body.get("forms").filter(|f| f.is_array()) {
                return parse_entries(Provider::Kit, raw.status, forms.clone());
            }
        }
        let message = raw
            .body
            .get("message")
            .or_else(|| raw.body.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("Unable to fetch Kit.com forms. Check your API key.")
            .to_string();
        Err(ProviderError::Api {
            status: raw.status,
            message,
        })
    }
}

/// Map a "subscribe to form" response to an outcome. Fields are read one by
/// one, so a mistyped field only loses itself.
pub fn interpret(body: &Value) -> SubscriptionOutcome {
    if let Some(subscription) = body.get("subscription").filter(|s| !s.is_null()) {
        return match subscription.get("state").and_then(Value::as_str) {
            Some("active") => SubscriptionOutcome::already_subscribed(),
            Some("inactive") => SubscriptionOutcome::Success(
                "You are already subscribed, confirm your subscription by email.".to_string(),
            ),
            Some("cancelled") => SubscriptionOutcome::Success(
                "You have successfully subscribed, confirm your subscription by email."
                    .to_string(),
            ),
            _ => SubscriptionOutcome::subscribed(),
        };
    }
    match body.get("error") {
        None | Some(Value::Null) => SubscriptionOutcome::error(crate::domain::GENERIC_FAILURE),
        Some(Value::String(error)) => SubscriptionOutcome::Error(error.clone()),
        Some(error) => SubscriptionOutcome::Error(error.to_string()),
    }
}
