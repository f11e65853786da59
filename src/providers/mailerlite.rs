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
use crate::domain::GENERIC_FAILURE;

const API_KEY_HEADER: &str = "X-MailerLite-ApiKey";

/// MailerLite API v2 client
pub struct MailerLiteClient {
    http_client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct AddSubscriberBody<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

impl MailerLiteClient {
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
impl ProviderClient for MailerLiteClient {
    fn provider(&self) -> Provider { Provider::MailerLite }

    #[tracing::instrument(
        name = "Adding subscriber to MailerLite group",
        skip_all,
        fields(group = %request.list)
    )]
    async fn submit(
        &self,
        api_key: &Secret<String>,
        request: SubmitRequest<'_>,
    ) -> Result<RawResponse, ProviderError> {
        let url = endpoint(
            &self.base_url,
            &format!("groups/{}/subscribers", urlencoding::encode(request.list.as_ref())),
        );
        let response = self
            .http_client
            .post(url)
            .header(API_KEY_HEADER, api_key.expose_secret())
            .json(&AddSubscriberBody {
                email: request.email.as_ref(),
                name: request.name.map(|n| n.as_ref()),
            })
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                provider: Provider::MailerLite,
                source,
            })?;
        read_json(Provider::MailerLite, response).await
    }

    #[tracing::instrument(name = "Listing MailerLite groups", skip_all)]
    async fn list(
        &self,
        api_key: &Secret<String>,
    ) -> Result<Vec<ListEntry>, ProviderError> {
        let response = self
            .http_client
            .get(endpoint(&self.base_url, "groups"))
            .header(API_KEY_HEADER, api_key.expose_secret())
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                provider: Provider::MailerLite,
                source,
            })?;
        let raw = read_json(Provider::MailerLite, response).await?;

        if (200..300).contains(&raw.status) && raw.body.is_array() {
            return parse_entries(Provider::MailerLite, raw.status, raw.body);
        }
        let message = error_message(&raw.body)
            .unwrap_or("Unable to fetch MailerLite groups. Check your API key.")
            .to_string();
        Err(ProviderError::Api {
            status: raw.status,
            message,
        })
    }
}

fn error_message(body: &Value) -> Option<&str> {
    body.get("error")?.get("message")?.as_str()
}

/// Map an "add subscriber to group" response to an outcome. Fields are read
/// one by one, so a mistyped field only loses itself.
pub fn interpret(body: &Value) -> SubscriptionOutcome {
    if body.get("id").is_some_and(|id| !id.is_null()) {
        return SubscriptionOutcome::subscribed();
    }
    let code = body
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(Value::as_u64);
    match (code, error_message(body)) {
        (Some(409), _) => SubscriptionOutcome::already_subscribed(),
        (_, Some(message)) => SubscriptionOutcome::error(message),
        _ => SubscriptionOutcome::error(GENERIC_FAILURE),
    }
}
