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

const PENDING_CONFIRMATION: &str =
    "You have successfully subscribed. Confirm the subscription in your mailbox.";

/// MailChimp Marketing API v3 client
pub struct MailChimpClient {
    http_client: Client,
    /// e.g. `https://{dc}.api.mailchimp.com/3.0`
    base_url: String,
}

#[derive(Serialize)]
struct MergeFields<'a> {
    #[serde(rename = "FNAME")]
    fname: &'a str,
}

#[derive(Serialize)]
struct AddMemberBody<'a> {
    email_address: &'a str,
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    merge_fields: Option<MergeFields<'a>>,
}

impl MailChimpClient {
    pub fn new(
        http_client: Client,
        base_url: String,
    ) -> Self {
        Self {
            http_client,
            base_url,
        }
    }

    /// MailChimp keys end with the data centre they belong to (`...-us6`);
    /// the API host is derived from it.
    fn api_root(
        &self,
        api_key: &Secret<String>,
    ) -> Result<String, ProviderError> {
        if !self.base_url.contains("{dc}") {
            return Ok(self.base_url.clone());
        }
        let dc = api_key
            .expose_secret()
            .rsplit_once('-')
            .map(|(_, dc)| dc.trim())
            .filter(|dc| !dc.is_empty())
            .ok_or_else(|| {
                ProviderError::Credential(
                    "MailChimp API key is missing its data centre suffix.".to_string(),
                )
            })?;
        Ok(self.base_url.replace("{dc}", dc))
    }
}

#[async_trait]
impl ProviderClient for MailChimpClient {
    fn provider(&self) -> Provider { Provider::MailChimp }

    #[tracing::instrument(
        name = "Adding member to MailChimp audience",
        skip_all,
        fields(list = %request.list)
    )]
    async fn submit(
        &self,
        api_key: &Secret<String>,
        request: SubmitRequest<'_>,
    ) -> Result<RawResponse, ProviderError> {
        let url = endpoint(
            &self.api_root(api_key)?,
            &format!("lists/{}/members", urlencoding::encode(request.list.as_ref())),
        );
        let body = AddMemberBody {
            email_address: request.email.as_ref(),
            status: match request.double_opt_in {
                true => "pending",
                false => "subscribed",
            },
            merge_fields: request.name.map(|n| MergeFields { fname: n.as_ref() }),
        };
        let response = self
            .http_client
            .post(url)
            .basic_auth("apikey", Some(api_key.expose_secret()))
            .json(&body)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                provider: Provider::MailChimp,
                source,
            })?;
        read_json(Provider::MailChimp, response).await
    }

    #[tracing::instrument(name = "Listing MailChimp audiences", skip_all)]
    async fn list(
        &self,
        api_key: &Secret<String>,
    ) -> Result<Vec<ListEntry>, ProviderError> {
        let url = endpoint(&self.api_root(api_key)?, "lists");
        let response = self
            .http_client
            .get(url)
            .basic_auth("apikey", Some(api_key.expose_secret()))
            .query(&[
                ("sort_field", "date_created"),
                ("sort_dir", "DESC"),
                ("count", "1000"),
            ])
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                provider: Provider::MailChimp,
                source,
            })?;
        let raw = read_json(Provider::MailChimp, response).await?;

        if (200..300).contains(&raw.status) {
            if let Some(lists) = raw.body.get("lists").filter(|l| l.is_array()) {
                return parse_entries(Provider::MailChimp, raw.status, lists.clone());
            }
        }
        Err(ProviderError::Api {
            status: raw.status,
            message: list_error_message(&raw.body),
        })
    }
}

/// MailChimp errors follow RFC 7807 ("problem details")
fn list_error_message(body: &Value) -> String {
    let text = |k: &str| body.get(k).and_then(Value::as_str);
    match (text("type"), text("title")) {
        (Some(kind), Some(title)) => {
            let mut message = format!("{kind}: {title}");
            if let Some(detail) = text("detail") {
                message.push_str(&format!(" - {detail}"));
            }
            message
        }
        _ => "Unable to fetch MailChimp lists. Check your API key.".to_string(),
    }
}

/// Map a "add list member" response to an outcome. Fields are read one by
/// one, so a mistyped field only loses itself.
pub fn interpret(body: &Value) -> SubscriptionOutcome {
    let text = |k: &str| body.get(k).and_then(Value::as_str);
    // success bodies carry the member status as a string, problem bodies carry
    // the HTTP status as a number
    let code = body.get("status").and_then(Value::as_u64);
    match (text("status"), text("title")) {
        (Some("subscribed"), _) => SubscriptionOutcome::subscribed(),
        (Some("pending"), _) => SubscriptionOutcome::Success(PENDING_CONFIRMATION.to_string()),
        (_, Some("Member Exists")) => SubscriptionOutcome::already_subscribed(),
        _ => match (code, text("detail")) {
            (Some(code), Some(detail)) if code >= 400 => SubscriptionOutcome::error(detail),
            _ => SubscriptionOutcome::Error(body.to_string()),
        },
    }
}
