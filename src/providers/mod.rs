//! Clients for the remote mailing-list APIs.
//!
//! Each client turns a uniform `(list, email, name)` submission into one
//! provider-specific REST call and hands back the undecoded outcome
//! (`RawResponse`); deciding what that response *means* is left to the pure
//! `interpret` function of each provider module, so it can be tested without
//! a network.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::Secret;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::configuration::ProviderSettings;
use crate::domain::ListReference;
use crate::domain::Provider;
use crate::domain::SubscriberEmail;
use crate::domain::SubscriberName;
use crate::domain::SubscriptionOutcome;
use crate::domain::GENERIC_FAILURE;
use crate::routes::error_chain_fmt;

pub mod kit;
pub mod mailchimp;
pub mod mailerlite;

pub use kit::KitClient;
pub use mailchimp::MailChimpClient;
pub use mailerlite::MailerLiteClient;

/// One list/form/group, as offered in the admin "refresh" dropdowns
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ListEntry {
    pub id: String,
    pub name: String,
}

/// Providers disagree on whether ids are strings or numbers
#[derive(Deserialize)]
struct RawListEntry {
    id: Value,
    name: String,
}

impl From<RawListEntry> for ListEntry {
    fn from(value: RawListEntry) -> Self {
        let id = match value.id {
            Value::String(s) => s,
            other => other.to_string(),
        };
        Self {
            id,
            name: value.name,
        }
    }
}

/// HTTP status plus decoded JSON body, whatever the status was. Error
/// statuses are kept because some of them carry meaning (e.g. "Member
/// Exists").
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

/// Everything a client needs to add one subscriber
pub struct SubmitRequest<'a> {
    pub list: &'a ListReference,
    pub email: &'a SubscriberEmail,
    pub name: Option<&'a SubscriberName>,
    /// Only honoured by MailChimp
    pub double_opt_in: bool,
}

#[derive(thiserror::Error)]
pub enum ProviderError {
    #[error("Failed to reach {provider}")]
    Transport {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("{provider} returned a malformed response (HTTP {status})")]
    Malformed {
        provider: Provider,
        status: u16,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Credential(String),
    #[error("{0} has no server-side API")]
    Unsupported(Provider),
}

impl Debug for ProviderError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// The capability every remote provider offers: add a subscriber, and list
/// the audiences an API key can see.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn submit(
        &self,
        api_key: &Secret<String>,
        request: SubmitRequest<'_>,
    ) -> Result<RawResponse, ProviderError>;

    async fn list(
        &self,
        api_key: &Secret<String>,
    ) -> Result<Vec<ListEntry>, ProviderError>;
}

/// Decode a response body as JSON, keeping the status. An empty body decodes
/// to `null`.
async fn read_json(
    provider: Provider,
    response: reqwest::Response,
) -> Result<RawResponse, ProviderError> {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|source| ProviderError::Transport { provider, source })?;
    if text.trim().is_empty() {
        return Ok(RawResponse {
            status,
            body: Value::Null,
        });
    }
    let body = serde_json::from_str(&text).map_err(|source| ProviderError::Malformed {
        provider,
        status,
        source,
    })?;
    Ok(RawResponse { status, body })
}

fn parse_entries(
    provider: Provider,
    status: u16,
    entries: Value,
) -> Result<Vec<ListEntry>, ProviderError> {
    let entries: Vec<RawListEntry> =
        serde_json::from_value(entries).map_err(|source| ProviderError::Malformed {
            provider,
            status,
            source,
        })?;
    Ok(entries.into_iter().map(ListEntry::from).collect())
}

/// All remote clients, keyed by provider. `Custom` has none.
///
/// Establishing a HTTP connection is expensive, so a single `Client` (which
/// is an `Arc` internally) is shared by all of them.
#[derive(Clone)]
pub struct ProviderClients {
    mailchimp: Arc<dyn ProviderClient>,
    kit: Arc<dyn ProviderClient>,
    mailerlite: Arc<dyn ProviderClient>,
}

impl ProviderClients {
    pub fn new(cfg: &ProviderSettings) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(cfg.timeout()).build()?;
        Ok(Self::from_parts(
            Arc::new(MailChimpClient::new(
                http_client.clone(),
                cfg.mailchimp_base_url.clone(),
            )),
            Arc::new(KitClient::new(
                http_client.clone(),
                cfg.kit_base_url.clone(),
            )),
            Arc::new(MailerLiteClient::new(
                http_client,
                cfg.mailerlite_base_url.clone(),
            )),
        ))
    }

    /// Assemble from arbitrary implementations (e.g. fakes)
    pub fn from_parts(
        mailchimp: Arc<dyn ProviderClient>,
        kit: Arc<dyn ProviderClient>,
        mailerlite: Arc<dyn ProviderClient>,
    ) -> Self {
        Self {
            mailchimp,
            kit,
            mailerlite,
        }
    }

    pub fn get(
        &self,
        provider: Provider,
    ) -> Option<Arc<dyn ProviderClient>> {
        match provider {
            Provider::MailChimp => Some(self.mailchimp.clone()),
            Provider::Kit => Some(self.kit.clone()),
            Provider::MailerLite => Some(self.mailerlite.clone()),
            Provider::Custom => None,
        }
    }
}

/// Map a submission response to an outcome, using the rules of whichever
/// provider produced it
pub fn interpret(
    provider: Provider,
    body: &Value,
) -> SubscriptionOutcome {
    match provider {
        Provider::MailChimp => mailchimp::interpret(body),
        Provider::Kit => kit::interpret(body),
        Provider::MailerLite => mailerlite::interpret(body),
        Provider::Custom => SubscriptionOutcome::error(GENERIC_FAILURE),
    }
}

/// Join a base url and a path, tolerating a trailing slash on the former
fn endpoint(
    base_url: &str,
    path: &str,
) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}
