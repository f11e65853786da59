//! Site options: which provider is active, API keys, default lists and the
//! custom form configuration. Everything is a string under a fixed key; this
//! module gives those strings types.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::Secret;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::domain::Provider;
use crate::providers::ListEntry;
use crate::providers::ProviderClient;
use crate::providers::ProviderError;
use crate::routes::error_chain_fmt;
use crate::utils::parse_flag;

mod memory;
mod postgres;
mod swap;

pub use memory::InMemoryOptionStore;
pub use postgres::PgOptionStore;
use swap::CredentialSwap;

/// String key -> string value persistence
#[async_trait]
pub trait OptionStore: Send + Sync {
    async fn get(
        &self,
        key: &str,
    ) -> Result<Option<String>, anyhow::Error>;

    async fn set(
        &self,
        key: &str,
        value: &str,
    ) -> Result<(), anyhow::Error>;

    async fn delete(
        &self,
        key: &str,
    ) -> Result<(), anyhow::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKey {
    SubscriptionService,
    MailChimpToken,
    MailChimpList,
    MailChimpDoubleOptIn,
    KitToken,
    KitForm,
    MailerLiteToken,
    MailerLiteGroup,
    CustomFormAction,
    CustomEmailName,
    CustomNameField,
    CustomHiddenFields,
    PrivacyText,
}

impl OptionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKey::SubscriptionService => "subscription_service",
            OptionKey::MailChimpToken => "mailchimp_token",
            OptionKey::MailChimpList => "mailchimp_list",
            OptionKey::MailChimpDoubleOptIn => "mailchimp_double_optin",
            OptionKey::KitToken => "kit_token",
            OptionKey::KitForm => "kit_form",
            OptionKey::MailerLiteToken => "mailerlite_token",
            OptionKey::MailerLiteGroup => "mailerlite_group",
            OptionKey::CustomFormAction => "custom_form_action",
            OptionKey::CustomEmailName => "custom_email_name",
            OptionKey::CustomNameField => "custom_name_field",
            OptionKey::CustomHiddenFields => "custom_hidden_fields",
            OptionKey::PrivacyText => "privacy_text",
        }
    }

    /// Where the API key of a remote provider is kept
    pub fn token(provider: Provider) -> Option<Self> {
        match provider {
            Provider::MailChimp => Some(OptionKey::MailChimpToken),
            Provider::Kit => Some(OptionKey::KitToken),
            Provider::MailerLite => Some(OptionKey::MailerLiteToken),
            Provider::Custom => None,
        }
    }

    /// Where the list/form/group used by default is kept
    pub fn default_list(provider: Provider) -> Option<Self> {
        match provider {
            Provider::MailChimp => Some(OptionKey::MailChimpList),
            Provider::Kit => Some(OptionKey::KitForm),
            Provider::MailerLite => Some(OptionKey::MailerLiteGroup),
            Provider::Custom => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HiddenField {
    pub name: String,
    pub value: String,
}

/// Parse `name=value` lines. Blank lines and lines without a name are
/// skipped.
pub fn parse_hidden_fields(raw: &str) -> Vec<HiddenField> {
    raw.lines()
        .filter_map(|line| line.split_once('='))
        .map(|(name, value)| (name.trim(), value.trim()))
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| HiddenField {
            name: name.to_string(),
            value: value.to_string(),
        })
        .collect()
}

/// How a `Custom` form posts to the operator's endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CustomFormSettings {
    pub action: Option<String>,
    pub email_field: String,
    pub name_field: String,
    pub hidden_fields: Vec<HiddenField>,
}

impl Default for CustomFormSettings {
    fn default() -> Self {
        Self {
            action: None,
            email_field: "email".to_string(),
            name_field: "name".to_string(),
            hidden_fields: vec![],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProviderDefaults {
    pub has_credential: bool,
    pub list: Option<String>,
}

/// Snapshot of everything the renderer needs to fill in a form
#[derive(Debug, Clone)]
pub struct FormDefaults {
    pub active_provider: Provider,
    pub providers: HashMap<Provider, ProviderDefaults>,
    pub custom: CustomFormSettings,
    pub privacy_text: Option<String>,
}

impl FormDefaults {
    pub fn for_provider(
        &self,
        provider: Provider,
    ) -> ProviderDefaults {
        self.providers.get(&provider).cloned().unwrap_or_default()
    }
}

/// Stored options, as returned to the admin
#[derive(Debug, Serialize)]
pub struct StoredSettings {
    pub subscription_service: String,
    pub mailchimp_token: String,
    pub mailchimp_list: String,
    pub mailchimp_double_optin: bool,
    pub kit_token: String,
    pub kit_form: String,
    pub mailerlite_token: String,
    pub mailerlite_group: String,
    pub custom_form_action: String,
    pub custom_email_name: String,
    pub custom_name_field: String,
    pub custom_hidden_fields: String,
    pub privacy_text: String,
}

/// A submitted admin settings form. Absent fields are left untouched,
/// except for the double opt-in checkbox, which browsers omit when it is
/// unticked.
#[derive(Debug, Default, Deserialize)]
pub struct SettingsUpdate {
    pub subscription_service: Option<String>,
    pub mailchimp_token: Option<String>,
    pub mailchimp_list: Option<String>,
    pub mailchimp_double_optin: Option<String>,
    pub kit_token: Option<String>,
    pub kit_form: Option<String>,
    pub mailerlite_token: Option<String>,
    pub mailerlite_group: Option<String>,
    pub custom_form_action: Option<String>,
    pub custom_email_name: Option<String>,
    pub custom_name_field: Option<String>,
    pub custom_hidden_fields: Option<String>,
    pub privacy_text: Option<String>,
}

#[derive(thiserror::Error)]
pub enum SettingsError {
    #[error("Unknown subscription service: {0}")]
    UnknownService(String),
    #[error("Form action must be an absolute http(s) URL")]
    InvalidFormAction(String),
    #[error("Failed to access the option store")]
    Store(#[from] anyhow::Error),
}

impl Debug for SettingsError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(thiserror::Error)]
pub enum ListRefreshError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Failed to access the option store")]
    Store(#[from] anyhow::Error),
}

impl Debug for ListRefreshError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

fn validate_form_action(action: &str) -> Result<(), SettingsError> {
    let action = action.trim();
    if action.is_empty() {
        return Ok(());
    }
    match reqwest::Url::parse(action) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(SettingsError::InvalidFormAction(action.to_string())),
    }
}

/// Typed access to the `OptionStore`
#[derive(Clone)]
pub struct SettingsStore {
    options: Arc<dyn OptionStore>,
    /// One credential probe at a time, so concurrent refreshes cannot
    /// restore each other's probe key. Held by `CredentialSwap` until the
    /// stored key is back.
    refresh_lock: Arc<Mutex<()>>,
}

impl SettingsStore {
    pub fn new(options: Arc<dyn OptionStore>) -> Self {
        Self {
            options,
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn get(
        &self,
        key: OptionKey,
        default: &str,
    ) -> Result<String, anyhow::Error> {
        Ok(self
            .options
            .get(key.as_str())
            .await?
            .unwrap_or_else(|| default.to_string()))
    }

    pub async fn set(
        &self,
        key: OptionKey,
        value: &str,
    ) -> Result<(), anyhow::Error> {
        self.options.set(key.as_str(), value).await
    }

    /// Stored value, with empty strings treated as unset
    async fn non_empty(
        &self,
        key: OptionKey,
    ) -> Result<Option<String>, anyhow::Error> {
        Ok(self
            .options
            .get(key.as_str())
            .await?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    pub async fn active_provider(&self) -> Result<Provider, anyhow::Error> {
        let stored = self.non_empty(OptionKey::SubscriptionService).await?;
        Ok(Provider::resolve(stored.as_deref()))
    }

    pub async fn credential(
        &self,
        provider: Provider,
    ) -> Result<Option<Secret<String>>, anyhow::Error> {
        match OptionKey::token(provider) {
            Some(key) => Ok(self.non_empty(key).await?.map(Secret::new)),
            None => Ok(None),
        }
    }

    pub async fn default_list(
        &self,
        provider: Provider,
    ) -> Result<Option<String>, anyhow::Error> {
        match OptionKey::default_list(provider) {
            Some(key) => self.non_empty(key).await,
            None => Ok(None),
        }
    }

    pub async fn double_opt_in(&self) -> Result<bool, anyhow::Error> {
        Ok(self
            .non_empty(OptionKey::MailChimpDoubleOptIn)
            .await?
            .is_some_and(|v| parse_flag(&v)))
    }

    pub async fn custom_form(&self) -> Result<CustomFormSettings, anyhow::Error> {
        let defaults = CustomFormSettings::default();
        Ok(CustomFormSettings {
            action: self.non_empty(OptionKey::CustomFormAction).await?,
            email_field: self
                .non_empty(OptionKey::CustomEmailName)
                .await?
                .unwrap_or(defaults.email_field),
            name_field: self
                .non_empty(OptionKey::CustomNameField)
                .await?
                .unwrap_or(defaults.name_field),
            hidden_fields: self
                .non_empty(OptionKey::CustomHiddenFields)
                .await?
                .map(|raw| parse_hidden_fields(&raw))
                .unwrap_or_default(),
        })
    }

    pub async fn privacy_text(&self) -> Result<Option<String>, anyhow::Error> {
        self.non_empty(OptionKey::PrivacyText).await
    }

    #[tracing::instrument(name = "Loading form defaults", skip(self))]
    pub async fn form_defaults(&self) -> Result<FormDefaults, anyhow::Error> {
        let mut providers = HashMap::new();
        for provider in Provider::ALL.into_iter().filter(Provider::is_remote) {
            providers.insert(
                provider,
                ProviderDefaults {
                    has_credential: self.credential(provider).await?.is_some(),
                    list: self.default_list(provider).await?,
                },
            );
        }
        Ok(FormDefaults {
            active_provider: self.active_provider().await?,
            providers,
            custom: self.custom_form().await?,
            privacy_text: self.privacy_text().await?,
        })
    }

    pub async fn stored(&self) -> Result<StoredSettings, anyhow::Error> {
        let custom = CustomFormSettings::default();
        Ok(StoredSettings {
            subscription_service: self.active_provider().await?.to_string(),
            mailchimp_token: self.get(OptionKey::MailChimpToken, "").await?,
            mailchimp_list: self.get(OptionKey::MailChimpList, "").await?,
            mailchimp_double_optin: self.double_opt_in().await?,
            kit_token: self.get(OptionKey::KitToken, "").await?,
            kit_form: self.get(OptionKey::KitForm, "").await?,
            mailerlite_token: self.get(OptionKey::MailerLiteToken, "").await?,
            mailerlite_group: self.get(OptionKey::MailerLiteGroup, "").await?,
            custom_form_action: self.get(OptionKey::CustomFormAction, "").await?,
            custom_email_name: self
                .get(OptionKey::CustomEmailName, &custom.email_field)
                .await?,
            custom_name_field: self
                .get(OptionKey::CustomNameField, &custom.name_field)
                .await?,
            custom_hidden_fields: self.get(OptionKey::CustomHiddenFields, "").await?,
            privacy_text: self.get(OptionKey::PrivacyText, "").await?,
        })
    }

    /// Persist a submitted settings form. Nothing is written if any field is
    /// invalid.
    #[tracing::instrument(name = "Saving settings", skip_all)]
    pub async fn apply(
        &self,
        update: SettingsUpdate,
    ) -> Result<(), SettingsError> {
        let service = match update.subscription_service.as_deref().map(str::trim) {
            Some(s) => Some(
                Provider::parse(s)
                    .ok_or_else(|| SettingsError::UnknownService(s.to_string()))?
                    .as_str(),
            ),
            None => None,
        };
        if let Some(action) = &update.custom_form_action {
            validate_form_action(action)?;
        }

        let double_opt_in = update
            .mailchimp_double_optin
            .as_deref()
            .is_some_and(parse_flag);
        let writes = [
            (OptionKey::MailChimpToken, update.mailchimp_token),
            (OptionKey::MailChimpList, update.mailchimp_list),
            (OptionKey::KitToken, update.kit_token),
            (OptionKey::KitForm, update.kit_form),
            (OptionKey::MailerLiteToken, update.mailerlite_token),
            (OptionKey::MailerLiteGroup, update.mailerlite_group),
            (OptionKey::CustomFormAction, update.custom_form_action),
            (OptionKey::CustomEmailName, update.custom_email_name),
            (OptionKey::CustomNameField, update.custom_name_field),
            (OptionKey::CustomHiddenFields, update.custom_hidden_fields),
            (OptionKey::PrivacyText, update.privacy_text),
        ];

        if let Some(service) = service {
            self.set(OptionKey::SubscriptionService, service).await?;
        }
        for (key, value) in writes {
            if let Some(value) = value {
                self.set(key, value.trim()).await?;
            }
        }
        self.set(
            OptionKey::MailChimpDoubleOptIn,
            match double_opt_in {
                true => "1",
                false => "0",
            },
        )
        .await?;
        Ok(())
    }

    /// List the audiences visible to `probe`, without changing the stored
    /// credential. The probe is stored for the duration of the call and the
    /// provider is queried with the key read back from the store.
    #[tracing::instrument(
        name = "Refreshing provider lists",
        skip_all,
        fields(provider = %client.provider())
    )]
    pub async fn refresh_list(
        &self,
        client: &dyn ProviderClient,
        probe: Secret<String>,
    ) -> Result<Vec<ListEntry>, ListRefreshError> {
        let provider = client.provider();
        let key = OptionKey::token(provider).ok_or(ProviderError::Unsupported(provider))?;

        let guard = self.refresh_lock.clone().lock_owned().await;
        let swap = CredentialSwap::begin(guard, self.options.clone(), key, &probe).await?;
        let listed = match self.credential(provider).await {
            Ok(Some(credential)) => client.list(&credential).await.map_err(ListRefreshError::from),
            Ok(None) => Err(ProviderError::Credential("API key is required".to_string()).into()),
            Err(e) => Err(e.into()),
        };
        swap.restore().await?;
        listed
    }
}
