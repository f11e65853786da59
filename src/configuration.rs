use std::env;
use std::env::current_dir;
use std::fmt::Display;
use std::time::Duration;

use config::Config;
use config::ConfigError;
use secrecy::ExposeSecret;
use secrecy::Secret;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::postgres::PgConnectOptions;

use crate::providers::ProviderClients;

/// Global configuration, loaded from `configuration/*.yaml`. See
/// `get_configuration`.
#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    /// Where site options (service, tokens, default lists) are kept
    pub settings_backend: SettingsBackend,
    pub providers: ProviderSettings,
    pub admin: AdminSettings,
}

/// Server configuration
#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    /// Should be localhost on dev machine, 0.0.0.0 on prod
    pub host: String,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,

    /// Key for signing form nonces
    pub hmac_secret: Secret<String>,

    /// Linked from the warnings shown in place of a misconfigured form
    pub settings_page_url: String,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SettingsBackend {
    /// Options live in process memory and are lost on restart
    Memory,
    Postgres,
}

/// Database configuration, only used with `SettingsBackend::Postgres`
#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: Secret<String>,
    pub host: String,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub database_name: String,

    /// Should be `true` in production.
    pub require_ssl: bool,
}

impl DatabaseSettings {
    /// Return connection to a named database (declared in config file). The db
    /// password is concealed.
    pub fn connection(&self) -> PgConnectOptions {
        self.connection_without_db().database(&self.database_name)
    }

    /// Return connection to the Postgres instance (instead of a specific db),
    /// i.e. `database_name` is unset.
    pub fn connection_without_db(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .username(&self.username)
            .password(self.password.expose_secret())
            .host(&self.host)
            .port(self.port)
            .ssl_mode(match self.require_ssl {
                true => sqlx::postgres::PgSslMode::Require,
                false => sqlx::postgres::PgSslMode::Prefer,
            })
    }
}

/// Remote API endpoints. Overridden in tests to point at mock servers.
#[derive(Deserialize, Clone)]
pub struct ProviderSettings {
    /// May contain a `{dc}` placeholder, filled in with the data centre
    /// suffix of the API key (`...-us6` -> `us6`)
    pub mailchimp_base_url: String,
    pub kit_base_url: String,
    pub mailerlite_base_url: String,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

impl ProviderSettings {
    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_milliseconds) }

    /// Build one client per remote provider, sharing a single connection pool
    pub fn clients(&self) -> Result<ProviderClients, reqwest::Error> {
        ProviderClients::new(self)
    }
}

/// Credentials for the admin endpoints (HTTP Basic auth)
#[derive(Deserialize, Clone)]
pub struct AdminSettings {
    pub username: String,
    /// Argon2 hash in PHC string format
    pub password_hash: Secret<String>,
}

pub enum Environment {
    Local,
    Production,
}

impl Display for Environment {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Environment::Local => "local",
                Environment::Production => "production",
            }
        )
    }
}

impl TryFrom<String> for Environment {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            e => Err(format!("Invalid: {e}")),
        }
    }
}

/// Load yaml configuration files at `<project_root>/configuration`, then
/// `APP_`-prefixed env vars.
///
/// All fields must be present, otherwise initialisation will fail
/// immediately, and the server will not start.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let cfg_dir = current_dir()
        .map_err(|e| ConfigError::Foreign(Box::new(e)))?
        .join("configuration");

    let env: Environment = env::var("APP_ENVIRONMENT")
        .unwrap_or("local".to_string())
        .try_into()
        .map_err(ConfigError::Message)?;

    let settings = Config::builder()
        .add_source(config::File::from(cfg_dir.join("base.yaml")))
        .add_source(config::File::from(cfg_dir.join(format!("{env}.yaml"))))
        .add_source(
            // env vars are -always- parsed as String, `serde-aux` is required to
            // parse other types.
            //
            // `APP_APPLICATION__PORT=5001` -> `Settings.application.port`
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
