use std::path::Path;
use std::sync::Arc;

use argon2::password_hash::SaltString;
use argon2::Argon2;
use argon2::PasswordHasher;
use once_cell::sync::Lazy;
use opt_in_forms::configuration::get_configuration;
use opt_in_forms::configuration::DatabaseSettings;
use opt_in_forms::csrf::NonceAction;
use opt_in_forms::csrf::NonceIssuer;
use opt_in_forms::settings::InMemoryOptionStore;
use opt_in_forms::settings::OptionStore;
use opt_in_forms::startup::Application;
use opt_in_forms::telemetry::get_subscriber;
use opt_in_forms::telemetry::init_subscriber;
use rand::distributions::Alphanumeric;
use rand::Rng;
use secrecy::Secret;
use sqlx::migrate::Migrator;
use sqlx::Connection;
use sqlx::Executor;
use sqlx::PgConnection;
use sqlx::PgPool;
use wiremock::MockServer;

/// Init the tracing subscriber once only.
///
/// To opt in to verbose logging, use the env var `TEST_LOG`:
///
/// ```sh
///      TEST_LOG=true cargo test [test_name] | bunyan
/// ```
static TRACING: Lazy<()> = Lazy::new(|| {
    // the two sinks have different types, hence the duplicated arms
    match std::env::var("TEST_LOG") {
        Ok(_) => {
            let subscriber = get_subscriber("test", "debug", std::io::stdout);
            init_subscriber(subscriber).unwrap();
        }
        Err(_) => {
            let subscriber = get_subscriber("test", "debug", std::io::sink);
            init_subscriber(subscriber).unwrap();
        }
    };
});

pub struct TestAdmin {
    pub username: String,
    pub password: String,
}

impl TestAdmin {
    fn generate() -> Self {
        Self {
            username: "admin".to_string(),
            password: "correct horse battery staple".to_string(),
        }
    }

    fn password_hash(&self) -> String {
        let salt = SaltString::generate(&mut rand::thread_rng());
        Argon2::default()
            .hash_password(self.password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }
}

/// Create a fresh, migrated database named after `cfg.database_name` (the
/// caller randomises it) and connect to it
pub async fn configure_database(cfg: &DatabaseSettings) -> PgPool {
    // connect to the instance, not to a db
    let mut conn = PgConnection::connect_with(&cfg.connection_without_db())
        .await
        .expect("postgres must be running, see configuration/base.yaml");
    conn.execute(format!(r#"CREATE DATABASE "{}";"#, cfg.database_name).as_str())
        .await
        .unwrap();

    let pool = PgPool::connect_with(cfg.connection()).await.unwrap();
    Migrator::new(Path::new("./migrations"))
        .await
        .unwrap()
        .run(&pool)
        .await
        .expect("failed to migrate");
    pool
}

/// Database settings from the config files, pointing at a database no other
/// test uses
pub fn isolated_database() -> DatabaseSettings {
    let mut cfg = get_configuration().unwrap().database;
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    cfg.database_name = format!("opt_in_forms_test_{}", suffix.to_lowercase());
    cfg
}

pub struct TestApp {
    pub addr: String,
    pub port: u16,
    /// Shared with the running app, for seeding and inspecting options
    pub options: Arc<InMemoryOptionStore>,
    /// Stands in for MailChimp (`/mailchimp`), Kit (`/kit`) and MailerLite
    /// (`/mailerlite`)
    pub provider_server: MockServer,
    pub nonces: NonceIssuer,
    pub admin: TestAdmin,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub fn subscribe_nonce(&self) -> String { self.nonces.create(NonceAction::Subscribe) }

    pub fn admin_nonce(&self) -> String { self.nonces.create(NonceAction::Admin) }

    pub async fn set_option(
        &self,
        key: &str,
        value: &str,
    ) {
        self.options.set(key, value).await.unwrap();
    }

    pub async fn get_option(
        &self,
        key: &str,
    ) -> Option<String> {
        self.options.get(key).await.unwrap()
    }

    /// `POST /subscriptions`, form-encoded
    pub async fn post_subscriptions(
        &self,
        body: &[(&str, &str)],
    ) -> reqwest::Response {
        self.api_client
            .post(format!("{}/subscriptions", self.addr))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(serde_urlencoded::to_string(body).unwrap())
            .send()
            .await
            .expect("execute request")
    }

    pub async fn get_subscribe_form(
        &self,
        query: &[(&str, &str)],
    ) -> reqwest::Response {
        self.api_client
            .get(format!("{}/subscribe-form", self.addr))
            .query(query)
            .send()
            .await
            .expect("execute request")
    }

    pub async fn get_subscribe_widget(&self) -> reqwest::Response {
        self.api_client
            .get(format!("{}/widgets/subscribe", self.addr))
            .send()
            .await
            .expect("execute request")
    }

    pub async fn get_admin_settings(&self) -> reqwest::Response {
        self.api_client
            .get(format!("{}/admin/settings", self.addr))
            .basic_auth(&self.admin.username, Some(&self.admin.password))
            .send()
            .await
            .expect("execute request")
    }

    pub async fn post_admin_settings(
        &self,
        body: &[(&str, &str)],
    ) -> reqwest::Response {
        self.api_client
            .post(format!("{}/admin/settings", self.addr))
            .basic_auth(&self.admin.username, Some(&self.admin.password))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(serde_urlencoded::to_string(body).unwrap())
            .send()
            .await
            .expect("execute request")
    }

    pub async fn post_refresh(
        &self,
        provider: &str,
        body: &[(&str, &str)],
    ) -> reqwest::Response {
        self.api_client
            .post(format!("{}/admin/refresh/{provider}", self.addr))
            .basic_auth(&self.admin.username, Some(&self.admin.password))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(serde_urlencoded::to_string(body).unwrap())
            .send()
            .await
            .expect("execute request")
    }
}

/// Pull the value of the hidden `name` input out of rendered markup
pub fn hidden_input(
    html: &str,
    name: &str,
) -> Option<String> {
    let marker = format!(r#"name="{name}" value=""#);
    let start = html.find(&marker)? + marker.len();
    let end = html[start..].find('"')?;
    Some(html[start..start + end].to_string())
}

/// Spawn the app with an empty option store
pub async fn spawn_app() -> TestApp { spawn_app_with(&[]).await }

/// Spawn the app on a random port, with `options` pre-seeded and all
/// providers pointed at a mock server.
pub async fn spawn_app_with(options: &[(&str, &str)]) -> TestApp {
    Lazy::force(&TRACING);

    let provider_server = MockServer::start().await;
    let admin = TestAdmin::generate();

    let cfg = {
        let mut cfg = get_configuration().unwrap();
        // port 0 is reserved by the OS; the server will be spawned on an address with a
        // random available port
        cfg.application.port = 0;
        cfg.providers.mailchimp_base_url = format!("{}/mailchimp", provider_server.uri());
        cfg.providers.kit_base_url = format!("{}/kit", provider_server.uri());
        cfg.providers.mailerlite_base_url = format!("{}/mailerlite", provider_server.uri());
        cfg.admin.username = admin.username.clone();
        cfg.admin.password_hash = Secret::new(admin.password_hash());
        cfg
    };

    let store = Arc::new(InMemoryOptionStore::with_options(
        options.iter().map(|(k, v)| (*k, *v)),
    ));
    let nonces = NonceIssuer::new(&cfg.application.hmac_secret).unwrap();
    let app = Application::build_with_store(cfg, store.clone())
        .await
        .unwrap();
    let port = app.get_port();
    tokio::spawn(app.run_until_stopped());

    TestApp {
        addr: format!("http://localhost:{port}"),
        port,
        options: store,
        provider_server,
        nonces,
        admin,
        api_client: reqwest::Client::new(),
    }
}
