use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::web;
use actix_web::web::Data;
use actix_web::App;
use actix_web::HttpServer;
use actix_web_lab::middleware::from_fn;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_actix_web::TracingLogger;

use crate::authentication::reject_unauthorized_admins;
use crate::configuration::AdminSettings;
use crate::configuration::ApplicationSettings;
use crate::configuration::DatabaseSettings;
use crate::configuration::Settings;
use crate::configuration::SettingsBackend;
use crate::csrf::NonceIssuer;
use crate::dispatcher::SubscriptionDispatcher;
use crate::providers::ProviderClients;
use crate::renderer::FormRenderer;
use crate::routes::admin_settings;
use crate::routes::health_check;
use crate::routes::refresh_lists;
use crate::routes::save_settings;
use crate::routes::subscribe;
use crate::routes::subscribe_form;
use crate::routes::subscribe_widget;
use crate::settings::InMemoryOptionStore;
use crate::settings::OptionStore;
use crate::settings::PgOptionStore;
use crate::settings::SettingsStore;

/// Wrapper for actix's `Server` with access to the bound port. Not to be
/// confused with actix's `App`!
pub struct Application {
    /// Left private; use `get_port` to access
    port: u16,
    server: Server,
}

impl Application {
    /// Build the server with the option store named in the configuration
    pub async fn build(cfg: Settings) -> Result<Self, anyhow::Error> {
        let options: Arc<dyn OptionStore> = match cfg.settings_backend {
            SettingsBackend::Memory => {
                tracing::warn!("options are kept in memory and will be lost on restart");
                Arc::new(InMemoryOptionStore::new())
            }
            SettingsBackend::Postgres => {
                let pool = get_connection_pool(&cfg.database);
                Migrator::new(Path::new("./migrations"))
                    .await?
                    .run(&pool)
                    .await?;
                Arc::new(PgOptionStore::new(pool))
            }
        };
        Self::build_with_store(cfg, options).await
    }

    /// Build the server around an existing option store (e.g. a pre-seeded
    /// one in tests)
    pub async fn build_with_store(
        cfg: Settings,
        options: Arc<dyn OptionStore>,
    ) -> Result<Self, anyhow::Error> {
        // env-dependent host
        let addr = format!("{}:{}", cfg.application.host, cfg.application.port);
        let listener = TcpListener::bind(addr)?;
        // port 0 means the OS picked one
        let port = listener.local_addr()?.port();

        let clients = cfg.providers.clients()?;
        let server = run(listener, options, clients, cfg.application, cfg.admin)?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 { self.port }

    /// Because this consumes `self`, this should be the final function call (or
    /// passed to `tokio::spawn`)
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> { self.server.await }
}

/// `connect_lazy` only connects when the pool is used for the first time
pub fn get_connection_pool(db_cfg: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new().connect_lazy_with(db_cfg.connection())
}

/// The server is not responsible for binding to an address, it only listens to
/// an already bound address.
///
/// Declares all API endpoints.
pub fn run(
    listener: TcpListener,
    options: Arc<dyn OptionStore>,
    clients: ProviderClients,
    app_cfg: ApplicationSettings,
    admin: AdminSettings,
) -> Result<Server, anyhow::Error> {
    let settings = SettingsStore::new(options);
    let nonces = NonceIssuer::new(&app_cfg.hmac_secret)
        .map_err(|e| anyhow::anyhow!("Unusable hmac secret: {e}"))?;
    let renderer = FormRenderer::new(nonces.clone(), app_cfg.settings_page_url)?;
    let dispatcher = SubscriptionDispatcher::new(settings.clone(), clients.clone());

    // `Data` is externally an `Arc` (for sharing/cloning), internally a `HashMap`
    // (for wrapping arbitrary types)
    let settings = Data::new(settings);
    let nonces = Data::new(nonces);
    let renderer = Data::new(renderer);
    let dispatcher = Data::new(dispatcher);
    let clients = Data::new(clients);
    let admin = Data::new(admin);

    // one `App` per worker, hence the closure and the clones
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/subscriptions", web::post().to(subscribe))
            .route("/subscribe-form", web::get().to(subscribe_form))
            .route("/widgets/subscribe", web::get().to(subscribe_widget))
            .service(
                web::scope("/admin")
                    .wrap(from_fn(reject_unauthorized_admins))
                    .route("/settings", web::get().to(admin_settings))
                    .route("/settings", web::post().to(save_settings))
                    .route("/refresh/{provider}", web::post().to(refresh_lists)),
            )
            .app_data(settings.clone())
            .app_data(nonces.clone())
            .app_data(renderer.clone())
            .app_data(dispatcher.clone())
            .app_data(clients.clone())
            .app_data(admin.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
