use opt_in_forms::configuration::get_configuration;
use opt_in_forms::startup::Application;
use opt_in_forms::telemetry::get_subscriber;
use opt_in_forms::telemetry::init_subscriber;

/// Initialise telemetry, load config, and start the server
#[tokio::main] // requires tokio features: macros, rt-multi-thread
async fn main() -> Result<(), anyhow::Error> {
    // only logs at the specified level and higher are emitted, unless RUST_LOG
    // says otherwise
    let subscriber = get_subscriber("opt-in-forms", "info", std::io::stdout);
    init_subscriber(subscriber)?;

    let cfg = get_configuration()?;
    let app = Application::build(cfg).await?;

    if let Err(e) = app.run_until_stopped().await {
        tracing::error!(
            error.cause_chain=?e,
            error.message=%e,
            "API failed"
        );
        return Err(e.into());
    }
    tracing::info!("API exited gracefully");
    Ok(())
}
