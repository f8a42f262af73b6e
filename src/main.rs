mod config;

use chatrelay::{
    AppState, build_metrics_layer_and_handle, build_metrics_router, build_router,
    client::create_hyper_client,
};
use clap::Parser as _;
use config::Config;
use tokio::net::TcpListener;
use tracing::{error, info, instrument, warn};

#[tokio::main]
#[instrument]
pub async fn main() -> anyhow::Result<()> {
    let config = Config::parse().validate()?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match config.log_format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init(),
        _ => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
    }

    info!("Starting chat relay with config: {:?}", config);

    let settings = config.settings()?;
    if settings.api_key().is_none() {
        warn!("OPENAI_API_KEY is not set, chat requests will fail until it is configured");
    }

    let app_state = AppState::with_client(settings, create_hyper_client(config.pool()));
    let mut router = build_router(app_state);

    if config.metrics {
        let (prometheus_layer, handle) =
            build_metrics_layer_and_handle(config.metrics_prefix.clone());
        router = router.layer(prometheus_layer);

        let metrics_addr = format!("0.0.0.0:{}", config.metrics_port);
        let metrics_listener = TcpListener::bind(&metrics_addr).await?;
        info!("Metrics listening on {}", metrics_addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, build_metrics_router(handle)).await {
                error!("Metrics server failed: {}", e);
            }
        });
    }

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Chat relay listening on {}{}", bind_addr, config.path);

    axum::serve(listener, router).await?;

    Ok(())
}
