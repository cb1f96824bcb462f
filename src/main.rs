use travel_time_predictor::{
    config::AppConfig,
    service::{router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = AppConfig::from_env()?;
    tracing::info!("config: {:?}", cfg);

    let state = AppState::new(cfg.forest.clone(), cfg.hotspots_top_n)
        .with_trips_path(cfg.trips_path.clone());
    let trips = state.load_corpus()?;
    let model = state.retrain(trips)?;
    tracing::info!("model ready; zones={:?}", model.encoder().zones());

    let app = router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
