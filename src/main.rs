#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = fleet_api_rust::config::config();
    tracing::info!("starting Fleet API in {:?} mode", config.environment);

    let app = fleet_api_rust::routes::app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("FLEET_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Fleet API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
