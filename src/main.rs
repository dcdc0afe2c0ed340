use conquest_relay::{app, config::Config, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    telemetry::init(config.log_format);

    let app = app(&config);

    tracing::info!(
        addr = %config.addr,
        winning_score = config.rules.winning_score,
        heartbeat_secs = config.heartbeat.as_secs(),
        reap_empty_rooms = config.reap_empty_rooms,
        "listening"
    );
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
