use roomrelay::{app, rooms::RoomManager, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned());
    pretty_env_logger::formatted_builder().parse_filters(&filters).init();

    let config = Config::from_env()?;
    log::debug!("{config:?}");

    let app_state = AppState {
        rooms: RoomManager::new(config.manager),
    };

    let app = app(app_state, config.cors()?);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    log::info!("listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
