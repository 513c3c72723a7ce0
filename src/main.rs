use std::{error::Error, net::SocketAddr};

use culinary_art::{config::Config, routes, state::AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::load()?;
    let state = AppState::from_config(&config).await?;

    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    log::info!("Culinary Art API listening on http://{address}");

    warp::serve(routes::app(state)).run(address).await;

    Ok(())
}
