use std::io;

use apex_api::config::AppConfig;
use apex_api::{build_server, create_pool, run_migrations, Services};
use dotenvy::dotenv;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(io::Error::other)?;
    let pool = create_pool(&config.database_url).map_err(io::Error::other)?;
    run_migrations(&pool).map_err(io::Error::other)?;

    let services = Services::new(&config, pool).map_err(io::Error::other)?;
    services.bootstrap_admin(&config).map_err(io::Error::other)?;

    log::info!("Starting server at http://{}:{}", config.host, config.port);
    log::info!(
        "API docs at http://{}:{}/swagger-ui/",
        config.host,
        config.port
    );

    build_server(services, &config.host, config.port)?.await
}
