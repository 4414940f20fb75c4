use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mysplit::auth::SessionIssuer;
use mysplit::expenses::strict_rules;
use mysplit::store::MongoStore;
use mysplit::{routes, AppState, Config};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mysplit=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn cors(config: &Config) -> Cors {
    match &config.cors_allowed_origin {
        Some(origin) => Cors::default()
            .allowed_origin(origin)
            .allow_any_method()
            .allow_any_header(),
        None => Cors::permissive(),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;
    tracing::info!(database = %config.database_name, "connecting to MongoDB");
    let store = Arc::new(MongoStore::connect(&config.mongodb_uri, &config.database_name).await?);
    tracing::info!("connected");

    let rules = if config.strict_expense_validation {
        strict_rules()
    } else {
        Vec::new()
    };
    let sessions = SessionIssuer::new(&config.jwt_secret, config.session_ttl_minutes);
    let state = AppState::new(store, sessions, rules);

    let address = (config.host.clone(), config.port);
    tracing::info!(host = %address.0, port = address.1, "starting server");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(cors(&config))
            .configure(routes::configure(state.clone()))
    })
    .bind(address)?
    .run()
    .await?;

    Ok(())
}
