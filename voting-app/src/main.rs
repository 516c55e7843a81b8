use crate::config::AppConfig;
use dotenv::dotenv;
use engine::app::{AppError, AppProperties, AppResult};
use error_stack::ResultExt;
use error_stack::fmt::ColorMode;
use repositories::SheetEngine;
use repositories::sheet::{HttpSheet, MemorySheet, ResilientSheet, SheetGateway};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use voting_routes::state::VotingAppState;

mod config;

const APP_NAME: &str = "voting service";

#[tokio::main]
async fn main() {
    match try_main().await {
        Ok(_) => info!("{APP_NAME} shutting down"),
        Err(e) => {
            error!("{APP_NAME} exited with error: {e:?}");
        }
    }
}

fn init_logging() {
    error_stack::Report::set_color_mode(ColorMode::None);

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_env("VOTING_LOG"))
        .init();
}

async fn try_main() -> AppResult<()> {
    init_logging();

    if let Err(e) = dotenv() {
        warn!("failed to load .env file: {e}");
    }

    let config = AppConfig::from_env().change_context(AppError)?;

    match config.sheet_url.clone() {
        Some(url) => {
            let sheet = HttpSheet::connect(url, config.sheet_token.clone(), config.retry.timeout)
                .change_context(AppError)?;
            serve(sheet, config).await
        }
        None => {
            warn!("no sheet url configured, topics and votes are kept in memory only");
            serve(MemorySheet::new(), config).await
        }
    }
}

#[instrument(skip(sheet, config), fields(port = config.port, metrics = config.metrics))]
async fn serve<G: SheetGateway>(sheet: G, config: AppConfig) -> AppResult<()> {
    let engine = SheetEngine::new(ResilientSheet::new(sheet, config.retry));

    debug!("building routes..");
    let state = if config.metrics {
        VotingAppState::new_with_metrics(engine).change_context(AppError)?
    } else {
        VotingAppState::new_without_metrics(engine)
    };
    let routes = voting_routes::routes::build(state);
    debug!("routes built");

    engine::app::run(
        routes,
        AppProperties {
            name: APP_NAME,
            port: config.port,
        },
    )
    .await
}
