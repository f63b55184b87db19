use std::sync::Arc;

use querystream_ai::{StreamConfig, StreamService};
use querystream_core::reconstruction::MessageReconstructor;
use querystream_storage_sqlite::{db, FragmentRepository};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, LogFormat};
use crate::environment::CliEnvironment;

pub struct AppState {
    pub repository: Arc<FragmentRepository>,
    pub stream_service: Arc<StreamService<CliEnvironment>>,
    pub reconstructor: Arc<MessageReconstructor>,
}

pub fn init_tracing(log_format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init(),
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone())?;

    let repository = Arc::new(FragmentRepository::new(pool.clone(), writer));
    let env = Arc::new(CliEnvironment::new(repository.clone()));
    let stream_service = Arc::new(StreamService::new(
        env,
        StreamConfig {
            limits: config.limits,
            ..Default::default()
        },
    ));
    let reconstructor = Arc::new(MessageReconstructor::new(repository.clone()));

    Ok(Arc::new(AppState {
        repository,
        stream_service,
        reconstructor,
    }))
}
