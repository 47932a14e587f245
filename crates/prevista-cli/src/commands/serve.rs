use std::net::SocketAddr;

use prevista_engine::ForecastEngine;
use tracing::info;

use crate::error::CliError;

pub async fn run(engine: ForecastEngine, addr: SocketAddr) -> Result<(), CliError> {
    info!(
        database = %engine.warehouse().db_path().display(),
        artifacts = %engine.artifacts().dir().display(),
        "starting prevista API"
    );
    prevista_web::serve(engine, addr).await?;
    Ok(())
}
