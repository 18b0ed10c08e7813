use std::sync::Arc;

use clap::Parser;
use conquest::prelude::*;
use conquest::{Args, logging};

#[tokio::main]
async fn main() -> Result<(), ConquestError> {
    let args = Args::parse();
    if let Err(e) = logging::init(&args.log_level, args.json_logs) {
        eprintln!("logging already initialised: {e}");
    }

    let config = ServerConfig::from(args);
    let bank = Arc::new(config.question_bank()?);

    let server = ConquestServer::builder()
        .bind(&config.bind)
        .session_config(config.session.clone())
        .game_config(config.game.clone())
        .question_bank(bank)
        .build(DevTokenAuthenticator)
        .await?;

    tracing::info!(
        addr = %server.local_addr().map_or_else(|_| config.bind.clone(), |a| a.to_string()),
        "listening"
    );

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(())
        }
    }
}
