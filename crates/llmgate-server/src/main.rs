use llmgate_engine::{ModelConfig, ModelHandle};
use llmgate_runtime::RuntimeLoader;
use llmgate_server::{run_server, AppState, ServerConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let model_config = ModelConfig::from_env();
    let server_config = ServerConfig::from_env();
    tracing::info!(
        model = %model_config.name,
        file = %model_config.file,
        kind = %model_config.kind,
        max_concurrent = server_config.max_concurrent_sessions,
        v2_mode = ?server_config.v2_mode,
        "starting llmgate"
    );

    // The model is loaded on the first request that needs it.
    let model = ModelHandle::new(model_config, Arc::new(RuntimeLoader::new()));
    let addr = server_config.addr;
    let state = AppState::new(model, server_config);

    run_server(state, addr).await?;
    Ok(())
}
