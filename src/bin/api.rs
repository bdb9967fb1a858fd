use smartspend::{
    advisor::{AdvisoryPanel, SavingsAdvisor},
    api::{start_server, ApiState},
    config::AppConfig,
    gemini::GeminiClient,
    store::TransactionStore,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    if config.gemini_api_key.is_empty() {
        warn!("GEMINI_API_KEY not set, savings tips will use the fallback");
    }

    info!("SmartSpend - API Server");
    info!(port = config.port, model = %config.gemini_model, "Configuration loaded");

    // Create components
    let backend = config.open_blob_store().await?;
    let store = Arc::new(TransactionStore::open(backend).await?);

    let gemini = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_model.clone())?;
    let advisor = Arc::new(SavingsAdvisor::new(Arc::new(gemini)).with_timeout(config.advisor_timeout));
    let panel = Arc::new(AdvisoryPanel::new(advisor));

    info!(transactions = store.len().await, "Store ready");

    // Start API server
    start_server(ApiState::new(store, panel), config.port).await?;

    Ok(())
}
