use anyhow::{Context, Result};
use legal_purity_gateway::{
    config::Config,
    engine::OpenAiEngine,
    feedback::FeedbackLoop,
    gateway::{Pipeline, TranslationGateway},
    scheduler,
    server::{self, AppState},
    terminology::{BuiltinDataset, JsonDataset, ReferenceDataset, TerminologyStore},
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("legal_purity_gateway=info".parse()?),
        )
        .init();

    info!("Starting legal purity gateway");

    // Load configuration from environment
    let config = Config::from_env()?;
    if config.is_production() && config.api_key.is_none() {
        warn!("API_KEY not set, admin routes are disabled");
    }

    // Terminology is read once at startup
    let dataset: Box<dyn ReferenceDataset> = match &config.terminology_seed_path {
        Some(path) => Box::new(JsonDataset::new(path)),
        None => Box::new(BuiltinDataset),
    };
    let terminology = TerminologyStore::bootstrap(dataset.as_ref())
        .with_context(|| format!("Failed to load terminology from {}", dataset.name()))?;
    info!(
        "Loaded {} terminology records from {}",
        terminology.snapshot().records().len(),
        dataset.name()
    );

    let pipeline = Pipeline::new(&config, terminology);
    let engine = Arc::new(OpenAiEngine::new(reqwest::Client::new(), &config));
    let gateway = Arc::new(TranslationGateway::new(engine, pipeline.clone(), &config));
    let feedback = Arc::new(FeedbackLoop::new(pipeline, &config));

    // Keep the scheduler alive for the lifetime of the server
    let _scheduler = scheduler::start_scheduler(&config, Arc::clone(&feedback)).await?;

    let state = AppState {
        gateway,
        feedback,
        api_key: config.api_key.clone(),
    };
    server::serve(state, config.port).await?;

    info!("Shut down cleanly");
    Ok(())
}
