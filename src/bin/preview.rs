//! Preview binary - translates one text and prints what the pipeline did
//!
//! Usage:
//!   cargo run --bin preview -- ar en "قام المشغل بطرد الأجير"
//!   cargo run --bin preview -- --domain labor ar en "قام المشغل بطرد الأجير"
//!
//! Required environment variables:
//! - OPENAI_API_KEY
//!
//! Every other setting falls back to the server defaults.

use anyhow::{bail, Context, Result};
use legal_purity_gateway::{
    config::Config,
    engine::OpenAiEngine,
    gateway::{Pipeline, TranslationGateway},
    terminology::{BuiltinDataset, JsonDataset, LegalDomain, ReferenceDataset, TerminologyStore},
    translation::TranslationRequest,
};
use std::sync::Arc;
use tracing::info;

struct PreviewArgs {
    source: String,
    target: String,
    text: String,
    domain: Option<LegalDomain>,
}

fn parse_args(args: &[String]) -> Result<PreviewArgs> {
    let mut domain = None;
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--domain" {
            let name = iter.next().context("--domain needs a value")?;
            domain = Some(
                LegalDomain::from_name(name).with_context(|| format!("Unknown domain: {}", name))?,
            );
        } else {
            positional.push(arg.as_str());
        }
    }

    if positional.len() < 3 {
        bail!("Usage: preview [--domain <name>] <source> <target> <text>");
    }
    Ok(PreviewArgs {
        source: positional[0].to_string(),
        target: positional[1].to_string(),
        text: positional[2..].join(" "),
        domain,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("legal_purity_gateway=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&args)?;
    let config = Config::from_env()?;

    let dataset: Box<dyn ReferenceDataset> = match &config.terminology_seed_path {
        Some(path) => Box::new(JsonDataset::new(path)),
        None => Box::new(BuiltinDataset),
    };
    let terminology = TerminologyStore::bootstrap(dataset.as_ref())
        .with_context(|| format!("Failed to load terminology from {}", dataset.name()))?;

    let pipeline = Pipeline::new(&config, terminology);
    let engine = Arc::new(OpenAiEngine::new(reqwest::Client::new(), &config));
    let gateway = TranslationGateway::new(engine, pipeline.clone(), &config);

    let request = TranslationRequest::new(args.text, &args.source, &args.target, args.domain)?;
    info!("Translating {} -> {}", request.source_language(), request.target_language());

    let source_report = pipeline
        .cleaner
        .clean(request.source_text(), request.source_language());
    let result = gateway.translate(&request).await?;

    println!("\n{}", "=".repeat(60));
    println!("RESULT ({:?}, quality {:.2})", result.method, result.quality_score);
    println!("{}", "=".repeat(60));
    println!("{}", result.text);
    println!("\n--- Source cleaning ---");
    println!("{}", serde_json::to_string_pretty(&source_report)?);
    println!("\n--- Purity ---");
    println!("{}", serde_json::to_string_pretty(&result.purity)?);
    println!("\n--- Metrics ---");
    println!("{}", serde_json::to_string_pretty(&gateway.monitor().snapshot())?);

    Ok(())
}
