//! engram binary — wires the REPL to stdin, PostgreSQL, and the LLM
//! endpoints. All loop logic lives in the library so tests can drive it.

use std::sync::Arc;

use clap::Parser;
use tokio::io::BufReader;

use engram_agent::{Agent, AgentOptions};
use engram_cli::{repl, startup_exit_code, Cli, EXIT_CONFIG, EXIT_DATABASE};
use engram_config::EngramConfig;
use engram_core::agent::FIFO_CAPACITY_DEFAULT;
use engram_core::event::EventBus;
use engram_llm::{OpenAiCompatChat, OpenAiCompatEmbedder};
use engram_security::AuditLogger;
use engram_store::PgStore;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .init();

    let config = match EngramConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(EXIT_CONFIG);
        }
    };

    let store = match PgStore::connect(&config.database_url, config.embedding_dim).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Database unreachable: {e}");
            std::process::exit(EXIT_DATABASE);
        }
    };
    if let Err(e) = store.migrate().await {
        eprintln!("Database migration failed: {e}");
        std::process::exit(EXIT_DATABASE);
    }
    let store = Arc::new(store.with_ef_search(config.ef_search));

    let model_id = cli.model.clone().unwrap_or_else(|| config.chat_model.clone());
    let chat = match OpenAiCompatChat::new(&config.chat_url, &model_id, config.api_key.clone()) {
        Ok(chat) => Arc::new(chat),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(EXIT_CONFIG);
        }
    };
    let embedder = match OpenAiCompatEmbedder::new(
        &config.embed_url,
        &config.embed_model,
        config.api_key.clone(),
        config.embedding_dim,
    ) {
        Ok(embedder) => Arc::new(embedder),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(EXIT_CONFIG);
        }
    };

    let options = AgentOptions {
        name: cli.agent.clone(),
        model_id,
        workspace_root: cli
            .workspace
            .clone()
            .unwrap_or_else(|| config.workspace_root.join(&cli.agent)),
        fifo_capacity: cli.context.unwrap_or(FIFO_CAPACITY_DEFAULT),
        temperature: config.temperature,
    };

    let agent = match Agent::open(
        store.clone(),
        store.clone(),
        store.clone(),
        chat,
        embedder,
        Arc::new(EventBus::default()),
        Arc::new(AuditLogger::with_sinks(vec![Box::new(
            engram_security::TracingSink,
        )])),
        options,
    )
    .await
    {
        Ok(agent) => agent,
        Err(e) => {
            eprintln!("Startup failed: {e}");
            std::process::exit(startup_exit_code(&e));
        }
    };

    let code = repl(&agent, BufReader::new(tokio::io::stdin())).await;
    store.close().await;
    std::process::exit(code);
}
