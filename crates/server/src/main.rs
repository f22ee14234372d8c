//! Lead Agent Server Entry Point

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use lead_agent_agent::{create_classifier, ConversationService, ResponseGenerator, TurnOrchestrator};
use lead_agent_config::{load_settings, Settings};
use lead_agent_core::{Telemetry, TracingTelemetry};
use lead_agent_persistence::PersistenceLayer;
use lead_agent_rag::{KnowledgeLoader, KnowledgeRetriever};
use lead_agent_server::{create_router, init_metrics, AppState, MetricsTelemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: env vars > config/{env} > config/default > defaults
    let env = std::env::var("LEAD_AGENT_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // Tracing is not initialized yet
            eprintln!(
                "Loaded configuration (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        }
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    init_tracing(&settings);

    tracing::info!("Starting Lead Agent Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?settings.environment,
        provider = ?settings.llm.provider,
        classifier = ?settings.agent.classifier,
        "Configuration loaded"
    );

    let metrics_handle = if settings.observability.metrics_enabled {
        let handle = init_metrics();
        tracing::info!("Initialized Prometheus metrics at /metrics");
        handle
    } else {
        None
    };
    let telemetry: Arc<dyn Telemetry> = if metrics_handle.is_some() {
        Arc::new(MetricsTelemetry::new())
    } else {
        Arc::new(TracingTelemetry)
    };

    let persistence = match lead_agent_persistence::init(&settings.persistence).await {
        Ok(layer) => layer,
        Err(e) => {
            tracing::error!(
                "Failed to initialize persistence: {}. Falling back to in-memory.",
                e
            );
            PersistenceLayer::in_memory(&settings.persistence.audio_dir)
        }
    };

    let llm = lead_agent_llm::create_backend(&settings.llm).context("creating LLM backend")?;

    let documents = KnowledgeLoader::load_path(Path::new(&settings.rag.knowledge_path))
        .with_context(|| format!("loading knowledge from {}", settings.rag.knowledge_path))?;
    let retriever = KnowledgeRetriever::new(documents)
        .with_context_top_k(settings.rag.context_top_k)
        .with_fallback_count(settings.rag.fallback_count);
    tracing::info!(documents = retriever.len(), "Knowledge loaded");

    let generator = ResponseGenerator::from_config(
        &settings.agent,
        llm.clone(),
        Arc::new(settings.messages.clone()),
    );
    let orchestrator = TurnOrchestrator::new(
        create_classifier(&settings.agent, llm.clone()),
        Arc::new(retriever),
        generator,
        telemetry.clone(),
    );
    let service = Arc::new(
        ConversationService::new(
            Arc::new(orchestrator),
            persistence.conversations.clone(),
            telemetry,
        )
        .with_latency_alert(Duration::from_millis(settings.agent.latency_alert_ms)),
    );

    let speech =
        lead_agent_pipeline::create_speech(&settings.speech).context("creating speech clients")?;

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let state = AppState::new(settings, service.clone(), llm, speech, persistence.audio)
        .with_metrics(metrics_handle);
    let cleanup = state.sessions.start_cleanup_task(service);

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("binding {}:{}", host, port))?;
    tracing::info!("Listening on {}:{}", host, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    let _ = cleanup.send(true);
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &settings.observability.log_level;
        format!("lead_agent={},tower_http=debug", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if settings.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
