use std::sync::Arc;

use pickup_assist::address::HttpPostalLookup;
use pickup_assist::classify::{HttpClassifier, HttpMediaFetcher};
use pickup_assist::config::{BotConfig, ClassifyPolicy};
use pickup_assist::engine::ConversationEngine;
use pickup_assist::schedule::ScheduleCatalog;
use pickup_assist::server::{AppState, routes};
use pickup_assist::session::{FallbackStore, MemoryStore, RemoteStore, SessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  required: PICKUP_CLASSIFY_URL, PICKUP_MEDIA_BASE_URL");
        std::process::exit(1);
    });

    eprintln!("♻️  Pickup Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Webhook: http://0.0.0.0:{}/webhook", config.port);
    eprintln!("   Classifier: {}", config.classify_url);
    eprintln!(
        "   Policy: {}",
        match config.classify_policy {
            ClassifyPolicy::AutoAccept => "top-1 auto-accept",
            ClassifyPolicy::Manual => "top-3 manual pick",
        }
    );

    // ── Session store ────────────────────────────────────────────────────
    let store: Arc<dyn SessionStore> = match &config.store_url {
        Some(url) => {
            eprintln!("   Sessions: remote backend ({url}, in-process fallback)");
            Arc::new(FallbackStore::new(RemoteStore::new(
                url.clone(),
                config.store_token.clone(),
                config.http_timeout,
            )))
        }
        None => {
            eprintln!("   Sessions: in-process only (drafts won't survive a restart)");
            Arc::new(MemoryStore::new())
        }
    };

    // ── Engine ───────────────────────────────────────────────────────────
    let fetcher = Arc::new(HttpMediaFetcher::new(
        config.media_base_url.clone(),
        config.http_timeout,
    ));
    let classifier = Arc::new(HttpClassifier::new(
        config.classify_url.clone(),
        config.classify_api_key.clone(),
        fetcher,
        config.http_timeout,
    ));
    let lookup = Arc::new(HttpPostalLookup::new(
        config.lookup_url.clone(),
        config.http_timeout,
    ));
    let engine = Arc::new(ConversationEngine::new(
        classifier,
        lookup,
        ScheduleCatalog::new(config.days_ahead),
        config.classify_policy,
        config.max_qty,
    ));

    let app = routes(AppState {
        engine,
        store,
        session_ttl: config.session_ttl,
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "webhook server started");
    axum::serve(listener, app).await?;

    Ok(())
}
