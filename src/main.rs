use std::sync::Arc;

use anyhow::Context;

use ridebot::booking::{BookingFactory, ChannelPolicy};
use ridebot::channels::{MessagingGateway, WhatsAppChannel};
use ridebot::config::AppConfig;
use ridebot::conversation::TransitionEngine;
use ridebot::datetime::DateTimeNormalizer;
use ridebot::resolver::{AddressResolver, GooglePlacesResolver};
use ridebot::store::{Database, LibSqlBackend};
use ridebot::webhook::{Dispatcher, WebhookState, spawn_dedup_prune_task, webhook_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    eprintln!("🚕 Ridebot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Webhook: http://0.0.0.0:{}/webhook", config.port);
    eprintln!("   Health:  http://0.0.0.0:{}/health", config.port);
    eprintln!("   Database: {}\n", config.db_path.display());

    // ── Storage ───────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .context("Failed to open database")?,
    );
    spawn_dedup_prune_task(Arc::clone(&db), config.dedup_ttl);

    // ── Collaborators ─────────────────────────────────────────────────────
    let resolver: Arc<dyn AddressResolver> =
        Arc::new(GooglePlacesResolver::new(config.google_maps_key.clone()));
    let gateway: Arc<dyn MessagingGateway> = Arc::new(WhatsAppChannel::new(&config.whatsapp));
    let engine = TransitionEngine::new(resolver, DateTimeNormalizer::new(config.local_offset));
    let bookings = BookingFactory::new(Arc::clone(&db), ChannelPolicy::WHATSAPP);
    let dispatcher = Dispatcher::new(db, engine, gateway, bookings);

    // ── HTTP ──────────────────────────────────────────────────────────────
    let app = webhook_routes(WebhookState {
        dispatcher: Arc::new(dispatcher),
        verify_token: Arc::from(config.whatsapp.verify_token.as_str()),
        ack_budget: config.ack_budget,
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Webhook server started");
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
