use std::sync::Arc;
use std::time::Duration;

use guide_assist::catalog::{IntentCatalog, TourScript};
use guide_assist::config::{BotConfig, GeminiConfig};
use guide_assist::genai::{ContentGenerator, GeminiClient};
use guide_assist::server::{chat_routes, BroadcastNavigator};
use guide_assist::session::ChatSession;

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

    let port: u16 = std::env::var("GUIDE_ASSIST_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let reply_delay_ms: u64 = std::env::var("GUIDE_ASSIST_REPLY_DELAY_MS")
        .unwrap_or_else(|_| "500".to_string())
        .parse()
        .unwrap_or(500);

    eprintln!("💬 Guide Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Chat WS: ws://0.0.0.0:{}/ws/chat", port);
    eprintln!("   Chat API: http://0.0.0.0:{}/api/chat/history", port);

    // Content assistance is optional — enabled when an API key is present.
    let generator: Option<Arc<dyn ContentGenerator>> = match GeminiConfig::from_env() {
        Ok(config) => {
            eprintln!("   Assist: enabled (model: {})", config.model);
            Some(Arc::new(GeminiClient::new(config)))
        }
        Err(_) => {
            eprintln!("   Assist: disabled (GEMINI_API_KEY not set)");
            None
        }
    };

    let bot_config = BotConfig {
        reply_delay: Duration::from_millis(reply_delay_ms),
        ..BotConfig::default()
    };

    let (navigator, nav_tx) = BroadcastNavigator::channel(bot_config.broadcast_capacity);
    let session = ChatSession::new(
        IntentCatalog::builtin(),
        TourScript::builtin(),
        navigator,
        bot_config,
    );
    session.initialize().await;

    let app = chat_routes(session, nav_tx, generator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!(port, "Chat server started");
    axum::serve(listener, app).await?;

    Ok(())
}
