use std::sync::Arc;

use wedding_rsvp::channels::{DryRunMessenger, Messenger, WhatsAppChannel};
use wedding_rsvp::config::BotConfig;
use wedding_rsvp::console::OperatorConsole;
use wedding_rsvp::guests::{GuestStore, PhoneNormalizer};
use wedding_rsvp::pipeline::{RsvpHandler, dispatch};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = BotConfig::from_env()?;

    eprintln!("🎉 Wedding WhatsApp RSVP Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("============================");
    eprintln!(
        "   Wedding: {} & {}, {} at {}",
        config.wedding.bride_name,
        config.wedding.groom_name,
        config.wedding.date,
        config.wedding.location
    );

    // ── Guest store ─────────────────────────────────────────────────────
    let guests_path = config.guests_path();
    let store = Arc::new(GuestStore::open(&guests_path).await.unwrap_or_else(|e| {
        eprintln!("Error: Failed to open guest store at {}: {}", guests_path.display(), e);
        std::process::exit(1);
    }));
    eprintln!("   Guests: {} ({} on record)", store.path().display(), store.len().await);

    // ── Messenger ───────────────────────────────────────────────────────
    let messenger: Arc<dyn Messenger> = match config.whatsapp.clone() {
        Some(wa_config) => {
            let port = wa_config.webhook_port;
            let channel = WhatsAppChannel::new(wa_config);

            if let Err(e) = channel.health_check().await {
                eprintln!("   Warning: WhatsApp API health check failed: {}", e);
            }

            let app = channel.router();
            let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
                .await
                .map_err(|e| anyhow::anyhow!("Failed to bind webhook port {port}: {e}"))?;
            tokio::spawn(async move {
                tracing::info!(port, "WhatsApp webhook server started");
                if let Err(e) = axum::serve(listener, app).await {
                    tracing::error!(error = %e, "Webhook server stopped");
                }
            });

            eprintln!("   WhatsApp: enabled (webhook: http://0.0.0.0:{}/webhook)", port);
            Arc::new(channel)
        }
        None => {
            eprintln!("   WhatsApp: not configured, messages are logged only (dry run)");
            Arc::new(DryRunMessenger::new())
        }
    };

    // ── RSVP handler ────────────────────────────────────────────────────
    let handler = Arc::new(RsvpHandler::new(
        Arc::clone(&store),
        Arc::clone(&messenger),
        config.wedding.clone(),
        PhoneNormalizer::new(config.default_country_code.clone()),
    ));

    let events = messenger.start().await?;
    tokio::spawn(dispatch::run(Arc::clone(&handler), events));

    eprintln!("\n✅ The bot is now listening for RSVP responses.");

    // ── Operator console ────────────────────────────────────────────────
    let console = OperatorConsole::new(Arc::clone(&handler));
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());

    tokio::select! {
        result = console.run(stdin, tokio::io::stdout()) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Console error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n\nShutting down...");
        }
    }

    messenger.shutdown().await?;
    eprintln!("Goodbye! 👋");

    Ok(())
}
