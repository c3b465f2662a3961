use std::{path::PathBuf, sync::Arc};

use {
    clap::Parser,
    pipeworks_broker::AmqpBroker,
    pipeworks_channel::{ChannelEvent, ChannelPlugin},
    pipeworks_config::{Severity, apply_env_overrides, validate},
    secrecy::ExposeSecret,
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "pipeworks", about = "Pipeworks — broker channel plugin runner")]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Explicit config file path (default: standard discovery).
    #[arg(long, env = "PIPEWORKS_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    let config = match &cli.config {
        Some(path) => {
            let mut config = pipeworks_config::load_config(path)?;
            apply_env_overrides(&mut config);
            config
        },
        None => pipeworks_config::discover_and_load()?,
    };

    let result = validate(&config);
    for d in &result.diagnostics {
        match d.severity {
            Severity::Error => error!(field = d.field, "{}", d.message),
            Severity::Warning => warn!(field = d.field, "{}", d.message),
            Severity::Info => info!(field = d.field, "{}", d.message),
        }
    }
    if result.has_errors() {
        anyhow::bail!("configuration invalid, refusing to start");
    }

    let broker = AmqpBroker::connect(config.broker_url.expose_secret()).await?;
    let (plugin, mut events) = ChannelPlugin::new(Arc::new(broker), &config);
    let plugin = Arc::new(plugin);
    let cancel = plugin.cancel_token();

    let runner = tokio::spawn({
        let plugin = Arc::clone(&plugin);
        async move { plugin.run().await }
    });

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                cancel.cancel();
                break;
            },
            event = events.recv() => match event {
                Some(ChannelEvent::Ready) => {
                    info!(plugin_id = %config.plugin_id, "channel plugin ready");
                },
                Some(ChannelEvent::Data(value)) => {
                    // Decoded pipeline data goes to stdout as JSON lines so
                    // the host side can pipe it onward.
                    println!("{value}");
                },
                None => {
                    warn!("event stream ended");
                    break;
                },
            },
        }
    }

    runner.await??;
    Ok(())
}
