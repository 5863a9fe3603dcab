use anyhow::{bail, Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use link_resolver::hostname::simplified_hostname;
use link_resolver::{Config, FileStore, LinkResolver, LinkStore, NullStore, ResolvedLink};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        bail!("usage: link-resolver <url>...");
    }

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let resolver = LinkResolver::from_config(&config).context("Failed to build HTTP client")?;

    let store: Box<dyn LinkStore> = match config.store_dir.clone() {
        Some(dir) => {
            info!(dir = %dir.display(), "Using file store");
            Box::new(
                FileStore::open(&dir, true, resolver, config)
                    .await
                    .with_context(|| format!("Failed to open store: {}", dir.display()))?,
            )
        }
        None => Box::new(NullStore::new(resolver, config)),
    };

    for url in &urls {
        let link = store.get(url).await;
        log_outcome(&link);
        let json = serde_json::to_string_pretty(&link).context("Failed to serialize link")?;
        println!("{json}");
    }

    store.close().await.context("Failed to close store")?;
    Ok(())
}

fn log_outcome(link: &ResolvedLink) {
    match link.final_url() {
        Ok(url) => info!(
            url = %link.root().original_text,
            finalized = %url,
            host = %simplified_hostname(url),
            hops = link.chain().count(),
            "Resolved link"
        ),
        Err(e) => warn!(
            url = %link.root().original_text,
            code = %link.issue_code().unwrap_or_default(),
            "{e}"
        ),
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,link_resolver=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    // stdout carries the resolved records
    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}
