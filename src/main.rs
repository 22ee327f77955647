//! mailreap - Entry point for a single sweep run

use anyhow::{Context, Result};
use mailreap::config::Settings;
use mailreap::domain::ProviderType;
use mailreap::providers::email::{EmailProvider, GmailProvider, MemoryProvider};
use mailreap::SweepService;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting mailreap");

    if let Err(e) = run().await {
        tracing::error!("Sweep failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let settings_path = Settings::default_path()?;
    let settings = Settings::load(&settings_path)
        .with_context(|| format!("loading {}", settings_path.display()))?;

    match settings.provider {
        ProviderType::Gmail => {
            sweep(GmailProvider::new(settings.account_id)).await?;
        }
        ProviderType::Memory => {
            let path = settings
                .snapshot_path
                .context("the memory provider needs snapshot_path")?;
            let provider = MemoryProvider::load(&path)
                .with_context(|| format!("loading snapshot {}", path.display()))?;

            let service = sweep(provider).await?;
            for change in service.provider().changes()? {
                tracing::info!(?change, "Dry run change");
            }
        }
    }

    Ok(())
}

async fn sweep<P: EmailProvider>(mut provider: P) -> Result<SweepService<P>> {
    provider
        .authenticate()
        .await
        .context("authenticating mailbox provider")?;

    let mut service = SweepService::with_default_bindings(provider);
    service.run().await?;
    Ok(service)
}
