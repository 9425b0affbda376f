use anyhow::{Context, Result};
use clap::Parser;
use core_logic::{WalletManager, setup_logger};
use dialoguer::{Password, theme::ColorfulTheme};
use dotenv::dotenv;
use std::env;
use std::sync::Arc;
use tracing::{error, info, warn};
use x402_amoy::{
    CampaignRunner, CampaignSequencer, HarnessConfig, PaymentAwareClient, ResourceRequest,
    ReqwestTransport, WalletRegistry,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "x402 Campaign Runner - concurrent multi-wallet payment tests"
)]
struct Args {
    /// Path to config.toml
    #[arg(short, long, default_value = "config/config.toml")]
    config: String,

    /// Skip the unsigned diagnostic request
    #[arg(long, default_value = "false")]
    no_probe: bool,

    /// Show per-wallet protocol logs
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Override the paid resource URL
    #[arg(long)]
    resource_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let debug_targets: &[&str] = if args.verbose {
        &["x402_amoy", "core_logic"]
    } else {
        &[]
    };
    let _guard = setup_logger(debug_targets);

    // 1. Load Config
    let config_path = if std::path::Path::new(&args.config).exists() {
        args.config.clone()
    } else if args.config == "config/config.toml"
        && std::path::Path::new("chains/x402-amoy/config/config.toml").exists()
    {
        "chains/x402-amoy/config/config.toml".to_string()
    } else {
        args.config.clone()
    };
    let mut config = HarnessConfig::from_path(&config_path).context("Failed to load config")?;
    config.apply_env_overrides()?;
    if let Some(url) = args.resource_url {
        config.resource_url = url;
        config.validate()?;
    }
    if args.no_probe {
        config.probe = false;
    }

    info!("Resource: {}", config.resource_url);
    info!(
        "Network: {} (facilitator {})",
        config.network, config.facilitator_url
    );

    // 2. Load Wallets
    let wallet_manager =
        WalletManager::from_source(&config.wallets).context("Failed to open wallet source")?;
    if wallet_manager.count() == 0 {
        return Err(anyhow::anyhow!("No wallets found in {:?}", config.wallets));
    }

    let password = if wallet_manager.needs_password() {
        match env::var("WALLET_PASSWORD") {
            Ok(p) => Some(p),
            Err(_) => Some(
                Password::with_theme(&ColorfulTheme::default())
                    .with_prompt("Enter wallet password")
                    .report(true)
                    .interact()?,
            ),
        }
    } else {
        None
    };

    let registry =
        WalletRegistry::from_manager(&wallet_manager, password.as_deref(), &config.network)
            .await?;
    for wallet in registry.iter() {
        info!("{}: {}", wallet.label(), wallet.address);
    }

    // 3. Wire the client
    let transport = ReqwestTransport::new(config.request_timeout())?;
    let client = Arc::new(PaymentAwareClient::new(
        Arc::new(transport),
        config.client_options(),
    ));
    let requester = ResourceRequest::new(client, &config.resource_url, config.request_headers());
    let runner = CampaignRunner::new(registry, Arc::new(requester));
    let sequencer = CampaignSequencer::from_config(runner, &config.sequence);

    // 4. Run the sequence until done or interrupted
    info!(
        "Starting {} campaign(s)",
        config.sequence.campaigns.len()
    );
    tokio::select! {
        result = sequencer.run(&config.sequence.campaigns) => {
            match result {
                Ok(summaries) => {
                    let total: usize = summaries.iter().map(|s| s.outcomes.len()).sum();
                    let paid: usize = summaries.iter().map(|s| s.success_count).sum();
                    info!("All tests completed: {}/{} requests paid", paid, total);
                }
                Err(e) => {
                    error!("Sequence aborted: {}", e);
                    return Err(e.into());
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, abandoning remaining campaigns");
        }
    }

    Ok(())
}
