//! wsdrop: send one file to a WebSocket peer.
//!
//! Usage: wsdrop [FILE] [SERVER_URL]

use std::path::PathBuf;

use anyhow::{Context, Result};

use wsdrop::{Client, RunOutcome};
use wsdrop_core::config::WsdropConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = WsdropConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let mut config = WsdropConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        WsdropConfig::default()
    });

    let mut args = std::env::args().skip(1);
    if let Some(file) = args.next() {
        config.transfer.file_path = PathBuf::from(file);
    }
    if let Some(url) = args.next() {
        config.server.url = url;
    }

    tracing::info!(
        server = %config.server.url,
        file = %config.transfer.file_path.display(),
        max_chunk_bytes = config.transfer.max_chunk_bytes,
        "wsdrop starting"
    );

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for interrupt");
            std::future::pending::<()>().await;
        }
    };

    let outcome = Client::new(config)
        .run(interrupt)
        .await
        .context("startup failed")?;

    match outcome {
        RunOutcome::Interrupted => tracing::info!("stopped by interrupt"),
        RunOutcome::Completed {
            handshake,
            transfer,
            inbound,
        } => {
            if let Err(e) = handshake {
                tracing::error!(error = %e, "initial message not sent");
            }
            match transfer {
                Ok(report) => tracing::info!(
                    file_name = %report.file_name,
                    bytes = report.bytes,
                    parts = report.parts,
                    digest = hex::encode(report.digest),
                    "transfer complete"
                ),
                Err(e) => tracing::error!(error = %e, "transfer failed"),
            }
            tracing::info!(
                frames = inbound.frames,
                rejected = inbound.rejected,
                files = inbound.files.len(),
                "session finished"
            );
        }
    }

    Ok(())
}
