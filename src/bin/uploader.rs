//! Kagi Uploader - presigned S3 upload issuer
//!
//! Answers `GET ?fileType=<mime>` with a presigned POST form.

use clap::Parser;
use kagi_uploadr::config::{LoggingConfig, UploaderConfig};
use kagi_uploadr::telemetry::init_subscriber;
use kagi_uploadr::upload::{ProxyRequest, ProxyResponse, UploadCredentialIssuer};
use lambda_runtime::{run, service_fn, LambdaEvent};
use std::path::PathBuf;
use tracing::info;

/// Kagi Uploader - presigned upload credentials for API Gateway
#[derive(Parser, Debug)]
#[command(name = "kagi-uploader")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run once against a JSON event file instead of the Lambda runtime
    #[arg(short, long)]
    event: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_subscriber(&LoggingConfig::from_env()?)?;

    let config = UploaderConfig::from_env()?;
    let issuer = UploadCredentialIssuer::from_config(&config).await?;
    info!(
        version = kagi_uploadr::VERSION,
        bucket = %config.bucket,
        local = config.is_local(),
        "Starting Kagi Uploader"
    );

    if let Some(path) = args.event {
        let raw = tokio::fs::read_to_string(&path).await?;
        let request: ProxyRequest = serde_json::from_str(&raw)?;

        let response = issuer.handle(&request).await;

        #[cfg(feature = "metrics")]
        tracing::debug!(metrics = %kagi_uploadr::metrics::gather_text(), "Metrics");

        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let issuer = &issuer;
    run(service_fn(move |event: LambdaEvent<ProxyRequest>| async move {
        Ok::<ProxyResponse, lambda_runtime::Error>(issuer.handle(&event.payload).await)
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))
}
