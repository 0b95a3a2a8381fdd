//! Kagi Authorizer - API Gateway token authorizer
//!
//! Verifies Cognito bearer tokens and returns an IAM policy decision.

use clap::Parser;
use kagi_uploadr::auth::{authorize, jwt::TokenValidator, AuthorizationRequest};
use kagi_uploadr::config::{AuthorizerConfig, LoggingConfig};
use kagi_uploadr::telemetry::init_subscriber;
use lambda_runtime::{run, service_fn, LambdaEvent};
use std::path::PathBuf;
use tracing::info;

/// Kagi Authorizer - JWT token authorizer for API Gateway
#[derive(Parser, Debug)]
#[command(name = "kagi-authorizer")]
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

    let config = AuthorizerConfig::from_env()?;
    let validator = TokenValidator::from_config(&config)?;
    info!(
        version = kagi_uploadr::VERSION,
        issuer = validator.issuer(),
        "Starting Kagi Authorizer"
    );

    if let Some(path) = args.event {
        let raw = tokio::fs::read_to_string(&path).await?;
        let request: AuthorizationRequest = serde_json::from_str(&raw)?;

        let result = authorize(&validator, &request).await;

        #[cfg(feature = "metrics")]
        tracing::debug!(metrics = %kagi_uploadr::metrics::gather_text(), "Metrics");

        let decision = result?;
        println!("{}", serde_json::to_string_pretty(&decision)?);
        return Ok(());
    }

    let validator = &validator;
    run(service_fn(
        move |event: LambdaEvent<AuthorizationRequest>| async move {
            authorize(validator, &event.payload)
                .await
                .map_err(lambda_runtime::Error::from)
        },
    ))
    .await
    .map_err(|e| anyhow::anyhow!(e))
}
