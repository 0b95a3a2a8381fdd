//! Configuration loading from the process environment
//!
//! These tests mutate process-wide environment variables and run serially.

use kagi_uploadr::config::{AuthorizerConfig, ConfigError, UploaderConfig};
use serial_test::serial;

const AUTHORIZER_VARS: &[&str] = &[
    "REGION",
    "USER_POOLS_ID",
    "JWT_ALGORITHM_TYPE",
    "JWKS_CACHE_TTL_SECS",
];
const UPLOADER_VARS: &[&str] = &["BUCKET", "ENV", "BUCKET_ENDPOINT"];

fn clear(vars: &[&str]) {
    for var in vars {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_authorizer_from_env() {
    clear(AUTHORIZER_VARS);
    std::env::set_var("REGION", "eu-west-1");
    std::env::set_var("USER_POOLS_ID", "eu-west-1_Pool");
    std::env::set_var("JWT_ALGORITHM_TYPE", "256");

    let config = AuthorizerConfig::from_env().unwrap();
    assert_eq!(
        config.jwks_url(),
        "https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_Pool/.well-known/jwks.json"
    );
    assert_eq!(config.algorithm().unwrap(), jsonwebtoken::Algorithm::RS256);

    clear(AUTHORIZER_VARS);
}

#[test]
#[serial]
fn test_authorizer_missing_pool_is_fatal() {
    clear(AUTHORIZER_VARS);
    std::env::set_var("REGION", "eu-west-1");

    let result = AuthorizerConfig::from_env();
    assert!(matches!(result, Err(ConfigError::Missing("USER_POOLS_ID"))));
    assert_eq!(
        result.unwrap_err().to_string(),
        "Missing required environment variable USER_POOLS_ID"
    );

    clear(AUTHORIZER_VARS);
}

#[test]
#[serial]
fn test_authorizer_rejects_unsupported_algorithm() {
    clear(AUTHORIZER_VARS);
    std::env::set_var("REGION", "eu-west-1");
    std::env::set_var("USER_POOLS_ID", "eu-west-1_Pool");
    std::env::set_var("JWT_ALGORITHM_TYPE", "HS256");

    let result = AuthorizerConfig::from_env();
    assert!(matches!(result, Err(ConfigError::Invalid(_))));

    clear(AUTHORIZER_VARS);
}

#[test]
#[serial]
fn test_uploader_missing_bucket_is_fatal() {
    clear(UPLOADER_VARS);

    let result = UploaderConfig::from_env();
    assert!(matches!(result, Err(ConfigError::Missing("BUCKET"))));
}

#[test]
#[serial]
fn test_uploader_local_from_env() {
    clear(UPLOADER_VARS);
    std::env::set_var("BUCKET", "uploads");
    std::env::set_var("ENV", "local");
    std::env::set_var("BUCKET_ENDPOINT", "http://localhost:4566");

    let config = UploaderConfig::from_env().unwrap();
    assert_eq!(config.endpoint(), Some("http://localhost:4566"));

    clear(UPLOADER_VARS);
}
