//! Shared fixtures for integration tests
//!
//! Two fixed 2048-bit RSA key pairs: key A is published in the key sets,
//! key B is only used to forge signatures.

#![allow(dead_code)]

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const KEY_A_PRIVATE_PEM: &str = include_str!("../fixtures/rsa_a_private.pem");
pub const KEY_B_PRIVATE_PEM: &str = include_str!("../fixtures/rsa_b_private.pem");
pub const KEY_A_CERT_X5C: &str = include_str!("../fixtures/rsa_a_cert.x5c");

pub const KEY_A_N: &str = "rwsy7YYC7tZMBv724btRdQI3bHzMOAhsIJ8NcJXA7c-Oqlx_zckIW43vLdICnDztDRfDbqs5_IHGBYKE1XO57dApYdUoLG1lPdz-YczBJ7YttLPQha1re5_LjV1U6oE8xbWRjGA01ZQINNLweJawT2XMUSp_XhvKo9c0h-GkegdmAAniVCNcj7Iv9zVwbIu4Fk3U3AFgGssvAQhYnAqFkgGto53jM8CokkXJkh3KxuJtC9sfmYciHzZt9_8Opwfn8_mLCo5DoqdKQ90CfgbATOOGMJAdsd4Gvfe1NJ2L9BwZ4RS5DB4R_uoeix1F6pi8gVVUonjQhBmpYsl74-AY5Q";
pub const KEY_B_N: &str = "uT0E8Y1BNlvzG9FsPCLMSA7BuxFLAoezeH7A6l9Vsz1yz3qP8KmD2-ykV1xHsteBrCSN6_nwy1hrbgxQlhPbsdSXfpcRh9ZibB1CuXCGsYmt3q2jEamloUMh4hy_B6SmqK2MqEow3s6SWRwFrLhRuMcm-xaKM-AnYX6ZlPffxCk2Iad-TWJzpgzmukIWS2BWc03yIbWpb2QUnNoJAhr9qw2RdKBvY7_NMUSDQN1_12u8MaVezCDGbF-ZZt9oXvBcPx8ghTqutYR3HYxxr_W1zplkgIbzNeCYUVi5OGFj4V1HbFkmHKPFx3qObQ89uApvkZlSGcA00c7sc_FTYC2o7w";
pub const RSA_E: &str = "AQAB";

pub const ISSUER: &str = "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_TestPool";
pub const JWKS_PATH: &str = "/.well-known/jwks.json";
pub const METHOD_ARN: &str = "arn:aws:execute-api:us-east-1:123456789012:abcdef/dev/GET/items";

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Claims valid for an hour, issued by [`ISSUER`]
pub fn claims_for(sub: &str) -> Value {
    let now = now_secs();
    json!({
        "sub": sub,
        "iss": ISSUER,
        "iat": now,
        "exp": now + 3600,
        "scope": "aws.cognito.signin.user.admin",
    })
}

/// Sign `claims` with an RS256 key and put `kid` in the header
pub fn mint_token(private_pem: &str, kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

pub fn rsa_jwk(kid: &str, n: &str) -> Value {
    json!({
        "kty": "RSA",
        "kid": kid,
        "use": "sig",
        "alg": "RS256",
        "n": n,
        "e": RSA_E,
    })
}

pub fn x5c_jwk(kid: &str) -> Value {
    json!({
        "kty": "RSA",
        "kid": kid,
        "use": "sig",
        "alg": "RS256",
        "x5c": [KEY_A_CERT_X5C.trim()],
    })
}

pub fn key_set(keys: Vec<Value>) -> Value {
    json!({ "keys": keys })
}

/// Serve `body` as the key set, expecting `expected_calls` downloads
pub async fn jwks_server(body: Value, expected_calls: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected_calls)
        .mount(&server)
        .await;
    server
}

pub fn jwks_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), JWKS_PATH)
}
