//! Signing key cache integration tests
//!
//! wiremock counts key set downloads so cache hits and expiry are observable.

mod common;

#[cfg(test)]
mod tests {
    use super::common::*;
    use kagi_uploadr::auth::jwks::{JwksClient, SigningKey};
    use kagi_uploadr::auth::AuthError;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_second_lookup_is_served_from_cache() {
        let server = jwks_server(key_set(vec![rsa_jwk("K1", KEY_A_N)]), 1).await;
        let client = JwksClient::new(&jwks_url(&server)).unwrap();

        let first = client.get_signing_key("K1").await.unwrap();
        let second = client.get_signing_key("K1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            first,
            SigningKey::RsaPublicKey {
                n: KEY_A_N.to_string(),
                e: RSA_E.to_string(),
            }
        );
        assert_eq!(client.cache().len().await, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let server = jwks_server(key_set(vec![rsa_jwk("K1", KEY_A_N)]), 2).await;
        let client = JwksClient::builder()
            .endpoint(&jwks_url(&server))
            .cache_ttl(Duration::from_millis(50))
            .build()
            .unwrap();

        client.get_signing_key("K1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        client.get_signing_key("K1").await.unwrap();
    }

    #[tokio::test]
    async fn test_each_kid_is_cached_separately() {
        let server = jwks_server(
            key_set(vec![rsa_jwk("K1", KEY_A_N), rsa_jwk("K2", KEY_B_N)]),
            2,
        )
        .await;
        let client = JwksClient::new(&jwks_url(&server)).unwrap();

        client.get_signing_key("K1").await.unwrap();
        client.get_signing_key("K2").await.unwrap();
        client.get_signing_key("K1").await.unwrap();
        client.get_signing_key("K2").await.unwrap();

        assert_eq!(client.cache().len().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_the_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(key_set(vec![rsa_jwk("K1", KEY_A_N)])),
            )
            .mount(&server)
            .await;
        let client = JwksClient::new(&jwks_url(&server)).unwrap();

        let (a, b, c) = tokio::join!(
            client.get_signing_key("K1"),
            client.get_signing_key("K1"),
            client.get_signing_key("K1"),
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert!(c.is_ok());
        assert_eq!(client.cache().len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_kid_is_not_cached() {
        let server = jwks_server(key_set(vec![rsa_jwk("K1", KEY_A_N)]), 2).await;
        let client = JwksClient::new(&jwks_url(&server)).unwrap();

        for _ in 0..2 {
            let result = client.get_signing_key("K9").await;
            assert!(matches!(result, Err(AuthError::KeyRetrieval(_))));
        }
        assert!(client.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_server_error_is_key_retrieval_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        let client = JwksClient::new(&jwks_url(&server)).unwrap();

        let result = client.get_signing_key("K1").await;
        assert!(matches!(result, Err(AuthError::KeyRetrieval(_))));
    }

    #[tokio::test]
    async fn test_invalid_body_is_key_retrieval_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        let client = JwksClient::new(&jwks_url(&server)).unwrap();

        let result = client.get_signing_key("K1").await;
        assert!(matches!(result, Err(AuthError::KeyRetrieval(_))));
    }

    #[tokio::test]
    async fn test_slow_key_set_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(key_set(vec![rsa_jwk("K1", KEY_A_N)]))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;
        let client = JwksClient::builder()
            .endpoint(&jwks_url(&server))
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();

        let result = client.get_signing_key("K1").await;
        assert!(matches!(result, Err(AuthError::KeyRetrieval(_))));
    }
}
