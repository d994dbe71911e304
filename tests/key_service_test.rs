//! Integration tests for the HTTP key provider

use serde_json::json;
use sunstorm::core::keys::{KeyProvider, KeyQuery};
use sunstorm::error::KeyError;
use sunstorm::infra::key_service::HttpKeyProvider;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IV: &str = "0123456789abcdef0123456789abcdef";
const KEY: &str = "fedcba9876543210fedcba9876543210fedcba9876543210fedcba9876543210";

fn query() -> KeyQuery {
    KeyQuery {
        identifier: "iPhone9,3".to_string(),
        board: "d101ap".to_string(),
        build: "18A373".to_string(),
    }
}

#[tokio::test]
async fn test_keys_for_both_loaders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/iPhone9,3/d101ap/18A373"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keys": [
                {"image": "iBSS", "iv": IV, "key": KEY},
                {"image": "iBEC", "iv": KEY, "key": IV},
                {"image": "KernelCache", "iv": "", "key": ""}
            ]
        })))
        .mount(&server)
        .await;

    let keys = HttpKeyProvider::with_url(&server.uri(), 5)
        .loader_keys(&query())
        .await
        .unwrap();

    assert_eq!(keys.ibss(), Some(format!("{IV}{KEY}")));
    assert_eq!(keys.ibec(), Some(format!("{KEY}{IV}")));
    assert!(keys.is_complete());
}

#[tokio::test]
async fn test_unknown_device_yields_empty_keys() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let keys = HttpKeyProvider::with_url(&server.uri(), 5)
        .loader_keys(&query())
        .await
        .unwrap();

    assert!(!keys.is_complete());
    assert_eq!(keys.ibss(), None);
}

#[tokio::test]
async fn test_non_hex_values_are_discarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keys": [
                {"image": "iBSS", "iv": "Unknown", "key": KEY},
                {"image": "iBEC", "iv": IV, "key": KEY}
            ]
        })))
        .mount(&server)
        .await;

    let keys = HttpKeyProvider::with_url(&server.uri(), 5)
        .loader_keys(&query())
        .await
        .unwrap();

    assert_eq!(keys.ibss(), None);
    assert!(keys.ibec().is_some());
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = HttpKeyProvider::with_url(&server.uri(), 5)
        .loader_keys(&query())
        .await
        .unwrap_err();

    assert!(matches!(err, KeyError::Decode { .. }));
}

#[tokio::test]
async fn test_unreachable_service_is_request_error() {
    let err = HttpKeyProvider::with_url("http://127.0.0.1:9", 1)
        .loader_keys(&query())
        .await
        .unwrap_err();

    assert!(matches!(err, KeyError::Request { .. }));
}
