use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use inti::oauth::{CallbackAddress, Credentials, GrantKind, Token, TokenCache};
use inti::{ClientOptions, Endpoints};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/connect/token";
pub const AUTH_PATH: &str = "/connect/authorize";
pub const API_PREFIX: &str = "/external";

/// A token endpoint response body.
pub fn token_body(access_token: &str, refresh_token: Option<&str>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 3600,
    });
    if let Some(refresh) = refresh_token {
        body["refresh_token"] = serde_json::Value::String(refresh.to_string());
    }
    body
}

/// Mount a token endpoint answering `grant_type` with `body`, expected `times` times.
#[allow(dead_code)]
pub async fn mount_token(server: &MockServer, grant_type: &str, body: serde_json::Value, times: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains(format!("grant_type={grant_type}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

pub fn endpoints(server: &MockServer) -> Endpoints {
    Endpoints {
        token_url: format!("{}{TOKEN_PATH}", server.uri()),
        auth_url: format!("{}{AUTH_PATH}", server.uri()),
        api_url: format!("{}{API_PREFIX}", server.uri()),
    }
}

/// Client options against the mock server, using an ephemeral loopback callback.
pub fn options(server: &MockServer, grant: GrantKind) -> ClientOptions {
    ClientOptions::new(Credentials {
        client_id: "foo".into(),
        client_secret: "bar".into(),
    })
    .with_endpoints(endpoints(server))
    .with_grant(grant)
    .with_callback(
        CallbackAddress {
            host: "127.0.0.1".into(),
            port: 0,
            path: "/callback".into(),
        },
        Duration::from_secs(5),
    )
}

/// A token that expired a minute ago but still carries a refresh token.
#[allow(dead_code)]
pub fn expired_cache(refresh_token: &str) -> TokenCache {
    TokenCache::from(&Token {
        access_token: "stale".into(),
        refresh_token: Some(refresh_token.into()),
        expiry: Some(Utc::now() - chrono::Duration::minutes(1)),
        token_type: "Bearer".into(),
    })
}

/// Create a temp directory with an inti.json config file.
#[allow(dead_code)]
pub fn temp_config(config: &serde_json::Value) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("inti.json");
    let json = serde_json::to_string_pretty(config).unwrap();
    std::fs::write(&config_path, json).unwrap();
    (dir, config_path)
}
