use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, IntiError};
use crate::transport::TaggedClient;

pub const GRANT_CLIENT_CREDENTIALS: &str = "client_credentials";
pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";

/// An OAuth2 token pair as held by the token manager.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub token_type: String,
}

impl Token {
    /// A token is valid when it is non-empty and expires strictly after `now`.
    /// Tokens without a known expiry are never valid.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_empty() {
            return false;
        }
        match self.expiry {
            Some(expiry) => now < expiry,
            None => false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Raw token response from the identity provider.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expiry: Option<DateTime<Utc>>,
    #[serde(default = "default_token_type")]
    token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenResponse {
    fn into_token(self, now: DateTime<Utc>) -> Result<Token, IntiError> {
        let expiry = match self.expires_in {
            Some(secs) => Some(
                chrono::TimeDelta::try_seconds(secs)
                    .and_then(|lifetime| now.checked_add_signed(lifetime))
                    .ok_or_else(|| {
                        IntiError::InvalidArgument(format!(
                            "Token response has out of range expires_in {secs}"
                        ))
                    })?,
            ),
            None => self.expiry,
        };
        Ok(Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            expiry,
            token_type: self.token_type,
        })
    }
}

/// One grant request against the token endpoint.
#[derive(Debug, Clone)]
pub enum GrantRequest<'a> {
    ClientCredentials { scopes: &'a [String] },
    AuthorizationCode { code: &'a str, redirect_uri: &'a str },
    RefreshToken { refresh_token: &'a str },
}

impl GrantRequest<'_> {
    pub fn grant_type(&self) -> &'static str {
        match self {
            GrantRequest::ClientCredentials { .. } => GRANT_CLIENT_CREDENTIALS,
            GrantRequest::AuthorizationCode { .. } => GRANT_AUTHORIZATION_CODE,
            GrantRequest::RefreshToken { .. } => GRANT_REFRESH_TOKEN,
        }
    }

    fn form(&self, client_id: &str, client_secret: &str) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("grant_type", self.grant_type().to_string()),
            ("client_id", client_id.to_string()),
            ("client_secret", client_secret.to_string()),
        ];
        match self {
            GrantRequest::ClientCredentials { scopes } => {
                if !scopes.is_empty() {
                    form.push(("scope", scopes.join(" ")));
                }
            }
            GrantRequest::AuthorizationCode { code, redirect_uri } => {
                form.push(("code", code.to_string()));
                form.push(("redirect_uri", redirect_uri.to_string()));
            }
            GrantRequest::RefreshToken { refresh_token } => {
                form.push(("refresh_token", refresh_token.to_string()));
            }
        }
        form
    }
}

/// POST a grant to the token endpoint and decode the resulting token.
///
/// Every failure is reported as [`AuthError::ExchangeFailed`] wrapping the
/// transport, status or decode cause.
pub async fn exchange(
    http: &TaggedClient,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    grant: GrantRequest<'_>,
) -> Result<Token, AuthError> {
    let grant_type = grant.grant_type();
    request_token(http, token_url, client_id, client_secret, &grant)
        .await
        .map_err(|e| AuthError::exchange_failed(grant_type, e))
}

async fn request_token(
    http: &TaggedClient,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    grant: &GrantRequest<'_>,
) -> Result<Token, IntiError> {
    let request = http
        .inner()
        .post(token_url)
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&grant.form(client_id, client_secret))
        .build()
        .map_err(|e| IntiError::transport("Could not build token request", e))?;

    let response = http
        .execute(request, None)
        .await
        .map_err(|e| IntiError::transport("Token request failed", e))?;

    if response.status.as_u16() > 399 {
        return Err(IntiError::HttpStatus {
            status: response.status.as_u16(),
            url: token_url.to_string(),
        });
    }

    let token_resp: TokenResponse = serde_json::from_slice(&response.body)
        .map_err(|e| IntiError::decode("Failed to parse token response", e))?;

    token_resp.into_token(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(access: &str, expiry: Option<DateTime<Utc>>) -> Token {
        Token {
            access_token: access.into(),
            refresh_token: None,
            expiry,
            token_type: "Bearer".into(),
        }
    }

    #[test]
    fn token_valid_before_expiry() {
        let now = Utc::now();
        assert!(token("a", Some(now + chrono::Duration::hours(1))).is_valid_at(now));
    }

    #[test]
    fn token_expiring_now_is_invalid() {
        let now = Utc::now();
        assert!(!token("a", Some(now)).is_valid_at(now));
    }

    #[test]
    fn token_expired_in_past_is_invalid() {
        let now = Utc::now();
        assert!(!token("a", Some(now - chrono::Duration::seconds(1))).is_valid_at(now));
    }

    #[test]
    fn empty_access_token_is_invalid() {
        let now = Utc::now();
        assert!(!token("", Some(now + chrono::Duration::hours(1))).is_valid_at(now));
    }

    #[test]
    fn token_without_expiry_is_invalid() {
        assert!(!token("a", None).is_valid());
    }

    #[test]
    fn empty_refresh_token_is_ignored() {
        let mut t = token("a", None);
        t.refresh_token = Some(String::new());
        assert_eq!(t.refresh_token(), None);
        t.refresh_token = Some("r".into());
        assert_eq!(t.refresh_token(), Some("r"));
    }

    #[test]
    fn token_response_with_expires_in() {
        let json = r#"{
            "access_token": "tok123",
            "expires_in": 3600,
            "token_type": "bearer",
            "scope": "external_api"
        }"#;
        let resp: TokenResponse = serde_json::from_str(json).unwrap();
        let now = Utc::now();
        let token = resp.into_token(now).unwrap();
        assert_eq!(token.access_token, "tok123");
        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.expiry, Some(now + chrono::Duration::seconds(3600)));
        assert!(token.refresh_token.is_none());
    }

    #[test]
    fn token_response_with_absolute_expiry() {
        let json = r#"{
            "access_token": "tok",
            "refresh_token": "ref",
            "expiry": "2030-01-01T00:00:00Z",
            "token_type": "Bearer"
        }"#;
        let resp: TokenResponse = serde_json::from_str(json).unwrap();
        let token = resp.into_token(Utc::now()).unwrap();
        assert_eq!(token.refresh_token.as_deref(), Some("ref"));
        assert_eq!(
            token.expiry.unwrap().to_rfc3339(),
            "2030-01-01T00:00:00+00:00"
        );
    }

    #[test]
    fn out_of_range_expires_in_is_an_error() {
        for secs in ["1000000000000000", "-1000000000000000", "9223372036854775807"] {
            let json = format!(r#"{{"access_token": "t", "expires_in": {secs}}}"#);
            let resp: TokenResponse = serde_json::from_str(&json).unwrap();
            let err = resp.into_token(Utc::now()).unwrap_err();
            assert!(matches!(err, IntiError::InvalidArgument(_)), "{secs}");
        }
    }

    #[tokio::test]
    async fn out_of_range_expires_in_fails_the_exchange() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "t",
                "expires_in": 1000000000000000i64
            })))
            .mount(&server)
            .await;

        let http = TaggedClient::new().unwrap();
        let err = exchange(
            &http,
            &format!("{}/token", server.uri()),
            "foo",
            "bar",
            GrantRequest::RefreshToken { refresh_token: "r" },
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            AuthError::ExchangeFailed {
                grant: "refresh_token",
                ..
            }
        ));
    }

    #[test]
    fn grant_forms_carry_grant_specific_fields() {
        let scopes = vec!["a".to_string(), "b".to_string()];
        let form = GrantRequest::ClientCredentials { scopes: &scopes }.form("foo", "bar");
        assert!(form.contains(&("grant_type", "client_credentials".to_string())));
        assert!(form.contains(&("client_id", "foo".to_string())));
        assert!(form.contains(&("client_secret", "bar".to_string())));
        assert!(form.contains(&("scope", "a b".to_string())));

        let form = GrantRequest::AuthorizationCode {
            code: "XYZ",
            redirect_uri: "http://localhost:1337/",
        }
        .form("foo", "bar");
        assert!(form.contains(&("code", "XYZ".to_string())));
        assert!(form.contains(&("redirect_uri", "http://localhost:1337/".to_string())));

        let form = GrantRequest::RefreshToken { refresh_token: "r1" }.form("foo", "bar");
        assert!(form.contains(&("grant_type", "refresh_token".to_string())));
        assert!(form.contains(&("refresh_token", "r1".to_string())));
    }
}
