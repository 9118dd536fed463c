use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum IntiError {
    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    HttpStatus { status: u16, url: String },

    #[error("{context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Error in config {}: {detail}", path.display())]
    Config { path: PathBuf, detail: String },

    #[error("No {0} provided. Set it in the config file or the environment")]
    MissingCredential(&'static str),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the OAuth2 token lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Timed out waiting for the authorization callback after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Callback state does not match the authorization request")]
    StateMismatch,

    #[error("Authorization callback carried an empty code")]
    EmptyCode,

    #[error("{}", format_denied(.error, .description.as_deref()))]
    Denied {
        error: String,
        description: Option<String>,
    },

    #[error("Could not exchange {grant} grant: {source}")]
    ExchangeFailed {
        grant: &'static str,
        #[source]
        source: Box<IntiError>,
    },

    #[error("Callback listener failed: {0}")]
    Listener(#[from] std::io::Error),
}

fn format_denied(error: &str, description: Option<&str>) -> String {
    match description {
        Some(d) => format!("Authorization denied by provider: {error} ({d})"),
        None => format!("Authorization denied by provider: {error}"),
    }
}

impl AuthError {
    pub fn exchange_failed(grant: &'static str, source: IntiError) -> Self {
        AuthError::ExchangeFailed {
            grant,
            source: Box::new(source),
        }
    }
}

impl IntiError {
    pub fn transport(context: impl Into<String>, source: reqwest::Error) -> Self {
        IntiError::Transport {
            context: context.into(),
            source,
        }
    }

    pub fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        IntiError::Decode {
            context: context.into(),
            source,
        }
    }

    /// Error code string for structured JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            IntiError::Transport { .. } => "transport_error",
            IntiError::HttpStatus { .. } => "http_status",
            IntiError::Decode { .. } => "decode_error",
            IntiError::Auth(e) => match e {
                AuthError::Timeout(_) => "auth_timeout",
                AuthError::StateMismatch => "auth_state_mismatch",
                AuthError::EmptyCode => "auth_empty_code",
                AuthError::Denied { .. } => "auth_denied",
                AuthError::ExchangeFailed { .. } => "auth_exchange_failed",
                AuthError::Listener(_) => "auth_listener",
            },
            IntiError::Config { .. } => "config_error",
            IntiError::MissingCredential(_) => "config_error",
            IntiError::InvalidArgument(_) => "invalid_argument",
            IntiError::Io(_) => "io_error",
        }
    }

    /// HTTP status carried by this error, looking through failed exchanges.
    pub fn status(&self) -> Option<u16> {
        match self {
            IntiError::HttpStatus { status, .. } => Some(*status),
            IntiError::Auth(AuthError::ExchangeFailed { source, .. }) => source.status(),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        if let Some(status) = self.status() {
            obj.insert("status".into(), serde_json::Value::from(status));
        }
        obj.insert("message".into(), serde_json::Value::String(self.to_string()));
        obj.insert("code".into(), serde_json::Value::String(self.code().to_string()));
        serde_json::json!({ "error": obj })
    }
}
