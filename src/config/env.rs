use crate::error::IntiError;

use super::types::Settings;

pub const ENV_CONFIG: &str = "INTI_CONFIG";
pub const ENV_CLIENT_ID: &str = "INTI_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "INTI_CLIENT_SECRET";
pub const ENV_TOKEN_URL: &str = "INTI_TOKEN_URL";
pub const ENV_AUTH_URL: &str = "INTI_AUTH_URL";
pub const ENV_API_URL: &str = "INTI_API_URL";
pub const ENV_LOG_LEVEL: &str = "INTI_LOG_LEVEL";

/// Expand environment variable references in a string.
///
/// Supported syntaxes:
/// - `${VAR}` - replaced with env var value; error if unset
/// - `${VAR:-fallback}` - replaced with env var value, or fallback if unset or empty
pub fn expand_env_vars(input: &str) -> Result<String, IntiError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }

        chars.next(); // consume '{'
        let mut var_expr = String::new();
        let mut found_close = false;
        for c in chars.by_ref() {
            if c == '}' {
                found_close = true;
                break;
            }
            var_expr.push(c);
        }
        if !found_close {
            return Err(env_error(&format!(
                "Unclosed variable reference: ${{{}",
                var_expr
            )));
        }

        match var_expr.split_once(":-") {
            Some((var_name, fallback)) => match std::env::var(var_name) {
                Ok(val) if !val.is_empty() => result.push_str(&val),
                _ => result.push_str(fallback),
            },
            None => match std::env::var(&var_expr) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    return Err(env_error(&format!(
                        "Environment variable '{}' is not set",
                        var_expr
                    )));
                }
            },
        }
    }

    Ok(result)
}

/// Expand variable references in the credential and endpoint fields.
pub fn expand_settings(settings: &mut Settings) -> Result<(), IntiError> {
    settings.auth.client_id = expand_env_vars(&settings.auth.client_id)?;
    settings.auth.client_secret = expand_env_vars(&settings.auth.client_secret)?;
    for url in [
        &mut settings.endpoints.token_url,
        &mut settings.endpoints.auth_url,
        &mut settings.endpoints.api_url,
    ]
    .into_iter()
    .flatten()
    {
        *url = expand_env_vars(url)?;
    }
    Ok(())
}

/// Apply `INTI_*` environment overrides on top of the file values.
pub fn apply_env_overrides(settings: &mut Settings) {
    let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

    if let Some(id) = var(ENV_CLIENT_ID) {
        settings.auth.client_id = id;
    }
    if let Some(secret) = var(ENV_CLIENT_SECRET) {
        settings.auth.client_secret = secret;
    }
    if let Some(url) = var(ENV_TOKEN_URL) {
        settings.endpoints.token_url = Some(url);
    }
    if let Some(url) = var(ENV_AUTH_URL) {
        settings.endpoints.auth_url = Some(url);
    }
    if let Some(url) = var(ENV_API_URL) {
        settings.endpoints.api_url = Some(url);
    }
}

fn env_error(detail: &str) -> IntiError {
    IntiError::Config {
        path: std::path::PathBuf::from("<env>"),
        detail: detail.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_dollar_brace_var() {
        std::env::set_var("INTI_TEST_VAR1", "hello");
        let result = expand_env_vars("prefix-${INTI_TEST_VAR1}-suffix").unwrap();
        assert_eq!(result, "prefix-hello-suffix");
        std::env::remove_var("INTI_TEST_VAR1");
    }

    #[test]
    fn expand_dollar_brace_unset_errors() {
        std::env::remove_var("INTI_TEST_UNSET_XYZ");
        let err = expand_env_vars("${INTI_TEST_UNSET_XYZ}").unwrap_err();
        assert!(err.to_string().contains("INTI_TEST_UNSET_XYZ"));
        assert!(err.to_string().contains("not set"));
    }

    #[test]
    fn expand_fallback_when_unset_or_empty() {
        std::env::remove_var("INTI_TEST_FB_UNSET");
        assert_eq!(
            expand_env_vars("${INTI_TEST_FB_UNSET:-default_val}").unwrap(),
            "default_val"
        );
        std::env::set_var("INTI_TEST_FB_EMPTY", "");
        assert_eq!(
            expand_env_vars("${INTI_TEST_FB_EMPTY:-fallback}").unwrap(),
            "fallback"
        );
        std::env::remove_var("INTI_TEST_FB_EMPTY");
    }

    #[test]
    fn unclosed_reference_errors() {
        let err = expand_env_vars("${OOPS").unwrap_err();
        assert!(err.to_string().contains("Unclosed"));
    }

    #[test]
    fn plain_dollar_is_kept() {
        assert_eq!(expand_env_vars("pa$$word").unwrap(), "pa$$word");
        assert_eq!(expand_env_vars("no vars here").unwrap(), "no vars here");
    }

    #[test]
    fn expand_settings_covers_credentials_and_endpoints() {
        std::env::set_var("INTI_TEST_SECRET", "s3cret");
        std::env::set_var("INTI_TEST_HOST", "http://localhost:9999");
        let mut settings = Settings::default();
        settings.auth.client_id = "plain".into();
        settings.auth.client_secret = "${INTI_TEST_SECRET}".into();
        settings.endpoints.api_url = Some("${INTI_TEST_HOST}/external".into());
        expand_settings(&mut settings).unwrap();
        assert_eq!(settings.auth.client_id, "plain");
        assert_eq!(settings.auth.client_secret, "s3cret");
        assert_eq!(
            settings.endpoints.api_url.as_deref(),
            Some("http://localhost:9999/external")
        );
        assert!(settings.endpoints.token_url.is_none());
        std::env::remove_var("INTI_TEST_SECRET");
        std::env::remove_var("INTI_TEST_HOST");
    }

    #[test]
    fn env_overrides_replace_file_values() {
        std::env::set_var(ENV_CLIENT_ID, "from-env");
        std::env::set_var(ENV_TOKEN_URL, "http://localhost:1/token");
        std::env::set_var(ENV_CLIENT_SECRET, "");
        let mut settings = Settings::default();
        settings.auth.client_id = "from-file".into();
        settings.auth.client_secret = "file-secret".into();
        apply_env_overrides(&mut settings);
        std::env::remove_var(ENV_CLIENT_ID);
        std::env::remove_var(ENV_TOKEN_URL);
        std::env::remove_var(ENV_CLIENT_SECRET);

        assert_eq!(settings.auth.client_id, "from-env");
        // Empty variables do not override.
        assert_eq!(settings.auth.client_secret, "file-secret");
        assert_eq!(
            settings.endpoints.token_url.as_deref(),
            Some("http://localhost:1/token")
        );
    }
}
