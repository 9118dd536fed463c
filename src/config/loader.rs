use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::IntiError;
use crate::oauth::{Token, TokenCache};

use super::env::{apply_env_overrides, expand_settings, ENV_CONFIG};
use super::types::Settings;

pub const DEFAULT_CONFIG_FILE: &str = "inti.json";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Code,
    Str,
    StrEscape,
    LineComment,
    BlockComment,
    BlockCommentStar,
}

/// Remove `//` and `/* */` comments outside of string literals.
///
/// Newlines inside comments are kept so parse errors report the right line.
pub fn strip_jsonc_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut state = Scan::Code;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        state = match (state, ch) {
            (Scan::Code, '"') => {
                out.push(ch);
                Scan::Str
            }
            (Scan::Code, '/') if chars.peek() == Some(&'/') => {
                chars.next();
                Scan::LineComment
            }
            (Scan::Code, '/') if chars.peek() == Some(&'*') => {
                chars.next();
                Scan::BlockComment
            }
            (Scan::Code, _) => {
                out.push(ch);
                Scan::Code
            }
            (Scan::Str, '\\') => {
                out.push(ch);
                Scan::StrEscape
            }
            (Scan::Str, '"') => {
                out.push(ch);
                Scan::Code
            }
            (Scan::Str, _) | (Scan::StrEscape, _) => {
                out.push(ch);
                Scan::Str
            }
            (Scan::LineComment, '\n') => {
                out.push('\n');
                Scan::Code
            }
            (Scan::LineComment, _) => Scan::LineComment,
            (Scan::BlockComment | Scan::BlockCommentStar, '\n') => {
                out.push('\n');
                Scan::BlockComment
            }
            (Scan::BlockComment | Scan::BlockCommentStar, '*') => Scan::BlockCommentStar,
            (Scan::BlockCommentStar, '/') => Scan::Code,
            (Scan::BlockComment | Scan::BlockCommentStar, _) => Scan::BlockComment,
        };
    }

    out
}

/// Resolve which config file to use.
///
/// Precedence:
/// 1. `--config` CLI flag (used even if the file does not exist yet)
/// 2. `INTI_CONFIG` env var
/// 3. `./inti.json`
/// 4. `~/.inti/inti.json`
///
/// Falls back to `./inti.json` when nothing exists, so the token cache has
/// somewhere to go.
pub fn discover_config_file(cli_config: Option<&str>) -> PathBuf {
    if let Some(path) = cli_config.filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG) {
        if !env_path.is_empty() {
            return PathBuf::from(env_path);
        }
    }

    let project = PathBuf::from(DEFAULT_CONFIG_FILE);
    if project.exists() {
        return project;
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".inti").join(DEFAULT_CONFIG_FILE);
        if home_config.exists() {
            return home_config;
        }
    }

    project
}

fn parse_config_value(path: &Path, content: &str) -> Result<serde_json::Value, IntiError> {
    serde_json::from_str(&strip_jsonc_comments(content)).map_err(|e| IntiError::Config {
        path: path.to_path_buf(),
        detail: format!("Invalid JSON: {e}"),
    })
}

fn read_config_value(path: &Path) -> Result<serde_json::Value, IntiError> {
    let content = std::fs::read_to_string(path).map_err(|e| IntiError::Config {
        path: path.to_path_buf(),
        detail: format!("Cannot read file: {e}"),
    })?;
    parse_config_value(path, &content)
}

/// Load a single config file, stripping JSONC comments before parsing.
pub fn load_settings_file(path: &Path) -> Result<Settings, IntiError> {
    let value = read_config_value(path)?;
    serde_json::from_value(value).map_err(|e| IntiError::Config {
        path: path.to_path_buf(),
        detail: format!("Invalid settings: {e}"),
    })
}

/// Load settings from the discovered file, then expand variables and apply
/// environment overrides. A missing file yields default settings.
pub fn load_settings(cli_config: Option<&str>) -> Result<(Settings, PathBuf), IntiError> {
    let path = discover_config_file(cli_config);

    let mut settings = if path.exists() {
        let settings = load_settings_file(&path)?;
        tracing::debug!(config = %path.display(), "loaded configuration");
        settings
    } else {
        tracing::debug!(config = %path.display(), "no configuration file, using environment only");
        Settings::default()
    };

    expand_settings(&mut settings)?;
    apply_env_overrides(&mut settings);
    Ok((settings, path))
}

/// Persist `token` into the `cache` section of the config file.
///
/// Only the cache section is rewritten; other values are kept as written
/// (unexpanded), though comments are not preserved. Invalid tokens are
/// refused. The file is locked for the whole read-modify-write, and a file
/// already locked by another process is an error rather than a wait.
pub fn cache_token(path: &Path, token: &Token) -> Result<(), IntiError> {
    if !token.is_valid() {
        return Err(IntiError::InvalidArgument("token is not valid".to_string()));
    }

    let mut lock = fd_lock::RwLock::new(open_private(path)?);
    let mut file = lock.try_write().map_err(|e| IntiError::Config {
        path: path.to_path_buf(),
        detail: format!("Could not lock config file: {e}"),
    })?;

    let mut content = String::new();
    file.read_to_string(&mut content)?;
    let mut root = if content.trim().is_empty() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        parse_config_value(path, &content)?
    };

    let Some(obj) = root.as_object_mut() else {
        return Err(IntiError::Config {
            path: path.to_path_buf(),
            detail: "Top-level value must be an object".to_string(),
        });
    };
    let cache = serde_json::to_value(TokenCache::from(token))
        .map_err(|e| IntiError::decode("could not serialize token cache", e))?;
    obj.insert("cache".to_string(), cache);

    let data = serde_json::to_string_pretty(&root)
        .map_err(|e| IntiError::decode("could not serialize config", e))?;
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;

    tracing::debug!(config = %path.display(), "cached token in configuration");
    Ok(())
}

/// Open (or create) the config file for rewriting, readable by the owner only.
fn open_private(path: &Path) -> Result<std::fs::File, IntiError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut options = std::fs::OpenOptions::new();
    options.read(true).write(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        // Applied at creation, so the token is never readable by others.
        options.mode(0o600);
    }
    let file = options.open(path)?;

    // An existing file keeps its old mode on open.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(file)
}
