pub mod env;
pub mod loader;
pub mod types;

pub use loader::{cache_token, discover_config_file, load_settings, load_settings_file};
pub use types::Settings;
