use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "fishmonger.toml";

fn default_api_base() -> String {
    "https://api.moltin.com".into()
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("images")
}

/// Process configuration: TOML file plus environment overrides.
///
/// The file is optional — a deployment that sets every `TG_*`/`MOLTIN_*`
/// variable needs no file at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub commerce: CommerceConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token from BotFather.
    #[serde(default)]
    pub bot_token: String,
    /// Chat that receives operator notifications (startup, crashes).
    #[serde(default)]
    pub admin_chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommerceConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            client_id: String::new(),
            client_secret: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Directory where product photos are cached.
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            images_dir: default_images_dir(),
        }
    }
}

impl Config {
    /// Load from `path` (or `fishmonger.toml` if unset), then apply
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            toml::from_str(&raw)
                .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("TG_BOT_TOKEN")
            && !token.is_empty()
        {
            self.telegram.bot_token = token;
        }

        if let Ok(chat_id) = std::env::var("TG_ADMIN_CHAT_ID")
            && !chat_id.is_empty()
        {
            self.telegram.admin_chat_id = chat_id;
        }

        if let Ok(client_id) = std::env::var("MOLTIN_CLIENT_ID")
            && !client_id.is_empty()
        {
            self.commerce.client_id = client_id;
        }

        if let Ok(secret) = std::env::var("MOLTIN_SECRET_KEY")
            && !secret.is_empty()
        {
            self.commerce.client_secret = secret;
        }

        if let Ok(base) = std::env::var("MOLTIN_API_BASE")
            && !base.is_empty()
        {
            self.commerce.api_base = base;
        }

        if let Ok(dir) = std::env::var("FISHMONGER_IMAGES_DIR")
            && !dir.is_empty()
        {
            self.assets.images_dir = PathBuf::from(dir);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram.bot_token is empty".into()));
        }
        if self.commerce.client_id.is_empty() {
            return Err(ConfigError::Validation("commerce.client_id is empty".into()));
        }
        if self.commerce.client_secret.is_empty() {
            return Err(ConfigError::Validation(
                "commerce.client_secret is empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard};

    // Env-var tests share process state; serialize them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_guard() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn clear_env() {
        for key in [
            "TG_BOT_TOKEN",
            "TG_ADMIN_CHAT_ID",
            "MOLTIN_CLIENT_ID",
            "MOLTIN_SECRET_KEY",
            "MOLTIN_API_BASE",
            "FISHMONGER_IMAGES_DIR",
        ] {
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    fn parses_full_toml() {
        let raw = r#"
            [telegram]
            bot_token = "123:ABC"
            admin_chat_id = "42"

            [commerce]
            client_id = "cid"
            client_secret = "sec"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.telegram.bot_token, "123:ABC");
        assert_eq!(config.commerce.api_base, "https://api.moltin.com");
        assert_eq!(config.assets.images_dir, PathBuf::from("images"));
    }

    #[test]
    fn env_overrides_beat_file_values() {
        let _guard = env_guard();
        clear_env();

        let mut config: Config = toml::from_str(
            r#"
            [telegram]
            bot_token = "from-file"
        "#,
        )
        .unwrap();

        unsafe {
            std::env::set_var("TG_BOT_TOKEN", "from-env");
            std::env::set_var("MOLTIN_API_BASE", "http://localhost:9999");
        }
        config.apply_env_overrides();
        clear_env();

        assert_eq!(config.telegram.bot_token, "from-env");
        assert_eq!(config.commerce.api_base, "http://localhost:9999");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let _guard = env_guard();
        clear_env();

        let mut config = Config::default();
        config.telegram.bot_token = "kept".into();
        unsafe { std::env::set_var("TG_BOT_TOKEN", "") };
        config.apply_env_overrides();
        clear_env();

        assert_eq!(config.telegram.bot_token, "kept");
    }

    #[test]
    fn validation_rejects_missing_credentials() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.telegram.bot_token = "t".into();
        config.commerce.client_id = "id".into();
        config.commerce.client_secret = "secret".into();
        assert!(config.validate().is_ok());
    }
}
