use eyre::{Context, eyre};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// Base URL of the backend, e.g. `http://localhost:8000`.
    pub server_url: String,
    pub dark_mode: bool,
    pub font_size: f32,
    pub show_timestamps: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            dark_mode: true,
            font_size: 14.0,
            show_timestamps: false,
        }
    }
}

fn get_config_path() -> Result<PathBuf, eyre::Report> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| eyre!("Could not find a config directory"))?
        .join(env!("CARGO_PKG_NAME"));

    Ok(config_dir.join("app_config.toml"))
}

pub async fn load() -> Result<Config, eyre::Report> {
    let user_config_path = get_config_path()?;
    tracing::info!("Loading user config from {:?}", user_config_path);

    let config: Config = Figment::new()
        .merge(Toml::file(&user_config_path))
        .merge(Env::prefixed("PARLANCE_"))
        .extract()
        .context("Could not load config")?;

    if !user_config_path.exists() {
        if let Err(e) = save(&config).await {
            tracing::warn!("Failed to save initial config: {}", e);
        }
    }

    Ok(config)
}

pub async fn save(config: &Config) -> Result<(), eyre::Report> {
    let path = get_config_path()?;
    tracing::info!("Saving config to {:?}", path);

    let bytes = toml::to_string_pretty(config).context("Failed to serialize config")?;

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }
    }

    let mut file = tokio::fs::File::create(path)
        .await
        .context("Failed to create config file")?;

    file.write_all(bytes.as_bytes())
        .await
        .context("Failed to write config to file")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn toml_round_trip_keeps_every_field() {
        let config = Config {
            server_url: "https://chat.example.org".to_string(),
            dark_mode: false,
            font_size: 18.0,
            show_timestamps: true,
        };
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.server_url, config.server_url);
        assert_eq!(parsed.dark_mode, config.dark_mode);
        assert_eq!(parsed.font_size, config.font_size);
        assert_eq!(parsed.show_timestamps, config.show_timestamps);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: Config = toml::from_str("dark_mode = false\n").unwrap();
        assert_eq!(parsed.server_url, Config::default().server_url);
        assert!(!parsed.dark_mode);
    }
}
