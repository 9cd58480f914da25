use anyhow::{Context, Result, anyhow};
use std::{fs, path::Path};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/tubefetch-env";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HOST: &str = "0.0.0.0";

pub const API_KEY_VAR: &str = "YOUTUBE_API_KEY";
pub const PORT_VAR: &str = "TUBEFETCH_PORT";
pub const HOST_VAR: &str = "TUBEFETCH_HOST";

#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub api_key: Option<String>,
    pub port: Option<u16>,
    pub host: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub port: u16,
    pub host: String,
}

pub fn read_env_file(path: &Path) -> Result<Option<EnvConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let mut cfg = EnvConfig::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value_raw)) = trimmed.split_once('=') {
            let value = value_raw.trim().trim_matches('"');
            match key.trim() {
                API_KEY_VAR => {
                    if !value.is_empty() {
                        cfg.api_key = Some(value.to_string());
                    }
                }
                PORT_VAR => {
                    let port: u16 = value.parse().with_context(|| {
                        format!("Parsing {} from {}", PORT_VAR, path.display())
                    })?;
                    cfg.port = Some(port);
                }
                HOST_VAR => {
                    if !value.is_empty() {
                        cfg.host = Some(value.to_string());
                    }
                }
                _ => {}
            }
        }
    }
    Ok(Some(cfg))
}

pub fn process_env_config() -> Result<EnvConfig> {
    let port = match env_var(PORT_VAR) {
        Some(raw) => Some(
            raw.parse()
                .with_context(|| format!("Parsing {} from the environment", PORT_VAR))?,
        ),
        None => None,
    };
    Ok(EnvConfig {
        api_key: env_var(API_KEY_VAR),
        port,
        host: env_var(HOST_VAR),
    })
}

// Process environment wins over file values, matching dotenv layering.
pub fn resolve_config(env: EnvConfig, file: EnvConfig) -> Result<AppConfig> {
    let api_key = env.api_key.or(file.api_key).ok_or_else(|| {
        anyhow!(
            "{} not set in the environment or the config file",
            API_KEY_VAR
        )
    })?;
    let port = env.port.or(file.port).unwrap_or(DEFAULT_PORT);
    let host = env
        .host
        .or(file.host)
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    Ok(AppConfig {
        api_key,
        port,
        host,
    })
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(Path::new(DEFAULT_CONFIG_PATH))
}

pub fn load_config_from(path: impl AsRef<Path>) -> Result<AppConfig> {
    let file = read_env_file(path.as_ref())?.unwrap_or_default();
    let env = process_env_config()?;
    resolve_config(env, file)
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}
