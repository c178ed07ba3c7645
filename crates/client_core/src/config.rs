use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "client.toml";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Origin of the chat server; always an `http(s)` URL once loaded.
    pub server_url: String,
    pub event_channel_capacity: usize,
    pub request_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            event_channel_capacity: 256,
            request_timeout_secs: 10,
        }
    }
}

impl ClientSettings {
    pub fn server_url(&self) -> anyhow::Result<Url> {
        parse_server_url(&self.server_url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    event_channel_capacity: Option<usize>,
    request_timeout_secs: Option<u64>,
}

/// Defaults, then `client.toml` (or `path`), then `APP__*` environment
/// variables.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<ClientSettings> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_SETTINGS_FILE));
    let mut settings = ClientSettings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("invalid settings file '{}'", path.display()))?;
        apply_file(&mut settings, file_cfg)?;
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut ClientSettings, file_cfg: FileSettings) -> anyhow::Result<()> {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = parse_server_url(&v)?.to_string();
    }
    if let Some(v) = file_cfg.event_channel_capacity {
        settings.event_channel_capacity = v.max(1);
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    Ok(())
}

fn apply_env(
    settings: &mut ClientSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = parse_server_url(&v)?.to_string();
    }
    if let Some(v) = lookup("APP__EVENT_CHANNEL_CAPACITY") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.event_channel_capacity = parsed.max(1);
        }
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
    Ok(())
}

pub fn parse_server_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid server url '{raw}'"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => anyhow::bail!("server url must use http or https, got '{other}'"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
