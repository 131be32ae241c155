use std::{fs, path::Path, path::PathBuf, time::Duration};

use anyhow::Context;
use serde::Deserialize;

pub const SETTINGS_FILE: &str = "heatviz.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_url: String,
    pub request_timeout_secs: u64,
    pub output_path: PathBuf,
    pub log_filter: String,
    pub frame_duration_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".into(),
            request_timeout_secs: 30,
            output_path: PathBuf::from("heatviz.html"),
            log_filter: "info".into(),
            frame_duration_ms: 100,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    request_timeout_secs: Option<u64>,
    output_path: Option<PathBuf>,
    log_filter: Option<String>,
    frame_duration_ms: Option<u64>,
}

pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then `path` if it exists, then environment overrides read
/// through `env`. A zero request timeout is ignored wherever it appears.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
        if let Some(v) = file_cfg.server_url {
            settings.server_url = v;
        }
        if let Some(v) = file_cfg.request_timeout_secs.filter(|secs| *secs > 0) {
            settings.request_timeout_secs = v;
        }
        if let Some(v) = file_cfg.output_path {
            settings.output_path = v;
        }
        if let Some(v) = file_cfg.log_filter {
            settings.log_filter = v;
        }
        if let Some(v) = file_cfg.frame_duration_ms {
            settings.frame_duration_ms = v;
        }
    }

    if let Some(v) = env("HEATVIZ_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        match v.trim().parse::<u64>() {
            Ok(parsed) if parsed > 0 => settings.request_timeout_secs = parsed,
            _ => {}
        }
    }

    if let Some(v) = env("APP__OUTPUT_PATH") {
        settings.output_path = PathBuf::from(v);
    }

    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if let Some(v) = env("APP__FRAME_DURATION_MS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.frame_duration_ms = parsed;
        }
    }

    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
