use anyhow::Context;
use directories::ProjectDirs;
use phylosync_core::XType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::graph::color::Rgb;
use crate::graph::search::DEFAULT_SEARCH_PALETTE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub backend_url: String,
    /// Where the shell is sent when the config cannot be loaded.
    pub url_on_fail: Option<String>,
    pub debounce_ms: u64,
    /// Unset means no client-side timeout.
    pub request_timeout_secs: Option<u64>,
    /// Treat a bound of exactly 0 as "not supplied".
    pub zero_bound_is_absent: bool,
    pub default_x_type: XType,
    pub palette: Vec<Rgb>,
    /// Upper bound on network messages applied per tick.
    pub channel_drain_limit: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8080".to_string(),
            url_on_fail: None,
            debounce_ms: 250,
            request_timeout_secs: None,
            zero_bound_is_absent: true,
            default_x_type: XType::XDist,
            palette: DEFAULT_SEARCH_PALETTE.to_vec(),
            channel_drain_limit: 512,
        }
    }
}

fn config_file_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "phylosync")?;
    Some(proj.config_dir().join("client.toml"))
}

pub fn load_or_default() -> ClientConfig {
    let Some(path) = config_file_path() else {
        return ClientConfig::default();
    };
    load_or_default_from_path(&path)
}

pub fn load_or_default_from_path(path: &Path) -> ClientConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return ClientConfig::default();
    };
    match toml::from_str::<ClientConfig>(&contents) {
        Ok(cfg) if !cfg.palette.is_empty() => cfg,
        Ok(cfg) => ClientConfig {
            palette: DEFAULT_SEARCH_PALETTE.to_vec(),
            ..cfg
        },
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "invalid client config, using defaults");
            ClientConfig::default()
        }
    }
}

pub fn save(cfg: &ClientConfig) -> anyhow::Result<PathBuf> {
    let Some(path) = config_file_path() else {
        return Err(anyhow::anyhow!("no config directory available"));
    };
    save_to_path(cfg, &path)?;
    Ok(path)
}

fn save_to_path(cfg: &ClientConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let data = toml::to_string_pretty(cfg).context("failed to serialize client config")?;
    fs::write(path, data)
        .with_context(|| format!("failed to write client config {}", path.display()))?;
    Ok(())
}
