use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::FolioConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["folio.toml", "folio.yaml", "folio.yml", "folio.json"];

/// Env var consulted when `embeddings.api_key` is not set in the file.
const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<FolioConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    let mut config = parse_config(&raw, path)?;
    apply_env_fallbacks(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./folio.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/folio/folio.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `FolioConfig::default()` when nothing is found or the file
/// fails to parse.
pub fn discover_and_load() -> FolioConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    let mut config = FolioConfig::default();
    apply_env_fallbacks(&mut config, |name| std::env::var(name).ok());
    config
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// Returns `~/.config/folio/` on all platforms.
pub fn config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().join(".config").join("folio"))
}

fn apply_env_fallbacks<F>(config: &mut FolioConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if !config.embeddings.has_api_key()
        && let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty())
    {
        debug!(var = API_KEY_ENV, "using embedding API key from environment");
        config.embeddings.api_key = Some(key);
    }
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<FolioConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
