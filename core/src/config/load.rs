use std::path::{Path, PathBuf};

use anyhow::Context;

use super::types::AppConfig;

pub const ENV_MAX_WORKERS: &str = "DONGOL_MAX_WORKERS";
pub const ENV_POOL: &str = "DONGOL_POOL";
pub const ENV_LOG_LEVEL: &str = "DONGOL_LOG_LEVEL";

/// Get the default dongol data directory: ~/.dongol
pub fn get_dongol_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".dongol"))
}

/// Load configuration with the usual precedence:
/// env overrides > ~/.dongol/config.toml > ./config.toml > defaults.
pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.dongol/config.toml
    let dongol_config = get_dongol_data_dir()?.join("config.toml");

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let mut cfg = if dongol_config.exists() {
        load_from_path(&dongol_config)?
    } else if local_config.exists() {
        load_from_path(local_config)?
    } else {
        AppConfig::default()
    };

    // Environment variable overrides (Priority 0: highest)
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;

    cfg.validate()?;
    Ok(cfg)
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let cfg = toml::from_str::<AppConfig>(&s)
        .map_err(crate::error::ConfigError::from)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(cfg)
}

/// Apply `DONGOL_*` overrides. `lookup` is the environment (injectable for
/// tests). Blank values are ignored.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get(ENV_MAX_WORKERS) {
        cfg.executor.max_workers = v
            .trim()
            .parse()
            .with_context(|| format!("{ENV_MAX_WORKERS} must be a positive integer, got {v:?}"))?;
    }
    if let Some(v) = get(ENV_POOL) {
        cfg.executor.pool = v.parse()?;
    }
    if let Some(v) = get(ENV_LOG_LEVEL) {
        cfg.logging.level = v.trim().to_string();
    }

    Ok(())
}
