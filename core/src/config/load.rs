use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default taskpilot data directory: ~/.taskpilot
pub fn get_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".taskpilot"))
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read {} failed: {e}", path.display()))?;
    let mut cfg = toml::from_str::<AppConfig>(&s)?;
    cfg.normalize();
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.taskpilot/config.toml
    let user_config = get_data_dir()?.join("config.toml");

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    if user_config.exists() {
        return load_from_path(&user_config);
    }
    if local_config.exists() {
        return load_from_path(local_config);
    }

    let mut cfg = AppConfig::default();
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

/// Environment variable overrides (highest priority).
///
/// `lookup` is injectable so tests do not touch the process environment.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = get("TASKPILOT_PLANNER_API_KEY").or_else(|| get("OPENROUTER_API_KEY")) {
        cfg.planner.api_key = key;
    }
    if let Some(key) = get("TASKPILOT_RESPONDER_API_KEY").or_else(|| get("OPENROUTER_API_KEY")) {
        cfg.responder.api_key = key;
    }
    if let Some(model) = get("TASKPILOT_PLANNER_MODEL") {
        cfg.planner.model = model;
    }
    if let Some(model) = get("TASKPILOT_RESPONDER_MODEL") {
        cfg.responder.model = model;
    }
    if let Some(level) = get("TASKPILOT_LOG_LEVEL") {
        cfg.logging.level = level;
    }

    for (name, tool) in cfg.tools.iter_mut() {
        if let Some(url) = get(&tool_url_env_key(name)) {
            tool.url = Some(url);
        }
    }
}

/// `Kalender-Agent` -> `TASKPILOT_TOOL_KALENDER_AGENT_URL`
fn tool_url_env_key(tool: &str) -> String {
    let normalized: String = tool
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("TASKPILOT_TOOL_{normalized}_URL")
}
