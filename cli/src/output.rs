use serde::Serialize;
use taskpilot_core::api::{AppConfig, CliError, RunOutcome};

use crate::commands::cli::OutputFormat;

pub fn render_outcome(outcome: &RunOutcome, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Text => Ok(outcome.final_answer.clone()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outcome)?),
    }
}

#[derive(Debug, Serialize)]
pub struct ToolListing {
    pub name: String,
    pub description: String,
    pub webhook: Option<String>,
}

pub fn tool_listing(cfg: &AppConfig) -> Vec<ToolListing> {
    cfg.tools
        .iter()
        .map(|(name, tool)| ToolListing {
            name: name.clone(),
            description: tool.description.clone(),
            webhook: tool.url.clone().filter(|u| !u.trim().is_empty()),
        })
        .collect()
}

pub fn render_tools(tools: &[ToolListing], format: OutputFormat) -> Result<String, CliError> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(tools)?);
    }
    if tools.is_empty() {
        return Ok("no tools configured".to_string());
    }
    let lines: Vec<String> = tools
        .iter()
        .map(|t| {
            format!(
                "{:<20} {:<8} {}",
                t.name,
                if t.webhook.is_some() { "webhook" } else { "-" },
                t.description
            )
        })
        .collect();
    Ok(lines.join("\n"))
}

/// `sk-or-v1-abcdef1234` -> `sk-or...1234`
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 9 {
        return "***".to_string();
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

pub fn render_config(cfg: &AppConfig) -> Result<String, CliError> {
    let mut masked = cfg.clone();
    masked.planner.api_key = mask_secret(&masked.planner.api_key);
    masked.responder.api_key = mask_secret(&masked.responder.api_key);
    toml::to_string_pretty(&masked).map_err(|e| CliError::Command(e.to_string()))
}
