use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::collab::ToolDescriptor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(
        default = "LlmConfig::planner_default",
        deserialize_with = "deserialize_planner"
    )]
    pub planner: LlmConfig,

    #[serde(
        default = "LlmConfig::responder_default",
        deserialize_with = "deserialize_responder"
    )]
    pub responder: LlmConfig,

    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Tool catalog keyed by tool id.
    #[serde(default)]
    pub tools: BTreeMap<String, ToolConfig>,

    #[serde(default)]
    pub trace: TraceConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            scheduler: SchedulerConfig::default(),
            planner: LlmConfig::planner_default(),
            responder: LlmConfig::responder_default(),
            assistant: AssistantConfig::default(),
            tools: BTreeMap::new(),
            trace: TraceConfig::default(),
        }
    }
}

impl AppConfig {
    /// Fill fields a partial config file may leave blank.
    pub fn normalize(&mut self) {
        if self.planner.model.trim().is_empty() {
            self.planner.model = LlmConfig::planner_default().model;
        }
        if self.responder.model.trim().is_empty() {
            self.responder.model = LlmConfig::responder_default().model;
        }
    }

    /// Catalog presented to the planner, in tool-id order.
    pub fn tool_catalog(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|(name, tool)| tool.descriptor(name))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_true")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "taskpilot_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            console: true,
            file: false,
            level: default_logging_level(),
            format: LogFormat::default(),
            directory: None,
        }
    }
}

/// Bounds enforced by the run controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Failed tasks trigger replanning only while the replan counter is
    /// below this value.
    #[serde(default = "default_replan_ceiling")]
    pub replan_ceiling: u32,

    #[serde(default = "default_tool_timeout_ms")]
    pub tool_timeout_ms: u64,

    #[serde(default = "default_planner_timeout_ms")]
    pub planner_timeout_ms: u64,

    #[serde(default = "default_responder_timeout_ms")]
    pub responder_timeout_ms: u64,

    /// Conversation messages shown to the LLM collaborators.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_replan_ceiling() -> u32 {
    2
}

fn default_tool_timeout_ms() -> u64 {
    30_000
}

fn default_planner_timeout_ms() -> u64 {
    90_000
}

fn default_responder_timeout_ms() -> u64 {
    60_000
}

fn default_history_window() -> usize {
    10
}

impl SchedulerConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout_ms)
    }

    pub fn planner_timeout(&self) -> Duration {
        Duration::from_millis(self.planner_timeout_ms)
    }

    pub fn responder_timeout(&self) -> Duration {
        Duration::from_millis(self.responder_timeout_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            replan_ceiling: default_replan_ceiling(),
            tool_timeout_ms: default_tool_timeout_ms(),
            planner_timeout_ms: default_planner_timeout_ms(),
            responder_timeout_ms: default_responder_timeout_ms(),
            history_window: default_history_window(),
        }
    }
}

/// OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_llm_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_llm_timeout_ms() -> u64 {
    120_000
}

impl LlmConfig {
    pub fn planner_default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: String::new(),
            model: "anthropic/claude-sonnet-4.5".to_string(),
            temperature: 0.3,
            timeout_ms: default_llm_timeout_ms(),
        }
    }

    pub fn responder_default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: String::new(),
            model: "google/gemini-2.5-flash".to_string(),
            temperature: 0.7,
            timeout_ms: 60_000,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::planner_default()
    }
}

/// A `[planner]`/`[responder]` table as written; absent keys fall back to
/// that role's defaults rather than the shared field defaults.
#[derive(Deserialize)]
struct LlmSection {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout_ms: Option<u64>,
}

impl LlmSection {
    fn over(self, base: LlmConfig) -> LlmConfig {
        LlmConfig {
            base_url: self.base_url.unwrap_or(base.base_url),
            api_key: self.api_key.unwrap_or(base.api_key),
            model: self.model.unwrap_or(base.model),
            temperature: self.temperature.unwrap_or(base.temperature),
            timeout_ms: self.timeout_ms.unwrap_or(base.timeout_ms),
        }
    }
}

fn deserialize_planner<'de, D: Deserializer<'de>>(d: D) -> Result<LlmConfig, D::Error> {
    LlmSection::deserialize(d).map(|s| s.over(LlmConfig::planner_default()))
}

fn deserialize_responder<'de, D: Deserializer<'de>>(d: D) -> Result<LlmConfig, D::Error> {
    LlmSection::deserialize(d).map(|s| s.over(LlmConfig::responder_default()))
}

/// Flavor text for the LLM prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_persona")]
    pub persona: String,

    /// Optional language/tone hint appended to prompts.
    #[serde(default)]
    pub locale_hint: Option<String>,
}

fn default_persona() -> String {
    "a helpful personal assistant".to_string()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            persona: default_persona(),
            locale_hint: None,
        }
    }
}

/// One entry of the tool catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Webhook endpoint. Tools without one are still planned but fail
    /// at invocation time.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub capabilities: Vec<String>,

    #[serde(default)]
    pub use_when: Option<String>,

    #[serde(default)]
    pub important: Option<String>,

    #[serde(default)]
    pub example_input: Option<String>,

    /// Payload field carrying the context string.
    #[serde(default = "default_input_field")]
    pub input_field: String,

    /// Add the caller's `user_id` to the payload.
    #[serde(default)]
    pub send_caller: bool,
}

fn default_input_field() -> String {
    "query".to_string()
}

impl ToolConfig {
    pub fn descriptor(&self, name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: self.description.clone(),
            capabilities: self.capabilities.clone(),
            use_when: self.use_when.clone(),
            important: self.important.clone(),
            example_input: self.example_input.clone(),
        }
    }
}

/// JSONL run trace sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    #[serde(default)]
    pub enabled: bool,
    /// File path, or `stdout:`.
    #[serde(default = "default_trace_path")]
    pub path: String,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_true")]
    pub drop_when_full: bool,
}

fn default_trace_path() -> String {
    "./run.trace.jsonl".to_string()
}

fn default_channel_capacity() -> usize {
    2048
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_trace_path(),
            channel_capacity: default_channel_capacity(),
            drop_when_full: true,
        }
    }
}
