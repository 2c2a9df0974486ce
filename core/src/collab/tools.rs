use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::graph::NONE_TOOL;
use crate::state::CallerIdentity;

/// One tool invocation issued by the execution engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub run_id: String,
    pub task_id: String,
    pub tool: String,
    pub context: String,
    pub caller: CallerIdentity,
    /// Upper bound the invoker must respect; the engine enforces it too.
    pub timeout: Duration,
}

/// Result of a tool invocation, success or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(default)]
    pub output: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn ok(output: impl Into<serde_json::Value>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: serde_json::Value::Null,
            error: Some(error.into()),
        }
    }
}

/// A capability that performs the work behind a tool id.
///
/// Called at most once per task; implementations report every fault as a
/// failed [`ToolOutcome`] instead of panicking.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    fn name(&self) -> &str;

    async fn invoke(&self, call: &ToolCall) -> ToolOutcome;
}

/// Built-in invoker for the `none` sentinel: succeeds without doing anything.
pub struct NoneToolInvoker;

#[async_trait]
impl ToolInvoker for NoneToolInvoker {
    fn name(&self) -> &str {
        NONE_TOOL
    }

    async fn invoke(&self, _call: &ToolCall) -> ToolOutcome {
        ToolOutcome::ok(serde_json::Value::Null)
    }
}

/// Explicit mapping from tool id to invoker.
///
/// Unregistered ids are reported as a failed outcome, never a crash.
#[derive(Clone)]
pub struct ToolRegistry {
    invokers: HashMap<String, Arc<dyn ToolInvoker>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        let mut invokers: HashMap<String, Arc<dyn ToolInvoker>> = HashMap::new();
        invokers.insert(NONE_TOOL.to_string(), Arc::new(NoneToolInvoker));
        Self { invokers }
    }

    pub fn register(&mut self, tool: impl Into<String>, invoker: Arc<dyn ToolInvoker>) {
        self.invokers.insert(tool.into(), invoker);
    }

    pub fn with(mut self, tool: impl Into<String>, invoker: Arc<dyn ToolInvoker>) -> Self {
        self.register(tool, invoker);
        self
    }

    pub fn contains(&self, tool: &str) -> bool {
        self.invokers.contains_key(tool)
    }

    /// Registered tool ids, sorted.
    pub fn tools(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.invokers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolInvoker for ToolRegistry {
    fn name(&self) -> &str {
        "registry"
    }

    async fn invoke(&self, call: &ToolCall) -> ToolOutcome {
        match self.invokers.get(&call.tool) {
            Some(invoker) => invoker.invoke(call).await,
            None => {
                tracing::warn!(
                    target: "taskpilot.tools",
                    run_id = %call.run_id,
                    task_id = %call.task_id,
                    tool = %call.tool,
                    "no invoker registered"
                );
                ToolOutcome::failed(format!("no invoker registered for tool '{}'", call.tool))
            }
        }
    }
}
