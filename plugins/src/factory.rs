use std::sync::Arc;

use anyhow::Result;

use taskpilot_core::api::{
    AppConfig, Planner, Responder, RunController, ToolInvoker, ToolRegistry, TraceTx,
};

use crate::llm::{LlmPlanner, LlmResponder};
use crate::tools::WebhookToolInvoker;

pub fn build_planner(cfg: &AppConfig) -> Result<Arc<dyn Planner>> {
    Ok(Arc::new(LlmPlanner::new(
        &cfg.planner,
        &cfg.assistant,
        cfg.scheduler.history_window,
    )?))
}

pub fn build_responder(cfg: &AppConfig) -> Result<Arc<dyn Responder>> {
    Ok(Arc::new(LlmResponder::new(
        &cfg.responder,
        &cfg.assistant,
        cfg.scheduler.history_window,
    )?))
}

/// Registry with one webhook invoker per configured tool that has a URL.
/// Catalog entries without one stay unregistered and fail when invoked.
pub fn build_tool_registry(cfg: &AppConfig) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for (name, tool) in &cfg.tools {
        match WebhookToolInvoker::from_config(name, tool, cfg.scheduler.tool_timeout())? {
            Some(invoker) => registry.register(name.clone(), Arc::new(invoker)),
            None => tracing::warn!(
                target: "taskpilot.tools",
                tool = %name,
                "tool has no webhook url; invocations will fail"
            ),
        }
    }
    Ok(registry)
}

pub fn build_controller(cfg: &AppConfig, trace: Option<TraceTx>) -> Result<RunController> {
    let tools: Arc<dyn ToolInvoker> = Arc::new(build_tool_registry(cfg)?);
    Ok(
        RunController::new(build_planner(cfg)?, tools, build_responder(cfg)?)
            .with_catalog(cfg.tool_catalog())
            .with_limits(cfg.scheduler.clone())
            .with_trace(trace),
    )
}
