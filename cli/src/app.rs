use std::path::Path;

use taskpilot_core::api::{
    start_trace, AppConfig, CallerIdentity, CliError, ErrorCode, RunOutcome, RunRequest,
    RunStatus,
};
use taskpilot_plugins::factory;

use crate::commands::cli::{RunArgs, ToolsArgs};
use crate::history::load_history;
use crate::output::{render_config, render_outcome, render_tools, tool_listing};


pub async fn run_command(cfg: &AppConfig, args: RunArgs) -> Result<i32, CliError> {
    let conversation = match args.history.as_deref() {
        Some(path) => load_history(Path::new(path))?,
        None => Vec::new(),
    };

    let trace = start_trace(&cfg.trace).await.map_err(CliError::Command)?;
    let (trace_tx, trace_handle) = match trace {
        Some((tx, handle)) => (Some(tx), Some(handle)),
        None => (None, None),
    };

    let controller = factory::build_controller(cfg, trace_tx)?;

    let mut request = RunRequest::new(args.message)
        .with_caller(CallerIdentity {
            user_id: args.user_id,
            channel_id: args.channel_id,
        })
        .with_conversation(conversation);
    if let Some(run_id) = args.run_id {
        request = request.with_run_id(run_id);
    }

    let outcome = controller.run(request).await;

    // Flush the trace before printing so `stdout:` traces do not interleave.
    drop(controller);
    if let Some(handle) = trace_handle {
        if let Err(e) = handle.await {
            tracing::warn!(target: "taskpilot.cli", error = %e, "trace writer did not finish cleanly");
        }
    }

    println!("{}", render_outcome(&outcome, args.format)?);

    Ok(exit_code_for_outcome(&outcome))
}

/// Degraded answers (apology, fallback question) still exit 0; only an
/// internal fault fails the process.
pub fn exit_code_for_outcome(outcome: &RunOutcome) -> i32 {
    match outcome.status {
        RunStatus::Failed => ErrorCode::RunFailed.exit_code(),
        RunStatus::Answered | RunStatus::Clarification => ErrorCode::Success.exit_code(),
    }
}

pub fn tools_command(cfg: &AppConfig, args: ToolsArgs) -> Result<i32, CliError> {
    println!("{}", render_tools(&tool_listing(cfg), args.format)?);
    Ok(0)
}

pub fn config_command(cfg: &AppConfig) -> Result<i32, CliError> {
    println!("{}", render_config(cfg)?);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpilot_core::api::Phase;

    fn outcome(status: RunStatus, error_code: Option<ErrorCode>) -> RunOutcome {
        RunOutcome {
            run_id: "r".into(),
            status,
            terminal_phase: Phase::Respond,
            final_answer: String::new(),
            tasks: Vec::new(),
            executed: Default::default(),
            plan_reasoning: String::new(),
            replan_count: 0,
            phase_history: vec![Phase::Plan, Phase::Respond],
            error: error_code.map(|c| format!("{c:?}")),
            error_code,
            tools_planned: 0,
            tools_executed: 0,
            tools_failed: 0,
            duration_ms: 1,
        }
    }

    #[test]
    fn test_exit_code_for_outcome() {
        assert_eq!(exit_code_for_outcome(&outcome(RunStatus::Answered, None)), 0);
        assert_eq!(
            exit_code_for_outcome(&outcome(
                RunStatus::Answered,
                Some(ErrorCode::UpstreamStatus)
            )),
            0
        );
        assert_eq!(
            exit_code_for_outcome(&outcome(
                RunStatus::Failed,
                Some(ErrorCode::InternalFault)
            )),
            30
        );
    }
}
