use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ErrorCode;
use crate::graph::ExecutionRecord;
use crate::scheduler::Decision;
use crate::state::{Phase, TaskCounts};

use super::writer::TraceTx;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    RunStarted {
        run_id: String,
        user_id: String,
        request: String,
    },
    PhaseEntered {
        run_id: String,
        phase: Phase,
    },
    Decision {
        run_id: String,
        after: Phase,
        decision: Decision,
        counts: TaskCounts,
    },
    TaskStarted {
        run_id: String,
        task_id: String,
        tool: String,
    },
    TaskFinished {
        run_id: String,
        duration_ms: u64,
        record: ExecutionRecord,
    },
    Planned {
        run_id: String,
        tasks: usize,
        needs_clarification: bool,
        error: Option<String>,
        error_code: Option<ErrorCode>,
    },
    Replanned {
        run_id: String,
        replan_count: u32,
        give_up: bool,
        new_tasks: usize,
        reason: Option<String>,
        error_code: Option<ErrorCode>,
    },
    RunFinished {
        run_id: String,
        terminal: Phase,
        tools_planned: usize,
        tools_executed: usize,
        tools_failed: usize,
        duration_ms: u64,
        error: Option<String>,
        error_code: Option<ErrorCode>,
    },
}

/// Versioned, timestamped envelope written to the sink.
#[derive(Debug, Clone, Serialize)]
pub struct TraceLine<'a> {
    pub v: u8,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub event: &'a TraceEvent,
}

pub async fn emit(out: Option<&TraceTx>, event: TraceEvent) {
    let Some(out) = out else {
        return;
    };
    let line = TraceLine {
        v: 1,
        ts: Utc::now(),
        event: &event,
    };
    if let Ok(line) = serde_json::to_string(&line) {
        out.send_line(line).await;
    }
}
