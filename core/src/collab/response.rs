use async_trait::async_trait;

use crate::error::{CollaboratorError, RunError};
use crate::graph::{ExecutionLog, Task, TaskStatus};
use crate::state::{ConversationMessage, RunState};

/// Everything the response collaborator may look at.
///
/// Only constructible from a state whose tasks are all settled, so the
/// answer can never be built on work that did not run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseInput {
    pub run_id: String,
    pub request: String,
    pub conversation: Vec<ConversationMessage>,
    tasks: Vec<Task>,
    executed: ExecutionLog,
}

impl ResponseInput {
    pub fn from_state(state: &RunState) -> Result<Self, RunError> {
        if let Some(open) = state
            .tasks
            .iter()
            .find(|t| matches!(t.status, TaskStatus::Pending | TaskStatus::Running))
        {
            return Err(RunError::UngroundedResponse(open.id.clone()));
        }

        Ok(Self {
            run_id: state.run_id.clone(),
            request: state.request.clone(),
            conversation: state.conversation.clone(),
            tasks: state.tasks.clone(),
            executed: state.executed.clone(),
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn executed(&self) -> &ExecutionLog {
        &self.executed
    }
}

#[async_trait]
pub trait Responder: Send + Sync {
    fn name(&self) -> &str;

    async fn respond(&self, input: &ResponseInput) -> Result<String, CollaboratorError>;
}
