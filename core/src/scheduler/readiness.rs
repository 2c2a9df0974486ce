use crate::graph::{ExecutionLog, Task, TaskStatus};

/// First task, in declared order, that is pending and whose dependencies all
/// have a successful execution record.
///
/// Pure: the same tasks and log always give the same answer.
pub fn next_ready<'a>(tasks: &'a [Task], executed: &ExecutionLog) -> Option<&'a Task> {
    let completed = executed.completed_ids();

    tasks.iter().find(|task| {
        task.status == TaskStatus::Pending
            && !completed.contains(task.id.as_str())
            && task
                .depends_on
                .iter()
                .all(|dep| completed.contains(dep.as_str()))
    })
}

pub fn has_ready(tasks: &[Task], executed: &ExecutionLog) -> bool {
    next_ready(tasks, executed).is_some()
}
