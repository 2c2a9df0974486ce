use taskpilot_core::api::{
    ConversationMessage, ExecutionLog, Task, TaskStatus, ToolDescriptor, NONE_TOOL,
};

use crate::http::preview_chars;

pub const INPUT_PREVIEW_CHARS: usize = 200;
pub const OUTPUT_PREVIEW_CHARS: usize = 500;
pub const HISTORY_MESSAGE_CHARS: usize = 200;

const PLANNER_SYSTEM_PROMPT: &str = r#"# Role
You are the planning assistant of {persona}.
Turn the user's request into a task list for the tools below.

# Sequential vs parallel
Independent tasks get "depends_on": [].
When task B needs the result of task A, B gets "depends_on": ["<id of A>"].

Example (independent):
```json
{
  "todos": [
    {"id": "step_1", "tool": "Calendar", "description": "Fetch all appointments for tomorrow", "depends_on": []},
    {"id": "step_2", "tool": "Mail", "description": "Fetch unread mails from today", "depends_on": []}
  ],
  "reasoning": "Both lookups are independent"
}
```

Example (sequential):
```json
{
  "todos": [
    {"id": "step_1", "tool": "Directory", "description": "List all trainers", "depends_on": []},
    {"id": "step_2", "tool": "Chat", "description": "Send the trainers from step_1: 'Meeting tomorrow at 10'", "depends_on": ["step_1"]}
  ],
  "reasoning": "Step 2 needs the trainer list from step 1"
}
```

# Available tools
{tools}

# Output format
Answer with valid JSON only:
```json
{
  "todos": [
    {"id": "step_1", "tool": "Tool-Name", "description": "What exactly the tool should do", "depends_on": []}
  ],
  "reasoning": "Why this plan",
  "needs_clarification": false,
  "clarification_question": null
}
```

# Rules
1. If no tool is needed, return an empty "todos" list and put the direct answer in "reasoning".
2. If the request is ambiguous, set "needs_clarification": true and ask one short question.
3. Give every task the complete context it needs; tools do not see the conversation.
{locale}
# Current date and time
{now}

# Conversation so far
{history}
"#;

const REPLAN_PROMPT: &str = r#"You are a replanner. A previous plan has partially failed.
Adjust the plan, or give up if the request cannot be fulfilled.

# Original request
{request}

# Current plan
{tasks}

# Executed steps
{executed}

# Failed steps
{failed}

# Options
1. Adjust the plan when the failure can be worked around (for example another tool).
2. Keep what worked: tasks that already succeeded need not be repeated; new tasks may depend on their ids.
3. Give up with "give_up": true and explain why.

New attempts must use new task ids.

# Available tools
{tools}

# Output format
```json
{
  "give_up": false,
  "reason": "Why this approach",
  "new_todos": [
    {"id": "step_3", "tool": "Tool-Name", "description": "What should happen", "depends_on": []}
  ]
}
```
"#;

const RESPONDER_SYSTEM_PROMPT: &str = r#"You are {persona}. Write the final answer to the user.

# Rules
1. On success, summarize the results in a relaxed, helpful way.
2. On failure, be transparent but kind about what could not be done.
3. Only state what the tool results below support. Never invent results.
4. Output only the message for the user, without preamble or internal reasoning.
5. For small talk, answer friendly and ask how you can help.
{locale}
# Conversation so far
{history}

# Tool results
{executed}

# Original request
{request}

# Planned steps
{tasks}
"#;

pub const RESPONDER_USER_PROMPT: &str = "Write the answer now. Summarize the results, be friendly and direct, \
and be transparent about failures. Output only the final message.";

pub const REPLANNER_SYSTEM_PROMPT: &str = "You are a careful replanner.";

pub fn planner_system_prompt(
    persona: &str,
    locale_hint: Option<&str>,
    tools: &[ToolDescriptor],
    conversation: &[ConversationMessage],
    history_window: usize,
    now: &str,
) -> String {
    PLANNER_SYSTEM_PROMPT
        .replace("{persona}", persona)
        .replace("{tools}", &format_tool_catalog(tools))
        .replace("{locale}", &format_locale(locale_hint))
        .replace("{now}", now)
        .replace(
            "{history}",
            &format_conversation(conversation, history_window, None),
        )
}

pub fn planner_user_prompt(request: &str) -> String {
    format!("Request:\n\"{request}\"\n\nCreate the plan as JSON now.")
}

pub fn replan_prompt(
    request: &str,
    tasks: &[Task],
    executed: &ExecutionLog,
    failed: &[Task],
    tools: &[ToolDescriptor],
) -> String {
    REPLAN_PROMPT
        .replace("{tools}", &format_tool_catalog(tools))
        .replace("{tasks}", &format_tasks_for_replan(tasks))
        .replace("{failed}", &format_tasks_for_replan(failed))
        .replace("{executed}", &format_steps_for_replan(executed))
        .replace("{request}", request)
}

pub fn responder_system_prompt(
    persona: &str,
    locale_hint: Option<&str>,
    request: &str,
    tasks: &[Task],
    executed: &ExecutionLog,
    conversation: &[ConversationMessage],
    history_window: usize,
) -> String {
    RESPONDER_SYSTEM_PROMPT
        .replace("{persona}", persona)
        .replace("{locale}", &format_locale(locale_hint))
        .replace(
            "{history}",
            &format_conversation(conversation, history_window, Some(HISTORY_MESSAGE_CHARS)),
        )
        .replace("{tasks}", &format_task_list(tasks))
        .replace("{executed}", &format_executed_steps(executed))
        .replace("{request}", request)
}

fn format_locale(hint: Option<&str>) -> String {
    match hint.map(str::trim).filter(|h| !h.is_empty()) {
        Some(h) => format!("Language and tone: {h}\n"),
        None => String::new(),
    }
}

pub fn format_tool_catalog(tools: &[ToolDescriptor]) -> String {
    let mut lines = Vec::new();
    for tool in tools.iter().filter(|t| t.name != NONE_TOOL) {
        lines.push(format!("\n## {}", tool.name));
        lines.push(format!("**Description**: {}", tool.description));
        if !tool.capabilities.is_empty() {
            lines.push("**Can**:".to_string());
            for cap in &tool.capabilities {
                lines.push(format!("  - {cap}"));
            }
        }
        if let Some(when) = &tool.use_when {
            lines.push(format!("**Use when**: {when}"));
        }
        if let Some(important) = &tool.important {
            lines.push(format!("**IMPORTANT**: {important}"));
        }
        if let Some(example) = &tool.example_input {
            lines.push(format!("**Example input**: {example}"));
        }
    }
    if lines.is_empty() {
        return "No tools available. Answer directly with an empty task list.".to_string();
    }
    lines.join("\n")
}

/// Last `window` messages as `[role]: content`, optionally truncated.
pub fn format_conversation(
    conversation: &[ConversationMessage],
    window: usize,
    truncate: Option<usize>,
) -> String {
    if conversation.is_empty() || window == 0 {
        return "No previous conversation.".to_string();
    }

    let start = conversation.len().saturating_sub(window);
    conversation[start..]
        .iter()
        .map(|m| {
            let content = match truncate {
                Some(limit) => preview_chars(&m.content, limit, ""),
                None => m.content.clone(),
            };
            format!("[{}]: {}", m.role, content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_tasks_for_replan(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "None.".to_string();
    }
    let mut lines = Vec::new();
    for task in tasks {
        lines.push(format!(
            "- [{}] {}: {} - {}",
            task.status, task.id, task.tool, task.description
        ));
        if let Some(error) = &task.error {
            lines.push(format!("  Error: {error}"));
        }
    }
    lines.join("\n")
}

pub fn format_steps_for_replan(executed: &ExecutionLog) -> String {
    if executed.is_empty() {
        return "No steps executed.".to_string();
    }
    executed
        .iter()
        .map(|r| {
            let mark = if r.success { "✓" } else { "✗" };
            let detail = if r.success {
                r.output_text()
            } else {
                r.error_message.clone().unwrap_or_default()
            };
            format!("- [{mark}] {} ({}): {detail}", r.tool, r.task_id)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_executed_steps(executed: &ExecutionLog) -> String {
    if executed.is_empty() {
        return "No tools executed.".to_string();
    }
    let mut lines = Vec::new();
    for (i, r) in executed.iter().enumerate() {
        let mark = if r.success { "✓" } else { "✗" };
        lines.push(format!("\n{}. [{mark}] {}", i + 1, r.tool));
        lines.push(format!(
            "   Input: {}",
            preview_chars(&r.input_context, INPUT_PREVIEW_CHARS, "")
        ));
        if r.success {
            let output = match &r.output {
                v @ (serde_json::Value::Object(_) | serde_json::Value::Array(_)) => {
                    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
                }
                _ => r.output_text(),
            };
            lines.push(format!(
                "   Output: {}",
                preview_chars(&output, OUTPUT_PREVIEW_CHARS, "")
            ));
        } else {
            lines.push(format!(
                "   Error: {}",
                r.error_message.as_deref().unwrap_or("unknown error")
            ));
        }
    }
    lines.join("\n")
}

pub fn format_task_list(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No steps planned (direct answer).".to_string();
    }
    let mut lines = Vec::new();
    for task in tasks {
        let marker = match task.status {
            TaskStatus::Pending => "⏳",
            TaskStatus::Running => "🔄",
            TaskStatus::Done => "✓",
            TaskStatus::Failed => "✗",
        };
        lines.push(format!("- [{marker}] {}: {}", task.tool, task.description));
        if !task.depends_on.is_empty() {
            lines.push(format!("  (depends on: {})", task.depends_on.join(", ")));
        }
        if let Some(error) = &task.error {
            lines.push(format!("  (error: {error})"));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpilot_core::api::ExecutionRecord;

    fn record(tool: &str, success: bool, output: serde_json::Value) -> ExecutionRecord {
        ExecutionRecord {
            task_id: "step_1".to_string(),
            tool: tool.to_string(),
            input_context: "x".repeat(300),
            output,
            success,
            error_message: (!success).then(|| "HTTP error 500: boom".to_string()),
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_catalog_skips_none_tool() {
        let tools = vec![
            ToolDescriptor {
                name: NONE_TOOL.to_string(),
                description: "nothing".to_string(),
                ..Default::default()
            },
            ToolDescriptor {
                name: "Calendar".to_string(),
                description: "Reads the calendar".to_string(),
                capabilities: vec!["list events".to_string()],
                ..Default::default()
            },
        ];
        let text = format_tool_catalog(&tools);
        assert!(text.contains("## Calendar"));
        assert!(text.contains("  - list events"));
        assert!(!text.contains("## none"));
    }

    #[test]
    fn test_conversation_window_and_truncation() {
        let conversation: Vec<_> = (0..5)
            .map(|i| ConversationMessage::new("human", format!("msg {i} {}", "y".repeat(250))))
            .collect();
        let text = format_conversation(&conversation, 2, Some(HISTORY_MESSAGE_CHARS));
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("[human]: msg 3"));
        assert!(text.lines().all(|l| l.ends_with("...")));
    }

    #[test]
    fn test_executed_steps_previews() {
        let log = ExecutionLog::from(vec![
            record("Calendar", true, serde_json::json!("z".repeat(600))),
            record("Mail", false, serde_json::Value::Null),
        ]);
        let text = format_executed_steps(&log);
        assert!(text.contains("1. [✓] Calendar"));
        assert!(text.contains("2. [✗] Mail"));
        assert!(text.contains("Error: HTTP error 500: boom"));
        let output_line = text.lines().find(|l| l.contains("Output:")).unwrap();
        assert!(output_line.len() < 520);
    }

    #[test]
    fn test_planner_prompt_fills_placeholders() {
        let prompt = planner_system_prompt(
            "Dana, a gym owner",
            Some("Answer in German."),
            &[],
            &[],
            10,
            "2026-01-01 10:00:00",
        );
        assert!(prompt.contains("planning assistant of Dana, a gym owner"));
        assert!(prompt.contains("Language and tone: Answer in German."));
        assert!(prompt.contains("2026-01-01 10:00:00"));
        assert!(!prompt.contains("{tools}"));
        assert!(prompt.contains("\"needs_clarification\": false"));
    }
}
