//! Model-driven project analysis: one completion call turns the request
//! into a structured task, local tooling gathers context, a second call
//! plans follow-up steps, and the executed steps become a numbered report.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::openai::{CompletionBackend, CompletionOptions};
use crate::tooling::git::GitStatusSnapshot;
use crate::tooling::{directory, file, git, network, search};

const ANALYZE_SYSTEM_MESSAGE: &str = "\
You analyze a request made to a coding assistant. Extract:
1. the main goal,
2. any context or constraints,
3. file paths the request mentions.
Respond with JSON only: {\"goal\": \"...\", \"context\": \"...\", \"files\": [\"...\"]}";

const PLAN_SYSTEM_MESSAGE: &str = "\
Given a task goal and analysis results, suggest follow-up actions.
Available tools:
- directory: show the project tree (parameters: path, depth)
- git: status, diff, or log (the action name selects which)
- file: read a file (parameters: path)
- search: find a substring in project files (parameters: pattern, extension)
- network: probe a host (parameters: host, port)
- command: suggest a shell command (parameters: command); suggestions are
  reported, never run
Respond with a JSON array of {\"action\", \"reasoning\", \"tool\", \"parameters\"} objects.";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AgentTask {
    pub goal: String,
    pub context: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AgentAction {
    pub action: String,
    pub reasoning: String,
    pub tool: Option<String>,
    pub result: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlannedStep {
    action: String,
    reasoning: String,
    #[serde(default)]
    tool: Option<String>,
    #[serde(default)]
    parameters: Value,
}

pub async fn run_agent(
    backend: &dyn CompletionBackend,
    input: &str,
    options: &CompletionOptions,
) -> Result<String> {
    if input.trim().is_empty() {
        return Err(Error::Configuration("prompt must not be empty".into()));
    }
    let task = analyze_request(backend, input, options).await?;
    let actions = plan_and_execute(backend, &task, options).await;
    Ok(format_report(&task, &actions))
}

// The internal calls pin a low temperature and their own system message;
// model and token limit come from the caller.
fn internal_options(base: &CompletionOptions, system: &str) -> CompletionOptions {
    CompletionOptions {
        temperature: 0.1,
        system_message: Some(system.to_string()),
        ..base.clone()
    }
}

/// First completion call: turn free text into a structured task. A reply
/// that is not valid JSON degrades to the raw input as the goal.
async fn analyze_request(
    backend: &dyn CompletionBackend,
    input: &str,
    options: &CompletionOptions,
) -> Result<AgentTask> {
    let reply = backend
        .complete(input, &internal_options(options, ANALYZE_SYSTEM_MESSAGE))
        .await?;
    Ok(serde_json::from_str(reply.trim()).unwrap_or_else(|_| AgentTask {
        goal: input.to_string(),
        ..Default::default()
    }))
}

async fn plan_and_execute(
    backend: &dyn CompletionBackend,
    task: &AgentTask,
    options: &CompletionOptions,
) -> Vec<AgentAction> {
    let mut actions = vec![analyze_project()];

    if mentions_git(task) {
        actions.push(check_git_status().await);
    }

    for path in &task.files {
        actions.push(analyze_file(path).await);
    }

    for step in plan_next_steps(backend, task, &actions, options).await {
        actions.push(execute_step(step).await);
    }

    actions
}

fn mentions_git(task: &AgentTask) -> bool {
    const GIT_KEYWORDS: [&str; 7] = [
        "commit", "push", "pull", "status", "diff", "branch", "merge",
    ];
    let haystack = match &task.context {
        Some(context) => format!("{} {}", task.goal, context).to_lowercase(),
        None => task.goal.to_lowercase(),
    };
    GIT_KEYWORDS.iter().any(|keyword| haystack.contains(keyword))
}

fn analyze_project() -> AgentAction {
    let outcome = std::env::current_dir()
        .map_err(|e| e.to_string())
        .and_then(|cwd| directory::tree(&cwd, 2).map_err(|e| e.to_string()));
    AgentAction {
        action: "analyze_project_structure".to_string(),
        reasoning: "Project overview for context".to_string(),
        tool: Some("directory".to_string()),
        result: Some(outcome.unwrap_or_else(|e| format!("Error: {e}"))),
    }
}

async fn check_git_status() -> AgentAction {
    let result = match git::read_status(None).await {
        Ok(snapshot) => format_status(&snapshot),
        Err(message) => format!("Error: {message}"),
    };
    AgentAction {
        action: "check_git_status".to_string(),
        reasoning: "The request touches git state".to_string(),
        tool: Some("git".to_string()),
        result: Some(result),
    }
}

fn format_status(snapshot: &GitStatusSnapshot) -> String {
    if snapshot.is_clean() {
        return "working tree clean".to_string();
    }
    let mut out = String::new();
    for (icon, path) in &snapshot.staged {
        out.push_str(&format!("staged    {icon} {path}\n"));
    }
    for (icon, path) in &snapshot.modified {
        out.push_str(&format!("modified  {icon} {path}\n"));
    }
    for path in &snapshot.untracked {
        out.push_str(&format!("untracked ? {path}\n"));
    }
    out.trim_end().to_string()
}

async fn analyze_file(path: &str) -> AgentAction {
    let result = file::read_to_string(Path::new(path))
        .await
        .unwrap_or_else(|e| format!("Error: {e}"));
    AgentAction {
        action: "analyze_file".to_string(),
        reasoning: format!("Reading {path} named in the request"),
        tool: Some("file".to_string()),
        result: Some(result),
    }
}

/// Second completion call: feed the goal plus gathered results back and ask
/// for follow-up steps. An unparsable reply degrades to a manual-review
/// entry rather than failing the run.
async fn plan_next_steps(
    backend: &dyn CompletionBackend,
    task: &AgentTask,
    analysis: &[AgentAction],
    options: &CompletionOptions,
) -> Vec<PlannedStep> {
    let context = serde_json::json!({
        "goal": &task.goal,
        "context": &task.context,
        "analysis": analysis
            .iter()
            .map(|a| serde_json::json!({ "action": &a.action, "result": &a.result }))
            .collect::<Vec<_>>(),
    });

    let reply = backend
        .complete(
            &context.to_string(),
            &internal_options(options, PLAN_SYSTEM_MESSAGE),
        )
        .await;

    match reply {
        Ok(text) => serde_json::from_str(text.trim()).unwrap_or_else(|_| manual_review()),
        Err(_) => manual_review(),
    }
}

fn manual_review() -> Vec<PlannedStep> {
    vec![PlannedStep {
        action: "manual_review".to_string(),
        reasoning: "Could not plan follow-up steps automatically".to_string(),
        tool: None,
        parameters: Value::Null,
    }]
}

/// Run one planned step against the local tooling. Shell commands are
/// reported as suggestions, never executed.
async fn execute_step(step: PlannedStep) -> AgentAction {
    let result = match step.tool.as_deref() {
        Some("directory") => Some(run_directory_step(&step.parameters)),
        Some("git") => Some(run_git_step(&step.action).await),
        Some("file") => Some(run_file_step(&step.parameters).await),
        Some("search") => Some(run_search_step(&step.parameters)),
        Some("network") => Some(run_network_step(&step.parameters).await),
        Some("command") => Some(match str_param(&step.parameters, "command") {
            Some(line) => format!("suggested command (not run): {line}"),
            None => "suggested a shell command (not run)".to_string(),
        }),
        Some(other) => Some(format!("Error: unknown tool {other}")),
        None => None,
    };
    AgentAction {
        action: step.action,
        reasoning: step.reasoning,
        tool: step.tool,
        result,
    }
}

fn str_param(parameters: &Value, key: &str) -> Option<String> {
    parameters
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn run_directory_step(parameters: &Value) -> String {
    let depth = parameters
        .get("depth")
        .and_then(Value::as_u64)
        .unwrap_or(2) as usize;
    let outcome = match str_param(parameters, "path") {
        Some(path) => directory::tree(Path::new(&path), depth),
        None => match std::env::current_dir() {
            Ok(cwd) => directory::tree(&cwd, depth),
            Err(e) => return format!("Error: {e}"),
        },
    };
    outcome.unwrap_or_else(|e| format!("Error: {e}"))
}

async fn run_git_step(action: &str) -> String {
    let outcome = if action.contains("diff") {
        git::diff(false, None).await
    } else if action.contains("log") {
        git::log(10, None).await
    } else {
        git::read_status(None).await.map(|s| format_status(&s))
    };
    outcome.unwrap_or_else(|e| format!("Error: {e}"))
}

async fn run_file_step(parameters: &Value) -> String {
    match str_param(parameters, "path") {
        Some(path) => file::read_to_string(Path::new(&path))
            .await
            .unwrap_or_else(|e| format!("Error: {e}")),
        None => "Error: file step without a path parameter".to_string(),
    }
}

fn run_search_step(parameters: &Value) -> String {
    let Some(pattern) = str_param(parameters, "pattern") else {
        return "Error: search step without a pattern parameter".to_string();
    };
    let extension = str_param(parameters, "extension");
    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => return format!("Error: {e}"),
    };
    match search::search_in_files(&cwd, &pattern, extension.as_deref()) {
        Ok(matches) if matches.is_empty() => format!("no matches for '{pattern}'"),
        Ok(matches) => matches
            .iter()
            .map(|m| format!("{}:{}: {}", m.path.display(), m.line_number, m.line.trim()))
            .collect::<Vec<_>>()
            .join("\n"),
        Err(e) => format!("Error: {e}"),
    }
}

async fn run_network_step(parameters: &Value) -> String {
    let Some(host) = str_param(parameters, "host") else {
        return "Error: network step without a host parameter".to_string();
    };
    match parameters.get("port").and_then(Value::as_u64) {
        Some(port) => match u16::try_from(port) {
            Ok(port) => {
                let probe = network::check_port(&host, port, Duration::from_secs(2)).await;
                if probe.open {
                    format!("{host}:{port} is open")
                } else {
                    format!(
                        "{host}:{port} is closed ({})",
                        probe.error.unwrap_or_default()
                    )
                }
            }
            Err(_) => format!("Error: port {port} out of range"),
        },
        None => match network::ping(&host).await {
            Ok(probe) if probe.alive => match probe.time_ms {
                Some(ms) => format!("{host} is reachable ({ms} ms)"),
                None => format!("{host} is reachable"),
            },
            Ok(_) => format!("{host} is unreachable"),
            Err(e) => format!("Error: {e}"),
        },
    }
}

fn format_report(task: &AgentTask, actions: &[AgentAction]) -> String {
    let mut out = format!("Agent analysis for: \"{}\"\n\n", task.goal);
    for (index, action) in actions.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", index + 1, action.action));
        out.push_str(&format!("   Reasoning: {}\n", action.reasoning));
        if let Some(tool) = &action.tool {
            out.push_str(&format!("   Tool: {tool}\n"));
        }
        if let Some(result) = &action.result {
            out.push_str("   Result:\n");
            for line in result.lines() {
                out.push_str(&format!("     {line}\n"));
            }
        }
        out.push('\n');
    }
    out.push_str("Agent analysis complete.");
    out
}
