//! Tool schemas offered to a [`LanguageModelStream`](crate::llm::LanguageModelStream)
//! for a turn, derived from [`AgentType::default_tool_allow_list`].

use serde_json::json;

use crate::llm::ToolSpec;
use crate::model::agent::AgentType;

pub fn tool_specs_for(agent_type: AgentType) -> Vec<ToolSpec> {
    agent_type
        .default_tool_allow_list()
        .iter()
        .filter_map(|name| spec_for(name))
        .collect()
}

fn spec_for(name: &str) -> Option<ToolSpec> {
    let (description, parameters_schema) = match name {
        "switch_mode" => (
            "Delegate the conversation to a different specialized agent.",
            json!({
                "type": "object",
                "properties": {
                    "target_agent": {"type": "string"},
                    "reason": {"type": "string"},
                    "confidence": {"type": "string"}
                },
                "required": ["target_agent", "reason"]
            }),
        ),
        "read_file" => (
            "Read the contents of a file.",
            json!({
                "type": "object",
                "properties": {"path": {"type": "string"}},
                "required": ["path"]
            }),
        ),
        "write_file" => (
            "Write content to a file, creating or overwriting it.",
            json!({
                "type": "object",
                "properties": {"path": {"type": "string"}, "content": {"type": "string"}},
                "required": ["path", "content"]
            }),
        ),
        "delete_file" => (
            "Delete a file.",
            json!({
                "type": "object",
                "properties": {"path": {"type": "string"}},
                "required": ["path"]
            }),
        ),
        "list_files" => (
            "List files under a directory.",
            json!({
                "type": "object",
                "properties": {"path": {"type": "string"}},
                "required": ["path"]
            }),
        ),
        "search_files" => (
            "Search file contents for a pattern.",
            json!({
                "type": "object",
                "properties": {"path": {"type": "string"}, "pattern": {"type": "string"}},
                "required": ["pattern"]
            }),
        ),
        "execute_command" => (
            "Run a shell command.",
            json!({
                "type": "object",
                "properties": {"command": {"type": "string"}},
                "required": ["command"]
            }),
        ),
        "create_directory" => (
            "Create a directory, including parents.",
            json!({
                "type": "object",
                "properties": {"path": {"type": "string"}},
                "required": ["path"]
            }),
        ),
        "move_file" => (
            "Move or rename a file.",
            json!({
                "type": "object",
                "properties": {"from": {"type": "string"}, "to": {"type": "string"}},
                "required": ["from", "to"]
            }),
        ),
        _ => return None,
    };
    Some(ToolSpec {
        name: name.to_owned(),
        description: description.to_owned(),
        parameters_schema,
    })
}
