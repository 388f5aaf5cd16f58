//! Capabilities an agent can expose to its model.
//!
//! Two kinds exist behind one interface: remote MCP tool references, which
//! are declared to the provider and executed by the provider's own
//! tool-calling subsystem, and delegate tools, which wrap another [`Agent`]
//! as a callable unit and run locally. The hosting agent never needs to
//! distinguish them.

use async_recursion::async_recursion;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::agent::Agent;
use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::message::Message;
use crate::models::tool::{Tool, ToolCall};
use crate::providers::utils::{sanitize_function_name, tool_to_openai_spec};

/// A reference to a remote MCP tool, resolved and invoked by the provider
pub struct RemoteTool {
    pub name: String,
    pub description: String,
    pub url: String,
}

/// Another agent wrapped as a callable tool.
///
/// The wrapped agent is shared, not owned: it keeps its own independent
/// lifetime and may serve several hosts at once.
pub struct DelegateTool {
    pub name: String,
    pub description: String,
    agent: Arc<Agent>,
}

/// A capability an agent exposes to its model
pub enum AgentTool {
    Remote(RemoteTool),
    Delegate(DelegateTool),
}

impl AgentTool {
    pub fn remote<N, D, U>(name: N, description: D, url: U) -> Self
    where
        N: Into<String>,
        D: Into<String>,
        U: Into<String>,
    {
        AgentTool::Remote(RemoteTool {
            name: sanitize_function_name(&name.into()),
            description: description.into(),
            url: url.into(),
        })
    }

    pub fn delegate<N, D>(agent: Arc<Agent>, name: N, description: D) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        AgentTool::Delegate(DelegateTool {
            name: sanitize_function_name(&name.into()),
            description: description.into(),
            agent,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            AgentTool::Remote(tool) => &tool.name,
            AgentTool::Delegate(tool) => &tool.name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            AgentTool::Remote(tool) => &tool.description,
            AgentTool::Delegate(tool) => &tool.description,
        }
    }

    /// The wire-format declaration sent to the provider
    pub fn declaration(&self) -> Value {
        match self {
            AgentTool::Remote(tool) => json!({
                "type": "mcp",
                "server_label": tool.name,
                "server_description": tool.description,
                "server_url": tool.url,
            }),
            AgentTool::Delegate(tool) => tool_to_openai_spec(&Tool::new(
                tool.name.clone(),
                tool.description.clone(),
                json!({
                    "type": "object",
                    "properties": {
                        "task": {
                            "type": "string",
                            "description": "The task to hand to this agent"
                        }
                    },
                    "required": ["task"]
                }),
            )),
        }
    }

    /// Execute a call the model issued against this tool.
    ///
    /// Remote tools are executed by the provider; a call that lands here
    /// anyway is answered with an error the model can read. Boxed because a
    /// delegated agent may itself host delegate tools.
    #[async_recursion]
    pub async fn call(&self, tool_call: ToolCall) -> AgentResult<Vec<Content>> {
        match self {
            AgentTool::Remote(tool) => Err(AgentError::ExecutionError(format!(
                "tool '{}' is executed by the provider, not locally",
                tool.name
            ))),
            AgentTool::Delegate(tool) => {
                let task = tool_call
                    .arguments
                    .get("task")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        AgentError::InvalidParameters("task parameter required".into())
                    })?;

                tracing::debug!(tool = %tool.name, agent = %tool.agent.name(), "delegating task");

                let messages = vec![Message::user().with_text(task)];
                let text = tool
                    .agent
                    .run_to_text(&messages)
                    .await
                    .map_err(|e| AgentError::ExecutionError(e.to_string()))?;

                Ok(vec![Content::text(text)])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chunk::StreamChunk;
    use crate::providers::mock::MockProvider;

    #[test]
    fn test_remote_declaration() {
        let tool = AgentTool::remote(
            "AmplitudeMCPServer",
            "MCP server for AmplitudeMCPServer",
            "https://mcp.amplitude.com/mcp",
        );
        let decl = tool.declaration();
        assert_eq!(decl["type"], json!("mcp"));
        assert_eq!(decl["server_label"], json!("AmplitudeMCPServer"));
        assert_eq!(decl["server_url"], json!("https://mcp.amplitude.com/mcp"));
    }

    #[test]
    fn test_delegate_declaration() {
        let helper = Arc::new(Agent::new(
            "helper",
            "You optimize things.",
            Box::new(MockProvider::with_chunks(vec![])),
        ));
        let tool = AgentTool::delegate(helper, "Optimization", "Always active");
        let decl = tool.declaration();
        assert_eq!(decl["type"], json!("function"));
        assert_eq!(decl["function"]["name"], json!("Optimization"));
        assert_eq!(
            decl["function"]["parameters"]["required"],
            json!(["task"])
        );
    }

    #[tokio::test]
    async fn test_remote_call_is_refused() {
        let tool = AgentTool::remote("remote", "remote tool", "https://example.test/mcp");
        let result = tool
            .call(ToolCall::new("remote", json!({})))
            .await;
        assert!(matches!(result, Err(AgentError::ExecutionError(_))));
    }

    #[tokio::test]
    async fn test_delegate_call_runs_the_wrapped_agent() {
        let provider = MockProvider::with_chunks(vec![vec![StreamChunk::text("tidied up")]]);
        let call_log = provider.call_log();
        let helper = Arc::new(Agent::new(
            "helper",
            "You optimize things.",
            Box::new(provider),
        ));
        let tool = AgentTool::delegate(Arc::clone(&helper), "Optimization", "Always active");

        let result = tool
            .call(ToolCall::new("Optimization", json!({"task": "tidy the code"})))
            .await
            .unwrap();

        assert_eq!(result[0].as_text(), Some("tidied up"));
        let calls = call_log.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0].text(), "tidy the code");
    }

    #[tokio::test]
    async fn test_delegate_call_requires_task() {
        let helper = Arc::new(Agent::new(
            "helper",
            "You optimize things.",
            Box::new(MockProvider::with_chunks(vec![])),
        ));
        let tool = AgentTool::delegate(helper, "Optimization", "Always active");

        let result = tool.call(ToolCall::new("Optimization", json!({}))).await;
        assert!(matches!(result, Err(AgentError::InvalidParameters(_))));
    }
}
