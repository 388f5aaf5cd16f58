use anyhow::Result;
use async_stream;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::{AgentError, AgentResult};
use crate::models::chunk::{ChunkContent, StreamChunk, ToolCallContent};
use crate::models::content::Content;
use crate::models::message::{Message, ToolRequest};
use crate::models::tool::ToolCall;
use crate::providers::base::{Provider, Sampling};
use crate::tools::AgentTool;

/// Accumulated state for a streaming tool call
#[derive(Default)]
struct ToolAccum {
    id: Option<String>,
    name: Option<String>,
    args: String,
}

impl ToolAccum {
    fn call_id(&self, index: usize) -> String {
        self.id.clone().unwrap_or_else(|| format!("call_{}", index))
    }
}

/// A named wrapper around a chat-completion endpoint: an instruction, sampling
/// parameters, and the tools the model may invoke mid-conversation.
///
/// The provider session lives exactly as long as the agent; dropping the agent
/// releases it on every exit path, including errors and interrupts.
pub struct Agent {
    name: String,
    instructions: String,
    sampling: Sampling,
    provider: Box<dyn Provider>,
    tools: Vec<AgentTool>,
}

impl Agent {
    /// Create a new agent with the given instructions and provider
    pub fn new<N, I>(name: N, instructions: I, provider: Box<dyn Provider>) -> Self
    where
        N: Into<String>,
        I: Into<String>,
    {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            sampling: Sampling::default(),
            provider,
            tools: Vec::new(),
        }
    }

    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_tool(mut self, tool: AgentTool) -> Self {
        self.tools.push(tool);
        self
    }

    /// Add a tool to the agent
    pub fn add_tool(&mut self, tool: AgentTool) {
        self.tools.push(tool);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Wrap this agent as a tool another agent can call.
    ///
    /// The wrapper shares the agent; it keeps serving its own callers
    /// independently of the host.
    pub fn as_tool<N, D>(self: &Arc<Self>, name: N, description: D) -> AgentTool
    where
        N: Into<String>,
        D: Into<String>,
    {
        AgentTool::delegate(Arc::clone(self), name, description)
    }

    fn tool_declarations(&self) -> Vec<Value> {
        self.tools.iter().map(AgentTool::declaration).collect()
    }

    fn find_tool(&self, name: &str) -> Option<&AgentTool> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    /// Dispatch a single tool call to the tool it names
    async fn dispatch_tool_call(&self, tool_call: AgentResult<ToolCall>) -> AgentResult<Vec<Content>> {
        let call = tool_call?;
        let tool = self
            .find_tool(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;
        tool.call(call).await
    }

    /// Create a stream that yields each completion chunk as it arrives.
    ///
    /// The stream spans the whole turn: when the model requests tool calls,
    /// they are dispatched and the conversation continues against the same
    /// stream, so the consumer sees tool-call notices followed by the text of
    /// the eventual answer. Forwarded tool-call notices always carry the
    /// stable call identifier, even when the provider only sent it on the
    /// first fragment.
    pub async fn reply(&self, messages: &[Message]) -> Result<BoxStream<'_, Result<StreamChunk>>> {
        let mut messages = messages.to_vec();
        let tools = self.tool_declarations();

        Ok(Box::pin(async_stream::try_stream! {
            loop {
                let mut stream = self
                    .provider
                    .stream(&self.instructions, &messages, &tools, self.sampling)
                    .await?;

                let mut text = String::new();
                let mut accum: BTreeMap<usize, ToolAccum> = BTreeMap::new();

                while let Some(chunk) = stream.next().await {
                    let chunk = chunk?;
                    let mut forwarded = Vec::with_capacity(chunk.contents.len());

                    for content in chunk.contents {
                        match content {
                            ChunkContent::Text(fragment) => {
                                text.push_str(&fragment);
                                forwarded.push(ChunkContent::Text(fragment));
                            }
                            ChunkContent::ToolCall(fragment) => {
                                let entry = accum.entry(fragment.index).or_default();
                                if entry.id.is_none() {
                                    entry.id.clone_from(&fragment.id);
                                }
                                if entry.name.is_none() {
                                    entry.name.clone_from(&fragment.name);
                                }
                                if let Some(args) = &fragment.arguments {
                                    entry.args.push_str(args);
                                }

                                forwarded.push(ChunkContent::ToolCall(ToolCallContent {
                                    index: fragment.index,
                                    id: Some(entry.call_id(fragment.index)),
                                    name: entry.name.clone(),
                                    arguments: fragment.arguments,
                                }));
                            }
                        }
                    }

                    yield StreamChunk::new(forwarded);
                }

                // No tool calls requested: the turn is complete
                if accum.is_empty() {
                    break;
                }

                // Record the assistant's half of the exchange
                let mut response = Message::assistant();
                if !text.is_empty() {
                    response = response.with_text(text.clone());
                }
                for (index, call) in &accum {
                    let id = call.call_id(*index);
                    let tool_call = assemble_tool_call(&id, call);
                    response = response.with_tool_request(id, tool_call);
                }
                messages.push(response.clone());

                // Dispatch sequentially, one outbound call at a time
                let requests: Vec<ToolRequest> = response
                    .content
                    .iter()
                    .filter_map(|content| content.as_tool_request())
                    .cloned()
                    .collect();

                let mut tool_response = Message::user();
                for request in requests {
                    let output = self.dispatch_tool_call(request.tool_call.clone()).await;
                    if let Err(error) = &output {
                        tracing::debug!(agent = %self.name, id = %request.id, %error, "tool call failed");
                    }
                    tool_response = tool_response.with_tool_response(request.id.clone(), output);
                }
                messages.push(tool_response);
            }
        }))
    }

    /// Drain a full reply and return the concatenated text.
    ///
    /// This is the execution path of an agent used as a tool: the sub-task
    /// runs its own complete stream cycle and only the final text travels
    /// back to the host.
    pub async fn run_to_text(&self, messages: &[Message]) -> Result<String> {
        let mut stream = self.reply(messages).await?;
        let mut out = String::new();
        while let Some(chunk) = stream.next().await {
            out.push_str(&chunk?.concat_text());
        }
        Ok(out)
    }
}

/// Assemble the completed call for one accumulator entry
fn assemble_tool_call(id: &str, call: &ToolAccum) -> AgentResult<ToolCall> {
    let name = call.name.clone().ok_or_else(|| {
        AgentError::InvalidParameters(format!("tool call {} arrived without a name", id))
    })?;

    let arguments = if call.args.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(&call.args).map_err(|e| {
            AgentError::InvalidParameters(format!("tool call {} has malformed arguments: {}", id, e))
        })?
    };

    Ok(ToolCall::new(name, arguments))
}
