use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{ChunkStream, Provider, Sampling};
use super::configs::OpenAiProviderConfig;
use super::utils::messages_to_openai_spec;
use crate::models::chunk::{ChunkContent, StreamChunk, ToolCallContent};
use crate::models::message::Message;

/// Provider for OpenAI-compatible chat completions endpoints.
///
/// Speaks the streaming (`stream: true`) variant of the API: the response is
/// a server-sent-event body whose `data:` frames each carry one delta of the
/// completion, terminated by `data: [DONE]`.
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn build_payload(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Value],
        sampling: Sampling,
    ) -> Value {
        let system_message = json!({
            "role": "system",
            "content": system
        });

        let mut messages_array = vec![system_message];
        messages_array.extend(messages_to_openai_spec(messages));

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_array,
            "stream": true
        });

        if !tools.is_empty() {
            payload
                .as_object_mut()
                .unwrap()
                .insert("tools".to_string(), json!(tools));
        }
        if let Some(temp) = sampling.temperature {
            payload
                .as_object_mut()
                .unwrap()
                .insert("temperature".to_string(), json!(temp));
        }
        if let Some(top_p) = sampling.top_p {
            payload
                .as_object_mut()
                .unwrap()
                .insert("top_p".to_string(), json!(top_p));
        }

        payload
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn stream(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Value],
        sampling: Sampling,
    ) -> Result<ChunkStream> {
        let url = format!(
            "{}/chat/completions",
            self.config.host.trim_end_matches('/')
        );
        let payload = self.build_payload(system, messages, tools, sampling);

        tracing::debug!(model = %self.config.model, %url, "starting streamed completion");

        let mut request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload);
        if let Some(api_version) = &self.config.api_version {
            request = request.query(&[("api-version", api_version)]);
        }

        let response = request.send().await?;

        match response.status() {
            StatusCode::OK => {}
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                return Err(anyhow!("Server error: {}", status));
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(anyhow!("Request failed: {}\n{}", status, body));
            }
        }

        let byte_stream = response.bytes_stream();

        let out = async_stream::try_stream! {
            let mut buf = Vec::<u8>::new();

            futures::pin_mut!(byte_stream);
            'read: while let Some(bytes) = byte_stream.next().await {
                let bytes = bytes?;
                buf.extend_from_slice(&bytes);

                while let Some(pos) = find_double_newline(&buf) {
                    let frame = buf.drain(..pos + 2).collect::<Vec<_>>();
                    let text = String::from_utf8_lossy(&frame);

                    for line in text.lines() {
                        let line = line.trim();
                        if !line.starts_with("data:") {
                            continue;
                        }
                        let data = line.trim_start_matches("data:").trim();

                        if data == "[DONE]" {
                            break 'read;
                        }

                        let value: Value = serde_json::from_str(data)?;
                        yield frame_to_chunk(&value);
                    }
                }
            }
        };

        Ok(Box::pin(out))
    }
}

/// Convert one parsed SSE data frame into a chunk
fn frame_to_chunk(value: &Value) -> StreamChunk {
    let mut contents = Vec::new();
    let delta = &value["choices"][0]["delta"];

    if let Some(text) = delta.get("content").and_then(|v| v.as_str()) {
        if !text.is_empty() {
            contents.push(ChunkContent::Text(text.to_string()));
        }
    }

    if let Some(calls) = delta.get("tool_calls").and_then(|v| v.as_array()) {
        for call in calls {
            let index = call.get("index").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
            let id = call
                .get("id")
                .and_then(|v| v.as_str())
                .map(ToString::to_string);
            let name = call
                .get("function")
                .and_then(|f| f.get("name"))
                .and_then(|v| v.as_str())
                .map(ToString::to_string);
            let arguments = call
                .get("function")
                .and_then(|f| f.get("arguments"))
                .and_then(|v| v.as_str())
                .map(ToString::to_string);

            contents.push(ChunkContent::ToolCall(ToolCallContent {
                index,
                id,
                name,
                arguments,
            }));
        }
    }

    StreamChunk::new(contents)
}

/// Find the position of a double newline in the buffer
fn find_double_newline(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}
