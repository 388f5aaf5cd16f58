use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;

use tandem::agent::Agent;
use tandem::models::message::Message;

/// Drives conversational turns through an agent and renders the streamed
/// response: deduplicated tool-call notifications first, text fragments as
/// they arrive, a turn boundary once the stream is exhausted.
pub struct Session<W: Write> {
    agent: Arc<Agent>,
    out: W,
}

impl<W: Write> Session<W> {
    pub fn new(agent: Arc<Agent>, out: W) -> Self {
        Session { agent, out }
    }

    /// Run every input through the agent, then print the completion banner
    pub async fn run(&mut self, inputs: &[String]) -> Result<()> {
        for input in inputs {
            self.run_turn(input).await?;
        }
        writeln!(self.out, "\n--- All tasks completed successfully ---")?;
        Ok(())
    }

    async fn run_turn(&mut self, input: &str) -> Result<()> {
        writeln!(self.out, "\n# User: '{}'", input)?;

        let messages = vec![Message::user().with_text(input)];
        let mut printed_tool_calls: HashSet<String> = HashSet::new();

        let agent = Arc::clone(&self.agent);
        let mut stream = agent.reply(&messages).await?;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;

            // Log tool calls if any, once per call id
            for call in chunk.tool_calls() {
                let id = call
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("call_{}", call.index));
                if printed_tool_calls.insert(id) {
                    writeln!(
                        self.out,
                        "Tool calls: {}",
                        call.name.as_deref().unwrap_or("unknown")
                    )?;
                }
            }

            // Text goes out immediately to keep the display incremental
            let text = chunk.concat_text();
            if !text.is_empty() {
                write!(self.out, "{}", text)?;
                self.out.flush()?;
            }
        }

        writeln!(self.out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem::models::chunk::{ChunkContent, StreamChunk, ToolCallContent};
    use tandem::providers::mock::{MockProvider, MockTurn};

    fn tool_notice(index: usize, id: &str, name: &str) -> ChunkContent {
        ChunkContent::ToolCall(ToolCallContent {
            index,
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            arguments: Some("{}".to_string()),
        })
    }

    fn agent_with(turns: Vec<Vec<StreamChunk>>) -> Arc<Agent> {
        Arc::new(Agent::new(
            "assistant",
            "You are a helpful assistant.",
            Box::new(MockProvider::with_chunks(turns)),
        ))
    }

    async fn run_session(agent: Arc<Agent>, inputs: &[&str]) -> Result<String> {
        let mut session = Session::new(agent, Vec::new());
        let inputs: Vec<String> = inputs.iter().map(ToString::to_string).collect();
        let result = session.run(&inputs).await;
        let output = String::from_utf8(session.out.clone()).unwrap();
        result.map(|()| output)
    }

    #[tokio::test]
    async fn test_streams_text_with_header_and_banner() {
        let agent = agent_with(vec![vec![StreamChunk::text("Hi there!")]]);
        let output = run_session(agent, &["Hello"]).await.unwrap();
        assert_eq!(
            output,
            "\n# User: 'Hello'\nHi there!\n\n--- All tasks completed successfully ---\n"
        );
    }

    #[tokio::test]
    async fn test_empty_stream_emits_only_header_and_boundary() {
        let agent = agent_with(vec![vec![]]);
        let output = run_session(agent, &["Hello"]).await.unwrap();
        assert_eq!(
            output,
            "\n# User: 'Hello'\n\n\n--- All tasks completed successfully ---\n"
        );
    }

    #[tokio::test]
    async fn test_duplicate_call_ids_print_once() {
        // The same call id arrives in two fragments; one line comes out
        let agent = agent_with(vec![vec![
            StreamChunk::new(vec![tool_notice(0, "call_1", "Optimization")]),
            StreamChunk::new(vec![tool_notice(0, "call_1", "Optimization")]),
        ]]);
        let output = run_session(agent, &["Hello"]).await.unwrap();
        assert_eq!(
            output.matches("Tool calls: Optimization").count(),
            1,
            "expected exactly one notification, got: {output:?}"
        );
    }

    #[tokio::test]
    async fn test_tool_only_chunk_emits_only_tool_lines() {
        let agent = agent_with(vec![vec![StreamChunk::new(vec![
            tool_notice(0, "call_1", "Optimization"),
            tool_notice(1, "call_2", "Lookup"),
        ])]]);
        let output = run_session(agent, &["Hello"]).await.unwrap();
        assert_eq!(
            output,
            "\n# User: 'Hello'\nTool calls: Optimization\nTool calls: Lookup\n\n\n--- All tasks completed successfully ---\n"
        );
    }

    #[tokio::test]
    async fn test_text_concatenation_preserves_arrival_order() {
        let agent = agent_with(vec![vec![
            StreamChunk::text("one "),
            StreamChunk::new(vec![]),
            StreamChunk::text("two "),
            StreamChunk::text("three"),
        ]]);
        let output = run_session(agent, &["count"]).await.unwrap();
        assert!(output.contains("one two three"));
    }

    #[tokio::test]
    async fn test_stream_error_propagates() {
        let provider = MockProvider::new(vec![MockTurn::Failing(
            vec![StreamChunk::text("partial")],
            "connection reset".to_string(),
        )]);
        let agent = Arc::new(Agent::new(
            "assistant",
            "You are a helpful assistant.",
            Box::new(provider),
        ));
        let mut session = Session::new(agent, Vec::new());
        let result = session.run(&["Hello".to_string()]).await;
        assert!(result.is_err());

        // Whatever streamed before the failure was already rendered
        let output = String::from_utf8(session.out.clone()).unwrap();
        assert!(output.contains("partial"));
        assert!(!output.contains("All tasks completed"));
    }
}
