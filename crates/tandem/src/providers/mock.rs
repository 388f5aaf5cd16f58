use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::stream;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::models::chunk::StreamChunk;
use crate::models::message::Message;
use crate::providers::base::{ChunkStream, Provider, Sampling};

/// One scripted completion turn for the mock provider
pub enum MockTurn {
    /// Yield these chunks, then end the stream normally
    Chunks(Vec<StreamChunk>),
    /// Yield these chunks, then fail the stream with the given message
    Failing(Vec<StreamChunk>, String),
}

/// A mock provider that plays back pre-configured chunk streams for testing.
///
/// Records the message list of every call so tests can assert on what the
/// agent actually sent.
pub struct MockProvider {
    turns: Arc<Mutex<VecDeque<MockTurn>>>,
    calls: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of scripted turns
    pub fn new(turns: Vec<MockTurn>) -> Self {
        Self {
            turns: Arc::new(Mutex::new(turns.into())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shorthand for turns that all complete normally
    pub fn with_chunks(turns: Vec<Vec<StreamChunk>>) -> Self {
        Self::new(turns.into_iter().map(MockTurn::Chunks).collect())
    }

    /// A handle for inspecting calls after the provider has been boxed
    pub fn call_log(&self) -> Arc<Mutex<Vec<Vec<Message>>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn stream(
        &self,
        _system: &str,
        messages: &[Message],
        _tools: &[Value],
        _sampling: Sampling,
    ) -> Result<ChunkStream> {
        self.calls.lock().unwrap().push(messages.to_vec());

        let turn = self.turns.lock().unwrap().pop_front();
        let items: Vec<Result<StreamChunk>> = match turn {
            Some(MockTurn::Chunks(chunks)) => chunks.into_iter().map(Ok).collect(),
            Some(MockTurn::Failing(chunks, error)) => {
                let mut items: Vec<Result<StreamChunk>> =
                    chunks.into_iter().map(Ok).collect();
                items.push(Err(anyhow!(error)));
                items
            }
            // Out of scripted turns: end immediately
            None => Vec::new(),
        };

        Ok(Box::pin(stream::iter(items)))
    }
}
