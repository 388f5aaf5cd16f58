use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::chunk::StreamChunk;
use crate::models::message::Message;

/// A finite, non-restartable sequence of completion chunks for one turn
pub type ChunkStream = BoxStream<'static, Result<StreamChunk>>;

/// Sampling parameters forwarded to the provider verbatim.
///
/// Ranges are provider-defined; out-of-range values surface as a provider
/// error at call time rather than being validated locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sampling {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

impl Sampling {
    pub fn new(temperature: f32, top_p: f32) -> Self {
        Self {
            temperature: Some(temperature),
            top_p: Some(top_p),
        }
    }
}

/// Base trait for chat-completion providers (OpenAI-compatible endpoints, mocks)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stream one completion turn.
    ///
    /// `tools` are wire-format declarations as produced by
    /// [`crate::tools::AgentTool::declaration`]. The returned stream ends when
    /// the provider signals completion of the turn; it cannot be restarted.
    async fn stream(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Value],
        sampling: Sampling,
    ) -> Result<ChunkStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_serialization() {
        let sampling = Sampling::new(0.8, 0.1);
        let json = serde_json::to_value(sampling).unwrap();
        assert_eq!(json["temperature"], 0.8);
        assert_eq!(json["top_p"], 0.1);

        let none = Sampling::default();
        assert_eq!(none.temperature, None);
        assert_eq!(none.top_p, None);
    }
}
