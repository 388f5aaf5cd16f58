use serde::{Deserialize, Serialize};

/// One streamed tool-call fragment.
///
/// Providers send tool calls incrementally: the first fragment for an index
/// carries the call id and function name, later fragments carry only argument
/// text. The agent loop resolves fragments against an accumulator before
/// forwarding, so downstream consumers always see a stable `id` for a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ToolCallContent {
    /// Position of the call within the completion
    pub index: usize,
    /// Correlates fragments of the same invocation across chunks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Tool name, absent until the provider has sent it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Argument text fragment, concatenated across chunks to form the call arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
/// One content item inside a streamed chunk
pub enum ChunkContent {
    Text(String),
    ToolCall(ToolCallContent),
}

/// An incremental unit of a streamed model response.
///
/// A chunk may contain zero or more content items; empty chunks are valid and
/// mean the provider had nothing to say in that frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StreamChunk {
    pub contents: Vec<ChunkContent>,
}

impl StreamChunk {
    pub fn new(contents: Vec<ChunkContent>) -> Self {
        Self { contents }
    }

    /// Convenience constructor for a single text fragment
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            contents: vec![ChunkContent::Text(text.into())],
        }
    }

    /// Concatenation of all text fragments in this chunk, in order
    pub fn concat_text(&self) -> String {
        self.contents
            .iter()
            .filter_map(|c| match c {
                ChunkContent::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .concat()
    }

    /// Iterate the tool-call fragments in this chunk
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCallContent> {
        self.contents.iter().filter_map(|c| match c {
            ChunkContent::ToolCall(tc) => Some(tc),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_text_preserves_order() {
        let chunk = StreamChunk::new(vec![
            ChunkContent::Text("Hi ".to_string()),
            ChunkContent::ToolCall(ToolCallContent {
                index: 0,
                id: Some("call_1".to_string()),
                name: Some("lookup".to_string()),
                arguments: None,
            }),
            ChunkContent::Text("there!".to_string()),
        ]);
        assert_eq!(chunk.concat_text(), "Hi there!");
        assert_eq!(chunk.tool_calls().count(), 1);
    }

    #[test]
    fn test_empty_chunk() {
        let chunk = StreamChunk::default();
        assert!(chunk.is_empty());
        assert_eq!(chunk.concat_text(), "");
        assert_eq!(chunk.tool_calls().count(), 0);
    }
}
