//! These models represent the objects passed around by the agent
//!
//! There are several related formats we need to interact with:
//! - openai-style messages/tools, sent from the agent to the LLM
//! - streamed completion chunks, sent back from the LLM while a turn runs
//! - tool requests, sent from the agent to the capabilities it hosts
//!
//! Wire formats are converted into these internal structs at the provider
//! boundary; nothing outside `providers` needs to know the wire shapes.
pub mod chunk;
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
