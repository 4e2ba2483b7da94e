//! Unified type system shared by adapters, cache, orchestrator, and recorder

pub mod request;
pub mod response;
pub mod structured;

pub use request::{ChatTurn, GenerationOptions, GenerationRequest, MessageRole, RequestContext};
pub use response::{GenerationResponse, TokenUsage};
pub use structured::StructuredOutput;
