//! Text-generation service client and document assembly.
//!
//! The generation service is an external collaborator consumed through a
//! request/response contract; this module holds the HTTP client, the wire
//! types, and the PRD assembler built on top of them.

mod client;
mod prd;
mod types;

pub use client::GenerationClient;
pub use prd::{GeneratedPrd, PrdGenerator, PrdOptions, TemplateType};
pub use types::{GenerationRequest, GenerationResponse, Message, MessageRole, RawResponse, Usage};
