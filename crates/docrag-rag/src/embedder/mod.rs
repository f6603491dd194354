//! Embedding provider implementations

mod hash;
mod openai;
#[cfg(feature = "fastembed")]
mod local;

pub use hash::HashEmbedder;
pub use openai::OpenAiEmbedder;
#[cfg(feature = "fastembed")]
pub use local::FastEmbedder;
