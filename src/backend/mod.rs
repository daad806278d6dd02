//! Backend module for text generation
//!
//! This module provides the abstraction over the external generation
//! service and its implementations.

mod mock;
mod openai;
mod traits;

pub use mock::{MockBackend, MockConfig};
pub use openai::{classify_status, OpenAiBackend, OpenAiConfig};
pub use traits::*;
