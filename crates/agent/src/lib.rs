//! The agent side of CalMate.
//!
//! The agent follows a **Think → Act → Observe** cycle:
//!
//! 1. **Think**: send the system directive plus the conversation to the model
//! 2. **Act**: if the model asked for tools, run them concurrently
//! 3. **Observe**: append every result, in request order, and think again
//!
//! The loop ends when the model answers with text only, or fails once the
//! cycle limit is reached.

pub mod chat;
pub mod directive;
pub mod loop_runner;

#[cfg(test)]
pub(crate) mod test_support;

pub use chat::ChatService;
pub use directive::SystemDirective;
pub use loop_runner::{AgentLoop, LoopOutcome, LoopState};
