//! LLM Provider implementations for CalMate.
//!
//! All providers implement the `calmate_core::Provider` trait.
//! `build_from_config` picks the configured one.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
