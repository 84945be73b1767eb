//! Model gateway implementations for LoopClaw.
//!
//! All gateways implement the `loopclaw_core::Provider` trait. One request in,
//! one structured reply out; no retries and no state between calls.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
