//! The LoopClaw agent: the tool-calling loop and the sessions it runs in.
//!
//! A turn follows a **model → tools → model** cycle:
//!
//! 1. **Append** the user message to the session transcript
//! 2. **Call the model** with the full transcript and tool catalog
//! 3. **If tool calls**: run them in order, append each result, go to 2
//! 4. **If text only**: append it as the final answer and stop
//!
//! A per-turn cap on tool invocations ends runaway loops, and every turn
//! reports its progress as an ordered stream of [`StreamEvent`]s that always
//! ends in `Done`.

pub mod loop_runner;
pub mod prompt;
pub mod session;
pub mod stream_event;

#[cfg(test)]
mod test_helpers;

pub use loop_runner::{AgentLoop, TurnSummary, DEFAULT_MAX_TOOL_CALLS};
pub use prompt::DEFAULT_SYSTEM_PROMPT;
pub use session::{stream_turn, Session, SessionInfo, SessionRegistry};
pub use stream_event::{StreamEvent, TurnOutcome};
