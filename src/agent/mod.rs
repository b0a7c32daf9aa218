//! The tool-calling conversation loop and its collaborators.

pub mod bridge;
pub mod catalog;
pub mod conversation_loop;
pub mod metrics;

pub use conversation_loop::{ConversationLoop, QueryOutcome};
pub use metrics::QueryMetrics;
