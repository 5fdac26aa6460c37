//! Multi-turn chat without retrieval.

pub mod session;

pub use session::{ChatService, ChatSession, ConversationTurn, SessionState, TurnOutcome};
