//! Raw multi-turn chat with the generative model.
//!
//! A session moves `Idle -> Sending` when a message goes out and settles on
//! `Answered` or `Failed` (both straight back to `Idle`) or `RateLimited`,
//! which only becomes `Idle` again once the cooldown has elapsed. Turns always
//! alternate user/model starting with user; a turn that does not get an
//! answer is rolled back.

use std::time::{Duration, Instant};

use tokio::sync::{Mutex, MutexGuard};

use crate::core::errors::AssistantError;
use crate::llm::{ChatMessage, GenerationRequest, LlmService, Role};

pub type ConversationTurn = ChatMessage;

const CHAT_TEMPERATURE: f64 = 0.7;
/// Upper bound for a backend-suggested cooldown.
pub const MAX_COOLDOWN: Duration = Duration::from_secs(3_600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sending,
    RateLimited { until: Instant },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Answered,
    RateLimited { cooldown: Duration },
    Failed,
}

#[derive(Debug)]
pub struct ChatSession {
    turns: Vec<ConversationTurn>,
    state: SessionState,
    model: String,
    cooldown: Duration,
}

impl ChatSession {
    pub fn new(model: impl Into<String>, cooldown: Duration) -> Self {
        Self {
            turns: Vec::new(),
            state: SessionState::Idle,
            model: model.into(),
            cooldown,
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// State as seen at `now`; an expired cooldown reads as `Idle`.
    pub fn state_at(&self, now: Instant) -> SessionState {
        match self.state {
            SessionState::RateLimited { until } if now >= until => SessionState::Idle,
            state => state,
        }
    }

    /// Records the user turn and returns the full history to send.
    pub fn begin(
        &mut self,
        message: &str,
        now: Instant,
    ) -> Result<Vec<ConversationTurn>, AssistantError> {
        match self.state_at(now) {
            SessionState::Idle => {}
            SessionState::Sending => {
                return Err(AssistantError::Generation(
                    "a reply is already in progress".to_string(),
                ));
            }
            SessionState::RateLimited { until } => {
                return Err(AssistantError::RateLimit {
                    retry_after: Some(until.saturating_duration_since(now)),
                });
            }
        }

        self.turns.push(ChatMessage::user(message));
        self.state = SessionState::Sending;
        Ok(self.turns.clone())
    }

    /// Settles a `Sending` session.
    pub fn finish(&mut self, result: &Result<String, AssistantError>, now: Instant) -> TurnOutcome {
        match result {
            Ok(reply) => {
                self.turns.push(ChatMessage::model(reply.clone()));
                self.state = SessionState::Idle;
                TurnOutcome::Answered
            }
            Err(AssistantError::RateLimit { retry_after }) => {
                self.rollback_user_turn();
                let cooldown = retry_after.map_or(self.cooldown, |hint| {
                    hint.clamp(self.cooldown, MAX_COOLDOWN.max(self.cooldown))
                });
                self.state = SessionState::RateLimited {
                    until: now.checked_add(cooldown).unwrap_or(now),
                };
                TurnOutcome::RateLimited { cooldown }
            }
            Err(_) => {
                self.rollback_user_turn();
                self.state = SessionState::Idle;
                TurnOutcome::Failed
            }
        }
    }

    /// Clears the history. A running cooldown is kept.
    pub fn reset(&mut self) {
        self.turns.clear();
        if self.state == SessionState::Sending {
            self.state = SessionState::Idle;
        }
    }

    /// Settles a `Sending` session whose reply will never arrive.
    pub fn abandon(&mut self) {
        if self.state == SessionState::Sending {
            self.rollback_user_turn();
            self.state = SessionState::Idle;
        }
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
        self.reset();
    }

    fn rollback_user_turn(&mut self) {
        if matches!(self.turns.last(), Some(turn) if turn.role == Role::User) {
            self.turns.pop();
        }
    }
}

/// Holds the session lock for one turn. Dropped without [`PendingTurn::settle`]
/// (the request future was cancelled) it abandons the turn.
struct PendingTurn<'a> {
    session: MutexGuard<'a, ChatSession>,
    settled: bool,
}

impl PendingTurn<'_> {
    fn settle(mut self, result: &Result<String, AssistantError>) -> TurnOutcome {
        self.settled = true;
        self.session.finish(result, Instant::now())
    }
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.session.abandon();
            tracing::warn!("Chat turn cancelled before the reply arrived; rolled back");
        }
    }
}

/// The process-wide chat session behind `/api/chat`.
///
/// Sends are serialised: the session lock is held while the backend answers.
pub struct ChatService {
    llm: LlmService,
    session: Mutex<ChatSession>,
}

impl ChatService {
    pub fn new(llm: LlmService, cooldown: Duration) -> Self {
        let session = ChatSession::new(llm.default_model(), cooldown);
        Self {
            llm,
            session: Mutex::new(session),
        }
    }

    pub async fn send(&self, message: &str) -> Result<String, AssistantError> {
        let mut session = self.session.lock().await;
        let history = session.begin(message, Instant::now())?;
        let model = session.model().to_string();
        let turn = PendingTurn {
            session,
            settled: false,
        };

        let result = self
            .llm
            .generate(
                GenerationRequest::new(history).with_temperature(CHAT_TEMPERATURE),
                &model,
            )
            .await;

        let outcome = turn.settle(&result);
        tracing::debug!(?outcome, "chat turn settled");
        result
    }

    pub async fn reset(&self) {
        self.session.lock().await.reset();
        tracing::info!("Chat history cleared");
    }

    pub fn available_models(&self) -> &[String] {
        self.llm.available_models()
    }

    pub async fn current_model(&self) -> String {
        self.session.lock().await.model().to_string()
    }

    /// Switches the chat model and starts a fresh conversation.
    pub async fn set_model(&self, model: &str) -> Result<String, AssistantError> {
        let model = self.llm.resolve_model(Some(model))?;
        self.session.lock().await.set_model(model.clone());
        tracing::info!(model = %model, "Chat model changed");
        Ok(model)
    }
}
