//! Conversation controller: the submit / cancel state machine.
//!
//! One turn at a time:
//! 1. Check input and chat id, claim the turn, resolve the API key (no
//!    writes on failure)
//! 2. Persist the system prompt (first turn only), the user message and an
//!    assistant placeholder
//! 3. Stream the completion into the placeholder through a StreamReconciler
//! 4. Return to Idle, publishing a notice for any error or cancellation

use std::cell::{Cell, RefCell};
use std::pin::pin;
use std::rc::Rc;
use futures::future::{self, Either};
use futures::StreamExt;
use serde::Serialize;
use chat_types::{
    ChatError, Result,
    config::ClientDefaults,
    event::ChatEvent,
    message::{ChatMessage, MessageRecord, Role},
    persona::PersonaDirectives,
    settings::Settings,
};
use crate::connection::{resolve_api_key, resolve_connection, resolve_model};
use crate::event_bus::EventBus;
use crate::ports::{
    CancellationToken, CompletionEvent, CompletionPort, CompletionRequest, CompletionResponse,
};
use crate::reconcile::{ContentAccumulator, StreamReconciler};
use crate::store::ChatDb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Submitting,
    StreamingResponse,
    Cancelled,
}

/// Result of a completed turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub chat_id: String,
    pub message_id: String,
    pub content: String,
    pub total_tokens: u64,
}

/// Validated submission, ready to persist
struct Submission {
    chat_id: String,
    content: String,
    settings: Option<Settings>,
    api_key: String,
}

pub struct ConversationController {
    db: ChatDb,
    completion: Rc<dyn CompletionPort>,
    bus: EventBus,
    defaults: ClientDefaults,
    persona: RefCell<PersonaDirectives>,
    state: Cell<TurnState>,
    cancel: RefCell<CancellationToken>,
    active_turn: Cell<Option<u64>>,
    turn_counter: Cell<u64>,
}

impl ConversationController {
    pub fn new(
        db: ChatDb,
        completion: Rc<dyn CompletionPort>,
        bus: EventBus,
        defaults: ClientDefaults,
    ) -> Self {
        Self {
            db,
            completion,
            bus,
            defaults,
            persona: RefCell::new(PersonaDirectives::default()),
            state: Cell::new(TurnState::Idle),
            cancel: RefCell::new(CancellationToken::new()),
            active_turn: Cell::new(None),
            turn_counter: Cell::new(0),
        }
    }

    pub fn state(&self) -> TurnState {
        self.state.get()
    }

    pub fn is_busy(&self) -> bool {
        self.state.get() != TurnState::Idle
    }

    pub fn db(&self) -> &ChatDb {
        &self.db
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Directives used for the system prompt of the next new chat.
    pub fn set_persona(&self, persona: PersonaDirectives) {
        *self.persona.borrow_mut() = persona;
    }

    pub fn persona(&self) -> PersonaDirectives {
        self.persona.borrow().clone()
    }

    /// Submit one user turn and stream the assistant's answer into the store.
    ///
    /// Every error, cancellation included, is also published as a notice.
    pub async fn submit(&self, chat_id: Option<&str>, input: &str) -> Result<TurnOutcome> {
        // Claimed before the first await: a concurrent submit must see Busy.
        let (turn_id, chat_id) = match self.claim_turn(chat_id, input) {
            Ok(claimed) => claimed,
            Err(e) => {
                self.report(&e);
                return Err(e);
            }
        };
        let token = self.cancel.borrow().clone();

        let result = match self.prepare(chat_id, input, &token).await {
            Ok(submission) => {
                log::info!("Turn {} started in chat {}", turn_id, submission.chat_id);
                self.run_turn(turn_id, submission, &token).await
            }
            Err(e) => Err(e),
        };
        self.end_turn(turn_id);

        match &result {
            Ok(outcome) => log::info!(
                "Turn {} finished, chat {} at {} tokens",
                turn_id, outcome.chat_id, outcome.total_tokens
            ),
            // cancel() already told the user
            Err(ChatError::Cancelled) => log::info!("Turn {} cancelled", turn_id),
            Err(e) => self.report(e),
        }
        result
    }

    /// Stop the in-flight turn, if any. The partial answer stays as it is.
    /// Returns false when there was nothing to cancel.
    pub fn cancel(&self) -> bool {
        if self.active_turn.take().is_none() {
            return false;
        }
        self.state.set(TurnState::Cancelled);
        let stale = self.cancel.replace(CancellationToken::new());
        stale.cancel();
        log::info!("Generation stopped by user");
        self.bus.emit(ChatEvent::Notice(ChatError::Cancelled.notice()));
        self.state.set(TurnState::Idle);
        true
    }

    /// Check a key against the endpoint with a one-message, non-streaming completion.
    pub async fn check_api_key(&self, api_key: &str) -> Result<CompletionResponse> {
        let result = async {
            let settings = self.db.settings().await?;
            let request = CompletionRequest {
                model: resolve_model(None, settings.as_ref(), &self.defaults),
                messages: vec![ChatMessage::user("hello")],
                connection: resolve_connection(
                    None,
                    settings.as_ref(),
                    &self.defaults,
                    api_key.trim().to_string(),
                ),
            };
            self.completion.complete(request).await
        }
        .await;
        if let Err(e) = &result {
            self.report(e);
        }
        result
    }

    pub async fn list_models(&self) -> Result<Vec<String>> {
        let settings = self.db.settings().await?;
        let api_key = resolve_api_key(settings.as_ref(), &self.defaults)
            .ok_or_else(missing_api_key)?;
        let connection = resolve_connection(None, settings.as_ref(), &self.defaults, api_key);
        self.completion.list_models(&connection).await
    }

    /// Pin a model to one chat, overriding the settings default.
    pub async fn select_model(&self, chat_id: &str, model: &str) -> Result<()> {
        self.db.ensure_chat(chat_id).await?;
        let model = model.trim();
        self.db
            .modify_chat(chat_id, |chat| {
                chat.model = (!model.is_empty()).then(|| model.to_string());
            })
            .await?;
        Ok(())
    }

    // ─── Turn internals ──────────────────────────────────────

    /// Synchronous checks, then mark the controller busy.
    fn claim_turn(&self, chat_id: Option<&str>, input: &str) -> Result<(u64, String)> {
        if self.is_busy() {
            return Err(ChatError::Validation(
                "A response is still being generated.".to_string(),
            ));
        }
        let chat_id = chat_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ChatError::Validation(
                    "chatId is not defined. Please create a chat to get started.".to_string(),
                )
            })?;
        if input.trim().is_empty() {
            return Err(ChatError::Validation("Message is empty.".to_string()));
        }
        Ok((self.begin_turn(), chat_id.to_string()))
    }

    /// Resolve settings and the API key for a claimed turn. Writes nothing.
    async fn prepare(
        &self,
        chat_id: String,
        input: &str,
        token: &CancellationToken,
    ) -> Result<Submission> {
        let settings = self.db.settings().await?;
        ensure_live(token)?;
        let api_key = resolve_api_key(settings.as_ref(), &self.defaults)
            .ok_or_else(missing_api_key)?;

        Ok(Submission {
            chat_id,
            content: input.to_string(),
            settings,
            api_key,
        })
    }

    async fn run_turn(
        &self,
        turn_id: u64,
        submission: Submission,
        token: &CancellationToken,
    ) -> Result<TurnOutcome> {
        let Submission { chat_id, content, settings, api_key } = submission;

        let chat = self.db.ensure_chat(&chat_id).await?;
        let settled = self.db.settle_generating(&chat_id).await?;
        if settled > 0 {
            log::debug!("Settled {} interrupted message(s) in chat {}", settled, chat_id);
        }
        let history = self.db.messages(&chat_id).await?;
        ensure_live(token)?;

        let mut outgoing = Vec::with_capacity(history.len() + 2);
        if chat.is_new_chat {
            let prompt = self.persona.borrow().system_prompt();
            self.insert(MessageRecord::new(&chat_id, Role::System, prompt.as_str()))
                .await?;
            self.db.modify_chat(&chat_id, |c| c.is_new_chat = false).await?;
            outgoing.push(ChatMessage::system(prompt));
        }
        // An answer cancelled before its first fragment has nothing to resend.
        outgoing.extend(
            history
                .iter()
                .map(MessageRecord::to_chat_message)
                .filter(|m| !(m.role == Role::Assistant && m.content.is_empty())),
        );
        ensure_live(token)?;

        self.insert(MessageRecord::new(&chat_id, Role::User, content.as_str()))
            .await?;
        outgoing.push(ChatMessage::user(content));
        ensure_live(token)?;

        let placeholder = self.insert(MessageRecord::placeholder(&chat_id)).await?;
        self.bus.emit(ChatEvent::TurnStart {
            chat_id: chat_id.clone(),
            message_id: placeholder.id.clone(),
        });

        let request = CompletionRequest {
            model: resolve_model(Some(&chat), settings.as_ref(), &self.defaults),
            messages: outgoing,
            connection: resolve_connection(Some(&chat), settings.as_ref(), &self.defaults, api_key),
        };
        log::debug!(
            "Streaming {} message(s) to {} ({})",
            request.messages.len(),
            request.connection.api_base,
            request.model
        );

        let mut reconciler = StreamReconciler::new(
            self.db.clone(),
            self.bus.clone(),
            token.clone(),
            chat_id.clone(),
            placeholder.id.clone(),
        );
        let mut accumulator = ContentAccumulator::new();
        let mut stream = self.completion.stream_complete(request, token.clone());

        let total_tokens = loop {
            let next = match future::select(pin!(token.cancelled()), stream.next()).await {
                Either::Left(_) => return Err(ChatError::Cancelled),
                Either::Right((next, _)) => next,
            };
            ensure_live(token)?;
            self.mark_streaming(turn_id);

            let update = match next {
                Some(CompletionEvent::Delta(fragment)) => accumulator.push(&fragment),
                // A stream that closes without an explicit done marker still
                // delivered everything it had.
                Some(CompletionEvent::Done) | None => accumulator.finish(),
                Some(CompletionEvent::Error(e)) => return Err(e),
            };
            if let Some(total) = reconciler.apply(&update).await? {
                break total;
            }
        };

        self.bus.emit(ChatEvent::TurnEnd {
            chat_id: chat_id.clone(),
            message_id: placeholder.id.clone(),
            total_tokens,
        });

        Ok(TurnOutcome {
            chat_id,
            message_id: placeholder.id,
            content: accumulator.text().to_string(),
            total_tokens,
        })
    }

    async fn insert(&self, message: MessageRecord) -> Result<MessageRecord> {
        let record = self.db.add_message(&message).await?;
        self.bus.emit(ChatEvent::MessageAdded {
            chat_id: record.chat_id.clone(),
            message_id: record.id.clone(),
        });
        Ok(record)
    }

    fn begin_turn(&self) -> u64 {
        let turn_id = self.turn_counter.get() + 1;
        self.turn_counter.set(turn_id);
        self.active_turn.set(Some(turn_id));
        self.state.set(TurnState::Submitting);
        turn_id
    }

    fn mark_streaming(&self, turn_id: u64) {
        if self.active_turn.get() == Some(turn_id) && self.state.get() == TurnState::Submitting {
            self.state.set(TurnState::StreamingResponse);
        }
    }

    /// A turn resuming after cancel() must not clobber a newer turn's state.
    fn end_turn(&self, turn_id: u64) {
        if self.active_turn.get() == Some(turn_id) {
            self.active_turn.set(None);
            self.state.set(TurnState::Idle);
        }
    }

    fn report(&self, error: &ChatError) {
        log::error!("Chat error: {}", error);
        self.bus.emit(ChatEvent::Notice(error.notice()));
    }
}

fn ensure_live(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        Err(ChatError::Cancelled)
    } else {
        Ok(())
    }
}

fn missing_api_key() -> ChatError {
    ChatError::Validation(
        "API key is not defined. Please set your API key or disable API key authentication."
            .to_string(),
    )
}
