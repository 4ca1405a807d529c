use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::dialogue::intent::{self, Intent};
use crate::dialogue::prompts;
use crate::domain::{CallSession, Catalog, OrderLine, Stage};

/// Extractor output: a best-effort candidate, or an explicit miss. Any
/// internal failure (network, timeout, unparseable reply) must surface as
/// `Unrecognized`, never as an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extraction {
    Candidate { product: String, quantity: u32 },
    Unrecognized,
}

#[async_trait]
pub trait OrderExtraction: Send + Sync {
    async fn extract(&self, utterance: &str) -> Extraction;
}

/// Dispatches the final order summary. Implementations must not block the
/// voice response path; slow or failing delivery is their own concern.
pub trait OrderDispatch: Send + Sync {
    fn dispatch(&self, session: &CallSession, correlation_id: &str);
}

/// What the webhook answers with for one turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnReply {
    pub spoken_prompt: String,
    pub await_next_utterance: bool,
    pub terminate_call: bool,
}

impl TurnReply {
    fn listen(spoken_prompt: String) -> Self {
        Self { spoken_prompt, await_next_utterance: true, terminate_call: false }
    }

    fn hang_up(spoken_prompt: String) -> Self {
        Self { spoken_prompt, await_next_utterance: false, terminate_call: true }
    }
}

#[derive(Clone, Debug)]
pub struct TurnContext {
    pub correlation_id: String,
}

/// The per-call state machine:
/// `Greeting → NameCapture → OrderCapture ⇄ ItemConfirm → OrderConfirm → Finalized`,
/// with self-loops on unrecognized input. Every transition is total — the
/// engine never fails a turn; the worst outcome is a re-ask or a polite
/// hang-up, and the caller only ever hears natural-language prompts.
pub struct DialogueEngine {
    catalog: Arc<Catalog>,
    extractor: Arc<dyn OrderExtraction>,
    notifier: Arc<dyn OrderDispatch>,
    store_name: String,
    max_reasks: u8,
}

impl DialogueEngine {
    pub fn new(
        catalog: Arc<Catalog>,
        extractor: Arc<dyn OrderExtraction>,
        notifier: Arc<dyn OrderDispatch>,
        store_name: impl Into<String>,
        max_reasks: u8,
    ) -> Self {
        Self {
            catalog,
            extractor,
            notifier,
            store_name: store_name.into(),
            max_reasks: max_reasks.max(1),
        }
    }

    /// Applies one inbound turn to the session and produces the reply to
    /// speak. The session mutex must be held by the caller for the whole
    /// turn; duplicate deliveries are tolerated because committed state
    /// (stage advance, cleared pending line) makes the second application
    /// a no-op re-ask rather than a double commit.
    pub async fn advance(
        &self,
        session: &mut CallSession,
        utterance: &str,
        ctx: &TurnContext,
    ) -> TurnReply {
        let from = session.stage;
        if !utterance.trim().is_empty() {
            session.last_utterance = Some(utterance.to_string());
        }

        let reply = match session.stage {
            Stage::Greeting => self.greet(session),
            Stage::NameCapture => self.capture_name(session, utterance),
            Stage::OrderCapture => self.capture_order(session, utterance).await,
            Stage::ItemConfirm => self.confirm_item(session, utterance),
            Stage::OrderConfirm => self.confirm_order(session, utterance, ctx),
            Stage::Finalized => TurnReply::hang_up(prompts::goodbye()),
        };

        info!(
            event_name = "dialogue.turn_applied",
            call_id = %session.call_id,
            correlation_id = %ctx.correlation_id,
            from_stage = ?from,
            to_stage = ?session.stage,
            terminate = reply.terminate_call,
            "turn applied"
        );

        reply
    }

    fn greet(&self, session: &mut CallSession) -> TurnReply {
        self.enter(session, Stage::NameCapture);
        TurnReply::listen(prompts::greeting(&self.store_name))
    }

    fn capture_name(&self, session: &mut CallSession, utterance: &str) -> TurnReply {
        session.record_customer_name(utterance);
        self.enter(session, Stage::OrderCapture);
        TurnReply::listen(prompts::ask_order(session.customer_name.as_deref()))
    }

    async fn capture_order(&self, session: &mut CallSession, utterance: &str) -> TurnReply {
        if utterance.trim().is_empty() || intent::is_decline(utterance) {
            return self.close_order_capture(session);
        }

        match self.extractor.extract(utterance).await {
            Extraction::Unrecognized => self.reask(session, prompts::reask_order()),
            Extraction::Candidate { product, quantity } => {
                let requested = quantity.max(1);
                match self.catalog.lookup(&product) {
                    None => {
                        debug!(
                            event_name = "dialogue.product_not_found",
                            call_id = %session.call_id,
                            product = %product,
                            "extracted product has no catalog match"
                        );
                        self.reask(session, prompts::not_found(&product))
                    }
                    Some(entry) if entry.available == 0 => {
                        self.reask(session, prompts::out_of_stock(&entry.name))
                    }
                    Some(entry) => {
                        let granted = requested.min(entry.available);
                        session.pending_line = Some(OrderLine::new(entry.name.clone(), granted));
                        self.enter(session, Stage::ItemConfirm);
                        if granted < requested {
                            TurnReply::listen(prompts::only_n_available(entry.available, &entry.name))
                        } else {
                            TurnReply::listen(prompts::in_stock(granted, &entry.name))
                        }
                    }
                }
            }
        }
    }

    fn confirm_item(&self, session: &mut CallSession, utterance: &str) -> TurnReply {
        match intent::classify(utterance) {
            Intent::Affirmative => {
                session.commit_pending();
                self.enter(session, Stage::OrderCapture);
                TurnReply::listen(prompts::item_confirmed())
            }
            Intent::Negative => {
                session.discard_pending();
                if session.order_lines.is_empty() {
                    self.enter(session, Stage::OrderCapture);
                    TurnReply::listen(prompts::ask_again_after_reject())
                } else {
                    self.enter(session, Stage::OrderConfirm);
                    TurnReply::listen(prompts::confirm_full_order(&session.order_lines))
                }
            }
            Intent::Ambiguous | Intent::Empty => self.reask(session, prompts::yes_or_no()),
        }
    }

    fn confirm_order(
        &self,
        session: &mut CallSession,
        utterance: &str,
        ctx: &TurnContext,
    ) -> TurnReply {
        let reply = match intent::classify(utterance) {
            Intent::Affirmative => {
                if session.order_lines.is_empty() {
                    warn!(
                        event_name = "dialogue.finalize_without_lines",
                        call_id = %session.call_id,
                        correlation_id = %ctx.correlation_id,
                        "final confirmation reached with no confirmed lines; skipping dispatch"
                    );
                } else {
                    self.notifier.dispatch(session, &ctx.correlation_id);
                }
                TurnReply::hang_up(prompts::thanks())
            }
            _ => TurnReply::hang_up(prompts::polite_close()),
        };
        self.enter(session, Stage::Finalized);
        reply
    }

    /// Decline or silence during order capture: goodbye on an empty cart,
    /// otherwise read the order back for final confirmation.
    fn close_order_capture(&self, session: &mut CallSession) -> TurnReply {
        if session.order_lines.is_empty() {
            self.enter(session, Stage::Finalized);
            TurnReply::hang_up(prompts::goodbye())
        } else {
            self.enter(session, Stage::OrderConfirm);
            TurnReply::listen(prompts::confirm_full_order(&session.order_lines))
        }
    }

    /// Self-loop with a capped consecutive re-ask budget; past the cap the
    /// call ends with a handoff prompt instead of looping forever.
    fn reask(&self, session: &mut CallSession, spoken_prompt: String) -> TurnReply {
        session.reask_count = session.reask_count.saturating_add(1);
        if session.reask_count >= self.max_reasks {
            self.enter(session, Stage::Finalized);
            return TurnReply::hang_up(prompts::handoff());
        }
        TurnReply::listen(spoken_prompt)
    }

    fn enter(&self, session: &mut CallSession, stage: Stage) {
        session.stage = stage;
        session.reask_count = 0;
    }
}
