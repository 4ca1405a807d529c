use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque call identifier assigned by the telephony platform.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub String);

impl CallId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Greeting,
    NameCapture,
    OrderCapture,
    ItemConfirm,
    OrderConfirm,
    Finalized,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Finalized)
    }
}

/// A confirmed (or pending-confirmation) line item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_name: String,
    pub quantity: u32,
}

impl OrderLine {
    pub fn new(product_name: impl Into<String>, quantity: u32) -> Self {
        Self { product_name: product_name.into(), quantity }
    }
}

/// Per-call conversational state, spanning webhook turns.
///
/// Mutated exclusively by the dialogue engine while the owning session
/// mutex is held. At most one `pending_line` exists at any time; confirmed
/// lines are append-only until the call finalizes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallSession {
    pub call_id: CallId,
    pub customer_name: Option<String>,
    pub order_lines: Vec<OrderLine>,
    pub pending_line: Option<OrderLine>,
    pub last_utterance: Option<String>,
    pub stage: Stage,
    pub reask_count: u8,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl CallSession {
    pub fn new(call_id: CallId) -> Self {
        let now = Utc::now();
        Self {
            call_id,
            customer_name: None,
            order_lines: Vec::new(),
            pending_line: None,
            last_utterance: None,
            stage: Stage::Greeting,
            reask_count: 0,
            created_at: now,
            last_activity: now,
        }
    }

    /// Records activity for TTL eviction purposes.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Sets the customer name once; later attempts are ignored.
    pub fn record_customer_name(&mut self, name: &str) {
        let trimmed = name.trim();
        if self.customer_name.is_none() && !trimmed.is_empty() {
            self.customer_name = Some(trimmed.to_string());
        }
    }

    /// Moves the pending line into the confirmed order, if one exists.
    /// Returns whether a line was committed. A duplicate delivery finds
    /// the pending slot already cleared and commits nothing.
    pub fn commit_pending(&mut self) -> bool {
        match self.pending_line.take() {
            Some(line) => {
                self.order_lines.push(line);
                true
            }
            None => false,
        }
    }

    pub fn discard_pending(&mut self) {
        self.pending_line = None;
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::{CallId, CallSession, OrderLine, Stage};

    fn session() -> CallSession {
        CallSession::new(CallId("CA-test-1".to_string()))
    }

    #[test]
    fn new_session_starts_at_greeting_with_empty_order() {
        let session = session();
        assert_eq!(session.stage, Stage::Greeting);
        assert!(session.order_lines.is_empty());
        assert!(session.pending_line.is_none());
        assert!(session.customer_name.is_none());
    }

    #[test]
    fn customer_name_is_set_once_and_immutable() {
        let mut session = session();
        session.record_customer_name("  Asha  ");
        session.record_customer_name("Someone Else");
        assert_eq!(session.customer_name.as_deref(), Some("Asha"));
    }

    #[test]
    fn blank_customer_name_is_not_recorded() {
        let mut session = session();
        session.record_customer_name("   ");
        assert!(session.customer_name.is_none());
    }

    #[test]
    fn commit_pending_is_at_most_once() {
        let mut session = session();
        session.pending_line = Some(OrderLine::new("Biscuits", 2));

        assert!(session.commit_pending());
        assert!(!session.commit_pending());
        assert_eq!(session.order_lines, vec![OrderLine::new("Biscuits", 2)]);
    }

    #[test]
    fn discard_pending_leaves_confirmed_lines_untouched() {
        let mut session = session();
        session.order_lines.push(OrderLine::new("Rice", 1));
        session.pending_line = Some(OrderLine::new("Biscuits", 2));

        session.discard_pending();

        assert!(session.pending_line.is_none());
        assert_eq!(session.order_lines, vec![OrderLine::new("Rice", 1)]);
    }
}
