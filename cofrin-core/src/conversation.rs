//! Rolling conversation window kept per user so the oracle can resolve
//! references across turns ("the 20, no wait, 30").

use serde::{Deserialize, Serialize};

/// Most recent entries kept per user (5 exchanges).
pub const MAX_TURNS: usize = 10;

/// Session TTL: context expires after 24 hours of silence.
pub const CONTEXT_TTL_SECS: u64 = 86_400;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered window of prior turns. The tracker does not interpret content,
/// it only orders and bounds it: oldest entries drop first.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ConversationState {
    turns: Vec<ConversationTurn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Append a turn, then truncate from the front down to the cap.
    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
        if self.turns.len() > MAX_TURNS {
            let excess = self.turns.len() - MAX_TURNS;
            self.turns.drain(..excess);
        }
    }

    /// Record one exchange (user utterance + assistant reply).
    pub fn push_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.push(ConversationTurn::user(user));
        self.push(ConversationTurn::assistant(assistant));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_state() {
        let s = ConversationState::new();
        assert!(s.is_empty());
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn test_push_keeps_order() {
        let mut s = ConversationState::new();
        s.push(ConversationTurn::user("a"));
        s.push(ConversationTurn::assistant("b"));
        assert_eq!(s.turns()[0].content, "a");
        assert_eq!(s.turns()[1].content, "b");
    }

    #[test]
    fn test_cap_evicts_oldest_first() {
        let mut s = ConversationState::new();
        for i in 0..12 {
            s.push(ConversationTurn::user(format!("m{i}")));
        }
        assert_eq!(s.len(), MAX_TURNS);
        assert_eq!(s.turns()[0].content, "m2");
        assert_eq!(s.turns()[9].content, "m11");
    }

    #[test]
    fn test_push_exchange_counts_two() {
        let mut s = ConversationState::new();
        for _ in 0..6 {
            s.push_exchange("pergunta", "resposta");
        }
        // 6 exchanges = 12 turns, capped at 10
        assert_eq!(s.len(), MAX_TURNS);
        assert_eq!(s.turns()[0].role, Role::User);
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut s = ConversationState::new();
        s.push_exchange("gastei 20", "anotado");
        let json = serde_json::to_string(&s).unwrap();
        let back: ConversationState = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
