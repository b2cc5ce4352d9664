//! Per-user conversation state.
//!
//! A [`Conversation`] is the ordered turn history for one user. It always
//! starts with the system seed, grows by whole turns, and is only ever touched
//! through the [`store::ConversationStore`].

pub mod store;

pub use store::{ConversationHandle, ConversationStore, TurnGuard};

use relay_types::turn::Turn;

/// Ordered turn history for one user.
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<Turn>,
    max_history_turns: Option<usize>,
}

impl Conversation {
    /// Create a conversation holding only the system seed.
    pub fn seeded(system_prompt: &str, max_history_turns: Option<usize>) -> Self {
        Self {
            turns: vec![Turn::system(system_prompt)],
            max_history_turns,
        }
    }

    /// Append a turn, then evict the oldest non-seed turns beyond the bound.
    ///
    /// Returns the number of evicted turns.
    pub fn push(&mut self, turn: Turn) -> usize {
        self.turns.push(turn);

        let Some(max) = self.max_history_turns else {
            return 0;
        };
        // The seed at index 0 is never evicted.
        let excess = (self.turns.len() - 1).saturating_sub(max);
        if excess > 0 {
            self.turns.drain(1..=excess);
        }
        excess
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always false: a conversation holds at least its seed.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }
}
