//! Concurrent user -> conversation registry.
//!
//! Two levels of locking:
//! - the `DashMap` shards guard the map structure itself, so first-contact
//!   inserts for different users never contend on one global lock;
//! - each conversation carries its own `RwLock` for the turn list and a FIFO
//!   turn lock that serializes whole events for that user.
//!
//! The store is constructed once at startup and shared behind an `Arc`.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, trace};

use relay_types::turn::{Role, Turn};

use super::Conversation;

/// Storage slot for a single user's conversation.
struct ConversationSlot {
    /// Held by the orchestrator for the full duration of one event.
    turn_lock: Arc<Mutex<()>>,
    conversation: RwLock<Conversation>,
}

/// Reference to one user's conversation, obtained from [`ConversationStore::get_or_create`].
///
/// Cheap to clone. Grants no access on its own: reads and writes go through
/// the store's operations.
#[derive(Clone)]
pub struct ConversationHandle {
    user_id: Arc<str>,
    slot: Arc<ConversationSlot>,
}

impl ConversationHandle {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Whether both handles point at the same stored conversation.
    pub fn same_conversation(&self, other: &ConversationHandle) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl std::fmt::Debug for ConversationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationHandle")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Exclusive right to run one event against a user's conversation.
///
/// Released on drop. Waiters acquire it in arrival order.
pub struct TurnGuard {
    _guard: OwnedMutexGuard<()>,
}

/// Registry mapping user identifiers to their conversations.
pub struct ConversationStore {
    conversations: DashMap<String, Arc<ConversationSlot>>,
    system_prompt: String,
    max_history_turns: Option<usize>,
}

impl ConversationStore {
    /// Create an empty store. Every new conversation is seeded with `system_prompt`.
    pub fn new(system_prompt: impl Into<String>, max_history_turns: Option<usize>) -> Self {
        Self {
            conversations: DashMap::new(),
            system_prompt: system_prompt.into(),
            max_history_turns,
        }
    }

    /// Return the user's conversation, creating and seeding it on first contact.
    ///
    /// Creation is an atomic check-and-insert on the owning shard, so
    /// simultaneous first-contact calls for one user still produce a single
    /// seeded conversation.
    pub fn get_or_create(&self, user_id: &str) -> ConversationHandle {
        if let Some(slot) = self.conversations.get(user_id) {
            return ConversationHandle {
                user_id: Arc::from(user_id),
                slot: Arc::clone(slot.value()),
            };
        }

        let mut created = false;
        let slot = Arc::clone(
            self.conversations
                .entry(user_id.to_string())
                .or_insert_with(|| {
                    created = true;
                    Arc::new(ConversationSlot {
                        turn_lock: Arc::new(Mutex::new(())),
                        conversation: RwLock::new(Conversation::seeded(
                            &self.system_prompt,
                            self.max_history_turns,
                        )),
                    })
                })
                .value(),
        );

        if created {
            debug!(%user_id, "created conversation");
        }

        ConversationHandle {
            user_id: Arc::from(user_id),
            slot,
        }
    }

    /// Look up an existing conversation without creating one.
    pub fn get(&self, user_id: &str) -> Option<ConversationHandle> {
        self.conversations
            .get(user_id)
            .map(|slot| ConversationHandle {
                user_id: Arc::from(user_id),
                slot: Arc::clone(slot.value()),
            })
    }

    /// Append a turn to the end of the conversation.
    ///
    /// Returns the conversation length after the append (and any eviction).
    pub async fn append(
        &self,
        handle: &ConversationHandle,
        role: Role,
        content: impl Into<String>,
    ) -> usize {
        let mut conversation = handle.slot.conversation.write().await;
        let evicted = conversation.push(Turn::new(role, content));
        if evicted > 0 {
            debug!(
                user_id = %handle.user_id,
                evicted,
                "history bound reached, evicted oldest turns"
            );
        }
        trace!(user_id = %handle.user_id, %role, turns = conversation.len(), "appended turn");
        conversation.len()
    }

    /// Copy of the current turns, in order.
    pub async fn snapshot(&self, handle: &ConversationHandle) -> Vec<Turn> {
        handle.slot.conversation.read().await.turns().to_vec()
    }

    /// Number of turns currently stored for the conversation.
    pub async fn turn_count(&self, handle: &ConversationHandle) -> usize {
        handle.slot.conversation.read().await.len()
    }

    /// Wait for exclusive use of the conversation for one event.
    ///
    /// Waiters are served first-come first-served. Other users' conversations
    /// are unaffected.
    pub async fn lock_turn(&self, handle: &ConversationHandle) -> TurnGuard {
        let guard = Arc::clone(&handle.slot.turn_lock).lock_owned().await;
        TurnGuard { _guard: guard }
    }

    /// Number of conversations in the store.
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Identifiers of all users with a conversation.
    pub fn user_ids(&self) -> Vec<String> {
        self.conversations.iter().map(|r| r.key().clone()).collect()
    }
}
