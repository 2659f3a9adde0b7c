//! Conversation memory: the ordered, inspectable log of turns.
//!
//! Memory grows only through [`ConversationMemory::append`] (and the
//! single [`append_all`](ConversationMemory::append_all) the
//! orchestrator uses to commit a finished turn). Replacing or shrinking
//! history is always an explicit call: [`load`](ConversationMemory::load),
//! [`reset`](ConversationMemory::reset) or
//! [`retain_last`](ConversationMemory::retain_last). Nothing is evicted
//! behind the caller's back.

use serde::{Deserialize, Serialize};
use crate::error::MemoryError;
use crate::message::{Role, Turn};

/// An ordered sequence of turns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
}

impl ConversationMemory {
    /// Create empty memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create memory pre-seeded with an initial transcript.
    pub fn seeded(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    /// Append one turn. Any string is valid content, including the empty one.
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(Turn::new(role, content));
    }

    /// Append several turns in order.
    pub fn append_all(&mut self, turns: Vec<Turn>) {
        self.turns.extend(turns);
    }

    /// Replace the full history.
    pub fn load(&mut self, turns: Vec<Turn>) {
        self.turns = turns;
    }

    /// Replace the full history from persisted `{role, content}` records.
    pub fn load_json(&mut self, snapshot: &str) -> Result<(), MemoryError> {
        let turns: Vec<Turn> =
            serde_json::from_str(snapshot).map_err(|e| MemoryError::Decode(e.to_string()))?;
        self.load(turns);
        Ok(())
    }

    /// Serialize the history as a JSON array of `{role, content}` records.
    pub fn dump_json(&self) -> Result<String, MemoryError> {
        serde_json::to_string(&self.turns).map_err(|e| MemoryError::Decode(e.to_string()))
    }

    /// A detached snapshot of the history, oldest first.
    pub fn history(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    /// Borrow the history without copying.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Drop all turns.
    pub fn reset(&mut self) {
        self.turns.clear();
    }

    /// Keep only the newest `n` turns and return the evicted ones, oldest first.
    pub fn retain_last(&mut self, n: usize) -> Vec<Turn> {
        let excess = self.turns.len().saturating_sub(n);
        self.turns.drain(..excess).collect()
    }

    /// Rough token count of the whole history (4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.turns.iter().map(Turn::estimated_tokens).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript() -> Vec<Turn> {
        vec![
            Turn::system("You are terse."),
            Turn::user("2+2?"),
            Turn::assistant("4"),
        ]
    }

    #[test]
    fn load_then_history_roundtrips() {
        let mut memory = ConversationMemory::new();
        memory.load(transcript());
        assert_eq!(memory.history(), transcript());
    }

    #[test]
    fn append_is_monotonic() {
        let mut memory = ConversationMemory::seeded(transcript());
        let before = memory.history();
        memory.append(Role::User, "and 3+3?");
        let after = memory.history();
        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(&after[..before.len()], before.as_slice());
        assert_eq!(after.last().unwrap().content, "and 3+3?");
    }

    #[test]
    fn empty_content_turns_load_unchanged() {
        let turns = vec![Turn::user("hi"), Turn::assistant("")];
        let mut memory = ConversationMemory::new();
        memory.load(turns.clone());
        assert_eq!(memory.history(), turns);

        memory.append(Role::User, "");
        assert_eq!(memory.len(), 3);
        assert_eq!(memory.last(), Some(&Turn::user("")));
    }

    #[test]
    fn append_all_keeps_order() {
        let mut memory = ConversationMemory::seeded(transcript());
        memory.append_all(vec![Turn::user("ok"), Turn::assistant("done")]);
        assert_eq!(memory.len(), 5);
        assert_eq!(&memory.history()[..3], transcript().as_slice());
        assert_eq!(memory.turns()[4], Turn::assistant("done"));
    }

    #[test]
    fn history_is_a_detached_snapshot() {
        let memory = ConversationMemory::seeded(transcript());
        let mut snapshot = memory.history();
        snapshot.clear();
        assert_eq!(memory.len(), 3);
    }

    #[test]
    fn retain_last_reports_evictions() {
        let mut memory = ConversationMemory::seeded(transcript());
        let evicted = memory.retain_last(1);
        assert_eq!(evicted.len(), 2);
        assert_eq!(evicted[0].role, Role::System);
        assert_eq!(memory.history(), vec![Turn::assistant("4")]);
        assert!(memory.retain_last(10).is_empty());
    }

    #[test]
    fn json_snapshot_roundtrip() {
        let memory = ConversationMemory::seeded(transcript());
        let json = memory.dump_json().unwrap();
        assert!(json.starts_with("[{\"role\":\"system\""));

        let mut restored = ConversationMemory::new();
        restored.load_json(&json).unwrap();
        assert_eq!(restored, memory);
    }

    #[test]
    fn malformed_snapshot_leaves_memory_untouched() {
        let mut memory = ConversationMemory::seeded(transcript());
        let err = memory
            .load_json(r#"[{"role": "user", "content": "hi"}, {"role": "robot", "content": "x"}]"#)
            .unwrap_err();
        assert!(matches!(err, MemoryError::Decode(_)));
        assert_eq!(memory.len(), 3);
    }

    #[test]
    fn reset_clears_history() {
        let mut memory = ConversationMemory::seeded(transcript());
        memory.reset();
        assert!(memory.is_empty());
        assert!(memory.last().is_none());
    }
}
