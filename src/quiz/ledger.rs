//! Persisted answer history

use std::collections::HashSet;
use std::sync::Arc;

use super::model::AnswerAttempt;
use crate::storage::{KeyValueStore, StoreError, load_json, save_json};

/// Answered-question sets and attempt logs, kept per lesson in local state
#[derive(Clone)]
pub struct AnswerLedger {
    store: Arc<dyn KeyValueStore>,
}

impl AnswerLedger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn answered_key(lesson_id: &str) -> String {
        format!("answered:{}", lesson_id)
    }

    fn attempts_key(lesson_id: &str) -> String {
        format!("attempts:{}", lesson_id)
    }

    /// Ids of questions already answered for a lesson
    pub fn answered(&self, lesson_id: &str) -> HashSet<u32> {
        load_json::<Vec<u32>>(self.store.as_ref(), &Self::answered_key(lesson_id))
            .unwrap_or_default()
            .into_iter()
            .collect()
    }

    /// Every attempt recorded for a lesson, oldest first
    pub fn attempts(&self, lesson_id: &str) -> Vec<AnswerAttempt> {
        load_json(self.store.as_ref(), &Self::attempts_key(lesson_id)).unwrap_or_default()
    }

    /// Append an attempt and store the updated answered set
    pub fn record(
        &self,
        lesson_id: &str,
        attempt: &AnswerAttempt,
        answered: &HashSet<u32>,
    ) -> Result<(), StoreError> {
        let mut attempts = self.attempts(lesson_id);
        attempts.push(attempt.clone());
        save_json(self.store.as_ref(), &Self::attempts_key(lesson_id), &attempts)?;

        let mut ids: Vec<u32> = answered.iter().copied().collect();
        ids.sort_unstable();
        save_json(self.store.as_ref(), &Self::answered_key(lesson_id), &ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::model::ChoiceKey;
    use crate::storage::MemoryKvStore;
    use pretty_assertions::assert_eq;

    fn attempt(question_id: u32, is_correct: bool) -> AnswerAttempt {
        AnswerAttempt { question_id, chosen_key: ChoiceKey::A, is_correct, timestamp: 1 }
    }

    #[test]
    fn empty_ledger() {
        let ledger = AnswerLedger::new(Arc::new(MemoryKvStore::new()));
        assert!(ledger.answered("1").is_empty());
        assert!(ledger.attempts("1").is_empty());
    }

    #[test]
    fn record_appends_attempts() {
        let ledger = AnswerLedger::new(Arc::new(MemoryKvStore::new()));

        ledger.record("1", &attempt(7, false), &HashSet::from([7])).unwrap();
        ledger.record("1", &attempt(9, true), &HashSet::from([7, 9])).unwrap();

        assert_eq!(ledger.attempts("1"), vec![attempt(7, false), attempt(9, true)]);
        assert_eq!(ledger.answered("1"), HashSet::from([7, 9]));
        assert!(ledger.answered("2").is_empty());
    }

    #[test]
    fn corrupt_answered_set_reads_as_empty() {
        let store = Arc::new(MemoryKvStore::new());
        store.set("answered:1", "[1, 2".to_string()).unwrap();

        let ledger = AnswerLedger::new(store);
        assert!(ledger.answered("1").is_empty());
    }
}
