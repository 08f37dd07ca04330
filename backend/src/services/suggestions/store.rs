use common::model::suggestion::Suggestion;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// In-memory suggestions, grouped by the bulk create job that produced them.
#[derive(Default)]
pub struct SuggestionStore {
    batches: RwLock<HashMap<String, Vec<Suggestion>>>,
    next_id: AtomicU64,
}

const POISONED: &str = "suggestion store lock poisoned";

impl SuggestionStore {
    /// Stores one suggestion per accepted row under `job_id` and returns them.
    pub fn insert_batch(
        &self,
        job_id: &str,
        rows: Vec<(usize, BTreeMap<String, String>)>,
    ) -> Result<Vec<Suggestion>, String> {
        let suggestions: Vec<Suggestion> = rows
            .into_iter()
            .map(|(row, fields)| Suggestion {
                id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
                row,
                fields,
                approved: false,
            })
            .collect();
        self.batches
            .write()
            .map_err(|_| POISONED.to_string())?
            .insert(job_id.to_string(), suggestions.clone());
        Ok(suggestions)
    }

    /// IDs of the suggestions of `job_id` not yet approved, `None` for an unknown batch.
    pub fn pending_ids(&self, job_id: &str) -> Result<Option<Vec<u64>>, String> {
        let batches = self.batches.read().map_err(|_| POISONED.to_string())?;
        Ok(batches.get(job_id).map(|batch| {
            batch
                .iter()
                .filter(|s| !s.approved)
                .map(|s| s.id)
                .collect()
        }))
    }

    /// Forgets the batch of `job_id`; `true` if there was one.
    pub fn remove_batch(&self, job_id: &str) -> Result<bool, String> {
        let mut batches = self.batches.write().map_err(|_| POISONED.to_string())?;
        Ok(batches.remove(job_id).is_some())
    }

    /// Marks `ids` of batch `job_id` approved and returns the ones that changed.
    pub fn approve(&self, job_id: &str, ids: &[u64]) -> Result<Vec<u64>, String> {
        let mut batches = self.batches.write().map_err(|_| POISONED.to_string())?;
        let batch = batches
            .get_mut(job_id)
            .ok_or_else(|| format!("No suggestions for job {}", job_id))?;
        let mut approved = Vec::new();
        for suggestion in batch.iter_mut() {
            if !suggestion.approved && ids.contains(&suggestion.id) {
                suggestion.approved = true;
                approved.push(suggestion.id);
            }
        }
        Ok(approved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(n: usize) -> (usize, BTreeMap<String, String>) {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), format!("Monumento {}", n));
        (n, fields)
    }

    #[test]
    fn ids_are_unique_across_batches() {
        let store = SuggestionStore::default();
        let first = store.insert_batch("a", vec![row(1), row(2)]).unwrap();
        let second = store.insert_batch("b", vec![row(1)]).unwrap();
        assert_eq!(
            [first[0].id, first[1].id, second[0].id],
            [1, 2, 3]
        );
    }

    #[test]
    fn approval_is_reported_once() {
        let store = SuggestionStore::default();
        store.insert_batch("a", vec![row(1), row(2)]).unwrap();

        assert_eq!(store.approve("a", &[2]).unwrap(), vec![2]);
        assert_eq!(store.approve("a", &[1, 2]).unwrap(), vec![1]);
        assert_eq!(store.pending_ids("a").unwrap(), Some(vec![]));
        assert_eq!(store.pending_ids("zzz").unwrap(), None);
        assert!(store.approve("zzz", &[1]).is_err());

        assert!(store.remove_batch("a").unwrap());
        assert!(!store.remove_batch("a").unwrap());
        assert_eq!(store.pending_ids("a").unwrap(), None);
    }
}
